//! Transition and reward model of the social grid world.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tandem_core::{
    errors, rewards, Action, Domain, DomainErrors, EnvironmentConfig, GridState, InteractionMode,
    Mood, MoodCycle, Position, Result, RewardBreakdown, StartMode, StepBudget, StepEvent,
    TandemError, Transition,
};

/// Two-domain grid world.
///
/// Randomness is confined to `reset` (start placement) and, with
/// `MoodCycle::Random`, to mood transitions. Rewards and moves are pure
/// functions of the current snapshot, the action and the ground-truth mood.
pub struct SocialGridWorld {
    config: EnvironmentConfig,

    /// Explicitly seeded; never the thread-local generator.
    rng: ChaCha8Rng,

    /// Ground truth, hidden from `GridState`.
    mood: Mood,

    /// Completed episodes, including `config.starting_episode`.
    episodes_completed: u64,

    /// Latest snapshot.
    state: Option<GridState>,

    /// Whether `state` belongs to an episode that may still be stepped.
    active: bool,
}

impl SocialGridWorld {
    /// Build a world; rejects an invalid configuration up front.
    pub fn new(config: EnvironmentConfig, seed: u64) -> Result<Self> {
        config.validate()?;

        let forced = within_path_rectangle(
            config.start_position,
            config.goal_position,
            config.npc_position,
        );
        if config.start == StartMode::Fixed && !forced {
            tracing::warn!(
                "NPC at {} is off every shortest path from {} to {}; interaction is not forced",
                config.npc_position,
                config.start_position,
                config.goal_position
            );
        }

        Ok(Self {
            mood: config.initial_mood,
            episodes_completed: config.starting_episode,
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
            state: None,
            active: false,
        })
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Ground-truth NPC mood.
    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn episodes_completed(&self) -> u64 {
        self.episodes_completed
    }

    /// Latest snapshot, if `reset` has been called.
    pub fn state(&self) -> Option<&GridState> {
        self.state.as_ref()
    }

    pub fn is_episode_active(&self) -> bool {
        self.active
    }

    /// Start a new episode. `Some(seed)` reseeds the world's RNG first.
    ///
    /// Resetting an unfinished episode abandons it: it does not count
    /// toward the mood schedule.
    pub fn reset(&mut self, seed: Option<u64>) -> GridState {
        if let Some(seed) = seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }
        if self.active {
            tracing::debug!("Abandoning unfinished episode without counting it");
        }

        let state = GridState {
            agent_pos: self.start_position(),
            goal_pos: self.config.goal_position,
            npc_pos: self.config.npc_position,
            npc_mood_estimate: None,
            interaction_count: 0,
            steps: 0,
        };

        self.state = Some(state.clone());
        self.active = true;
        state
    }

    /// Advance by an action index; out-of-set indices fail fast.
    pub fn step_index(&mut self, index: usize) -> Result<Transition> {
        self.step(Action::from_index(index)?)
    }

    /// Advance the active episode by one action.
    pub fn step(&mut self, action: Action) -> Result<Transition> {
        let prev = match (&self.state, self.active) {
            (Some(state), true) => state.clone(),
            _ => return Err(TandemError::EpisodeNotActive),
        };

        let size = self.config.grid_size;
        let npc = self.config.npc_position;

        let mut outcome = Outcome {
            breakdown: RewardBreakdown {
                step: rewards::STEP,
                ..Default::default()
            },
            errors: DomainErrors::none(),
            agent_pos: prev.agent_pos,
            estimate: prev.npc_mood_estimate,
            interactions: prev.interaction_count,
            event: StepEvent::Moved,
            done: false,
        };

        match action.delta() {
            Some(delta) => {
                let target = prev.agent_pos.offset(delta);
                if !target.in_bounds(size) {
                    outcome.breakdown.collision = rewards::WALL;
                    outcome.errors = DomainErrors::attributed(Domain::State, errors::WALL);
                    outcome.event = StepEvent::WallCollision;
                } else {
                    outcome.agent_pos = target;
                    if self.config.interaction == InteractionMode::Contact && target == npc {
                        self.interact(&mut outcome);
                    }
                }
            }
            None => {
                if self.can_reach_npc(prev.agent_pos) {
                    self.interact(&mut outcome);
                } else {
                    outcome.breakdown.wasted = rewards::WASTED_INTERACT;
                    outcome.errors =
                        DomainErrors::attributed(Domain::State, errors::WASTED_INTERACT);
                    outcome.event = StepEvent::WastedInteraction;
                }
            }
        }

        if outcome.agent_pos == self.config.goal_position {
            outcome.breakdown.goal = rewards::GOAL;
            outcome.done = true;
        }

        let steps = prev.steps + 1;
        if steps >= self.config.episode_step_limit {
            outcome.done = true;
        }

        let next_state = GridState {
            agent_pos: outcome.agent_pos,
            goal_pos: prev.goal_pos,
            npc_pos: prev.npc_pos,
            npc_mood_estimate: outcome.estimate,
            interaction_count: outcome.interactions,
            steps,
        };

        let transition = Transition {
            reward: outcome.breakdown.total(),
            state: prev,
            action,
            next_state: next_state.clone(),
            done: outcome.done,
            event: outcome.event,
            domain_errors: outcome.errors,
            breakdown: outcome.breakdown,
            budget: StepBudget {
                used: steps,
                limit: self.config.episode_step_limit,
            },
        };

        tracing::debug!(
            action = ?action,
            event = ?transition.event,
            reward = transition.reward,
            state_error = transition.domain_errors.state(),
            agent_error = transition.domain_errors.agent(),
            done = transition.done,
            "step"
        );

        self.state = Some(next_state);
        if transition.done {
            self.finish_episode();
        }

        Ok(transition)
    }

    /// Resolve an interaction against the ground-truth mood and update the
    /// agent's estimate toward what it observed.
    fn interact(&self, outcome: &mut Outcome) {
        let mood = self.mood;
        let surprise = mood.surprise_given(outcome.estimate);
        let magnitude = mood.interaction_error() * surprise;

        outcome.breakdown.interaction = mood.interaction_reward();
        outcome.errors = if magnitude != 0.0 {
            DomainErrors::attributed(Domain::Agent, magnitude)
        } else {
            DomainErrors::none()
        };
        outcome.estimate = Some(mood);
        outcome.interactions += 1;
        outcome.event = StepEvent::Interaction(mood);

        if mood == Mood::Hostile && outcome.interactions >= self.config.hostile_interaction_limit {
            tracing::debug!("Hostile interaction limit reached, ending episode");
            outcome.done = true;
        }
    }

    fn can_reach_npc(&self, pos: Position) -> bool {
        let distance = pos.manhattan(&self.config.npc_position);
        match self.config.interaction {
            InteractionMode::Contact => distance <= 1,
            InteractionMode::Adjacent => distance == 1,
        }
    }

    fn finish_episode(&mut self) {
        self.active = false;
        self.episodes_completed += 1;
        if self.episodes_completed % self.config.mood_cycle_length == 0 {
            let previous = self.mood;
            self.mood = self.next_mood();
            tracing::info!(
                episode = self.episodes_completed,
                "NPC mood changed: {:?} -> {:?}",
                previous,
                self.mood
            );
        }
    }

    fn next_mood(&mut self) -> Mood {
        match self.config.mood_cycle {
            MoodCycle::RoundRobin => self.mood.next(),
            MoodCycle::Random => {
                let others: Vec<Mood> = Mood::ALL.into_iter().filter(|m| *m != self.mood).collect();
                others[self.rng.gen_range(0..others.len())]
            }
        }
    }

    fn start_position(&mut self) -> Position {
        let goal = self.config.goal_position;
        let npc = self.config.npc_position;
        let size = self.config.grid_size;

        match self.config.start {
            StartMode::Fixed => self.config.start_position,
            StartMode::RandomCorner => {
                let last = size - 1;
                let corners: Vec<Position> = [
                    Position::new(0, 0),
                    Position::new(last, 0),
                    Position::new(0, last),
                    Position::new(last, last),
                ]
                .into_iter()
                .filter(|p| *p != goal && *p != npc)
                .collect();
                corners[self.rng.gen_range(0..corners.len())]
            }
            StartMode::RandomCell => loop {
                let x = self.rng.gen_range(0..size);
                let candidate = Position::new(x, self.rng.gen_range(0..size));
                if candidate != goal && candidate != npc {
                    break candidate;
                }
            },
        }
    }
}

/// Scratch record for one step while it is being resolved.
struct Outcome {
    breakdown: RewardBreakdown,
    errors: DomainErrors,
    agent_pos: Position,
    estimate: Option<Mood>,
    interactions: u32,
    event: StepEvent,
    done: bool,
}

/// Whether `p` lies on at least one shortest path between `a` and `b`.
fn within_path_rectangle(a: Position, b: Position, p: Position) -> bool {
    let (x_lo, x_hi) = (a.x.min(b.x), a.x.max(b.x));
    let (y_lo, y_hi) = (a.y.min(b.y), a.y.max(b.y));
    (x_lo..=x_hi).contains(&p.x) && (y_lo..=y_hi).contains(&p.y)
}
