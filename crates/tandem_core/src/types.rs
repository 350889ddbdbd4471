//! Data model shared by the environment, the arousal machinery and agents.
//!
//! Everything here is a plain value: snapshots are produced fresh on every
//! step and never mutated afterwards.

use crate::error::{Result, TandemError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Reward table
// ============================================================================

/// Fixed reward table. Values must match exactly for compatibility.
pub mod rewards {
    pub const GOAL: f64 = 10.0;
    pub const STEP: f64 = -0.1;
    pub const HOSTILE: f64 = -5.0;
    pub const FRIENDLY: f64 = 1.0;
    pub const NEUTRAL: f64 = 0.0;
    pub const WALL: f64 = -1.0;
    /// Interact issued with nobody in reach.
    pub const WASTED_INTERACT: f64 = -0.5;
}

/// Error magnitudes attributed to a domain on an event step.
pub mod errors {
    pub const WALL: f64 = 1.0;
    pub const WASTED_INTERACT: f64 = 0.5;
    pub const HOSTILE: f64 = 5.0;
    pub const FRIENDLY: f64 = 1.0;
    /// Floor on interaction surprise so a correctly predicted outcome still
    /// registers as an event.
    pub const SURPRISE_FLOOR: f64 = 0.25;
}

// ============================================================================
// Grid geometry
// ============================================================================

/// Integer grid coordinate. `x` grows right, `y` grows down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn offset(&self, (dx, dy): (i32, i32)) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }

    pub fn in_bounds(&self, size: i32) -> bool {
        (0..size).contains(&self.x) && (0..size).contains(&self.y)
    }
}

impl From<[i32; 2]> for Position {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Position> for [i32; 2] {
    fn from(p: Position) -> Self {
        [p.x, p.y]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// The fixed discrete action set: four moves plus interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Interact,
}

impl Action {
    pub const COUNT: usize = 5;
    pub const ALL: [Action; Action::COUNT] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::Interact,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Fails fast on indices outside the action set.
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(TandemError::InvalidAction(index))
    }

    /// Grid delta for movement actions; `None` for `Interact`.
    pub fn delta(self) -> Option<(i32, i32)> {
        match self {
            Action::Up => Some((0, -1)),
            Action::Down => Some((0, 1)),
            Action::Left => Some((-1, 0)),
            Action::Right => Some((1, 0)),
            Action::Interact => None,
        }
    }

    pub fn is_move(self) -> bool {
        self.delta().is_some()
    }
}

impl TryFrom<u8> for Action {
    type Error = TandemError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_index(value as usize)
    }
}

// ============================================================================
// NPC mood
// ============================================================================

/// Ground-truth disposition of the non-player entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Friendly,
    Neutral,
    Hostile,
}

impl Mood {
    pub const ALL: [Mood; 3] = [Mood::Friendly, Mood::Neutral, Mood::Hostile];

    /// Position on the friendly→hostile axis.
    pub fn rank(self) -> u8 {
        match self {
            Mood::Friendly => 0,
            Mood::Neutral => 1,
            Mood::Hostile => 2,
        }
    }

    /// Next mood in round-robin order.
    pub fn next(self) -> Mood {
        match self {
            Mood::Friendly => Mood::Neutral,
            Mood::Neutral => Mood::Hostile,
            Mood::Hostile => Mood::Friendly,
        }
    }

    /// Interaction reward for this ground-truth mood.
    pub fn interaction_reward(self) -> f64 {
        match self {
            Mood::Friendly => rewards::FRIENDLY,
            Mood::Neutral => rewards::NEUTRAL,
            Mood::Hostile => rewards::HOSTILE,
        }
    }

    /// Agent-domain error magnitude before surprise scaling.
    pub fn interaction_error(self) -> f64 {
        match self {
            Mood::Friendly => errors::FRIENDLY,
            Mood::Neutral => 0.0,
            Mood::Hostile => errors::HOSTILE,
        }
    }

    /// How unexpected observing `self` is, given the agent's belief.
    ///
    /// Unknown belief is maximal surprise; a correct belief still yields
    /// `SURPRISE_FLOOR`.
    pub fn surprise_given(self, estimate: Option<Mood>) -> f64 {
        match estimate {
            None => 1.0,
            Some(belief) => {
                let distance = f64::from(self.rank().abs_diff(belief.rank())) / 2.0;
                distance.max(errors::SURPRISE_FLOOR)
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Friendly => "FRIENDLY",
            Mood::Neutral => "NEUTRAL",
            Mood::Hostile => "HOSTILE",
        }
    }
}

// ============================================================================
// Domains and error attribution
// ============================================================================

/// One of the two specialised subproblems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Navigation.
    State,
    /// Social assessment.
    Agent,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::State, Domain::Agent];
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::State => f.write_str("state"),
            Domain::Agent => f.write_str("agent"),
        }
    }
}

/// Signed error magnitude per domain for one step.
///
/// Built only through the constructors below, so at most one entry is ever
/// non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DomainErrors {
    state: f64,
    agent: f64,
}

impl DomainErrors {
    /// Plain step with no event.
    pub fn none() -> Self {
        Self::default()
    }

    /// Attribute `magnitude` to `domain` only.
    pub fn attributed(domain: Domain, magnitude: f64) -> Self {
        match domain {
            Domain::State => Self {
                state: magnitude,
                agent: 0.0,
            },
            Domain::Agent => Self {
                state: 0.0,
                agent: magnitude,
            },
        }
    }

    pub fn get(&self, domain: Domain) -> f64 {
        match domain {
            Domain::State => self.state,
            Domain::Agent => self.agent,
        }
    }

    pub fn state(&self) -> f64 {
        self.state
    }

    pub fn agent(&self) -> f64 {
        self.agent
    }

    /// Domain carrying a non-zero error, if any.
    pub fn active_domain(&self) -> Option<Domain> {
        if self.state != 0.0 {
            Some(Domain::State)
        } else if self.agent != 0.0 {
            Some(Domain::Agent)
        } else {
            None
        }
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Immutable environment snapshot as seen by the agent.
///
/// Ground-truth mood is deliberately absent: only the agent's estimate,
/// which may lag the truth, is observable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridState {
    pub agent_pos: Position,
    pub goal_pos: Position,
    pub npc_pos: Position,
    /// `None` until the first interaction of the episode.
    pub npc_mood_estimate: Option<Mood>,
    pub interaction_count: u32,
    pub steps: u32,
}

/// Additive decomposition of a step's reward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub step: f64,
    pub goal: f64,
    pub interaction: f64,
    pub collision: f64,
    pub wasted: f64,
}

impl RewardBreakdown {
    pub fn total(&self) -> f64 {
        self.step + self.goal + self.interaction + self.collision + self.wasted
    }

    /// Share of the reward attributable to one domain.
    pub fn for_domain(&self, domain: Domain) -> f64 {
        match domain {
            Domain::State => self.step + self.goal + self.collision + self.wasted,
            Domain::Agent => self.interaction,
        }
    }
}

/// Steps consumed so far against the episode limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepBudget {
    pub used: u32,
    pub limit: u32,
}

impl StepBudget {
    /// Fraction of the budget still available, in [0, 1].
    pub fn remaining_fraction(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        let remaining = self.limit.saturating_sub(self.used);
        f64::from(remaining) / f64::from(self.limit)
    }
}

/// What happened on a step, beyond the reward number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEvent {
    Moved,
    WallCollision,
    Interaction(Mood),
    WastedInteraction,
}

/// Record of one environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: GridState,
    pub action: Action,
    pub reward: f64,
    pub next_state: GridState,
    pub done: bool,
    pub event: StepEvent,
    pub domain_errors: DomainErrors,
    pub breakdown: RewardBreakdown,
    pub budget: StepBudget,
}

impl Transition {
    pub fn domain_reward(&self, domain: Domain) -> f64 {
        self.breakdown.for_domain(domain)
    }

    pub fn reached_goal(&self) -> bool {
        self.breakdown.goal > 0.0
    }
}

// ============================================================================
// Integration weights
// ============================================================================

/// Normalised (state, agent) weight pair. Always sums to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrationWeights {
    pub state: f64,
    pub agent: f64,
}

impl IntegrationWeights {
    pub const EQUAL: IntegrationWeights = IntegrationWeights {
        state: 0.5,
        agent: 0.5,
    };
    pub const STATE_ONLY: IntegrationWeights = IntegrationWeights {
        state: 1.0,
        agent: 0.0,
    };
    pub const AGENT_ONLY: IntegrationWeights = IntegrationWeights {
        state: 0.0,
        agent: 1.0,
    };

    /// Normalise a non-negative pair. A zero pair falls back to equal weights.
    pub fn normalized(state: f64, agent: f64) -> Result<Self> {
        crate::error::ensure_finite("weight_state", state)?;
        crate::error::ensure_finite("weight_agent", agent)?;
        if state < 0.0 || agent < 0.0 {
            return Err(crate::error::invalid_config(format!(
                "integration weights must be non-negative, got ({state}, {agent})"
            )));
        }
        let sum = state + agent;
        if sum == 0.0 {
            return Ok(Self::EQUAL);
        }
        let state = state / sum;
        Ok(Self {
            state,
            agent: 1.0 - state,
        })
    }

    pub fn get(&self, domain: Domain) -> f64 {
        match domain {
            Domain::State => self.state,
            Domain::Agent => self.agent,
        }
    }

    /// Element-wise `w_state · q_state + w_agent · q_agent`.
    pub fn blend(
        &self,
        q_state: &[f64; Action::COUNT],
        q_agent: &[f64; Action::COUNT],
    ) -> [f64; Action::COUNT] {
        std::array::from_fn(|i| self.state * q_state[i] + self.agent * q_agent[i])
    }

    /// Domain with strictly higher weight; `None` on a tie.
    pub fn dominant(&self) -> Option<Domain> {
        if self.state > self.agent {
            Some(Domain::State)
        } else if self.agent > self.state {
            Some(Domain::Agent)
        } else {
            None
        }
    }
}
