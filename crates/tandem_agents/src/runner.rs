use crate::agent::{Agent, StepReport};
use serde::{Deserialize, Serialize};
use tandem_core::{AgentKind, Mood, Result, StepEvent, Transition};
use tandem_env::SocialGridWorld;

/// Per-episode outcome, one line of run telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Zero-based index in the environment's completed-episode count.
    pub episode: u64,
    pub agent: AgentKind,
    /// NPC mood in force while the episode ran.
    pub mood: Mood,
    pub steps: u32,
    pub total_reward: f64,
    pub reached_goal: bool,
    pub interactions: u32,
    pub wall_collisions: u32,
    pub wasted_interactions: u32,
    /// Mean arousal per domain across the episode's steps, when tracked.
    pub mean_state_arousal: Option<f64>,
    pub mean_agent_arousal: Option<f64>,
}

/// Run one full episode, learning as it goes.
pub fn run_episode(env: &mut SocialGridWorld, agent: &mut dyn Agent) -> Result<EpisodeSummary> {
    run_episode_with(env, agent, |_, _| {})
}

/// Like `run_episode`, calling `on_step` after every learning update.
pub fn run_episode_with<F>(
    env: &mut SocialGridWorld,
    agent: &mut dyn Agent,
    mut on_step: F,
) -> Result<EpisodeSummary>
where
    F: FnMut(&Transition, &StepReport),
{
    let episode = env.episodes_completed();
    let mood = env.mood();
    let mut state = env.reset(None);
    agent.reset_episode();

    let mut summary = EpisodeSummary {
        episode,
        agent: agent.kind(),
        mood,
        steps: 0,
        total_reward: 0.0,
        reached_goal: false,
        interactions: 0,
        wall_collisions: 0,
        wasted_interactions: 0,
        mean_state_arousal: None,
        mean_agent_arousal: None,
    };
    let mut arousal_sum = (0.0, 0.0);
    let mut arousal_steps = 0u32;

    loop {
        let action = agent.select_action(&state)?;
        let transition = env.step(action)?;
        let report = agent.update(&transition)?;
        on_step(&transition, &report);

        summary.steps += 1;
        summary.total_reward += transition.reward;
        match transition.event {
            StepEvent::Interaction(_) => summary.interactions += 1,
            StepEvent::WallCollision => summary.wall_collisions += 1,
            StepEvent::WastedInteraction => summary.wasted_interactions += 1,
            StepEvent::Moved => {}
        }
        if let Some(reading) = report.arousal {
            arousal_sum.0 += reading.state;
            arousal_sum.1 += reading.agent;
            arousal_steps += 1;
        }

        if transition.done {
            summary.reached_goal = transition.reached_goal();
            break;
        }
        state = transition.next_state;
    }

    if arousal_steps > 0 {
        let n = f64::from(arousal_steps);
        summary.mean_state_arousal = Some(arousal_sum.0 / n);
        summary.mean_agent_arousal = Some(arousal_sum.1 / n);
    }

    tracing::debug!(
        episode = summary.episode,
        steps = summary.steps,
        reward = summary.total_reward,
        goal = summary.reached_goal,
        "Episode finished"
    );
    Ok(summary)
}
