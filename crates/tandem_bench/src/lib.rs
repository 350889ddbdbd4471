//! tandem_bench: trajectory tests for the arousal loop.
//!
//! Validates behaviour over whole episodes and long runs:
//! - The canonical shortest path through a friendly NPC
//! - Mood phases over hundreds of episodes
//! - Overload damping (hostile contact arouses less than friendly contact)
//! - Stress curve differentiation (symmetric vs one-sided penalty)

use tandem_core::{Action, Transition};
use tandem_env::SocialGridWorld;
use tandem_limbic::{ArousalReading, ArousalSystem};

/// Shortest route from the default start to the default goal that walks
/// through the default NPC cell.
pub const THROUGH_NPC: [Action; 8] = [
    Action::Right,
    Action::Right,
    Action::Down,
    Action::Down,
    Action::Right,
    Action::Right,
    Action::Down,
    Action::Down,
];

/// Play `actions` as one episode, feeding every transition to `system`.
/// Stops early if the episode ends.
pub fn simulate(
    world: &mut SocialGridWorld,
    system: &mut ArousalSystem,
    actions: &[Action],
) -> tandem_core::Result<Vec<(Transition, ArousalReading)>> {
    world.reset(None);
    system.begin_episode();
    let mut trace = Vec::with_capacity(actions.len());
    for &action in actions {
        let t = world.step(action)?;
        let reading = system.observe(&t)?;
        let done = t.done;
        trace.push((t, reading));
        if done {
            break;
        }
    }
    Ok(trace)
}
