//! # Tandem Environment
//!
//! A 5×5 grid with one stationary non-player entity (NPC) between the
//! agent's start and the goal. Navigation mistakes are charged to the
//! State domain, social mistakes to the Agent domain, and never both on
//! the same step.
//!
//! The NPC's ground-truth mood persists across episodes and advances on a
//! fixed schedule of completed episodes; it is the only state that survives
//! `reset`.

mod render;
mod world;

pub use render::render;
pub use world::SocialGridWorld;
