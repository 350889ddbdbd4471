//! # Tandem Agents
//!
//! Consumers of the core. Every agent implements [`Agent`]; the two
//! integrated variants own a [`ValueCombiner`] holding one value table per
//! domain and differ only in where their blend weights come from:
//!
//! - [`MonolithicAgent`]: one table over the joint state, total reward.
//! - [`FixedIntegrationAgent`]: two domain tables, constant weights.
//! - [`ArousalIntegratedAgent`]: two domain tables, weights from the
//!   arousal integrator, learning and exploration scaled by arousal.
//!
//! Agents never reach into the environment; coupling is the `Transition`
//! in and an `Action` out.

mod agent;
mod combiner;
mod runner;
mod table;

pub use agent::{
    build_agent, Agent, AgentParams, ArousalIntegratedAgent, FixedIntegrationAgent, MonolithicAgent,
    StepReport, ValueTableView,
};
pub use combiner::{epsilon_greedy, greedy_action, ValueCombiner};
pub use runner::{run_episode, run_episode_with, EpisodeSummary};
pub use table::{QTable, StateKey};
