//! # Tandem Core
//!
//! Shared vocabulary of the arousal integration harness: the grid data
//! model, the per-domain error record, integration weights, the error type
//! and the TOML configuration surface.
//!
//! Nothing in this crate holds mutable global state. Each environment and
//! each pair of arousal monitors owns its own data, so independent runs can
//! live on separate threads without coordination.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AgentKind, ArousalConfig, EnvironmentConfig, IntegrationConfig, InteractionMode, MonitorConfig,
    MoodCycle, StartMode, StrategyKind, StressCurve, TandemConfig, TrainingConfig,
};
pub use error::{ensure_finite, Result, TandemError};
pub use types::{
    errors, rewards, Action, Domain, DomainErrors, GridState, IntegrationWeights, Mood, Position,
    RewardBreakdown, StepBudget, StepEvent, Transition,
};
