//! # Tandem Limbic System
//!
//! Fast, per-step importance signals for the two domains.
//!
//! - **Monitor**: one per domain. Maps that domain's prediction error and
//!   reward into a bounded arousal scalar with an inverted-U overload penalty.
//! - **Integrator**: a pure function from the arousal pair to normalised
//!   integration weights (softmax or hard gate).
//! - **System**: owns one monitor per domain plus an integrator and routes
//!   each domain's attribution from a `Transition` to its own monitor only.
//!
//! Everything runs synchronously inside one timestep; there is no background
//! task and no shared state between instances.

mod integrator;
mod monitor;
mod system;

pub use integrator::{ArousalIntegrator, IntegrationStrategy};
pub use monitor::{ArousalComponents, ArousalMonitor, ArousalStatistics};
pub use system::{ArousalReading, ArousalSystem};
