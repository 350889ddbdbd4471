use thiserror::Error;

/// Errors raised by the simulated core.
///
/// Every variant is a programmer error on the caller's side: the core is
/// pure and deterministic, so nothing here is worth retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TandemError {
    /// Action index outside the fixed discrete action set.
    #[error("invalid action index {0} (expected 0..{max})", max = crate::types::Action::COUNT)]
    InvalidAction(usize),

    /// Non-finite prediction error, reward or arousal value.
    #[error("invalid signal: {name} = {value} is not finite")]
    InvalidSignal { name: &'static str, value: f64 },

    /// Configuration value outside its sane range, caught at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// `step` called before `reset` or after the episode terminated.
    #[error("no active episode: call reset() before step()")]
    EpisodeNotActive,
}

pub type Result<T> = std::result::Result<T, TandemError>;

/// Reject NaN and infinities before they reach a softmax or penalty term.
#[inline]
pub fn ensure_finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TandemError::InvalidSignal { name, value })
    }
}

pub(crate) fn invalid_config(msg: impl Into<String>) -> TandemError {
    TandemError::InvalidConfiguration(msg.into())
}
