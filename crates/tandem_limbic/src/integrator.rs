//! Arousal Integrator - turning two arousal traces into blend weights
//!
//! Both strategies are pure functions of the arousal pair: no history, no
//! internal state.

use serde::{Deserialize, Serialize};
use tandem_core::{
    ensure_finite, IntegrationConfig, IntegrationWeights, Result, StrategyKind, TandemError,
};

/// How the arousal pair is mapped to weights. Fixed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStrategy {
    /// Softmax over `arousal / temperature`.
    Weighted { temperature: f64 },
    /// Winner-take-all once the gap exceeds `threshold`, else equal weights.
    Gated { threshold: f64 },
}

impl IntegrationStrategy {
    pub fn from_config(config: &IntegrationConfig) -> Self {
        match config.strategy {
            StrategyKind::Weighted => IntegrationStrategy::Weighted {
                temperature: config.temperature,
            },
            StrategyKind::Gated => IntegrationStrategy::Gated {
                threshold: config.gate_threshold,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            IntegrationStrategy::Weighted { temperature } => {
                if !temperature.is_finite() || temperature <= 0.0 {
                    return Err(TandemError::InvalidConfiguration(format!(
                        "temperature must be finite and > 0, got {temperature}"
                    )));
                }
            }
            IntegrationStrategy::Gated { threshold } => {
                if !threshold.is_finite() || threshold < 0.0 {
                    return Err(TandemError::InvalidConfiguration(format!(
                        "gate threshold must be finite and >= 0, got {threshold}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArousalIntegrator {
    strategy: IntegrationStrategy,
}

impl ArousalIntegrator {
    pub fn new(strategy: IntegrationStrategy) -> Result<Self> {
        strategy.validate()?;
        Ok(Self { strategy })
    }

    pub fn from_config(config: &IntegrationConfig) -> Result<Self> {
        Self::new(IntegrationStrategy::from_config(config))
    }

    pub fn strategy(&self) -> IntegrationStrategy {
        self.strategy
    }

    /// Weights for the current (state, agent) arousal pair.
    pub fn combine(&self, arousal_state: f64, arousal_agent: f64) -> Result<IntegrationWeights> {
        let s = ensure_finite("arousal_state", arousal_state)?;
        let a = ensure_finite("arousal_agent", arousal_agent)?;
        Ok(match self.strategy {
            IntegrationStrategy::Weighted { temperature } => weighted(s, a, temperature),
            IntegrationStrategy::Gated { threshold } => gated(s, a, threshold),
        })
    }
}

/// Two-way softmax, written as a logistic of the scaled gap so that tiny
/// temperatures saturate to hard selection instead of overflowing.
fn weighted(s: f64, a: f64, temperature: f64) -> IntegrationWeights {
    let gap = (s - a) / temperature;
    IntegrationWeights {
        state: 1.0 / (1.0 + (-gap).exp()),
        agent: 1.0 / (1.0 + gap.exp()),
    }
}

/// Exact ties always fall through to equal weights.
fn gated(s: f64, a: f64, threshold: f64) -> IntegrationWeights {
    if (s - a).abs() > threshold {
        if s > a {
            IntegrationWeights::STATE_ONLY
        } else {
            IntegrationWeights::AGENT_ONLY
        }
    } else {
        IntegrationWeights::EQUAL
    }
}
