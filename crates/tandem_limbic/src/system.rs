//! Paired arousal monitors plus integrator
//!
//! The ArousalSystem is the per-run coordinator for the two domains. Per
//! step it:
//! - routes the State attribution of a transition to the State monitor only
//! - routes the Agent attribution to the Agent monitor only
//! - asks the integrator for weights over the fresh arousal pair

use crate::integrator::ArousalIntegrator;
use crate::monitor::ArousalMonitor;
use serde::{Deserialize, Serialize};
use tandem_core::{
    ensure_finite, ArousalConfig, Domain, IntegrationConfig, IntegrationWeights, Result, StepBudget,
    Transition,
};

/// Telemetry for one step: both arousal values and the weights derived
/// from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArousalReading {
    pub state: f64,
    pub agent: f64,
    pub weights: IntegrationWeights,
}

impl ArousalReading {
    pub fn get(&self, domain: Domain) -> f64 {
        match domain {
            Domain::State => self.state,
            Domain::Agent => self.agent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArousalSystem {
    state: ArousalMonitor,
    agent: ArousalMonitor,
    integrator: ArousalIntegrator,

    /// Return both monitors to resting arousal when an episode begins.
    reset_on_episode_start: bool,

    last: Option<ArousalReading>,
}

impl ArousalSystem {
    pub fn new(
        state: ArousalMonitor,
        agent: ArousalMonitor,
        integrator: ArousalIntegrator,
        reset_on_episode_start: bool,
    ) -> Self {
        debug_assert_eq!(state.domain(), Domain::State);
        debug_assert_eq!(agent.domain(), Domain::Agent);
        Self {
            state,
            agent,
            integrator,
            reset_on_episode_start,
            last: None,
        }
    }

    pub fn from_config(arousal: &ArousalConfig, integration: &IntegrationConfig) -> Result<Self> {
        arousal.validate()?;
        let smoothing = arousal.baseline_smoothing;
        let state = ArousalMonitor::with_smoothing(Domain::State, arousal.state, smoothing)?;
        let agent = ArousalMonitor::with_smoothing(Domain::Agent, arousal.agent, smoothing)?;
        let integrator = ArousalIntegrator::from_config(integration)?;
        Ok(Self::new(
            state,
            agent,
            integrator,
            arousal.reset_arousal_on_episode_start,
        ))
    }

    /// Call once at the start of every episode.
    pub fn begin_episode(&mut self) {
        if self.reset_on_episode_start {
            self.state.reset();
            self.agent.reset();
        }
        self.last = None;
    }

    /// Feed one transition. Each monitor sees only its own domain's error
    /// and reward share.
    pub fn observe(&mut self, transition: &Transition) -> Result<ArousalReading> {
        self.observe_signals(
            transition.domain_errors.state(),
            transition.domain_reward(Domain::State),
            transition.domain_errors.agent(),
            transition.domain_reward(Domain::Agent),
            Some(transition.budget),
        )
    }

    /// Feed raw per-domain signals. All four are checked before either
    /// monitor is touched, so a bad signal leaves the system unchanged.
    pub fn observe_signals(
        &mut self,
        state_error: f64,
        state_reward: f64,
        agent_error: f64,
        agent_reward: f64,
        budget: Option<StepBudget>,
    ) -> Result<ArousalReading> {
        ensure_finite("state_error", state_error)?;
        ensure_finite("state_reward", state_reward)?;
        ensure_finite("agent_error", agent_error)?;
        ensure_finite("agent_reward", agent_reward)?;

        let (state, agent) = match budget {
            Some(budget) => (
                self.state.update_timed(state_error, state_reward, budget)?,
                self.agent.update_timed(agent_error, agent_reward, budget)?,
            ),
            None => (
                self.state.update(state_error, state_reward)?,
                self.agent.update(agent_error, agent_reward)?,
            ),
        };

        let weights = self.integrator.combine(state, agent)?;
        let reading = ArousalReading {
            state,
            agent,
            weights,
        };
        self.last = Some(reading);
        Ok(reading)
    }

    /// Weights over the current arousal pair, without updating anything.
    pub fn weights(&self) -> Result<IntegrationWeights> {
        self.integrator.combine(self.state.current(), self.agent.current())
    }

    /// Reading from the latest `observe` in this episode.
    pub fn last_reading(&self) -> Option<ArousalReading> {
        self.last
    }

    pub fn monitor(&self, domain: Domain) -> &ArousalMonitor {
        match domain {
            Domain::State => &self.state,
            Domain::Agent => &self.agent,
        }
    }

    pub fn integrator(&self) -> &ArousalIntegrator {
        &self.integrator
    }

    pub fn resets_on_episode_start(&self) -> bool {
        self.reset_on_episode_start
    }
}
