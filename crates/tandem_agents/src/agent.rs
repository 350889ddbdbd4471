use crate::combiner::{epsilon_greedy, ValueCombiner};
use crate::table::{QTable, StateKey};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tandem_core::{
    Action, AgentKind, Domain, GridState, IntegrationWeights, Result, TandemConfig, TandemError,
    TrainingConfig, Transition,
};
use tandem_limbic::{ArousalReading, ArousalSystem};

/// Learning hyperparameters shared by every variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentParams {
    pub learning_rate: f64,
    pub discount: f64,
    pub epsilon: f64,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for AgentParams {
    fn from(t: &TrainingConfig) -> Self {
        Self {
            learning_rate: t.learning_rate,
            discount: t.discount,
            epsilon: t.epsilon,
        }
    }
}

/// What an agent learned from one transition, for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// (state, agent) TD errors; the monolithic agent reports its single
    /// error in the state slot.
    pub td_errors: (f64, f64),
    /// Weights used to blend the domain tables this step.
    pub weights: Option<IntegrationWeights>,
    /// Arousal pair, for the arousal-integrated agent only.
    pub arousal: Option<ArousalReading>,
}

/// Read-only view of an agent's value tables.
#[derive(Debug, Clone, Copy)]
pub enum ValueTableView<'a> {
    Single(&'a QTable),
    Split {
        state: &'a QTable,
        agent: &'a QTable,
    },
}

impl ValueTableView<'_> {
    /// Total number of stored states across tables.
    pub fn len(&self) -> usize {
        match self {
            ValueTableView::Single(t) => t.len(),
            ValueTableView::Split { state, agent } => state.len() + agent.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capability set shared by the trainable agent variants.
pub trait Agent: Send {
    fn kind(&self) -> AgentKind;

    /// Choose the next action for `state`.
    fn select_action(&mut self, state: &GridState) -> Result<Action>;

    /// Learn from the transition that followed the selected action.
    fn update(&mut self, transition: &Transition) -> Result<StepReport>;

    /// Call before the first step of every episode.
    fn reset_episode(&mut self);

    fn value_table(&self) -> ValueTableView<'_>;
}

// ============================================================================
// Monolithic
// ============================================================================

/// Single value table over the joint state, trained on the total reward.
pub struct MonolithicAgent {
    params: AgentParams,
    table: QTable,
    rng: ChaCha8Rng,
}

impl MonolithicAgent {
    pub fn new(params: AgentParams, seed: u64) -> Self {
        Self {
            params,
            table: QTable::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Agent for MonolithicAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Monolithic
    }

    fn select_action(&mut self, state: &GridState) -> Result<Action> {
        let q = self.table.values(&StateKey::from(state));
        Ok(epsilon_greedy(&q, self.params.epsilon, &mut self.rng))
    }

    fn update(&mut self, t: &Transition) -> Result<StepReport> {
        let key = StateKey::from(&t.state);
        let next = StateKey::from(&t.next_state);
        let target = self.table.td_target(t.reward, &next, self.params.discount, t.done);
        let td = self.table.update(key, t.action, target, self.params.learning_rate);
        Ok(StepReport {
            td_errors: (td, 0.0),
            weights: None,
            arousal: None,
        })
    }

    fn reset_episode(&mut self) {}

    fn value_table(&self) -> ValueTableView<'_> {
        ValueTableView::Single(&self.table)
    }
}

// ============================================================================
// Fixed integration
// ============================================================================

/// Two domain tables blended with constant weights.
pub struct FixedIntegrationAgent {
    params: AgentParams,
    weights: IntegrationWeights,
    combiner: ValueCombiner,
    rng: ChaCha8Rng,
}

impl FixedIntegrationAgent {
    pub fn new(params: AgentParams, weights: IntegrationWeights, seed: u64) -> Self {
        Self {
            params,
            weights,
            combiner: ValueCombiner::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn weights(&self) -> IntegrationWeights {
        self.weights
    }
}

impl Agent for FixedIntegrationAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Fixed
    }

    fn select_action(&mut self, state: &GridState) -> Result<Action> {
        let q = self.combiner.blended(&StateKey::from(state), self.weights);
        Ok(epsilon_greedy(&q, self.params.epsilon, &mut self.rng))
    }

    fn update(&mut self, t: &Transition) -> Result<StepReport> {
        let lr = self.params.learning_rate;
        let td_errors = self.combiner.learn(t, (lr, lr), self.params.discount);
        Ok(StepReport {
            td_errors,
            weights: Some(self.weights),
            arousal: None,
        })
    }

    fn reset_episode(&mut self) {}

    fn value_table(&self) -> ValueTableView<'_> {
        ValueTableView::Split {
            state: self.combiner.table(Domain::State),
            agent: self.combiner.table(Domain::Agent),
        }
    }
}

// ============================================================================
// Arousal integration
// ============================================================================

/// Two domain tables blended with weights from the arousal integrator.
///
/// Arousal also scales each table's learning rate and the exploration rate,
/// both computed from signals no later than the current step.
pub struct ArousalIntegratedAgent {
    params: AgentParams,
    arousal: ArousalSystem,
    combiner: ValueCombiner,
    rng: ChaCha8Rng,
}

impl ArousalIntegratedAgent {
    pub fn new(params: AgentParams, arousal: ArousalSystem, seed: u64) -> Self {
        Self {
            params,
            arousal,
            combiner: ValueCombiner::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn arousal(&self) -> &ArousalSystem {
        &self.arousal
    }

    /// Exploration blended across domains by the current weights.
    fn exploration_rate(&self, weights: IntegrationWeights) -> f64 {
        let epsilon = self.params.epsilon;
        Domain::ALL
            .iter()
            .map(|d| weights.get(*d) * self.arousal.monitor(*d).exploration_rate(epsilon))
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }
}

impl Agent for ArousalIntegratedAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Arousal
    }

    fn select_action(&mut self, state: &GridState) -> Result<Action> {
        let weights = self.arousal.weights()?;
        let q = self.combiner.blended(&StateKey::from(state), weights);
        let epsilon = self.exploration_rate(weights);
        Ok(epsilon_greedy(&q, epsilon, &mut self.rng))
    }

    fn update(&mut self, t: &Transition) -> Result<StepReport> {
        let reading = self.arousal.observe(t)?;
        let base = self.params.learning_rate;
        let lr_state = self.arousal.monitor(Domain::State).learning_rate(base).min(1.0);
        let lr_agent = self.arousal.monitor(Domain::Agent).learning_rate(base).min(1.0);
        let td_errors = self
            .combiner
            .learn(t, (lr_state, lr_agent), self.params.discount);
        Ok(StepReport {
            td_errors,
            weights: Some(reading.weights),
            arousal: Some(reading),
        })
    }

    fn reset_episode(&mut self) {
        self.arousal.begin_episode();
    }

    fn value_table(&self) -> ValueTableView<'_> {
        ValueTableView::Split {
            state: self.combiner.table(Domain::State),
            agent: self.combiner.table(Domain::Agent),
        }
    }
}

/// Construct the variant named by `kind` from a validated config.
pub fn build_agent(kind: AgentKind, config: &TandemConfig, seed: u64) -> Result<Box<dyn Agent>> {
    config.training.validate()?;
    let params = AgentParams::from(&config.training);
    Ok(match kind {
        AgentKind::Monolithic => Box::new(MonolithicAgent::new(params, seed)),
        AgentKind::Fixed => {
            let [s, a] = config.integration.fixed_weights;
            let weights = IntegrationWeights::normalized(s, a).map_err(|e| match e {
                TandemError::InvalidSignal { name, value } => TandemError::InvalidConfiguration(
                    format!("fixed_weights: {name} = {value} is not finite"),
                ),
                other => other,
            })?;
            Box::new(FixedIntegrationAgent::new(params, weights, seed))
        }
        AgentKind::Arousal => {
            let system = ArousalSystem::from_config(&config.arousal, &config.integration)?;
            Box::new(ArousalIntegratedAgent::new(params, system, seed))
        }
    })
}
