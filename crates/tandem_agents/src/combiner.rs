//! Value Combiner - one table per domain, blended per step
//!
//! The combiner never decides its own weights. It is handed
//! `IntegrationWeights` (fixed, or fresh from the arousal integrator) and
//! returns `w_state · Q_state + w_agent · Q_agent`.

use crate::table::{QTable, StateKey};
use rand::Rng;
use tandem_core::{Action, Domain, IntegrationWeights, Transition};

#[derive(Debug, Clone, Default)]
pub struct ValueCombiner {
    state: QTable,
    agent: QTable,
}

impl ValueCombiner {
    pub fn table(&self, domain: Domain) -> &QTable {
        match domain {
            Domain::State => &self.state,
            Domain::Agent => &self.agent,
        }
    }

    /// Blended action values for `key`.
    pub fn blended(&self, key: &StateKey, weights: IntegrationWeights) -> [f64; Action::COUNT] {
        weights.blend(&self.state.values(key), &self.agent.values(key))
    }

    /// Update each domain table from its own reward share. Returns the
    /// (state, agent) TD errors.
    pub fn learn(
        &mut self,
        transition: &Transition,
        learning_rates: (f64, f64),
        discount: f64,
    ) -> (f64, f64) {
        let key = StateKey::from(&transition.state);
        let next = StateKey::from(&transition.next_state);
        let (lr_state, lr_agent) = learning_rates;

        let target = self.state.td_target(
            transition.domain_reward(Domain::State),
            &next,
            discount,
            transition.done,
        );
        let td_state = self.state.update(key, transition.action, target, lr_state);

        let target = self.agent.td_target(
            transition.domain_reward(Domain::Agent),
            &next,
            discount,
            transition.done,
        );
        let td_agent = self.agent.update(key, transition.action, target, lr_agent);

        (td_state, td_agent)
    }
}

/// Highest-valued action; the lowest action index wins ties.
pub fn greedy_action(q: &[f64; Action::COUNT]) -> Action {
    let mut best = 0;
    for i in 1..Action::COUNT {
        if q[i] > q[best] {
            best = i;
        }
    }
    Action::ALL[best]
}

/// Uniformly random action with probability `epsilon`, else greedy.
pub fn epsilon_greedy<R: Rng + ?Sized>(
    q: &[f64; Action::COUNT],
    epsilon: f64,
    rng: &mut R,
) -> Action {
    if rng.gen::<f64>() < epsilon {
        Action::ALL[rng.gen_range(0..Action::COUNT)]
    } else {
        greedy_action(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tandem_core::Position;

    fn key() -> StateKey {
        StateKey {
            agent: Position::new(1, 1),
            goal: Position::new(4, 4),
            npc: Position::new(2, 2),
            mood_estimate: None,
        }
    }

    #[test]
    fn test_greedy_tie_break() {
        assert_eq!(greedy_action(&[0.0; 5]), Action::Up);
        assert_eq!(greedy_action(&[0.0, 2.0, 2.0, 1.0, -1.0]), Action::Down);
        let q = [-3.0, -2.0, -1.0, -4.0, -0.5];
        assert_eq!(greedy_action(&q), Action::Interact);
    }

    #[test]
    fn test_epsilon_zero_is_greedy() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let q = [0.0, 0.0, 0.0, 5.0, 0.0];
        for _ in 0..100 {
            assert_eq!(epsilon_greedy(&q, 0.0, &mut rng), Action::Right);
        }
    }

    #[test]
    fn test_epsilon_one_explores() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let q = [0.0, 0.0, 0.0, 5.0, 0.0];
        let picks: std::collections::HashSet<Action> =
            (0..200).map(|_| epsilon_greedy(&q, 1.0, &mut rng)).collect();
        assert_eq!(picks.len(), Action::COUNT);
    }

    #[test]
    fn test_blend_follows_weights() {
        let mut c = ValueCombiner::default();
        let k = key();
        c.state.update(k, Action::Right, 4.0, 1.0);
        c.agent.update(k, Action::Up, 8.0, 1.0);

        let pick = |w| greedy_action(&c.blended(&k, w));
        assert_eq!(pick(IntegrationWeights::STATE_ONLY), Action::Right);
        assert_eq!(pick(IntegrationWeights::AGENT_ONLY), Action::Up);
        let even = c.blended(&k, IntegrationWeights::EQUAL);
        assert_eq!(even[Action::Right.index()], 2.0);
        assert_eq!(even[Action::Up.index()], 4.0);
    }
}
