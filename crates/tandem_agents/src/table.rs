use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tandem_core::{Action, GridState, Mood, Position};

/// Explicit composite key for value tables.
///
/// Equality and hashing come from the derived field-wise contract, so two
/// snapshots that agree on these four fields share an entry regardless of
/// step or interaction counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub agent: Position,
    pub goal: Position,
    pub npc: Position,
    pub mood_estimate: Option<Mood>,
}

impl From<&GridState> for StateKey {
    fn from(s: &GridState) -> Self {
        Self {
            agent: s.agent_pos,
            goal: s.goal_pos,
            npc: s.npc_pos,
            mood_estimate: s.npc_mood_estimate,
        }
    }
}

/// Tabular action values, lazily initialised.
#[derive(Debug, Clone)]
pub struct QTable {
    values: HashMap<StateKey, [f64; Action::COUNT]>,
    initial: f64,
}

impl QTable {
    pub fn new(initial: f64) -> Self {
        Self {
            values: HashMap::new(),
            initial,
        }
    }

    /// Action values for `key`; unseen keys read as the initial value.
    pub fn values(&self, key: &StateKey) -> [f64; Action::COUNT] {
        self.values
            .get(key)
            .copied()
            .unwrap_or([self.initial; Action::COUNT])
    }

    pub fn get(&self, key: &StateKey, action: Action) -> f64 {
        self.values(key)[action.index()]
    }

    pub fn max_value(&self, key: &StateKey) -> f64 {
        self.values(key).into_iter().fold(f64::NEG_INFINITY, f64::max)
    }

    /// `r + γ · max_a Q(s', a)`, or just `r` on a terminal step.
    pub fn td_target(&self, reward: f64, next: &StateKey, discount: f64, done: bool) -> f64 {
        if done {
            reward
        } else {
            reward + discount * self.max_value(next)
        }
    }

    /// Q-learning step toward `target`. Returns the TD error.
    pub fn update(
        &mut self,
        key: StateKey,
        action: Action,
        target: f64,
        learning_rate: f64,
    ) -> f64 {
        let initial = self.initial;
        let row = self.values.entry(key).or_insert([initial; Action::COUNT]);
        let q = &mut row[action.index()];
        let td_error = target - *q;
        *q += learning_rate * td_error;
        td_error
    }

    /// Number of states with stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for QTable {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(x: i32, mood: Option<Mood>) -> StateKey {
        StateKey {
            agent: Position::new(x, 0),
            goal: Position::new(4, 4),
            npc: Position::new(2, 2),
            mood_estimate: mood,
        }
    }

    #[test]
    fn test_unseen_reads_initial() {
        let t = QTable::new(1.5);
        assert_eq!(t.values(&key(0, None)), [1.5; 5]);
        assert!(t.is_empty());
    }

    #[test]
    fn test_update_moves_toward_target() {
        let mut t = QTable::default();
        let k = key(0, None);
        let td = t.update(k, Action::Right, 10.0, 0.1);
        assert_eq!(td, 10.0);
        assert!((t.get(&k, Action::Right) - 1.0).abs() < 1e-12);
        assert_eq!(t.get(&k, Action::Left), 0.0);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_mood_estimate_separates_keys() {
        let mut t = QTable::default();
        t.update(key(1, Some(Mood::Hostile)), Action::Interact, -5.0, 1.0);
        assert_eq!(t.get(&key(1, Some(Mood::Hostile)), Action::Interact), -5.0);
        assert_eq!(t.get(&key(1, Some(Mood::Friendly)), Action::Interact), 0.0);
        assert_eq!(t.get(&key(1, None), Action::Interact), 0.0);
    }

    #[test]
    fn test_key_ignores_counters() {
        let mut a = GridState {
            agent_pos: Position::new(1, 1),
            goal_pos: Position::new(4, 4),
            npc_pos: Position::new(2, 2),
            npc_mood_estimate: None,
            interaction_count: 0,
            steps: 3,
        };
        let k1 = StateKey::from(&a);
        a.steps = 9;
        a.interaction_count = 2;
        assert_eq!(StateKey::from(&a), k1);
    }

    #[test]
    fn test_td_target() {
        let mut t = QTable::default();
        let next = key(2, None);
        t.update(next, Action::Down, 4.0, 1.0);
        assert_eq!(t.td_target(1.0, &next, 0.5, false), 3.0);
        assert_eq!(t.td_target(1.0, &next, 0.5, true), 1.0);
    }
}
