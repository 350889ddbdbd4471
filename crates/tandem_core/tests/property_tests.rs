//! Property-based tests for tandem_core.
//!
//! Uses proptest to verify the data-model invariants for all inputs,
//! not just hand-picked examples.

use proptest::prelude::*;
use tandem_core::{errors, Action, Domain, DomainErrors, IntegrationWeights, Mood, Position};

// ============================================================================
// Strategies
// ============================================================================

fn arb_mood() -> impl Strategy<Value = Mood> {
    prop::sample::select(Mood::ALL.to_vec())
}

fn arb_position() -> impl Strategy<Value = Position> {
    (0i32..5, 0i32..5).prop_map(|(x, y)| Position::new(x, y))
}

fn arb_q() -> impl Strategy<Value = [f64; Action::COUNT]> {
    prop::array::uniform5(-20.0f64..20.0)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Normalised weights always sum to one, whatever the raw magnitudes.
    #[test]
    fn normalized_weights_sum_to_one(s in 0.0f64..1e6, a in 0.0f64..1e6) {
        let w = IntegrationWeights::normalized(s, a).unwrap();
        prop_assert!((w.state + w.agent - 1.0).abs() < 1e-9);
        prop_assert!(w.state >= 0.0 && w.agent >= 0.0);
    }

    /// Blending with one-hot weights returns the selected domain's vector.
    #[test]
    fn one_hot_blend_selects_domain(qs in arb_q(), qa in arb_q()) {
        prop_assert_eq!(IntegrationWeights::STATE_ONLY.blend(&qs, &qa), qs);
        prop_assert_eq!(IntegrationWeights::AGENT_ONLY.blend(&qs, &qa), qa);
    }

    /// Surprise is bounded in [floor, 1] and maximal without a belief.
    #[test]
    fn surprise_bounded(actual in arb_mood(), belief in prop::option::of(arb_mood())) {
        let s = actual.surprise_given(belief);
        prop_assert!(s >= errors::SURPRISE_FLOOR && s <= 1.0);
        if belief.is_none() {
            prop_assert_eq!(s, 1.0);
        }
    }

    /// Attributed errors never leak into the other domain.
    #[test]
    fn attribution_is_exclusive(magnitude in 0.01f64..100.0, state_side in any::<bool>()) {
        let domain = if state_side { Domain::State } else { Domain::Agent };
        let other = if state_side { Domain::Agent } else { Domain::State };
        let e = DomainErrors::attributed(domain, magnitude);
        prop_assert_eq!(e.get(domain), magnitude);
        prop_assert_eq!(e.get(other), 0.0);
        prop_assert_eq!(e.active_domain(), Some(domain));
    }

    #[test]
    fn manhattan_is_symmetric(a in arb_position(), b in arb_position()) {
        prop_assert_eq!(a.manhattan(&b), b.manhattan(&a));
        prop_assert_eq!(a.manhattan(&a), 0);
    }
}

#[test]
fn every_move_changes_position_by_one() {
    let origin = Position::new(2, 2);
    for action in Action::ALL.into_iter().filter(|a| a.is_move()) {
        let next = origin.offset(action.delta().unwrap());
        assert_eq!(origin.manhattan(&next), 1, "{action:?}");
    }
    assert!(Action::Interact.delta().is_none());
}
