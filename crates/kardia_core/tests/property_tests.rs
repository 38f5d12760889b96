//! Property-based tests for the limbic state model and posture classifier.
//!
//! Verifies that bounded-update invariants hold for arbitrary input (including
//! out-of-range and non-finite values) and that classification is total and
//! deterministic over the whole state space.

use kardia_core::posture::{classify, PostureThresholds, PostureTracker};
use kardia_core::state::{LimbicDelta, LimbicState, Posture};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_state() -> impl Strategy<Value = LimbicState> {
    (
        0.0f32..=1.0,
        0.0f32..=1.0,
        0.0f32..=1.0,
        0.0f32..=1.0,
        0u64..10_000,
        0i64..2_000_000_000_000,
    )
        .prop_map(|(trust, warmth, arousal, valence, count, ts)| LimbicState {
            trust,
            warmth,
            arousal,
            valence,
            posture: Posture::Peer,
            interaction_count: count,
            last_interaction_ts: ts,
        })
}

/// Deltas with wildly out-of-range values, to exercise the clamp policy.
fn arb_wild_delta() -> impl Strategy<Value = LimbicDelta> {
    let wild = prop::option::of(prop_oneof![
        -100.0f32..=100.0,
        Just(f32::NAN),
        Just(f32::INFINITY),
        Just(f32::NEG_INFINITY),
    ]);
    (wild.clone(), wild.clone(), wild.clone(), wild).prop_map(
        |(trust, warmth, arousal, valence)| LimbicDelta {
            trust,
            warmth,
            arousal,
            valence,
            posture: None,
        },
    )
}

// ============================================================================
// Bounded-update invariant
// ============================================================================

proptest! {
    /// **Core invariant**: for all partial updates, applying never leaves any
    /// numeric field outside [0, 1], even when the delta supplies
    /// out-of-range or non-finite values.
    #[test]
    fn apply_never_escapes_bounds(state in arb_state(), delta in arb_wild_delta()) {
        let next = state.apply(&delta);
        prop_assert!(next.trust >= 0.0 && next.trust <= 1.0, "trust = {}", next.trust);
        prop_assert!(next.warmth >= 0.0 && next.warmth <= 1.0, "warmth = {}", next.warmth);
        prop_assert!(next.arousal >= 0.0 && next.arousal <= 1.0, "arousal = {}", next.arousal);
        prop_assert!(next.valence >= 0.0 && next.valence <= 1.0, "valence = {}", next.valence);
        prop_assert!(next.trust.is_finite());
        prop_assert!(next.warmth.is_finite());
        prop_assert!(next.arousal.is_finite());
        prop_assert!(next.valence.is_finite());
    }

    /// Applying a delta never touches counters or timestamp; those advance
    /// only inside the store's atomic mutation.
    #[test]
    fn apply_preserves_counters(state in arb_state(), delta in arb_wild_delta()) {
        let next = state.apply(&delta);
        prop_assert_eq!(next.interaction_count, state.interaction_count);
        prop_assert_eq!(next.last_interaction_ts, state.last_interaction_ts);
    }

    /// `clamped` is idempotent: clamping twice equals clamping once.
    #[test]
    fn clamped_idempotent(delta in arb_wild_delta()) {
        let once = delta.clamped();
        let twice = once.clamped();
        prop_assert_eq!(once, twice);
    }
}

// ============================================================================
// Classifier properties
// ============================================================================

proptest! {
    /// **Totality + determinism**: every valid state maps to exactly one
    /// posture, and an identical state always yields an identical posture.
    #[test]
    fn classify_total_and_deterministic(state in arb_state()) {
        let th = PostureThresholds::default();
        let a = classify(&state, &th);
        let b = classify(&state, &th);
        prop_assert_eq!(a, b);
    }

    /// The tracker always reports one of the four postures and never panics,
    /// whatever the observation sequence.
    #[test]
    fn tracker_total(initial in arb_state(), observations in prop::collection::vec(arb_state(), 0..32)) {
        let mut tracker = PostureTracker::new(&initial, PostureThresholds::default(), 0.3);
        for obs in &observations {
            let p = tracker.observe(obs);
            prop_assert!(matches!(
                p,
                Posture::Companion | Posture::Copilot | Posture::Peer | Posture::Expert
            ));
        }
    }

    /// A constant input stream converges: after enough identical
    /// observations the tracker's label stops changing.
    #[test]
    fn tracker_converges_on_constant_input(initial in arb_state(), target in arb_state()) {
        let mut tracker = PostureTracker::new(&initial, PostureThresholds::default(), 0.3);
        for _ in 0..200 {
            tracker.observe(&target);
        }
        let settled = tracker.current();
        for _ in 0..20 {
            prop_assert_eq!(tracker.observe(&target), settled);
        }
    }
}
