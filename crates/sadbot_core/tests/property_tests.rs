//! Property-based tests for sadbot_core.
//!
//! Uses proptest to verify the affect invariants for ALL score sequences,
//! not just hand-picked examples.

use proptest::prelude::*;
use sadbot_core::{
    AffectConfig, AffectDynamics, AffectModel, AffectPolicy, AffectState, ExpressionThresholds,
    SmoothedDynamics,
};

// ============================================================================
// Strategies
// ============================================================================

fn arb_score() -> impl Strategy<Value = f32> {
    -1.0f32..=1.0
}

fn arb_scores() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(arb_score(), 1..40)
}

/// Message texts, some of which hit phrase patterns.
fn arb_text() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "The oven is hot.",
        "not bad at all",
        "same old, another day I guess",
        "things are looking up",
        "dead end job, waste of time",
        "",
    ])
    .prop_map(|s| s.to_string())
}

fn smoothed_cfg() -> AffectConfig {
    AffectConfig {
        policy: AffectPolicy::Smoothed,
        ..AffectConfig::default()
    }
}

// ============================================================================
// Smoothed policy
// ============================================================================

proptest! {
    /// **Core invariant**: the mood stays within bounds after every ingest
    /// and every decay call.
    #[test]
    fn smoothed_value_always_in_bounds(
        steps in prop::collection::vec((arb_score(), arb_text(), 0i64..30_000, any::<bool>()), 1..60),
    ) {
        let cfg = smoothed_cfg();
        let mut model = AffectModel::new(&cfg, 0);
        let mut now = 0i64;
        for (score, text, gap, decay) in steps {
            now += gap;
            if decay {
                model.decay_at(now);
            } else {
                model.apply_score(&text, score, now);
            }
            prop_assert!(model.value() >= cfg.min_affect && model.value() <= cfg.max_affect,
                "value out of bounds: {}", model.value());
        }
    }

    /// **Rate limit**: a single ingestion never moves the mood more than max_step.
    #[test]
    fn smoothed_step_is_rate_limited(scores in arb_scores(), text in arb_text()) {
        let mut model = AffectModel::new(&smoothed_cfg(), 0);
        for (i, score) in scores.into_iter().enumerate() {
            let before = model.value();
            let update = model.apply_score(&text, score, i as i64);
            prop_assert!((model.value() - before).abs() <= 0.35 + 1e-5,
                "step too large: {} -> {}", before, model.value());
            prop_assert!((update.delta - (model.value() - before)).abs() < 1e-5);
        }
    }

    /// **History window**: never more than five entries, newest last.
    #[test]
    fn smoothed_history_bounded(scores in prop::collection::vec(arb_score(), 0..50)) {
        let mut model = AffectModel::new(&smoothed_cfg(), 0);
        let n = scores.len();
        for (i, score) in scores.into_iter().enumerate() {
            model.apply_score(&format!("msg {}", i), score, i as i64);
        }
        let history = &model.state().history;
        prop_assert!(history.len() <= 5);
        prop_assert_eq!(history.len(), n.min(5));
        if n > 0 {
            prop_assert_eq!(history.back().map(|h| h.text.clone()), Some(format!("msg {}", n - 1)));
        }
    }

    /// **Decay**: no-op inside the idle window; otherwise exactly one decay
    /// step toward baseline, never past it.
    #[test]
    fn decay_moves_toward_baseline(
        start in 0.0f32..=3.0,
        elapsed in 0i64..60_000,
    ) {
        let cfg = smoothed_cfg();
        let dynamics = SmoothedDynamics::new(&cfg);
        let mut state = AffectState::new(cfg.baseline, 0);
        state.value = start;

        let changed = dynamics.decay(&mut state, elapsed);
        let after = state.value;

        if elapsed < 10_000 || start == cfg.baseline {
            prop_assert!(!changed);
            prop_assert_eq!(start, after);
        } else {
            prop_assert!(changed);
            prop_assert!(after >= cfg.baseline, "overshot baseline: {}", after);
            prop_assert!(after < start);
            let moved = start - after;
            prop_assert!((moved - 0.02).abs() < 1e-5 || after == cfg.baseline,
                "moved {} instead of decay_rate", moved);
        }
    }

    /// **Decay**: with a baseline inside the range, a low mood rises toward
    /// it and a high mood falls toward it, by at most one step and never
    /// crossing it.
    #[test]
    fn decay_approaches_mid_range_baseline_from_either_side(
        start in 0.0f32..=3.0,
    ) {
        let cfg = AffectConfig { baseline: 1.5, ..smoothed_cfg() };
        let dynamics = SmoothedDynamics::new(&cfg);
        let mut state = AffectState::new(cfg.baseline, 0);
        state.value = start;

        let changed = dynamics.decay(&mut state, 20_000);
        let after = state.value;

        prop_assert_eq!(changed, start != cfg.baseline);
        prop_assert!((after - start).abs() <= 0.02 + 1e-5, "moved {} -> {}", start, after);
        if start < cfg.baseline {
            prop_assert!(after > start);
            prop_assert!(after <= cfg.baseline + 1e-6, "overshot baseline: {}", after);
        } else if start > cfg.baseline {
            prop_assert!(after < start);
            prop_assert!(after >= cfg.baseline - 1e-6, "overshot baseline: {}", after);
        }
    }
}

// ============================================================================
// Accumulator policy
// ============================================================================

proptest! {
    /// **Monotonic**: the accumulator never decreases, whatever the score.
    #[test]
    fn accumulator_never_decreases(scores in arb_scores()) {
        let mut model = AffectModel::new(&AffectConfig::default(), 0);
        let mut prev = model.value();
        for (i, score) in scores.into_iter().enumerate() {
            model.apply_score("msg", score, i as i64);
            prop_assert!(model.value() >= prev, "decreased: {} -> {}", prev, model.value());
            prev = model.value();
        }
        prop_assert!(!model.decay_at(i64::MAX / 2));
    }
}

// ============================================================================
// Expression index
// ============================================================================

proptest! {
    /// **Monotonic step function**: higher mood never yields a lower index.
    #[test]
    fn expression_index_monotonic(a in -5.0f32..10.0, b in -5.0f32..10.0) {
        let t = ExpressionThresholds::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(t.index_for(lo) <= t.index_for(hi));
        prop_assert!(t.index_for(hi) < t.bucket_count());
    }
}

// ============================================================================
// Example scenarios
// ============================================================================

#[test]
fn accumulator_example_scenario() {
    let mut model = AffectModel::new(&AffectConfig::default(), 0);
    let values: Vec<f32> = [1.0, 1.0, 1.0]
        .iter()
        .enumerate()
        .map(|(i, s)| model.apply_score("great", *s, i as i64).current_value)
        .collect();
    assert_eq!(values, vec![0.5, 1.0, 1.5]);
}

#[test]
fn smoothed_example_scenario() {
    let mut model = AffectModel::new(&smoothed_cfg(), 0);
    let update = model.apply_score("The oven is hot.", 0.5, 0);
    assert!((update.target_value - 3.0).abs() < 1e-6);
    assert!((update.delta - 0.35).abs() < 1e-6);
    assert_eq!(update.expression_index, 0);
}
