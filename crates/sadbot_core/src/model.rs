//! Synchronous affect model: state + policy + expression thresholds.
//!
//! Everything here takes explicit timestamps so it can be driven by tests
//! and by the async tracker alike.

use crate::affect::{AffectSnapshot, AffectState, AffectUpdate, ExpressionThresholds};
use crate::config::{AffectConfig, AffectPolicy};
use crate::dynamics::{self, AffectDynamics};

pub struct AffectModel {
    state: AffectState,
    dynamics: Box<dyn AffectDynamics>,
    thresholds: ExpressionThresholds,
    baseline: f32,
}

impl AffectModel {
    pub fn new(cfg: &AffectConfig, now_ms: i64) -> Self {
        Self::with_dynamics(cfg, dynamics::from_config(cfg), now_ms)
    }

    /// Use a custom strategy instead of the one named in `cfg.policy`.
    pub fn with_dynamics(cfg: &AffectConfig, dynamics: Box<dyn AffectDynamics>, now_ms: i64) -> Self {
        Self {
            state: AffectState::new(cfg.baseline, now_ms),
            dynamics,
            thresholds: ExpressionThresholds::new(cfg.thresholds.clone()),
            baseline: cfg.baseline,
        }
    }

    /// Fold a scored message into the mood.
    pub fn apply_score(&mut self, text: &str, score: f32, now_ms: i64) -> AffectUpdate {
        let mut update = self.dynamics.apply(&mut self.state, text, score, now_ms);
        update.expression_index = self.expression_index();
        update
    }

    /// Drift toward baseline if the policy decays. Returns true on change.
    pub fn decay_at(&mut self, now_ms: i64) -> bool {
        self.dynamics.decay(&mut self.state, now_ms)
    }

    pub fn expression_index(&self) -> usize {
        self.thresholds.index_for(self.state.value)
    }

    pub fn value(&self) -> f32 {
        self.state.value
    }

    pub fn state(&self) -> &AffectState {
        &self.state
    }

    pub fn policy(&self) -> AffectPolicy {
        self.dynamics.policy()
    }

    pub fn thresholds(&self) -> &ExpressionThresholds {
        &self.thresholds
    }

    pub fn snapshot(&self) -> AffectSnapshot {
        AffectSnapshot {
            value: self.state.value,
            expression_index: self.expression_index(),
            message_count: self.state.history.len(),
            recent: self.state.history.iter().cloned().collect(),
        }
    }

    /// Back to baseline with an empty window; the decay timer restarts.
    pub fn reset_at(&mut self, now_ms: i64) {
        self.state = AffectState::new(self.baseline, now_ms);
    }
}

impl std::fmt::Debug for AffectModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffectModel")
            .field("policy", &self.policy())
            .field("state", &self.state)
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smoothed_cfg() -> AffectConfig {
        AffectConfig {
            policy: AffectPolicy::Smoothed,
            ..AffectConfig::default()
        }
    }

    #[test]
    fn test_new_starts_at_baseline() {
        let mut cfg = smoothed_cfg();
        cfg.baseline = 1.0;
        let model = AffectModel::new(&cfg, 0);
        assert_eq!(model.value(), 1.0);
        assert_eq!(model.expression_index(), 0);
        assert_eq!(model.policy(), AffectPolicy::Smoothed);
    }

    #[test]
    fn test_update_carries_expression_index() {
        let mut model = AffectModel::new(&AffectConfig::default(), 0);
        let mut last = None;
        for i in 0..4 {
            last = Some(model.apply_score("yay", 1.0, i));
        }
        // 4 × 0.5 = 2.0 → bucket 2
        let update = last.unwrap();
        assert_eq!(update.current_value, 2.0);
        assert_eq!(update.expression_index, 2);
    }

    #[test]
    fn test_snapshot_and_reset() {
        let mut model = AffectModel::new(&smoothed_cfg(), 0);
        model.apply_score("first", 0.4, 1);
        model.apply_score("second", 0.6, 2);
        let snap = model.snapshot();
        assert_eq!(snap.message_count, 2);
        assert_eq!(snap.recent[1].text, "second");
        assert!(snap.value > 0.0);

        model.reset_at(50);
        assert_eq!(model.value(), 0.0);
        assert_eq!(model.snapshot().message_count, 0);
        assert_eq!(model.state().last_update_ms, 50);
    }

    #[test]
    fn test_smoothed_climbs_in_bounded_steps() {
        let mut model = AffectModel::new(&smoothed_cfg(), 0);
        let mut indices = Vec::new();
        for i in 0..10 {
            let update = model.apply_score("lovely", 1.0, i);
            assert!(update.delta <= 0.35 + 1e-6);
            indices.push(update.expression_index);
        }
        assert_eq!(model.value(), 3.0);
        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*indices.last().unwrap(), 3);
    }
}
