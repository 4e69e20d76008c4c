//! Affect dynamics: how a scored message moves the mood value.
//!
//! Two policies exist and they are not interchangeable:
//!
//! - [`SmoothedDynamics`]: recency-weighted average of the last few messages,
//!   mapped onto the mood range, approached at a bounded rate, and drifting
//!   back to baseline after a quiet period.
//! - [`AccumulatorDynamics`]: positive sentiment adds to the mood, negative
//!   sentiment is ignored. No ceiling, no decay.

use crate::affect::{AffectState, AffectUpdate, HistoryEntry};
use crate::config::{AccumulatorParams, AffectConfig, AffectPolicy, SmoothedParams};
use crate::sentiment::phrase_modifier;

/// Strategy for evolving [`AffectState`].
pub trait AffectDynamics: Send + Sync {
    /// Fold one scored message into the state.
    ///
    /// The returned update carries `expression_index = 0`; the model fills it
    /// in from its thresholds.
    fn apply(&self, state: &mut AffectState, text: &str, score: f32, now_ms: i64) -> AffectUpdate;

    /// Drift toward baseline. Returns true if the value changed.
    fn decay(&self, state: &mut AffectState, now_ms: i64) -> bool;

    fn policy(&self) -> AffectPolicy;
}

/// Build the strategy selected in config.
pub fn from_config(cfg: &AffectConfig) -> Box<dyn AffectDynamics> {
    match cfg.policy {
        AffectPolicy::Smoothed => Box::new(SmoothedDynamics::new(cfg)),
        AffectPolicy::Accumulator => Box::new(AccumulatorDynamics::new(cfg)),
    }
}

/// Guard against NaN and Infinity coming in from a scorer.
#[inline]
fn sanitize_score(score: f32) -> f32 {
    if score.is_finite() {
        score
    } else {
        tracing::warn!("Non-finite sentiment score {}, treating as neutral", score);
        0.0
    }
}

// ============================================================================
// Smoothed
// ============================================================================

#[derive(Debug, Clone)]
pub struct SmoothedDynamics {
    pub params: SmoothedParams,
    pub baseline: f32,
    pub min_affect: f32,
    pub max_affect: f32,
}

impl SmoothedDynamics {
    pub fn new(cfg: &AffectConfig) -> Self {
        Self {
            params: cfg.smoothed.clone(),
            baseline: cfg.baseline,
            min_affect: cfg.min_affect,
            max_affect: cfg.max_affect,
        }
    }

    fn clamp(&self, v: f32) -> f32 {
        v.clamp(self.min_affect, self.max_affect)
    }

    /// Weighted mean of the window; the newest entry weighs the most.
    pub fn weighted_average(&self, history: impl IntoIterator<Item = f32>) -> f32 {
        let mut weighted_sum = 0.0f32;
        let mut total_weight = 0.0f32;
        for (i, score) in history.into_iter().enumerate() {
            let weight = self.params.recency_base.powi(i as i32 + 1);
            weighted_sum += score * weight;
            total_weight += weight;
        }
        if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            0.0
        }
    }
}

impl AffectDynamics for SmoothedDynamics {
    fn apply(&self, state: &mut AffectState, text: &str, score: f32, now_ms: i64) -> AffectUpdate {
        let score = sanitize_score(score);
        let combined = score + phrase_modifier(text) * self.params.phrase_weight;

        state.push_history(
            HistoryEntry::new(text, combined, now_ms),
            self.params.history_len,
        );

        let avg = self.weighted_average(state.history.iter().map(|h| h.score));
        let target = self.clamp(self.params.midpoint + avg / self.params.expected_range);

        let before = state.value;
        let step = (target - before).clamp(-self.params.max_step, self.params.max_step);
        state.value = self.clamp(before + step);
        state.last_update_ms = now_ms;

        AffectUpdate {
            current_value: state.value,
            target_value: target,
            delta: state.value - before,
            expression_index: 0,
            score,
            combined_score: combined,
            avg_recent: avg,
        }
    }

    fn decay(&self, state: &mut AffectState, now_ms: i64) -> bool {
        if !self.params.decay_enabled {
            return false;
        }
        let idle_ms = self.params.decay_idle().as_millis() as i64;
        if now_ms - state.last_update_ms < idle_ms {
            return false;
        }

        let before = state.value;
        let step = (self.baseline - before).clamp(-self.params.decay_rate, self.params.decay_rate);
        state.value = self.clamp(before + step);

        let changed = state.value != before;
        if changed {
            tracing::debug!(
                "Applied decay: affect {:.2} -> {:.2} (baseline {:.2}, idle {:.1}s)",
                before,
                state.value,
                self.baseline,
                (now_ms - state.last_update_ms) as f64 / 1000.0
            );
        }
        changed
    }

    fn policy(&self) -> AffectPolicy {
        AffectPolicy::Smoothed
    }
}

// ============================================================================
// Accumulator
// ============================================================================

#[derive(Debug, Clone)]
pub struct AccumulatorDynamics {
    pub params: AccumulatorParams,
}

impl AccumulatorDynamics {
    pub fn new(cfg: &AffectConfig) -> Self {
        Self {
            params: cfg.accumulator.clone(),
        }
    }
}

impl AffectDynamics for AccumulatorDynamics {
    fn apply(&self, state: &mut AffectState, text: &str, score: f32, now_ms: i64) -> AffectUpdate {
        let score = sanitize_score(score);
        state.push_history(HistoryEntry::new(text, score, now_ms), 1);

        let before = state.value;
        state.value += (score * self.params.factor).max(0.0);
        state.last_update_ms = now_ms;

        AffectUpdate {
            current_value: state.value,
            target_value: state.value,
            delta: state.value - before,
            expression_index: 0,
            score,
            combined_score: score,
            avg_recent: score,
        }
    }

    fn decay(&self, _state: &mut AffectState, _now_ms: i64) -> bool {
        false
    }

    fn policy(&self) -> AffectPolicy {
        AffectPolicy::Accumulator
    }
}
