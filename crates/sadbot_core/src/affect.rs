//! Affect state for the robot.
//!
//! The robot's mood is a single scalar. Higher is happier. The scalar is
//! bucketed into an expression index, which selects the clip shown on stage.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Stored message text is cut to this many characters.
pub const HISTORY_TEXT_LIMIT: usize = 100;

/// One scored message kept in the recency window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub text: String,
    /// Score the policy worked with (for the smoothed policy this includes
    /// the phrase modifier).
    pub score: f32,
    pub timestamp_ms: i64,
}

impl HistoryEntry {
    pub fn new(text: &str, score: f32, timestamp_ms: i64) -> Self {
        Self {
            text: text.chars().take(HISTORY_TEXT_LIMIT).collect(),
            score,
            timestamp_ms,
        }
    }
}

/// Mood value, recency window and decay timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectState {
    pub value: f32,
    pub history: VecDeque<HistoryEntry>,
    /// Wall-clock time of the last ingested message (or of creation/reset).
    pub last_update_ms: i64,
}

impl AffectState {
    pub fn new(baseline: f32, now_ms: i64) -> Self {
        Self {
            value: baseline,
            history: VecDeque::new(),
            last_update_ms: now_ms,
        }
    }

    /// Append an entry, evicting the oldest ones beyond `capacity`.
    pub fn push_history(&mut self, entry: HistoryEntry, capacity: usize) {
        self.history.push_back(entry);
        while self.history.len() > capacity.max(1) {
            self.history.pop_front();
        }
    }
}

/// Ascending cut points partitioning the mood range into contiguous buckets.
///
/// `n` thresholds produce `n + 1` buckets. A value equal to a threshold
/// belongs to the upper bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpressionThresholds(Vec<f32>);

impl ExpressionThresholds {
    /// Build from cut points; they are sorted so the mapping stays monotonic.
    pub fn new(mut cuts: Vec<f32>) -> Self {
        cuts.retain(|c| c.is_finite());
        cuts.sort_by(|a, b| a.total_cmp(b));
        Self(cuts)
    }

    pub fn index_for(&self, value: f32) -> usize {
        self.0.iter().take_while(|cut| value >= **cut).count()
    }

    pub fn bucket_count(&self) -> usize {
        self.0.len() + 1
    }

    pub fn cuts(&self) -> &[f32] {
        &self.0
    }
}

impl Default for ExpressionThresholds {
    fn default() -> Self {
        Self(vec![1.5, 2.0, 2.5])
    }
}

/// Result of ingesting one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectUpdate {
    pub current_value: f32,
    pub target_value: f32,
    pub delta: f32,
    pub expression_index: usize,
    /// Raw score from the sentiment source.
    pub score: f32,
    /// Score after phrase modifiers (equal to `score` for the accumulator).
    pub combined_score: f32,
    /// Recency-weighted average over the window.
    pub avg_recent: f32,
}

/// Read-only view for debugging and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectSnapshot {
    pub value: f32,
    pub expression_index: usize,
    pub message_count: usize,
    pub recent: Vec<HistoryEntry>,
}
