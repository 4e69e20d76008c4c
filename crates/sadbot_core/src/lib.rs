//! # Sad Robot core
//!
//! Shared building blocks for the affect-driven video stage:
//!
//! - [`affect`]: the mood value, its message history and the expression buckets
//! - [`dynamics`]: the two ingestion policies (smoothed vs. accumulator)
//! - [`model`]: a synchronous affect model combining state and policy
//! - [`sentiment`]: the external scoring contract and phrase modifiers
//! - [`speech`]: spoken-duration estimation for the talking timer
//! - [`config`]: TOML configuration with environment overrides

pub mod affect;
pub mod config;
pub mod dynamics;
pub mod model;
pub mod sentiment;
pub mod speech;

pub use affect::{AffectSnapshot, AffectState, AffectUpdate, ExpressionThresholds, HistoryEntry};
pub use config::{
    AccumulatorParams, AffectConfig, AffectPolicy, MixerConfig, SadbotConfig, SentimentConfig,
    SessionConfig, SmoothedParams,
};
pub use dynamics::{AccumulatorDynamics, AffectDynamics, SmoothedDynamics};
pub use model::AffectModel;
pub use sentiment::{SentimentError, SentimentSource};
pub use speech::estimate_talk_duration;

/// Milliseconds since the Unix epoch, the clock every affect timestamp uses.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
