//! # Sad Robot limbic layer
//!
//! Wraps the synchronous [`sadbot_core::AffectModel`] in an async service:
//!
//! 1. Messages are scored by an injected [`sadbot_core::SentimentSource`]
//! 2. Ingestion is serialised, so concurrent callers apply in call order
//! 3. Every change is broadcast as an [`sadbot_core::AffectSnapshot`]
//!
//! Decay is not self-scheduling. Whoever owns the stage calls
//! [`AffectTracker::decay`] once per video loop; [`HeartbeatConfig`] holds
//! that cadence.

mod heartbeat;
mod system;

pub use heartbeat::HeartbeatConfig;
pub use system::{AffectTracker, Clock};
