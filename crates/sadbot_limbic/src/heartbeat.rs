//! Heartbeat configuration for the decay tick
//!
//! The heartbeat determines how often decay is applied while no messages
//! arrive. One beat per video loop keeps mood drift in step with the clips.

use std::time::Duration;

/// Configuration for the decay heartbeat
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// How often to tick (default: 4s, roughly one ping-pong clip loop)
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(4000),
        }
    }
}

impl HeartbeatConfig {
    pub fn from_millis(ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(ms.max(1)),
        }
    }
}
