//! Sentiment scoring providers.
//!
//! Every provider implements [`sadbot_core::SentimentSource`]. None of them
//! falls back to a neutral score: a failed call is an error for the caller.

pub mod prompts;
pub mod providers;
pub mod retry;

pub use providers::{build_source, OpenAiSentiment, RelaySentiment, ScriptedSentiment};
pub use retry::RetryConfig;
