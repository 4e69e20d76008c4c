//! Sentiment scoring contract.
//!
//! Scoring itself lives behind [`SentimentSource`]; concrete providers are in
//! `sadbot_reasoning`. This module also carries the phrase patterns that nudge
//! a score for idioms a plain scorer tends to misread ("not bad", "same old").

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("sentiment request failed: {0}")]
    Network(String),

    #[error("sentiment service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("unparseable sentiment response: {0}")]
    Parse(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}

/// Scores text on [-1, 1]: -1 very negative, 0 neutral, 1 very positive.
///
/// Implementations fail instead of inventing a neutral score; callers decide
/// whether to skip the update.
#[async_trait]
pub trait SentimentSource: Send + Sync {
    async fn score_text(&self, text: &str) -> Result<f32, SentimentError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

/// Parse a bare numeric reply ("0.4", " -1 ") into a score in [-1, 1].
pub fn parse_score(raw: &str) -> Result<f32, SentimentError> {
    let trimmed = raw.trim();
    let value: f32 = trimmed
        .parse()
        .map_err(|_| SentimentError::Parse(format!("not a number: '{}'", trimmed)))?;
    normalize_score(value)
}

/// Reject non-finite scores and clamp out-of-range ones.
pub fn normalize_score(value: f32) -> Result<f32, SentimentError> {
    if !value.is_finite() {
        return Err(SentimentError::Parse(format!("non-finite score {}", value)));
    }
    if !(-1.0..=1.0).contains(&value) {
        tracing::warn!("Sentiment score {} outside [-1, 1], clamping", value);
    }
    Ok(value.clamp(-1.0, 1.0))
}

static PHRASE_PATTERNS: Lazy<Vec<(Regex, f32)>> = Lazy::new(|| {
    [
        (r"(?i)not (bad|terrible|awful|horrible)", 3.0),
        (r"(?i)getting better", 2.0),
        (r"(?i)things are looking up", 3.0),
        (r"(?i)same old", -1.0),
        (r"(?i)nothing new", -1.0),
        (r"(?i)another day", -1.0),
        (r"(?i)i guess|i suppose", -0.5),
        (r"(?i)been thinking about", 1.0),
        (r"(?i)dead end job", -3.0),
        (r"(?i)waste of time", -2.0),
    ]
    .into_iter()
    .filter_map(|(pattern, modifier)| Regex::new(pattern).ok().map(|re| (re, modifier)))
    .collect()
});

/// Sum of modifiers for every phrase pattern present in `text`.
///
/// Each pattern counts once regardless of how often it occurs.
pub fn phrase_modifier(text: &str) -> f32 {
    PHRASE_PATTERNS
        .iter()
        .filter(|(re, _)| re.is_match(text))
        .map(|(_, modifier)| modifier)
        .sum()
}
