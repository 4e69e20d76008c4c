//! Scripted provider: deterministic scores for testing and offline runs.

use async_trait::async_trait;
use sadbot_core::{SentimentError, SentimentSource};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued scores, then a fallback score once the queue is empty.
/// With no fallback it fails like an unreachable service.
#[derive(Debug)]
pub struct ScriptedSentiment {
    queue: Mutex<VecDeque<f32>>,
    fallback: Option<f32>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSentiment {
    pub fn new(scores: impl IntoIterator<Item = f32>) -> Self {
        Self {
            queue: Mutex::new(scores.into_iter().collect()),
            fallback: Some(0.0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn constant(score: f32) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Some(score),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a network error.
    pub fn unavailable() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, score: f32) {
        self.queue.lock().unwrap().push_back(score);
    }

    /// Texts scored so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SentimentSource for ScriptedSentiment {
    async fn score_text(&self, text: &str) -> Result<f32, SentimentError> {
        self.calls.lock().unwrap().push(text.to_string());
        let next = self.queue.lock().unwrap().pop_front();
        next.or(self.fallback)
            .map(|s| s.clamp(-1.0, 1.0))
            .ok_or_else(|| SentimentError::Network("scripted scorer is unavailable".into()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_then_falls_back() {
        let scorer = ScriptedSentiment::new([0.4, -0.2]);
        assert_eq!(scorer.score_text("a").await.unwrap(), 0.4);
        assert_eq!(scorer.score_text("b").await.unwrap(), -0.2);
        assert_eq!(scorer.score_text("c").await.unwrap(), 0.0);
        assert_eq!(scorer.calls(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_unavailable_fails() {
        let scorer = ScriptedSentiment::unavailable();
        assert!(matches!(
            scorer.score_text("a").await,
            Err(SentimentError::Network(_))
        ));
        scorer.push(0.7);
        assert_eq!(scorer.score_text("b").await.unwrap(), 0.7);
    }
}
