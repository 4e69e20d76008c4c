//! Relay provider. Calls the stage server's `/api/analyze-sentiment` endpoint,
//! which holds the model credentials and answers `{"sentiment": <number>}`.

use crate::retry::{with_retry, RetryConfig};
use async_trait::async_trait;
use reqwest::Client;
use sadbot_core::sentiment::normalize_score;
use sadbot_core::{SentimentConfig, SentimentError, SentimentSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    sentiment: Option<f32>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RelaySentiment {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl RelaySentiment {
    pub fn from_config(cfg: &SentimentConfig) -> anyhow::Result<Self> {
        let base_url = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| "http://localhost:3000".to_string());
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig {
                max_attempts: cfg.max_attempts,
                ..RetryConfig::default()
            },
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl SentimentSource for RelaySentiment {
    async fn score_text(&self, text: &str) -> Result<f32, SentimentError> {
        let url = format!("{}/api/analyze-sentiment", self.base_url);
        let body = AnalyzeRequest { text };

        let response = with_retry(&self.retry, "Relay", || {
            self.client.post(&url).json(&body).send()
        })
        .await?;

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| SentimentError::Parse(format!("invalid JSON body: {}", e)))?;

        match (parsed.sentiment, parsed.error) {
            (Some(score), _) => normalize_score(score),
            (None, Some(error)) => Err(SentimentError::Parse(error)),
            (None, None) => Err(SentimentError::Parse("response has no sentiment field".into())),
        }
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}
