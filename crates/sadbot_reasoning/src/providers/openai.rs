use crate::prompts::SENTIMENT_SYSTEM_PROMPT;
use crate::retry::{with_retry, RetryConfig};
use async_trait::async_trait;
use reqwest::Client;
use sadbot_core::sentiment::parse_score;
use sadbot_core::{SentimentConfig, SentimentError, SentimentSource};
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

/// Scores text with a chat-completions model asked to reply with one number.
#[derive(Debug, Clone)]
pub struct OpenAiSentiment {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryConfig,
}

impl OpenAiSentiment {
    pub fn from_config(cfg: &SentimentConfig) -> anyhow::Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let base_url = cfg
            .base_url
            .clone()
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
                .build()?,
            api_key,
            base_url,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            retry: RetryConfig {
                max_attempts: cfg.max_attempts,
                ..RetryConfig::default()
            },
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl SentimentSource for OpenAiSentiment {
    async fn score_text(&self, text: &str) -> Result<f32, SentimentError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SentimentError::MissingCredentials("OPENAI_API_KEY not set".into()))?;

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SENTIMENT_SYSTEM_PROMPT },
                { "role": "user", "content": text }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let url = format!("{}/chat/completions", self.base_url);

        let response = with_retry(&self.retry, "OpenAI", || {
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .json(&payload)
                .send()
        })
        .await?;

        let resp_json: Value = response
            .json()
            .await
            .map_err(|e| SentimentError::Parse(format!("invalid JSON body: {}", e)))?;

        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| SentimentError::Parse("response has no message content".into()))?;

        let score = parse_score(content).map_err(|e| {
            tracing::error!("Invalid sentiment value received: {:?}", content);
            e
        })?;
        tracing::debug!("OpenAI scored {:.3} for {} chars", score, text.chars().count());
        Ok(score)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
