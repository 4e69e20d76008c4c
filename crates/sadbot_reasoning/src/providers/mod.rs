mod mock;
mod openai;
mod relay;

pub use mock::ScriptedSentiment;
pub use openai::OpenAiSentiment;
pub use relay::RelaySentiment;

use anyhow::{bail, Result};
use sadbot_core::{SentimentConfig, SentimentSource};
use std::sync::Arc;

/// Build the provider named in `cfg.provider`.
pub fn build_source(cfg: &SentimentConfig) -> Result<Arc<dyn SentimentSource>> {
    let source: Arc<dyn SentimentSource> = match cfg.provider.as_str() {
        "openai" => Arc::new(OpenAiSentiment::from_config(cfg)?),
        "relay" => Arc::new(RelaySentiment::from_config(cfg)?),
        "mock" => Arc::new(ScriptedSentiment::constant(0.0)),
        other => bail!("unknown sentiment provider '{}'", other),
    };
    tracing::info!("Sentiment provider: {}", source.name());
    Ok(source)
}
