use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SadbotConfig {
    pub affect: AffectConfig,
    pub sentiment: SentimentConfig,
    pub mixer: MixerConfig,
    pub session: SessionConfig,
}

impl SadbotConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied and the result is validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: SadbotConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from path if the file exists; otherwise return defaults with env overrides.
    ///
    /// A file that exists but fails to parse or validate is an error, never a
    /// silent switch to the default policy.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        tracing::warn!("Config file {} not found, using defaults", path.display());
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SADBOT_AFFECT_POLICY") {
            match v.parse() {
                Ok(policy) => self.affect.policy = policy,
                Err(e) => tracing::warn!("Ignoring SADBOT_AFFECT_POLICY: {}", e),
            }
        }
        if let Ok(v) = std::env::var("SENTIMENT_PROVIDER") {
            self.sentiment.provider = v;
        }
        if let Ok(v) = std::env::var("SENTIMENT_MODEL") {
            self.sentiment.model = v;
        }
        if let Ok(v) = std::env::var("SENTIMENT_BASE_URL") {
            self.sentiment.base_url = Some(v);
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let a = &self.affect;
        if !(a.min_affect <= a.baseline && a.baseline <= a.max_affect) {
            bail!(
                "affect baseline {} outside bounds [{}, {}]",
                a.baseline,
                a.min_affect,
                a.max_affect
            );
        }
        if a.thresholds.iter().any(|t| !t.is_finite()) {
            bail!("affect thresholds must be finite");
        }
        if a.thresholds.windows(2).any(|w| w[0] >= w[1]) {
            bail!("affect thresholds must be strictly ascending: {:?}", a.thresholds);
        }
        let s = &a.smoothed;
        for (name, value) in [
            ("midpoint", s.midpoint),
            ("expected_range", s.expected_range),
            ("max_step", s.max_step),
            ("recency_base", s.recency_base),
            ("phrase_weight", s.phrase_weight),
            ("decay_rate", s.decay_rate),
        ] {
            if !value.is_finite() {
                bail!("smoothed {} must be finite, got {}", name, value);
            }
        }
        if s.max_step <= 0.0 || s.expected_range <= 0.0 {
            bail!("smoothed max_step and expected_range must be positive");
        }
        if s.decay_rate < 0.0 {
            bail!("smoothed decay_rate must not be negative, got {}", s.decay_rate);
        }
        if !a.accumulator.factor.is_finite() {
            bail!("accumulator factor must be finite, got {}", a.accumulator.factor);
        }
        if a.smoothed.history_len == 0 {
            bail!("smoothed history_len must be at least 1");
        }

        let m = &self.mixer;
        if m.listening.is_empty() {
            bail!("mixer.listening clip set is empty");
        }
        if m.listening.len() != m.talking.len() {
            bail!(
                "clip sets must be parallel: {} listening vs {} talking clips",
                m.listening.len(),
                m.talking.len()
            );
        }
        if m.initial_index >= m.listening.len() {
            bail!(
                "mixer.initial_index {} out of range for {} clips",
                m.initial_index,
                m.listening.len()
            );
        }
        Ok(())
    }
}

// ============================================================================
// Affect
// ============================================================================

/// Which ingestion policy drives the mood value.
///
/// The two produce materially different trajectories; pick one per study.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffectPolicy {
    /// Recency-weighted average, rate limited, clamped, decays to baseline.
    Smoothed,
    /// One-directional: positive sentiment raises mood, nothing lowers it.
    #[default]
    Accumulator,
}

impl FromStr for AffectPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smoothed" => Ok(Self::Smoothed),
            "accumulator" => Ok(Self::Accumulator),
            other => Err(format!("unknown affect policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AffectConfig {
    pub policy: AffectPolicy,
    pub baseline: f32,
    pub min_affect: f32,
    pub max_affect: f32,
    /// Ascending cut points for the expression index.
    pub thresholds: Vec<f32>,
    pub smoothed: SmoothedParams,
    pub accumulator: AccumulatorParams,
}

impl Default for AffectConfig {
    fn default() -> Self {
        Self {
            policy: AffectPolicy::default(),
            baseline: 0.0,
            min_affect: 0.0,
            max_affect: 3.0,
            thresholds: vec![1.5, 2.0, 2.5],
            smoothed: SmoothedParams::default(),
            accumulator: AccumulatorParams::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmoothedParams {
    /// Mood the averaged score maps to when it is zero.
    pub midpoint: f32,
    /// Averaged score that moves the target by one mood unit.
    pub expected_range: f32,
    /// Largest change allowed per message.
    pub max_step: f32,
    pub history_len: usize,
    /// Weight of the i-th (oldest-first) entry is `recency_base^(i+1)`.
    pub recency_base: f32,
    /// Multiplier applied to the summed phrase modifiers.
    pub phrase_weight: f32,
    pub decay_enabled: bool,
    /// Step toward baseline per decay call.
    pub decay_rate: f32,
    /// Quiet period before decay starts.
    pub decay_idle_secs: u64,
}

impl Default for SmoothedParams {
    fn default() -> Self {
        Self {
            midpoint: 2.0,
            expected_range: 0.5,
            max_step: 0.35,
            history_len: 5,
            recency_base: 1.5,
            phrase_weight: 0.05,
            decay_enabled: true,
            decay_rate: 0.02,
            decay_idle_secs: 10,
        }
    }
}

impl SmoothedParams {
    pub fn decay_idle(&self) -> Duration {
        Duration::from_secs(self.decay_idle_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccumulatorParams {
    pub factor: f32,
}

impl Default for AccumulatorParams {
    fn default() -> Self {
        Self { factor: 0.5 }
    }
}

// ============================================================================
// Sentiment
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// `openai`, `relay` or `mock`.
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Attempts per request including the first; transient failures only.
    pub max_attempts: u32,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini-2024-07-18".to_string(),
            base_url: None,
            temperature: 0.3,
            max_tokens: 10,
            timeout_secs: 15,
            max_attempts: 2,
        }
    }
}

// ============================================================================
// Mixer
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Listening clips, indexed by expression index.
    pub listening: Vec<String>,
    /// Talking clips, parallel to `listening`.
    pub talking: Vec<String>,
    pub initial_index: usize,
    pub crossfade_ms: u64,
    pub mode_switch_ms: u64,
    pub affect_transition_ms: u64,
    pub ready_timeout_ms: u64,
    pub metadata_timeout_ms: u64,
    pub seek_timeout_ms: u64,
    /// Opacity animation frame interval.
    pub frame_ms: u64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            listening: vec![
                "SadListeningA_pingpong.mp4".to_string(),
                "DownListeningA_pingpong.mp4".to_string(),
                "HopefulListeningA_pingpong.mp4".to_string(),
                "UpbeatListeningA_pingpong.mp4".to_string(),
            ],
            talking: vec![
                "SadTalkingA_pingpong.mp4".to_string(),
                "DownTalkingC_pingpong.mp4".to_string(),
                "HopefulTalkingB_pingpong.mp4".to_string(),
                "UpbeatTalkingA_pingpong.mp4".to_string(),
            ],
            initial_index: 2,
            crossfade_ms: 800,
            mode_switch_ms: 300,
            affect_transition_ms: 1500,
            ready_timeout_ms: 8000,
            metadata_timeout_ms: 4000,
            seek_timeout_ms: 2000,
            frame_ms: 16,
        }
    }
}

impl MixerConfig {
    pub fn crossfade(&self) -> Duration {
        Duration::from_millis(self.crossfade_ms)
    }

    pub fn mode_switch(&self) -> Duration {
        Duration::from_millis(self.mode_switch_ms)
    }

    pub fn affect_transition(&self) -> Duration {
        Duration::from_millis(self.affect_transition_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn seek_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_timeout_ms)
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How often the conductor runs its decay tick (one video loop).
    pub tick_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 4000,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
