//! Affect tracker service
//!
//! The AffectTracker is the single owner of the robot's mood. It:
//! - Scores each message through the injected sentiment source
//! - Applies at most one ingestion at a time, in call order
//! - Applies decay when asked
//! - Broadcasts snapshots to subscribers (debug overlays, loggers)

use sadbot_core::{
    AffectConfig, AffectModel, AffectPolicy, AffectSnapshot, AffectUpdate, SentimentError,
    SentimentSource,
};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};

/// Wall-clock source in Unix milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub struct AffectTracker {
    /// Mood state (protected by RwLock for concurrent readers)
    model: RwLock<AffectModel>,

    /// External scorer
    source: Arc<dyn SentimentSource>,

    /// Held for the whole score-then-apply sequence. tokio's Mutex is FIFO,
    /// so queued ingests run in the order they were called.
    ingest_turn: Mutex<()>,

    /// Watch channel for snapshot updates
    snapshot_tx: watch::Sender<AffectSnapshot>,

    /// Receiver for snapshot updates (cloneable)
    snapshot_rx: watch::Receiver<AffectSnapshot>,

    clock: Clock,
}

impl AffectTracker {
    pub fn new(cfg: &AffectConfig, source: Arc<dyn SentimentSource>) -> Self {
        Self::with_clock(cfg, source, Arc::new(sadbot_core::now_ms))
    }

    /// Create with a custom clock (tests drive decay without sleeping).
    pub fn with_clock(cfg: &AffectConfig, source: Arc<dyn SentimentSource>, clock: Clock) -> Self {
        let model = AffectModel::new(cfg, clock());
        let (snapshot_tx, snapshot_rx) = watch::channel(model.snapshot());

        tracing::info!(
            "Affect tracker ready: policy={:?}, baseline={:.2}, scorer={}",
            cfg.policy,
            model.value(),
            source.name()
        );

        Self {
            model: RwLock::new(model),
            source,
            ingest_turn: Mutex::new(()),
            snapshot_tx,
            snapshot_rx,
            clock,
        }
    }

    /// Score `text` and fold it into the mood.
    ///
    /// Scoring failures are returned untouched; the mood is not modified.
    pub async fn ingest(&self, text: &str) -> Result<AffectUpdate, SentimentError> {
        let _turn = self.ingest_turn.lock().await;

        let score = match self.source.score_text(text).await {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!("{} failed to score message: {}", self.source.name(), e);
                return Err(e);
            }
        };

        let update = {
            let mut model = self.model.write().await;
            let update = model.apply_score(text, score, (self.clock)());
            let _ = self.snapshot_tx.send(model.snapshot());
            update
        };

        tracing::info!(
            "Message analyzed: score={:.3}, combined={:.3}, affect={:.2} (target {:.2}, delta {:+.3}), expression={}",
            update.score,
            update.combined_score,
            update.current_value,
            update.target_value,
            update.delta,
            update.expression_index
        );

        Ok(update)
    }

    /// Apply one decay step if the policy decays and the tracker has been
    /// idle long enough. Returns true if the mood changed.
    pub async fn decay(&self) -> bool {
        let mut model = self.model.write().await;
        let changed = model.decay_at((self.clock)());
        if changed {
            let _ = self.snapshot_tx.send(model.snapshot());
        }
        changed
    }

    pub async fn value(&self) -> f32 {
        self.model.read().await.value()
    }

    pub async fn expression_index(&self) -> usize {
        self.model.read().await.expression_index()
    }

    pub async fn policy(&self) -> AffectPolicy {
        self.model.read().await.policy()
    }

    pub async fn snapshot(&self) -> AffectSnapshot {
        self.model.read().await.snapshot()
    }

    /// Back to baseline with an empty history.
    pub async fn reset(&self) {
        let mut model = self.model.write().await;
        model.reset_at((self.clock)());
        let _ = self.snapshot_tx.send(model.snapshot());
        tracing::info!("Affect reset to baseline {:.2}", model.value());
    }

    /// Subscribe to snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<AffectSnapshot> {
        self.snapshot_rx.clone()
    }
}
