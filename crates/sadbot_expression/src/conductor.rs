//! Conductor: routes robot messages into affect and affect onto the stage.
//!
//! Holds the tracker and the mixer it was given; owns nothing else but the
//! talking auto-stop timer.

use crate::mixer::{TransitionOutcome, VideoMixer};
use sadbot_core::{estimate_talk_duration, AffectUpdate, SentimentError};
use sadbot_limbic::{AffectTracker, HeartbeatConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Conductor {
    tracker: Arc<AffectTracker>,
    mixer: Arc<VideoMixer>,
    affect_transition: Duration,
    talk_timer: Mutex<Option<JoinHandle<()>>>,
}

impl Conductor {
    pub fn new(tracker: Arc<AffectTracker>, mixer: Arc<VideoMixer>) -> Self {
        let affect_transition = mixer.config().affect_transition();
        Self {
            tracker,
            mixer,
            affect_transition,
            talk_timer: Mutex::new(None),
        }
    }

    pub fn tracker(&self) -> &Arc<AffectTracker> {
        &self.tracker
    }

    pub fn mixer(&self) -> &Arc<VideoMixer> {
        &self.mixer
    }

    pub async fn start(&self) {
        self.mixer.start().await;
    }

    /// Score a robot message and move the stage if the expression changed.
    ///
    /// Blank messages are skipped. Scoring failures leave the stage alone and
    /// are returned to the caller.
    pub async fn on_robot_message(&self, text: &str) -> Result<Option<AffectUpdate>, SentimentError> {
        if text.trim().is_empty() {
            tracing::warn!("Empty robot message received, skipping analysis");
            return Ok(None);
        }

        let update = match self.tracker.ingest(text).await {
            Ok(update) => update,
            Err(e) => {
                tracing::error!("Sentiment analysis failed, stage unchanged: {}", e);
                return Err(e);
            }
        };

        self.follow_expression(update.expression_index);
        Ok(Some(update))
    }

    /// The robot started speaking `text`. Switches to talking clips and arms
    /// a timer that switches back after the estimated speaking time.
    pub fn utterance_started(&self, text: &str) -> JoinHandle<TransitionOutcome> {
        let talk_for = estimate_talk_duration(text);
        tracing::debug!("Talking for ~{}ms", talk_for.as_millis());

        let switch = self.mixer.spawn_set_talking(true);

        let mixer = Arc::clone(&self.mixer);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(talk_for).await;
            tracing::debug!("Talk timer elapsed");
            // Detached so aborting the timer never cuts a fade short.
            mixer.spawn_set_talking(false);
        });
        if let Some(previous) = self.talk_timer.lock().unwrap().replace(timer) {
            previous.abort();
        }

        switch
    }

    /// The robot stopped speaking.
    pub fn utterance_ended(&self) -> JoinHandle<TransitionOutcome> {
        if let Some(timer) = self.talk_timer.lock().unwrap().take() {
            timer.abort();
        }
        self.mixer.spawn_set_talking(false)
    }

    /// One decay step. Returns true if the mood moved.
    pub async fn tick(&self) -> bool {
        if !self.tracker.decay().await {
            return false;
        }
        let index = self.tracker.expression_index().await;
        tracing::debug!("Decay tick: affect={:.3}", self.tracker.value().await);
        self.follow_expression(index);
        true
    }

    /// Run [`Conductor::tick`] every `config.interval` until the handle is aborted.
    pub fn spawn_heartbeat(self: &Arc<Self>, config: HeartbeatConfig) -> JoinHandle<()> {
        let conductor = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                conductor.tick().await;
            }
        })
    }

    fn follow_expression(&self, index: usize) {
        if index == self.mixer.current_index() {
            return;
        }
        tracing::info!(
            "Expression {} -> {}",
            self.mixer.current_index(),
            index
        );
        self.mixer.spawn_go_to(index, self.affect_transition);
    }
}

impl Drop for Conductor {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.talk_timer.lock() {
            if let Some(timer) = timer.take() {
                timer.abort();
            }
        }
    }
}
