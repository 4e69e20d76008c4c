//! Stage abstraction: a clip player the mixer can load, seek, play and fade.
//!
//! Media readiness is event-driven. The helpers here turn the event stream
//! into awaitable operations with a deadline, so the mixer never keeps
//! listener bookkeeping of its own.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Media element readiness, ordered from nothing to fully buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// Enough data to show the current frame.
    pub fn can_render(self) -> bool {
        self >= ReadyState::HaveCurrentData
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata,
    LoadedData,
    CanPlay,
    CanPlayThrough,
    Seeked,
    Ended,
    Error(String),
}

/// How a buffer is composited on the stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurfaceState {
    pub opacity: f32,
    pub visible: bool,
    pub on_top: bool,
}

impl SurfaceState {
    pub fn hidden() -> Self {
        Self {
            opacity: 0.0,
            visible: false,
            on_top: false,
        }
    }

    pub fn shown() -> Self {
        Self {
            opacity: 1.0,
            visible: true,
            on_top: false,
        }
    }
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self::hidden()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MediaLoadError {
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: &'static str, after: Duration },

    #[error("media error: {0}")]
    Media(String),

    #[error("player has no source")]
    NoSource,

    #[error("media event stream closed")]
    Closed,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("playback rejected: {0}")]
pub struct PlaybackError(pub String);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MixerError {
    #[error("expression index {index} out of range (clip set has {len})")]
    InvalidIndex { index: usize, len: usize },
}

/// One looping clip surface. Implementations own their decoding and
/// compositing; the mixer only sequences calls and watches events.
#[async_trait]
pub trait ClipPlayer: Send + Sync {
    /// Replace the source and start loading it. Readiness is reported
    /// through [`ClipPlayer::subscribe`].
    fn load(&self, url: &str);

    fn source(&self) -> Option<String>;

    fn ready_state(&self) -> ReadyState;

    /// Clip length in seconds, `None` until metadata is known.
    fn duration(&self) -> Option<f64>;

    /// Playback position in seconds.
    fn current_time(&self) -> f64;

    /// Seek; completion is signalled with [`MediaEvent::Seeked`].
    fn set_current_time(&self, seconds: f64);

    async fn play(&self) -> Result<(), PlaybackError>;

    fn pause(&self);

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent>;

    fn render(&self, surface: SurfaceState);

    /// Label used in logs.
    fn name(&self) -> &str {
        "player"
    }
}

/// Wait until the player can show a frame.
pub async fn await_ready(player: &dyn ClipPlayer, limit: Duration) -> Result<(), MediaLoadError> {
    // Subscribe before checking state so an event fired in between is not lost.
    let mut events = player.subscribe();
    if player.ready_state().can_render() {
        return Ok(());
    }
    if player.source().is_none() {
        return Err(MediaLoadError::NoSource);
    }

    let wait = async {
        loop {
            match events.recv().await {
                Ok(MediaEvent::LoadedMetadata)
                | Ok(MediaEvent::LoadedData)
                | Ok(MediaEvent::CanPlay)
                | Ok(MediaEvent::CanPlayThrough) => return Ok(()),
                Ok(MediaEvent::Error(msg)) => return Err(MediaLoadError::Media(msg)),
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => {
                    if player.ready_state().can_render() {
                        return Ok(());
                    }
                }
                Err(RecvError::Closed) => return Err(MediaLoadError::Closed),
            }
        }
    };

    tokio::time::timeout(limit, wait)
        .await
        .unwrap_or(Err(MediaLoadError::Timeout {
            what: "canplay",
            after: limit,
        }))
}

/// Wait until the clip's duration is known.
pub async fn await_metadata(
    player: &dyn ClipPlayer,
    limit: Duration,
) -> Result<(), MediaLoadError> {
    let mut events = player.subscribe();
    if has_metadata(player) {
        return Ok(());
    }
    if player.source().is_none() {
        return Err(MediaLoadError::NoSource);
    }

    let wait = async {
        loop {
            match events.recv().await {
                Ok(MediaEvent::LoadedMetadata) => return Ok(()),
                Ok(MediaEvent::Error(msg)) => return Err(MediaLoadError::Media(msg)),
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => {
                    if has_metadata(player) {
                        return Ok(());
                    }
                }
                Err(RecvError::Closed) => return Err(MediaLoadError::Closed),
            }
        }
    };

    tokio::time::timeout(limit, wait)
        .await
        .unwrap_or(Err(MediaLoadError::Timeout {
            what: "metadata",
            after: limit,
        }))
}

/// Seek to `seconds` (clamped to the clip) and wait for the seek to land.
pub async fn seek(
    player: &dyn ClipPlayer,
    seconds: f64,
    limit: Duration,
) -> Result<(), MediaLoadError> {
    let end = player.duration().filter(|d| d.is_finite()).unwrap_or(f64::INFINITY);
    let target = if seconds.is_finite() {
        seconds.clamp(0.0, end)
    } else {
        0.0
    };

    let mut events = player.subscribe();
    player.set_current_time(target);

    let wait = async {
        loop {
            match events.recv().await {
                Ok(MediaEvent::Seeked) => return Ok(()),
                Ok(MediaEvent::Error(msg)) => return Err(MediaLoadError::Media(msg)),
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return Err(MediaLoadError::Closed),
            }
        }
    };

    tokio::time::timeout(limit, wait)
        .await
        .unwrap_or(Err(MediaLoadError::Timeout {
            what: "seeked",
            after: limit,
        }))
}

fn has_metadata(player: &dyn ClipPlayer) -> bool {
    player.duration().map(|d| d > 0.0).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state_ordering() {
        assert!(!ReadyState::HaveNothing.can_render());
        assert!(!ReadyState::HaveMetadata.can_render());
        assert!(ReadyState::HaveCurrentData.can_render());
        assert!(ReadyState::HaveEnoughData.can_render());
    }

    #[test]
    fn test_surface_presets() {
        assert!(!SurfaceState::hidden().visible);
        assert_eq!(SurfaceState::hidden().opacity, 0.0);
        assert!(SurfaceState::shown().visible);
        assert_eq!(SurfaceState::shown().opacity, 1.0);
        assert_eq!(SurfaceState::default(), SurfaceState::hidden());
    }

    #[test]
    fn test_error_messages() {
        let e = MixerError::InvalidIndex { index: 7, len: 4 };
        assert_eq!(e.to_string(), "expression index 7 out of range (clip set has 4)");
        let e = MediaLoadError::Timeout {
            what: "canplay",
            after: Duration::from_secs(8),
        };
        assert!(e.to_string().contains("canplay"));
    }
}
