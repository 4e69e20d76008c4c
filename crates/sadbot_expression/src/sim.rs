//! Headless clip player.
//!
//! Clips become ready after a fixed latency and loop over a fixed length on
//! the tokio clock, so a paused test runtime drives them deterministically.
//! Failure switches let tests exercise the mixer's best-effort paths.

use crate::stage::{ClipPlayer, MediaEvent, PlaybackError, ReadyState, SurfaceState};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Time from `load` to `canplay`.
    pub load_latency: Duration,
    /// Loop length in seconds.
    pub clip_seconds: f64,
    pub fail_play: bool,
    pub fail_load: bool,
    /// Loads never report readiness.
    pub never_ready: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            load_latency: Duration::from_millis(50),
            clip_seconds: 4.0,
            fail_play: false,
            fail_load: false,
            never_ready: false,
        }
    }
}

#[derive(Debug)]
struct SimState {
    source: Option<String>,
    ready: ReadyState,
    duration: Option<f64>,
    /// Position at `anchor`.
    position: f64,
    anchor: Instant,
    playing: bool,
    load_seq: u64,
    surface: SurfaceState,
    loads: Vec<String>,
    plays: usize,
    renders: usize,
}

#[derive(Debug)]
struct Shared {
    name: String,
    options: Mutex<SimOptions>,
    state: Mutex<SimState>,
    events: broadcast::Sender<MediaEvent>,
}

#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    shared: Arc<Shared>,
}

impl SimulatedPlayer {
    pub fn new(name: &str) -> Self {
        Self::with_options(name, SimOptions::default())
    }

    pub fn with_options(name: &str, options: SimOptions) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            shared: Arc::new(Shared {
                name: name.to_string(),
                options: Mutex::new(options),
                state: Mutex::new(SimState {
                    source: None,
                    ready: ReadyState::HaveNothing,
                    duration: None,
                    position: 0.0,
                    anchor: Instant::now(),
                    playing: false,
                    load_seq: 0,
                    surface: SurfaceState::hidden(),
                    loads: Vec::new(),
                    plays: 0,
                    renders: 0,
                }),
                events,
            }),
        }
    }

    /// Change failure switches or latency for subsequent calls.
    pub fn configure(&self, f: impl FnOnce(&mut SimOptions)) {
        f(&mut self.shared.options.lock().unwrap());
    }

    pub fn surface(&self) -> SurfaceState {
        self.shared.state.lock().unwrap().surface
    }

    pub fn is_playing(&self) -> bool {
        self.shared.state.lock().unwrap().playing
    }

    /// Every URL passed to `load`, in order.
    pub fn loads(&self) -> Vec<String> {
        self.shared.state.lock().unwrap().loads.clone()
    }

    pub fn play_count(&self) -> usize {
        self.shared.state.lock().unwrap().plays
    }

    pub fn render_count(&self) -> usize {
        self.shared.state.lock().unwrap().renders
    }

    fn emit(&self, event: MediaEvent) {
        // No subscribers is fine.
        let _ = self.shared.events.send(event);
    }
}

impl SimState {
    fn position_at(&self, now: Instant) -> f64 {
        let mut pos = self.position;
        if self.playing {
            pos += now.saturating_duration_since(self.anchor).as_secs_f64();
        }
        match self.duration {
            Some(d) if d > 0.0 => pos % d,
            _ => pos,
        }
    }
}

#[async_trait]
impl ClipPlayer for SimulatedPlayer {
    fn load(&self, url: &str) {
        let options = self.shared.options.lock().unwrap().clone();
        let seq = {
            let mut st = self.shared.state.lock().unwrap();
            st.load_seq += 1;
            st.source = Some(url.to_string());
            st.ready = ReadyState::HaveNothing;
            st.duration = None;
            st.position = 0.0;
            st.anchor = Instant::now();
            st.playing = false;
            st.loads.push(url.to_string());
            st.load_seq
        };
        tracing::debug!("[{}] load {}", self.shared.name, url);

        if options.never_ready {
            return;
        }

        let player = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(options.load_latency).await;
            {
                let mut st = player.shared.state.lock().unwrap();
                // A newer load replaced this one.
                if st.load_seq != seq {
                    return;
                }
                if !options.fail_load {
                    st.duration = Some(options.clip_seconds);
                    st.ready = ReadyState::HaveEnoughData;
                }
            }
            if options.fail_load {
                player.emit(MediaEvent::Error("MEDIA_ERR_SRC_NOT_SUPPORTED".to_string()));
                return;
            }
            player.emit(MediaEvent::LoadedMetadata);
            player.emit(MediaEvent::LoadedData);
            player.emit(MediaEvent::CanPlay);
            player.emit(MediaEvent::CanPlayThrough);
        });
    }

    fn source(&self) -> Option<String> {
        self.shared.state.lock().unwrap().source.clone()
    }

    fn ready_state(&self) -> ReadyState {
        self.shared.state.lock().unwrap().ready
    }

    fn duration(&self) -> Option<f64> {
        self.shared.state.lock().unwrap().duration
    }

    fn current_time(&self) -> f64 {
        self.shared.state.lock().unwrap().position_at(Instant::now())
    }

    fn set_current_time(&self, seconds: f64) {
        {
            let mut st = self.shared.state.lock().unwrap();
            st.position = seconds.max(0.0);
            st.anchor = Instant::now();
        }
        self.emit(MediaEvent::Seeked);
    }

    async fn play(&self) -> Result<(), PlaybackError> {
        let fail = self.shared.options.lock().unwrap().fail_play;
        let mut st = self.shared.state.lock().unwrap();
        if fail {
            return Err(PlaybackError("NotAllowedError: play() was rejected".to_string()));
        }
        if st.source.is_none() {
            return Err(PlaybackError("no source".to_string()));
        }
        if !st.playing {
            let now = Instant::now();
            st.position = st.position_at(now);
            st.anchor = now;
            st.playing = true;
        }
        st.plays += 1;
        Ok(())
    }

    fn pause(&self) {
        let mut st = self.shared.state.lock().unwrap();
        if st.playing {
            let now = Instant::now();
            st.position = st.position_at(now);
            st.anchor = now;
            st.playing = false;
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.shared.events.subscribe()
    }

    fn render(&self, surface: SurfaceState) {
        let mut st = self.shared.state.lock().unwrap();
        st.surface = surface;
        st.renders += 1;
    }

    fn name(&self) -> &str {
        &self.shared.name
    }
}
