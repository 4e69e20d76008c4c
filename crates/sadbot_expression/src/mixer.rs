//! Two-buffer crossfading video mixer
//!
//! One buffer is in front and visible; the other sits hidden behind it,
//! usually preloaded with the clip the next transition will need. A
//! transition loads the back buffer if needed, syncs its position to the
//! front, fades the two against each other and swaps roles.
//!
//! Requests are latest-wins. Every request that changes the desired
//! `(index, mode)` bumps a generation counter:
//! - a fade in flight when the generation moves jumps to its end values and
//!   finishes normally
//! - a queued request whose generation is stale returns `Superseded`
//! - a request for the target already desired waits its turn and returns
//!   `AlreadyCurrent`
//!
//! Transitions never overlap: they run one at a time behind a FIFO lock.

use crate::fade::{ramp, RampEnd};
use crate::stage::{await_metadata, await_ready, seek, ClipPlayer, MixerError, SurfaceState};
use sadbot_core::MixerConfig;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex as TurnLock};
use tokio::task::JoinHandle;

/// Which clip set is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Listening,
    Talking,
}

impl Mode {
    pub fn from_talking(talking: bool) -> Self {
        if talking {
            Mode::Talking
        } else {
            Mode::Listening
        }
    }

    pub fn is_talking(self) -> bool {
        self == Mode::Talking
    }

    pub fn other(self) -> Self {
        match self {
            Mode::Listening => Mode::Talking,
            Mode::Talking => Mode::Listening,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Listening => write!(f, "listening"),
            Mode::Talking => write!(f, "talking"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum MixerState {
    Idle,
    Playing { index: usize, mode: Mode },
    Transitioning { from: usize, to: usize, mode: Mode },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// A crossfade ran to the requested target (possibly fast-forwarded).
    Completed,
    /// The target was already on screen; nothing changed.
    AlreadyCurrent,
    /// A newer request replaced this one before it ran.
    Superseded,
    /// The request was invalid and was dropped.
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
pub struct BufferSnapshot {
    pub name: String,
    pub source: Option<String>,
    pub surface: SurfaceState,
    pub is_front: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MixerSnapshot {
    pub state: MixerState,
    pub current_index: usize,
    pub mode: Mode,
    pub buffers: Vec<BufferSnapshot>,
    pub transitions: u64,
}

impl MixerSnapshot {
    pub fn visible_count(&self) -> usize {
        self.buffers.iter().filter(|b| b.surface.visible).count()
    }

    pub fn front(&self) -> Option<&BufferSnapshot> {
        self.buffers.iter().find(|b| b.is_front)
    }
}

/// Everything guarded by the stage lock. Never held across an await.
#[derive(Debug)]
struct Stage {
    front: usize,
    surfaces: [SurfaceState; 2],
    desired_index: usize,
    mode: Mode,
    shown: Option<(usize, Mode)>,
    state: MixerState,
}

impl Stage {
    fn back(&self) -> usize {
        1 - self.front
    }

    fn settled_state(&self) -> MixerState {
        match self.shown {
            Some((index, mode)) => MixerState::Playing { index, mode },
            None => MixerState::Idle,
        }
    }
}

struct PendingGuard<'a>(&'a AtomicUsize);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct VideoMixer {
    config: MixerConfig,
    players: [Arc<dyn ClipPlayer>; 2],
    stage: Mutex<Stage>,
    generation: watch::Sender<u64>,
    turn: TurnLock<()>,
    /// Requests registered but not yet finished.
    pending: AtomicUsize,
    completed: AtomicU64,
}

impl VideoMixer {
    /// `front` starts as the visible buffer.
    pub fn new(config: MixerConfig, front: Arc<dyn ClipPlayer>, back: Arc<dyn ClipPlayer>) -> Self {
        let (generation, _) = watch::channel(0);
        let stage = Stage {
            front: 0,
            surfaces: [SurfaceState::hidden(); 2],
            desired_index: config.initial_index,
            mode: Mode::Listening,
            shown: None,
            state: MixerState::Idle,
        };
        Self {
            config,
            players: [front, back],
            stage: Mutex::new(stage),
            generation,
            turn: TurnLock::new(()),
            pending: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    pub fn clips(&self, mode: Mode) -> &[String] {
        match mode {
            Mode::Listening => &self.config.listening,
            Mode::Talking => &self.config.talking,
        }
    }

    /// Show the initial clip in the front buffer and preload its
    /// counterpart from the other clip set behind it.
    pub async fn start(&self) {
        let _turn = self.turn.lock().await;

        let (index, mode, slot) = {
            let stage = self.stage.lock().unwrap();
            if stage.shown.is_some() {
                tracing::debug!("Mixer already started");
                return;
            }
            (stage.desired_index, stage.mode, stage.front)
        };
        let Some(url) = self.clips(mode).get(index).cloned() else {
            self.warn_invalid(index, mode);
            return;
        };

        let player = &self.players[slot];
        player.load(&url);
        if let Err(e) = await_ready(player.as_ref(), self.config.ready_timeout()).await {
            tracing::warn!("Initial clip {} not ready: {}", url, e);
        }

        self.set_surface(slot, SurfaceState::shown());
        if let Err(e) = player.play().await {
            tracing::warn!("{}: {}", player.name(), e);
        }

        {
            let mut stage = self.stage.lock().unwrap();
            stage.shown = Some((index, mode));
            stage.state = MixerState::Playing { index, mode };
        }
        tracing::info!("Stage started on {} clip {} ({})", mode, index, url);

        self.preload_inactive();
    }

    /// Crossfade to `index` in the active clip set. Resolves once the
    /// crossfade (or the decision not to run one) is done.
    pub async fn go_to(&self, index: usize, duration: Duration) -> TransitionOutcome {
        match self.request_index(index) {
            Some(generation) => self.run(generation, duration).await,
            None => TransitionOutcome::Ignored,
        }
    }

    /// Like [`VideoMixer::go_to`], but registered immediately and run on a
    /// background task.
    pub fn spawn_go_to(self: &Arc<Self>, index: usize, duration: Duration) -> JoinHandle<TransitionOutcome> {
        let ticket = self.request_index(index);
        let mixer = Arc::clone(self);
        tokio::spawn(async move {
            match ticket {
                Some(generation) => mixer.run(generation, duration).await,
                None => TransitionOutcome::Ignored,
            }
        })
    }

    /// Switch clip sets at the current index. No-op when unchanged.
    pub async fn set_talking(&self, talking: bool) -> TransitionOutcome {
        match self.request_mode(talking) {
            Some(generation) => self.run(generation, self.config.mode_switch()).await,
            None => TransitionOutcome::AlreadyCurrent,
        }
    }

    pub fn spawn_set_talking(self: &Arc<Self>, talking: bool) -> JoinHandle<TransitionOutcome> {
        let ticket = self.request_mode(talking);
        let mixer = Arc::clone(self);
        tokio::spawn(async move {
            match ticket {
                Some(generation) => mixer.run(generation, mixer.config.mode_switch()).await,
                None => TransitionOutcome::AlreadyCurrent,
            }
        })
    }

    /// Set the desired index without starting a transition. The next
    /// transition or preload picks it up.
    pub fn queue_index(&self, index: usize) {
        let mut stage = self.stage.lock().unwrap();
        let len = self.clips(stage.mode).len();
        if index >= len {
            tracing::warn!("{}", MixerError::InvalidIndex { index, len });
            return;
        }
        stage.desired_index = index;
        tracing::debug!("Queued expression index {}", index);
    }

    /// Latest requested index; may be ahead of what is on screen.
    pub fn current_index(&self) -> usize {
        self.stage.lock().unwrap().desired_index
    }

    pub fn mode(&self) -> Mode {
        self.stage.lock().unwrap().mode
    }

    pub fn is_talking(&self) -> bool {
        self.mode().is_talking()
    }

    pub fn state(&self) -> MixerState {
        self.stage.lock().unwrap().state
    }

    pub fn snapshot(&self) -> MixerSnapshot {
        let stage = self.stage.lock().unwrap();
        let buffers = (0..2)
            .map(|slot| BufferSnapshot {
                name: self.players[slot].name().to_string(),
                source: self.players[slot].source(),
                surface: stage.surfaces[slot],
                is_front: slot == stage.front,
            })
            .collect();
        MixerSnapshot {
            state: stage.state,
            current_index: stage.desired_index,
            mode: stage.mode,
            buffers,
            transitions: self.completed.load(Ordering::SeqCst),
        }
    }

    /// Wait until every registered request has finished.
    pub async fn settle(&self) {
        loop {
            drop(self.turn.lock().await);
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    fn request_index(&self, index: usize) -> Option<u64> {
        let mut stage = self.stage.lock().unwrap();
        let len = self.clips(stage.mode).len();
        if index >= len {
            tracing::warn!("{}", MixerError::InvalidIndex { index, len });
            return None;
        }
        if stage.desired_index != index {
            stage.desired_index = index;
            self.generation.send_modify(|g| *g += 1);
        }
        self.pending.fetch_add(1, Ordering::SeqCst);
        Some(*self.generation.borrow())
    }

    fn request_mode(&self, talking: bool) -> Option<u64> {
        let mode = Mode::from_talking(talking);
        let mut stage = self.stage.lock().unwrap();
        if stage.mode == mode {
            return None;
        }
        stage.mode = mode;
        self.generation.send_modify(|g| *g += 1);
        self.pending.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Mode -> {}", mode);
        Some(*self.generation.borrow())
    }

    fn current_generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Resolves once the generation moves past `generation`.
    async fn superseded(&self, generation: u64) {
        let mut rx = self.generation.subscribe();
        loop {
            if *rx.borrow_and_update() != generation {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    async fn run(&self, generation: u64, duration: Duration) -> TransitionOutcome {
        let _pending = PendingGuard(&self.pending);
        let _turn = self.turn.lock().await;

        if self.current_generation() != generation {
            tracing::debug!("Request (generation {}) superseded", generation);
            return TransitionOutcome::Superseded;
        }

        let (index, mode, shown) = {
            let stage = self.stage.lock().unwrap();
            (stage.desired_index, stage.mode, stage.shown)
        };
        if shown == Some((index, mode)) {
            return TransitionOutcome::AlreadyCurrent;
        }

        self.crossfade_to(index, mode, duration, generation).await
    }

    // ------------------------------------------------------------------
    // Transition
    // ------------------------------------------------------------------

    async fn crossfade_to(
        &self,
        index: usize,
        mode: Mode,
        duration: Duration,
        generation: u64,
    ) -> TransitionOutcome {
        let Some(url) = self.clips(mode).get(index).cloned() else {
            self.warn_invalid(index, mode);
            return TransitionOutcome::Ignored;
        };

        let (front_slot, back_slot) = {
            let mut stage = self.stage.lock().unwrap();
            let from = stage.shown.map(|(i, _)| i).unwrap_or(index);
            stage.state = MixerState::Transitioning {
                from,
                to: index,
                mode,
            };
            (stage.front, stage.back())
        };
        let front = Arc::clone(&self.players[front_slot]);
        let back = Arc::clone(&self.players[back_slot]);

        tracing::info!(
            "Switching to {} clip {} ({}) over {}ms",
            mode,
            index,
            url,
            duration.as_millis()
        );

        if !self.prepare_back(front.as_ref(), back.as_ref(), &url, generation).await {
            let mut stage = self.stage.lock().unwrap();
            stage.state = stage.settled_state();
            tracing::debug!("Abandoned load of {} for a newer request", url);
            return TransitionOutcome::Superseded;
        }

        let target = back
            .duration()
            .unwrap_or(f64::INFINITY)
            .min(front.current_time());
        if let Err(e) = seek(back.as_ref(), target, self.config.seek_timeout()).await {
            tracing::warn!("Seek on {} failed: {}", back.name(), e);
        }

        self.set_surface(
            back_slot,
            SurfaceState {
                opacity: 0.0,
                visible: true,
                on_top: true,
            },
        );
        if let Err(e) = back.play().await {
            tracing::warn!("{}: {}", back.name(), e);
        }

        let frame = self.config.frame();
        let skip = || self.current_generation() != generation;
        let (fade_out, fade_in) = tokio::join!(
            ramp(1.0, 0.0, duration, frame, &skip, |v| self.set_opacity(front_slot, v)),
            ramp(0.0, 1.0, duration, frame, &skip, |v| self.set_opacity(back_slot, v)),
        );
        if fade_out == RampEnd::FastForwarded || fade_in == RampEnd::FastForwarded {
            tracing::debug!("Fade to clip {} fast-forwarded", index);
        }

        front.pause();
        let surfaces = {
            let mut stage = self.stage.lock().unwrap();
            stage.surfaces[front_slot] = SurfaceState::hidden();
            stage.surfaces[back_slot] = SurfaceState::shown();
            stage.front = back_slot;
            stage.shown = Some((index, mode));
            stage.state = MixerState::Playing { index, mode };
            stage.surfaces
        };
        self.players[front_slot].render(surfaces[front_slot]);
        self.players[back_slot].render(surfaces[back_slot]);
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.current_generation() == generation {
            self.preload_inactive();
        }
        TransitionOutcome::Completed
    }

    /// Make sure the back buffer holds `url` and can render. Media failures
    /// are logged and the transition goes ahead. Returns false if a newer
    /// request arrived before the clip was ready.
    async fn prepare_back(
        &self,
        front: &dyn ClipPlayer,
        back: &dyn ClipPlayer,
        url: &str,
        generation: u64,
    ) -> bool {
        let work = async {
            if back.source().as_deref() != Some(url) {
                tracing::debug!("Loading {} into {}", url, back.name());
                back.load(url);
                let limit = self.config.metadata_timeout();
                let (front_meta, back_meta) =
                    tokio::join!(await_metadata(front, limit), await_metadata(back, limit));
                if let Err(e) = front_meta {
                    tracing::debug!("No metadata for {}: {}", front.name(), e);
                }
                if let Err(e) = back_meta {
                    tracing::warn!("No metadata for {}: {}", url, e);
                }
                if let Err(e) = await_ready(back, self.config.ready_timeout()).await {
                    tracing::warn!("Clip {} not ready: {}", url, e);
                }
            } else if !back.ready_state().can_render() {
                if let Err(e) = await_ready(back, self.config.ready_timeout()).await {
                    tracing::warn!("Clip {} not ready: {}", url, e);
                }
            } else {
                tracing::debug!("{} already loaded in {}", url, back.name());
            }
        };

        tokio::select! {
            biased;
            _ = work => true,
            _ = self.superseded(generation) => false,
        }
    }

    /// Load the current index of the other clip set into the hidden buffer.
    fn preload_inactive(&self) {
        let (index, mode, slot) = {
            let stage = self.stage.lock().unwrap();
            (stage.desired_index, stage.mode.other(), stage.back())
        };
        let Some(url) = self.clips(mode).get(index) else {
            self.warn_invalid(index, mode);
            return;
        };
        let player = &self.players[slot];
        if player.source().as_deref() == Some(url.as_str()) {
            return;
        }
        tracing::debug!("Preloading {} into {}", url, player.name());
        player.load(url);
    }

    fn set_surface(&self, slot: usize, surface: SurfaceState) {
        self.stage.lock().unwrap().surfaces[slot] = surface;
        self.players[slot].render(surface);
    }

    fn set_opacity(&self, slot: usize, opacity: f32) {
        let surface = {
            let mut stage = self.stage.lock().unwrap();
            stage.surfaces[slot].opacity = opacity;
            stage.surfaces[slot]
        };
        self.players[slot].render(surface);
    }

    fn warn_invalid(&self, index: usize, mode: Mode) {
        let len = self.clips(mode).len();
        tracing::warn!("{}", MixerError::InvalidIndex { index, len });
    }
}
