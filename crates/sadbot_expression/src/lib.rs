//! # Sad Robot expression layer
//!
//! Puts the robot's mood on screen:
//!
//! 1. [`VideoMixer`] crossfades between looping clips on two buffers
//! 2. The clip set follows talking/listening; the clip follows the
//!    expression index
//! 3. [`Conductor`] wires robot messages through the
//!    [`sadbot_limbic::AffectTracker`] and onto the mixer
//!
//! Rendering backends implement [`ClipPlayer`]. [`SimulatedPlayer`] is a
//! headless one for tests and the CLI.

mod conductor;
mod fade;
mod mixer;
mod sim;
mod stage;

pub use conductor::Conductor;
pub use fade::{lerp, ramp, RampEnd};
pub use mixer::{BufferSnapshot, MixerSnapshot, MixerState, Mode, TransitionOutcome, VideoMixer};
pub use sim::{SimOptions, SimulatedPlayer};
pub use stage::{
    await_metadata, await_ready, seek, ClipPlayer, MediaEvent, MediaLoadError, MixerError,
    PlaybackError, ReadyState, SurfaceState,
};
