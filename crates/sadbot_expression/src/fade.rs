//! Linear opacity ramps on the tokio clock.

use std::time::Duration;
use tokio::time::Instant;

/// How a ramp ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampEnd {
    Finished,
    /// Cut short by `skip`; the end value was still applied.
    FastForwarded,
}

pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t.clamp(0.0, 1.0)
}

/// Drive `set` from `from` to `to` over `duration`, one step per `frame`.
///
/// The last call to `set` always receives `to`. When `skip` returns true the
/// ramp jumps straight there.
pub async fn ramp(
    from: f32,
    to: f32,
    duration: Duration,
    frame: Duration,
    skip: impl Fn() -> bool,
    mut set: impl FnMut(f32),
) -> RampEnd {
    let start = Instant::now();
    loop {
        let elapsed = start.elapsed();
        if elapsed >= duration {
            set(to);
            return RampEnd::Finished;
        }
        if skip() {
            set(to);
            return RampEnd::FastForwarded;
        }
        set(lerp(from, to, elapsed.as_secs_f32() / duration.as_secs_f32()));
        tokio::time::sleep(frame).await;
    }
}
