//! One-shot tweens sampled against the simulation clock, eased by tachyonfx curves.

use std::time::Duration;
use tachyonfx::Interpolation;

/// Scalar tween from `from` to `to`, starting at `start` on the sim clock.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    from: f32,
    to: f32,
    start: Duration,
    duration: Duration,
    ease: Interpolation,
}

impl Tween {
    pub fn new(from: f32, to: f32, start: Duration, duration: Duration, ease: Interpolation) -> Self {
        Self {
            from,
            to,
            start,
            duration,
            ease,
        }
    }

    pub fn progress(&self, now: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start).as_secs_f32();
        (elapsed / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn sample(&self, now: Duration) -> f32 {
        let k = self.ease.alpha(self.progress(now));
        self.from + (self.to - self.from) * k
    }

    pub fn is_finished(&self, now: Duration) -> bool {
        self.progress(now) >= 1.0
    }

    /// Value the tween settles on; what "complete immediately" jumps to.
    pub fn end(&self) -> f32 {
        self.to
    }
}
