//! Camera that trails the crane, and the scroll back down the tower after a loss.

use crate::scheduler::Scheduler;
use crate::tween::Tween;
use glam::Vec3;
use std::time::Duration;
use tachyonfx::Interpolation;

/// Pause between game over and the start of the descent.
const RECAP_DELAY: Duration = Duration::from_secs(2);
/// Descent speed: seconds of scrolling per unit of height is 1/3.
const RECAP_UNITS_PER_SEC: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CameraAction {
    StartDescent,
}

/// What the crane is allowed to tell the camera.
pub trait RecapControl {
    fn begin_recap(&mut self, now: Duration);
    fn restart(&mut self);
}

/// Critically damped step from `current` towards `target`; `velocity` carries
/// over between calls.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut out = target + (change + temp) * decay;
    // Never overshoot.
    if (target - current > 0.0) == (out > target) {
        out = target;
        *velocity = 0.0;
    }
    out
}

#[derive(Debug, Clone)]
pub struct CameraFollowController {
    position: Vec3,
    start: Vec3,
    offset: Vec3,
    velocity: Vec3,
    damp_time: f32,
    keep_offset: bool,
    following: bool,
    descent: Option<Tween>,
    timers: Scheduler<CameraAction>,
}

impl CameraFollowController {
    /// `target` is where the followed object is when the camera is set up; the
    /// offset between the two (in the camera's plane) is captured here once.
    pub fn new(position: Vec3, target: Vec3, damp_time: f32, keep_offset: bool) -> Self {
        let flat_target = Vec3::new(target.x, target.y, position.z);
        Self {
            position,
            start: position,
            offset: position - flat_target,
            velocity: Vec3::ZERO,
            damp_time,
            keep_offset,
            following: true,
            descent: None,
            timers: Scheduler::new(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    /// True from `begin_recap` until the descent is finished or cancelled.
    pub fn descent_in_progress(&self, now: Duration) -> bool {
        self.timers.is_pending(CameraAction::StartDescent)
            || self.descent.is_some_and(|t| !t.is_finished(now))
    }

    pub fn tick(&mut self, now: Duration, dt: f32, target: Vec3) {
        while let Some(action) = self.timers.pop_due(now) {
            match action {
                CameraAction::StartDescent => self.start_descent(now),
            }
        }

        if self.following {
            let mut goal = Vec3::new(target.x, target.y, self.start.z);
            if self.keep_offset {
                goal += self.offset;
            }
            self.position = Vec3::new(
                smooth_damp(self.position.x, goal.x, &mut self.velocity.x, self.damp_time, dt),
                smooth_damp(self.position.y, goal.y, &mut self.velocity.y, self.damp_time, dt),
                smooth_damp(self.position.z, goal.z, &mut self.velocity.z, self.damp_time, dt),
            );
        } else if let Some(descent) = self.descent {
            self.position.y = descent.sample(now);
        }
    }

    fn start_descent(&mut self, now: Duration) {
        let height = (self.position.y - self.start.y).max(0.0);
        let duration = Duration::from_secs_f32(height / RECAP_UNITS_PER_SEC);
        log::debug!("recap descent over {:.2}s from y={:.2}", duration.as_secs_f32(), self.position.y);
        self.descent = Some(Tween::new(
            self.position.y,
            self.start.y,
            now,
            duration,
            Interpolation::SineInOut,
        ));
    }
}

impl RecapControl for CameraFollowController {
    fn begin_recap(&mut self, now: Duration) {
        self.following = false;
        self.timers.schedule(CameraAction::StartDescent, now, RECAP_DELAY);
    }

    fn restart(&mut self) {
        if self.timers.cancel(CameraAction::StartDescent) {
            log::debug!("recap cancelled before the descent started");
        }
        if let Some(descent) = self.descent.take() {
            self.position.y = descent.end();
            self.velocity = Vec3::ZERO;
        }
        self.following = true;
    }
}
