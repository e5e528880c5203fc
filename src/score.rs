//! Score, tower height and the combo window.

use crate::feedback::{Feedback, FeedbackSink};
use crate::scheduler::Scheduler;
use std::time::Duration;

/// Combo pitch/intensity: base + min(step * combo, cap).
const COMBO_INTENSITY_BASE: f32 = 0.9;
const COMBO_INTENSITY_STEP: f32 = 0.1;
const COMBO_INTENSITY_CAP: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreAction {
    EndCombo,
}

/// What the crane is allowed to tell the score keeper.
pub trait ScoreSink {
    fn report_accuracy(&mut self, accuracy: f32, now: Duration, fx: &mut dyn FeedbackSink);
    fn set_height(&mut self, height: f32, fx: &mut dyn FeedbackSink);
    fn finalize_run(&mut self, fx: &mut dyn FeedbackSink);
    fn reset(&mut self, fx: &mut dyn FeedbackSink);
}

#[derive(Debug, Clone)]
pub struct ScoreKeeper {
    score: f32,
    height: f32,
    /// Consecutive drops inside the window; the player sees this minus one.
    combo: u32,
    base_combo_time: Duration,
    finalized: bool,
    timers: Scheduler<ScoreAction>,
}

impl ScoreKeeper {
    pub fn new(base_combo_time: Duration) -> Self {
        Self {
            score: 0.0,
            height: 0.0,
            combo: 0,
            base_combo_time,
            finalized: false,
            timers: Scheduler::new(),
        }
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Combo number shown in the HUD: the second prompt drop is a "1 combo".
    pub fn displayed_combo(&self) -> u32 {
        self.combo.saturating_sub(1)
    }

    pub fn combo_deadline(&self) -> Option<Duration> {
        self.timers.deadline(ScoreAction::EndCombo)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Fraction of the combo window still left, 0 when no window is open.
    pub fn combo_remaining(&self, now: Duration) -> f32 {
        let Some(deadline) = self.combo_deadline() else {
            return 0.0;
        };
        if self.base_combo_time.is_zero() {
            return 0.0;
        }
        let left = deadline.saturating_sub(now).as_secs_f32();
        (left / self.base_combo_time.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn record_drop(&mut self, accuracy: f32, now: Duration, fx: &mut dyn FeedbackSink) {
        if self.finalized {
            log::warn!("drop scored after the run ended; ignoring accuracy {accuracy:.2}");
            return;
        }
        // A window that ran out this same tick must not pay a stale bonus.
        self.tick_combo_window(now, fx);

        self.score += accuracy + self.combo as f32;
        fx.notify(Feedback::BlockScored {
            accuracy,
            score: self.score,
        });

        self.combo += 1;
        fx.notify(Feedback::ComboChanged {
            count: self.displayed_combo(),
        });
        if self.combo > 1 {
            let intensity = COMBO_INTENSITY_BASE
                + (COMBO_INTENSITY_STEP * self.combo as f32).min(COMBO_INTENSITY_CAP);
            fx.notify(Feedback::ComboFeedback {
                count: self.displayed_combo(),
                intensity,
            });
        }

        self.timers
            .schedule(ScoreAction::EndCombo, now, self.base_combo_time);
        log::debug!(
            "scored {accuracy:.2} (+{} combo) -> {:.2}, combo {}",
            self.combo - 1,
            self.score,
            self.combo
        );
    }

    /// Close the combo window once its deadline passes without a new drop.
    pub fn tick_combo_window(&mut self, now: Duration, fx: &mut dyn FeedbackSink) {
        while let Some(action) = self.timers.pop_due(now) {
            match action {
                ScoreAction::EndCombo => self.end_combo(fx),
            }
        }
    }

    fn end_combo(&mut self, fx: &mut dyn FeedbackSink) {
        self.timers.cancel(ScoreAction::EndCombo);
        if self.combo > 0 {
            log::debug!("combo of {} ended", self.combo);
        }
        self.combo = 0;
        fx.notify(Feedback::ComboEnded);
    }
}

impl ScoreSink for ScoreKeeper {
    fn report_accuracy(&mut self, accuracy: f32, now: Duration, fx: &mut dyn FeedbackSink) {
        self.record_drop(accuracy, now, fx);
    }

    fn set_height(&mut self, height: f32, fx: &mut dyn FeedbackSink) {
        if height != self.height {
            self.height = height;
            fx.notify(Feedback::HeightChanged { height });
        }
    }

    fn finalize_run(&mut self, fx: &mut dyn FeedbackSink) {
        self.end_combo(fx);
        self.finalized = true;
        fx.notify(Feedback::GameOver {
            final_score: self.score,
        });
    }

    fn reset(&mut self, fx: &mut dyn FeedbackSink) {
        self.timers.cancel_all();
        self.score = 0.0;
        self.height = 0.0;
        self.combo = 0;
        self.finalized = false;
        fx.notify(Feedback::HeightChanged { height: 0.0 });
    }
}
