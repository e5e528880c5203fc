//! Fire-and-forget notifications from the core, and the HUD state they drive.

use glam::Vec3;

/// Something the presentation layer may want to show or play.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feedback {
    /// A new block appeared on the chain. `pitch` is the suggested SFX pitch.
    BlockSpawned { pitch: f32 },
    BlockReleased { pitch: f32 },
    /// The last dropped block was treated as settled; `bottom` is where
    /// placement particles go.
    BlockPlaced { bottom: Vec3 },
    /// Accuracy of the drop just scored and the run total after it.
    BlockScored { accuracy: f32, score: f32 },
    /// Combo number as shown to the player (consecutive drops minus one).
    ComboChanged { count: u32 },
    /// Combo of two or more drops; `intensity` grows with the count, capped.
    ComboFeedback { count: u32, intensity: f32 },
    ComboEnded,
    HeightChanged { height: f32 },
    GameOver { final_score: f32 },
    Restarted,
}

pub trait FeedbackSink {
    fn notify(&mut self, feedback: Feedback);
}

impl FeedbackSink for Vec<Feedback> {
    fn notify(&mut self, feedback: Feedback) {
        self.push(feedback);
    }
}

/// Seconds a rising score label stays on screen.
pub const RISING_TEXT_SECS: f32 = 1.2;

/// Floating "N!" label for the accuracy of one drop.
#[derive(Debug, Clone, PartialEq)]
pub struct RisingScore {
    pub label: String,
    pub accuracy: f32,
    pub age: f32,
}

impl RisingScore {
    /// 0 when spawned, 1 when about to disappear.
    pub fn progress(&self) -> f32 {
        (self.age / RISING_TEXT_SECS).min(1.0)
    }
}

/// What the terminal shows about the run. Only ever written through
/// [`FeedbackSink::notify`] and [`Hud::tick`].
#[derive(Debug, Clone, Default)]
pub struct Hud {
    pub score_text: String,
    pub height_text: String,
    pub combo_text: String,
    pub combo_panel_visible: bool,
    pub combo_intensity: f32,
    pub popups: Vec<RisingScore>,
    pub game_over_text: Option<String>,
    /// Set on each combo hit; the UI takes it to start a flash effect.
    pub combo_flash: bool,
    pub last_placed_at: Option<Vec3>,
}

impl Hud {
    pub fn new() -> Self {
        let mut hud = Self::default();
        hud.reset();
        hud
    }

    fn reset(&mut self) {
        self.score_text = "0 pt".to_string();
        self.height_text = "0 tp".to_string();
        self.combo_text = "0".to_string();
        self.combo_panel_visible = false;
        self.combo_intensity = 0.0;
        self.popups.clear();
        self.game_over_text = None;
        self.combo_flash = false;
        self.last_placed_at = None;
    }

    /// Age and expire rising labels.
    pub fn tick(&mut self, dt: f32) {
        self.popups.retain_mut(|p| {
            p.age += dt;
            p.age < RISING_TEXT_SECS
        });
    }

    pub fn take_combo_flash(&mut self) -> bool {
        std::mem::take(&mut self.combo_flash)
    }
}

impl FeedbackSink for Hud {
    fn notify(&mut self, feedback: Feedback) {
        match feedback {
            Feedback::BlockSpawned { pitch } | Feedback::BlockReleased { pitch } => {
                log::trace!("sfx {feedback:?} pitch={pitch:.2}");
            }
            Feedback::BlockPlaced { bottom } => self.last_placed_at = Some(bottom),
            Feedback::BlockScored { accuracy, score } => {
                self.score_text = format!("{} pt", score.round());
                self.popups.push(RisingScore {
                    label: format!("{}!", accuracy.round() as i32),
                    accuracy,
                    age: 0.0,
                });
            }
            Feedback::ComboChanged { count } => self.combo_text = count.to_string(),
            Feedback::ComboFeedback { intensity, .. } => {
                self.combo_panel_visible = true;
                self.combo_intensity = intensity;
                self.combo_flash = true;
            }
            Feedback::ComboEnded => {
                self.combo_panel_visible = false;
                self.combo_intensity = 0.0;
            }
            Feedback::HeightChanged { height } => {
                self.height_text = format!("{} tp", (height * 100.0).round() / 100.0);
            }
            Feedback::GameOver { final_score } => {
                self.game_over_text = Some(format!("You Hoarded: {}!", final_score.round()));
            }
            Feedback::Restarted => self.reset(),
        }
    }
}
