//! Game: wires crane, score keeper, camera, physics and HUD together and
//! advances them on one simulation clock.

use crate::camera::CameraFollowController;
use crate::crane::{CraneController, CraneError, Links, Trigger};
use crate::feedback::Hud;
use crate::physics::{Physics, SimplePhysics};
use crate::score::ScoreKeeper;
use crate::GameConfig;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

/// Where the crane sits at the start of every run.
pub const CRANE_START: Vec3 = Vec3::new(0.0, 10.0, 0.0);
/// Camera starts level with the crane, pulled back from the tower.
const CAMERA_START: Vec3 = Vec3::new(0.0, 6.0, -20.0);

pub struct Game {
    physics: SimplePhysics,
    crane: CraneController,
    score: ScoreKeeper,
    camera: CameraFollowController,
    hud: Hud,
    now: Duration,
    triggers: Vec<Trigger>,
}

impl Game {
    pub fn new(config: &GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let crane = CraneController::new(CRANE_START, config.crane.clone(), rng);
        Self {
            physics: SimplePhysics::new(crane.anchor()),
            crane,
            score: ScoreKeeper::new(config.base_combo_time),
            camera: CameraFollowController::new(CAMERA_START, CRANE_START, config.damp_time, config.keep_offset),
            hud: Hud::new(),
            now: Duration::ZERO,
            triggers: Vec::new(),
        }
    }

    /// Queue a trigger for the next tick. The crane decides whether it applies.
    pub fn trigger(&mut self, trigger: Trigger) {
        self.triggers.push(trigger);
    }

    /// The one-button control: drop while playing, restart once the run is over.
    pub fn primary_action(&mut self) {
        let trigger = if self.crane.is_dead() {
            Trigger::Restart
        } else {
            Trigger::Drop
        };
        self.trigger(trigger);
    }

    /// The restart key. Only a loss already shown to the player can be restarted.
    pub fn restart(&mut self) {
        if self.crane.is_dead() {
            self.trigger(Trigger::Restart);
        }
    }

    /// Advance everything by `dt`. Combo expiry runs before the crane so a drop
    /// scored this tick never sees a window that already ran out.
    pub fn tick(&mut self, dt: Duration) -> Result<(), CraneError> {
        self.now += dt;
        let secs = dt.as_secs_f32();

        self.score.tick_combo_window(self.now, &mut self.hud);
        self.physics.step(secs);

        let triggers = std::mem::take(&mut self.triggers);
        let mut links = Links {
            physics: &mut self.physics,
            score: &mut self.score,
            camera: &mut self.camera,
            fx: &mut self.hud,
        };
        self.crane.tick(self.now, &triggers, &mut links)?;

        self.camera.tick(self.now, secs, self.crane.position());
        self.hud.tick(secs);
        Ok(())
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn crane(&self) -> &CraneController {
        &self.crane
    }

    pub fn score(&self) -> &ScoreKeeper {
        &self.score
    }

    pub fn camera(&self) -> &CameraFollowController {
        &self.camera
    }

    pub fn physics(&self) -> &SimplePhysics {
        &self.physics
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn hud_mut(&mut self) -> &mut Hud {
        &mut self.hud
    }

    pub fn is_frozen(&self, id: crate::physics::BlockId) -> bool {
        self.physics.is_kinematic(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crane::{CraneConfig, CranePhase};

    const DT: Duration = Duration::from_millis(10);

    fn config(seed: u64) -> GameConfig {
        GameConfig {
            crane: CraneConfig::default(),
            base_combo_time: Duration::from_secs(3),
            damp_time: 0.3,
            keep_offset: false,
            seed: Some(seed),
        }
    }

    fn run_for(game: &mut Game, ms: u64) {
        for _ in 0..ms / 10 {
            game.tick(DT).unwrap();
        }
    }

    #[test]
    fn test_first_block_lands_scores_and_lifts() {
        let mut game = Game::new(&config(1));
        run_for(&mut game, 1000);
        assert_eq!(game.crane().phase(), CranePhase::Holding);

        game.primary_action();
        run_for(&mut game, 2100);
        assert!(!game.crane().is_dead());
        assert!((game.score().score() - 10.0).abs() < 1e-4);
        assert!((game.score().height() - 1.0).abs() < 1e-3);
        assert_eq!(game.hud().score_text, "10 pt");
        assert_eq!(game.hud().height_text, "1 tp");
        assert_eq!(game.crane().phase(), CranePhase::Holding);

        let a = game.crane().tower()[0].id;
        let landed = game.physics().transform(a).unwrap();
        assert!((landed.position.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_same_seed_replays_identically() {
        let mut a = Game::new(&config(42));
        let mut b = Game::new(&config(42));
        for g in [&mut a, &mut b] {
            run_for(g, 1300);
            g.primary_action();
            run_for(g, 500);
        }
        let landed = |g: &Game| {
            g.crane()
                .tower()
                .iter()
                .map(|blk| g.physics().transform(blk.id).unwrap().position)
                .collect::<Vec<_>>()
        };
        assert_eq!(landed(&a).len(), 1);
        assert_eq!(landed(&a), landed(&b));
    }

    #[test]
    fn test_primary_action_restarts_only_after_death() {
        let mut game = Game::new(&config(3));
        run_for(&mut game, 1000);
        game.primary_action();
        run_for(&mut game, 100);
        assert_eq!(game.crane().tower().len(), 1);
        // Alive: a queued restart is ignored.
        game.trigger(Trigger::Restart);
        run_for(&mut game, 10);
        assert_eq!(game.crane().tower().len(), 1);
    }

    #[test]
    fn test_restart_key_is_dropped_while_the_run_is_going() {
        let mut game = Game::new(&config(3));
        run_for(&mut game, 1000);
        game.restart();
        assert!(game.triggers.is_empty());
        run_for(&mut game, 10);
        assert!(!game.crane().is_dead());
        assert_eq!(game.crane().phase(), CranePhase::Holding);
    }

    #[test]
    fn test_camera_follows_crane_up() {
        let mut game = Game::new(&config(5));
        run_for(&mut game, 1000);
        game.primary_action();
        run_for(&mut game, 5000);
        assert!((game.camera().position().y - game.crane().position().y).abs() < 1e-2);
    }
}
