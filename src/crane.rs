//! The crane: spawns the swinging block, drops it on command, scores the
//! landing, watches for the tower failing and resets for another run.

use crate::camera::RecapControl;
use crate::feedback::{Feedback, FeedbackSink};
use crate::physics::{BLOCK_HALF_HEIGHT, BlockId, Physics};
use crate::scheduler::Scheduler;
use crate::score::ScoreSink;
use crate::tween::Tween;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;
use std::f32::consts::TAU;
use std::time::Duration;
use tachyonfx::Interpolation;
use thiserror::Error;

/// Delay before the first block, and after a restart.
const SPAWN_DELAY: Duration = Duration::from_secs(1);
/// Time a dropped block gets to settle before it is scored.
const SETTLE_DELAY: Duration = Duration::from_millis(1500);
/// Delay between scoring and the next block appearing.
const RESPAWN_DELAY: Duration = Duration::from_millis(500);
const LIFT_TIME: Duration = Duration::from_millis(500);
const POP_IN_TIME: Duration = Duration::from_millis(200);
/// The last chain link hangs this far below the crane.
const ANCHOR_OFFSET: Vec3 = Vec3::new(0.0, -2.0, 0.0);
/// Lateral spawn push per unit of swing strength.
const SWING_IMPULSE_SCALE: f32 = 5.0;

const MAX_ACCURACY: f32 = 10.0;
/// Accuracy lost per unit of horizontal misalignment.
const MISALIGNMENT_PENALTY: f32 = 15.0;
/// The run is lost once the dropped block's centre falls below the previous block's
/// centre plus this margin.
const DEATH_MARGIN: f32 = 1.0;

#[derive(Debug, Error)]
pub enum CraneError {
    #[error("crane tried to place a block but none was dropped")]
    NothingDropped,
    #[error("block {0:?} is no longer known to the physics world")]
    UnknownBlock(BlockId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Drop,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CraneAction {
    SpawnBlock,
    MoveNextBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CranePhase {
    /// Waiting for the next block to appear.
    Spawning,
    Holding,
    /// A block is in the air or settling; the crane moves up when it is scored.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStatus {
    Held,
    Dropped,
    Placed,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub status: PlacementStatus,
    /// Scale of the visible model; pops in when the block spawns.
    pub model_scale: Tween,
}

#[derive(Debug, Clone)]
pub struct CraneConfig {
    pub move_per_block: f32,
    pub swing_strength: f32,
    /// Freeze blocks lower in the tower once a newer one has settled on them.
    pub freeze_placed: bool,
    pub pitch_variance: f32,
}

impl Default for CraneConfig {
    fn default() -> Self {
        Self {
            move_per_block: 2.0,
            swing_strength: 0.6,
            freeze_placed: false,
            pitch_variance: 0.1,
        }
    }
}

/// Everything the crane talks to during a tick, each behind the narrowest
/// interface it needs.
pub struct Links<'a> {
    pub physics: &'a mut dyn Physics,
    pub score: &'a mut dyn ScoreSink,
    pub camera: &'a mut dyn RecapControl,
    pub fx: &'a mut dyn FeedbackSink,
}

/// Accuracy in 0..=10 of a drop. The first block of a run has nothing to
/// miss and always scores the maximum.
pub fn placement_accuracy(dropped_bottom_x: f32, placed_x: Option<f32>) -> f32 {
    match placed_x {
        None => MAX_ACCURACY,
        Some(x) => (MAX_ACCURACY - (dropped_bottom_x - x).abs() * MISALIGNMENT_PENALTY).max(0.0),
    }
}

#[derive(Debug)]
pub struct CraneController {
    config: CraneConfig,
    start: Vec3,
    position: Vec3,
    lift: Option<Tween>,
    holding: Option<Block>,
    last_dropped: Option<BlockId>,
    last_placed: Option<BlockId>,
    /// Every block dropped this run, oldest first.
    tower: Vec<Block>,
    death_threshold: f32,
    dead: bool,
    timers: Scheduler<CraneAction>,
    rng: StdRng,
}

impl CraneController {
    pub fn new(start: Vec3, config: CraneConfig, rng: StdRng) -> Self {
        let mut timers = Scheduler::new();
        timers.schedule(CraneAction::SpawnBlock, Duration::ZERO, SPAWN_DELAY);
        Self {
            config,
            start,
            position: start,
            lift: None,
            holding: None,
            last_dropped: None,
            last_placed: None,
            tower: Vec::new(),
            death_threshold: 0.0,
            dead: false,
            timers,
            rng,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Where the last chain link (and the held block's hinge) is.
    pub fn anchor(&self) -> Vec3 {
        self.position + ANCHOR_OFFSET
    }

    pub fn holding(&self) -> Option<&Block> {
        self.holding.as_ref()
    }

    pub fn tower(&self) -> &[Block] {
        &self.tower
    }

    pub fn last_dropped(&self) -> Option<BlockId> {
        self.last_dropped
    }

    pub fn last_placed(&self) -> Option<BlockId> {
        self.last_placed
    }

    pub fn death_threshold(&self) -> f32 {
        self.death_threshold
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Tower height in blocks above the starting point.
    pub fn height(&self) -> f32 {
        (self.position.y - self.start.y) / (2.0 * BLOCK_HALF_HEIGHT)
    }

    pub fn phase(&self) -> CranePhase {
        if self.holding.is_some() {
            CranePhase::Holding
        } else if self.timers.is_pending(CraneAction::MoveNextBlock) {
            CranePhase::Dropped
        } else {
            CranePhase::Spawning
        }
    }

    /// One simulation step. Death is checked before any trigger or scheduled
    /// action so nothing can be dropped on the tick the run ends. A restart
    /// only answers a death seen on an earlier tick.
    pub fn tick(&mut self, now: Duration, triggers: &[Trigger], links: &mut Links<'_>) -> Result<(), CraneError> {
        let was_dead = self.dead;
        self.check_death(now, links);

        for trigger in triggers {
            match trigger {
                Trigger::Drop => self.drop_block(now, links),
                Trigger::Restart if !was_dead => {
                    log::debug!("restart ignored: run was still going at the start of the tick");
                }
                Trigger::Restart => self.restart(now, links),
            }
        }

        while let Some(action) = self.timers.pop_due(now) {
            match action {
                CraneAction::SpawnBlock => self.spawn_held(now, links),
                CraneAction::MoveNextBlock => self.move_next_block(now, links)?,
            }
        }

        if let Some(lift) = self.lift {
            self.position.y = lift.sample(now);
            if lift.is_finished(now) {
                self.lift = None;
            }
        }
        links.physics.set_anchor(self.anchor());
        links.score.set_height(self.height(), links.fx);
        Ok(())
    }

    fn check_death(&mut self, now: Duration, links: &mut Links<'_>) {
        if self.dead {
            return;
        }
        let Some(id) = self.last_dropped else {
            return;
        };
        let Some(t) = links.physics.transform(id) else {
            return;
        };
        if t.position.y < self.death_threshold {
            self.game_over(now, links);
        }
    }

    fn spawn_held(&mut self, now: Duration, links: &mut Links<'_>) {
        if self.holding.is_some() {
            log::warn!("spawn fired while already holding a block");
            return;
        }
        let yaw = self.rng.gen_range(0.0..TAU);
        let s = self.config.swing_strength.abs();
        let push = self.rng.gen_range(-s..=s) * SWING_IMPULSE_SCALE;
        let id = links
            .physics
            .spawn_held(self.anchor(), yaw, Vec3::new(-push, 0.0, 0.0));
        self.holding = Some(Block {
            id,
            status: PlacementStatus::Held,
            model_scale: Tween::new(0.0, 1.0, now, POP_IN_TIME, Interpolation::BounceOut),
        });
        let pitch = self.random_pitch();
        links.fx.notify(Feedback::BlockSpawned { pitch });
        log::info!("spawned {id:?} (push {push:.2})");
    }

    fn drop_block(&mut self, now: Duration, links: &mut Links<'_>) {
        if self.dead {
            log::debug!("drop ignored: run is over");
            return;
        }
        let Some(mut block) = self.holding.take() else {
            log::debug!("drop ignored: nothing held");
            return;
        };
        links.physics.release(block.id);

        if let Some(prev) = self.last_dropped {
            match links.physics.transform(prev) {
                Some(t) => self.death_threshold = t.position.y + DEATH_MARGIN,
                None => log::warn!("previous block {prev:?} vanished; keeping threshold"),
            }
            self.last_placed = Some(prev);
        }

        block.status = PlacementStatus::Dropped;
        self.last_dropped = Some(block.id);
        log::info!("dropped {:?}, death line at {:.2}", block.id, self.death_threshold);
        self.tower.push(block);
        self.timers.schedule(CraneAction::MoveNextBlock, now, SETTLE_DELAY);

        let pitch = self.random_pitch();
        links.fx.notify(Feedback::BlockReleased { pitch });
    }

    fn move_next_block(&mut self, now: Duration, links: &mut Links<'_>) -> Result<(), CraneError> {
        let Some(dropped) = self.last_dropped else {
            log::error!("move-next fired with no dropped block");
            return Err(CraneError::NothingDropped);
        };
        let accuracy = self.score_block(dropped, &*links.physics)?;

        self.lift = Some(Tween::new(
            self.position.y,
            self.position.y + self.config.move_per_block,
            now,
            LIFT_TIME,
            Interpolation::ExpoOut,
        ));
        links.score.report_accuracy(accuracy, now, links.fx);
        self.place_dropped(dropped, links);
        self.timers.schedule(CraneAction::SpawnBlock, now, RESPAWN_DELAY);
        Ok(())
    }

    fn score_block(&self, dropped: BlockId, physics: &dyn Physics) -> Result<f32, CraneError> {
        let bottom = physics
            .transform(dropped)
            .ok_or(CraneError::UnknownBlock(dropped))?
            .bottom();
        let placed_x = match self.last_placed {
            Some(id) => Some(
                physics
                    .transform(id)
                    .ok_or(CraneError::UnknownBlock(id))?
                    .position
                    .x,
            ),
            None => None,
        };
        Ok(placement_accuracy(bottom.x, placed_x))
    }

    /// The dropped block is taken to be at rest from here on.
    fn place_dropped(&mut self, dropped: BlockId, links: &mut Links<'_>) {
        if let Some(block) = self.tower.iter_mut().find(|b| b.id == dropped) {
            block.status = PlacementStatus::Placed;
        }
        if let Some(t) = links.physics.transform(dropped) {
            links.fx.notify(Feedback::BlockPlaced { bottom: t.bottom() });
        }
        if let Some(below) = self.last_placed {
            links.physics.set_kinematic(below, self.config.freeze_placed);
        }
    }

    fn game_over(&mut self, now: Duration, links: &mut Links<'_>) {
        self.timers.cancel_all();
        links.camera.begin_recap(now);
        links.score.finalize_run(links.fx);
        self.dead = true;
        log::info!("game over with {} blocks dropped", self.tower.len());
    }

    fn restart(&mut self, now: Duration, links: &mut Links<'_>) {
        if !self.dead {
            log::debug!("restart ignored: still alive");
            return;
        }
        for block in self.tower.drain(..) {
            links.physics.destroy(block.id);
        }
        self.last_dropped = None;
        self.last_placed = None;
        self.dead = false;
        self.death_threshold = 0.0;
        self.position = self.start;
        self.lift = None;

        links.camera.restart();
        links.fx.notify(Feedback::Restarted);
        links.score.reset(links.fx);

        // The tower can fail while a block is still on the chain; keep that one.
        if self.holding.is_none() {
            self.timers.schedule(CraneAction::SpawnBlock, now, SPAWN_DELAY);
        }
        log::info!("restarted");
    }

    fn random_pitch(&mut self) -> f32 {
        let v = self.config.pitch_variance.abs();
        1.0 + self.rng.gen_range(-v..=v)
    }
}
