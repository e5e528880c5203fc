//! Physics collaborator: the crane asks it to create, release and freeze
//! blocks and reads back where they ended up. `SimplePhysics` is a small
//! kinematic stand-in, not a rigid-body solver.

use glam::{Quat, Vec3};
use std::collections::HashMap;

/// Blocks are 2×2 units; centre to bottom face is one unit.
pub const BLOCK_HALF_HEIGHT: f32 = 1.0;
pub const BLOCK_HALF_WIDTH: f32 = 1.0;

/// Opaque block handle. Never reused, so a handle kept past `destroy`
/// simply resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Centre of the block's bottom face.
    pub fn bottom(&self) -> Vec3 {
        self.position - self.up() * BLOCK_HALF_HEIGHT
    }
}

pub trait Physics {
    /// Create a block hanging from the chain anchor, turned by `yaw` radians
    /// around the vertical axis and pushed sideways by `impulse`.
    fn spawn_held(&mut self, anchor: Vec3, yaw: f32, impulse: Vec3) -> BlockId;
    /// Where the last chain link is this tick.
    fn set_anchor(&mut self, anchor: Vec3);
    /// Detach a held block from the chain.
    fn release(&mut self, id: BlockId);
    fn transform(&self, id: BlockId) -> Option<Transform>;
    fn set_kinematic(&mut self, id: BlockId, kinematic: bool);
    fn is_kinematic(&self, id: BlockId) -> bool;
    fn destroy(&mut self, id: BlockId);
    fn step(&mut self, dt: f32);
}

const GRAVITY: f32 = 20.0;
/// Block centre hangs this far below the anchor.
const CHAIN_LENGTH: f32 = 2.0;
const SWING_DAMPING: f32 = 0.15;
/// Top face of the pedestal the tower is built on.
const PEDESTAL_TOP: f32 = 0.0;
pub const PEDESTAL_HALF_WIDTH: f32 = 3.0;
/// Bodies below this stop being simulated.
const FLOOR_Y: f32 = -60.0;
const TIP_KICK: f32 = 3.0;
const TIP_SPIN: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    /// Pendulum angle from straight down and its angular velocity.
    Hanging { angle: f32, spin: f32 },
    Falling,
    Resting,
    Lost,
}

#[derive(Debug, Clone)]
struct Body {
    position: Vec3,
    velocity: Vec3,
    yaw: f32,
    roll: f32,
    roll_speed: f32,
    motion: Motion,
    kinematic: bool,
}

impl Body {
    fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: Quat::from_rotation_z(self.roll) * Quat::from_rotation_y(self.yaw),
        }
    }
}

/// Side-view stand-in physics: pendulum swing on the chain, ballistic fall,
/// landing on whatever rests below, tipping off when overhanging.
#[derive(Debug, Clone)]
pub struct SimplePhysics {
    bodies: HashMap<BlockId, Body>,
    anchor: Vec3,
    next_id: u64,
}

impl SimplePhysics {
    pub fn new(anchor: Vec3) -> Self {
        Self {
            bodies: HashMap::new(),
            anchor,
            next_id: 0,
        }
    }

    fn hanging_position(anchor: Vec3, angle: f32) -> Vec3 {
        anchor + Vec3::new(CHAIN_LENGTH * angle.sin(), -CHAIN_LENGTH * angle.cos(), 0.0)
    }

    /// Highest support top under `x` whose top lies in `[new_bottom, old_bottom]`,
    /// with the horizontal offset from that support's centre.
    fn support_between(&self, skip: BlockId, x: f32, old_bottom: f32, new_bottom: f32) -> Option<(f32, f32)> {
        let mut best: Option<(f32, f32)> = None;
        let mut consider = |top: f32, dx: f32| {
            if top <= old_bottom && top >= new_bottom && best.is_none_or(|(t, _)| top > t) {
                best = Some((top, dx));
            }
        };
        if x.abs() < PEDESTAL_HALF_WIDTH + BLOCK_HALF_WIDTH {
            // Centre off the slab counts as overhanging, same as on a block.
            let past_edge = x.abs() - PEDESTAL_HALF_WIDTH;
            let dx = if past_edge > 0.0 {
                x.signum() * (BLOCK_HALF_WIDTH + past_edge)
            } else {
                0.0
            };
            consider(PEDESTAL_TOP, dx);
        }
        for (id, body) in &self.bodies {
            if *id == skip || body.motion != Motion::Resting {
                continue;
            }
            let dx = x - body.position.x;
            if dx.abs() < 2.0 * BLOCK_HALF_WIDTH {
                consider(body.position.y + BLOCK_HALF_HEIGHT, dx);
            }
        }
        best
    }

    fn step_body(&mut self, id: BlockId, dt: f32) {
        let anchor = self.anchor;
        let Some(body) = self.bodies.get(&id).cloned() else {
            return;
        };
        let mut body = body;
        match body.motion {
            Motion::Hanging { angle, spin } => {
                let accel = -(GRAVITY / CHAIN_LENGTH) * angle.sin() - SWING_DAMPING * spin;
                let spin = spin + accel * dt;
                let angle = angle + spin * dt;
                let next = Self::hanging_position(anchor, angle);
                body.velocity = (next - body.position) / dt.max(f32::EPSILON);
                body.position = next;
                body.motion = Motion::Hanging { angle, spin };
            }
            Motion::Falling => {
                body.velocity.y -= GRAVITY * dt;
                let old_bottom = body.position.y - BLOCK_HALF_HEIGHT;
                let next = body.position + body.velocity * dt;
                let new_bottom = next.y - BLOCK_HALF_HEIGHT;
                body.roll += body.roll_speed * dt;
                match self.support_between(id, next.x, old_bottom, new_bottom) {
                    Some((_, dx)) if dx.abs() > BLOCK_HALF_WIDTH => {
                        // Centre is past the support's edge: slide off and keep falling.
                        body.position = next;
                        body.velocity.x = dx.signum() * TIP_KICK;
                        body.roll_speed = -dx.signum() * TIP_SPIN;
                    }
                    Some((top, _)) => {
                        body.position = Vec3::new(next.x, top + BLOCK_HALF_HEIGHT, next.z);
                        body.velocity = Vec3::ZERO;
                        body.roll = 0.0;
                        body.roll_speed = 0.0;
                        body.motion = Motion::Resting;
                    }
                    None => body.position = next,
                }
                if body.position.y < FLOOR_Y {
                    body.motion = Motion::Lost;
                    body.velocity = Vec3::ZERO;
                }
            }
            Motion::Resting | Motion::Lost => {}
        }
        self.bodies.insert(id, body);
    }
}

impl Physics for SimplePhysics {
    fn spawn_held(&mut self, anchor: Vec3, yaw: f32, impulse: Vec3) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        self.anchor = anchor;
        let body = Body {
            position: Self::hanging_position(anchor, 0.0),
            velocity: Vec3::ZERO,
            yaw,
            roll: 0.0,
            roll_speed: 0.0,
            motion: Motion::Hanging {
                angle: 0.0,
                spin: impulse.x / CHAIN_LENGTH,
            },
            kinematic: false,
        };
        self.bodies.insert(id, body);
        id
    }

    fn set_anchor(&mut self, anchor: Vec3) {
        self.anchor = anchor;
    }

    fn release(&mut self, id: BlockId) {
        if let Some(body) = self.bodies.get_mut(&id) {
            if matches!(body.motion, Motion::Hanging { .. }) {
                body.motion = Motion::Falling;
            }
        }
    }

    fn transform(&self, id: BlockId) -> Option<Transform> {
        self.bodies.get(&id).map(Body::transform)
    }

    fn set_kinematic(&mut self, id: BlockId, kinematic: bool) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.kinematic = kinematic;
        }
    }

    fn is_kinematic(&self, id: BlockId) -> bool {
        self.bodies.get(&id).is_some_and(|b| b.kinematic)
    }

    fn destroy(&mut self, id: BlockId) {
        self.bodies.remove(&id);
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let mut ids: Vec<BlockId> = self.bodies.keys().copied().collect();
        // Lower bodies first so anything landing this step sees settled supports.
        ids.sort_by(|a, b| {
            let ya = self.bodies[a].position.y;
            let yb = self.bodies[b].position.y;
            ya.total_cmp(&yb)
        });
        for id in ids {
            if self.bodies.get(&id).is_some_and(|b| b.kinematic) {
                continue;
            }
            self.step_body(id, dt);
        }
    }
}

/// Physics double for core tests: blocks sit exactly where the test puts them.
#[cfg(test)]
pub mod testing {
    use super::{BlockId, Physics, Transform, BLOCK_HALF_HEIGHT};
    use glam::{Quat, Vec3};
    use std::collections::{HashMap, HashSet};

    #[derive(Debug, Default)]
    pub struct ScriptedPhysics {
        positions: HashMap<BlockId, Vec3>,
        released: HashSet<BlockId>,
        kinematic: HashSet<BlockId>,
        next_id: u64,
    }

    impl ScriptedPhysics {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn place(&mut self, id: BlockId, position: Vec3) {
            self.positions.insert(id, position);
        }

        pub fn live_blocks(&self) -> usize {
            self.positions.len()
        }

        pub fn is_released(&self, id: BlockId) -> bool {
            self.released.contains(&id)
        }
    }

    impl Physics for ScriptedPhysics {
        fn spawn_held(&mut self, anchor: Vec3, _yaw: f32, _impulse: Vec3) -> BlockId {
            let id = BlockId(self.next_id);
            self.next_id += 1;
            self.positions.insert(id, anchor - Vec3::Y * 2.0 * BLOCK_HALF_HEIGHT);
            id
        }

        fn set_anchor(&mut self, anchor: Vec3) {
            for (id, pos) in &mut self.positions {
                if !self.released.contains(id) {
                    *pos = anchor - Vec3::Y * 2.0 * BLOCK_HALF_HEIGHT;
                }
            }
        }

        fn release(&mut self, id: BlockId) {
            self.released.insert(id);
        }

        fn transform(&self, id: BlockId) -> Option<Transform> {
            self.positions.get(&id).map(|p| Transform {
                position: *p,
                rotation: Quat::IDENTITY,
            })
        }

        fn set_kinematic(&mut self, id: BlockId, kinematic: bool) {
            if kinematic {
                self.kinematic.insert(id);
            } else {
                self.kinematic.remove(&id);
            }
        }

        fn is_kinematic(&self, id: BlockId) -> bool {
            self.kinematic.contains(&id)
        }

        fn destroy(&mut self, id: BlockId) {
            self.positions.remove(&id);
            self.released.remove(&id);
            self.kinematic.remove(&id);
        }

        fn step(&mut self, _dt: f32) {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn settle(p: &mut SimplePhysics, secs: f32) {
        let steps = (secs / DT) as usize;
        for _ in 0..steps {
            p.step(DT);
        }
    }

    #[test]
    fn test_held_block_hangs_below_anchor() {
        let anchor = Vec3::new(0.0, 8.0, 0.0);
        let mut p = SimplePhysics::new(anchor);
        let id = p.spawn_held(anchor, 0.3, Vec3::ZERO);
        settle(&mut p, 1.0);
        let t = p.transform(id).unwrap();
        assert!((t.position.y - (8.0 - CHAIN_LENGTH)).abs() < 1e-3);
        assert!(t.position.x.abs() < 1e-3);
    }

    #[test]
    fn test_released_block_lands_on_pedestal() {
        let anchor = Vec3::new(0.0, 8.0, 0.0);
        let mut p = SimplePhysics::new(anchor);
        let id = p.spawn_held(anchor, 0.0, Vec3::ZERO);
        p.release(id);
        settle(&mut p, 2.0);
        let t = p.transform(id).unwrap();
        assert!((t.position.y - (PEDESTAL_TOP + BLOCK_HALF_HEIGHT)).abs() < 1e-4);
    }

    #[test]
    fn test_second_block_stacks_on_first() {
        let anchor = Vec3::new(0.0, 8.0, 0.0);
        let mut p = SimplePhysics::new(anchor);
        let a = p.spawn_held(anchor, 0.0, Vec3::ZERO);
        p.release(a);
        settle(&mut p, 2.0);
        let anchor = Vec3::new(0.0, 10.0, 0.0);
        p.set_anchor(anchor);
        let b = p.spawn_held(anchor, 0.0, Vec3::ZERO);
        p.release(b);
        settle(&mut p, 2.0);
        let tb = p.transform(b).unwrap();
        assert!((tb.position.y - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_overhanging_block_tips_off_below_its_support() {
        let mut p = SimplePhysics::new(Vec3::new(0.0, 8.0, 0.0));
        let a = p.spawn_held(Vec3::new(0.0, 8.0, 0.0), 0.0, Vec3::ZERO);
        p.release(a);
        settle(&mut p, 2.0);
        // Hang the next one far enough right that its centre clears the top face.
        let anchor = Vec3::new(1.6, 10.0, 0.0);
        p.set_anchor(anchor);
        let b = p.spawn_held(anchor, 0.0, Vec3::ZERO);
        p.release(b);
        settle(&mut p, 3.0);
        let tb = p.transform(b).unwrap();
        let ta = p.transform(a).unwrap();
        assert!(tb.position.y < ta.position.y + 1.0, "expected block to fall, got {tb:?}");
    }

    #[test]
    fn test_block_missing_the_pedestal_is_lost() {
        let anchor = Vec3::new(6.0, 8.0, 0.0);
        let mut p = SimplePhysics::new(anchor);
        let id = p.spawn_held(anchor, 0.0, Vec3::ZERO);
        p.release(id);
        settle(&mut p, 5.0);
        assert!(p.transform(id).unwrap().position.y < FLOOR_Y);
    }

    #[test]
    fn test_destroyed_handle_resolves_to_nothing() {
        let mut p = SimplePhysics::new(Vec3::ZERO);
        let id = p.spawn_held(Vec3::ZERO, 0.0, Vec3::ZERO);
        p.set_kinematic(id, true);
        assert!(p.is_kinematic(id));
        p.destroy(id);
        assert_eq!(p.transform(id), None);
        assert!(!p.is_kinematic(id));
        let next = p.spawn_held(Vec3::ZERO, 0.0, Vec3::ZERO);
        assert_ne!(id, next);
    }
}
