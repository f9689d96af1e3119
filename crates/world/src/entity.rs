//! Non-block entities: falling blocks, players and the shared vector type.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use skyfall_core::{BlockPos, InstanceId};

use crate::materials::MaterialId;

/// World-unique entity handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Minimal 3D vector for entity positions and velocities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len <= f64::EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Centre of a block.
    pub fn from_block_center(pos: BlockPos) -> Self {
        let (x, y, z) = pos.center();
        Self::new(x, y, z)
    }

    pub fn block(self) -> BlockPos {
        BlockPos::containing(self.x, self.y, self.z)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Gravity applied to falling blocks each tick (blocks/tick²).
pub const FALLING_GRAVITY: f64 = 0.04;

/// Velocity retained per tick.
pub const FALLING_DRAG: f64 = 0.98;

/// A block in flight, tagged with the instance that spawned it.
#[derive(Debug, Clone, PartialEq)]
pub struct FallingBlock {
    pub id: EntityId,
    pub instance: InstanceId,
    pub material: MaterialId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub ticks_lived: u32,
}

/// Notification that a falling block came to rest and was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLanded {
    pub world: String,
    pub instance: InstanceId,
    pub entity: EntityId,
    pub pos: BlockPos,
    pub material: MaterialId,
}

/// Timed status effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusEffectKind {
    Slowness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusEffectKind,
    pub duration_ticks: u32,
    pub amplifier: u8,
}

/// A connected observer that receives messages and can be pushed around.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: EntityId,
    pub name: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub health: f32,
    pub effects: Vec<StatusEffect>,
}

impl Player {
    pub const MAX_HEALTH: f32 = 20.0;

    pub fn damage(&mut self, amount: f32) {
        self.health = (self.health - amount).max(0.0);
    }
}
