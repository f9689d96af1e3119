//! Integer block positions and world-qualified coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer block position in world space.
///
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, y, then z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    /// Create a new block position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Position translated by the given offset.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Block containing the given continuous coordinates.
    pub fn containing(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: x.floor() as i32,
            y: y.floor() as i32,
            z: z.floor() as i32,
        }
    }

    /// Continuous coordinates of the block centre on the X/Z plane, resting on its floor.
    pub fn center(self) -> (f64, f64, f64) {
        (self.x as f64 + 0.5, self.y as f64, self.z as f64 + 0.5)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A block position qualified by the name of the world it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPoint {
    /// World identifier.
    pub world: String,
    /// Position inside that world.
    pub pos: BlockPos,
}

impl WorldPoint {
    /// Create a new world-qualified position.
    pub fn new(world: impl Into<String>, pos: BlockPos) -> Self {
        Self {
            world: world.into(),
            pos,
        }
    }

    /// Deduplication key for this exact coordinate.
    pub fn key(&self) -> CoordinateKey {
        CoordinateKey::new(&self.world, self.pos)
    }
}

impl fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.world, self.pos)
    }
}

/// World name plus integer coordinates, rendered as `world:x:y:z`.
///
/// Only used to detect overlapping registrations; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordinateKey {
    world: String,
    pos: BlockPos,
}

impl CoordinateKey {
    /// Build a key for `pos` in `world`.
    pub fn new(world: &str, pos: BlockPos) -> Self {
        Self {
            world: world.to_string(),
            pos,
        }
    }
}

impl fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.world, self.pos.x, self.pos.y, self.pos.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_floors_negative_coordinates() {
        assert_eq!(BlockPos::containing(-0.5, 64.9, 3.2), BlockPos::new(-1, 64, 3));
    }

    #[test]
    fn coordinate_key_formats_like_world_x_y_z() {
        let key = WorldPoint::new("W", BlockPos::new(10, 64, 10)).key();
        assert_eq!(key.to_string(), "W:10:64:10");
    }

    #[test]
    fn keys_differ_by_world() {
        let a = CoordinateKey::new("a", BlockPos::new(0, 0, 0));
        let b = CoordinateKey::new("b", BlockPos::new(0, 0, 0));
        assert_ne!(a, b);
    }
}
