#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod enchantment;
pub mod instance;
pub mod item;
pub mod position;
pub mod registry;
pub mod text;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use enchantment::{Enchantment, EnchantmentType};
pub use instance::{InstanceId, InstanceIdError};
pub use item::{ItemStack, Rarity, Rgb};
pub use position::{BlockPos, CoordinateKey, WorldPoint};
pub use registry::{RegistryKey, RegistryKeyError};

/// Simulation rate in ticks per second.
pub const TICKS_PER_SECOND: u64 = 20;

/// Wall-clock milliseconds covered by one tick (20 TPS => 50 ms per tick).
pub const MILLIS_PER_TICK: u64 = 1000 / TICKS_PER_SECOND;

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }

    /// Ticks elapsed since `earlier` (zero if `earlier` is in the future).
    pub fn since(self, earlier: SimTick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Convert whole seconds into ticks.
pub const fn seconds_to_ticks(seconds: u64) -> u64 {
    seconds * TICKS_PER_SECOND
}

/// Convert a millisecond duration into ticks, rounding down.
pub const fn millis_to_ticks(millis: u64) -> u64 {
    millis / MILLIS_PER_TICK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_conversions_use_fifty_millis() {
        assert_eq!(MILLIS_PER_TICK, 50);
        assert_eq!(seconds_to_ticks(60), 1200);
        assert_eq!(millis_to_ticks(300_000), 6000);
        assert_eq!(millis_to_ticks(49), 0);
    }

    #[test]
    fn since_saturates() {
        assert_eq!(SimTick(10).since(SimTick(4)), 6);
        assert_eq!(SimTick(4).since(SimTick(10)), 0);
    }
}
