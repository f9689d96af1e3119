//! Terrain restoration.
//!
//! Two paths exist. The exact path clears every position recorded for an
//! instance while it was live. The fallback path, used after a restart when
//! no positions survive, sweeps a cube around the impact and clears only
//! whitelisted materials. Running either path twice changes nothing.

use std::collections::{BTreeMap, BTreeSet};

use skyfall_core::{BlockPos, InstanceId, RegistryKey};
use skyfall_world::{MaterialId, World, AIR};
use tracing::warn;

/// Exact block positions produced by each live instance.
#[derive(Debug, Default)]
pub struct InstanceBlocks {
    sets: BTreeMap<InstanceId, BTreeSet<BlockPos>>,
}

impl InstanceBlocks {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an instance.
    pub fn track(&mut self, instance: InstanceId) {
        self.sets.entry(instance).or_default();
    }

    /// Record a position for a tracked instance. Returns false if the instance is unknown.
    pub fn record(&mut self, instance: InstanceId, pos: BlockPos) -> bool {
        match self.sets.get_mut(&instance) {
            Some(set) => {
                set.insert(pos);
                true
            }
            None => false,
        }
    }

    /// Whether the instance has any recorded positions.
    pub fn is_tracked(&self, instance: InstanceId) -> bool {
        self.sets.contains_key(&instance)
    }

    /// Recorded positions for an instance.
    pub fn positions(&self, instance: InstanceId) -> Option<&BTreeSet<BlockPos>> {
        self.sets.get(&instance)
    }

    /// Stop tracking and hand back the recorded positions.
    pub fn take(&mut self, instance: InstanceId) -> Option<BTreeSet<BlockPos>> {
        self.sets.remove(&instance)
    }

    /// Number of tracked instances.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// True when no instance is tracked.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Drop every tracked set.
    pub fn clear(&mut self) {
        self.sets.clear();
    }
}

/// Set every recorded position to air. Returns how many blocks changed.
pub fn clear_exact(world: &mut World, positions: &BTreeSet<BlockPos>) -> usize {
    let mut cleared = 0;
    for &pos in positions {
        if world.block(pos) == AIR {
            continue;
        }
        if world.set_block(pos, AIR).is_some() {
            cleared += 1;
        }
    }
    cleared
}

/// Clear whitelisted materials inside the cube `[-radius, radius]³` around `center`.
pub fn sweep_whitelist(
    world: &mut World,
    center: BlockPos,
    radius: i32,
    whitelist: &BTreeSet<RegistryKey>,
) -> usize {
    let ids: BTreeSet<MaterialId> = whitelist
        .iter()
        .filter_map(|key| world.materials().id(key))
        .filter(|&id| id != AIR)
        .collect();
    if ids.is_empty() {
        warn!(pos = %center, "Cleanup whitelist is empty, nothing to sweep");
        return 0;
    }
    let r = radius.max(0);
    let mut cleared = 0;
    for dx in -r..=r {
        for dy in -r..=r {
            for dz in -r..=r {
                let pos = center.offset(dx, dy, dz);
                if !ids.contains(&world.block(pos)) {
                    continue;
                }
                if world.set_block(pos, AIR).is_some() {
                    cleared += 1;
                }
            }
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfall_world::Materials;
    use std::sync::Arc;

    fn world() -> World {
        World::flat("W", Arc::new(Materials::builtin()))
    }

    fn key(name: &str) -> RegistryKey {
        RegistryKey::parse(name).unwrap()
    }

    #[test]
    fn records_only_tracked_instances() {
        let mut blocks = InstanceBlocks::new();
        let tracked = InstanceId::from_u128(1);
        blocks.track(tracked);
        assert!(blocks.record(tracked, BlockPos::new(0, 64, 0)));
        assert!(!blocks.record(InstanceId::from_u128(2), BlockPos::new(0, 64, 0)));
        assert_eq!(blocks.take(tracked).map(|s| s.len()), Some(1));
        assert!(blocks.is_empty());
    }

    #[test]
    fn exact_path_skips_air_and_repeats_cleanly() {
        let mut world = world();
        let obsidian = world.materials().lookup_block("obsidian").unwrap();
        let placed = BlockPos::new(1, 64, 1);
        world.set_block(placed, obsidian);
        let positions: BTreeSet<BlockPos> = [placed, BlockPos::new(1, 65, 1)].into_iter().collect();

        assert_eq!(clear_exact(&mut world, &positions), 1);
        assert_eq!(world.block(placed), AIR);
        assert_eq!(clear_exact(&mut world, &positions), 0);
    }

    #[test]
    fn sweep_leaves_terrain_alone() {
        let mut world = world();
        let obsidian = world.materials().lookup_block("obsidian").unwrap();
        let center = BlockPos::new(0, 64, 0);
        for dx in -2..=2 {
            world.set_block(center.offset(dx, 0, 0), obsidian);
        }
        let whitelist: BTreeSet<RegistryKey> = [key("obsidian")].into_iter().collect();

        assert_eq!(sweep_whitelist(&mut world, center, 2, &whitelist), 5);
        assert_eq!(world.count_in_cube(center, 3, obsidian), 0);
        let grass = world.materials().lookup_block("grass_block").unwrap();
        assert_eq!(world.block(BlockPos::new(0, 63, 0)), grass);
        assert_eq!(sweep_whitelist(&mut world, center, 2, &whitelist), 0);
    }

    #[test]
    fn empty_whitelist_sweeps_nothing() {
        let mut world = world();
        assert_eq!(sweep_whitelist(&mut world, BlockPos::new(0, 63, 0), 4, &BTreeSet::new()), 0);
        let unknown: BTreeSet<RegistryKey> = [key("unobtainium")].into_iter().collect();
        assert_eq!(sweep_whitelist(&mut world, BlockPos::new(0, 63, 0), 4, &unknown), 0);
    }
}
