//! Layered structure generation.
//!
//! A structure is a rough sphere around an impact point split into three
//! shells by Euclidean distance. Shell thresholds sit half a block inside
//! each radius so lattice points on a boundary are never counted twice.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use skyfall_core::{BlockPos, RegistryKey};
use skyfall_world::{MaterialId, Materials};
use tracing::warn;

use crate::settings::MeteoriteDefinition;

/// Radius of the core shell.
pub const CORE_RADIUS: i32 = 1;

/// Material used when a layer has no usable entries.
pub const FALLBACK_MATERIAL: &str = "stone";

/// Structure layer, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    /// Single block at the impact point.
    Core,
    /// Shell inside the inner radius.
    Inner,
    /// Shell inside the outer radius.
    Outer,
}

impl Layer {
    /// All layers in placement order.
    pub const ALL: [Layer; 3] = [Layer::Core, Layer::Inner, Layer::Outer];

    /// Configuration name of the layer.
    pub const fn as_str(self) -> &'static str {
        match self {
            Layer::Core => "core",
            Layer::Inner => "inner",
            Layer::Outer => "outer",
        }
    }
}

/// Shell containing the offset `(dx, dy, dz)`, if any.
pub fn classify(dx: i32, dy: i32, dz: i32, inner_radius: i32, outer_radius: i32) -> Option<Layer> {
    let dist = f64::from(dx * dx + dy * dy + dz * dz).sqrt();
    if dist <= f64::from(CORE_RADIUS) - 0.5 {
        Some(Layer::Core)
    } else if dist <= f64::from(inner_radius) - 0.5 {
        Some(Layer::Inner)
    } else if dist <= f64::from(outer_radius) - 0.5 {
        Some(Layer::Outer)
    } else {
        None
    }
}

/// Discrete weighted choice over block materials.
///
/// Equivalent to repeating each material `max(1, weight)` times and drawing uniformly.
#[derive(Debug, Clone)]
pub struct WeightedPool {
    cumulative: Vec<(u64, MaterialId)>,
    total: u64,
    fallback: Option<MaterialId>,
}

impl WeightedPool {
    /// Build a pool from a material table. Unknown or non-block names are skipped.
    pub fn from_table(table: &BTreeMap<String, i32>, materials: &Materials, label: &str) -> Self {
        let mut cumulative = Vec::with_capacity(table.len());
        let mut total = 0u64;
        for (name, &weight) in table {
            let Some(id) = materials.lookup_block(name) else {
                warn!("Unknown block '{name}' in {label} table, skipping");
                continue;
            };
            total += u64::from(weight.max(1).unsigned_abs());
            cumulative.push((total, id));
        }
        Self {
            cumulative,
            total,
            fallback: materials.lookup_block(FALLBACK_MATERIAL),
        }
    }

    /// True when no entry resolved to a block.
    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Configured materials that resolved to a block. Never includes the fallback.
    pub fn materials(&self) -> impl Iterator<Item = MaterialId> + '_ {
        self.cumulative.iter().map(|&(_, id)| id)
    }

    /// Draw one material; `None` only if the pool is empty and no fallback exists.
    pub fn draw(&self, rng: &mut impl Rng) -> Option<MaterialId> {
        if self.total == 0 {
            return self.fallback;
        }
        let ticket = rng.gen_range(0..self.total);
        let index = self.cumulative.partition_point(|&(upper, _)| upper <= ticket);
        self.cumulative.get(index).map(|&(_, id)| id)
    }
}

/// One block of a generated structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerBlock {
    /// World position.
    pub pos: BlockPos,
    /// Layer the block belongs to.
    pub layer: Layer,
    /// Material to place.
    pub material: MaterialId,
}

/// Generated structure around an impact point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureLayout {
    /// Impact point.
    pub center: BlockPos,
    /// Outer radius the layout was generated for.
    pub outer_radius: i32,
    /// Blocks in placement order.
    pub blocks: Vec<LayerBlock>,
    /// Configured materials the instance may leave behind (cleanup whitelist).
    pub materials: BTreeSet<RegistryKey>,
}

impl StructureLayout {
    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True when the layout has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of blocks in `layer`.
    pub fn count(&self, layer: Layer) -> usize {
        self.blocks.iter().filter(|b| b.layer == layer).count()
    }

    /// Positions of the blocks in `layer`.
    pub fn positions(&self, layer: Layer) -> impl Iterator<Item = BlockPos> + '_ {
        self.blocks
            .iter()
            .filter(move |b| b.layer == layer)
            .map(|b| b.pos)
    }

    /// Highest y of any block.
    pub fn top(&self) -> Option<i32> {
        self.blocks.iter().map(|b| b.pos.y).max()
    }
}

/// Vertical bounds; positions with `y <= min_y` or `y >= max_y` are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerticalBounds {
    /// Exclusive lower bound.
    pub min_y: i32,
    /// Exclusive upper bound.
    pub max_y: i32,
}

impl VerticalBounds {
    /// Whether `y` lies strictly inside the bounds.
    pub fn contains(self, y: i32) -> bool {
        y > self.min_y && y < self.max_y
    }
}

/// Generate the layered layout for `definition` centred on `center`.
pub fn generate(
    center: BlockPos,
    definition: &MeteoriteDefinition,
    materials: &Materials,
    bounds: VerticalBounds,
    rng: &mut impl Rng,
) -> StructureLayout {
    let outer = definition.outer_radius.max(0);
    let inner = definition.effective_inner_radius();
    let pools = [
        (Layer::Core, WeightedPool::from_table(&definition.core_blocks, materials, "core")),
        (Layer::Inner, WeightedPool::from_table(&definition.inner_blocks, materials, "inner")),
        (Layer::Outer, WeightedPool::from_table(&definition.outer_blocks, materials, "outer")),
    ];

    let mut blocks = Vec::new();
    for dx in -outer..=outer {
        for dy in -outer..=outer {
            for dz in -outer..=outer {
                let Some(layer) = classify(dx, dy, dz, inner, outer) else {
                    continue;
                };
                let pos = center.offset(dx, dy, dz);
                if !bounds.contains(pos.y) {
                    continue;
                }
                let pool = &pools[layer as usize].1;
                let Some(material) = pool.draw(rng) else {
                    continue;
                };
                blocks.push(LayerBlock { pos, layer, material });
            }
        }
    }

    // Configured keys only; the fallback is never whitelisted.
    let keys = pools
        .iter()
        .flat_map(|(_, pool)| pool.materials())
        .filter_map(|id| materials.key(id).cloned())
        .collect();

    StructureLayout {
        center,
        outer_radius: outer,
        blocks,
        materials: keys,
    }
}
