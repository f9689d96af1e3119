//! Material catalog.
//!
//! Every block or item the simulation understands has a stable numeric
//! [`MaterialId`] (index into the catalog) and a [`RegistryKey`]. Chunks store
//! ids; configuration and the durable registry use keys. Unknown keys are the
//! caller's problem: lookups return `None` and callers skip the entry.

use skyfall_core::RegistryKey;
use std::collections::BTreeMap;

/// Index into the material catalog.
pub type MaterialId = u16;

/// Reserved ID for air.
pub const AIR: MaterialId = 0;

/// Broad category of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Empty space.
    Air,
    /// Placeable block that stops falling entities.
    Solid,
    /// Placeable block that falling entities pass through (water, fire).
    Passable,
    /// Inventory-only item.
    Item,
}

/// Catalog entry.
#[derive(Debug, Clone)]
pub struct MaterialInfo {
    pub key: RegistryKey,
    pub kind: MaterialKind,
    pub max_stack: u32,
}

/// Immutable id <-> key catalog shared by every world and the engine.
#[derive(Debug, Clone)]
pub struct Materials {
    infos: Vec<MaterialInfo>,
    by_key: BTreeMap<RegistryKey, MaterialId>,
}

const BUILTIN_BLOCKS: &[&str] = &[
    "stone",
    "dirt",
    "grass_block",
    "bedrock",
    "sand",
    "gravel",
    "cobblestone",
    "obsidian",
    "crying_obsidian",
    "magma_block",
    "netherrack",
    "blackstone",
    "basalt",
    "end_stone",
    "ancient_debris",
    "iron_ore",
    "gold_ore",
    "diamond_ore",
    "emerald_ore",
    "iron_block",
    "gold_block",
    "diamond_block",
    "emerald_block",
    "netherite_block",
    "raw_iron_block",
    "raw_gold_block",
    "coal_block",
    "amethyst_block",
    "glowstone",
    "shroomlight",
    "chest",
    "barrel",
];

const BUILTIN_PASSABLE: &[&str] = &["water", "lava", "fire", "soul_fire"];

/// (key, max stack size)
const BUILTIN_ITEMS: &[(&str, u32)] = &[
    ("diamond", 64),
    ("emerald", 64),
    ("iron_ingot", 64),
    ("gold_ingot", 64),
    ("netherite_ingot", 64),
    ("netherite_scrap", 64),
    ("coal", 64),
    ("blaze_rod", 64),
    ("arrow", 64),
    ("experience_bottle", 64),
    ("golden_apple", 64),
    ("enchanted_golden_apple", 64),
    ("ender_pearl", 16),
    ("nether_star", 64),
    ("diamond_sword", 1),
    ("diamond_pickaxe", 1),
    ("diamond_axe", 1),
    ("netherite_sword", 1),
    ("netherite_pickaxe", 1),
    ("iron_sword", 1),
    ("golden_sword", 1),
    ("bow", 1),
    ("crossbow", 1),
    ("trident", 1),
    ("shield", 1),
    ("elytra", 1),
    ("totem_of_undying", 1),
    ("leather_helmet", 1),
    ("leather_chestplate", 1),
    ("leather_leggings", 1),
    ("leather_boots", 1),
    ("iron_helmet", 1),
    ("iron_chestplate", 1),
    ("iron_leggings", 1),
    ("iron_boots", 1),
    ("diamond_helmet", 1),
    ("diamond_chestplate", 1),
    ("diamond_leggings", 1),
    ("diamond_boots", 1),
    ("netherite_helmet", 1),
    ("netherite_chestplate", 1),
    ("netherite_leggings", 1),
    ("netherite_boots", 1),
];

impl Materials {
    /// Catalog containing air plus the builtin blocks and items.
    pub fn builtin() -> Self {
        let mut catalog = Self {
            infos: Vec::new(),
            by_key: BTreeMap::new(),
        };
        catalog.push("air", MaterialKind::Air, 64);
        for name in BUILTIN_BLOCKS {
            catalog.push(name, MaterialKind::Solid, 64);
        }
        for name in BUILTIN_PASSABLE {
            catalog.push(name, MaterialKind::Passable, 64);
        }
        for (name, max_stack) in BUILTIN_ITEMS {
            catalog.push(name, MaterialKind::Item, *max_stack);
        }
        catalog
    }

    /// Catalog extended with additional solid blocks (e.g. from a content config).
    ///
    /// Keys that fail to parse or are already present are ignored.
    pub fn with_extra_blocks<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            if let Ok(key) = RegistryKey::parse(name) {
                if !self.by_key.contains_key(&key) {
                    self.insert(key, MaterialKind::Solid, 64);
                }
            }
        }
        self
    }

    fn push(&mut self, name: &str, kind: MaterialKind, max_stack: u32) {
        if let Ok(key) = RegistryKey::parse(name) {
            self.insert(key, kind, max_stack);
        }
    }

    fn insert(&mut self, key: RegistryKey, kind: MaterialKind, max_stack: u32) {
        let id = self.infos.len() as MaterialId;
        self.by_key.insert(key.clone(), id);
        self.infos.push(MaterialInfo {
            key,
            kind,
            max_stack,
        });
    }

    /// Resolve a key to its id.
    pub fn id(&self, key: &RegistryKey) -> Option<MaterialId> {
        self.by_key.get(key).copied()
    }

    /// Parse a (possibly legacy upper-case) name and resolve it.
    pub fn lookup(&self, name: &str) -> Option<MaterialId> {
        RegistryKey::parse(name).ok().and_then(|key| self.id(&key))
    }

    /// Resolve a name to an id only if it names a placeable block.
    pub fn lookup_block(&self, name: &str) -> Option<MaterialId> {
        self.lookup(name).filter(|&id| self.is_block(id))
    }

    /// Catalog entry for `id`.
    pub fn info(&self, id: MaterialId) -> Option<&MaterialInfo> {
        self.infos.get(id as usize)
    }

    /// Key for `id`.
    pub fn key(&self, id: MaterialId) -> Option<&RegistryKey> {
        self.info(id).map(|info| &info.key)
    }

    /// Whether `id` can be placed in the world (excludes air and items).
    pub fn is_block(&self, id: MaterialId) -> bool {
        matches!(
            self.info(id).map(|info| info.kind),
            Some(MaterialKind::Solid | MaterialKind::Passable)
        )
    }

    /// Whether `id` stops falling entities.
    pub fn is_solid(&self, id: MaterialId) -> bool {
        matches!(self.info(id).map(|info| info.kind), Some(MaterialKind::Solid))
    }

    /// Maximum stack size of the item with this key (1 for unknown keys).
    pub fn max_stack(&self, key: &RegistryKey) -> u32 {
        self.id(key)
            .and_then(|id| self.info(id))
            .map(|info| info.max_stack)
            .unwrap_or(1)
    }

    /// Number of catalog entries.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Whether the catalog is empty (never true for [`Materials::builtin`]).
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

impl Default for Materials {
    fn default() -> Self {
        Self::builtin()
    }
}
