use serde::{Deserialize, Serialize};
use skyfall_core::ItemStack;

use crate::materials::Materials;

/// Number of slots in a single container inventory (3 rows × 9 columns).
pub const CONTAINER_SLOT_COUNT: usize = 27;

/// Block-backed storage containers that can hold treasure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    Chest,
    Barrel,
}

impl ContainerKind {
    /// Block material key for this container.
    pub const fn block_name(self) -> &'static str {
        match self {
            ContainerKind::Chest => "chest",
            ContainerKind::Barrel => "barrel",
        }
    }

    /// Parse a container kind by block name, case-insensitively.
    pub fn parse(input: &str) -> Option<Self> {
        let name = input.trim();
        let name = name.strip_prefix("minecraft:").unwrap_or(name);
        if name.eq_ignore_ascii_case("chest") {
            Some(ContainerKind::Chest)
        } else if name.eq_ignore_ascii_case("barrel") {
            Some(ContainerKind::Barrel)
        } else {
            None
        }
    }
}

/// Inventory state for a container block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerState {
    pub kind: ContainerKind,
    pub slots: [Option<ItemStack>; CONTAINER_SLOT_COUNT],
}

impl ContainerState {
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Add a stack, merging into similar stacks before using empty slots.
    ///
    /// Returns whatever did not fit.
    pub fn add_item(&mut self, materials: &Materials, mut stack: ItemStack) -> Option<ItemStack> {
        let max = materials.max_stack(&stack.item).max(1);
        for existing in self.slots.iter_mut().flatten() {
            if stack.count == 0 {
                break;
            }
            if existing.is_similar(&stack) && existing.count < max {
                let moved = (max - existing.count).min(stack.count);
                existing.count += moved;
                stack.count -= moved;
            }
        }
        while stack.count > 0 {
            let Some(slot) = self.slots.iter_mut().find(|slot| slot.is_none()) else {
                return Some(stack);
            };
            let mut placed = stack.clone();
            placed.count = stack.count.min(max);
            stack.count -= placed.count;
            *slot = Some(placed);
        }
        None
    }

    /// Iterate non-empty slots.
    pub fn items(&self) -> impl Iterator<Item = &ItemStack> {
        self.slots.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}
