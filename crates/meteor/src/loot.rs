//! Treasure loot tables.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use skyfall_core::text::colorize;
use skyfall_core::{Enchantment, EnchantmentType, ItemStack, Rarity, RegistryKey};
use skyfall_world::{ContainerState, Materials};
use tracing::warn;

/// Stack size as configured: a number or a `"min-max"` range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LootAmount {
    /// Exact count.
    Fixed(i64),
    /// Count or `min-max` range as text.
    Text(String),
}

impl Default for LootAmount {
    fn default() -> Self {
        LootAmount::Fixed(1)
    }
}

impl LootAmount {
    /// Draw a count. Malformed text yields 1. Not yet clamped to the stack size.
    pub fn roll(&self, rng: &mut impl Rng) -> i64 {
        match self {
            LootAmount::Fixed(n) => *n,
            LootAmount::Text(text) => match parse_amount(text) {
                Some((min, max)) if min < max => rng.gen_range(min..=max),
                Some((min, _)) => min,
                None => {
                    warn!("Malformed loot amount '{text}', using 1");
                    1
                }
            },
        }
    }
}

fn parse_amount(text: &str) -> Option<(i64, i64)> {
    let text = text.trim();
    match text.split_once('-') {
        Some((min, max)) if !min.trim().is_empty() => {
            Some((min.trim().parse().ok()?, max.trim().parse().ok()?))
        }
        _ => {
            let n = text.parse().ok()?;
            Some((n, n))
        }
    }
}

/// One configurable treasure item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootEntry {
    /// Item name.
    pub item: String,
    /// Stack size.
    pub amount: LootAmount,
    /// Custom name; supports `&` color codes.
    pub display_name: Option<String>,
    /// Lore lines.
    pub lore: Vec<String>,
    /// Whether the item never breaks.
    pub unbreakable: bool,
    /// Enchantment levels by name.
    pub enchants: BTreeMap<String, i32>,
    /// Rarity label appended to the lore.
    pub rarity: String,
    /// Percent chance (0..=100) that the entry is included in a fill.
    pub chance: f64,
    /// Disabled entries are never rolled.
    pub enabled: bool,
}

impl Default for LootEntry {
    fn default() -> Self {
        Self {
            item: "diamond".to_string(),
            amount: LootAmount::default(),
            display_name: None,
            lore: Vec::new(),
            unbreakable: false,
            enchants: BTreeMap::new(),
            rarity: "common".to_string(),
            chance: 100.0,
            enabled: true,
        }
    }
}

impl LootEntry {
    /// Build the decorated stack for this entry. Unknown items yield `None`.
    pub fn build(&self, materials: &Materials, rng: &mut impl Rng) -> Option<ItemStack> {
        let key = match RegistryKey::parse(&self.item) {
            Ok(key) if materials.id(&key).is_some() => key,
            _ => {
                warn!("Unknown loot item '{}', skipping", self.item);
                return None;
            }
        };
        let max_stack = i64::from(materials.max_stack(&key).max(1));
        let count = self.amount.roll(rng).clamp(1, max_stack) as u32;
        let rarity = Rarity::parse_lenient(&self.rarity);

        let mut stack = ItemStack::new(key, count);
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            stack.display_name = Some(colorize(name));
        }
        stack.lore = self.lore.iter().map(|line| colorize(line)).collect();
        stack.lore.push(String::new());
        stack.lore.push(rarity.tag());

        if self.unbreakable {
            stack.unbreakable = true;
            stack.hide_unbreakable = true;
        }

        for (name, &level) in &self.enchants {
            let Some(enchantment_type) = EnchantmentType::parse(name) else {
                warn!("Unknown enchantment '{name}' on loot item '{}'", self.item);
                continue;
            };
            if level <= 0 {
                continue;
            }
            let level = level.min(i32::from(u16::MAX)) as u16;
            stack
                .enchantments
                .push(Enchantment::new(enchantment_type, level));
        }

        if stack.is_leather() {
            stack.dye = rarity.dye();
        }
        Some(stack)
    }
}

/// Roll every enabled entry against its chance and return the winners, shuffled.
///
/// An entry is included iff a uniform roll in `[0, 100)` is below its chance.
pub fn roll_loot(entries: &[LootEntry], materials: &Materials, rng: &mut impl Rng) -> Vec<ItemStack> {
    let mut items = Vec::new();
    for entry in entries.iter().filter(|entry| entry.enabled) {
        let roll = rng.gen::<f64>() * 100.0;
        if roll >= entry.chance {
            continue;
        }
        if let Some(stack) = entry.build(materials, rng) {
            items.push(stack);
        }
    }
    items.shuffle(rng);
    items
}

/// Insert rolled loot into a container. Returns the number of stacks that fit.
pub fn fill_container(
    container: &mut ContainerState,
    materials: &Materials,
    items: Vec<ItemStack>,
) -> usize {
    let mut inserted = 0;
    for stack in items {
        match container.add_item(materials, stack) {
            None => inserted += 1,
            Some(rest) => warn!(item = %rest.item, count = rest.count, "Treasure container full, dropping loot"),
        }
    }
    inserted
}
