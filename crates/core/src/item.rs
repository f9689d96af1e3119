//! Item stacks as placed into loot containers and guardian equipment.

use crate::enchantment::Enchantment;
use crate::registry::RegistryKey;
use crate::text::SECTION_SIGN;
use serde::{Deserialize, Serialize};

/// Plain RGB colour used for dyeable items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Build a colour from its components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Loot rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Default tier
    #[default]
    Common,
    /// Blue tier
    Rare,
    /// Purple tier
    Epic,
    /// Gold tier
    Legendary,
}

impl Rarity {
    /// Parse a rarity tag; unknown tags fall back to [`Rarity::Common`].
    pub fn parse_lenient(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "rare" => Rarity::Rare,
            "epic" => Rarity::Epic,
            "legendary" => Rarity::Legendary,
            _ => Rarity::Common,
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
        }
    }

    /// Chat colour code for the tag line.
    pub const fn color_code(self) -> char {
        match self {
            Rarity::Common => '7',
            Rarity::Rare => '9',
            Rarity::Epic => '5',
            Rarity::Legendary => '6',
        }
    }

    /// Coloured lore line, e.g. `§9Rare`.
    pub fn tag(self) -> String {
        format!("{}{}{}", SECTION_SIGN, self.color_code(), self.label())
    }

    /// Dye applied to leather items of this rarity (common items keep their default colour).
    pub const fn dye(self) -> Option<Rgb> {
        match self {
            Rarity::Common => None,
            Rarity::Rare => Some(Rgb::new(64, 64, 255)),
            Rarity::Epic => Some(Rgb::new(160, 32, 255)),
            Rarity::Legendary => Some(Rgb::new(255, 128, 0)),
        }
    }
}

/// A stack of items with optional decoration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Material key of the item
    pub item: RegistryKey,
    /// Quantity in stack
    pub count: u32,
    /// Custom display name (already colourised)
    pub display_name: Option<String>,
    /// Lore lines (already colourised)
    pub lore: Vec<String>,
    /// Whether the item never loses durability
    pub unbreakable: bool,
    /// Whether the unbreakable flag is hidden from the tooltip
    pub hide_unbreakable: bool,
    /// Enchantments applied to this item
    pub enchantments: Vec<Enchantment>,
    /// Dye colour for leather items
    pub dye: Option<Rgb>,
}

impl ItemStack {
    /// Create a new undecorated item stack
    pub fn new(item: RegistryKey, count: u32) -> Self {
        Self {
            item,
            count,
            display_name: None,
            lore: Vec::new(),
            unbreakable: false,
            hide_unbreakable: false,
            enchantments: Vec::new(),
            dye: None,
        }
    }

    /// Whether two stacks carry identical decoration and may merge.
    pub fn is_similar(&self, other: &ItemStack) -> bool {
        self.item == other.item
            && self.display_name == other.display_name
            && self.lore == other.lore
            && self.unbreakable == other.unbreakable
            && self.enchantments == other.enchantments
            && self.dye == other.dye
    }

    /// Whether the item is a dyeable leather armour piece.
    pub fn is_leather(&self) -> bool {
        self.item.path().starts_with("leather_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rarity_parse_is_lenient() {
        assert_eq!(Rarity::parse_lenient("EPIC"), Rarity::Epic);
        assert_eq!(Rarity::parse_lenient("mythic"), Rarity::Common);
    }

    #[test]
    fn rarity_tag_is_coloured() {
        assert_eq!(Rarity::Legendary.tag(), "\u{a7}6Legendary");
        assert_eq!(Rarity::Common.dye(), None);
        assert_eq!(Rarity::Rare.dye(), Some(Rgb::new(64, 64, 255)));
    }

    #[test]
    fn similar_stacks_ignore_count() {
        let key = RegistryKey::parse("diamond").unwrap();
        let a = ItemStack::new(key.clone(), 3);
        let mut b = ItemStack::new(key, 10);
        assert!(a.is_similar(&b));
        b.unbreakable = true;
        assert!(!a.is_similar(&b));
    }

    #[test]
    fn leather_detection_uses_path() {
        let helmet = ItemStack::new(RegistryKey::parse("leather_helmet").unwrap(), 1);
        let sword = ItemStack::new(RegistryKey::parse("diamond_sword").unwrap(), 1);
        assert!(helmet.is_leather());
        assert!(!sword.is_leather());
    }
}
