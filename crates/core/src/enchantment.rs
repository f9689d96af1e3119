use serde::{Deserialize, Serialize};
use std::fmt;

/// Types of enchantments that loot items may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnchantmentType {
    // Tool enchantments
    /// Increases mining speed
    Efficiency,
    /// Allows silk touch harvesting of blocks
    SilkTouch,
    /// Increases block drop amounts
    Fortune,

    // Weapon enchantments
    /// Increases attack damage
    Sharpness,
    /// Extra damage against undead
    Smite,
    /// Increases knockback
    Knockback,
    /// Sets targets on fire
    FireAspect,
    /// Increases mob loot
    Looting,
    /// Increases bow/arrow damage
    Power,
    /// Increases bow/arrow knockback
    Punch,
    /// Bow/arrow sets targets on fire
    Flame,
    /// Allows firing without consuming arrows.
    Infinity,

    // Armor enchantments
    /// Reduces damage from all sources
    Protection,
    /// Reduces fire damage
    FireProtection,
    /// Reduces explosion damage
    BlastProtection,
    /// Reduces projectile damage
    ProjectileProtection,
    /// Reduces fall damage (boots)
    FeatherFalling,
    /// Damages attackers
    Thorns,

    // Universal enchantments
    /// Reduces durability loss
    Unbreaking,
    /// Repairs item using XP
    Mending,
}

impl EnchantmentType {
    /// Canonical lowercase key.
    pub const fn as_str(self) -> &'static str {
        match self {
            EnchantmentType::Efficiency => "efficiency",
            EnchantmentType::SilkTouch => "silk_touch",
            EnchantmentType::Fortune => "fortune",
            EnchantmentType::Sharpness => "sharpness",
            EnchantmentType::Smite => "smite",
            EnchantmentType::Knockback => "knockback",
            EnchantmentType::FireAspect => "fire_aspect",
            EnchantmentType::Looting => "looting",
            EnchantmentType::Power => "power",
            EnchantmentType::Punch => "punch",
            EnchantmentType::Flame => "flame",
            EnchantmentType::Infinity => "infinity",
            EnchantmentType::Protection => "protection",
            EnchantmentType::FireProtection => "fire_protection",
            EnchantmentType::BlastProtection => "blast_protection",
            EnchantmentType::ProjectileProtection => "projectile_protection",
            EnchantmentType::FeatherFalling => "feather_falling",
            EnchantmentType::Thorns => "thorns",
            EnchantmentType::Unbreaking => "unbreaking",
            EnchantmentType::Mending => "mending",
        }
    }

    /// Parse an enchantment name (case-insensitive).
    ///
    /// Accepts the modern keys (optionally `minecraft:`-prefixed) as well as the
    /// legacy upper-case aliases found in older loot configs (`DAMAGE_ALL`, `DURABILITY`, ...).
    pub fn parse(input: &str) -> Option<Self> {
        let key = input.trim().to_ascii_lowercase();
        let key = key.strip_prefix("minecraft:").unwrap_or(&key);
        let parsed = match key {
            "efficiency" | "dig_speed" => EnchantmentType::Efficiency,
            "silk_touch" => EnchantmentType::SilkTouch,
            "fortune" | "loot_bonus_blocks" => EnchantmentType::Fortune,
            "sharpness" | "damage_all" => EnchantmentType::Sharpness,
            "smite" | "damage_undead" => EnchantmentType::Smite,
            "knockback" => EnchantmentType::Knockback,
            "fire_aspect" => EnchantmentType::FireAspect,
            "looting" | "loot_bonus_mobs" => EnchantmentType::Looting,
            "power" | "arrow_damage" => EnchantmentType::Power,
            "punch" | "arrow_knockback" => EnchantmentType::Punch,
            "flame" | "arrow_fire" => EnchantmentType::Flame,
            "infinity" | "arrow_infinite" => EnchantmentType::Infinity,
            "protection" | "protection_environmental" => EnchantmentType::Protection,
            "fire_protection" | "protection_fire" => EnchantmentType::FireProtection,
            "blast_protection" | "protection_explosions" => EnchantmentType::BlastProtection,
            "projectile_protection" | "protection_projectile" => {
                EnchantmentType::ProjectileProtection
            }
            "feather_falling" | "protection_fall" => EnchantmentType::FeatherFalling,
            "thorns" => EnchantmentType::Thorns,
            "unbreaking" | "durability" => EnchantmentType::Unbreaking,
            "mending" => EnchantmentType::Mending,
            _ => return None,
        };
        Some(parsed)
    }
}

impl fmt::Display for EnchantmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An enchantment with a specific level.
///
/// Loot enchantments are applied without the vanilla level cap, so any
/// positive level is kept as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Enchantment {
    /// The type of enchantment
    pub enchantment_type: EnchantmentType,
    /// The level of the enchantment
    pub level: u16,
}

impl Enchantment {
    /// Create a new enchantment
    pub fn new(enchantment_type: EnchantmentType, level: u16) -> Self {
        Self {
            enchantment_type,
            level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modern_and_legacy_names() {
        assert_eq!(
            EnchantmentType::parse("sharpness"),
            Some(EnchantmentType::Sharpness)
        );
        assert_eq!(
            EnchantmentType::parse("DAMAGE_ALL"),
            Some(EnchantmentType::Sharpness)
        );
        assert_eq!(
            EnchantmentType::parse("minecraft:unbreaking"),
            Some(EnchantmentType::Unbreaking)
        );
        assert_eq!(
            EnchantmentType::parse("DURABILITY"),
            Some(EnchantmentType::Unbreaking)
        );
        assert_eq!(EnchantmentType::parse("wobbly"), None);
    }

    #[test]
    fn as_str_round_trips_through_parse() {
        for ty in [
            EnchantmentType::Efficiency,
            EnchantmentType::ProjectileProtection,
            EnchantmentType::Mending,
        ] {
            assert_eq!(EnchantmentType::parse(ty.as_str()), Some(ty));
        }
    }
}
