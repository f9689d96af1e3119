//! Mobs hosted by a world.
//!
//! Only the state meteor guardians need is modelled: kind, position, combat
//! stats, name tag, equipment and active status effects. There is no AI.

use serde::{Deserialize, Serialize};
use skyfall_core::ItemStack;

use crate::entity::{EntityId, StatusEffect, Vec3};

/// Living mob kinds that can be spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MobKind {
    Pig,
    Cow,
    Sheep,
    Chicken,
    Villager,
    Zombie,
    Husk,
    Drowned,
    Skeleton,
    Stray,
    WitherSkeleton,
    Spider,
    CaveSpider,
    Creeper,
    Enderman,
    Witch,
    Blaze,
    Ghast,
    Piglin,
    PiglinBrute,
    Vindicator,
    Pillager,
    Evoker,
    Ravager,
    IronGolem,
    Warden,
    Wither,
    EnderDragon,
}

/// Entity kinds that exist but are not living and cannot guard anything.
const NON_LIVING: &[&str] = &[
    "item",
    "arrow",
    "tnt",
    "falling_block",
    "lightning_bolt",
    "experience_orb",
    "fireball",
    "boat",
    "minecart",
    "painting",
    "item_frame",
];

/// Outcome of resolving an entity type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKindLookup {
    Living(MobKind),
    NonLiving,
    Unknown,
}

impl MobKind {
    /// Canonical lowercase string key for configs/logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            MobKind::Pig => "pig",
            MobKind::Cow => "cow",
            MobKind::Sheep => "sheep",
            MobKind::Chicken => "chicken",
            MobKind::Villager => "villager",
            MobKind::Zombie => "zombie",
            MobKind::Husk => "husk",
            MobKind::Drowned => "drowned",
            MobKind::Skeleton => "skeleton",
            MobKind::Stray => "stray",
            MobKind::WitherSkeleton => "wither_skeleton",
            MobKind::Spider => "spider",
            MobKind::CaveSpider => "cave_spider",
            MobKind::Creeper => "creeper",
            MobKind::Enderman => "enderman",
            MobKind::Witch => "witch",
            MobKind::Blaze => "blaze",
            MobKind::Ghast => "ghast",
            MobKind::Piglin => "piglin",
            MobKind::PiglinBrute => "piglin_brute",
            MobKind::Vindicator => "vindicator",
            MobKind::Pillager => "pillager",
            MobKind::Evoker => "evoker",
            MobKind::Ravager => "ravager",
            MobKind::IronGolem => "iron_golem",
            MobKind::Warden => "warden",
            MobKind::Wither => "wither",
            MobKind::EnderDragon => "ender_dragon",
        }
    }

    /// Parse a mob kind from a string key (case-insensitive, namespace optional).
    pub fn parse(input: &str) -> Option<Self> {
        let key = input.trim().to_lowercase();
        let key = key.strip_prefix("minecraft:").unwrap_or(&key);
        let kind = match key {
            "pig" => MobKind::Pig,
            "cow" => MobKind::Cow,
            "sheep" => MobKind::Sheep,
            "chicken" => MobKind::Chicken,
            "villager" => MobKind::Villager,
            "zombie" => MobKind::Zombie,
            "husk" => MobKind::Husk,
            "drowned" => MobKind::Drowned,
            "skeleton" => MobKind::Skeleton,
            "stray" => MobKind::Stray,
            "wither_skeleton" => MobKind::WitherSkeleton,
            "spider" => MobKind::Spider,
            "cave_spider" => MobKind::CaveSpider,
            "creeper" => MobKind::Creeper,
            "enderman" => MobKind::Enderman,
            "witch" => MobKind::Witch,
            "blaze" => MobKind::Blaze,
            "ghast" => MobKind::Ghast,
            "piglin" => MobKind::Piglin,
            "piglin_brute" => MobKind::PiglinBrute,
            "vindicator" => MobKind::Vindicator,
            "pillager" => MobKind::Pillager,
            "evoker" => MobKind::Evoker,
            "ravager" => MobKind::Ravager,
            "iron_golem" => MobKind::IronGolem,
            "warden" => MobKind::Warden,
            "wither" => MobKind::Wither,
            "ender_dragon" | "enderdragon" | "dragon" => MobKind::EnderDragon,
            _ => return None,
        };
        Some(kind)
    }

    /// Resolve a configured entity type name.
    pub fn lookup(input: &str) -> EntityKindLookup {
        if let Some(kind) = Self::parse(input) {
            return EntityKindLookup::Living(kind);
        }
        let key = input.trim().to_lowercase();
        let key = key.strip_prefix("minecraft:").unwrap_or(&key);
        if NON_LIVING.contains(&key) {
            EntityKindLookup::NonLiving
        } else {
            EntityKindLookup::Unknown
        }
    }

    /// Get the mob's maximum health in half-hearts.
    pub fn max_health(self) -> f32 {
        match self {
            MobKind::Chicken => 4.0,
            MobKind::Pig | MobKind::Cow | MobKind::Sheep => 10.0,
            MobKind::CaveSpider => 12.0,
            MobKind::Spider => 16.0,
            MobKind::Villager
            | MobKind::Zombie
            | MobKind::Husk
            | MobKind::Drowned
            | MobKind::Skeleton
            | MobKind::Stray
            | MobKind::Creeper
            | MobKind::Blaze
            | MobKind::Witch => 20.0,
            MobKind::WitherSkeleton => 20.0,
            MobKind::Piglin | MobKind::Pillager | MobKind::Vindicator | MobKind::Evoker => 24.0,
            MobKind::Ghast => 10.0,
            MobKind::Enderman => 40.0,
            MobKind::PiglinBrute => 50.0,
            MobKind::IronGolem => 100.0,
            MobKind::Ravager => 100.0,
            MobKind::EnderDragon => 200.0,
            MobKind::Wither => 300.0,
            MobKind::Warden => 500.0,
        }
    }

    /// Base attack damage (passive mobs deal none).
    pub fn attack_damage(self) -> f32 {
        match self {
            MobKind::Pig | MobKind::Cow | MobKind::Sheep | MobKind::Chicken | MobKind::Villager => {
                0.0
            }
            MobKind::Warden => 30.0,
            MobKind::Ravager | MobKind::IronGolem => 12.0,
            MobKind::EnderDragon => 10.0,
            MobKind::WitherSkeleton | MobKind::Enderman | MobKind::PiglinBrute => 7.0,
            _ => 3.0,
        }
    }

    /// Base movement speed in blocks per tick.
    pub fn movement_speed(self) -> f32 {
        match self {
            MobKind::Chicken => 0.25,
            MobKind::Spider | MobKind::CaveSpider | MobKind::PiglinBrute => 0.35,
            MobKind::Warden | MobKind::Vindicator => 0.3,
            MobKind::Creeper | MobKind::Villager | MobKind::Cow => 0.2,
            _ => 0.25,
        }
    }
}

/// Equipment slots of a living entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentSlot {
    Helmet,
    Chestplate,
    Leggings,
    Boots,
    MainHand,
    OffHand,
}

impl EquipmentSlot {
    pub const ALL: [EquipmentSlot; 6] = [
        EquipmentSlot::Helmet,
        EquipmentSlot::Chestplate,
        EquipmentSlot::Leggings,
        EquipmentSlot::Boots,
        EquipmentSlot::MainHand,
        EquipmentSlot::OffHand,
    ];

    const fn index(self) -> usize {
        match self {
            EquipmentSlot::Helmet => 0,
            EquipmentSlot::Chestplate => 1,
            EquipmentSlot::Leggings => 2,
            EquipmentSlot::Boots => 3,
            EquipmentSlot::MainHand => 4,
            EquipmentSlot::OffHand => 5,
        }
    }
}

/// Worn and held items with their drop chances (0.0 ..= 1.0).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    items: [Option<ItemStack>; 6],
    drop_chances: [f32; 6],
}

impl Equipment {
    pub fn set(&mut self, slot: EquipmentSlot, item: ItemStack, drop_chance: f32) {
        self.items[slot.index()] = Some(item);
        self.drop_chances[slot.index()] = drop_chance.clamp(0.0, 1.0);
    }

    pub fn get(&self, slot: EquipmentSlot) -> Option<&ItemStack> {
        self.items[slot.index()].as_ref()
    }

    pub fn drop_chance(&self, slot: EquipmentSlot) -> f32 {
        self.drop_chances[slot.index()]
    }
}

/// A spawned mob.
#[derive(Debug, Clone, PartialEq)]
pub struct Mob {
    pub id: EntityId,
    pub kind: MobKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub health: f32,
    pub max_health: f32,
    pub attack_damage: f32,
    pub movement_speed: f32,
    pub custom_name: Option<String>,
    pub custom_name_visible: bool,
    pub equipment: Equipment,
    pub effects: Vec<StatusEffect>,
}

impl Mob {
    pub fn new(id: EntityId, kind: MobKind, position: Vec3) -> Self {
        Self {
            id,
            kind,
            position,
            velocity: Vec3::ZERO,
            health: kind.max_health(),
            max_health: kind.max_health(),
            attack_damage: kind.attack_damage(),
            movement_speed: kind.movement_speed(),
            custom_name: None,
            custom_name_visible: false,
            equipment: Equipment::default(),
            effects: Vec::new(),
        }
    }

    /// Set maximum health; current health never exceeds it.
    pub fn set_max_health(&mut self, max: f32, health: f32) {
        self.max_health = max.max(1.0);
        self.health = health.min(self.max_health);
    }

    /// Apply damage, returning true if the mob died.
    pub fn damage(&mut self, amount: f32) -> bool {
        self.health = (self.health - amount).max(0.0);
        self.health <= 0.0
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_namespaced_and_uppercase() {
        assert_eq!(MobKind::parse("ZOMBIE"), Some(MobKind::Zombie));
        assert_eq!(
            MobKind::parse("minecraft:wither_skeleton"),
            Some(MobKind::WitherSkeleton)
        );
        assert_eq!(MobKind::parse("unicorn"), None);
    }

    #[test]
    fn lookup_distinguishes_non_living() {
        assert_eq!(MobKind::lookup("arrow"), EntityKindLookup::NonLiving);
        assert_eq!(MobKind::lookup("unicorn"), EntityKindLookup::Unknown);
        assert_eq!(
            MobKind::lookup("husk"),
            EntityKindLookup::Living(MobKind::Husk)
        );
    }

    #[test]
    fn every_kind_round_trips_through_its_key() {
        for kind in [MobKind::Pig, MobKind::PiglinBrute, MobKind::IronGolem, MobKind::Warden] {
            assert_eq!(MobKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn health_is_capped_by_max() {
        let mut mob = Mob::new(EntityId(1), MobKind::Zombie, Vec3::ZERO);
        mob.set_max_health(40.0, 80.0);
        assert_eq!(mob.max_health, 40.0);
        assert_eq!(mob.health, 40.0);
        mob.set_max_health(40.0, 25.0);
        assert_eq!(mob.health, 25.0);
    }

    #[test]
    fn damage_reports_death() {
        let mut mob = Mob::new(EntityId(2), MobKind::Chicken, Vec3::ZERO);
        assert!(!mob.damage(1.0));
        assert!(mob.damage(10.0));
        assert!(mob.is_dead());
    }

    #[test]
    fn equipment_drop_chance_is_clamped() {
        let mut equipment = Equipment::default();
        let sword = ItemStack::new(skyfall_core::RegistryKey::parse("iron_sword").unwrap(), 1);
        equipment.set(EquipmentSlot::MainHand, sword.clone(), 2.0);
        assert_eq!(equipment.get(EquipmentSlot::MainHand), Some(&sword));
        assert_eq!(equipment.drop_chance(EquipmentSlot::MainHand), 1.0);
        assert_eq!(equipment.drop_chance(EquipmentSlot::Helmet), 0.0);
    }
}
