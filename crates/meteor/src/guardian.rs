//! Guardian mobs spawned next to an impact.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use skyfall_core::text::colorize;
use skyfall_core::{BlockPos, ItemStack, RegistryKey};
use skyfall_world::{EntityId, EntityKindLookup, EquipmentSlot, MobKind, Sound, Vec3, World};
use tracing::{info, warn};

/// Players closer than this to the guardian receive its message.
pub const GUARDIAN_MESSAGE_RADIUS: f64 = 10.0;

/// Guardian mobs spawned at impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardianSettings {
    /// Master switch.
    pub enabled: bool,
    /// Candidate guardians; one enabled entry is picked at random.
    pub types: Vec<GuardianType>,
}

impl Default for GuardianSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            types: Vec::new(),
        }
    }
}

/// Item names for each equipment slot; empty or unknown names leave the slot bare.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardianEquipment {
    /// Helmet slot.
    pub helmet: Option<String>,
    /// Chestplate slot.
    pub chestplate: Option<String>,
    /// Leggings slot.
    pub leggings: Option<String>,
    /// Boots slot.
    pub boots: Option<String>,
    /// Main hand slot.
    pub main_hand: Option<String>,
    /// Off hand slot.
    pub off_hand: Option<String>,
}

impl GuardianEquipment {
    fn slot(&self, slot: EquipmentSlot) -> Option<&str> {
        let name = match slot {
            EquipmentSlot::Helmet => &self.helmet,
            EquipmentSlot::Chestplate => &self.chestplate,
            EquipmentSlot::Leggings => &self.leggings,
            EquipmentSlot::Boots => &self.boots,
            EquipmentSlot::MainHand => &self.main_hand,
            EquipmentSlot::OffHand => &self.off_hand,
        };
        name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// One guardian definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardianType {
    /// Identifier used in logs.
    pub id: String,
    /// Disabled types are never picked.
    pub enabled: bool,
    /// Percent chance (0..=100) that a chosen guardian actually spawns.
    pub chance: u32,
    /// Mob kind; unknown kinds fall back to a zombie.
    pub mob: String,
    /// Name tag; supports `&` color codes.
    pub display_name: String,
    /// Max health.
    pub health: f64,
    /// Attack damage.
    pub attack_damage: f64,
    /// Movement speed.
    pub movement_speed: f64,
    /// Equipment, if any.
    pub equipment: Option<GuardianEquipment>,
    /// Sent to players within the message radius.
    pub player_message: Option<String>,
    /// Sound played on spawn.
    pub spawn_sound: Option<String>,
    /// Sound volume.
    pub sound_volume: f32,
    /// Sound pitch.
    pub sound_pitch: f32,
}

impl Default for GuardianType {
    fn default() -> Self {
        Self {
            id: "guardian".to_string(),
            enabled: false,
            chance: 10,
            mob: "zombie".to_string(),
            display_name: "Guardian".to_string(),
            health: 20.0,
            attack_damage: 5.0,
            movement_speed: 0.25,
            equipment: None,
            player_message: None,
            spawn_sound: None,
            sound_volume: 1.0,
            sound_pitch: 1.0,
        }
    }
}

/// Choose an enabled guardian type, roll its chance, and spawn it near `impact`.
///
/// Returns the spawned mob, or `None` if nothing spawned.
pub fn spawn_guardian(
    world: &mut World,
    settings: &GuardianSettings,
    impact: BlockPos,
    rng: &mut impl Rng,
) -> Option<EntityId> {
    if !settings.enabled {
        return None;
    }
    let enabled: Vec<&GuardianType> = settings.types.iter().filter(|g| g.enabled).collect();
    let guardian = *enabled.choose(rng)?;
    if rng.gen_range(0..100) >= guardian.chance {
        return None;
    }

    let kind = match MobKind::lookup(&guardian.mob) {
        EntityKindLookup::Living(kind) => kind,
        EntityKindLookup::NonLiving => {
            warn!(guardian = %guardian.id, mob = %guardian.mob, "Guardian mob type is not a living entity");
            return None;
        }
        EntityKindLookup::Unknown => {
            warn!(guardian = %guardian.id, mob = %guardian.mob, "Invalid guardian mob type");
            return None;
        }
    };

    let dx = (rng.gen_range(0..3) - 1) * 2;
    let dz = (rng.gen_range(0..3) - 1) * 2;
    let spawn = Vec3::from_block_center(impact.offset(dx, 1, dz));

    let id = world.spawn_mob(kind, spawn);
    let equipment = guardian.equipment.as_ref().map(|eq| equipment_stacks(world, eq));
    if let Some(mob) = world.mob_mut(id) {
        mob.custom_name = Some(colorize(&guardian.display_name));
        mob.custom_name_visible = true;
        mob.set_max_health(guardian.health as f32, guardian.health as f32);
        mob.attack_damage = guardian.attack_damage as f32;
        mob.movement_speed = guardian.movement_speed as f32;
        for (slot, stack) in equipment.into_iter().flatten() {
            mob.equipment.set(slot, stack, 0.0);
        }
    }

    if let Some(message) = guardian.player_message.as_deref().filter(|m| !m.is_empty()) {
        let text = colorize(message);
        for player in world.players_near(spawn, GUARDIAN_MESSAGE_RADIUS) {
            world.send_message(player, text.clone());
        }
    }

    if let Some(name) = guardian.spawn_sound.as_deref().filter(|s| !s.trim().is_empty()) {
        match Sound::parse(name) {
            Some(sound) => {
                world.play_sound(spawn, sound, guardian.sound_volume, guardian.sound_pitch, None)
            }
            None => warn!(guardian = %guardian.id, sound = %name, "Invalid guardian spawn sound"),
        }
    }

    info!(guardian = %guardian.id, mob = kind.as_str(), entity = %id, "Meteorite guardian spawned");
    Some(id)
}

fn equipment_stacks(world: &World, equipment: &GuardianEquipment) -> Vec<(EquipmentSlot, ItemStack)> {
    EquipmentSlot::ALL
        .into_iter()
        .filter_map(|slot| {
            let name = equipment.slot(slot)?;
            let key = RegistryKey::parse(name).ok()?;
            if world.materials().id(&key).is_none() {
                warn!(item = %name, "Unknown guardian equipment item");
                return None;
            }
            Some((slot, ItemStack::new(key, 1)))
        })
        .collect()
}
