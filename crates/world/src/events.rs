//! Outbound world events.
//!
//! Chat, console commands, sounds and particles are not simulated. The world
//! records them in an outbox that the host drains once per tick (the headless
//! runner writes them to a JSONL sink).

use serde::{Deserialize, Serialize};
use skyfall_core::BlockPos;

use crate::entity::{EntityId, Vec3};

/// Particle types that effects may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Particle {
    Flame,
    SoulFireFlame,
    Smoke,
    LargeSmoke,
    CampfireSmoke,
    Lava,
    Explosion,
    ExplosionEmitter,
    Firework,
    EndRod,
    Portal,
    Cloud,
    Enchant,
    Witch,
    DragonBreath,
    TotemOfUndying,
}

impl Particle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Particle::Flame => "flame",
            Particle::SoulFireFlame => "soul_fire_flame",
            Particle::Smoke => "smoke",
            Particle::LargeSmoke => "large_smoke",
            Particle::CampfireSmoke => "campfire_cosy_smoke",
            Particle::Lava => "lava",
            Particle::Explosion => "explosion",
            Particle::ExplosionEmitter => "explosion_emitter",
            Particle::Firework => "firework",
            Particle::EndRod => "end_rod",
            Particle::Portal => "portal",
            Particle::Cloud => "cloud",
            Particle::Enchant => "enchant",
            Particle::Witch => "witch",
            Particle::DragonBreath => "dragon_breath",
            Particle::TotemOfUndying => "totem_of_undying",
        }
    }

    /// Parse modern or legacy particle names (case-insensitive).
    pub fn parse(input: &str) -> Option<Self> {
        let key = input.trim().to_lowercase();
        let key = key.strip_prefix("minecraft:").unwrap_or(&key);
        let particle = match key {
            "flame" => Particle::Flame,
            "soul_fire_flame" => Particle::SoulFireFlame,
            "smoke" | "smoke_normal" => Particle::Smoke,
            "large_smoke" | "smoke_large" => Particle::LargeSmoke,
            "campfire_cosy_smoke" | "campfire_smoke" => Particle::CampfireSmoke,
            "lava" | "drip_lava" => Particle::Lava,
            "explosion" | "explosion_large" => Particle::Explosion,
            "explosion_emitter" | "explosion_huge" => Particle::ExplosionEmitter,
            "firework" | "fireworks_spark" => Particle::Firework,
            "end_rod" => Particle::EndRod,
            "portal" => Particle::Portal,
            "cloud" => Particle::Cloud,
            "enchant" | "enchantment_table" => Particle::Enchant,
            "witch" | "spell_witch" => Particle::Witch,
            "dragon_breath" => Particle::DragonBreath,
            "totem_of_undying" | "totem" => Particle::TotemOfUndying,
            _ => return None,
        };
        Some(particle)
    }
}

const KNOWN_SOUNDS: &[&str] = &[
    "entity.generic.explode",
    "entity.lightning_bolt.thunder",
    "entity.lightning_bolt.impact",
    "entity.wither.spawn",
    "entity.wither.ambient",
    "entity.ender_dragon.growl",
    "entity.warden.emerge",
    "entity.warden.roar",
    "entity.elder_guardian.curse",
    "entity.blaze.shoot",
    "entity.zombie.ambient",
    "entity.player.levelup",
    "entity.firework_rocket.blast",
    "entity.firework_rocket.launch",
    "block.chest.open",
    "block.beacon.activate",
    "block.fire.ambient",
    "block.anvil.land",
    "block.amethyst_block.chime",
    "block.amethyst_block.resonate",
    "entity.experience_orb.pickup",
    "block.respawn_anchor.charge",
    "ui.toast.challenge_complete",
    "item.totem.use",
];

/// Validated sound identifier (`entity.wither.spawn`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sound(String);

impl Sound {
    /// Accepts dotted keys or legacy `ENTITY_WITHER_SPAWN` style names.
    pub fn parse(input: &str) -> Option<Self> {
        let lowered = input.trim().to_lowercase();
        let lowered = lowered.strip_prefix("minecraft:").unwrap_or(&lowered);
        if KNOWN_SOUNDS.contains(&lowered) {
            return Some(Self(lowered.to_string()));
        }
        KNOWN_SOUNDS
            .iter()
            .find(|known| known.replace('.', "_") == lowered)
            .map(|known| Self((*known).to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Something the world was asked to show, say or run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    /// Server-wide chat line.
    Broadcast { text: String },
    /// Console command dispatched on behalf of the server.
    ConsoleCommand { command: String },
    /// Chat line sent to one player.
    PlayerMessage { player: EntityId, text: String },
    Sound {
        pos: Vec3,
        sound: Sound,
        volume: f32,
        pitch: f32,
        /// Listener, or everyone in range when `None`.
        player: Option<EntityId>,
    },
    Particles {
        pos: Vec3,
        particle: Particle,
        count: u32,
        spread: f64,
        speed: f64,
    },
    /// Cosmetic lightning bolt (no fire, no damage).
    Lightning { pos: BlockPos },
    Explosion {
        pos: BlockPos,
        power: f32,
        blocks_broken: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_sound_names_resolve() {
        let sound = Sound::parse("ENTITY_WITHER_SPAWN").unwrap();
        assert_eq!(sound.as_str(), "entity.wither.spawn");
        assert!(Sound::parse("entity.wither.spawn").is_some());
        assert!(Sound::parse("not_a_sound").is_none());
    }

    #[test]
    fn legacy_particle_names_resolve() {
        assert_eq!(Particle::parse("SMOKE_LARGE"), Some(Particle::LargeSmoke));
        assert_eq!(Particle::parse("flame"), Some(Particle::Flame));
        assert_eq!(Particle::parse("sparkles"), None);
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_string(&WorldEvent::Lightning {
            pos: BlockPos::new(1, 2, 3),
        })
        .unwrap();
        assert!(json.contains("\"event\":\"lightning\""));
    }
}
