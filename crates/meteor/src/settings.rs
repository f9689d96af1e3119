//! Meteor configuration model.
//!
//! Every section falls back to defaults when missing, so a partial TOML file
//! is always usable.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use skyfall_core::{millis_to_ticks, seconds_to_ticks};

use crate::effects::{ActiveEffects, EffectConfig};
use crate::guardian::GuardianSettings;
use crate::loot::LootEntry;

/// Default interval of the expiry sweep (one minute of ticks).
pub const DEFAULT_SWEEP_INTERVAL_TICKS: u64 = 1200;

/// Shortest allowed random meteor interval.
pub const MIN_RANDOM_INTERVAL_SECS: u64 = 60;

/// Root of the meteor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeteorSettings {
    /// General engine settings.
    pub settings: GeneralSettings,
    /// Random meteor spawning.
    pub random: RandomMeteorSettings,
    /// Explosion per layer.
    pub explosions: ExplosionLayers,
    /// Treasure container and loot table.
    pub treasure: TreasureSettings,
    /// Guardian mobs.
    pub guardians: GuardianSettings,
    /// Visual and audio effects.
    pub effects: Vec<EffectConfig>,
    /// Meteorite types by id.
    pub meteorites: BTreeMap<String, MeteoriteDefinition>,
}

impl Default for MeteorSettings {
    fn default() -> Self {
        Self {
            settings: GeneralSettings::default(),
            random: RandomMeteorSettings::default(),
            explosions: ExplosionLayers::default(),
            treasure: TreasureSettings::default(),
            guardians: GuardianSettings::default(),
            effects: EffectConfig::defaults(),
            meteorites: BTreeMap::new(),
        }
    }
}

impl MeteorSettings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse meteor settings")
    }

    /// Definition for a meteorite type.
    pub fn definition(&self, id: &str) -> Option<&MeteoriteDefinition> {
        self.meteorites.get(id)
    }

    /// First enabled effect of each kind.
    pub fn active_effects(&self) -> ActiveEffects<'_> {
        ActiveEffects::resolve(&self.effects)
    }
}

/// General engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Height at which meteorites appear before falling.
    pub spawn_height: i32,
    /// Fallback cleanup sweep radius.
    pub cleanup_radius: i32,
    /// Registry file path.
    pub registry_file: PathBuf,
    /// Base cadence of the per-block particle bursts (bursts run every 2 × interval).
    pub particle_interval: u64,
    /// Ticks between expiry sweeps.
    pub sweep_interval_ticks: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            spawn_height: 150,
            cleanup_radius: 8,
            registry_file: PathBuf::from("data/meteorites.json"),
            particle_interval: 5,
            sweep_interval_ticks: DEFAULT_SWEEP_INTERVAL_TICKS,
        }
    }
}

/// Periodic random meteors in one world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomMeteorSettings {
    /// Master switch.
    pub enabled: bool,
    /// Seconds between spawns; clamped to the minimum.
    pub interval_secs: u64,
    /// World to spawn in.
    pub world: String,
    /// Lowest x.
    pub min_x: i32,
    /// Highest x.
    pub max_x: i32,
    /// Lowest z.
    pub min_z: i32,
    /// Highest z.
    pub max_z: i32,
}

impl Default for RandomMeteorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 10_800,
            world: "world".to_string(),
            min_x: -2500,
            max_x: 2500,
            min_z: -2500,
            max_z: 2500,
        }
    }
}

impl RandomMeteorSettings {
    /// Interval in ticks, never shorter than a minute.
    pub fn interval_ticks(&self) -> u64 {
        seconds_to_ticks(self.interval_secs.max(MIN_RANDOM_INTERVAL_SECS))
    }
}

/// Explosion for one layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionSettings {
    /// Master switch.
    pub enabled: bool,
    /// Blast power.
    pub power: f32,
    /// Whether the blast breaks blocks.
    pub breaks_blocks: bool,
    /// Whether the blast sets fires.
    pub sets_fire: bool,
}

impl Default for ExplosionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            power: 1.0,
            breaks_blocks: true,
            sets_fire: false,
        }
    }
}

/// Explosions per layer, fired core first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionLayers {
    /// Core layer.
    pub core: ExplosionSettings,
    /// Inner layer.
    pub inner: ExplosionSettings,
    /// Outer layer.
    pub outer: ExplosionSettings,
}

/// Treasure container placed at impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasureSettings {
    /// Master switch.
    pub enabled: bool,
    /// `chest` or `barrel`; anything else disables the container.
    pub container: String,
    /// Loot table.
    pub items: Vec<LootEntry>,
}

impl Default for TreasureSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            container: "chest".to_string(),
            items: Vec::new(),
        }
    }
}

/// One meteorite type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeteoriteDefinition {
    /// Radius of the outer shell.
    pub outer_radius: i32,
    /// Radius of the inner shell.
    pub inner_radius: i32,
    /// Whether the inner layer is generated.
    pub enable_inner: bool,
    /// Initial downward speed in blocks per tick.
    pub speed: f64,
    /// Seconds after impact before the terrain is restored; 0 keeps it forever.
    pub cleanup_delay_secs: u64,
    /// Weight for random selection; 0 excludes the type.
    pub chance: u32,
    /// Broadcast on spawn; supports `%x%` and `%z%`.
    pub chat_message: Option<String>,
    /// Console commands run on spawn; same placeholders as the chat message.
    pub spawn_commands: Vec<String>,
    /// Broadcast on impact; supports `%x%` and `%z%`.
    pub impact_message: Option<String>,
    /// Weighted materials for the core.
    pub core_blocks: BTreeMap<String, i32>,
    /// Weighted materials for the inner layer.
    pub inner_blocks: BTreeMap<String, i32>,
    /// Weighted materials for the outer layer.
    pub outer_blocks: BTreeMap<String, i32>,
}

impl Default for MeteoriteDefinition {
    fn default() -> Self {
        Self {
            outer_radius: 3,
            inner_radius: 2,
            enable_inner: false,
            speed: 2.0,
            cleanup_delay_secs: 0,
            chance: 1,
            chat_message: None,
            spawn_commands: Vec::new(),
            impact_message: None,
            core_blocks: BTreeMap::new(),
            inner_blocks: BTreeMap::new(),
            outer_blocks: BTreeMap::new(),
        }
    }
}

impl MeteoriteDefinition {
    /// Effective inner radius (0 when the inner layer is disabled).
    pub fn effective_inner_radius(&self) -> i32 {
        if self.enable_inner {
            self.inner_radius.max(0)
        } else {
            0
        }
    }

    /// Cleanup delay in milliseconds.
    pub fn cleanup_delay_ms(&self) -> u64 {
        self.cleanup_delay_secs.saturating_mul(1000)
    }

    /// Cleanup delay in ticks.
    pub fn cleanup_delay_ticks(&self) -> u64 {
        millis_to_ticks(self.cleanup_delay_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let settings = MeteorSettings::from_toml_str("").unwrap();
        assert_eq!(settings, MeteorSettings::default());
        assert_eq!(settings.settings.spawn_height, 150);
        assert_eq!(settings.settings.cleanup_radius, 8);
        assert!(settings.active_effects().shockwave.is_some());
    }

    #[test]
    fn meteorite_tables_parse() {
        let settings = MeteorSettings::from_toml_str(
            r#"
            [meteorites.iron]
            outer_radius = 4
            enable_inner = true
            cleanup_delay_secs = 300
            chat_message = "&cMeteor at %x% %z%"

            [meteorites.iron.core_blocks]
            iron_block = 3
            diamond_ore = 1

            [meteorites.iron.outer_blocks]
            MAGMA_BLOCK = 2
            "#,
        )
        .unwrap();
        let iron = settings.definition("iron").unwrap();
        assert_eq!(iron.outer_radius, 4);
        assert_eq!(iron.effective_inner_radius(), 2);
        assert_eq!(iron.cleanup_delay_ms(), 300_000);
        assert_eq!(iron.cleanup_delay_ticks(), 6_000);
        assert_eq!(iron.core_blocks.get("iron_block"), Some(&3));
        assert_eq!(iron.speed, 2.0);
    }

    #[test]
    fn random_interval_has_floor() {
        let random = RandomMeteorSettings {
            interval_secs: 5,
            ..RandomMeteorSettings::default()
        };
        assert_eq!(random.interval_ticks(), 60 * 20);
    }

    #[test]
    fn inner_radius_collapses_when_disabled() {
        let definition = MeteoriteDefinition {
            inner_radius: 5,
            enable_inner: false,
            ..MeteoriteDefinition::default()
        };
        assert_eq!(definition.effective_inner_radius(), 0);
    }

    #[test]
    fn invalid_document_is_an_error() {
        assert!(MeteorSettings::from_toml_str("settings = 5").is_err());
    }
}
