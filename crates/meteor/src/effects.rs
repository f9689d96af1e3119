//! Cosmetic effects.
//!
//! Each effect kind is a tagged variant with its own settings record. None of
//! them influence scheduling or cleanup; they only push events into the world
//! outbox and nudge nearby entities.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use skyfall_core::text::{colorize, substitute};
use skyfall_core::BlockPos;
use skyfall_world::{
    EntityId, Particle, Sound, StatusEffect, StatusEffectKind, Vec3, World,
};
use tracing::warn;

/// One configured visual or audio effect, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectConfig {
    /// Flame trail behind falling blocks.
    AtmosphereTrail(TrailSettings),
    /// Random particle bursts around falling blocks.
    ParticleBursts(BurstSettings),
    /// Cosmetic lightning at the impact point.
    LightningStrike(StrikeSettings),
    /// Knockback and damage for players near the impact.
    Shockwave(ShockwaveSettings),
    /// Impact notice for nearby players.
    Radar(RadarSettings),
    /// Particles above the treasure container.
    LootAnimation(LootAnimationSettings),
}

impl EffectConfig {
    /// Effects enabled when the configuration does not list any.
    pub fn defaults() -> Vec<EffectConfig> {
        vec![
            EffectConfig::AtmosphereTrail(TrailSettings::default()),
            EffectConfig::LightningStrike(StrikeSettings::default()),
            EffectConfig::Shockwave(ShockwaveSettings::default()),
            EffectConfig::Radar(RadarSettings::default()),
            EffectConfig::LootAnimation(LootAnimationSettings::default()),
        ]
    }
}

/// Resolved view over the configured effects: the first enabled entry of each kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveEffects<'a> {
    /// Trail settings, if enabled.
    pub trail: Option<&'a TrailSettings>,
    /// Burst settings, if enabled.
    pub bursts: Option<&'a BurstSettings>,
    /// Lightning settings, if enabled.
    pub strike: Option<&'a StrikeSettings>,
    /// Shockwave settings, if enabled.
    pub shockwave: Option<&'a ShockwaveSettings>,
    /// Radar settings, if enabled.
    pub radar: Option<&'a RadarSettings>,
    /// Loot animation settings, if enabled.
    pub loot_animation: Option<&'a LootAnimationSettings>,
}

impl<'a> ActiveEffects<'a> {
    /// Pick the first enabled entry of each kind.
    pub fn resolve(effects: &'a [EffectConfig]) -> Self {
        let mut active = Self::default();
        for effect in effects {
            match effect {
                EffectConfig::AtmosphereTrail(s) if s.enabled => {
                    active.trail = active.trail.or(Some(s));
                }
                EffectConfig::ParticleBursts(s) if s.enabled => {
                    active.bursts = active.bursts.or(Some(s));
                }
                EffectConfig::LightningStrike(s) if s.enabled => {
                    active.strike = active.strike.or(Some(s));
                }
                EffectConfig::Shockwave(s) if s.enabled => {
                    active.shockwave = active.shockwave.or(Some(s));
                }
                EffectConfig::Radar(s) if s.enabled => {
                    active.radar = active.radar.or(Some(s));
                }
                EffectConfig::LootAnimation(s) if s.enabled => {
                    active.loot_animation = active.loot_animation.or(Some(s));
                }
                _ => {}
            }
        }
        active
    }
}

fn particle_or_flame(name: &str) -> Particle {
    Particle::parse(name).unwrap_or_else(|| {
        warn!("Unknown particle '{name}', using flame");
        Particle::Flame
    })
}

// ------------------------------------------------------------------ trail

/// Flame trail behind falling blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailSettings {
    /// Master switch.
    pub enabled: bool,
    /// Particle name; unknown names fall back to flame.
    pub particle: String,
    /// Sound played with each frame.
    pub sound: Option<String>,
    /// Ticks between frames.
    pub interval_ticks: u64,
    /// Entities below this height no longer leave a trail.
    pub min_y: f64,
    /// Particles per entity per frame.
    pub count: u32,
    /// Particle spread.
    pub spread: f64,
    /// Particle speed.
    pub speed: f64,
}

impl Default for TrailSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            particle: "flame".to_string(),
            sound: Some("entity.blaze.shoot".to_string()),
            interval_ticks: 3,
            min_y: 90.0,
            count: 6,
            spread: 0.3,
            speed: 0.01,
        }
    }
}

/// Emit one trail frame. Returns false once none of `entities` is live.
pub fn emit_trail(world: &mut World, settings: &TrailSettings, entities: &[EntityId]) -> bool {
    let particle = particle_or_flame(&settings.particle);
    let sound = settings.sound.as_deref().and_then(Sound::parse);
    let mut alive = false;
    for &entity in entities {
        if !world.is_entity_live(entity) {
            continue;
        }
        alive = true;
        let Some(pos) = world.entity_position(entity) else {
            continue;
        };
        if pos.y < settings.min_y {
            continue;
        }
        world.spawn_particles(pos, particle, settings.count, settings.spread, settings.speed);
        if let Some(sound) = &sound {
            world.play_sound(pos, sound.clone(), 0.5, 1.3, None);
        }
    }
    alive
}

// ----------------------------------------------------------------- bursts

/// One particle burst kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleBurst {
    /// Master switch.
    pub enabled: bool,
    /// Particle name.
    pub particle: String,
    /// Percent chance (0..=100) per attempt.
    pub chance: u32,
    /// Particles per burst.
    pub amount: u32,
    /// Particle spread.
    pub spread: f64,
    /// Particle speed.
    pub speed: f64,
}

impl Default for ParticleBurst {
    fn default() -> Self {
        Self {
            enabled: true,
            particle: "flame".to_string(),
            chance: 100,
            amount: 1,
            spread: 0.1,
            speed: 0.05,
        }
    }
}

/// Random bursts around a falling instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstSettings {
    /// Master switch.
    pub enabled: bool,
    /// Candidate bursts, each rolled independently.
    pub bursts: Vec<ParticleBurst>,
}

/// Try one burst for `entity`. Returns false once the entity is gone.
pub fn emit_burst(
    world: &mut World,
    settings: &BurstSettings,
    entity: EntityId,
    rng: &mut impl Rng,
) -> bool {
    let Some(pos) = world.entity_position(entity).filter(|_| world.is_entity_live(entity)) else {
        return false;
    };
    let Some(burst) = settings.bursts.choose(rng) else {
        return true;
    };
    if !burst.enabled || rng.gen_range(0..100) >= burst.chance {
        return true;
    }
    if let Some(particle) = Particle::parse(&burst.particle) {
        world.spawn_particles(pos, particle, burst.amount, burst.spread, burst.speed);
    }
    true
}

// ------------------------------------------------------------------ strike

/// Cosmetic lightning at the impact point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrikeSettings {
    /// Master switch.
    pub enabled: bool,
}

impl Default for StrikeSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// --------------------------------------------------------------- shockwave

/// Shockwave applied to players near the impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShockwaveSettings {
    /// Master switch.
    pub enabled: bool,
    /// Reach in blocks.
    pub radius: f64,
    /// Knockback strength at the center.
    pub knockback: f64,
    /// Damage at the center.
    pub damage: f64,
    /// Whether hit players are slowed.
    pub apply_slow: bool,
    /// Slow duration.
    pub slow_duration_ticks: u32,
    /// Slow amplifier.
    pub slow_amplifier: u8,
}

impl Default for ShockwaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: 12.0,
            knockback: 1.5,
            damage: 4.0,
            apply_slow: true,
            slow_duration_ticks: 60,
            slow_amplifier: 0,
        }
    }
}

fn shockwave_push(center: Vec3, target: Vec3, knockback: f64) -> Vec3 {
    let mut dir = target - center;
    if dir.length() <= f64::EPSILON {
        dir = Vec3::new(0.0, 1.0, 0.0);
    }
    let mut push = dir.normalize_or_zero() * knockback;
    push.y = (push.y + 0.3).max(0.4);
    push
}

/// Knock back, hurt and slow every mob and player inside the shockwave cube.
///
/// Returns how many entities were hit.
pub fn spawn_shockwave(world: &mut World, settings: &ShockwaveSettings, impact: BlockPos) -> usize {
    let center = Vec3::from_block_center(impact);
    let r = settings.radius;
    world.spawn_particles(center, Particle::Cloud, 60, r / 2.0, 0.02);
    if let Some(sound) = Sound::parse("entity.generic.explode") {
        world.play_sound(center, sound, 2.0, 0.6, None);
    }

    let within = |pos: Vec3| {
        (pos.x - center.x).abs() <= r && (pos.y - center.y).abs() <= r && (pos.z - center.z).abs() <= r
    };
    let slow = settings.apply_slow.then_some(StatusEffect {
        kind: StatusEffectKind::Slowness,
        duration_ticks: settings.slow_duration_ticks,
        amplifier: settings.slow_amplifier,
    });

    let mut hit = 0;
    for mob in world.mobs_mut().filter(|mob| !mob.is_dead() && within(mob.position)) {
        mob.velocity = shockwave_push(center, mob.position, settings.knockback);
        if settings.damage > 0.0 {
            mob.damage(settings.damage as f32);
        }
        mob.effects.extend(slow);
        hit += 1;
    }
    for player in world.players_mut().filter(|player| within(player.position)) {
        player.velocity = shockwave_push(center, player.position, settings.knockback);
        if settings.damage > 0.0 {
            player.damage(settings.damage as f32);
        }
        player.effects.extend(slow);
        hit += 1;
    }
    hit
}

// ------------------------------------------------------------------- radar

/// Impact notice for players within range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarSettings {
    /// Master switch.
    pub enabled: bool,
    /// Players within this distance are notified.
    pub notify_radius: f64,
    /// Supports `%x%`, `%z%`, `%dist%` and `%dir%`.
    pub message: String,
    /// Compass labels, clockwise from north.
    pub directions: [String; 8],
    /// Sound played for each notified player.
    pub sound: Option<String>,
}

impl Default for RadarSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            notify_radius: 500.0,
            message: "&6[Meteorite] &fX:&e%x% &fZ:&e%z% &7(&a%dist%m&7, heading &b%dir%&7)"
                .to_string(),
            directions: [
                "north",
                "northeast",
                "east",
                "southeast",
                "south",
                "southwest",
                "west",
                "northwest",
            ]
            .map(String::from),
            sound: Some("ui.toast.challenge_complete".to_string()),
        }
    }
}

/// Index into the eight compass labels for a bearing from `from` to `to`.
///
/// North is -Z, east is +X.
pub fn compass_index(from: Vec3, to: Vec3) -> usize {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    let mut angle = (-dx).atan2(dz).to_degrees();
    if angle < 0.0 {
        angle += 360.0;
    }
    let sector = ((angle + 22.5) / 45.0).floor() as usize % 8;
    // atan2(-dx, dz) is 0 towards +Z (south); rotate so index 0 is north.
    (sector + 4) % 8
}

/// Tell every player within range where the meteorite came down.
pub fn run_radar(world: &mut World, settings: &RadarSettings, impact: BlockPos) -> usize {
    let target = Vec3::from_block_center(impact);
    let sound = settings.sound.as_deref().and_then(Sound::parse);
    let recipients: Vec<(EntityId, Vec3)> = world
        .players()
        .filter(|player| player.position.distance(target) <= settings.notify_radius)
        .map(|player| (player.id, player.position))
        .collect();
    for (player, position) in &recipients {
        let dist = position.distance(target) as i64;
        let dir = &settings.directions[compass_index(*position, target)];
        let text = substitute(
            &colorize(&settings.message),
            &[
                ("x", impact.x.to_string()),
                ("z", impact.z.to_string()),
                ("dist", dist.to_string()),
                ("dir", dir.clone()),
            ],
        );
        world.send_message(*player, text);
        if let Some(sound) = &sound {
            world.play_sound(*position, sound.clone(), 0.7, 1.2, Some(*player));
        }
    }
    recipients.len()
}

// ---------------------------------------------------------- loot animation

/// Particles above the treasure container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootAnimationSettings {
    /// Master switch.
    pub enabled: bool,
    /// Particle name.
    pub particle: String,
    /// Particle count.
    pub count: u32,
}

impl Default for LootAnimationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            particle: "end_rod".to_string(),
            count: 40,
        }
    }
}

/// Spawn the loot particles above `container`.
pub fn play_loot_animation(world: &mut World, settings: &LootAnimationSettings, container: BlockPos) {
    let pos = Vec3::from_block_center(container) + Vec3::new(0.0, 1.0, 0.0);
    world.spawn_particles(pos, particle_or_flame(&settings.particle), settings.count, 0.3, 0.01);
    for name in ["entity.experience_orb.pickup", "block.amethyst_block.resonate"] {
        if let Some(sound) = Sound::parse(name) {
            world.play_sound(pos, sound, 1.0, 1.0, None);
        }
    }
}
