//! Impact resolution.
//!
//! Every step is independent: a step that cannot run (missing material,
//! unknown mob, disabled effect) is skipped and the rest still happen.

use rand::Rng;
use skyfall_core::text::{colorize, substitute};
use skyfall_core::BlockPos;
use skyfall_world::{ContainerKind, EntityId, World};
use tracing::{debug, warn};

use crate::effects::{play_loot_animation, run_radar, spawn_shockwave};
use crate::guardian::spawn_guardian;
use crate::loot::{fill_container, roll_loot};
use crate::settings::{ExplosionSettings, MeteorSettings, MeteoriteDefinition};

/// What an impact did to the world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImpactOutcome {
    /// Blocks removed by the layered explosions.
    pub blocks_destroyed: usize,
    /// Treasure container placed at the impact point.
    pub container: Option<BlockPos>,
    /// Item stacks placed in the container.
    pub loot_stacks: usize,
    /// Guardian spawned, if any.
    pub guardian: Option<EntityId>,
    /// Players hit by the shockwave.
    pub shockwave_hits: usize,
    /// Players notified by the radar.
    pub radar_notified: usize,
}

fn detonate(world: &mut World, at: BlockPos, explosion: &ExplosionSettings, rng: &mut impl Rng) -> usize {
    if !explosion.enabled {
        return 0;
    }
    world.explode(at, explosion.power, explosion.sets_fire, explosion.breaks_blocks, rng)
}

/// Place and fill the treasure container; returns its position and stack count.
fn place_treasure(
    world: &mut World,
    settings: &MeteorSettings,
    impact: BlockPos,
    rng: &mut impl Rng,
) -> Option<(BlockPos, usize)> {
    let treasure = &settings.treasure;
    if !treasure.enabled {
        return None;
    }
    let Some(kind) = ContainerKind::parse(&treasure.container) else {
        warn!("Unknown treasure container '{}', skipping loot", treasure.container);
        return None;
    };
    if !world.place_container(impact, kind) {
        warn!(pos = %impact, "Could not place treasure container");
        return None;
    }
    let materials = world.shared_materials();
    let items = roll_loot(&treasure.items, &materials, rng);
    let stacks = match world.container_mut(impact) {
        Some(container) => fill_container(container, &materials, items),
        None => 0,
    };
    Some((impact, stacks))
}

/// Resolve the impact of one meteorite at `impact`.
pub fn resolve_impact(
    world: &mut World,
    settings: &MeteorSettings,
    definition: &MeteoriteDefinition,
    impact: BlockPos,
    rng: &mut impl Rng,
) -> ImpactOutcome {
    let mut outcome = ImpactOutcome::default();
    let effects = settings.active_effects();

    let explosions = &settings.explosions;
    outcome.blocks_destroyed += detonate(world, impact, &explosions.core, rng);
    if definition.enable_inner {
        outcome.blocks_destroyed += detonate(world, impact, &explosions.inner, rng);
    }
    outcome.blocks_destroyed += detonate(world, impact, &explosions.outer, rng);

    if effects.strike.is_some() {
        world.strike_lightning_effect(impact);
    }

    if let Some((container, stacks)) = place_treasure(world, settings, impact, rng) {
        outcome.container = Some(container);
        outcome.loot_stacks = stacks;
        if let Some(animation) = effects.loot_animation {
            play_loot_animation(world, animation, container);
        }
    }

    outcome.guardian = spawn_guardian(world, &settings.guardians, impact, rng);

    if let Some(message) = &definition.impact_message {
        let text = substitute(
            &colorize(message),
            &[("x", impact.x.to_string()), ("z", impact.z.to_string())],
        );
        world.broadcast(text);
    }

    if let Some(shockwave) = effects.shockwave {
        outcome.shockwave_hits = spawn_shockwave(world, shockwave, impact);
    }
    if let Some(radar) = effects.radar {
        outcome.radar_notified = run_radar(world, radar, impact);
    }

    debug!(
        world = world.name(),
        pos = %impact,
        destroyed = outcome.blocks_destroyed,
        loot = outcome.loot_stacks,
        "Impact resolved"
    );
    outcome
}
