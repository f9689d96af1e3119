//! Launching a generated structure and estimating when it lands.

use rand::Rng;
use skyfall_core::{InstanceId, TICKS_PER_SECOND};
use skyfall_world::{EntityId, Vec3, World};

use crate::generator::StructureLayout;

/// Extra ticks added to every fall estimate so landing always precedes impact.
pub const IMPACT_GRACE_TICKS: u64 = 40;

/// Lower bound on the fall estimate before the grace period.
pub const MIN_FALL_TICKS: u64 = 20;

/// Horizontal jitter applied to each falling block, in blocks per tick.
pub const HORIZONTAL_JITTER: f64 = 0.25;

/// Ticks until the impact for a structure dropped from `spawn_height` onto `impact_y`.
pub fn fall_ticks(spawn_height: i32, impact_y: i32, speed: f64) -> u64 {
    let distance = f64::from(spawn_height - impact_y);
    let raw = distance / speed.max(0.001) * TICKS_PER_SECOND as f64;
    let ticks = if raw.is_finite() && raw > 0.0 {
        raw as u64
    } else {
        0
    };
    ticks.max(MIN_FALL_TICKS) + IMPACT_GRACE_TICKS
}

/// Vertical offset that moves the layout centre up to `spawn_height`.
///
/// Clamped so the top of the structure stays below `max_y`; never negative.
pub fn lift_offset(layout: &StructureLayout, spawn_height: i32, max_y: i32) -> i32 {
    let wanted = spawn_height - layout.center.y;
    let headroom = layout
        .top()
        .map_or(wanted, |top| max_y - 1 - top);
    wanted.min(headroom).max(0)
}

/// Spawn one falling block per layout position, lifted by `lift`.
///
/// Every entity carries `instance` so landings can be attributed.
pub fn launch(
    world: &mut World,
    instance: InstanceId,
    layout: &StructureLayout,
    lift: i32,
    speed: f64,
    rng: &mut impl Rng,
) -> Vec<EntityId> {
    layout
        .blocks
        .iter()
        .map(|block| {
            let start = Vec3::from_block_center(block.pos.offset(0, lift, 0));
            let velocity = Vec3::new(
                (rng.gen::<f64>() - 0.5) * 2.0 * HORIZONTAL_JITTER,
                -speed,
                (rng.gen::<f64>() - 0.5) * 2.0 * HORIZONTAL_JITTER,
            );
            world.spawn_falling_block(instance, block.material, start, velocity)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate, VerticalBounds};
    use crate::settings::MeteoriteDefinition;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use skyfall_core::BlockPos;
    use skyfall_world::Materials;
    use std::sync::Arc;

    #[test]
    fn fall_estimate_matches_formula() {
        // (150 - 64) / 2.0 * 20 = 860
        assert_eq!(fall_ticks(150, 64, 2.0), 900);
        assert_eq!(fall_ticks(150, 149, 100.0), MIN_FALL_TICKS + IMPACT_GRACE_TICKS);
        assert_eq!(fall_ticks(50, 64, 2.0), MIN_FALL_TICKS + IMPACT_GRACE_TICKS);
    }

    #[test]
    fn zero_speed_is_clamped() {
        assert_eq!(fall_ticks(150, 149, 0.0), 20_000 + IMPACT_GRACE_TICKS);
    }

    #[test]
    fn launched_blocks_carry_instance_and_stay_in_world() {
        let materials = Arc::new(Materials::builtin());
        let mut world = World::flat("W", materials.clone());
        let definition = MeteoriteDefinition {
            outer_radius: 3,
            ..MeteoriteDefinition::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let bounds = VerticalBounds {
            min_y: world.min_y(),
            max_y: world.max_y(),
        };
        let layout = generate(BlockPos::new(0, 64, 0), &definition, &materials, bounds, &mut rng);
        let lift = lift_offset(&layout, 254, world.max_y());
        assert_eq!(layout.top().map(|t| t + lift), Some(world.max_y() - 1));

        let instance = InstanceId::random(&mut rng);
        let ids = launch(&mut world, instance, &layout, lift, 2.0, &mut rng);
        assert_eq!(ids.len(), layout.len());
        for id in ids {
            let block = world.falling_block(id).unwrap();
            assert_eq!(block.instance, instance);
            assert_eq!(block.velocity.y, -2.0);
            assert!(block.velocity.x.abs() <= HORIZONTAL_JITTER);
        }
    }
}
