//! The meteor engine: one explicit context that owns every piece of
//! lifecycle state and is driven by the host tick loop.
//!
//! Lifecycle of one instance:
//! `create_meteorite_at` generates and launches the structure; landings feed
//! the instance block set; the deferred impact resolves effects and registers
//! the placement, claiming its coordinate only for that call; the deferred
//! cleanup (or the periodic expiry sweep, or a restart) restores the terrain.
//! A landed instance is either in the durable registry or already removed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use skyfall_core::text::{colorize, substitute};
use skyfall_core::{millis_to_ticks, BlockPos, InstanceId, RegistryKey, SimTick, WorldPoint, TICKS_PER_SECOND};
use skyfall_world::{BlockLanded, EntityId, World, WorldSet};
use tracing::{debug, info, warn};

use crate::cleanup::{clear_exact, sweep_whitelist, InstanceBlocks};
use crate::clock::Clock;
use crate::effects::{emit_burst, emit_trail};
use crate::error::SpawnError;
use crate::fall::{fall_ticks, launch, lift_offset};
use crate::generator::{generate, VerticalBounds};
use crate::impact::{resolve_impact, ImpactOutcome};
use crate::random::{pick_column, pick_type};
use crate::record::{PlacementRecord, RegistryStore};
use crate::registry::{LifecycleRegistry, RegisterRequest};
use crate::scheduler::{TaskId, TaskScheduler};
use crate::settings::{MeteorSettings, MeteoriteDefinition};

/// Deferred work driven by the engine's scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Land a falling instance.
    Impact(InstanceId),
    /// Remove a landed instance.
    Cleanup(InstanceId),
    /// Periodic sweep of expired records.
    ExpirySweep,
    /// Trail frame for falling entities.
    Trail {
        /// World the entities live in.
        world: String,
        /// Entities sharing the trail.
        entities: Arc<[EntityId]>,
    },
    /// Burst roll for one falling entity.
    Burst {
        /// World the entity lives in.
        world: String,
        /// Falling entity.
        entity: EntityId,
    },
    /// Spawn a meteorite at a random column.
    RandomMeteor,
}

/// A launched instance waiting for its impact.
struct PendingImpact {
    point: WorldPoint,
    type_id: String,
    definition: MeteoriteDefinition,
    materials: BTreeSet<RegistryKey>,
}

/// Drives meteorites from spawn to cleanup.
pub struct MeteorEngine {
    settings: MeteorSettings,
    registry: LifecycleRegistry,
    scheduler: TaskScheduler<Task>,
    blocks: InstanceBlocks,
    pending: BTreeMap<InstanceId, PendingImpact>,
    cleanups: BTreeMap<InstanceId, TaskId>,
    sweep_task: Option<TaskId>,
    random_task: Option<TaskId>,
    rng: StdRng,
    now: SimTick,
    shut_down: bool,
}

impl MeteorEngine {
    /// Engine backed by the registry file named in `settings`.
    pub fn new(settings: MeteorSettings, clock: Arc<dyn Clock>, seed: u64) -> Self {
        let store = RegistryStore::new(settings.settings.registry_file.clone());
        Self::with_registry(settings, LifecycleRegistry::new(store, clock), seed)
    }

    /// Engine backed by an existing registry.
    pub fn with_registry(settings: MeteorSettings, registry: LifecycleRegistry, seed: u64) -> Self {
        Self {
            settings,
            registry,
            scheduler: TaskScheduler::new(),
            blocks: InstanceBlocks::new(),
            pending: BTreeMap::new(),
            cleanups: BTreeMap::new(),
            sweep_task: None,
            random_task: None,
            rng: StdRng::seed_from_u64(seed),
            now: SimTick::ZERO,
            shut_down: false,
        }
    }

    /// Active settings.
    pub fn settings(&self) -> &MeteorSettings {
        &self.settings
    }

    /// Durable lifecycle registry.
    pub fn registry(&self) -> &LifecycleRegistry {
        &self.registry
    }

    /// Current engine tick.
    pub fn now(&self) -> SimTick {
        self.now
    }

    /// Instances still falling.
    pub fn pending_impacts(&self) -> usize {
        self.pending.len()
    }

    /// Tasks waiting in the scheduler.
    pub fn scheduled_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    /// Whether a cleanup task is queued for `id`.
    pub fn has_cleanup_scheduled(&self, id: InstanceId) -> bool {
        self.cleanups
            .get(&id)
            .is_some_and(|task| self.scheduler.is_scheduled(*task))
    }

    /// Exact positions recorded so far for a live instance.
    pub fn instance_blocks(&self, id: InstanceId) -> Option<&BTreeSet<BlockPos>> {
        self.blocks.positions(id)
    }

    /// Whether `shutdown` has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // ------------------------------------------------------------- startup

    /// Restore persisted placements, schedule their cleanup and start the expiry sweep.
    ///
    /// Returns how many placements were restored.
    pub fn load_on_startup(&mut self) -> usize {
        let survivors = self.registry.load_on_startup();
        let now_ms = self.registry.now_millis();
        for record in &survivors {
            self.schedule_cleanup(record.id(), record.remaining_ms(now_ms));
        }
        if self.sweep_task.is_none() {
            let period = self.settings.settings.sweep_interval_ticks.max(1);
            self.sweep_task = Some(
                self.scheduler
                    .schedule_repeating(self.now, period, period, Task::ExpirySweep),
            );
        }
        info!(restored = survivors.len(), "Meteorite registry loaded");
        survivors.len()
    }

    /// Start the random meteor timer if enabled. Returns the timer task.
    pub fn start_random_meteors(&mut self) -> Option<TaskId> {
        let random = &self.settings.random;
        if !random.enabled {
            return None;
        }
        if self.random_task.is_some() {
            return self.random_task;
        }
        let period = random.interval_ticks();
        info!(
            world = %random.world,
            seconds = period / TICKS_PER_SECOND,
            "Random meteors enabled"
        );
        let id = self
            .scheduler
            .schedule_repeating(self.now, period, period, Task::RandomMeteor);
        self.random_task = Some(id);
        Some(id)
    }

    // --------------------------------------------------------------- spawn

    /// Spawn meteorite `type_id` above the column at `point` (its `y` is ignored).
    ///
    /// Nothing is created unless the type exists, the world is loaded and the
    /// structure has at least one block.
    pub fn create_meteorite_at(
        &mut self,
        worlds: &mut WorldSet,
        point: &WorldPoint,
        type_id: &str,
    ) -> Result<InstanceId, SpawnError> {
        let Some(definition) = self.settings.definition(type_id).cloned() else {
            warn!(meteorite = type_id, "Unknown meteorite type");
            return Err(SpawnError::UnknownType(type_id.to_string()));
        };
        let Some(world) = worlds.get_mut(&point.world) else {
            warn!(world = %point.world, meteorite = type_id, "World not loaded, meteorite not spawned");
            return Err(SpawnError::WorldNotLoaded(point.world.clone()));
        };
        if definition.outer_radius <= 0 {
            warn!(meteorite = type_id, "Meteorite has no outer radius");
            return Err(SpawnError::EmptyStructure(type_id.to_string()));
        }

        let x = point.pos.x;
        let z = point.pos.z;
        let impact = BlockPos::new(x, world.highest_block_y(x, z) + 1, z);
        let bounds = VerticalBounds {
            min_y: world.min_y(),
            max_y: world.max_y(),
        };
        let materials = world.shared_materials();
        let layout = generate(impact, &definition, &materials, bounds, &mut self.rng);
        if layout.is_empty() {
            warn!(meteorite = type_id, pos = %impact, "Meteorite structure has no blocks");
            return Err(SpawnError::EmptyStructure(type_id.to_string()));
        }

        announce(world, &definition, x, z);

        let instance = InstanceId::random(&mut self.rng);
        self.blocks.track(instance);
        let spawn_height = self.settings.settings.spawn_height;
        let lift = lift_offset(&layout, spawn_height, world.max_y());
        let entities = launch(world, instance, &layout, lift, definition.speed, &mut self.rng);

        let impact_point = WorldPoint::new(point.world.clone(), impact);
        let ticks = fall_ticks(spawn_height, impact.y, definition.speed);
        self.schedule_overlays(&point.world, &entities);
        self.scheduler
            .schedule_once(self.now, ticks, Task::Impact(instance));

        info!(
            instance = %instance.short(),
            meteorite = type_id,
            location = %impact_point,
            blocks = layout.len(),
            fall_ticks = ticks,
            "Meteorite spawned"
        );
        self.pending.insert(
            instance,
            PendingImpact {
                point: impact_point,
                type_id: type_id.to_string(),
                definition,
                materials: layout.materials,
            },
        );
        Ok(instance)
    }

    fn schedule_overlays(&mut self, world: &str, entities: &[EntityId]) {
        let effects = self.settings.active_effects();
        if let Some(trail) = effects.trail {
            let period = trail.interval_ticks.max(1);
            let task = Task::Trail {
                world: world.to_string(),
                entities: entities.into(),
            };
            self.scheduler.schedule_repeating(self.now, period, period, task);
        }
        if effects.bursts.is_some_and(|b| !b.bursts.is_empty()) {
            let period = self.settings.settings.particle_interval.max(1) * 2;
            for &entity in entities {
                let task = Task::Burst {
                    world: world.to_string(),
                    entity,
                };
                self.scheduler.schedule_repeating(self.now, period, period, task);
            }
        }
    }

    /// Spawn a random meteorite inside the configured area.
    pub fn spawn_random_meteor(&mut self, worlds: &mut WorldSet) -> Option<InstanceId> {
        let random = self.settings.random.clone();
        if !worlds.contains(&random.world) {
            warn!(world = %random.world, "Random meteor world not loaded");
            return None;
        }
        let Some(type_id) = pick_type(&self.settings.meteorites, &mut self.rng).map(str::to_string) else {
            warn!("No meteorite type is eligible for random spawns");
            return None;
        };
        let (x, z) = pick_column(&random, &mut self.rng);
        let point = WorldPoint::new(
            random.world,
            BlockPos::new(x, self.settings.settings.spawn_height, z),
        );
        self.create_meteorite_at(worlds, &point, &type_id).ok()
    }

    // ---------------------------------------------------------------- tick

    /// Record where a falling block of a live instance came to rest.
    pub fn on_block_landed(&mut self, landing: &BlockLanded) {
        if !self.blocks.record(landing.instance, landing.pos) {
            debug!(
                instance = %landing.instance.short(),
                pos = %landing.pos,
                "Landing for an untracked instance"
            );
        }
    }

    /// Advance one tick and run every task that came due.
    pub fn tick(&mut self, worlds: &mut WorldSet) {
        if self.shut_down {
            return;
        }
        self.now = self.now.advance(1);
        while let Some((task_id, task)) = self.scheduler.pop_due(self.now) {
            self.run_task(worlds, task_id, task);
        }
    }

    fn run_task(&mut self, worlds: &mut WorldSet, task_id: TaskId, task: Task) {
        match task {
            Task::Impact(id) => {
                self.handle_impact(worlds, id);
            }
            Task::Cleanup(id) => {
                self.cleanups.remove(&id);
                self.cleanup_instance(worlds, id);
            }
            Task::ExpirySweep => {
                self.run_expiry_sweep(worlds);
            }
            Task::Trail { world, entities } => {
                let live = match (worlds.get_mut(&world), self.settings.active_effects().trail) {
                    (Some(world), Some(trail)) => emit_trail(world, trail, &entities),
                    _ => false,
                };
                if !live {
                    self.scheduler.cancel(task_id);
                }
            }
            Task::Burst { world, entity } => {
                let live = match (worlds.get_mut(&world), self.settings.active_effects().bursts) {
                    (Some(world), Some(bursts)) => emit_burst(world, bursts, entity, &mut self.rng),
                    _ => false,
                };
                if !live {
                    self.scheduler.cancel(task_id);
                }
            }
            Task::RandomMeteor => {
                self.spawn_random_meteor(worlds);
            }
        }
    }

    /// Resolve a pending impact and register the placement. Runs at most once per instance.
    fn handle_impact(&mut self, worlds: &mut WorldSet, id: InstanceId) -> Option<ImpactOutcome> {
        let pending = self.pending.remove(&id)?;
        let Some(world) = worlds.get_mut(&pending.point.world) else {
            warn!(instance = %id.short(), world = %pending.point.world, "World unloaded before impact");
            self.blocks.take(id);
            return None;
        };
        let outcome = resolve_impact(
            world,
            &self.settings,
            &pending.definition,
            pending.point.pos,
            &mut self.rng,
        );
        let mut materials = pending.materials;
        if let Some(container) = outcome.container {
            self.blocks.record(id, container);
            if let Some(key) = world.materials().key(world.block(container)) {
                materials.insert(key.clone());
            }
        }
        info!(
            instance = %id.short(),
            meteorite = %pending.type_id,
            location = %pending.point,
            "Meteorite impact"
        );

        let delay_ms = pending.definition.cleanup_delay_ms();
        if delay_ms == 0 {
            debug!(instance = %id.short(), "Cleanup disabled, structure is permanent");
            self.blocks.take(id);
            return Some(outcome);
        }

        let radius = pending
            .definition
            .outer_radius
            .max(self.settings.settings.cleanup_radius);
        let request = RegisterRequest {
            id,
            point: pending.point,
            cleanup_delay_ms: delay_ms,
            materials,
            radius: Some(radius),
        };
        match self.registry.register(request) {
            Ok(record) => {
                let remaining = record.remaining_ms(self.registry.now_millis());
                self.schedule_cleanup(id, remaining);
            }
            Err(err) => {
                // A placement the registry refused must not outlive this call.
                let positions = self.blocks.take(id).unwrap_or_default();
                let cleared = clear_exact(world, &positions);
                warn!(instance = %id.short(), cleared, "{err}, meteorite removed");
            }
        }
        Some(outcome)
    }

    fn schedule_cleanup(&mut self, id: InstanceId, remaining_ms: u64) {
        let task = self
            .scheduler
            .schedule_once(self.now, millis_to_ticks(remaining_ms), Task::Cleanup(id));
        if let Some(previous) = self.cleanups.insert(id, task) {
            self.scheduler.cancel(previous);
        }
    }

    // ------------------------------------------------------------- cleanup

    /// Restore the terrain of one instance and forget it. Safe to call repeatedly.
    ///
    /// Returns how many blocks were cleared.
    pub fn cleanup_instance(&mut self, worlds: &mut WorldSet, id: InstanceId) -> usize {
        if let Some(task) = self.cleanups.remove(&id) {
            self.scheduler.cancel(task);
        }
        let record = self.registry.remove(id);
        let positions = self.blocks.take(id);
        let Some(record) = record else {
            if positions.is_some() {
                debug!(instance = %id.short(), "Dropping block set of an unregistered instance");
            }
            return 0;
        };
        let cleared = self.restore(worlds, &record, positions);
        info!(
            instance = %id.short(),
            location = %record.point(),
            cleared,
            "Meteorite cleaned up"
        );
        cleared
    }

    fn restore(
        &self,
        worlds: &mut WorldSet,
        record: &PlacementRecord,
        positions: Option<BTreeSet<BlockPos>>,
    ) -> usize {
        let Some(world) = worlds.get_mut(record.world()) else {
            warn!(instance = %record.id().short(), world = record.world(), "World not loaded, skipping cleanup");
            return 0;
        };
        match positions {
            Some(positions) if !positions.is_empty() => clear_exact(world, &positions),
            _ => {
                let radius = record
                    .radius()
                    .unwrap_or(self.settings.settings.cleanup_radius);
                sweep_whitelist(world, record.pos(), radius, record.materials())
            }
        }
    }

    /// Clean every expired placement. Placements in unloaded worlds are dropped unchanged.
    pub fn run_expiry_sweep(&mut self, worlds: &mut WorldSet) -> usize {
        let now_ms = self.registry.now_millis();
        let expired = self.registry.expired(now_ms);
        let mut handled = 0;
        for id in expired {
            let Some(record) = self.registry.get(id) else {
                continue;
            };
            if worlds.contains(record.world()) {
                self.cleanup_instance(worlds, id);
            } else {
                warn!(
                    instance = %id.short(),
                    world = record.world(),
                    "Dropping expired meteorite in unloaded world"
                );
                if let Some(task) = self.cleanups.remove(&id) {
                    self.scheduler.cancel(task);
                }
                self.registry.remove(id);
                self.blocks.take(id);
            }
            handled += 1;
        }
        if handled > 0 {
            debug!(handled, "Expiry sweep finished");
        }
        handled
    }

    // ------------------------------------------------------------ shutdown

    /// Cancel all tasks, drop in-flight state and flush the registry once.
    ///
    /// Returns whether the registry was saved; later calls do nothing.
    pub fn shutdown(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        self.shut_down = true;
        let cancelled = self.scheduler.cancel_all();
        self.pending.clear();
        self.cleanups.clear();
        self.blocks.clear();
        self.sweep_task = None;
        self.random_task = None;
        let saved = self.registry.save();
        info!(cancelled, records = self.registry.len(), saved, "Meteor engine shut down");
        saved
    }
}

/// Spawn broadcast and console commands for a new meteorite.
fn announce(world: &mut World, definition: &MeteoriteDefinition, x: i32, z: i32) {
    let pairs = [("x", x.to_string()), ("z", z.to_string())];
    if let Some(message) = definition.chat_message.as_deref().filter(|m| !m.trim().is_empty()) {
        world.broadcast(substitute(&colorize(message), &pairs));
    }
    for command in definition.spawn_commands.iter().filter(|c| !c.trim().is_empty()) {
        world.dispatch_command(substitute(command, &pairs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use skyfall_world::Materials;

    fn engine_with(settings: MeteorSettings) -> MeteorEngine {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let path = std::env::temp_dir().join(format!("skyfall_engine_unit_{nanos}.json"));
        let registry = LifecycleRegistry::new(RegistryStore::new(path), Arc::new(ManualClock::new(0)));
        MeteorEngine::with_registry(settings, registry, 7)
    }

    fn worlds() -> WorldSet {
        let mut worlds = WorldSet::new();
        worlds.insert(World::flat("W", Arc::new(Materials::builtin())));
        worlds
    }

    fn settings_with(id: &str, definition: MeteoriteDefinition) -> MeteorSettings {
        let mut settings = MeteorSettings::default();
        settings.meteorites.insert(id.to_string(), definition);
        settings
    }

    #[test]
    fn unknown_type_creates_nothing() {
        let mut engine = engine_with(MeteorSettings::default());
        let mut worlds = worlds();
        let point = WorldPoint::new("W", BlockPos::new(0, 0, 0));
        let err = engine.create_meteorite_at(&mut worlds, &point, "nope").unwrap_err();
        assert_eq!(err, SpawnError::UnknownType("nope".to_string()));
        assert_eq!(engine.scheduled_tasks(), 0);
        assert!(worlds.get("W").unwrap().events().is_empty());
    }

    #[test]
    fn missing_world_creates_nothing() {
        let definition = MeteoriteDefinition {
            chat_message: Some("incoming".to_string()),
            ..MeteoriteDefinition::default()
        };
        let mut engine = engine_with(settings_with("small", definition));
        let mut worlds = worlds();
        let point = WorldPoint::new("elsewhere", BlockPos::new(0, 0, 0));
        let err = engine.create_meteorite_at(&mut worlds, &point, "small").unwrap_err();
        assert_eq!(err, SpawnError::WorldNotLoaded("elsewhere".to_string()));
        assert_eq!(engine.pending_impacts(), 0);
    }

    #[test]
    fn zero_radius_is_empty() {
        let definition = MeteoriteDefinition {
            outer_radius: 0,
            ..MeteoriteDefinition::default()
        };
        let mut engine = engine_with(settings_with("dust", definition));
        let mut worlds = worlds();
        let point = WorldPoint::new("W", BlockPos::new(0, 0, 0));
        let err = engine.create_meteorite_at(&mut worlds, &point, "dust").unwrap_err();
        assert_eq!(err, SpawnError::EmptyStructure("dust".to_string()));
    }

    #[test]
    fn spawn_announces_with_coordinates() {
        let definition = MeteoriteDefinition {
            chat_message: Some("&eMeteor over %x%, %z%".to_string()),
            spawn_commands: vec!["say %x% %z%".to_string(), "  ".to_string()],
            ..MeteoriteDefinition::default()
        };
        let mut engine = engine_with(settings_with("small", definition));
        let mut worlds = worlds();
        let point = WorldPoint::new("W", BlockPos::new(12, 0, -4));
        engine.create_meteorite_at(&mut worlds, &point, "small").unwrap();

        let events = worlds.get("W").unwrap().events().to_vec();
        assert!(events.iter().any(|e| matches!(
            e,
            skyfall_world::WorldEvent::Broadcast { text } if text.ends_with("Meteor over 12, -4")
        )));
        let commands: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                skyfall_world::WorldEvent::ConsoleCommand { command } => Some(command.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(commands, vec!["say 12 -4"]);
        assert_eq!(engine.pending_impacts(), 1);
    }

    #[test]
    fn tick_after_shutdown_is_inert() {
        let mut engine = engine_with(settings_with("small", MeteoriteDefinition::default()));
        let mut worlds = worlds();
        let point = WorldPoint::new("W", BlockPos::new(0, 0, 0));
        engine.create_meteorite_at(&mut worlds, &point, "small").unwrap();
        engine.shutdown();
        let before = engine.now();
        engine.tick(&mut worlds);
        assert_eq!(engine.now(), before);
        assert_eq!(engine.scheduled_tasks(), 0);
        assert_eq!(engine.pending_impacts(), 0);
    }
}
