//! In-memory worlds hosting blocks, entities and the event outbox.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use skyfall_core::{BlockPos, InstanceId};
use tracing::debug;

use crate::chunk::{split_block_pos, CHUNK_SIZE_Y};
use crate::container::{ContainerKind, ContainerState};
use crate::entity::{
    BlockLanded, EntityId, FallingBlock, Player, Vec3, FALLING_DRAG, FALLING_GRAVITY,
};
use crate::events::{Particle, Sound, WorldEvent};
use crate::materials::{MaterialId, Materials, AIR};
use crate::mob::{Mob, MobKind};
use crate::storage::ChunkStorage;
use crate::terrain::FlatTerrain;

/// Falling blocks that have not landed after this many ticks are discarded.
pub const FALLING_MAX_TICKS: u32 = 600;

/// Maximum distance a falling block moves per collision check.
const MAX_SUBSTEP: f64 = 0.5;

/// One named world.
pub struct World {
    name: String,
    materials: Arc<Materials>,
    terrain: FlatTerrain,
    chunks: ChunkStorage,
    falling: BTreeMap<EntityId, FallingBlock>,
    mobs: BTreeMap<EntityId, Mob>,
    players: BTreeMap<EntityId, Player>,
    containers: BTreeMap<BlockPos, ContainerState>,
    events: Vec<WorldEvent>,
    next_entity: u64,
}

impl World {
    pub fn new(name: impl Into<String>, materials: Arc<Materials>, terrain: FlatTerrain) -> Self {
        Self {
            name: name.into(),
            materials,
            terrain,
            chunks: ChunkStorage::new(),
            falling: BTreeMap::new(),
            mobs: BTreeMap::new(),
            players: BTreeMap::new(),
            containers: BTreeMap::new(),
            events: Vec::new(),
            next_entity: 1,
        }
    }

    /// Flat world with the default surface height.
    pub fn flat(name: impl Into<String>, materials: Arc<Materials>) -> Self {
        let terrain = FlatTerrain::new(&materials, crate::terrain::DEFAULT_SURFACE_Y);
        Self::new(name, materials, terrain)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn materials(&self) -> &Materials {
        &self.materials
    }

    /// Shared handle to the catalog, for callers that also need `&mut self`.
    pub fn shared_materials(&self) -> Arc<Materials> {
        Arc::clone(&self.materials)
    }

    /// Lowest block layer (never buildable).
    pub const fn min_y(&self) -> i32 {
        0
    }

    /// One past the highest block layer.
    pub const fn max_y(&self) -> i32 {
        CHUNK_SIZE_Y as i32
    }

    /// Whether structures may place blocks at height `y`.
    pub fn is_buildable(&self, y: i32) -> bool {
        y > self.min_y() && y < self.max_y()
    }

    fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    // ---------------------------------------------------------------- blocks

    /// Material at `pos`; air outside the vertical range.
    pub fn block(&self, pos: BlockPos) -> MaterialId {
        let Some((chunk_pos, local)) = split_block_pos(pos) else {
            return AIR;
        };
        match self.chunks.get(chunk_pos) {
            Some(chunk) => chunk.block(local),
            None => self.terrain.block_at(pos),
        }
    }

    /// Replace the material at `pos`, returning the previous one.
    ///
    /// Returns `None` when `pos` lies outside the vertical range.
    pub fn set_block(&mut self, pos: BlockPos, id: MaterialId) -> Option<MaterialId> {
        let (chunk_pos, local) = split_block_pos(pos)?;
        let terrain = self.terrain;
        let chunk = self
            .chunks
            .ensure_chunk_with(chunk_pos, |p| terrain.generate_chunk(p));
        let previous = chunk.set_block(local, id);
        if previous != id {
            self.containers.remove(&pos);
        }
        Some(previous)
    }

    /// Y of the highest solid block in a column, or `min_y` when the column is empty.
    pub fn highest_block_y(&self, x: i32, z: i32) -> i32 {
        (self.min_y()..self.max_y())
            .rev()
            .find(|&y| self.materials.is_solid(self.block(BlockPos::new(x, y, z))))
            .unwrap_or(self.min_y())
    }

    /// Count blocks of a material inside the cube `[-r, r]³` around `center`.
    pub fn count_in_cube(&self, center: BlockPos, r: i32, id: MaterialId) -> usize {
        let mut count = 0;
        for dx in -r..=r {
            for dy in -r..=r {
                for dz in -r..=r {
                    if self.block(center.offset(dx, dy, dz)) == id {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    // ------------------------------------------------------------ containers

    /// Place a container block and give it an empty inventory.
    pub fn place_container(&mut self, pos: BlockPos, kind: ContainerKind) -> bool {
        let Some(id) = self.materials.lookup_block(kind.block_name()) else {
            return false;
        };
        if self.set_block(pos, id).is_none() {
            return false;
        }
        self.containers.insert(pos, ContainerState::new(kind));
        true
    }

    pub fn container(&self, pos: BlockPos) -> Option<&ContainerState> {
        self.containers.get(&pos)
    }

    pub fn container_mut(&mut self, pos: BlockPos) -> Option<&mut ContainerState> {
        self.containers.get_mut(&pos)
    }

    // --------------------------------------------------------- falling blocks

    pub fn spawn_falling_block(
        &mut self,
        instance: InstanceId,
        material: MaterialId,
        position: Vec3,
        velocity: Vec3,
    ) -> EntityId {
        let id = self.next_id();
        self.falling.insert(
            id,
            FallingBlock {
                id,
                instance,
                material,
                position,
                velocity,
                ticks_lived: 0,
            },
        );
        id
    }

    pub fn falling_block(&self, id: EntityId) -> Option<&FallingBlock> {
        self.falling.get(&id)
    }

    pub fn falling_blocks(&self) -> impl Iterator<Item = &FallingBlock> {
        self.falling.values()
    }

    /// Whether the entity still exists (falling, or a living mob).
    pub fn is_entity_live(&self, id: EntityId) -> bool {
        self.falling.contains_key(&id) || self.mobs.get(&id).is_some_and(|mob| !mob.is_dead())
    }

    /// Position of a falling block or mob.
    pub fn entity_position(&self, id: EntityId) -> Option<Vec3> {
        self.falling
            .get(&id)
            .map(|block| block.position)
            .or_else(|| self.mobs.get(&id).map(|mob| mob.position))
    }

    /// Advance entity physics by one tick, returning blocks that came to rest.
    pub fn step_entities(&mut self) -> Vec<BlockLanded> {
        let mut landed = Vec::new();
        let ids: Vec<EntityId> = self.falling.keys().copied().collect();
        for id in ids {
            let Some(mut block) = self.falling.remove(&id) else {
                continue;
            };
            match self.advance_falling(&mut block) {
                FallOutcome::Airborne => {
                    self.falling.insert(id, block);
                }
                FallOutcome::Landed(pos) => landed.push(BlockLanded {
                    world: self.name.clone(),
                    instance: block.instance,
                    entity: id,
                    pos,
                    material: block.material,
                }),
                FallOutcome::Discarded => {
                    debug!(world = %self.name, entity = %id, "falling block discarded");
                }
            }
        }
        self.tick_effects();
        landed
    }

    fn advance_falling(&mut self, block: &mut FallingBlock) -> FallOutcome {
        block.ticks_lived += 1;
        if block.ticks_lived > FALLING_MAX_TICKS {
            return FallOutcome::Discarded;
        }
        block.velocity.y -= FALLING_GRAVITY;

        let travel = block.velocity.length();
        let steps = ((travel / MAX_SUBSTEP).ceil() as u32).max(1);
        let delta = block.velocity * (1.0 / steps as f64);
        for _ in 0..steps {
            let next = block.position + delta;
            if next.y < self.min_y() as f64 {
                return FallOutcome::Discarded;
            }
            let cell = next.block();
            if self.materials.is_solid(self.block(cell)) {
                let rest = BlockPos::new(cell.x, cell.y + 1, cell.z);
                return self.settle(block, rest);
            }
            block.position = next;
        }
        block.velocity = block.velocity * FALLING_DRAG;
        FallOutcome::Airborne
    }

    fn settle(&mut self, block: &FallingBlock, rest: BlockPos) -> FallOutcome {
        if !self.is_buildable(rest.y) || self.materials.is_solid(self.block(rest)) {
            return FallOutcome::Discarded;
        }
        match self.set_block(rest, block.material) {
            Some(_) => FallOutcome::Landed(rest),
            None => FallOutcome::Discarded,
        }
    }

    // ------------------------------------------------------------ explosions

    /// Detonate at `center`, returning how many blocks were destroyed.
    ///
    /// Bedrock survives. Damage falls off linearly to zero at twice the radius.
    pub fn explode(
        &mut self,
        center: BlockPos,
        power: f32,
        sets_fire: bool,
        breaks_blocks: bool,
        rng: &mut impl Rng,
    ) -> usize {
        let radius = f64::from(power.max(0.0));
        let mut broken = Vec::new();
        if breaks_blocks && radius > 0.0 {
            let bedrock = self.materials.lookup_block("bedrock");
            let r = radius.ceil() as i32;
            for dx in -r..=r {
                for dy in -r..=r {
                    for dz in -r..=r {
                        let dist = f64::from(dx * dx + dy * dy + dz * dz).sqrt();
                        if dist > radius {
                            continue;
                        }
                        let pos = center.offset(dx, dy, dz);
                        let current = self.block(pos);
                        if current == AIR || Some(current) == bedrock {
                            continue;
                        }
                        if self.set_block(pos, AIR).is_some() {
                            broken.push(pos);
                        }
                    }
                }
            }
        }
        if sets_fire {
            self.ignite_around(center, radius, rng);
        }

        let origin = Vec3::from_block_center(center);
        let reach = radius * 2.0;
        if reach > 0.0 {
            for mob in self.mobs.values_mut() {
                let dist = mob.position.distance(origin);
                if dist < reach {
                    mob.damage(((1.0 - dist / reach) * radius * 4.0) as f32);
                }
            }
            for player in self.players.values_mut() {
                let dist = player.position.distance(origin);
                if dist < reach {
                    player.damage(((1.0 - dist / reach) * radius * 4.0) as f32);
                }
            }
        }

        self.events.push(WorldEvent::Explosion {
            pos: center,
            power,
            blocks_broken: broken.len(),
        });
        broken.len()
    }

    fn ignite_around(&mut self, center: BlockPos, radius: f64, rng: &mut impl Rng) {
        let Some(fire) = self.materials.lookup_block("fire") else {
            return;
        };
        let r = radius.ceil() as i32;
        for dx in -r..=r {
            for dz in -r..=r {
                for dy in -r..=r {
                    let pos = center.offset(dx, dy, dz);
                    if self.block(pos) != AIR || !self.is_buildable(pos.y) {
                        continue;
                    }
                    let below = self.block(pos.offset(0, -1, 0));
                    if self.materials.is_solid(below) && rng.gen_range(0..3) == 0 {
                        self.set_block(pos, fire);
                    }
                }
            }
        }
    }

    pub fn strike_lightning_effect(&mut self, pos: BlockPos) {
        self.events.push(WorldEvent::Lightning { pos });
    }

    // ------------------------------------------------------------------ mobs

    pub fn spawn_mob(&mut self, kind: MobKind, position: Vec3) -> EntityId {
        let id = self.next_id();
        self.mobs.insert(id, Mob::new(id, kind, position));
        id
    }

    pub fn mob(&self, id: EntityId) -> Option<&Mob> {
        self.mobs.get(&id)
    }

    pub fn mob_mut(&mut self, id: EntityId) -> Option<&mut Mob> {
        self.mobs.get_mut(&id)
    }

    pub fn mobs(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.values()
    }

    pub fn mobs_mut(&mut self) -> impl Iterator<Item = &mut Mob> {
        self.mobs.values_mut()
    }

    // --------------------------------------------------------------- players

    pub fn add_player(&mut self, name: impl Into<String>, position: Vec3) -> EntityId {
        let id = self.next_id();
        self.players.insert(
            id,
            Player {
                id,
                name: name.into(),
                position,
                velocity: Vec3::ZERO,
                health: Player::MAX_HEALTH,
                effects: Vec::new(),
            },
        );
        id
    }

    pub fn player(&self, id: EntityId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Players strictly closer than `radius` to `center`.
    pub fn players_near(&self, center: Vec3, radius: f64) -> Vec<EntityId> {
        self.players
            .values()
            .filter(|player| player.position.distance(center) < radius)
            .map(|player| player.id)
            .collect()
    }

    fn tick_effects(&mut self) {
        let effects = self
            .mobs
            .values_mut()
            .map(|mob| &mut mob.effects)
            .chain(self.players.values_mut().map(|player| &mut player.effects));
        for list in effects {
            for effect in list.iter_mut() {
                effect.duration_ticks = effect.duration_ticks.saturating_sub(1);
            }
            list.retain(|effect| effect.duration_ticks > 0);
        }
    }

    // ---------------------------------------------------------------- outbox

    pub fn broadcast(&mut self, text: impl Into<String>) {
        self.events.push(WorldEvent::Broadcast { text: text.into() });
    }

    pub fn dispatch_command(&mut self, command: impl Into<String>) {
        self.events.push(WorldEvent::ConsoleCommand {
            command: command.into(),
        });
    }

    pub fn send_message(&mut self, player: EntityId, text: impl Into<String>) {
        self.events.push(WorldEvent::PlayerMessage {
            player,
            text: text.into(),
        });
    }

    pub fn play_sound(
        &mut self,
        pos: Vec3,
        sound: Sound,
        volume: f32,
        pitch: f32,
        player: Option<EntityId>,
    ) {
        self.events.push(WorldEvent::Sound {
            pos,
            sound,
            volume,
            pitch,
            player,
        });
    }

    pub fn spawn_particles(
        &mut self,
        pos: Vec3,
        particle: Particle,
        count: u32,
        spread: f64,
        speed: f64,
    ) {
        self.events.push(WorldEvent::Particles {
            pos,
            particle,
            count,
            spread,
            speed,
        });
    }

    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }
}

enum FallOutcome {
    Airborne,
    Landed(BlockPos),
    Discarded,
}

/// Worlds resolvable by name.
#[derive(Default)]
pub struct WorldSet {
    worlds: BTreeMap<String, World>,
}

impl WorldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a world, replacing any world with the same name.
    pub fn insert(&mut self, world: World) {
        self.worlds.insert(world.name.clone(), world);
    }

    pub fn get(&self, name: &str) -> Option<&World> {
        self.worlds.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut World> {
        self.worlds.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.worlds.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.worlds.keys().map(String::as_str)
    }

    /// Step every world once.
    pub fn step(&mut self) -> Vec<BlockLanded> {
        self.worlds
            .values_mut()
            .flat_map(|world| world.step_entities())
            .collect()
    }

    /// Drain every world's outbox, tagged with the world name.
    pub fn drain_events(&mut self) -> Vec<(String, WorldEvent)> {
        let mut drained = Vec::new();
        for (name, world) in &mut self.worlds {
            drained.extend(world.drain_events().into_iter().map(|e| (name.clone(), e)));
        }
        drained
    }
}
