//! Public API for the simulation.
//!
//! This module provides the main interface for a presentation layer (or any
//! other client) to interact with the simulation.
//!
//! ## Stepping
//!
//! The simulation is stepped exactly once per rendered frame. `step(dt)` runs a
//! single tick with the frame delta, clamped to `max_delta` so a long hitch
//! does not turn into one huge integration step. Projectile hits are swept
//! along the flown path and do not depend on the clamp.

use crate::components::*;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::pool::{EntityPools, PoolKind, PoolStatus};
use crate::spatial::{spatial_hash_update_system, SpatialHash};
use crate::store::{EntityIndex, IdAllocator, Session, SimClock, SimRng};
use crate::styles::StyleRegistry;
use crate::systems::*;
use crate::units::{Role, SpawnRequest, UnitRegistry};
use crate::world::Snapshot;
use bevy_ecs::prelude::*;
use rand::Rng;
use tracing::warn;

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Initializing the simulation with content
/// - Spawning units and queueing waves
/// - Feeding player input
/// - Stepping the simulation forward
/// - Extracting state snapshots
pub struct SimWorld {
    world: World,
    schedule: Schedule,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    /// Create a simulation with the default configuration and built-in content.
    pub fn new() -> Self {
        Self::build(SimConfig::default(), StyleRegistry::builtin(), UnitRegistry::builtin())
    }

    /// Create a simulation with custom configuration and built-in content.
    pub fn with_config(config: SimConfig) -> Result<Self> {
        Self::with_content(config, StyleRegistry::builtin(), UnitRegistry::builtin())
    }

    /// Create a simulation with custom configuration and content.
    ///
    /// Fails if the configuration is out of range or a unit references a
    /// combat style the registry does not know.
    pub fn with_content(config: SimConfig, styles: StyleRegistry, units: UnitRegistry) -> Result<Self> {
        config.validate()?;
        units.validate(&styles)?;
        Ok(Self::build(config, styles, units))
    }

    fn build(config: SimConfig, styles: StyleRegistry, units: UnitRegistry) -> Self {
        let mut world = World::new();

        // Core resources
        world.insert_resource(DeltaTime(0.0));
        world.insert_resource(SimClock::default());
        world.insert_resource(SpatialHash::new(config.cell_size));
        world.insert_resource(SimRng::seeded(config.seed));
        world.insert_resource(EntityPools::new(config.damage_number_pool, config.currency_pool));
        world.insert_resource(config);

        // Content
        world.insert_resource(styles);
        world.insert_resource(units);

        // Bookkeeping
        world.insert_resource(IdAllocator::default());
        world.insert_resource(EntityIndex::default());
        world.insert_resource(Session::default());
        world.insert_resource(WaveDirector::default());
        world.insert_resource(PendingDeaths::default());
        world.insert_resource(CurrencyDrops::default());

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                wave_spawn_system,
                spatial_hash_update_system,
                ai_system,
                combat_system,
                projectile_system,
                death_system,
                currency_drop_system,
                collision_system,
                movement_system,
                pickup_system,
                lifetime_system,
            )
                .chain(),
        );

        Self { world, schedule }
    }

    /// Step the simulation forward by one tick of `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        let max_delta = self.world.resource::<SimConfig>().max_delta;
        let delta = if dt > max_delta {
            warn!(dt, max_delta, "frame delta clamped");
            max_delta
        } else {
            dt.max(0.0)
        };

        self.world.resource_mut::<DeltaTime>().0 = delta;
        self.world.resource_mut::<SimClock>().advance(delta);
        self.schedule.run(&mut self.world);
    }

    /// Place a unit in the arena.
    ///
    /// Players become the input-controlled entity, enemies chase, and allies
    /// follow the current player at a small random offset.
    pub fn spawn(&mut self, request: SpawnRequest) -> Result<SimId> {
        let role = match request.faction {
            Faction::Player => Role::Player,
            Faction::Enemy => Role::Enemy,
            Faction::Ally => {
                let owner = self.world.resource::<Session>().player.ok_or(SimError::NoPlayer)?;
                let jitter = self.world.resource::<SimConfig>().ally_follow_jitter.abs();
                let mut rng = self.world.resource_mut::<SimRng>();
                Role::Ally(Follower {
                    owner,
                    offset_x: rng.0.gen_range(-jitter..=jitter),
                    offset_z: rng.0.gen_range(-jitter..=jitter),
                })
            }
            Faction::Bullet | Faction::Effect | Faction::Spectator => Role::Neutral,
        };

        let id = self.world.resource_mut::<IdAllocator>().allocate();
        let spawn = {
            let units = self.world.resource::<UnitRegistry>();
            let styles = self.world.resource::<StyleRegistry>();
            units.prepare(styles, &request, id)?
        };
        let entity = spawn.spawn_into(&mut self.world, role);
        self.world.resource_mut::<EntityIndex>().insert(id, entity);

        if request.faction == Faction::Player {
            let mut session = self.world.resource_mut::<Session>();
            session.player = Some(entity);
            session.player_alive = true;
        }
        Ok(id)
    }

    pub fn spawn_player(&mut self, unit: &str, x: f32, z: f32) -> Result<SimId> {
        self.spawn(SpawnRequest::new(unit, Faction::Player, x, z))
    }

    pub fn spawn_enemy(&mut self, unit: &str, x: f32, z: f32) -> Result<SimId> {
        self.spawn(SpawnRequest::new(unit, Faction::Enemy, x, z))
    }

    pub fn spawn_ally(&mut self, unit: &str, x: f32, z: f32) -> Result<SimId> {
        self.spawn(SpawnRequest::new(unit, Faction::Ally, x, z))
    }

    /// Set the camera-resolved movement direction of the player.
    ///
    /// Ignored once the player is dead.
    pub fn set_player_intent(&mut self, x: f32, z: f32) -> Result<()> {
        let player = self.world.resource::<Session>().player.ok_or(SimError::NoPlayer)?;
        if self.world.get::<Dead>(player).is_some() {
            return Ok(());
        }
        let mut intent = self.world.get_mut::<MoveIntent>(player).ok_or(SimError::NoPlayer)?;
        *intent = MoveIntent::from_vector(x, z);
        Ok(())
    }

    /// Switch an AI-driven unit between chasing and holding its ground.
    ///
    /// Holding units stop moving but still attack whatever comes into range.
    pub fn set_behavior(&mut self, id: SimId, behavior: Behavior) -> Result<()> {
        let entity = self.entity(id).ok_or(SimError::UnknownEntity(id.0))?;
        let mut ai = self.world.get_mut::<Ai>(entity).ok_or(SimError::UnknownEntity(id.0))?;
        ai.behavior = behavior;
        Ok(())
    }

    /// Queue a wave; it starts once every earlier wave has been cleared.
    pub fn queue_wave(&mut self, wave: WaveConfig) -> Result<()> {
        self.world.resource_scope(|world, mut director: Mut<WaveDirector>| {
            director.queue(wave, world.resource::<UnitRegistry>())
        })
    }

    /// Drop a coin worth `amount` at (x, z) on the next tick.
    pub fn drop_currency(&mut self, x: f32, z: f32, amount: u32) {
        self.world
            .resource_mut::<CurrencyDrops>()
            .0
            .push(CurrencyDrop { x, z, amount });
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> Result<String> {
        Ok(self.snapshot().to_json()?)
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.world.resource::<SimClock>().tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.world.resource::<SimClock>().time
    }

    /// Entity currently holding `id`, if it is still in the store.
    pub fn entity(&self, id: SimId) -> Option<Entity> {
        self.world.resource::<EntityIndex>().get(id)
    }

    pub fn health(&self, id: SimId) -> Option<Health> {
        self.entity(id).and_then(|e| self.world.get::<Health>(e)).copied()
    }

    pub fn position(&self, id: SimId) -> Option<Position> {
        self.entity(id).and_then(|e| self.world.get::<Position>(e)).copied()
    }

    /// Whether `id` is in the store, has health left and is not a corpse.
    pub fn is_alive(&self, id: SimId) -> bool {
        self.entity(id).is_some_and(|e| {
            self.world.get::<Dead>(e).is_none() && self.world.get::<Health>(e).is_some_and(|h| h.is_alive())
        })
    }

    /// External id of the player.
    pub fn player(&self) -> Option<SimId> {
        let player = self.world.resource::<Session>().player?;
        self.world.get::<SimId>(player).copied()
    }

    pub fn session(&self) -> &Session {
        self.world.resource::<Session>()
    }

    pub fn wallet(&self) -> u64 {
        self.session().wallet
    }

    pub fn wave_status(&self) -> WaveStatus {
        self.world.resource::<WaveDirector>().status()
    }

    pub fn pool_status(&self, kind: PoolKind) -> PoolStatus {
        self.world.resource::<EntityPools>().status(kind)
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    /// Get a reference to the spatial hash (for debugging/visualization).
    pub fn spatial_hash(&self) -> &SpatialHash {
        self.world.resource::<SpatialHash>()
    }

    /// Get a reference to the underlying ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get a mutable reference to the underlying ECS world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
