//! Recycling for transient entities (damage numbers, coins).
//!
//! Released entities are stripped down to their [`PoolSlot`] and parked on a
//! free list instead of being despawned. Each reuse bumps the slot generation,
//! so a [`PooledEntity`] handle from a previous life is detected as stale.
//! Acquirers must insert a complete bundle; parked entities carry no gameplay
//! components, so nothing from a previous life can leak through.

use bevy_ecs::prelude::*;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Kinds of pooled entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    DamageNumber,
    Currency,
}

/// Generation-based handle to a pooled entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PooledEntity {
    pub entity: Entity,
    pub generation: u32,
}

/// Marker kept on pooled entities across lives.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSlot {
    pub kind: PoolKind,
    pub generation: u32,
}

impl PoolSlot {
    pub fn handle(&self, entity: Entity) -> PooledEntity {
        PooledEntity { entity, generation: self.generation }
    }
}

#[derive(Debug, Default, Clone)]
pub struct PoolStats {
    pub total_acquired: u64,
    pub total_reused: u64,
    pub total_returned: u64,
    pub failed_returns: u64,
    pub overflow_despawns: u64,
    pub max_active: usize,
}

#[derive(Debug)]
pub struct PoolStatus {
    pub available: usize,
    pub active: usize,
    pub capacity: usize,
}

/// Free list for one kind.
#[derive(Debug)]
struct FreeList {
    available: Vec<PooledEntity>,
    /// Active entities and their current generation.
    active: HashMap<Entity, u32>,
    /// Maximum parked entities kept for reuse.
    capacity: usize,
    stats: PoolStats,
}

impl FreeList {
    fn new(capacity: usize) -> Self {
        Self {
            available: Vec::with_capacity(capacity),
            active: HashMap::new(),
            capacity,
            stats: PoolStats::default(),
        }
    }
}

/// Per-kind free lists.
#[derive(Resource, Debug)]
pub struct EntityPools {
    damage_numbers: FreeList,
    currency: FreeList,
}

impl Default for EntityPools {
    fn default() -> Self {
        Self::new(128, 128)
    }
}

impl EntityPools {
    pub fn new(damage_number_capacity: usize, currency_capacity: usize) -> Self {
        Self {
            damage_numbers: FreeList::new(damage_number_capacity),
            currency: FreeList::new(currency_capacity),
        }
    }

    fn list(&self, kind: PoolKind) -> &FreeList {
        match kind {
            PoolKind::DamageNumber => &self.damage_numbers,
            PoolKind::Currency => &self.currency,
        }
    }

    fn list_mut(&mut self, kind: PoolKind) -> &mut FreeList {
        match kind {
            PoolKind::DamageNumber => &mut self.damage_numbers,
            PoolKind::Currency => &mut self.currency,
        }
    }

    /// Take an entity for `kind`, reusing a parked one when available.
    ///
    /// The returned entity carries only a fresh [`PoolSlot`]; the caller
    /// inserts the full bundle for its new life.
    pub fn acquire(&mut self, kind: PoolKind, commands: &mut Commands) -> PooledEntity {
        let list = self.list_mut(kind);
        let pooled = match list.available.pop() {
            Some(parked) => {
                list.stats.total_reused += 1;
                PooledEntity { entity: parked.entity, generation: parked.generation.wrapping_add(1) }
            }
            None => {
                let entity = commands.spawn_empty().id();
                debug!(?kind, "pool grew");
                PooledEntity { entity, generation: 0 }
            }
        };
        commands
            .entity(pooled.entity)
            .insert(PoolSlot { kind, generation: pooled.generation });

        list.active.insert(pooled.entity, pooled.generation);
        list.stats.total_acquired += 1;
        list.stats.max_active = list.stats.max_active.max(list.active.len());
        pooled
    }

    /// Return an entity to its free list. Stale or double releases are refused.
    pub fn release(&mut self, kind: PoolKind, pooled: PooledEntity, commands: &mut Commands) -> bool {
        let list = self.list_mut(kind);
        match list.active.get(&pooled.entity) {
            Some(&generation) if generation == pooled.generation => {}
            _ => {
                list.stats.failed_returns += 1;
                return false;
            }
        }
        list.active.remove(&pooled.entity);
        list.stats.total_returned += 1;

        if list.available.len() >= list.capacity {
            list.stats.overflow_despawns += 1;
            warn!(?kind, capacity = list.capacity, "pool free list full, despawning");
            commands.entity(pooled.entity).despawn();
        } else {
            commands.entity(pooled.entity).retain::<PoolSlot>();
            list.available.push(pooled);
        }
        true
    }

    pub fn stats(&self, kind: PoolKind) -> &PoolStats {
        &self.list(kind).stats
    }

    pub fn status(&self, kind: PoolKind) -> PoolStatus {
        let list = self.list(kind);
        PoolStatus {
            available: list.available.len(),
            active: list.active.len(),
            capacity: list.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Money;

    #[derive(Resource, Default)]
    struct Handles(Vec<PooledEntity>);

    fn acquire_coin(mut commands: Commands, mut pools: ResMut<EntityPools>, mut handles: ResMut<Handles>) {
        let pooled = pools.acquire(PoolKind::Currency, &mut commands);
        commands.entity(pooled.entity).insert(Money { amount: 5, collected: false });
        handles.0.push(pooled);
    }

    fn acquire_two(mut commands: Commands, mut pools: ResMut<EntityPools>, mut handles: ResMut<Handles>) {
        for _ in 0..2 {
            let pooled = pools.acquire(PoolKind::Currency, &mut commands);
            handles.0.push(pooled);
        }
    }

    fn release_all(mut commands: Commands, mut pools: ResMut<EntityPools>, mut handles: ResMut<Handles>) {
        for pooled in handles.0.drain(..) {
            pools.release(PoolKind::Currency, pooled, &mut commands);
        }
    }

    fn world() -> World {
        let mut world = World::new();
        world.insert_resource(EntityPools::new(4, 1));
        world.insert_resource(Handles::default());
        world
    }

    #[test]
    fn test_reuse_bumps_generation() {
        let mut world = world();
        let mut acquire = Schedule::default();
        acquire.add_systems(acquire_coin);
        let mut release = Schedule::default();
        release.add_systems(release_all);

        acquire.run(&mut world);
        let first = world.resource::<Handles>().0[0];
        release.run(&mut world);

        // Parked: only the slot remains
        assert!(world.get::<Money>(first.entity).is_none());
        assert!(world.get::<PoolSlot>(first.entity).is_some());

        acquire.run(&mut world);
        let second = world.resource::<Handles>().0[0];
        assert_eq!(second.entity, first.entity);
        assert_eq!(second.generation, first.generation + 1);

        let pools = world.resource::<EntityPools>();
        assert_eq!(pools.status(PoolKind::Currency).active, 1);
        assert_eq!(pools.status(PoolKind::Currency).available, 0);
        assert_eq!(pools.stats(PoolKind::Currency).total_reused, 1);
    }

    #[test]
    fn test_stale_release_refused() {
        let mut world = world();
        let mut acquire = Schedule::default();
        acquire.add_systems(acquire_coin);
        acquire.run(&mut world);
        let pooled = world.resource::<Handles>().0[0];

        let stale = PooledEntity { entity: pooled.entity, generation: pooled.generation + 7 };
        let mut queue = bevy_ecs::world::CommandQueue::default();
        let mut commands = Commands::new(&mut queue, &world);
        let mut pools = EntityPools::new(4, 1);
        assert!(!pools.release(PoolKind::Currency, stale, &mut commands));
        assert_eq!(pools.stats(PoolKind::Currency).failed_returns, 1);
    }

    #[test]
    fn test_overflow_despawns() {
        let mut world = world();
        let mut acquire = Schedule::default();
        acquire.add_systems(acquire_two);
        let mut release = Schedule::default();
        release.add_systems(release_all);

        acquire.run(&mut world);
        let handles = world.resource::<Handles>().0.clone();
        release.run(&mut world);

        // Capacity 1: one parked, one despawned
        let pools = world.resource::<EntityPools>();
        assert_eq!(pools.status(PoolKind::Currency).available, 1);
        assert_eq!(pools.stats(PoolKind::Currency).overflow_despawns, 1);
        assert!(!world.entities().contains(handles[1].entity));
    }
}
