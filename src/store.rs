//! Entity store bookkeeping: identity allocation, id index, clock and session.

use crate::components::SimId;
use bevy_ecs::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

/// Hands out monotonically increasing unit ids.
#[derive(Resource, Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn allocate(&mut self) -> SimId {
        self.next += 1;
        SimId(self.next)
    }
}

/// O(1) lookup from external id to the entity holding it.
///
/// Maintained on spawn and removal; independent of query iteration order.
#[derive(Resource, Debug, Default)]
pub struct EntityIndex {
    entities: HashMap<SimId, Entity>,
}

impl EntityIndex {
    pub fn insert(&mut self, id: SimId, entity: Entity) {
        self.entities.insert(id, entity);
    }

    pub fn remove(&mut self, id: SimId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn get(&self, id: SimId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Simulation clock. Advanced once per tick before the systems run.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimClock {
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
}

impl SimClock {
    pub fn advance(&mut self, dt: f32) {
        self.tick = self.tick.wrapping_add(1);
        self.time += dt;
    }
}

/// Per-session state shared with the presentation layer.
#[derive(Resource, Debug, Clone, Default)]
pub struct Session {
    pub player: Option<Entity>,
    pub player_alive: bool,
    /// Currency collected this session.
    pub wallet: u64,
    pub kills: u32,
}

/// Seeded random source for spawn placement and follow jitter.
#[derive(Resource, Debug)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_indexed() {
        let mut ids = IdAllocator::default();
        let mut index = EntityIndex::default();
        let a = ids.allocate();
        let b = ids.allocate();
        assert_ne!(a, b);

        index.insert(a, Entity::from_raw(10));
        index.insert(b, Entity::from_raw(11));
        assert_eq!(index.get(b), Some(Entity::from_raw(11)));
        assert_eq!(index.remove(a), Some(Entity::from_raw(10)));
        assert_eq!(index.get(a), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_clock_advances() {
        let mut clock = SimClock::default();
        clock.advance(0.5);
        clock.advance(0.25);
        assert_eq!(clock.tick, 2);
        assert!((clock.time - 0.75).abs() < 1e-6);
    }
}
