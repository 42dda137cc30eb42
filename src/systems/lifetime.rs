//! Lifetime system - expiry of corpses, effects and damage numbers, and the
//! spawn-in window of new enemies.

use crate::components::*;
use crate::pool::{EntityPools, PoolSlot};
use crate::store::EntityIndex;
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;

/// System that counts down lifetimes and spawn timers.
///
/// Expired pooled entities go back to their free list; everything else is
/// despawned and dropped from the id index.
pub fn lifetime_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    mut pools: ResMut<EntityPools>,
    mut index: ResMut<EntityIndex>,
    mut lifetimes: Query<(Entity, &mut Lifetime, Option<&PoolSlot>, Option<&SimId>)>,
    mut spawning: Query<(Entity, &mut SpawnTimer)>,
) {
    let delta = dt.0;

    for (entity, mut lifetime, slot, id) in lifetimes.iter_mut() {
        lifetime.remaining -= delta;
        if lifetime.remaining > 0.0 {
            continue;
        }
        match slot {
            Some(slot) => {
                pools.release(slot.kind, slot.handle(entity), &mut commands);
            }
            None => {
                if let Some(id) = id {
                    index.remove(*id);
                }
                commands.entity(entity).despawn();
            }
        }
    }

    for (entity, mut timer) in spawning.iter_mut() {
        timer.remaining -= delta;
        if !timer.is_active() {
            commands.entity(entity).remove::<SpawnTimer>();
        }
    }
}
