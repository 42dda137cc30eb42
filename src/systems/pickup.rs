//! Pickup system - coin magnet and collection.

use crate::components::*;
use crate::config::SimConfig;
use crate::pool::{EntityPools, PoolSlot};
use crate::store::Session;
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;

/// System that pulls nearby coins toward the living player and collects them.
///
/// Collected coins are credited to the session wallet and returned to the
/// currency pool.
pub fn pickup_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut session: ResMut<Session>,
    mut pools: ResMut<EntityPools>,
    players: Query<&Position, (With<PlayerControlled>, Without<Dead>)>,
    mut coins: Query<(Entity, &mut Position, &mut Money, &PoolSlot), Without<PlayerControlled>>,
) {
    let Some(player) = session.player.and_then(|p| players.get(p).ok()) else {
        return;
    };
    let player = *player;

    for (entity, mut pos, mut money, slot) in coins.iter_mut() {
        if money.collected {
            continue;
        }
        let dist = pos.planar_distance(&player);
        if dist <= config.pickup_radius {
            money.collected = true;
            session.wallet += money.amount as u64;
            pools.release(slot.kind, slot.handle(entity), &mut commands);
        } else if dist <= config.magnet_radius {
            let step = (config.magnet_speed * dt.0).min(dist);
            if let Some((dx, dz)) = pos.planar_direction_to(&player) {
                pos.x += dx * step;
                pos.z += dz * step;
            }
        }
    }
}
