//! Collision system - soft separation and momentum transfer between combatants.
//!
//! Each entity queries its neighbors only when its [`Phase`] comes up in the
//! `collision_stagger` cadence, and a pair is resolved only by the member with
//! the lower [`SimId`], so every pair is handled once per cycle. Hardness is
//! multiplied by the stagger interval to make up for the lower frequency.
//!
//! Impulses are gathered first and applied after every pair has been
//! evaluated, so the result does not depend on which pair is visited first.

use crate::components::*;
use crate::config::SimConfig;
use crate::physics::{resolve_pair, Body, CollisionTuning};
use crate::spatial::{SpatialEntry, SpatialHash};
use crate::store::SimClock;
use bevy_ecs::prelude::*;
use std::collections::HashMap;

fn body(pos: &Position, vel: &Velocity, stats: &Stats, physics: Option<&Physics>) -> Body {
    Body {
        x: pos.x,
        z: pos.z,
        vx: vel.x,
        vz: vel.z,
        radius: stats.radius,
        inverse_mass: physics.map_or(1.0, |p| p.inverse_mass()),
    }
}

/// System that pushes overlapping combatants apart.
#[allow(clippy::type_complexity)]
pub fn collision_system(
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    grid: Res<SpatialHash>,
    mut scratch: Local<Vec<SpatialEntry>>,
    mut query: Query<
        (Entity, &SimId, &Phase, &Faction, &Position, &mut Velocity, &Stats, Option<&Physics>),
        Without<Dead>,
    >,
) {
    let tuning = CollisionTuning {
        hardness: config.effective_hardness(),
        billiard_threshold: config.billiard_threshold,
        billiard_transfer: config.billiard_transfer,
    };
    let mut impulses: HashMap<Entity, (f32, f32)> = HashMap::new();

    for (entity, id, phase, faction, pos, vel, stats, physics) in query.iter() {
        if !faction.is_combatant() || !phase.is_due(clock.tick, config.collision_stagger) {
            continue;
        }
        let a = body(pos, vel, stats, physics);

        scratch.clear();
        grid.query_into(
            pos.x,
            pos.z,
            stats.radius + grid.max_radius(),
            FactionMask::COMBATANTS,
            &mut scratch,
        );
        for candidate in scratch.iter() {
            if candidate.entity == entity {
                continue;
            }
            let Ok((_, other_id, _, _, other_pos, other_vel, other_stats, other_physics)) =
                query.get(candidate.entity)
            else {
                continue;
            };
            if other_id <= id {
                continue;
            }
            let b = body(other_pos, other_vel, other_stats, other_physics);
            if let Some(impulse) = resolve_pair(&a, &b, &tuning) {
                let ea = impulses.entry(entity).or_default();
                ea.0 += impulse.a.0;
                ea.1 += impulse.a.1;
                let eb = impulses.entry(candidate.entity).or_default();
                eb.0 += impulse.b.0;
                eb.1 += impulse.b.1;
            }
        }
    }

    for (entity, (dx, dz)) in impulses {
        if let Ok((_, _, _, _, _, mut vel, _, _)) = query.get_mut(entity) {
            vel.add_planar(dx, dz);
        }
    }
}
