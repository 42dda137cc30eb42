//! AI system - time-sliced target selection and per-frame movement intent.
//!
//! Target (re)acquisition is expensive (a spatial query per entity), so each
//! entity rescans once per `ai_tick_rate` window at an offset given by its
//! [`Phase`]. Steering is cheap and runs every frame against whatever target
//! is currently held.
//!
//! Allies follow their owner. They drop their target when they stray past the
//! leash distance and only engage hostiles that are close to the owner.

use crate::components::*;
use crate::config::SimConfig;
use crate::spatial::{SpatialEntry, SpatialHash};
use crate::store::SimClock;
use crate::systems::movement::DeltaTime;
use crate::targeting::{find_nearest_hostile, hostile_mask, ScanRadius, Seeker};
use bevy_ecs::prelude::*;

/// Whether an entity's rescan window boundary falls inside this frame.
fn rescan_due(phase: &Phase, now: f32, delta: f32, rate: f32) -> bool {
    if rate <= 0.0 {
        return true;
    }
    let offset = phase.fraction() * rate;
    let slot = |t: f32| ((t + offset) / rate).floor() as i64;
    slot(now) != slot(now - delta)
}

/// Nearest living hostile to `seeker` among those within `radius` of `anchor`.
fn nearest_hostile_near_anchor(
    grid: &SpatialHash,
    seeker: Seeker,
    anchor: &Position,
    radius: f32,
    scratch: &mut Vec<SpatialEntry>,
    is_alive: impl Fn(Entity) -> bool,
) -> Option<Entity> {
    scratch.clear();
    grid.query_into(anchor.x, anchor.z, radius, hostile_mask(seeker.faction), scratch);
    scratch
        .iter()
        .filter(|c| c.entity != seeker.entity)
        .filter(|c| c.distance_sq(anchor.x, anchor.z) <= radius * radius)
        .filter(|c| is_alive(c.entity))
        .min_by(|a, b| {
            a.distance_sq(seeker.x, seeker.z)
                .total_cmp(&b.distance_sq(seeker.x, seeker.z))
        })
        .map(|c| c.entity)
}

/// System that selects targets on each entity's cadence and steers every frame.
pub fn ai_system(
    clock: Res<SimClock>,
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    grid: Res<SpatialHash>,
    mut scratch: Local<Vec<SpatialEntry>>,
    mut agents: Query<
        (
            Entity,
            &mut Ai,
            &mut MoveIntent,
            &Position,
            &Faction,
            &Stats,
            &Phase,
            Option<&Attack>,
            Option<&Follower>,
            Option<&SpawnTimer>,
        ),
        Without<Dead>,
    >,
    bodies: Query<(&Position, &Health, Option<&Stats>), Without<Dead>>,
) {
    let now = clock.time;
    let scan = ScanRadius {
        radius: config.target_scan_radius,
        fallback: config.target_fallback_radius,
    };
    let is_alive = |e: Entity| bodies.get(e).is_ok_and(|(_, health, _)| health.is_alive());

    for (entity, mut ai, mut intent, pos, faction, stats, phase, attack, follower, spawn) in agents.iter_mut() {
        if ai.behavior != Behavior::Chase || spawn.is_some_and(|s| s.is_active()) {
            intent.clear();
            continue;
        }

        let held_lost = ai.target.is_some_and(|t| !is_alive(t));
        if held_lost {
            ai.target = None;
        }

        if held_lost || rescan_due(phase, now, dt.0, config.ai_tick_rate) {
            let seeker = Seeker { entity, faction: *faction, x: pos.x, z: pos.z };
            match follower {
                Some(follower) => {
                    let owner = bodies.get(follower.owner).ok().map(|(p, _, _)| *p);
                    ai.target = match owner {
                        Some(owner) if pos.planar_distance(&owner) <= config.ally_leash_distance => {
                            nearest_hostile_near_anchor(
                                &grid,
                                seeker,
                                &owner,
                                config.ally_combat_radius,
                                &mut scratch,
                                is_alive,
                            )
                        }
                        _ => None,
                    };
                }
                None => {
                    let candidate = find_nearest_hostile(&grid, seeker, scan, &mut scratch, is_alive);
                    ai.target = match (ai.target, candidate) {
                        (Some(held), Some(candidate)) if candidate.entity != held => {
                            let held_dist = bodies
                                .get(held)
                                .map(|(p, _, _)| pos.planar_distance(p))
                                .unwrap_or(f32::INFINITY);
                            let candidate_dist = candidate.distance_sq(pos.x, pos.z).sqrt();
                            if candidate_dist + config.sticky_hysteresis < held_dist {
                                Some(candidate.entity)
                            } else {
                                Some(held)
                            }
                        }
                        (Some(held), _) => Some(held),
                        (None, candidate) => candidate.map(|c| c.entity),
                    };
                }
            }
        }

        // Steering
        let target = ai.target.and_then(|t| bodies.get(t).ok());
        *intent = match (target, follower) {
            (Some((target_pos, _, target_stats)), _) => {
                let gap = pos.planar_distance(target_pos) - stats.radius - target_stats.map_or(0.0, |s| s.radius);
                let stop = attack.map_or(0.0, |a| a.range) * config.stop_range_fraction;
                if gap <= stop {
                    MoveIntent::default()
                } else {
                    MoveIntent::from_vector(target_pos.x - pos.x, target_pos.z - pos.z)
                }
            }
            (None, Some(follower)) => match bodies.get(follower.owner) {
                Ok((owner, _, _)) => {
                    let goal = Position::planar(owner.x + follower.offset_x, owner.z + follower.offset_z);
                    if pos.planar_distance(&goal) <= config.ally_idle_radius {
                        MoveIntent::default()
                    } else {
                        MoveIntent::from_vector(goal.x - pos.x, goal.z - pos.z)
                    }
                }
                Err(_) => MoveIntent::default(),
            },
            (None, None) => MoveIntent::default(),
        };
    }
}
