//! Combat system - attack cooldowns, bursts, melee hits and projectile launch.
//!
//! ## Two phases
//!
//! 1. **Gather** - every ready attacker picks a target and advances its
//!    IDLE / BURST_ACTIVE state machine. Melee hits are collected, ranged
//!    attacks spawn projectiles and every resolved attack spawns an effect.
//! 2. **Apply** - collected melee hits are applied in order: damage, knockback
//!    (the player is immune), damage numbers and lethal hits queued for the
//!    death pass.
//!
//! Targets are chosen by preferring the held target while it stays within
//! `range * sticky_range_mult`, then the AI target, then a fresh nearest-hostile
//! lookup. Fresh targets must be inside `range`, measured surface to surface.
//! Followers skip the fresh lookup and only keep a held target the AI still
//! holds, so the leash and owner radius rules decide what they fight.

use crate::components::*;
use crate::config::SimConfig;
use crate::physics::normalize_planar;
use crate::pool::{EntityPools, PoolKind};
use crate::spatial::{SpatialEntry, SpatialHash};
use crate::store::SimClock;
use crate::styles::{StyleLogic, StyleRegistry};
use crate::systems::death::{DeathEvent, PendingDeaths};
use crate::targeting::{find_nearest_hostile, is_hostile, ScanRadius, Seeker};
use bevy_ecs::prelude::*;
use std::collections::HashMap;
use tracing::error;

/// Melee hit collected during the gather phase.
#[derive(Debug, Clone, Copy)]
struct MeleeHit {
    target: Entity,
    from_x: f32,
    from_z: f32,
    damage: f32,
    knockback: f32,
}

/// Spawn a floating damage readout from the damage-number pool.
pub fn spawn_damage_number(
    commands: &mut Commands,
    pools: &mut EntityPools,
    config: &SimConfig,
    at: &Position,
    amount: f32,
) {
    let pooled = pools.acquire(PoolKind::DamageNumber, commands);
    commands.entity(pooled.entity).insert((
        DamageNumber { amount },
        Faction::Effect,
        Position::new(at.x, at.y + 1.0, at.z),
        Velocity::new(0.0, 1.5, 0.0),
        Lifetime { remaining: config.damage_number_lifetime },
    ));
}

/// Apply one hit to a victim. Returns the death event when the hit was lethal.
///
/// Knockback pushes away from `from`; the player faction ignores it. Enemy
/// victims emit a damage number.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_hit(
    commands: &mut Commands,
    pools: &mut EntityPools,
    config: &SimConfig,
    now: f32,
    victim: (Entity, &Position, Faction, &mut Health, &mut Velocity),
    push_dir: (f32, f32),
    damage: f32,
    knockback: f32,
) -> Option<DeathEvent> {
    let (entity, pos, faction, health, vel) = victim;
    let outcome = health.apply_damage(damage, now);
    if faction != Faction::Player && knockback > 0.0 {
        vel.add_planar(push_dir.0 * knockback, push_dir.1 * knockback);
    }
    if faction == Faction::Enemy && outcome.dealt > 0.0 {
        spawn_damage_number(commands, pools, config, pos, outcome.dealt);
    }
    outcome.killed.then_some(DeathEvent {
        entity,
        dir_x: push_dir.0,
        dir_z: push_dir.1,
    })
}

/// System that advances attack state machines and resolves attacks.
#[allow(clippy::too_many_arguments)]
pub fn combat_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    grid: Res<SpatialHash>,
    styles: Res<StyleRegistry>,
    mut pools: ResMut<EntityPools>,
    mut deaths: ResMut<PendingDeaths>,
    mut scratch: Local<Vec<SpatialEntry>>,
    mut attackers: Query<
        (
            Entity,
            &Position,
            &Faction,
            &Stats,
            &Attack,
            &mut AttackState,
            Option<&Ai>,
            Option<&SpawnTimer>,
            Has<Follower>,
        ),
        Without<Dead>,
    >,
    mut victims: Query<(&Position, &Faction, &mut Health, &mut Velocity, Option<&Stats>), Without<Dead>>,
) {
    let now = clock.time;
    let mut hits = Vec::new();

    // Gather
    for (entity, pos, faction, stats, attack, mut state, ai, spawn, is_follower) in attackers.iter_mut() {
        if spawn.is_some_and(|s| s.is_active()) {
            continue;
        }

        let reach = |target: Entity, limit: f32| -> Option<Position> {
            let (target_pos, target_faction, health, _, target_stats) = victims.get(target).ok()?;
            if target == entity || !health.is_alive() || !is_hostile(*faction, *target_faction) {
                return None;
            }
            let gap = pos.planar_distance(target_pos) - stats.radius - target_stats.map_or(0.0, |s| s.radius);
            (gap <= limit).then_some(*target_pos)
        };

        // Followers only fight what their AI engaged under the leash rules
        let ai_target = ai.and_then(|ai| ai.target);
        let held = state
            .current_target
            .filter(|t| !is_follower || ai_target == Some(*t))
            .and_then(|t| reach(t, attack.range * config.sticky_range_mult).map(|p| (t, p)));
        let chosen = held
            .or_else(|| ai_target.and_then(|t| reach(t, attack.range).map(|p| (t, p))))
            .or_else(|| {
                if is_follower {
                    return None;
                }
                let seeker = Seeker { entity, faction: *faction, x: pos.x, z: pos.z };
                let scan = ScanRadius {
                    radius: config.target_scan_radius,
                    fallback: config.target_scan_radius,
                };
                let alive = |e: Entity| victims.get(e).is_ok_and(|(_, _, health, _, _)| health.is_alive());
                find_nearest_hostile(&grid, seeker, scan, &mut scratch, alive)
                    .and_then(|c| reach(c.entity, attack.range).map(|p| (c.entity, p)))
            });

        let Some((target, target_pos)) = chosen else {
            state.abort_burst(now);
            state.current_target = None;
            continue;
        };
        state.current_target = Some(target);

        if !state.ready(attack, now) {
            continue;
        }

        let Some(style) = styles.get(attack.style) else {
            error!(style = attack.style.0, "attack references an unregistered combat style");
            continue;
        };
        let (dir_x, dir_z) = pos.planar_direction_to(&target_pos).unwrap_or((0.0, 1.0));

        match style.logic {
            StyleLogic::Melee => hits.push(MeleeHit {
                target,
                from_x: pos.x,
                from_z: pos.z,
                damage: attack.power,
                knockback: attack.knockback,
            }),
            StyleLogic::Ranged => {
                let Some(spec) = style.projectile.as_ref() else {
                    error!(style = %style.name, "ranged style has no projectile parameters");
                    continue;
                };
                commands.spawn(ProjectileBundle {
                    projectile: Projectile {
                        damage: attack.power,
                        speed: spec.speed,
                        pierce_remaining: spec.pierce,
                        owner: entity,
                        owner_faction: *faction,
                        target: spec.tracking.then_some(target),
                        hit_entities: HashMap::new(),
                        hit_interval: spec.hit_interval,
                        life_time: spec.life_time,
                        style: attack.style,
                        tracking_strength: spec.tracking_strength,
                        knockback: attack.knockback,
                        age_ticks: 0,
                        sweep_from: None,
                    },
                    faction: Faction::Bullet,
                    position: *pos,
                    velocity: Velocity::new(dir_x * spec.speed, 0.0, dir_z * spec.speed),
                });
            }
        }

        let angle = dir_x.atan2(dir_z);
        state.facing = angle;
        state.record_shot(attack, now);
        commands.spawn(EffectBundle::new(EffectDescriptor {
            style: attack.style,
            duration: style.effect_duration,
            origin: *pos,
            target: Some(target),
            angle,
        }));
    }

    // Apply
    for hit in hits {
        let Ok((target_pos, target_faction, mut health, mut vel, _)) = victims.get_mut(hit.target) else {
            continue;
        };
        if !health.is_alive() {
            continue;
        }
        let push_dir = normalize_planar(target_pos.x - hit.from_x, target_pos.z - hit.from_z).unwrap_or((0.0, 1.0));
        let victim = (hit.target, target_pos, *target_faction, &mut *health, &mut *vel);
        if let Some(death) = apply_hit(
            &mut commands,
            &mut pools,
            &config,
            now,
            victim,
            push_dir,
            hit.damage,
            hit.knockback,
        ) {
            deaths.0.push(death);
        }
    }
}
