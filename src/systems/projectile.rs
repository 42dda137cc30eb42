//! Projectile system - lifetime, soft homing, integration and hits.
//!
//! Collision checks run on even projectile ages only, so a projectile is tested
//! every other tick. Each check sweeps the path flown since the previous one,
//! so a fast projectile cannot step over a body between checks. Coins carry the projectile component purely for
//! integration; they skip homing and hit checks and fall under gravity.

use crate::components::*;
use crate::config::SimConfig;
use crate::physics::{damp_planar, damping_factor, integrate_vertical, normalize_planar, segment_closest};
use crate::pool::{EntityPools, PoolSlot};
use crate::spatial::{SpatialEntry, SpatialHash};
use crate::store::SimClock;
use crate::systems::combat::apply_hit;
use crate::systems::death::PendingDeaths;
use crate::systems::movement::DeltaTime;
use crate::targeting::hostile_mask;
use bevy_ecs::prelude::*;

/// Blend the current heading toward the target and rescale to `speed`.
fn steer(vel: &mut Velocity, toward: (f32, f32), blend: f32, speed: f32) {
    let current = normalize_planar(vel.x, vel.z).unwrap_or(toward);
    let x = current.0 + (toward.0 - current.0) * blend;
    let z = current.1 + (toward.1 - current.1) * blend;
    let (x, z) = normalize_planar(x, z).unwrap_or(toward);
    vel.x = x * speed;
    vel.z = z * speed;
}

/// System that advances every projectile and coin.
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn projectile_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    grid: Res<SpatialHash>,
    mut pools: ResMut<EntityPools>,
    mut deaths: ResMut<PendingDeaths>,
    mut scratch: Local<Vec<SpatialEntry>>,
    mut swept: Local<Vec<(Entity, f32)>>,
    mut projectiles: Query<(
        Entity,
        &mut Projectile,
        &mut Position,
        &mut Velocity,
        Option<&mut Physics>,
        Option<&PoolSlot>,
        Has<Money>,
    )>,
    mut victims: Query<
        (&Position, &Faction, &mut Health, &mut Velocity),
        (Without<Projectile>, Without<Dead>),
    >,
) {
    let delta = dt.0;
    let now = clock.time;

    for (entity, mut projectile, mut pos, mut vel, physics, slot, is_coin) in projectiles.iter_mut() {
        projectile.life_time -= delta;
        if projectile.life_time <= 0.0 {
            match slot {
                Some(slot) => {
                    pools.release(slot.kind, slot.handle(entity), &mut commands);
                }
                None => commands.entity(entity).despawn(),
            }
            continue;
        }

        if is_coin {
            let damping = physics.as_ref().map_or(config.default_damping, |p| p.damping);
            let factor = damping_factor(damping, delta, config.damping_reference_rate);
            let (vx, vz) = damp_planar(vel.x, vel.z, factor, config.velocity_epsilon);
            vel.x = vx;
            vel.z = vz;
            pos.x += vel.x * delta;
            pos.z += vel.z * delta;
            let step = integrate_vertical(pos.y, vel.y, config.gravity, delta);
            pos.y = step.y;
            vel.y = step.vy;
            if let Some(mut physics) = physics {
                physics.is_grounded = step.grounded;
            }
            continue;
        }

        // Soft homing; a dead or removed target releases the lock
        if let Some(target) = projectile.target {
            match victims.get(target) {
                Ok((target_pos, _, health, _)) if health.is_alive() => {
                    if let Some(toward) = pos.planar_direction_to(target_pos) {
                        let blend = (config.homing_blend * projectile.tracking_strength).clamp(0.0, 1.0);
                        steer(&mut vel, toward, blend, projectile.speed);
                    }
                }
                _ => projectile.target = None,
            }
        }

        let start = (pos.x, pos.z);
        pos.x += vel.x * delta;
        pos.z += vel.z * delta;

        let check = projectile.age_ticks % 2 == 0;
        projectile.age_ticks = projectile.age_ticks.wrapping_add(1);
        if !check {
            continue;
        }

        // Sweep everything travelled since the previous check
        let from = projectile.sweep_from.unwrap_or(start);
        let to = (pos.x, pos.z);
        projectile.sweep_from = Some(to);

        let half_len = 0.5 * ((to.0 - from.0).powi(2) + (to.1 - from.1).powi(2)).sqrt();
        let reach_bound = config
            .projectile_query_radius
            .max(grid.max_radius() + config.projectile_hit_radius);
        scratch.clear();
        grid.query_into(
            0.5 * (from.0 + to.0),
            0.5 * (from.1 + to.1),
            half_len + reach_bound,
            hostile_mask(projectile.owner_faction),
            &mut scratch,
        );

        swept.clear();
        swept.extend(scratch.iter().filter_map(|c| {
            let (t, dist_sq) = segment_closest(from, to, (c.x, c.z));
            let reach = c.radius + config.projectile_hit_radius;
            (dist_sq <= reach * reach).then_some((c.entity, t))
        }));
        // Flight order, so a piercing shot strikes the nearest body first
        swept.sort_by(|a, b| a.1.total_cmp(&b.1));

        let push_dir = normalize_planar(vel.x, vel.z).unwrap_or((0.0, 1.0));
        for &(candidate, _) in swept.iter() {
            if candidate == projectile.owner || !projectile.can_hit(candidate, now) {
                continue;
            }
            let Ok((victim_pos, faction, mut health, mut victim_vel)) = victims.get_mut(candidate) else {
                continue;
            };
            if !health.is_alive() || *faction == projectile.owner_faction {
                continue;
            }

            let victim = (candidate, victim_pos, *faction, &mut *health, &mut *victim_vel);
            if let Some(death) = apply_hit(
                &mut commands,
                &mut pools,
                &config,
                now,
                victim,
                push_dir,
                projectile.damage,
                projectile.knockback,
            ) {
                deaths.0.push(death);
            }
            if !projectile.register_hit(candidate, now) {
                commands.entity(entity).despawn();
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::spatial_hash_update_system;
    use crate::styles::StyleId;
    use std::collections::HashMap;

    const DT: f32 = 0.05;

    fn world() -> (World, Schedule) {
        let mut world = World::new();
        let config = SimConfig::default();
        world.insert_resource(SpatialHash::new(config.cell_size));
        world.insert_resource(config);
        world.insert_resource(DeltaTime(DT));
        world.insert_resource(SimClock::default());
        world.insert_resource(EntityPools::default());
        world.insert_resource(PendingDeaths::default());
        let mut schedule = Schedule::default();
        schedule.add_systems((spatial_hash_update_system, projectile_system).chain());
        (world, schedule)
    }

    fn tick(world: &mut World, schedule: &mut Schedule) {
        let dt = world.resource::<DeltaTime>().0;
        world.resource_mut::<SimClock>().advance(dt);
        schedule.run(world);
    }

    fn enemy(world: &mut World, x: f32, z: f32) -> Entity {
        world
            .spawn((
                Faction::Enemy,
                Position::planar(x, z),
                Velocity::default(),
                Health::new(30.0),
                Stats::new(3.0, 0.5),
            ))
            .id()
    }

    fn shot(owner: Entity, pierce: u32, target: Option<Entity>) -> Projectile {
        Projectile {
            damage: 5.0,
            speed: 10.0,
            pierce_remaining: pierce,
            owner,
            owner_faction: Faction::Player,
            target,
            hit_entities: HashMap::new(),
            hit_interval: 0.5,
            life_time: 2.0,
            style: StyleId(0),
            tracking_strength: 1.0,
            knockback: 0.0,
            age_ticks: 0,
            sweep_from: None,
        }
    }

    fn launch(world: &mut World, projectile: Projectile, vx: f32, vz: f32) -> Entity {
        world
            .spawn(ProjectileBundle {
                projectile,
                faction: Faction::Bullet,
                position: Position::planar(0.0, 0.0),
                velocity: Velocity::new(vx, 0.0, vz),
            })
            .id()
    }

    #[test]
    fn test_pierce_two_hits_three_then_removed() {
        let (mut world, mut schedule) = world();
        let owner = world.spawn((Faction::Player, Position::planar(-100.0, 0.0))).id();
        let targets = [enemy(&mut world, 1.0, 0.0), enemy(&mut world, 3.0, 0.0), enemy(&mut world, 5.0, 0.0)];
        let bolt = launch(&mut world, shot(owner, 2, None), 10.0, 0.0);

        let mut pierce_seen = vec![2];
        for _ in 0..9 {
            tick(&mut world, &mut schedule);
            if let Some(projectile) = world.get::<Projectile>(bolt) {
                pierce_seen.push(projectile.pierce_remaining);
            }
        }

        assert!(world.get::<Projectile>(bolt).is_none());
        assert!(pierce_seen.windows(2).all(|w| w[1] <= w[0]));
        for target in targets {
            assert_eq!(world.get::<Health>(target).unwrap().current, 25.0);
        }
        // One readout per enemy hit
        assert_eq!(world.query::<&DamageNumber>().iter(&world).count(), 3);
    }

    #[test]
    fn test_no_friendly_fire_or_owner_hits() {
        let (mut world, mut schedule) = world();
        let owner = world
            .spawn((Faction::Player, Position::planar(0.5, 0.0), Health::new(10.0), Stats::new(3.0, 0.5)))
            .id();
        let ally = world
            .spawn((Faction::Ally, Position::planar(0.5, 0.0), Health::new(10.0), Stats::new(3.0, 0.5)))
            .id();
        launch(&mut world, shot(owner, 0, None), 10.0, 0.0);

        tick(&mut world, &mut schedule);

        assert_eq!(world.get::<Health>(owner).unwrap().current, 10.0);
        assert_eq!(world.get::<Health>(ally).unwrap().current, 10.0);
    }

    #[test]
    fn test_expires_after_life_time() {
        let (mut world, mut schedule) = world();
        let owner = world.spawn(Faction::Player).id();
        let mut projectile = shot(owner, 0, None);
        projectile.life_time = 0.12;
        let bolt = launch(&mut world, projectile, 1.0, 0.0);

        tick(&mut world, &mut schedule);
        tick(&mut world, &mut schedule);
        assert!(world.get::<Projectile>(bolt).is_some());
        tick(&mut world, &mut schedule);
        assert!(world.get::<Projectile>(bolt).is_none());
    }

    #[test]
    fn test_homing_curves_toward_target() {
        let (mut world, mut schedule) = world();
        let owner = world.spawn(Faction::Player).id();
        let target = enemy(&mut world, 0.0, 30.0);
        let bolt = launch(&mut world, shot(owner, 0, Some(target)), 10.0, 0.0);

        tick(&mut world, &mut schedule);
        let vel = *world.get::<Velocity>(bolt).unwrap();
        // Turned partway, not snapped onto the target line
        assert!(vel.z > 0.0);
        assert!(vel.x > vel.z);
        assert!((vel.planar_speed() - 10.0).abs() < 1e-3);

        // Dead target releases the lock
        world.get_mut::<Health>(target).unwrap().current = 0.0;
        tick(&mut world, &mut schedule);
        assert_eq!(world.get::<Projectile>(bolt).unwrap().target, None);
    }

    #[test]
    fn test_knockback_spares_player() {
        let (mut world, mut schedule) = world();
        let owner = world.spawn((Faction::Enemy, Position::planar(-100.0, 0.0))).id();
        let player = world
            .spawn((
                Faction::Player,
                Position::planar(0.5, 0.0),
                Velocity::default(),
                Health::new(50.0),
                Stats::new(3.0, 0.5),
            ))
            .id();
        let mut projectile = shot(owner, 0, None);
        projectile.owner_faction = Faction::Enemy;
        projectile.knockback = 5.0;
        launch(&mut world, projectile, 10.0, 0.0);

        tick(&mut world, &mut schedule);

        assert_eq!(world.get::<Health>(player).unwrap().current, 45.0);
        assert_eq!(*world.get::<Velocity>(player).unwrap(), Velocity::default());
        // The player is not enemy-coded: no readout
        assert_eq!(world.query::<&DamageNumber>().iter(&world).count(), 0);
    }

    fn straight_bolt_hits_small_target(dt: f32) {
        let (mut world, mut schedule) = world();
        world.insert_resource(DeltaTime(dt));
        let owner = world.spawn((Faction::Player, Position::planar(-100.0, 0.0))).id();
        let target = world
            .spawn((
                Faction::Enemy,
                Position::planar(7.4, 0.0),
                Velocity::default(),
                Health::new(30.0),
                Stats::new(3.0, 0.45),
            ))
            .id();
        let mut projectile = shot(owner, 0, None);
        projectile.speed = 22.0;
        let bolt = launch(&mut world, projectile, 22.0, 0.0);

        for _ in 0..45 {
            tick(&mut world, &mut schedule);
        }

        assert_eq!(world.get::<Health>(target).unwrap().current, 25.0);
        assert!(world.get::<Projectile>(bolt).is_none());
    }

    #[test]
    fn test_fast_bolt_hits_at_30_fps() {
        straight_bolt_hits_small_target(1.0 / 30.0);
    }

    #[test]
    fn test_fast_bolt_hits_at_max_delta() {
        straight_bolt_hits_small_target(SimConfig::default().max_delta);
    }

    #[test]
    fn test_collision_checks_every_other_tick() {
        let (mut world, mut schedule) = world();
        let owner = world.spawn((Faction::Player, Position::planar(-100.0, 0.0))).id();
        let target = enemy(&mut world, 0.0, 0.0);
        let mut projectile = shot(owner, 0, None);
        projectile.age_ticks = 1;
        let bolt = launch(&mut world, projectile, 0.0, 0.0);

        // Odd age: no check even though the bolt sits inside the target
        tick(&mut world, &mut schedule);
        assert_eq!(world.get::<Health>(target).unwrap().current, 30.0);
        assert!(world.get::<Projectile>(bolt).is_some());

        tick(&mut world, &mut schedule);
        assert_eq!(world.get::<Health>(target).unwrap().current, 25.0);
        assert!(world.get::<Projectile>(bolt).is_none());
    }
}
