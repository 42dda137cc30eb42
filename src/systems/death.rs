//! Death pass and currency drops.
//!
//! Combat and projectiles only record lethal hits. This pass turns each one
//! into a corpse: control components are stripped, motion stops, a death
//! window [`Lifetime`] starts and the victim's bounty is queued as a coin drop.

use crate::components::*;
use crate::config::SimConfig;
use crate::pool::{EntityPools, PoolKind};
use crate::store::{Session, SimClock, SimRng};
use crate::styles::StyleId;
use bevy_ecs::prelude::*;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;
use tracing::{debug, info};

/// A lethal hit awaiting the death pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathEvent {
    pub entity: Entity,
    /// Normalized direction away from the killer.
    pub dir_x: f32,
    pub dir_z: f32,
}

/// Lethal hits recorded this tick.
#[derive(Resource, Debug, Default)]
pub struct PendingDeaths(pub Vec<DeathEvent>);

/// A request to drop currency on the floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrencyDrop {
    pub x: f32,
    pub z: f32,
    pub amount: u32,
}

/// Currency drops waiting to be spawned.
#[derive(Resource, Debug, Default)]
pub struct CurrencyDrops(pub Vec<CurrencyDrop>);

/// System that turns lethal hits into corpses.
#[allow(clippy::type_complexity)]
pub fn death_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    mut pending: ResMut<PendingDeaths>,
    mut drops: ResMut<CurrencyDrops>,
    mut session: ResMut<Session>,
    mut query: Query<
        (&Position, &Faction, &mut Velocity, Option<&mut MoveIntent>, Option<&Bounty>, Has<PlayerControlled>),
        Without<Dead>,
    >,
) {
    let mut seen = HashSet::new();
    for event in pending.0.drain(..) {
        if !seen.insert(event.entity) {
            continue;
        }
        let Ok((pos, faction, mut vel, intent, bounty, is_player)) = query.get_mut(event.entity) else {
            continue;
        };

        vel.clear();
        if let Some(mut intent) = intent {
            intent.clear();
        }
        commands
            .entity(event.entity)
            .remove::<(Ai, Attack, AttackState, PlayerControlled)>()
            .insert((
                Dead {
                    time: clock.time,
                    dir_x: event.dir_x,
                    dir_z: event.dir_z,
                },
                Lifetime { remaining: config.death_anim_duration },
            ));

        if let Some(bounty) = bounty.filter(|b| b.0 > 0) {
            drops.0.push(CurrencyDrop { x: pos.x, z: pos.z, amount: bounty.0 });
        }
        if *faction == Faction::Enemy {
            session.kills += 1;
        }
        if is_player {
            session.player_alive = false;
            info!(time = clock.time, "player died");
        }
    }
}

/// System that serves currency drop requests from the coin pool.
///
/// Coins reuse the projectile component for integration: zero speed, no
/// damage and an effectively endless pierce. They pop upward and outward and
/// settle under gravity.
pub fn currency_drop_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    mut drops: ResMut<CurrencyDrops>,
    mut pools: ResMut<EntityPools>,
    mut rng: ResMut<SimRng>,
) {
    for drop in drops.0.drain(..) {
        let pooled = pools.acquire(PoolKind::Currency, &mut commands);
        let angle = rng.0.gen_range(0.0..TAU);
        let spread = rng.0.gen_range(1.0..3.0);
        commands.entity(pooled.entity).insert((
            Money { amount: drop.amount, collected: false },
            Projectile {
                damage: 0.0,
                speed: 0.0,
                pierce_remaining: u32::MAX,
                owner: pooled.entity,
                owner_faction: Faction::Spectator,
                target: None,
                hit_entities: HashMap::new(),
                hit_interval: 0.0,
                life_time: config.coin_lifetime,
                style: StyleId(0),
                tracking_strength: 0.0,
                knockback: 0.0,
                age_ticks: 0,
                sweep_from: None,
            },
            Physics { damping: 0.92, is_grounded: false, mass: 1.0 },
            Faction::Spectator,
            Position::new(drop.x, 0.5, drop.z),
            Velocity::new(angle.cos() * spread, 6.0, angle.sin() * spread),
        ));
        debug!(amount = drop.amount, x = drop.x, z = drop.z, "currency dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(SimClock { tick: 10, time: 2.0 });
        world.insert_resource(PendingDeaths::default());
        world.insert_resource(CurrencyDrops::default());
        world.insert_resource(Session { player_alive: true, ..Session::default() });
        world.insert_resource(EntityPools::default());
        world.insert_resource(SimRng::seeded(7));
        let mut schedule = Schedule::default();
        schedule.add_systems((death_system, currency_drop_system).chain());
        (world, schedule)
    }

    #[test]
    fn test_enemy_death_strips_and_drops() {
        let (mut world, mut schedule) = world();
        let enemy = world
            .spawn((
                Faction::Enemy,
                Position::planar(3.0, 4.0),
                Velocity::new(5.0, 0.0, 1.0),
                MoveIntent::from_vector(1.0, 0.0),
                Ai::chase(),
                Bounty(4),
            ))
            .id();
        world
            .resource_mut::<PendingDeaths>()
            .0
            .push(DeathEvent { entity: enemy, dir_x: 1.0, dir_z: 0.0 });

        schedule.run(&mut world);

        assert!(world.get::<Ai>(enemy).is_none());
        assert_eq!(*world.get::<Velocity>(enemy).unwrap(), Velocity::default());
        assert!(world.get::<MoveIntent>(enemy).unwrap().is_idle());
        let dead = world.get::<Dead>(enemy).unwrap();
        assert_eq!(dead.time, 2.0);
        assert_eq!(dead.dir_x, 1.0);
        assert_eq!(world.get::<Lifetime>(enemy).unwrap().remaining, SimConfig::default().death_anim_duration);
        assert_eq!(world.resource::<Session>().kills, 1);

        let mut coins = world.query::<(&Money, &Position)>();
        let (money, pos) = coins.single(&world);
        assert_eq!(*money, Money { amount: 4, collected: false });
        assert_eq!((pos.x, pos.z), (3.0, 4.0));
    }

    #[test]
    fn test_player_death_ends_session() {
        let (mut world, mut schedule) = world();
        let player = world
            .spawn((Faction::Player, PlayerControlled, Position::default(), Velocity::default()))
            .id();
        // Duplicate events collapse into one death
        for _ in 0..2 {
            world
                .resource_mut::<PendingDeaths>()
                .0
                .push(DeathEvent { entity: player, dir_x: 0.0, dir_z: 1.0 });
        }

        schedule.run(&mut world);

        assert!(world.get::<PlayerControlled>(player).is_none());
        assert!(!world.resource::<Session>().player_alive);
        assert_eq!(world.resource::<Session>().kills, 0);
        assert!(world.resource::<PendingDeaths>().0.is_empty());
        assert_eq!(world.query::<&Money>().iter(&world).count(), 0);
    }
}
