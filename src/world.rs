//! Snapshot types.
//!
//! The `Snapshot` struct is a serializable, read-only view of the simulation
//! for the presentation layer: what to draw, where, and which effects to play.

use crate::components::*;
use crate::store::{Session, SimClock};
use crate::styles::StyleRegistry;
use crate::systems::waves::{WaveDirector, WaveStatus};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a single unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: u64,
    pub kind: String,
    pub faction: Faction,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vz: f32,
    pub health: f32,
    pub health_max: f32,
    /// Time of the last damage taken, for hit flashes.
    pub last_hit_time: Option<f32>,
    /// Angle of the last resolved attack.
    pub facing: f32,
    pub target: Option<u64>,
    pub player: bool,
    pub spawning: bool,
    pub dead: bool,
    /// Direction away from the killer, for the death animation.
    pub death_dir: Option<(f32, f32)>,
}

/// Snapshot of an in-flight projectile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub style: String,
    pub owner: Option<u64>,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vz: f32,
}

/// Snapshot of a transient visual effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectSnapshot {
    pub style: String,
    pub vfx: String,
    pub duration: f32,
    pub remaining: f32,
    pub origin_x: f32,
    pub origin_z: f32,
    pub angle: f32,
    pub target: Option<u64>,
}

/// Snapshot of a floating damage number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageNumberSnapshot {
    pub amount: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Snapshot of a coin on the floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinSnapshot {
    pub amount: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    /// Units sorted by id.
    pub units: Vec<UnitSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub effects: Vec<EffectSnapshot>,
    pub damage_numbers: Vec<DamageNumberSnapshot>,
    pub coins: Vec<CoinSnapshot>,
    pub wave: WaveStatus,
    pub wallet: u64,
    pub kills: u32,
    pub player_alive: bool,
}

fn sim_id(world: &World, entity: Option<Entity>) -> Option<u64> {
    entity.and_then(|e| world.get::<SimId>(e)).map(|id| id.0)
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World) -> Self {
        if world.contains_resource::<StyleRegistry>() {
            world.resource_scope(|world, styles: Mut<StyleRegistry>| Self::collect(world, &styles))
        } else {
            Self::collect(world, &StyleRegistry::default())
        }
    }

    fn collect(world: &mut World, styles: &StyleRegistry) -> Self {
        let clock = world.get_resource::<SimClock>().copied().unwrap_or_default();
        let session = world.get_resource::<Session>().cloned().unwrap_or_default();
        let wave = world
            .get_resource::<WaveDirector>()
            .map(|d| d.status())
            .unwrap_or_default();

        let mut units = Vec::new();
        let mut query = world.query::<(
            &SimId,
            &UnitKind,
            &Faction,
            &Position,
            &Velocity,
            &Health,
            Option<&AttackState>,
            Option<&Ai>,
            Option<&Dead>,
            Option<&SpawnTimer>,
            Has<PlayerControlled>,
        )>();
        for (id, kind, faction, pos, vel, health, attack, ai, dead, spawn, player) in query.iter(world) {
            let target = attack.and_then(|a| a.current_target).or(ai.and_then(|ai| ai.target));
            units.push(UnitSnapshot {
                id: id.0,
                kind: kind.0.clone(),
                faction: *faction,
                x: pos.x,
                y: pos.y,
                z: pos.z,
                vx: vel.x,
                vz: vel.z,
                health: health.current,
                health_max: health.max,
                last_hit_time: health.last_hit_time,
                facing: attack.map_or(0.0, |a| a.facing),
                target: sim_id(world, target),
                player,
                spawning: spawn.is_some_and(|s| s.is_active()),
                dead: dead.is_some(),
                death_dir: dead.map(|d| (d.dir_x, d.dir_z)),
            });
        }
        units.sort_by_key(|u| u.id);

        let mut projectiles = Vec::new();
        let mut query = world.query_filtered::<(&Projectile, &Position, &Velocity), Without<Money>>();
        for (projectile, pos, vel) in query.iter(world) {
            projectiles.push(ProjectileSnapshot {
                style: styles.name(projectile.style).to_string(),
                owner: sim_id(world, Some(projectile.owner)),
                x: pos.x,
                y: pos.y,
                z: pos.z,
                vx: vel.x,
                vz: vel.z,
            });
        }

        let mut effects = Vec::new();
        let mut query = world.query::<(&EffectDescriptor, &Lifetime)>();
        for (effect, lifetime) in query.iter(world) {
            effects.push(EffectSnapshot {
                style: styles.name(effect.style).to_string(),
                vfx: styles.get(effect.style).map(|s| s.vfx.clone()).unwrap_or_default(),
                duration: effect.duration,
                remaining: lifetime.remaining,
                origin_x: effect.origin.x,
                origin_z: effect.origin.z,
                angle: effect.angle,
                target: sim_id(world, effect.target),
            });
        }

        let mut damage_numbers = Vec::new();
        let mut query = world.query::<(&DamageNumber, &Position)>();
        for (number, pos) in query.iter(world) {
            damage_numbers.push(DamageNumberSnapshot { amount: number.amount, x: pos.x, y: pos.y, z: pos.z });
        }

        let mut coins = Vec::new();
        let mut query = world.query::<(&Money, &Position)>();
        for (money, pos) in query.iter(world) {
            if !money.collected {
                coins.push(CoinSnapshot { amount: money.amount, x: pos.x, y: pos.y, z: pos.z });
            }
        }

        Self {
            tick: clock.tick,
            time: clock.time,
            units,
            projectiles,
            effects,
            damage_numbers,
            coins,
            wave,
            wallet: session.wallet,
            kills: session.kills,
            player_alive: session.player_alive,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_collects_units_and_coins() {
        let mut world = World::new();
        world.insert_resource(SimClock { tick: 3, time: 0.5 });
        world.insert_resource(Session { wallet: 9, player_alive: true, ..Session::default() });
        world.insert_resource(StyleRegistry::builtin());

        let player = world
            .spawn((
                SimId(1),
                UnitKind("hero".into()),
                Faction::Player,
                PlayerControlled,
                Position::planar(1.0, 2.0),
                Velocity::default(),
                Health::new(100.0),
            ))
            .id();
        world.spawn((
            SimId(2),
            UnitKind("grunt".into()),
            Faction::Enemy,
            Position::planar(4.0, 0.0),
            Velocity::default(),
            Health::new(30.0),
            Ai { behavior: Behavior::Chase, target: Some(player) },
        ));
        world.spawn((Money { amount: 2, collected: false }, Position::planar(0.0, 0.0)));
        world.spawn((Money { amount: 5, collected: true }, Position::planar(0.0, 0.0)));

        let snapshot = Snapshot::from_world(&mut world);

        assert_eq!(snapshot.tick, 3);
        assert_eq!(snapshot.wallet, 9);
        assert_eq!(snapshot.units.len(), 2);
        assert!(snapshot.units[0].player);
        assert_eq!(snapshot.units[1].target, Some(1));
        assert_eq!(snapshot.coins.len(), 1);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"faction\":\"enemy\""));
    }

    #[test]
    fn test_snapshot_names_effect_styles() {
        let mut world = World::new();
        let styles = StyleRegistry::builtin();
        let slash = styles.resolve("slash").unwrap();
        let vfx = styles.get(slash).unwrap().vfx.clone();
        world.insert_resource(styles);
        let effect = EffectDescriptor {
            style: slash,
            duration: 0.3,
            origin: Position::planar(1.0, 1.0),
            target: None,
            angle: 0.0,
        };
        world.spawn((effect, Lifetime { remaining: 0.2 }));

        let snapshot = Snapshot::from_world(&mut world);
        assert_eq!(snapshot.effects[0].style, "slash");
        assert_eq!(snapshot.effects[0].vfx, vfx);
        assert_eq!(world.resource::<StyleRegistry>().len(), StyleRegistry::builtin().len());

        // Without a registry the effect is still reported, unnamed
        world.remove_resource::<StyleRegistry>();
        let snapshot = Snapshot::from_world(&mut world);
        assert_eq!(snapshot.effects.len(), 1);
        assert_eq!(snapshot.effects[0].style, "");
    }
}
