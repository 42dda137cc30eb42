//! Unit definitions and spawn requests.
//!
//! A spawn request names a unit definition, a faction and a floor position.
//! The registry turns it into components, resolving the attack style against
//! the [`StyleRegistry`] so a bad reference fails at the request rather than
//! deep inside a system.

use crate::components::*;
use crate::error::{Result, SimError};
use crate::styles::StyleRegistry;
use bevy_ecs::prelude::*;
use bevy_ecs::world::CommandQueue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attack block of a unit definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackDef {
    pub power: f32,
    pub speed: f32,
    pub range: f32,
    #[serde(default)]
    pub knockback: f32,
    pub style: String,
    #[serde(default = "default_burst")]
    pub burst: u32,
    #[serde(default)]
    pub burst_interval: f32,
}

fn default_burst() -> u32 {
    1
}
fn default_mass() -> f32 {
    1.0
}
fn default_damping() -> f32 {
    0.9
}
fn default_radius() -> f32 {
    0.5
}

/// Content definition of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    pub id: String,
    pub health: f32,
    pub base_speed: f32,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_mass")]
    pub mass: f32,
    #[serde(default = "default_damping")]
    pub damping: f32,
    /// Currency dropped on death.
    #[serde(default)]
    pub bounty: u32,
    #[serde(default)]
    pub attack: Option<AttackDef>,
}

/// External request to place a unit in the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub unit: String,
    pub faction: Faction,
    pub x: f32,
    pub z: f32,
}

impl SpawnRequest {
    pub fn new(unit: &str, faction: Faction, x: f32, z: f32) -> Self {
        Self { unit: unit.to_string(), faction, x, z }
    }
}

/// Components for one unit, ready to be spawned.
pub struct UnitSpawn {
    pub base: UnitBundle,
    pub attack: Option<(Attack, AttackState)>,
    pub bounty: u32,
}

/// Role-specific components layered on top of [`UnitSpawn`].
pub enum Role {
    Player,
    Enemy,
    Ally(Follower),
    Neutral,
}

impl UnitSpawn {
    /// Spawn through deferred commands (used from inside systems).
    pub fn spawn_with(self, commands: &mut Commands, role: Role) -> Entity {
        let mut entity = commands.spawn(self.base);
        if let Some(attack) = self.attack {
            entity.insert(attack);
        }
        match role {
            Role::Player => {
                entity.insert(PlayerControlled);
            }
            Role::Enemy => {
                entity.insert((Ai::chase(), Bounty(self.bounty)));
            }
            Role::Ally(follower) => {
                entity.insert((Ai::chase(), follower));
            }
            Role::Neutral => {}
        }
        entity.id()
    }

    /// Spawn directly into a world (used by the external API).
    pub fn spawn_into(self, world: &mut World, role: Role) -> Entity {
        let mut queue = CommandQueue::default();
        let entity = self.spawn_with(&mut Commands::new(&mut queue, world), role);
        queue.apply(world);
        entity
    }
}

/// All known unit definitions.
#[derive(Resource, Debug, Clone, Default)]
pub struct UnitRegistry {
    units: HashMap<String, UnitDef>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default roster shipped with the engine.
    pub fn builtin() -> Self {
        let attack = |power, speed, range, knockback, style: &str, burst, burst_interval| AttackDef {
            power,
            speed,
            range,
            knockback,
            style: style.to_string(),
            burst,
            burst_interval,
        };
        let unit = |id: &str, health, base_speed, radius, mass, bounty, attack| UnitDef {
            id: id.to_string(),
            health,
            base_speed,
            radius,
            mass,
            damping: default_damping(),
            bounty,
            attack,
        };
        let mut registry = Self::new();
        for def in [
            unit("hero", 120.0, 6.0, 0.5, 3.0, 0, Some(attack(12.0, 2.0, 7.0, 2.0, "bolt", 1, 0.0))),
            unit("squire", 60.0, 5.5, 0.45, 1.5, 0, Some(attack(8.0, 1.2, 0.4, 3.0, "slash", 1, 0.0))),
            unit("grunt", 30.0, 3.5, 0.45, 1.0, 1, Some(attack(6.0, 1.0, 0.3, 2.0, "bite", 1, 0.0))),
            unit("brute", 90.0, 2.5, 0.8, 4.0, 5, Some(attack(18.0, 0.6, 0.5, 6.0, "smash", 1, 0.0))),
            unit("archer", 25.0, 3.0, 0.4, 0.8, 2, Some(attack(5.0, 0.5, 8.0, 1.0, "arrow", 3, 0.1))),
            unit("shaman", 35.0, 2.8, 0.45, 1.0, 3, Some(attack(7.0, 0.7, 9.0, 0.5, "wisp", 1, 0.0))),
        ] {
            registry.insert(def);
        }
        registry
    }

    /// Load a registry from a JSON array of unit definitions.
    pub fn from_json(json: &str) -> Result<Self> {
        let defs: Vec<UnitDef> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for def in defs {
            registry.insert(def);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, def: UnitDef) {
        self.units.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &str) -> Result<&UnitDef> {
        self.units.get(id).ok_or_else(|| SimError::UnknownUnit(id.to_string()))
    }

    /// Check every attack style reference against `styles`.
    pub fn validate(&self, styles: &StyleRegistry) -> Result<()> {
        for def in self.units.values() {
            if let Some(attack) = &def.attack {
                styles.resolve(&attack.style)?;
            }
        }
        Ok(())
    }

    /// Build the components for `request` with external id `id`.
    pub fn prepare(&self, styles: &StyleRegistry, request: &SpawnRequest, id: SimId) -> Result<UnitSpawn> {
        let def = self.get(&request.unit)?;
        let attack = match &def.attack {
            Some(a) => Some((
                Attack {
                    power: a.power,
                    speed: a.speed,
                    range: a.range,
                    knockback: a.knockback,
                    style: styles.resolve(&a.style)?,
                    burst: a.burst.max(1),
                    burst_interval: a.burst_interval,
                },
                AttackState::default(),
            )),
            None => None,
        };
        Ok(UnitSpawn {
            base: UnitBundle {
                id,
                phase: Phase::from_id(id),
                kind: UnitKind(def.id.clone()),
                faction: request.faction,
                position: Position::planar(request.x, request.z),
                velocity: Velocity::default(),
                intent: MoveIntent::default(),
                health: Health::new(def.health),
                stats: Stats::new(def.base_speed, def.radius),
                physics: Physics::new(def.damping, def.mass),
            },
            attack,
            bounty: def.bounty,
        })
    }
}
