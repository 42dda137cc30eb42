//! Arena Sim - Simulation Core
//!
//! A deterministic, per-frame ECS simulation for a wave-based arena battler:
//! players, allies and enemy hordes with time-sliced AI, burst attacks,
//! homing and piercing projectiles, mass-weighted crowd collision and pooled
//! damage numbers and coins.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod physics;
pub mod pool;
pub mod spatial;
pub mod store;
pub mod styles;
pub mod systems;
pub mod targeting;
pub mod units;
pub mod world;

pub use api::SimWorld;
pub use components::*;
pub use config::SimConfig;
pub use error::{Result, SimError};
pub use pool::{EntityPools, PoolKind};
pub use spatial::{SpatialEntry, SpatialHash};
pub use styles::{CombatStyle, StyleRegistry};
pub use systems::*;
pub use units::{AttackDef, SpawnRequest, UnitDef, UnitRegistry};
pub use world::Snapshot;
