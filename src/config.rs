//! Simulation tuning.
//!
//! Every balance constant lives here so content can be re-tuned without
//! touching the systems. Load from JSON with [`SimConfig::from_json`]; any
//! field left out keeps its default.

use crate::error::{Result, SimError};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for simulation behavior and performance tuning.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Spatial hash cell size in world units.
    pub cell_size: f32,
    /// Upper bound for a single frame delta; longer hitches are clamped.
    pub max_delta: f32,
    /// Seed for spawn jitter and wave placement.
    pub seed: u64,

    // Targeting
    /// Radius of the nearest-hostile scan.
    pub target_scan_radius: f32,
    /// Radius the scan widens to when nothing is found nearby.
    pub target_fallback_radius: f32,

    // AI
    /// Seconds between target re-acquisitions for a single entity.
    pub ai_tick_rate: f32,
    /// A new candidate must be this much closer than the held target to steal it.
    pub sticky_hysteresis: f32,
    /// Fraction of attack range at which a chaser stops advancing.
    pub stop_range_fraction: f32,
    /// Allies further than this from their owner drop their target and return.
    pub ally_leash_distance: f32,
    /// Allies only engage hostiles within this distance of their owner.
    pub ally_combat_radius: f32,
    /// Allies idle once within this distance of their follow point.
    pub ally_idle_radius: f32,
    /// Half-width of the random follow offset given to each ally.
    pub ally_follow_jitter: f32,

    // Combat
    /// Held targets stay valid out to `range * sticky_range_mult`.
    pub sticky_range_mult: f32,
    /// Seconds a corpse stays in the store for its death animation.
    pub death_anim_duration: f32,

    // Projectiles
    /// Per-tick blend toward the target direction for homing projectiles.
    pub homing_blend: f32,
    /// Broad-phase query radius around a projectile.
    pub projectile_query_radius: f32,
    /// Projectile body radius added to the victim radius for the exact test.
    pub projectile_hit_radius: f32,

    // Collision
    /// Each entity queries neighbors once every this many ticks.
    pub collision_stagger: u64,
    /// Push strength per unit of overlap (before stagger compensation).
    pub collision_hardness: f32,
    /// Closing speed above which momentum is exchanged between a pair.
    pub billiard_threshold: f32,
    /// Fraction of closing momentum exchanged in a billiard hit.
    pub billiard_transfer: f32,

    // Movement
    /// Damping exponent is `delta * damping_reference_rate`.
    pub damping_reference_rate: f32,
    /// Damping for entities without a physics component.
    pub default_damping: f32,
    /// Velocities below this magnitude snap to zero.
    pub velocity_epsilon: f32,
    /// Downward acceleration for entities with physics.
    pub gravity: f32,
    /// The player is clamped to `[-arena_half_extent, arena_half_extent]` on x and z.
    pub arena_half_extent: f32,

    // Pickups and transient entities
    /// Coins within this distance of the player are collected.
    pub pickup_radius: f32,
    /// Coins within this distance drift toward the player.
    pub magnet_radius: f32,
    /// Pull speed applied to coins inside the magnet radius.
    pub magnet_speed: f32,
    /// Seconds an uncollected coin stays on the ground.
    pub coin_lifetime: f32,
    /// Seconds a floating damage number is shown.
    pub damage_number_lifetime: f32,
    /// Maximum parked damage numbers kept for reuse.
    pub damage_number_pool: usize,
    /// Maximum parked coins kept for reuse.
    pub currency_pool: usize,
    /// Seconds a freshly spawned enemy spends in its spawn-in state.
    pub spawn_in_duration: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cell_size: 4.0,
            max_delta: 0.1,
            seed: 0x5eed,

            target_scan_radius: 15.0,
            target_fallback_radius: 60.0,

            ai_tick_rate: 0.3,
            sticky_hysteresis: 1.5,
            stop_range_fraction: 0.8,
            ally_leash_distance: 12.0,
            ally_combat_radius: 8.0,
            ally_idle_radius: 1.5,
            ally_follow_jitter: 1.5,

            sticky_range_mult: 1.5,
            death_anim_duration: 1.2,

            homing_blend: 0.12,
            projectile_query_radius: 1.5,
            projectile_hit_radius: 0.2,

            collision_stagger: 3,
            collision_hardness: 6.0,
            billiard_threshold: 4.0,
            billiard_transfer: 0.8,

            damping_reference_rate: 60.0,
            default_damping: 0.9,
            velocity_epsilon: 0.01,
            gravity: 25.0,
            arena_half_extent: 40.0,

            pickup_radius: 0.8,
            magnet_radius: 4.0,
            magnet_speed: 12.0,
            coin_lifetime: 30.0,
            damage_number_lifetime: 0.8,
            damage_number_pool: 128,
            currency_pool: 128,
            spawn_in_duration: 0.5,
        }
    }
}

impl SimConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the systems (division by zero, stalled cadences).
    pub fn validate(&self) -> Result<()> {
        if self.cell_size <= 0.0 {
            return Err(SimError::InvalidConfig("cell_size must be positive".into()));
        }
        if self.ai_tick_rate <= 0.0 {
            return Err(SimError::InvalidConfig("ai_tick_rate must be positive".into()));
        }
        if self.collision_stagger == 0 {
            return Err(SimError::InvalidConfig("collision_stagger must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.homing_blend) {
            return Err(SimError::InvalidConfig("homing_blend must be within [0, 1]".into()));
        }
        if self.max_delta <= 0.0 {
            return Err(SimError::InvalidConfig("max_delta must be positive".into()));
        }
        if self.target_fallback_radius < self.target_scan_radius {
            return Err(SimError::InvalidConfig(
                "target_fallback_radius must not be smaller than target_scan_radius".into(),
            ));
        }
        Ok(())
    }

    /// Collision hardness scaled up to offset the staggered query cadence.
    pub fn effective_hardness(&self) -> f32 {
        self.collision_hardness * self.collision_stagger as f32
    }
}
