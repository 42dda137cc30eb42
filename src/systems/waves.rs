//! Wave director - spawns enemies on an interval/count budget.
//!
//! Waves are queued from outside and run one at a time. A wave spawns its
//! enemies on a ring around the player, completes once every enemy it spawned
//! is dead, and the next queued wave starts after the completed wave's
//! intermission.

use crate::components::*;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::store::{EntityIndex, IdAllocator, Session, SimRng};
use crate::styles::StyleRegistry;
use crate::systems::movement::DeltaTime;
use crate::units::{Role, SpawnRequest, UnitRegistry};
use bevy_ecs::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f32::consts::TAU;
use tracing::{debug, error, info};

fn default_spawn_radius() -> f32 {
    18.0
}

/// One wave of enemies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Unit ids drawn uniformly for each spawn.
    pub enemy_pool: Vec<String>,
    /// Seconds between spawns.
    pub spawn_interval: f32,
    pub total_count: u32,
    /// Distance from the player at which enemies appear.
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f32,
    /// Pause after this wave is cleared before the next one starts.
    #[serde(default)]
    pub intermission: f32,
}

impl WaveConfig {
    pub fn new(enemy_pool: &[&str], spawn_interval: f32, total_count: u32) -> Self {
        Self {
            enemy_pool: enemy_pool.iter().map(|s| s.to_string()).collect(),
            spawn_interval,
            total_count,
            spawn_radius: default_spawn_radius(),
            intermission: 0.0,
        }
    }

    /// Check the wave against the unit roster.
    pub fn validate(&self, units: &UnitRegistry) -> Result<()> {
        if self.enemy_pool.is_empty() {
            return Err(SimError::InvalidConfig("wave enemy pool is empty".into()));
        }
        if !(self.spawn_interval > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "wave spawn interval must be positive, got {}",
                self.spawn_interval
            )));
        }
        for unit in &self.enemy_pool {
            units.get(unit)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WavePhase {
    /// No wave running; the next queued wave starts immediately.
    #[default]
    Idle,
    Spawning,
    /// Everything spawned; waiting for the last enemy to die.
    Clearing,
    Intermission,
}

/// Wave progress for presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveStatus {
    pub number: u32,
    pub phase: WavePhase,
    pub spawned: u32,
    pub total: u32,
    pub alive: u32,
    pub queued: usize,
}

/// Tags an enemy with the wave that spawned it.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveMember(pub u32);

#[derive(Resource, Debug, Default)]
pub struct WaveDirector {
    queue: VecDeque<WaveConfig>,
    current: Option<WaveConfig>,
    phase: WavePhase,
    number: u32,
    spawned: u32,
    alive: u32,
    next_spawn: f32,
    intermission_left: f32,
}

impl WaveDirector {
    /// Validate and append a wave.
    pub fn queue(&mut self, wave: WaveConfig, units: &UnitRegistry) -> Result<()> {
        wave.validate(units)?;
        self.queue.push_back(wave);
        Ok(())
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    /// Number of the current (or last) wave, starting at 1.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn status(&self) -> WaveStatus {
        WaveStatus {
            number: self.number,
            phase: self.phase,
            spawned: self.spawned,
            total: self.current.as_ref().map_or(0, |w| w.total_count),
            alive: self.alive,
            queued: self.queue.len(),
        }
    }

    fn start_next(&mut self) {
        if let Some(wave) = self.queue.pop_front() {
            self.number += 1;
            self.spawned = 0;
            self.next_spawn = 0.0;
            self.phase = WavePhase::Spawning;
            info!(wave = self.number, total = wave.total_count, "wave started");
            self.current = Some(wave);
        }
    }
}

/// System that drives the wave state machine and spawns enemies.
#[allow(clippy::too_many_arguments)]
pub fn wave_spawn_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    styles: Res<StyleRegistry>,
    units: Res<UnitRegistry>,
    session: Res<Session>,
    mut director: ResMut<WaveDirector>,
    mut ids: ResMut<IdAllocator>,
    mut index: ResMut<EntityIndex>,
    mut rng: ResMut<SimRng>,
    players: Query<&Position, With<PlayerControlled>>,
    members: Query<&WaveMember, Without<Dead>>,
) {
    let delta = dt.0;
    let number = director.number;
    director.alive = members.iter().filter(|m| m.0 == number).count() as u32;

    if director.phase == WavePhase::Intermission {
        director.intermission_left -= delta;
        if director.intermission_left <= 0.0 {
            director.phase = WavePhase::Idle;
        }
    }
    if director.phase == WavePhase::Idle {
        director.start_next();
    }

    match director.phase {
        WavePhase::Spawning => {
            let Some(wave) = director.current.clone() else {
                director.phase = WavePhase::Idle;
                return;
            };
            let center = session
                .player
                .and_then(|p| players.get(p).ok())
                .copied()
                .unwrap_or_default();

            director.next_spawn -= delta;
            while director.next_spawn <= 0.0 && director.spawned < wave.total_count {
                let unit = &wave.enemy_pool[rng.0.gen_range(0..wave.enemy_pool.len())];
                let angle = rng.0.gen_range(0.0..TAU);
                let x = center.x + angle.cos() * wave.spawn_radius;
                let z = center.z + angle.sin() * wave.spawn_radius;
                let id = ids.allocate();

                match units.prepare(&styles, &SpawnRequest::new(unit, Faction::Enemy, x, z), id) {
                    Ok(spawn) => {
                        let entity = spawn.spawn_with(&mut commands, Role::Enemy);
                        commands.entity(entity).insert((
                            SpawnTimer { remaining: config.spawn_in_duration },
                            WaveMember(director.number),
                        ));
                        index.insert(id, entity);
                        debug!(wave = director.number, unit = %unit, x, z, "enemy spawned");
                    }
                    Err(err) => error!(%err, "wave spawn failed"),
                }
                director.spawned += 1;
                director.next_spawn += wave.spawn_interval;
            }
            if director.spawned >= wave.total_count {
                director.phase = WavePhase::Clearing;
            }
        }
        WavePhase::Clearing => {
            if director.alive == 0 {
                info!(wave = director.number, "wave cleared");
                director.intermission_left = director.current.take().map_or(0.0, |w| w.intermission);
                director.phase = WavePhase::Intermission;
            }
        }
        WavePhase::Idle | WavePhase::Intermission => {}
    }
}
