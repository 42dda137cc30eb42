//! ECS Components for the arena simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.

use crate::styles::StyleId;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// World position. The arena floor is the x/z plane; y is height.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Position on the arena floor.
    pub fn planar(x: f32, z: f32) -> Self {
        Self { x, y: 0.0, z }
    }

    #[inline]
    pub fn planar_distance_sq(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    #[inline]
    pub fn planar_distance(&self, other: &Position) -> f32 {
        self.planar_distance_sq(other).sqrt()
    }

    /// Normalized x/z direction toward `other`, or `None` when coincident.
    pub fn planar_direction_to(&self, other: &Position) -> Option<(f32, f32)> {
        crate::physics::normalize_planar(other.x - self.x, other.z - self.z)
    }
}

/// Impulse-driven velocity (knockback, collision, gravity). Decays every tick.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Velocity {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn planar_speed(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn add_planar(&mut self, dx: f32, dz: f32) {
        self.x += dx;
        self.z += dz;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Direct-control movement direction on the floor (unit length or zero).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub x: f32,
    pub z: f32,
}

impl MoveIntent {
    /// Build an intent from any vector; longer vectors are normalized.
    pub fn from_vector(x: f32, z: f32) -> Self {
        let len = (x * x + z * z).sqrt();
        if len < 1e-4 {
            Self::default()
        } else if len > 1.0 {
            Self { x: x / len, z: z / len }
        } else {
            Self { x, z }
        }
    }

    pub fn clear(&mut self) {
        self.x = 0.0;
        self.z = 0.0;
    }

    pub fn is_idle(&self) -> bool {
        self.x == 0.0 && self.z == 0.0
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Stable external identity of a unit.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimId(pub u64);

/// Per-entity phase used to spread periodic work across frames.
///
/// Assigned once at creation from the entity's `SimId`, so it never depends on
/// where the entity happens to sit in storage.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phase(pub u32);

impl Phase {
    /// Mix an id into a well-spread phase (splitmix64 finalizer).
    pub fn from_id(id: SimId) -> Self {
        let mut z = id.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        Self(z as u32)
    }

    /// Phase as a fraction in `[0, 1)`.
    #[inline]
    pub fn fraction(&self) -> f32 {
        (self.0 as f64 / (u32::MAX as f64 + 1.0)) as f32
    }

    /// True when this entity's turn comes up in a cadence of `interval` ticks.
    #[inline]
    pub fn is_due(&self, tick: u64, interval: u64) -> bool {
        interval <= 1 || (tick.wrapping_add(self.0 as u64)) % interval == 0
    }
}

/// Faction tag. Drives hostility, broad-phase filtering and snapshot coding.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    Player,
    Enemy,
    Ally,
    Bullet,
    Effect,
    Spectator,
}

impl Faction {
    pub const ALL: [Faction; 6] = [
        Faction::Player,
        Faction::Enemy,
        Faction::Ally,
        Faction::Bullet,
        Faction::Effect,
        Faction::Spectator,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Single-bit mask for this faction.
    #[inline]
    pub fn bit(self) -> FactionMask {
        FactionMask(1 << self.index())
    }

    pub fn is_combatant(self) -> bool {
        FactionMask::COMBATANTS.contains(self)
    }
}

/// Bitmask over factions for broad-phase filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FactionMask(pub u8);

impl FactionMask {
    pub const NONE: FactionMask = FactionMask(0);
    pub const ALL: FactionMask = FactionMask(0b11_1111);
    pub const COMBATANTS: FactionMask = FactionMask(0b111);

    #[inline]
    pub fn contains(self, faction: Faction) -> bool {
        self.0 & faction.bit().0 != 0
    }

    #[inline]
    pub fn with(self, faction: Faction) -> Self {
        Self(self.0 | faction.bit().0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Content id of the unit definition this entity was spawned from.
#[derive(Component, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitKind(pub String);

/// Marker for the entity steered by the external movement input.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PlayerControlled;

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Hit points. `current` always stays within `[0, max]`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    /// Simulation time of the last damage taken (hit flash for presentation).
    pub last_hit_time: Option<f32>,
}

/// Result of a single damage application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub dealt: f32,
    pub killed: bool,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max, last_hit_time: None }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Apply damage at simulation time `now`, clamping into `[0, max]`.
    ///
    /// `killed` is true only on the hit that takes health from positive to zero.
    pub fn apply_damage(&mut self, amount: f32, now: f32) -> DamageOutcome {
        let before = self.current;
        self.current = (self.current - amount.max(0.0)).clamp(0.0, self.max);
        self.last_hit_time = Some(now);
        DamageOutcome {
            dealt: before - self.current,
            killed: before > 0.0 && self.current <= 0.0,
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Attack profile of a unit.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    pub power: f32,
    /// Attacks per second.
    pub speed: f32,
    /// Reach measured from body surface to body surface.
    pub range: f32,
    pub knockback: f32,
    pub style: StyleId,
    /// Shots per volley; 1 disables bursting.
    pub burst: u32,
    /// Seconds between shots inside a volley.
    pub burst_interval: f32,
}

impl Attack {
    /// Full cooldown between volleys.
    pub fn cooldown(&self) -> f32 {
        if self.speed <= 0.0 {
            f32::INFINITY
        } else {
            1.0 / self.speed
        }
    }
}

/// Attack cooldown state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CombatPhase {
    /// Gated by the full `1 / speed` cooldown.
    #[default]
    Idle,
    /// Mid-volley, gated by `burst_interval`.
    BurstActive,
}

/// Runtime attack bookkeeping.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct AttackState {
    pub phase: CombatPhase,
    pub last_attack_time: f32,
    pub burst_remaining: u32,
    pub last_burst_time: f32,
    pub current_target: Option<Entity>,
    /// Angle (radians, atan2 of x over z) of the last resolved attack.
    pub facing: f32,
}

impl Default for AttackState {
    fn default() -> Self {
        Self {
            phase: CombatPhase::Idle,
            last_attack_time: f32::NEG_INFINITY,
            burst_remaining: 0,
            last_burst_time: f32::NEG_INFINITY,
            current_target: None,
            facing: 0.0,
        }
    }
}

impl AttackState {
    /// Whether the state machine allows a shot at time `now`.
    pub fn ready(&self, attack: &Attack, now: f32) -> bool {
        match self.phase {
            CombatPhase::Idle => now - self.last_attack_time >= attack.cooldown(),
            CombatPhase::BurstActive => now - self.last_burst_time >= attack.burst_interval,
        }
    }

    /// Advance the state machine for one shot fired at `now`.
    pub fn record_shot(&mut self, attack: &Attack, now: f32) {
        match self.phase {
            CombatPhase::Idle if attack.burst > 1 => {
                self.phase = CombatPhase::BurstActive;
                self.burst_remaining = attack.burst - 1;
                self.last_burst_time = now;
            }
            CombatPhase::Idle => {
                self.last_attack_time = now;
            }
            CombatPhase::BurstActive => {
                self.burst_remaining = self.burst_remaining.saturating_sub(1);
                self.last_burst_time = now;
                if self.burst_remaining == 0 {
                    self.phase = CombatPhase::Idle;
                    self.last_attack_time = now;
                }
            }
        }
    }

    /// Drop an unfinished volley; the full cooldown starts now.
    pub fn abort_burst(&mut self, now: f32) {
        if self.phase == CombatPhase::BurstActive {
            self.phase = CombatPhase::Idle;
            self.burst_remaining = 0;
            self.last_attack_time = now;
        }
    }
}

/// Currency (or other bounty) dropped when this entity dies.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounty(pub u32);

// ============================================================================
// PROJECTILE COMPONENTS
// ============================================================================

/// In-flight ranged attack. Also reused by coins purely for integration.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Projectile {
    pub damage: f32,
    pub speed: f32,
    /// Additional targets this projectile may still damage.
    pub pierce_remaining: u32,
    pub owner: Entity,
    /// Faction of the owner at launch; same-faction targets are never hit.
    pub owner_faction: Faction,
    /// Homing target, if the style tracks.
    pub target: Option<Entity>,
    /// Last hit time per struck entity.
    pub hit_entities: HashMap<Entity, f32>,
    pub hit_interval: f32,
    /// Seconds left before the projectile expires.
    pub life_time: f32,
    pub style: StyleId,
    pub tracking_strength: f32,
    pub knockback: f32,
    /// Ticks since launch; collision runs on even ages.
    pub age_ticks: u32,
    /// Floor position at the last collision check. Each check sweeps from
    /// here to the current position; `None` until the first check.
    pub sweep_from: Option<(f32, f32)>,
}

impl Projectile {
    /// Whether `target` may be struck at `now` given the repeat-hit interval.
    pub fn can_hit(&self, target: Entity, now: f32) -> bool {
        match self.hit_entities.get(&target) {
            Some(&last) => now - last >= self.hit_interval,
            None => true,
        }
    }

    /// Record a hit; returns false when the pierce budget is exhausted and the
    /// projectile must be destroyed.
    pub fn register_hit(&mut self, target: Entity, now: f32) -> bool {
        self.hit_entities.insert(target, now);
        match self.pierce_remaining.checked_sub(1) {
            Some(left) => {
                self.pierce_remaining = left;
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// PHYSICS COMPONENTS
// ============================================================================

/// Physical response parameters.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    /// Per-reference-frame velocity retention in `[0, 1]`.
    pub damping: f32,
    pub is_grounded: bool,
    pub mass: f32,
}

impl Physics {
    pub fn new(damping: f32, mass: f32) -> Self {
        Self { damping, is_grounded: true, mass }
    }

    pub fn inverse_mass(&self) -> f32 {
        if self.mass <= 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new(0.9, 1.0)
    }
}

/// Movement and body stats.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub base_speed: f32,
    pub radius: f32,
    pub speed_mult: f32,
}

impl Stats {
    pub fn new(base_speed: f32, radius: f32) -> Self {
        Self { base_speed, radius, speed_mult: 1.0 }
    }

    pub fn move_speed(&self) -> f32 {
        self.base_speed * self.speed_mult
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(4.0, 0.5)
    }
}

// ============================================================================
// AI COMPONENTS
// ============================================================================

/// AI behavior selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    #[default]
    Chase,
    Hold,
}

/// AI decision state.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct Ai {
    pub behavior: Behavior,
    pub target: Option<Entity>,
}

impl Ai {
    pub fn chase() -> Self {
        Self { behavior: Behavior::Chase, target: None }
    }
}

/// Anchor for follower units (allies). The offset keeps followers from stacking.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Follower {
    pub owner: Entity,
    pub offset_x: f32,
    pub offset_z: f32,
}

// ============================================================================
// LIFECYCLE COMPONENTS
// ============================================================================

/// Death record. Dead entities are skipped by targeting, combat and collision.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Dead {
    pub time: f32,
    /// Normalized x/z direction away from the killer (presentation only).
    pub dir_x: f32,
    pub dir_z: f32,
}

/// Remaining seconds before removal (death window, effects, damage numbers).
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub remaining: f32,
}

/// Spawn-in window; while active the entity neither thinks, moves nor attacks.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct SpawnTimer {
    pub remaining: f32,
}

impl SpawnTimer {
    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }
}

/// Currency pickup.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Money {
    pub amount: u32,
    pub collected: bool,
}

/// Floating damage readout.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct DamageNumber {
    pub amount: f32,
}

/// Declarative visual effect interpreted by the renderer.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct EffectDescriptor {
    pub style: StyleId,
    pub duration: f32,
    pub origin: Position,
    pub target: Option<Entity>,
    pub angle: f32,
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a complete combatant.
#[derive(Bundle)]
pub struct UnitBundle {
    pub id: SimId,
    pub phase: Phase,
    pub kind: UnitKind,
    pub faction: Faction,
    pub position: Position,
    pub velocity: Velocity,
    pub intent: MoveIntent,
    pub health: Health,
    pub stats: Stats,
    pub physics: Physics,
}

/// Bundle for an in-flight attack projectile.
#[derive(Bundle)]
pub struct ProjectileBundle {
    pub projectile: Projectile,
    pub faction: Faction,
    pub position: Position,
    pub velocity: Velocity,
}

/// Bundle for a transient visual effect.
#[derive(Bundle)]
pub struct EffectBundle {
    pub effect: EffectDescriptor,
    pub faction: Faction,
    pub position: Position,
    pub lifetime: Lifetime,
}

impl EffectBundle {
    pub fn new(effect: EffectDescriptor) -> Self {
        Self {
            faction: Faction::Effect,
            position: effect.origin,
            lifetime: Lifetime { remaining: effect.duration },
            effect,
        }
    }
}
