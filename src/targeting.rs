//! Hostility rules and nearest-hostile lookup.
//!
//! Every faction relation lives in one table so it can be checked in isolation
//! from the systems that consume it.

use crate::components::{Faction, FactionMask};
use crate::spatial::{SpatialEntry, SpatialHash};
use bevy_ecs::prelude::*;

const N: usize = Faction::ALL.len();

/// Hostility relation, indexed by `[a.index()][b.index()]`.
///
/// Rows/columns: player, enemy, ally, bullet, effect, spectator.
const HOSTILITY: [[bool; N]; N] = [
    [false, true, false, false, false, false],
    [true, false, true, false, false, false],
    [false, true, false, false, false, false],
    [false, false, false, false, false, false],
    [false, false, false, false, false, false],
    [false, false, false, false, false, false],
];

/// Whether `a` and `b` fight each other. Symmetric; same faction is never hostile.
#[inline]
pub fn is_hostile(a: Faction, b: Faction) -> bool {
    HOSTILITY[a.index()][b.index()]
}

/// Mask of every faction hostile to `faction`.
pub fn hostile_mask(faction: Faction) -> FactionMask {
    Faction::ALL
        .iter()
        .filter(|other| is_hostile(faction, **other))
        .fold(FactionMask::NONE, |mask, other| mask.with(*other))
}

/// Who is looking for a target.
#[derive(Debug, Clone, Copy)]
pub struct Seeker {
    pub entity: Entity,
    pub faction: Faction,
    pub x: f32,
    pub z: f32,
}

/// Scan radii for [`find_nearest_hostile`].
#[derive(Debug, Clone, Copy)]
pub struct ScanRadius {
    pub radius: f32,
    /// Radius the scan may widen to when nothing is nearby. Equal to `radius`
    /// disables widening.
    pub fallback: f32,
}

/// Nearest living hostile to `seeker`, by squared planar distance.
///
/// `is_alive` re-checks each candidate against the live store so entities
/// killed earlier in the tick are skipped even though the hash still holds
/// them. `scratch` is reused between calls to avoid per-query allocation.
pub fn find_nearest_hostile(
    grid: &SpatialHash,
    seeker: Seeker,
    scan: ScanRadius,
    scratch: &mut Vec<SpatialEntry>,
    is_alive: impl Fn(Entity) -> bool,
) -> Option<SpatialEntry> {
    let mask = hostile_mask(seeker.faction);
    if mask.is_empty() {
        return None;
    }
    scratch.clear();
    grid.query_widening(seeker.x, seeker.z, scan.radius, scan.fallback, mask, scratch);

    let mut best: Option<(SpatialEntry, f32)> = None;
    for candidate in scratch.iter() {
        if candidate.entity == seeker.entity || !is_alive(candidate.entity) {
            continue;
        }
        let d = candidate.distance_sq(seeker.x, seeker.z);
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((*candidate, d));
        }
    }
    best.map(|(entry, _)| entry)
}
