//! Spatial hashing for broad-phase neighbor queries.
//!
//! Uniform grid over the x/z plane. Cell coordinates are packed into a single
//! `u32` key with a fixed bias so negative cells map to valid keys and lookups
//! never allocate. Buckets keep their capacity across `clear()` so the per-tick
//! rebuild reuses memory.

use crate::components::{Dead, Faction, FactionMask, Health, Position, Stats};
use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// Bias added to cell coordinates before packing.
pub const CELL_BIAS: i32 = 1 << 15;
/// Cell coordinates outside `[-CELL_BIAS, CELL_BIAS)` are clamped to the edge.
pub const CELL_LIMIT: i32 = CELL_BIAS - 1;

/// Pack a cell coordinate pair into a single key.
///
/// Injective for cells within `[-CELL_BIAS, CELL_LIMIT]` on both axes.
#[inline]
pub fn pack_cell(cx: i32, cz: i32) -> u32 {
    let bx = (cx.clamp(-CELL_BIAS, CELL_LIMIT) + CELL_BIAS) as u32;
    let bz = (cz.clamp(-CELL_BIAS, CELL_LIMIT) + CELL_BIAS) as u32;
    (bx << 16) | bz
}

/// Entry in a spatial cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub entity: Entity,
    pub x: f32,
    pub z: f32,
    pub radius: f32,
    pub faction: Faction,
}

impl SpatialEntry {
    #[inline]
    pub fn distance_sq(&self, x: f32, z: f32) -> f32 {
        let dx = self.x - x;
        let dz = self.z - z;
        dx * dx + dz * dz
    }
}

/// Grid-based spatial hash rebuilt every tick.
#[derive(Resource, Debug)]
pub struct SpatialHash {
    /// Cell size in world units.
    pub cell_size: f32,
    cells: HashMap<u32, Vec<SpatialEntry>>,
    len: usize,
    /// Largest body radius indexed since the last clear.
    max_radius: f32,
}

impl Default for SpatialHash {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
            max_radius: 0.0,
        }
    }

    /// Convert world coordinates to cell coordinates.
    #[inline]
    pub fn world_to_cell(&self, x: f32, z: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (z / self.cell_size).floor() as i32,
        )
    }

    /// Empty every bucket, keeping allocations for the next rebuild.
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.len = 0;
        self.max_radius = 0.0;
    }

    /// Append an entry to the bucket of its current cell.
    pub fn insert(&mut self, entry: SpatialEntry) {
        let (cx, cz) = self.world_to_cell(entry.x, entry.z);
        self.cells.entry(pack_cell(cx, cz)).or_default().push(entry);
        self.len += 1;
        self.max_radius = self.max_radius.max(entry.radius);
    }

    /// Collect every entry in cells overlapping the square of half-width
    /// `range` around (x, z), filtered by `mask`, into `out`.
    ///
    /// No false negatives within `range`; callers re-check exact distance since
    /// the square over-approximates the circle.
    pub fn query_into(&self, x: f32, z: f32, range: f32, mask: FactionMask, out: &mut Vec<SpatialEntry>) {
        let (min_x, min_z) = self.world_to_cell(x - range, z - range);
        let (max_x, max_z) = self.world_to_cell(x + range, z + range);
        for cx in min_x..=max_x {
            for cz in min_z..=max_z {
                if let Some(bucket) = self.cells.get(&pack_cell(cx, cz)) {
                    out.extend(bucket.iter().filter(|e| mask.contains(e.faction)));
                }
            }
        }
    }

    /// Allocating convenience wrapper around [`SpatialHash::query_into`].
    pub fn query(&self, x: f32, z: f32, range: f32, mask: FactionMask) -> Vec<SpatialEntry> {
        let mut out = Vec::new();
        self.query_into(x, z, range, mask, &mut out);
        out
    }

    /// Query, doubling the radius up to `max_range` while nothing is found.
    ///
    /// Returns the radius that produced the candidates.
    pub fn query_widening(
        &self,
        x: f32,
        z: f32,
        range: f32,
        max_range: f32,
        mask: FactionMask,
        out: &mut Vec<SpatialEntry>,
    ) -> f32 {
        let mut radius = range;
        loop {
            self.query_into(x, z, radius, mask, out);
            if !out.is_empty() || radius >= max_range {
                return radius;
            }
            radius = (radius * 2.0).min(max_range);
        }
    }

    /// Total number of indexed entities.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Largest indexed body radius; bounds pair queries for overlap tests.
    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }
}

/// System that rebuilds the spatial hash from every living, damageable entity.
pub fn spatial_hash_update_system(
    mut grid: ResMut<SpatialHash>,
    query: Query<(Entity, &Position, &Faction, &Health, Option<&Stats>), Without<Dead>>,
) {
    grid.clear();

    for (entity, pos, faction, health, stats) in query.iter() {
        if !health.is_alive() {
            continue;
        }
        grid.insert(SpatialEntry {
            entity,
            x: pos.x,
            z: pos.z,
            radius: stats.map(|s| s.radius).unwrap_or(0.0),
            faction: *faction,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn entry(i: u32, x: f32, z: f32, faction: Faction) -> SpatialEntry {
        SpatialEntry { entity: Entity::from_raw(i), x, z, radius: 0.5, faction }
    }

    #[test]
    fn test_insert_query() {
        let mut grid = SpatialHash::new(10.0);
        grid.insert(entry(1, 5.0, 5.0, Faction::Enemy));
        grid.insert(entry(2, 15.0, 5.0, Faction::Enemy));
        grid.insert(entry(3, 100.0, 100.0, Faction::Player));

        let nearby = grid.query(5.0, 5.0, 15.0, FactionMask::ALL);
        assert_eq!(nearby.len(), 2);

        let far = grid.query(100.0, 100.0, 1.0, FactionMask::ALL);
        assert_eq!(far.len(), 1);
        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn test_negative_coordinates() {
        let mut grid = SpatialHash::new(4.0);
        grid.insert(entry(1, -0.5, -0.5, Faction::Enemy));
        grid.insert(entry(2, 0.5, 0.5, Faction::Enemy));
        grid.insert(entry(3, -37.0, 12.0, Faction::Enemy));

        assert_eq!(grid.query(0.0, 0.0, 1.0, FactionMask::ALL).len(), 2);
        assert_eq!(grid.query(-37.0, 12.0, 0.1, FactionMask::ALL).len(), 1);
    }

    #[test]
    fn test_faction_mask_filters() {
        let mut grid = SpatialHash::new(4.0);
        grid.insert(entry(1, 0.0, 0.0, Faction::Player));
        grid.insert(entry(2, 1.0, 0.0, Faction::Ally));
        grid.insert(entry(3, 2.0, 0.0, Faction::Enemy));

        let enemies = grid.query(0.0, 0.0, 5.0, Faction::Enemy.bit());
        assert_eq!(enemies.len(), 1);
        assert_eq!(enemies[0].entity, Entity::from_raw(3));

        let friends = grid.query(0.0, 0.0, 5.0, Faction::Player.bit().with(Faction::Ally));
        assert_eq!(friends.len(), 2);
    }

    #[test]
    fn test_no_false_negatives() {
        let mut grid = SpatialHash::new(3.0);
        let mut i = 0;
        for gx in -20..20 {
            for gz in -20..20 {
                grid.insert(entry(i, gx as f32 * 0.77, gz as f32 * 1.13, Faction::Enemy));
                i += 1;
            }
        }
        let (qx, qz, r) = (-2.3, 4.1, 6.5);
        let found: HashSet<Entity> = grid.query(qx, qz, r, FactionMask::ALL).iter().map(|e| e.entity).collect();

        let mut i = 0;
        for gx in -20..20 {
            for gz in -20..20 {
                let e = entry(i, gx as f32 * 0.77, gz as f32 * 1.13, Faction::Enemy);
                if e.distance_sq(qx, qz) <= r * r {
                    assert!(found.contains(&e.entity), "missed entity at ({}, {})", e.x, e.z);
                }
                i += 1;
            }
        }
    }

    #[test]
    fn test_cell_key_packing_is_injective() {
        let mut seen = HashSet::new();
        for cx in -300..300 {
            for cz in [-CELL_BIAS, -1, 0, 1, CELL_LIMIT] {
                assert!(seen.insert(pack_cell(cx, cz)));
            }
        }
        assert_ne!(pack_cell(-CELL_BIAS, CELL_LIMIT), pack_cell(CELL_LIMIT, -CELL_BIAS));
    }

    #[test]
    fn test_widening_finds_distant_entity() {
        let mut grid = SpatialHash::new(4.0);
        grid.insert(entry(1, 40.0, 0.0, Faction::Enemy));

        let mut out = Vec::new();
        grid.query_into(0.0, 0.0, 15.0, FactionMask::ALL, &mut out);
        assert!(out.is_empty());

        let radius = grid.query_widening(0.0, 0.0, 15.0, 60.0, FactionMask::ALL, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(radius, 60.0);
    }

    #[test]
    fn test_clear_keeps_nothing() {
        let mut grid = SpatialHash::new(4.0);
        grid.insert(entry(1, 0.0, 0.0, Faction::Enemy));
        grid.clear();
        assert!(grid.is_empty());
        assert!(grid.query(0.0, 0.0, 10.0, FactionMask::ALL).is_empty());
    }

    #[test]
    fn test_update_system_skips_dead() {
        let mut world = World::new();
        world.insert_resource(SpatialHash::new(4.0));
        world.spawn((Position::planar(0.0, 0.0), Faction::Enemy, Health::new(10.0)));
        world.spawn((
            Position::planar(1.0, 0.0),
            Faction::Enemy,
            Health::new(10.0),
            Dead { time: 0.0, dir_x: 0.0, dir_z: 1.0 },
        ));
        let mut zero = Health::new(10.0);
        zero.current = 0.0;
        world.spawn((Position::planar(2.0, 0.0), Faction::Enemy, zero));

        let mut schedule = Schedule::default();
        schedule.add_systems(spatial_hash_update_system);
        schedule.run(&mut world);

        assert_eq!(world.resource::<SpatialHash>().len(), 1);
    }
}
