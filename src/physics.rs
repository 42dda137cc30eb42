//! Physics primitives: damping, gravity and pair impulses.
//!
//! Pure functions with no ECS access, shared by the movement, projectile and
//! collision systems.

/// Normalize an x/z vector; `None` for (near) zero vectors.
#[inline]
pub fn normalize_planar(x: f32, z: f32) -> Option<(f32, f32)> {
    let len = (x * x + z * z).sqrt();
    if len < 1e-6 {
        None
    } else {
        Some((x / len, z / len))
    }
}

/// Frame-rate independent damping multiplier.
///
/// `damping` is the retention per reference frame, so the factor for a frame
/// of length `dt` is `damping ^ (dt * reference_rate)`.
#[inline]
pub fn damping_factor(damping: f32, dt: f32, reference_rate: f32) -> f32 {
    damping.clamp(0.0, 1.0).powf(dt * reference_rate)
}

/// Damp a planar velocity, snapping to zero below `epsilon`.
pub fn damp_planar(x: f32, z: f32, factor: f32, epsilon: f32) -> (f32, f32) {
    let (x, z) = (x * factor, z * factor);
    if x * x + z * z < epsilon * epsilon {
        (0.0, 0.0)
    } else {
        (x, z)
    }
}

/// Damp a single axis, snapping to zero below `epsilon`.
pub fn damp_axis(v: f32, factor: f32, epsilon: f32) -> f32 {
    let v = v * factor;
    if v.abs() < epsilon {
        0.0
    } else {
        v
    }
}

/// Result of one vertical integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalStep {
    pub y: f32,
    pub vy: f32,
    pub grounded: bool,
}

/// Integrate height under gravity; the floor is at `y = 0`.
pub fn integrate_vertical(y: f32, vy: f32, gravity: f32, dt: f32) -> VerticalStep {
    let vy = vy - gravity * dt;
    let y = y + vy * dt;
    if y <= 0.0 {
        VerticalStep { y: 0.0, vy: 0.0, grounded: true }
    } else {
        VerticalStep { y, vy, grounded: false }
    }
}

/// Closest approach of the floor segment `from -> to` to `point`.
///
/// Returns the segment parameter in `[0, 1]` and the squared distance at that
/// parameter. A degenerate segment reports its start point.
pub fn segment_closest(from: (f32, f32), to: (f32, f32), point: (f32, f32)) -> (f32, f32) {
    let (dx, dz) = (to.0 - from.0, to.1 - from.1);
    let len_sq = dx * dx + dz * dz;
    let t = if len_sq < 1e-12 {
        0.0
    } else {
        (((point.0 - from.0) * dx + (point.1 - from.1) * dz) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cz) = (from.0 + dx * t, from.1 + dz * t);
    let (ex, ez) = (point.0 - cx, point.1 - cz);
    (t, ex * ex + ez * ez)
}

/// Planar velocity changes for both bodies of a colliding pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PairImpulse {
    pub a: (f32, f32),
    pub b: (f32, f32),
}

impl PairImpulse {
    fn add(&mut self, other: PairImpulse) {
        self.a.0 += other.a.0;
        self.a.1 += other.a.1;
        self.b.0 += other.b.0;
        self.b.1 += other.b.1;
    }
}

/// One body of a collision pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub x: f32,
    pub z: f32,
    pub vx: f32,
    pub vz: f32,
    pub radius: f32,
    pub inverse_mass: f32,
}

/// Tuning for [`resolve_pair`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionTuning {
    pub hardness: f32,
    pub billiard_threshold: f32,
    pub billiard_transfer: f32,
}

/// Equal-and-opposite push along the normal from `a` to `b`, before mass weighting.
///
/// Strength grows with overlap depth and with the pair's relative speed.
pub fn raw_push(a: &Body, b: &Body, hardness: f32) -> Option<((f32, f32), f32)> {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    let dist_sq = dx * dx + dz * dz;
    let reach = a.radius + b.radius;
    if dist_sq >= reach * reach {
        return None;
    }
    let dist = dist_sq.sqrt();
    // Coincident bodies separate along x
    let normal = normalize_planar(dx, dz).unwrap_or((1.0, 0.0));
    let overlap = reach - dist;
    let rel_speed = ((a.vx - b.vx).powi(2) + (a.vz - b.vz).powi(2)).sqrt();
    Some((normal, overlap * hardness * (1.0 + rel_speed)))
}

/// Resolve an overlapping pair into velocity changes.
///
/// The push is split by inverse mass so heavier bodies move less. When the
/// closing speed along the normal exceeds the billiard threshold, closing
/// momentum is exchanged between the pair as well.
pub fn resolve_pair(a: &Body, b: &Body, tuning: &CollisionTuning) -> Option<PairImpulse> {
    let (normal, strength) = raw_push(a, b, tuning.hardness)?;
    let w_total = a.inverse_mass + b.inverse_mass;
    if w_total <= 0.0 {
        return None;
    }
    let share_a = a.inverse_mass / w_total;
    let share_b = b.inverse_mass / w_total;

    let mut impulse = PairImpulse {
        a: (-normal.0 * strength * share_a, -normal.1 * strength * share_a),
        b: (normal.0 * strength * share_b, normal.1 * strength * share_b),
    };

    let closing = (a.vx - b.vx) * normal.0 + (a.vz - b.vz) * normal.1;
    if closing > tuning.billiard_threshold {
        let j = closing * tuning.billiard_transfer / w_total;
        impulse.add(PairImpulse {
            a: (-normal.0 * j * a.inverse_mass, -normal.1 * j * a.inverse_mass),
            b: (normal.0 * j * b.inverse_mass, normal.1 * j * b.inverse_mass),
        });
    }
    Some(impulse)
}
