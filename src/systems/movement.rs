//! Movement system - composes intent and impulse velocity into position.

use crate::components::*;
use crate::config::SimConfig;
use crate::physics::{damp_axis, damp_planar, damping_factor, integrate_vertical};
use bevy_ecs::prelude::*;

/// Resource containing the delta time for the current tick.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// System that integrates every non-projectile entity.
///
/// Impulse velocity decays by `damping ^ (delta * reference_rate)` and snaps to
/// zero below the epsilon. Intent is a direct channel scaled by move speed and
/// is never damped. Entities with [`Physics`] fall under gravity; everything
/// else damps its vertical velocity like the planar channel. Only the player is
/// clamped to the arena.
pub fn movement_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut query: Query<
        (
            &mut Position,
            &mut Velocity,
            Option<&MoveIntent>,
            Option<&Stats>,
            Option<&mut Physics>,
            Option<&SpawnTimer>,
            Has<PlayerControlled>,
        ),
        Without<Projectile>,
    >,
) {
    let delta = dt.0;
    if delta <= 0.0 {
        return;
    }

    for (mut pos, mut vel, intent, stats, physics, spawn, is_player) in query.iter_mut() {
        let damping = physics.as_ref().map_or(config.default_damping, |p| p.damping);
        let factor = damping_factor(damping, delta, config.damping_reference_rate);
        let (vx, vz) = damp_planar(vel.x, vel.z, factor, config.velocity_epsilon);
        vel.x = vx;
        vel.z = vz;

        let frozen = spawn.is_some_and(|s| s.is_active());
        if let (Some(intent), Some(stats), false) = (intent, stats, frozen) {
            let speed = stats.move_speed();
            pos.x += intent.x * speed * delta;
            pos.z += intent.z * speed * delta;
        }
        pos.x += vel.x * delta;
        pos.z += vel.z * delta;

        match physics {
            Some(mut physics) => {
                let step = integrate_vertical(pos.y, vel.y, config.gravity, delta);
                pos.y = step.y;
                vel.y = step.vy;
                physics.is_grounded = step.grounded;
            }
            None => {
                vel.y = damp_axis(vel.y, factor, config.velocity_epsilon);
                pos.y += vel.y * delta;
            }
        }

        if is_player {
            let bound = config.arena_half_extent;
            pos.x = pos.x.clamp(-bound, bound);
            pos.z = pos.z.clamp(-bound, bound);
        }
    }
}
