//! Basic demonstration of the arena simulation.
//!
//! Run with: cargo run --example basic_demo

use arena_sim::{SimWorld, WaveConfig};

fn main() -> arena_sim::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    println!("=== Arena Sim - Simulation Demo ===\n");

    let mut sim = SimWorld::new();
    sim.spawn_player("hero", 0.0, 0.0)?;
    sim.spawn_ally("squire", 1.5, 0.0)?;
    sim.spawn_ally("squire", -1.5, 0.0)?;

    let mut first = WaveConfig::new(&["grunt", "grunt", "archer"], 0.4, 10);
    first.spawn_radius = 12.0;
    first.intermission = 2.0;
    sim.queue_wave(first)?;
    let mut second = WaveConfig::new(&["grunt", "brute", "shaman"], 0.3, 16);
    second.spawn_radius = 12.0;
    sim.queue_wave(second)?;

    // 30 seconds at 60 frames per second, circling slowly
    println!("Running simulation for 1800 frames (30 seconds at 60 fps)...\n");
    for frame in 0..1800u32 {
        let angle = frame as f32 / 300.0;
        sim.set_player_intent(angle.cos() * 0.5, angle.sin() * 0.5)?;
        sim.step(1.0 / 60.0);

        if (frame + 1) % 300 == 0 {
            print_snapshot(&mut sim);
        }
        if !sim.session().player_alive {
            println!("\nThe hero has fallen.");
            break;
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", sim.snapshot().to_json_pretty()?);
    Ok(())
}

fn print_snapshot(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();
    println!(
        "--- Tick {} (t={:.1}s) wave {} {:?} alive={} kills={} wallet={} ---",
        snapshot.tick,
        snapshot.time,
        snapshot.wave.number,
        snapshot.wave.phase,
        snapshot.wave.alive,
        snapshot.kills,
        snapshot.wallet,
    );
    for unit in snapshot.units.iter().filter(|u| !u.dead) {
        println!(
            "    {:>3} {:<7} {:?}: pos=({:.1}, {:.1}) hp={:.0}/{:.0}",
            unit.id, unit.kind, unit.faction, unit.x, unit.z, unit.health, unit.health_max
        );
    }
    println!(
        "    projectiles={} effects={} damage_numbers={} coins={}",
        snapshot.projectiles.len(),
        snapshot.effects.len(),
        snapshot.damage_numbers.len(),
        snapshot.coins.len()
    );
}
