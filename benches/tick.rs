use arena_sim::{Faction, FactionMask, SimWorld, SpatialEntry, SpatialHash, WaveConfig};
use bevy_ecs::entity::Entity;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn setup_hash_with_entities(count: usize) -> (SpatialHash, Vec<(f32, f32)>) {
    let mut hash = SpatialHash::new(4.0);
    let mut positions = Vec::with_capacity(count);

    for i in 0..count {
        let x = (i as f32 * 17.0) % 200.0 - 100.0;
        let z = (i as f32 * 23.0) % 150.0 - 75.0;
        let faction = if i % 3 == 0 { Faction::Ally } else { Faction::Enemy };
        hash.insert(SpatialEntry { entity: Entity::from_raw(i as u32), x, z, radius: 0.5, faction });
        positions.push((x, z));
    }

    (hash, positions)
}

fn bench_spatial_hash_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_hash");

    for count in [500, 2000, 8000].iter() {
        let (hash, positions) = setup_hash_with_entities(*count);

        group.bench_function(format!("query_{}_entities", count), |b| {
            let mut out = Vec::new();
            let mut i = 0;
            b.iter(|| {
                let (x, z) = positions[i % positions.len()];
                hash.query_into(x, z, 8.0, FactionMask::NONE.with(Faction::Enemy), &mut out);
                i += 1;
                black_box(out.len())
            });
        });
    }

    group.finish();
}

fn bench_spatial_hash_rebuild(c: &mut Criterion) {
    c.bench_function("spatial_hash_rebuild_2k", |b| {
        let (mut hash, positions) = setup_hash_with_entities(2000);

        b.iter(|| {
            hash.clear();
            for (i, &(x, z)) in positions.iter().enumerate() {
                hash.insert(SpatialEntry {
                    entity: Entity::from_raw(i as u32),
                    x,
                    z,
                    radius: 0.5,
                    faction: Faction::Enemy,
                });
            }
            black_box(hash.len())
        });
    });
}

fn crowded_arena(enemies: u32) -> SimWorld {
    let mut sim = SimWorld::new();
    sim.spawn_player("hero", 0.0, 0.0).expect("player");
    for i in 0..8 {
        sim.spawn_ally("squire", (i as f32 - 4.0) * 0.8, 1.0).expect("ally");
    }
    let mut wave = WaveConfig::new(&["grunt", "brute", "archer", "shaman"], 0.001, enemies);
    wave.spawn_radius = 14.0;
    sim.queue_wave(wave).expect("wave");
    // Let the whole horde arrive and engage
    for _ in 0..120 {
        sim.step(1.0 / 60.0);
    }
    sim
}

fn bench_full_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for count in [100u32, 400].iter() {
        let mut sim = crowded_arena(*count);
        group.bench_function(format!("step_{}_enemies", count), |b| {
            b.iter(|| {
                sim.step(black_box(1.0 / 60.0));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_spatial_hash_queries, bench_spatial_hash_rebuild, bench_full_tick);
criterion_main!(benches);
