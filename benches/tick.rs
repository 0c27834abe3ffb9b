//! Tick benchmarks for the flappy server
//!
//! Measures a single simulation tick and ticking many sessions back to back.
//!
//! Run with: cargo bench --bench tick

use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flappy_server::config::SimulationConfig;
use flappy_server::game::simulation::Simulation;
use flappy_server::session::handle::{Session, SessionTimings};
use flappy_server::session::SessionId;

/// A launched simulation that is still scrolling
fn flying_simulation(seed: u64) -> Simulation {
    let mut sim = Simulation::with_seed(SimulationConfig::default(), seed)
        .expect("default config is valid");
    sim.register_jump();
    sim
}

fn timings() -> SessionTimings {
    SessionTimings {
        timeout: Duration::from_secs(3600),
        sample_window: Duration::from_secs(3),
        dead_screen_delay: Duration::from_secs(10),
    }
}

/// Benchmark one simulation tick, relaunching whenever the body dies
fn bench_simulation_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    group.sample_size(100);

    let mut sim = flying_simulation(1);
    let mut seed = 1;
    group.bench_function("tick", |b| {
        b.iter(|| {
            if sim.bird().is_dead() {
                seed += 1;
                sim = flying_simulation(seed);
            }
            // Keep it airborne
            if sim.bird().velocity > 0.1 {
                sim.register_jump();
            }
            black_box(sim.tick());
        })
    });

    let sim = flying_simulation(2);
    group.bench_function("snapshot", |b| {
        b.iter(|| black_box(sim.snapshot()));
    });
    group.finish();
}

/// Benchmark ticking many sessions through their locks
fn bench_sessions(c: &mut Criterion) {
    let mut group = c.benchmark_group("sessions");
    group.sample_size(30);

    for count in [100, 1000, 5000] {
        let start = Instant::now();
        let sessions: Vec<Session> = (0..count)
            .map(|i| {
                let sim = flying_simulation(i as u64);
                Session::new(SessionId::new(format!("bench-{i}")), sim, timings(), start)
            })
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("tick_all", count), &count, |b, _| {
            b.iter(|| {
                let now = Instant::now();
                for session in &sessions {
                    black_box(session.tick(now));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_simulation_tick, bench_sessions);

criterion_main!(benches);
