use criterion::{black_box, criterion_group, criterion_main, Criterion};

use borispush::boris;
use borispush::buffers::initial_particles;
use borispush::diagnostics::mean_kinetic_energy;
use borispush::ensemble::generate_shims;
use borispush::FieldVector;

fn bench_shim_generation_1k_universes(c: &mut Criterion) {
    c.bench_function("shim_generation_1k_universes", |b| {
        b.iter(|| generate_shims(black_box(1024), 0.1, 42))
    });
}

fn bench_mean_energy_1m_particles(c: &mut Criterion) {
    let particles = initial_particles(1_000_000);

    c.bench_function("mean_energy_1m_particles", |b| {
        b.iter(|| mean_kinetic_energy(black_box(&particles)))
    });
}

fn bench_cpu_boris_4k_particles_100_steps(c: &mut Criterion) {
    let b_field = FieldVector::new(0.0, 0.0, 1.0);
    let e_field = FieldVector::ZERO;

    c.bench_function("cpu_boris_4k_particles_100_steps", |b| {
        b.iter(|| {
            let mut particles = initial_particles(4096);
            boris::advance(&mut particles, &b_field, &e_field, 0.01, black_box(100));
            particles
        })
    });
}

criterion_group!(
    benches,
    bench_shim_generation_1k_universes,
    bench_mean_energy_1m_particles,
    bench_cpu_boris_4k_particles_100_steps
);
criterion_main!(benches);
