//! Multi-universe ensemble demo — 16 universes with per-universe field
//! shim offsets, all advanced by a single kernel dispatch per step.
//!
//! Run with:
//!   cargo run --release --example ensemble

use borispush::diagnostics::mean_kinetic_energy;
use borispush::{GpuContext, SimulationConfig, SimulationDriver};

fn main() {
    let ctx = GpuContext::acquire().expect("GPU initialization failed");
    ctx.print_info();

    let mut config = SimulationConfig::ensemble(16);
    config.particles_per_universe = 10_000;
    config.steps = 10_000;
    config.shim_spread = 0.2;
    config.seed = 42;

    let per = config.particles_per_universe as usize;
    println!(
        "Ensemble: {} universes x {} particles, {} steps, shim spread {}",
        config.universes, config.particles_per_universe, config.steps, config.shim_spread
    );

    let mut driver = SimulationDriver::new(&ctx, config).expect("driver setup failed");
    let report = driver.run().expect("simulation failed");
    report.print_summary();

    let particles = driver.final_particles().expect("readback failed");

    println!("\nPer-universe mean kinetic energy:");
    println!("{:<10} {:<14}", "Universe", "Mean KE");
    println!("{}", "-".repeat(24));
    for (u, chunk) in particles.chunks(per).enumerate() {
        println!("{:<10} {:<14.6}", u, mean_kinetic_energy(chunk));
    }
}
