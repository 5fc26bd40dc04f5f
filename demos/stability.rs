//! Long-horizon stability demo — 1024 particles gyrating in a uniform
//! magnetic field for 100k Boris steps.
//!
//! Run with:
//!   cargo run --release --example stability

use borispush::{GpuContext, SimulationConfig, SimulationDriver};

fn main() {
    let ctx = GpuContext::acquire().expect("GPU initialization failed");
    ctx.print_info();

    let config = SimulationConfig::stability_test();
    println!(
        "Stability test: {} particles, {} steps, dt = {}",
        config.particles_per_universe, config.steps, config.dt
    );

    let mut driver = SimulationDriver::new(&ctx, config).expect("driver setup failed");
    let report = driver.run().expect("simulation failed");
    report.print_summary();

    if let Some(energy) = report.energy {
        println!("\nEnergy audit:");
        println!("  initial mean KE : {:.9}", energy.initial);
        println!("  final mean KE   : {:.9}", energy.final_energy);
        println!("  relative drift  : {:.3e}", energy.relative_drift);
        if energy.relative_drift.abs() < 1e-4 {
            println!("  verdict         : PASS (Boris pusher holds energy)");
        } else {
            println!("  verdict         : FAIL");
        }
    }
}
