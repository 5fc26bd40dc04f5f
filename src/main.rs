//! Command-line front end for borispush simulation runs.
//!
//! An optional leading positional integer selects the universe count
//! (ensemble mode when > 1), with flags for the benchmark, muon-tracker,
//! and stability variants. Exits nonzero on any fatal initialization or
//! compile failure.

use std::path::PathBuf;

use clap::Parser;

use borispush::{GpuContext, SimulationConfig, SimulationDriver};

#[derive(Parser, Debug)]
#[command(name = "borispush")]
#[command(about = "GPU charged-particle swarm simulation (Boris pusher)")]
struct Args {
    /// Universe count for ensemble mode (> 1), or the muon count when
    /// --muon is given.
    count: Option<u32>,

    /// Fixed 100M-particle / 1-universe / 10k-step throughput benchmark,
    /// synchronized every step.
    #[arg(long)]
    benchmark: bool,

    /// Relativistic spin-orbit muon tracker (count positional overrides
    /// the 1M-muon default).
    #[arg(long)]
    muon: bool,

    /// Energy-conservation stability test: 1024 particles, 100k steps,
    /// dt = 0.01, pure B = (0,0,1).
    #[arg(long)]
    stability: bool,

    /// Override the step count of the selected mode.
    #[arg(long)]
    steps: Option<u32>,

    /// Override the synchronization cadence (steps between blocking
    /// checkpoints).
    #[arg(long)]
    sync_interval: Option<u32>,

    /// External WGSL kernel source overriding the built-in kernels.
    #[arg(long)]
    kernel: Option<PathBuf>,

    /// Seed for ensemble shim generation.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Full width of the uniform shim prior (components drawn from
    /// ±spread/2).
    #[arg(long, default_value_t = 0.1)]
    shim_spread: f32,
}

fn select_config(args: &Args) -> SimulationConfig {
    let mut config = if args.benchmark {
        SimulationConfig::benchmark()
    } else if args.muon {
        SimulationConfig::spin_tracker(args.count.unwrap_or(1_000_000))
    } else if args.stability {
        SimulationConfig::stability_test()
    } else {
        match args.count {
            Some(universes) if universes > 1 => SimulationConfig::ensemble(universes),
            _ => SimulationConfig::single_swarm(),
        }
    };

    if let Some(steps) = args.steps {
        config.steps = steps;
    }
    if let Some(interval) = args.sync_interval {
        config.sync_interval = interval.max(1);
    }
    config.kernel_path = args.kernel.clone();
    config.seed = args.seed;
    config.shim_spread = args.shim_spread;
    config
}

fn run(args: &Args) -> Result<(), borispush::SimError> {
    let config = select_config(args);

    println!("--- borispush: {:?} ---", config.mode);
    println!(
        "Particles: {} | Universes: {} | Steps: {} | dt: {:e} | Sync every {} steps",
        config.total_particles(),
        config.universes,
        config.steps,
        config.dt,
        config.sync_interval
    );

    let ctx = GpuContext::acquire()?;
    ctx.print_info();

    let mut driver = SimulationDriver::new(&ctx, config)?;
    let report = driver.run()?;
    report.print_summary();
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
