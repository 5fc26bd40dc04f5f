//! Simulation configuration: modes, per-mode kernel selection, buffer
//! binding tables, and synchronization cadence defaults.
//!
//! A [`SimulationConfig`] is immutable after construction; the driver
//! consumes it together with the mode's binding table rather than
//! carrying per-variant control flow.

use std::path::PathBuf;

use crate::types::FieldVector;

/// Workgroup size baked into every built-in kernel's `@workgroup_size`.
pub const WORKGROUP_SIZE: u32 = 256;

/// Simulation variant. Selects the kernel entry point, the buffer
/// binding table, and the default workload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Long single-swarm electromagnetic pusher run.
    SingleSwarm,
    /// Multi-universe ensemble with per-universe field shims.
    Ensemble,
    /// Fixed 100M-particle throughput benchmark, synchronized every step
    /// for an unbiased rate measurement.
    Benchmark,
    /// Relativistic spin-orbit coupled tracker (muon g-2 geometry).
    SpinTracker,
    /// Energy-conservation diagnostic harness (Boris integrator).
    StabilityTest,
}

/// What a fixed binding slot holds, in slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Particle state array, read-write storage.
    StateRw,
    /// Per-universe shim array, read-only storage.
    ShimRead,
    /// A field vector (B or E), uniform.
    FieldUniform,
    /// Step parameters (dt + universe stride), uniform.
    StepUniform,
}

/// slot0=state, slot1=B, slot2=E, slot3=step.
const FOUR_SLOT: &[SlotKind] = &[
    SlotKind::StateRw,
    SlotKind::FieldUniform,
    SlotKind::FieldUniform,
    SlotKind::StepUniform,
];

/// slot0=state, slot1=shims, slot2=B, slot3=E, slot4=step.
const FIVE_SLOT: &[SlotKind] = &[
    SlotKind::StateRw,
    SlotKind::ShimRead,
    SlotKind::FieldUniform,
    SlotKind::FieldUniform,
    SlotKind::StepUniform,
];

impl Mode {
    /// Kernel entry point required by this mode.
    pub fn entry_point(self) -> &'static str {
        match self {
            Mode::SingleSwarm => "plasma_kernel",
            Mode::Ensemble => "plasma_multi_kernel",
            Mode::Benchmark => "plasma_bench_kernel",
            Mode::SpinTracker => "muon_g2_kernel",
            Mode::StabilityTest => "boris_kernel",
        }
    }

    /// Built-in WGSL source containing this mode's entry point.
    ///
    /// The ensemble layout lives in its own file because WGSL forbids
    /// two resource variables sharing a `@group`/`@binding` pair within
    /// one module, and slot 1 differs between layouts.
    pub fn builtin_source(self) -> &'static str {
        match self {
            Mode::SingleSwarm | Mode::Benchmark | Mode::StabilityTest => {
                include_str!("shaders/plasma.wgsl")
            }
            Mode::Ensemble => include_str!("shaders/plasma_multi.wgsl"),
            Mode::SpinTracker => include_str!("shaders/muon_g2.wgsl"),
        }
    }

    /// Fixed buffer binding table for this mode, in slot order.
    pub fn slots(self) -> &'static [SlotKind] {
        match self {
            Mode::Ensemble => FIVE_SLOT,
            _ => FOUR_SLOT,
        }
    }

    /// Whether particle state carries a spin vector.
    pub fn uses_spin(self) -> bool {
        self == Mode::SpinTracker
    }

    /// Whether the mode binds a shim buffer.
    pub fn uses_shims(self) -> bool {
        self == Mode::Ensemble
    }

    /// Default synchronization cadence in steps.
    ///
    /// Benchmark mode synchronizes every step for unbiased rates; the
    /// long swarm run amortizes submission overhead over 10k steps;
    /// ensemble and tracker runs check in every 100.
    pub fn default_sync_interval(self) -> u32 {
        match self {
            Mode::SingleSwarm | Mode::StabilityTest => 10_000,
            Mode::Ensemble | Mode::SpinTracker => 100,
            Mode::Benchmark => 1,
        }
    }
}

/// Complete, immutable description of one simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Simulation variant.
    pub mode: Mode,
    /// Number of independent universes (1 outside ensemble mode).
    pub universes: u32,
    /// Particles evolved per universe.
    pub particles_per_universe: u32,
    /// Number of timesteps to dispatch.
    pub steps: u32,
    /// Integration timestep.
    pub dt: f32,
    /// Synchronization cadence in steps.
    pub sync_interval: u32,
    /// Uniform magnetic field.
    pub b_field: FieldVector,
    /// Uniform electric field.
    pub e_field: FieldVector,
    /// Half-width × 2 of the shim prior: components are drawn uniformly
    /// from `[-shim_spread/2, +shim_spread/2]`.
    pub shim_spread: f32,
    /// Seed for shim generation.
    pub seed: u64,
    /// Optional extra device allocation held for the run's duration.
    /// Off by default; the workload itself is always sized exactly.
    pub scratch_pool_bytes: Option<u64>,
    /// Optional external kernel source path overriding the built-in.
    pub kernel_path: Option<PathBuf>,
}

impl SimulationConfig {
    /// Total particles across all universes.
    pub fn total_particles(&self) -> u64 {
        u64::from(self.universes) * u64::from(self.particles_per_universe)
    }

    /// Total particle updates over the whole run.
    pub fn total_updates(&self) -> u64 {
        self.total_particles() * u64::from(self.steps)
    }

    fn base(mode: Mode) -> Self {
        Self {
            mode,
            universes: 1,
            particles_per_universe: 1_000_000,
            steps: 10_000,
            dt: 0.01,
            sync_interval: mode.default_sync_interval(),
            b_field: FieldVector::new(0.0, 0.0, 1.0),
            e_field: FieldVector::ZERO,
            shim_spread: 0.1,
            seed: 0,
            scratch_pool_bytes: None,
            kernel_path: None,
        }
    }

    /// Long single-swarm run: 1M particles, 1.2M steps.
    pub fn single_swarm() -> Self {
        Self {
            steps: 1_200_000,
            ..Self::base(Mode::SingleSwarm)
        }
    }

    /// Multi-universe ensemble: `universes` × 100k particles, shims
    /// drawn from the default ±0.05 prior.
    pub fn ensemble(universes: u32) -> Self {
        Self {
            universes,
            particles_per_universe: 100_000,
            ..Self::base(Mode::Ensemble)
        }
    }

    /// Throughput benchmark: 100M particles, one universe, 10k steps,
    /// synchronized every step.
    pub fn benchmark() -> Self {
        Self {
            particles_per_universe: 100_000_000,
            ..Self::base(Mode::Benchmark)
        }
    }

    /// Spin-orbit tracker: muon g-2 ring geometry, 0.75 ns steps in a
    /// 1.45 T storage field.
    pub fn spin_tracker(muons: u32) -> Self {
        Self {
            particles_per_universe: muons,
            dt: 0.75e-9,
            b_field: FieldVector::new(0.0, 0.0, 1.45),
            ..Self::base(Mode::SpinTracker)
        }
    }

    /// Energy-conservation harness: 1024 particles, 100k steps at
    /// dt=0.01 in a pure B=(0,0,1) field.
    pub fn stability_test() -> Self {
        Self {
            particles_per_universe: 1024,
            steps: 100_000,
            ..Self::base(Mode::StabilityTest)
        }
    }
}
