//! # borispush: GPU charged-particle swarm simulation
//!
//! Drives large-population charged-particle simulations on a GPU via
//! wgpu compute. The host side prepares particle and field state in
//! device buffers, compiles a WGSL integration kernel (Boris pusher),
//! dispatches it across the population for a configured number of
//! timesteps, and reports throughput and — in the stability mode —
//! energy-conservation drift.
//!
//! ## Simulation modes
//!
//! - **Single swarm**: one population under uniform B/E fields, long
//!   throughput-oriented runs synchronized every 10k steps.
//! - **Ensemble**: N independent "universes" evolved side by side, each
//!   under the base fields plus a per-universe perturbation ("shim")
//!   drawn once from a seeded uniform prior — the parameter sweep used
//!   for approximate-Bayesian calibration.
//! - **Benchmark**: fixed 100M-particle workload synchronized every
//!   step for unbiased rate measurement.
//! - **Spin tracker**: relativistic spin-orbit coupled pusher in a
//!   muon g-2 storage-ring geometry.
//! - **Stability test**: 1024 particles in a pure magnetic field; the
//!   Boris rotation preserves kinetic energy, so the measured relative
//!   drift bounds the integrator's FP32 round-off.
//!
//! ## Basic usage
//!
//! ```no_run
//! use borispush::{GpuContext, SimulationConfig, SimulationDriver};
//!
//! let ctx = GpuContext::acquire()?;
//! let mut driver = SimulationDriver::new(&ctx, SimulationConfig::stability_test())?;
//! let report = driver.run()?;
//! report.print_summary();
//! # Ok::<(), borispush::SimError>(())
//! ```
//!
//! ## Dispatch discipline
//!
//! Submission is asynchronous; the host blocks only at the configured
//! synchronization cadence and at the final drain. Exactly one writer
//! (the device, serialized by its queue) and one reader (the host, only
//! after a full drain) ever touch the particle buffer — the driver's
//! sync ledger enforces and instruments that alternation.
//!
//! Kernels are replaceable: any WGSL file honoring a mode's binding
//! contract can be supplied via `SimulationConfig::kernel_path`. The
//! dispatch width follows the source's declared `@workgroup_size`, so
//! external kernels may use a different width than the built-in 256 as
//! long as they linearize their invocation index with it.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod boris;
pub mod buffers;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod driver;
pub mod ensemble;
pub mod error;
pub mod kernels;
pub mod types;

pub use config::{Mode, SimulationConfig, SlotKind, WORKGROUP_SIZE};
pub use context::{DeviceCaps, GpuContext};
pub use driver::{EnergyReport, RunReport, SimulationDriver, SyncLedger};
pub use error::SimError;
pub use types::{FieldVector, ParticleState, ShimParams, SpinParticleState, StepParams};
