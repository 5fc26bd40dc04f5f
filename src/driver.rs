//! The timestep dispatch loop.
//!
//! One parameterized driver serves all five simulation modes: per step
//! it encodes a single compute pass over the whole population, submits
//! it asynchronously, and blocks only at the configured synchronization
//! cadence. Synchronizing every step serializes the host behind the
//! device and caps throughput; never synchronizing lets submitted work
//! grow without bound and defeats timely progress reporting — the
//! cadence is the knob between the two.
//!
//! Host reads of particle memory are gated by a [`SyncLedger`]: exactly
//! one writer (the device, serialized by its queue) and one reader (the
//! host, only after a full drain) ever touch the state buffer, and the
//! ledger makes that alternation checkable.

use std::time::Instant;

use crate::buffers::StateBuffers;
use crate::config::{Mode, SimulationConfig};
use crate::context::GpuContext;
use crate::diagnostics;
use crate::ensemble;
use crate::error::SimError;
use crate::kernels::{read_kernel_source, KernelLibrary, KernelPipeline};

/// Tracks submitted-but-unsynchronized device work.
///
/// The host may read particle memory only while no submitted work is
/// pending; [`SyncLedger::host_read_allowed`] is that predicate and the
/// driver consults it before every readback.
#[derive(Debug, Default)]
pub struct SyncLedger {
    pending: u64,
    synced_total: u64,
}

impl SyncLedger {
    /// A fresh ledger with nothing submitted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one asynchronous submission.
    pub fn record_submit(&mut self) {
        self.pending += 1;
    }

    /// Record a full queue synchronization.
    pub fn record_sync(&mut self) {
        self.synced_total += self.pending;
        self.pending = 0;
    }

    /// Steps submitted since the last synchronization.
    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Steps known to have completed on the device.
    pub fn synced_total(&self) -> u64 {
        self.synced_total
    }

    /// Whether a host read of device-written memory is safe right now.
    pub fn host_read_allowed(&self) -> bool {
        self.pending == 0
    }
}

/// Split a linear workgroup count across a 2D grid when it exceeds the
/// per-dimension dispatch limit.
///
/// Returns `(x, y)` with `x * y >= groups` and both within `max_per_dim`.
/// Kernels linearize with `num_workgroups`, so oversubscription in the
/// last row is handled by their bounds check.
pub fn split_workgroups(groups: u64, max_per_dim: u32) -> (u32, u32) {
    let max = u64::from(max_per_dim.max(1));
    if groups <= max {
        return (groups.max(1) as u32, 1);
    }
    let x = max;
    let y = groups.div_ceil(x);
    debug_assert!(
        y <= max,
        "a 2D grid at {} groups per dimension cannot cover {} groups",
        max_per_dim,
        groups
    );
    (x as u32, y.min(max) as u32)
}

/// Throughput window between progress lines.
///
/// Progress is reported at synchronization checkpoints, but per-step
/// checkpoints would flood the console. A line is emitted only once a
/// full stride (1000 steps, or one sync interval if longer) has
/// accumulated since the previous line; step-index divisibility plays
/// no part, so an odd cadence like every 7 steps still reports near
/// every 1000th step.
#[derive(Debug)]
struct ProgressMeter {
    stride: u64,
    window_start: Instant,
    window_steps: u64,
}

impl ProgressMeter {
    fn new(sync_interval: u32) -> Self {
        Self {
            stride: u64::from(sync_interval.max(1000)),
            window_start: Instant::now(),
            window_steps: 0,
        }
    }

    fn note_step(&mut self) {
        self.window_steps += 1;
    }

    /// Close the window if a full stride has accumulated, returning the
    /// step count and elapsed seconds it covered.
    fn take_window(&mut self) -> Option<(u64, f64)> {
        if self.window_steps < self.stride {
            return None;
        }
        let elapsed = self.window_start.elapsed().as_secs_f64();
        let steps = std::mem::take(&mut self.window_steps);
        self.window_start = Instant::now();
        Some((steps, elapsed))
    }
}

/// Energy figures from the stability harness.
#[derive(Debug, Clone, Copy)]
pub struct EnergyReport {
    /// Population-mean kinetic energy before the first step.
    pub initial: f64,
    /// Population-mean kinetic energy after the final drain.
    pub final_energy: f64,
    /// `(final - initial) / initial`.
    pub relative_drift: f64,
}

/// End-of-run summary.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Mode that was executed.
    pub mode: Mode,
    /// Particles across all universes.
    pub total_particles: u64,
    /// Steps dispatched.
    pub steps: u32,
    /// Wall-clock duration of the loop including the drain.
    pub elapsed_s: f64,
    /// Mean particle-updates per second over the whole run.
    pub updates_per_sec: f64,
    /// Energy diagnostics (stability mode only).
    pub energy: Option<EnergyReport>,
}

impl RunReport {
    /// Print the final report lines to the console.
    pub fn print_summary(&self) {
        println!(
            "Complete in {:.3}s | {:.3} Billion particle-updates/s",
            self.elapsed_s,
            self.updates_per_sec / 1e9
        );
        if let Some(e) = &self.energy {
            println!("Initial Energy: {:.10}", e.initial);
            println!("Final Energy:   {:.10}", e.final_energy);
            println!("Total Relative Drift: {:e}", e.relative_drift);
        }
    }
}

/// Drives the full dispatch-and-synchronization loop for one run.
pub struct SimulationDriver<'a> {
    ctx: &'a GpuContext,
    config: SimulationConfig,
    buffers: StateBuffers,
    pipeline: KernelPipeline,
    bind_group: wgpu::BindGroup,
    ledger: SyncLedger,
}

impl<'a> SimulationDriver<'a> {
    /// Prepare a run: generate shims, allocate and initialize buffers,
    /// compile the kernel source, resolve the mode's entry point, and
    /// assemble the bind group against the mode's slot table.
    ///
    /// # Errors
    /// Any of the fatal setup errors of [`SimError`]: source read,
    /// compile, entry-point resolution, pipeline build, or allocation.
    pub fn new(ctx: &'a GpuContext, config: SimulationConfig) -> Result<Self, SimError> {
        let mode = config.mode;

        let shims = if mode.uses_shims() {
            ensemble::generate_shims(config.universes, config.shim_spread, config.seed)
        } else {
            Vec::new()
        };

        let buffers = StateBuffers::create(ctx, &config, &shims)?;

        let source = match &config.kernel_path {
            Some(path) => read_kernel_source(path)?,
            None => mode.builtin_source().to_owned(),
        };
        let library = KernelLibrary::compile(ctx, &source, mode.entry_point())?;
        let pipeline = library.resolve(ctx, mode.entry_point(), mode.slots())?;

        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .slot_order(mode)
            .into_iter()
            .enumerate()
            .map(|(i, buffer)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(mode.entry_point()),
            layout: &pipeline.bind_group_layout,
            entries: &entries,
        });

        Ok(Self {
            ctx,
            config,
            buffers,
            pipeline,
            bind_group,
            ledger: SyncLedger::new(),
        })
    }

    /// Run the configured number of steps and return the final report.
    ///
    /// Progress lines (step index, total, instantaneous throughput) are
    /// printed at synchronization checkpoints once a full report stride
    /// has accumulated; the stability mode additionally reports the
    /// running energy drift.
    ///
    /// # Errors
    /// [`SimError::Readback`] if a diagnostic readback fails.
    pub fn run(&mut self) -> Result<RunReport, SimError> {
        let steps = self.config.steps;
        let sync_interval = self.config.sync_interval.max(1);
        let total_particles = self.buffers.count;

        // Group count follows the compiled source's workgroup size, not
        // a fixed constant: an external kernel may be narrower than the
        // built-ins and must still cover the whole population.
        let groups = total_particles.div_ceil(u64::from(self.pipeline.workgroup_size));
        let (wg_x, wg_y) = split_workgroups(groups, self.ctx.caps.max_workgroups_per_dim);

        let mut meter = ProgressMeter::new(sync_interval);

        let baseline_energy = if self.config.mode == Mode::StabilityTest {
            // Initial conditions are host-built, so the baseline needs
            // no readback: unit velocity along x gives exactly 0.5.
            let initial = crate::buffers::initial_particles(total_particles);
            Some(diagnostics::mean_kinetic_energy(&initial))
        } else {
            None
        };

        let run_start = Instant::now();

        for step in 0..steps {
            // Transient submission resources are scoped to this
            // iteration; the encoder is consumed by submit.
            let mut encoder = self
                .ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Step Encoder"),
                });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Push Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipeline.pipeline);
                pass.set_bind_group(0, &self.bind_group, &[]);
                pass.dispatch_workgroups(wg_x, wg_y, 1);
            }
            self.ctx.queue.submit(Some(encoder.finish()));
            self.ledger.record_submit();
            meter.note_step();

            if (step + 1) % sync_interval == 0 {
                self.synchronize();

                if step + 1 < steps {
                    if let Some((win_steps, elapsed)) = meter.take_window() {
                        let rate = total_particles as f64 * win_steps as f64 / elapsed.max(1e-9);
                        println!(
                            "[Step {}/{}] {:.3} B particle-updates/s",
                            step + 1,
                            steps,
                            rate / 1e9
                        );

                        if let Some(e0) = baseline_energy {
                            let e = self.mean_energy()?;
                            println!(
                                "[Step {}/{}] Rel. Energy Error: {:e}",
                                step + 1,
                                steps,
                                diagnostics::relative_drift(e, e0)
                            );
                        }
                    }
                }
            }
        }

        // Drain: guarantee all kernel side effects are host-visible
        // before final diagnostics.
        if !self.ledger.host_read_allowed() {
            self.synchronize();
        }

        let elapsed_s = run_start.elapsed().as_secs_f64();
        let updates = total_particles * u64::from(steps);
        let energy = match baseline_energy {
            Some(e0) => {
                let ef = self.mean_energy()?;
                Some(EnergyReport {
                    initial: e0,
                    final_energy: ef,
                    relative_drift: diagnostics::relative_drift(ef, e0),
                })
            }
            None => None,
        };

        Ok(RunReport {
            mode: self.config.mode,
            total_particles,
            steps,
            elapsed_s,
            updates_per_sec: updates as f64 / elapsed_s.max(1e-9),
            energy,
        })
    }

    /// Block until all submitted work completes and update the ledger.
    fn synchronize(&mut self) {
        self.ctx.wait_idle();
        self.ledger.record_sync();
    }

    /// Population-mean kinetic energy from a state readback.
    ///
    /// Only called while the ledger shows no pending work; the debug
    /// assertion documents the single-writer/reader alternation.
    fn mean_energy(&self) -> Result<f64, SimError> {
        debug_assert!(
            self.ledger.host_read_allowed(),
            "host readback without a preceding full synchronization"
        );
        let particles = self.buffers.read_particles(self.ctx)?;
        Ok(diagnostics::mean_kinetic_energy(&particles))
    }

    /// Read the final particle population (after [`run`](Self::run)).
    ///
    /// # Errors
    /// [`SimError::Readback`] on mapping failure.
    pub fn final_particles(&self) -> Result<Vec<crate::types::ParticleState>, SimError> {
        debug_assert!(self.ledger.host_read_allowed());
        self.buffers.read_particles(self.ctx)
    }

    /// Read the final spin-tracker population (after [`run`](Self::run)).
    ///
    /// # Errors
    /// [`SimError::Readback`] on mapping failure.
    pub fn final_spin_particles(
        &self,
    ) -> Result<Vec<crate::types::SpinParticleState>, SimError> {
        debug_assert!(self.ledger.host_read_allowed());
        self.buffers.read_spin_particles(self.ctx)
    }

    /// The ledger, for inspection by harnesses.
    pub fn ledger(&self) -> &SyncLedger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── Sync ledger: single-writer/reader alternation ─────────────────

    #[test]
    fn host_read_forbidden_while_work_pending() {
        let mut ledger = SyncLedger::new();
        assert!(ledger.host_read_allowed());

        ledger.record_submit();
        ledger.record_submit();
        assert!(!ledger.host_read_allowed());
        assert_eq!(ledger.pending(), 2);

        ledger.record_sync();
        assert!(ledger.host_read_allowed());
        assert_eq!(ledger.synced_total(), 2);
    }

    #[test]
    fn ledger_accumulates_across_checkpoints() {
        let mut ledger = SyncLedger::new();
        for _ in 0..10_000 {
            ledger.record_submit();
        }
        ledger.record_sync();
        for _ in 0..5 {
            ledger.record_submit();
        }
        assert_eq!(ledger.pending(), 5);
        ledger.record_sync();
        assert_eq!(ledger.synced_total(), 10_005);
        assert!(ledger.host_read_allowed());
    }

    // ─── Workgroup splitting ───────────────────────────────────────────

    #[test]
    fn small_dispatch_stays_one_dimensional() {
        assert_eq!(split_workgroups(1, 65_535), (1, 1));
        assert_eq!(split_workgroups(4, 65_535), (4, 1));
        assert_eq!(split_workgroups(65_535, 65_535), (65_535, 1));
    }

    #[test]
    fn wide_dispatch_splits_over_two_dimensions() {
        // 100M particles / 256 per group = 390,625 groups
        let groups = 100_000_000u64.div_ceil(256);
        let (x, y) = split_workgroups(groups, 65_535);
        assert!(x <= 65_535 && y <= 65_535);
        assert!(u64::from(x) * u64::from(y) >= groups);
    }

    #[test]
    fn zero_particles_still_dispatches_one_group() {
        assert_eq!(split_workgroups(0, 65_535), (1, 1));
    }

    #[test]
    fn split_covers_exactly_at_boundary() {
        let (x, y) = split_workgroups(65_536, 65_535);
        assert!(u64::from(x) * u64::from(y) >= 65_536);
        assert_eq!(x, 65_535);
        assert_eq!(y, 2);
    }

    #[test]
    fn split_covers_full_grid_capacity() {
        let max = 65_535u32;
        let groups = u64::from(max) * u64::from(max);
        let (x, y) = split_workgroups(groups, max);
        assert_eq!((x, y), (max, max));
    }

    #[test]
    #[should_panic(expected = "cannot cover")]
    fn grid_overflow_is_detected_in_debug() {
        let max = 65_535u32;
        let groups = u64::from(max) * u64::from(max) + 1;
        let _ = split_workgroups(groups, max);
    }

    // ─── Progress reporting cadence ────────────────────────────────────

    #[test]
    fn odd_sync_cadence_still_reports_near_the_stride() {
        // Sync every 7 steps: the first checkpoint at or past 1000
        // accumulated steps must report, not the lcm of 7 and 1000.
        let mut meter = ProgressMeter::new(7);
        let mut reported_at = Vec::new();
        for step in 1..=3_000u64 {
            meter.note_step();
            if step % 7 == 0 {
                if let Some((steps, _)) = meter.take_window() {
                    reported_at.push((step, steps));
                }
            }
        }
        assert_eq!(reported_at[0], (1001, 1001));
        assert_eq!(reported_at[1], (2002, 1001));
    }

    #[test]
    fn coarse_sync_reports_every_checkpoint() {
        let mut meter = ProgressMeter::new(10_000);
        for _ in 0..10_000 {
            meter.note_step();
        }
        assert!(meter.take_window().is_some());
        assert!(meter.take_window().is_none());
    }
}
