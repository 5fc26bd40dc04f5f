//! Device buffer allocation, initialization, and readback.
//!
//! All buffers are created once before the step loop and dropped once
//! after the final drain; nothing is resized or reallocated mid-run.
//! Allocations are sized to the workload and validated against the
//! device's reported maximums before any device call; headroom exists
//! only as the explicit `scratch_pool_bytes` configuration option.

use bytemuck::Pod;
use wgpu::util::DeviceExt;

use crate::config::{Mode, SimulationConfig, SlotKind};
use crate::context::{DeviceCaps, GpuContext};
use crate::error::SimError;
use crate::types::{ParticleState, ShimParams, SpinParticleState, StepParams};

/// Speed of light [m/s], for the tracker's magic-momentum initial state.
const C_LIGHT: f64 = 299_792_458.0;

/// Byte size of one particle record for the given mode.
pub fn state_stride(mode: Mode) -> u64 {
    if mode.uses_spin() {
        std::mem::size_of::<SpinParticleState>() as u64
    } else {
        std::mem::size_of::<ParticleState>() as u64
    }
}

/// Total particle-buffer byte size for a configuration:
/// `universes × particles_per_universe × state size`.
pub fn particle_buffer_bytes(config: &SimulationConfig) -> u64 {
    config.total_particles() * state_stride(config.mode)
}

/// Validate a requested allocation against device capacity.
///
/// Storage buffers must both fit in a single allocation and be bindable
/// as one storage binding, so the effective ceiling is the smaller of
/// the two limits.
///
/// # Errors
/// [`SimError::Allocation`] when the request exceeds the ceiling. No
/// device state is touched on the failure path.
pub fn check_allocation(requested: u64, caps: &DeviceCaps) -> Result<(), SimError> {
    let max = caps.max_buffer_size.min(caps.max_storage_binding);
    if requested > max {
        return Err(SimError::Allocation { requested, max });
    }
    Ok(())
}

/// Deterministic initial conditions for the pusher modes: every
/// particle at the origin with unit velocity along x, so the population
/// mean kinetic energy starts at exactly 0.5.
pub fn initial_particles(count: u64) -> Vec<ParticleState> {
    let state = ParticleState {
        pos: [0.0; 4],
        vel: [1.0, 0.0, 0.0, 0.0],
    };
    vec![state; count as usize]
}

/// Deterministic initial conditions for the spin tracker: muons on the
/// storage-ring radius at magic momentum (beta ≈ 0.9994), spin aligned
/// with the momentum.
pub fn initial_spin_particles(count: u64) -> Vec<SpinParticleState> {
    let v_magic = (C_LIGHT * 0.9994) as f32;
    let state = SpinParticleState {
        pos: [7.112, 0.0, 0.0, 0.0],
        vel: [0.0, v_magic, 0.0, 0.0],
        spin: [0.0, 1.0, 0.0, 0.0],
    };
    vec![state; count as usize]
}

/// The simulation's device-resident memory regions.
///
/// Owns every buffer a kernel binds; slot order is dictated by the
/// mode's binding table and produced by [`StateBuffers::slot_order`].
pub struct StateBuffers {
    /// Particle state array (read-write storage, readback source).
    pub state: wgpu::Buffer,
    /// Per-universe shim array (ensemble mode only).
    pub shims: Option<wgpu::Buffer>,
    /// Uniform B field.
    pub b_field: wgpu::Buffer,
    /// Uniform E field.
    pub e_field: wgpu::Buffer,
    /// Step parameters uniform.
    pub step: wgpu::Buffer,
    /// Optional headroom allocation, held but never bound.
    #[allow(dead_code)]
    scratch: Option<wgpu::Buffer>,
    /// Particle records in the state buffer.
    pub count: u64,
    /// Mode the buffers were created for; gates typed readback.
    mode: Mode,
}

impl StateBuffers {
    /// Allocate and initialize all buffers for a run.
    ///
    /// `shims` must hold exactly one record per universe in ensemble
    /// mode and is ignored otherwise.
    ///
    /// # Errors
    /// [`SimError::Allocation`] if the particle buffer or the scratch
    /// pool exceeds device capacity.
    pub fn create(
        ctx: &GpuContext,
        config: &SimulationConfig,
        shims: &[ShimParams],
    ) -> Result<Self, SimError> {
        let state_bytes = particle_buffer_bytes(config);
        check_allocation(state_bytes, &ctx.caps)?;

        let device = &ctx.device;
        let count = config.total_particles();

        let state = if config.mode.uses_spin() {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle State"),
                contents: bytemuck::cast_slice(&initial_spin_particles(count)),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            })
        } else {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle State"),
                contents: bytemuck::cast_slice(&initial_particles(count)),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            })
        };

        let shims = if config.mode.uses_shims() {
            debug_assert_eq!(shims.len() as u32, config.universes);
            Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Universe Shims"),
                contents: bytemuck::cast_slice(shims),
                usage: wgpu::BufferUsages::STORAGE,
            }))
        } else {
            None
        };

        let b_field = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("B Field"),
            contents: bytemuck::bytes_of(&config.b_field),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let e_field = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("E Field"),
            contents: bytemuck::bytes_of(&config.e_field),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let step_params = StepParams {
            dt: config.dt,
            particles_per_universe: config.particles_per_universe,
            _pad: [0; 2],
        };
        let step = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Step Params"),
            contents: bytemuck::bytes_of(&step_params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let scratch = match config.scratch_pool_bytes {
            Some(bytes) => {
                check_allocation(bytes, &ctx.caps)?;
                Some(device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Scratch Pool"),
                    size: bytes,
                    usage: wgpu::BufferUsages::STORAGE,
                    mapped_at_creation: false,
                }))
            }
            None => None,
        };

        Ok(Self {
            state,
            shims,
            b_field,
            e_field,
            step,
            scratch,
            count,
            mode: config.mode,
        })
    }

    /// Buffers in the mode's fixed slot order, for bind-group assembly.
    pub fn slot_order(&self, mode: Mode) -> Vec<&wgpu::Buffer> {
        let mut order = Vec::with_capacity(mode.slots().len());
        let mut b_bound = false;
        for kind in mode.slots() {
            match kind {
                SlotKind::StateRw => order.push(&self.state),
                SlotKind::ShimRead => {
                    // Mode tables guarantee a shim slot only appears when
                    // the shim buffer was created.
                    if let Some(shims) = &self.shims {
                        order.push(shims);
                    }
                }
                SlotKind::FieldUniform => {
                    // First field slot is B, second is E.
                    if b_bound {
                        order.push(&self.e_field);
                    } else {
                        order.push(&self.b_field);
                        b_bound = true;
                    }
                }
                SlotKind::StepUniform => order.push(&self.step),
            }
        }
        order
    }

    /// Read the particle state back to the host.
    ///
    /// Valid only after a full queue synchronization; the driver
    /// enforces that ordering through its sync ledger.
    ///
    /// # Errors
    /// [`SimError::Readback`] on mapping failure, or if the buffers
    /// hold 48-byte spin records that must not be reinterpreted as
    /// 32-byte plain state.
    pub fn read_particles(&self, ctx: &GpuContext) -> Result<Vec<ParticleState>, SimError> {
        if self.mode.uses_spin() {
            return Err(SimError::Readback {
                message: "state buffer holds spin records; use read_spin_particles".to_owned(),
            });
        }
        read_buffer(&ctx.device, &ctx.queue, &self.state, self.count as usize)
    }

    /// Read spin-tracker state back to the host.
    ///
    /// # Errors
    /// [`SimError::Readback`] on mapping failure, or if the buffers
    /// hold plain 32-byte records with no spin component.
    pub fn read_spin_particles(
        &self,
        ctx: &GpuContext,
    ) -> Result<Vec<SpinParticleState>, SimError> {
        if !self.mode.uses_spin() {
            return Err(SimError::Readback {
                message: "state buffer holds plain records; use read_particles".to_owned(),
            });
        }
        read_buffer(&ctx.device, &ctx.queue, &self.state, self.count as usize)
    }
}

/// Copy a device buffer's first `count` records into host memory.
///
/// Stages the copy through a `MAP_READ` buffer; the storage buffers in
/// this crate are never host-mappable. The caller must have fully
/// drained the queue first (sync ledger at zero pending submissions),
/// otherwise the copy races the in-flight kernel writes it is meant to
/// observe.
///
/// # Errors
/// [`SimError::Readback`] if buffer mapping or the completion channel
/// fails.
pub fn read_buffer<T: Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    count: usize,
) -> Result<Vec<T>, SimError> {
    let byte_size = (count * std::mem::size_of::<T>()) as u64;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Staging Buffer"),
        size: byte_size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, byte_size);
    queue.submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    let _ = device.poll(wgpu::Maintain::Wait);
    receiver
        .recv()
        .map_err(|e| SimError::Readback {
            message: format!("channel closed: {}", e),
        })?
        .map_err(|e| SimError::Readback {
            message: format!("buffer mapping failed: {}", e),
        })?;

    let data = slice.get_mapped_range();
    let result: Vec<T> = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldVector;

    fn caps(max_buffer: u64, max_binding: u64) -> DeviceCaps {
        DeviceCaps {
            adapter_name: "test".into(),
            backend: wgpu::Backend::Vulkan,
            unified_memory: false,
            max_buffer_size: max_buffer,
            max_storage_binding: max_binding,
            max_workgroup_invocations: 256,
            max_workgroups_per_dim: 65_535,
        }
    }

    #[test]
    fn buffer_sizing_invariant() {
        let cfg = SimulationConfig::ensemble(100);
        // 100 universes × 100k particles × 32 bytes
        assert_eq!(particle_buffer_bytes(&cfg), 100 * 100_000 * 32);

        let cfg = SimulationConfig::spin_tracker(1000);
        // spin state is 48 bytes
        assert_eq!(particle_buffer_bytes(&cfg), 1000 * 48);
    }

    #[test]
    fn oversize_allocation_fails_cleanly() {
        let caps = caps(1 << 30, 1 << 28);
        // binding limit is the tighter ceiling
        assert!(check_allocation(1 << 28, &caps).is_ok());
        match check_allocation((1 << 28) + 1, &caps) {
            Err(SimError::Allocation { requested, max }) => {
                assert_eq!(requested, (1 << 28) + 1);
                assert_eq!(max, 1 << 28);
            }
            other => panic!("expected Allocation error, got {:?}", other),
        }
    }

    #[test]
    fn initial_particles_have_unit_energy() {
        let particles = initial_particles(1024);
        assert_eq!(particles.len(), 1024);
        for p in &particles {
            let v2: f32 = p.vel[..3].iter().map(|v| v * v).sum();
            assert_eq!(v2, 1.0);
            assert_eq!(p.pos, [0.0; 4]);
        }
    }

    #[test]
    fn initial_muons_at_magic_momentum() {
        let muons = initial_spin_particles(16);
        let beta = muons[0].vel[1] as f64 / C_LIGHT;
        assert!((beta - 0.9994).abs() < 1e-6);
        assert_eq!(muons[0].pos[0], 7.112);
        assert_eq!(muons[0].spin[1], 1.0);
    }

    #[test]
    fn field_vector_bytes() {
        let b = FieldVector::new(0.0, 0.0, 1.0);
        assert_eq!(bytemuck::bytes_of(&b).len(), 16);
    }
}
