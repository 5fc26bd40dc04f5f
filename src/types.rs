//! GPU-compatible data records for particle simulation.
//!
//! All types use `#[repr(C)]` and `bytemuck` derives for safe GPU buffer
//! casting, with explicit padding to the 16-byte alignment WGSL expects
//! for `vec3`/`vec4` members. State is f32: the kernels run in FP32 and
//! the energy-drift tolerances in the stability mode account for FP32
//! accumulation.

use bytemuck::{Pod, Zeroable};

/// Per-particle state for the electromagnetic pusher kernels.
///
/// Layout: 32 bytes (2 × vec4<f32>). Position and velocity each carry a
/// fourth padding component so the record maps onto WGSL `vec4<f32>`
/// pairs without host-side repacking.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleState {
    /// Position: x, y, z, pad.
    pub pos: [f32; 4],
    /// Velocity: vx, vy, vz, pad.
    pub vel: [f32; 4],
}

/// Per-particle state for the spin-orbit tracker kernel.
///
/// Layout: 48 bytes (3 × vec4<f32>). Extends [`ParticleState`] with a
/// spin vector precessed alongside the momentum.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SpinParticleState {
    /// Position: x, y, z, pad.
    pub pos: [f32; 4],
    /// Velocity: vx, vy, vz, pad.
    pub vel: [f32; 4],
    /// Spin direction: sx, sy, sz, pad.
    pub spin: [f32; 4],
}

/// A uniform field vector (B or E), padded to vec4.
///
/// Written once by the host before dispatch begins; constant for the
/// duration of a run.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FieldVector(pub [f32; 4]);

impl FieldVector {
    /// Build a field vector from its three physical components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self([x, y, z, 0.0])
    }

    /// The zero field.
    pub const ZERO: Self = Self([0.0; 4]);
}

/// Contents of the timestep uniform slot.
///
/// Layout: 16 bytes. Besides `dt`, carries the universe stride so the
/// multi-universe kernel can map a global invocation index to its shim
/// record; single-universe kernels ignore the stride.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct StepParams {
    /// Integration timestep.
    pub dt: f32,
    /// Particles per universe (universe stride for shim indexing).
    pub particles_per_universe: u32,
    /// Padding to 16 bytes.
    pub _pad: [u32; 2],
}

/// Per-universe additive field perturbation ("shim").
///
/// Layout: 32 bytes. One record per universe, generated once at
/// initialization and held fixed through the run; this is the ensemble's
/// only source of inter-universe variation.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ShimParams {
    /// Additive offset to the base B field: x, y, z, pad.
    pub b_offset: [f32; 4],
    /// Additive offset to the base E field: x, y, z, pad.
    pub e_offset: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_state_size() {
        assert_eq!(
            std::mem::size_of::<ParticleState>(),
            32,
            "ParticleState must be 32 bytes for WGSL alignment"
        );
    }

    #[test]
    fn test_spin_particle_state_size() {
        assert_eq!(
            std::mem::size_of::<SpinParticleState>(),
            48,
            "SpinParticleState must be 48 bytes for WGSL alignment"
        );
    }

    #[test]
    fn test_step_params_size() {
        assert_eq!(
            std::mem::size_of::<StepParams>(),
            16,
            "StepParams must be 16 bytes for WGSL uniform alignment"
        );
    }

    #[test]
    fn test_shim_params_size() {
        assert_eq!(
            std::mem::size_of::<ShimParams>(),
            32,
            "ShimParams must be 32 bytes for WGSL alignment"
        );
    }

    #[test]
    fn test_bytemuck_round_trip() {
        let state = ParticleState {
            pos: [1.0, 2.0, 3.0, 0.0],
            vel: [1.0, 0.0, 0.0, 0.0],
        };

        let bytes: &[u8] = bytemuck::bytes_of(&state);
        assert_eq!(bytes.len(), 32);

        let recovered: &ParticleState = bytemuck::from_bytes(bytes);
        assert_eq!(recovered.pos[2], 3.0);
        assert_eq!(recovered.vel[0], 1.0);
    }

    #[test]
    fn test_field_vector_padding() {
        let b = FieldVector::new(0.0, 0.0, 1.45);
        assert_eq!(b.0[2], 1.45);
        assert_eq!(b.0[3], 0.0);
        assert_eq!(std::mem::size_of::<FieldVector>(), 16);
    }
}
