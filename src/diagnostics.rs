//! Host-side aggregate diagnostics over read-back particle state.
//!
//! Read-only computations; nothing here dispatches device work. Valid
//! input is state read back after a full queue synchronization — the
//! driver's sync ledger enforces that precondition.

use crate::types::ParticleState;

/// Population-mean kinetic energy `0.5·|v|²` (unit mass).
///
/// Accumulates in f64 over the f32 velocity components so the result is
/// stable enough to resolve drifts near the FP32 noise floor.
pub fn mean_kinetic_energy(particles: &[ParticleState]) -> f64 {
    if particles.is_empty() {
        return 0.0;
    }
    let total: f64 = particles
        .iter()
        .map(|p| {
            let vx = f64::from(p.vel[0]);
            let vy = f64::from(p.vel[1]);
            let vz = f64::from(p.vel[2]);
            0.5 * (vx * vx + vy * vy + vz * vz)
        })
        .sum();
    total / particles.len() as f64
}

/// Relative drift of `current` against `baseline`.
pub fn relative_drift(current: f64, baseline: f64) -> f64 {
    (current - baseline) / baseline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(vel: [f32; 3]) -> ParticleState {
        ParticleState {
            pos: [0.0; 4],
            vel: [vel[0], vel[1], vel[2], 0.0],
        }
    }

    #[test]
    fn unit_velocity_population_has_energy_half() {
        // |v|² = 1 for every particle → mean energy exactly 0.5
        let particles = vec![particle([1.0, 0.0, 0.0]); 1024];
        assert_eq!(mean_kinetic_energy(&particles), 0.5);
    }

    #[test]
    fn energy_is_rotation_invariant() {
        // Boris rotation preserves |v|; a population rotated into the
        // yz-plane must report the same energy.
        let a = vec![particle([1.0, 0.0, 0.0]); 64];
        let s = std::f32::consts::FRAC_1_SQRT_2;
        let b = vec![particle([0.0, s, s]); 64];
        let ea = mean_kinetic_energy(&a);
        let eb = mean_kinetic_energy(&b);
        assert!((ea - eb).abs() < 1e-7);
    }

    #[test]
    fn mixed_population_mean() {
        let particles = vec![particle([2.0, 0.0, 0.0]), particle([0.0, 0.0, 0.0])];
        // (2.0 + 0.0) / 2 = 1.0
        assert_eq!(mean_kinetic_energy(&particles), 1.0);
    }

    #[test]
    fn empty_population_is_zero() {
        assert_eq!(mean_kinetic_energy(&[]), 0.0);
    }

    #[test]
    fn drift_sign_and_magnitude() {
        assert_eq!(relative_drift(0.5, 0.5), 0.0);
        assert!((relative_drift(0.505, 0.5) - 0.01).abs() < 1e-12);
        assert!(relative_drift(0.495, 0.5) < 0.0);
    }

    #[test]
    fn padding_component_is_ignored() {
        let mut p = particle([1.0, 0.0, 0.0]);
        p.vel[3] = 99.0;
        assert_eq!(mean_kinetic_energy(&[p]), 0.5);
    }
}
