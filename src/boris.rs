//! CPU reference implementation of the Boris push.
//!
//! Mirrors the device kernels in f32 so test expectations transfer: the
//! half-kick / rotate / half-kick scheme here is term-for-term the one
//! in `shaders/plasma.wgsl`. Used by the test suite as the ground truth
//! the GPU results are compared against, and by the stability tests to
//! validate the integrator's conservation properties without a device.

use crate::types::{FieldVector, ParticleState};

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Advance one particle by one Boris step (unit charge-to-mass).
///
/// A half electric kick, a magnetic rotation that preserves speed
/// exactly in exact arithmetic, and a second half kick; position is
/// updated with the post-kick velocity.
pub fn boris_step(p: &ParticleState, b: &FieldVector, e: &FieldVector, dt: f32) -> ParticleState {
    let b = [b.0[0], b.0[1], b.0[2]];
    let e = [e.0[0], e.0[1], e.0[2]];
    let v = [p.vel[0], p.vel[1], p.vel[2]];

    let half_e = [0.5 * dt * e[0], 0.5 * dt * e[1], 0.5 * dt * e[2]];
    let v_minus = [v[0] + half_e[0], v[1] + half_e[1], v[2] + half_e[2]];

    let t = [0.5 * dt * b[0], 0.5 * dt * b[1], 0.5 * dt * b[2]];
    let t2 = t[0] * t[0] + t[1] * t[1] + t[2] * t[2];
    let s_scale = 2.0 / (1.0 + t2);
    let s = [t[0] * s_scale, t[1] * s_scale, t[2] * s_scale];

    let vxt = cross(v_minus, t);
    let v_prime = [v_minus[0] + vxt[0], v_minus[1] + vxt[1], v_minus[2] + vxt[2]];
    let vpxs = cross(v_prime, s);
    let v_plus = [v_minus[0] + vpxs[0], v_minus[1] + vpxs[1], v_minus[2] + vpxs[2]];

    let v_new = [
        v_plus[0] + half_e[0],
        v_plus[1] + half_e[1],
        v_plus[2] + half_e[2],
    ];

    ParticleState {
        pos: [
            p.pos[0] + v_new[0] * dt,
            p.pos[1] + v_new[1] * dt,
            p.pos[2] + v_new[2] * dt,
            0.0,
        ],
        vel: [v_new[0], v_new[1], v_new[2], 0.0],
    }
}

/// Advance a population in place by `steps` Boris steps.
pub fn advance(
    particles: &mut [ParticleState],
    b: &FieldVector,
    e: &FieldVector,
    dt: f32,
    steps: u32,
) {
    for _ in 0..steps {
        for p in particles.iter_mut() {
            *p = boris_step(p, b, e, dt);
        }
    }
}
