//! Per-universe perturbation ("shim") generation for ensemble runs.
//!
//! Shims are the ensemble's free parameter for approximate-Bayesian
//! calibration: a fixed grid of field perturbations, not stochastic
//! forcing. They are drawn once at startup from a single seeded
//! generator and never reseeded or regenerated during a run, so a run
//! is fully reproducible from its seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::ShimParams;

/// Generate one shim record per universe.
///
/// Each B- and E-offset component is drawn independently and uniformly
/// from `[-spread/2, +spread/2]`. For a fixed `(universes, spread,
/// seed)` triple the output is bit-identical across invocations.
pub fn generate_shims(universes: u32, spread: f32, seed: u64) -> Vec<ShimParams> {
    let mut rng = StdRng::seed_from_u64(seed);
    let half = spread / 2.0;
    (0..universes)
        .map(|_| {
            let mut draw = || {
                if half > 0.0 {
                    rng.gen_range(-half..=half)
                } else {
                    0.0
                }
            };
            ShimParams {
                b_offset: [draw(), draw(), draw(), 0.0],
                e_offset: [draw(), draw(), draw(), 0.0],
            }
        })
        .collect()
}
