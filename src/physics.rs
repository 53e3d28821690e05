//! Reference integration kernel.
//!
//! A CPU rendition of `shaders/particles.wgsl`. It reads the same
//! [`ParticleDataBlock`] the GPU reads and applies the same force law, so it
//! can check the GPU results and the determinism properties of the step. The
//! frame loop never calls it.
//!
//! # Force law
//!
//! Plummer-softened inverse-square attraction toward every attractor:
//!
//! ```text
//! a = Σ strength * (p_k - x) / (|p_k - x|² + softening²)^(3/2)
//! ```
//!
//! followed by a semi-implicit Euler step (`v += a * dt`, then `x += v * dt`).
//! The softening keeps the acceleration finite when a particle sits on an
//! attractor.

use glam::{Vec3, Vec4, Vec4Swizzles};
use rayon::prelude::*;

use crate::attractors::ParticleDataBlock;
use crate::error::ConfigError;

/// Strength and softening of the attraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceLaw {
    pub strength: f32,
    pub softening: f32,
}

impl Default for ForceLaw {
    fn default() -> Self {
        Self {
            strength: 2000.0,
            softening: 2.0,
        }
    }
}

impl ForceLaw {
    pub fn new(strength: f32, softening: f32) -> Self {
        Self { strength, softening }
    }

    /// A zero or non-finite softening lets a particle sitting on an
    /// attractor divide by zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.strength.is_finite() || !(self.softening.is_finite() && self.softening > 0.0) {
            return Err(ConfigError::InvalidForce {
                strength: self.strength,
                softening: self.softening,
            });
        }
        Ok(())
    }

    /// Acceleration at `position` from the first `count` attractors of `block`.
    pub fn acceleration(&self, position: Vec3, block: &ParticleDataBlock, count: usize) -> Vec3 {
        let eps_sq = self.softening * self.softening;
        let mut acceleration = Vec3::ZERO;
        for a in 0..count {
            let d = block.attractor(a, count) - position;
            let dist_sq = d.dot(d) + eps_sq;
            acceleration += d * (self.strength / (dist_sq * dist_sq.sqrt()));
        }
        acceleration
    }
}

/// Advance one particle. The `w` components pass through untouched.
#[inline]
pub fn step_particle(
    position: &mut Vec4,
    velocity: &mut Vec4,
    block: &ParticleDataBlock,
    count: usize,
    law: &ForceLaw,
) {
    let dt = block.dt();
    let acceleration = law.acceleration(position.xyz(), block, count);
    let v = velocity.xyz() + acceleration * dt;
    let p = position.xyz() + v * dt;
    *velocity = v.extend(velocity.w);
    *position = p.extend(position.w);
}

/// Advance every particle by the `dt` stored in `block`.
///
/// # Panics
///
/// Panics if the two slices differ in length.
pub fn step(
    positions: &mut [Vec4],
    velocities: &mut [Vec4],
    block: &ParticleDataBlock,
    count: usize,
    law: &ForceLaw,
) {
    assert_eq!(positions.len(), velocities.len(), "position/velocity length mismatch");
    for (p, v) in positions.iter_mut().zip(velocities.iter_mut()) {
        step_particle(p, v, block, count, law);
    }
}

/// Same as [`step`], split into batches of `batch` particles run in parallel.
///
/// Particles never read each other, so the result does not depend on the
/// batch size or on the order in which batches run.
pub fn step_batched(
    positions: &mut [Vec4],
    velocities: &mut [Vec4],
    block: &ParticleDataBlock,
    count: usize,
    law: &ForceLaw,
    batch: usize,
) {
    assert_eq!(positions.len(), velocities.len(), "position/velocity length mismatch");
    let batch = batch.max(1);
    positions
        .par_chunks_mut(batch)
        .zip(velocities.par_chunks_mut(batch))
        .for_each(|(ps, vs)| {
            for (p, v) in ps.iter_mut().zip(vs.iter_mut()) {
                step_particle(p, v, block, count, law);
            }
        });
}
