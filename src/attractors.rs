//! Fixed attractor positions and the per-frame parameter block.
//!
//! Attractors are sampled once at startup and never move. They are stored
//! axis-major (all x, then all y, then all z) because that is the order the
//! compute kernel reads them out of the parameter block:
//!
//! ```text
//! scalar 0            dt
//! scalars 1..=A       x of attractor 0..A
//! scalars A+1..=2A    y of attractor 0..A
//! scalars 2A+1..=3A   z of attractor 0..A
//! ```
//!
//! Uniform arrays need a 16-byte element stride, so the flat scalar run is
//! packed into `vec4` lanes: scalar `k` lives in lane `k % 4` of element
//! `k / 4`. Reading the block back as `&[f32]` gives the flat order unchanged.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::Rng;

use crate::error::ConfigError;

/// Number of `vec4` elements in the parameter block.
pub const BLOCK_VEC4S: usize = 16;

/// Number of scalars the parameter block can carry.
pub const BLOCK_SCALARS: usize = BLOCK_VEC4S * 4;

/// Largest attractor count that fits next to `dt` in the block.
pub const MAX_ATTRACTORS: u32 = ((BLOCK_SCALARS - 1) / 3) as u32;

/// Inclusive sampling interval for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f32,
    pub max: f32,
}

impl AxisRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    fn validate(&self, axis: char) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(ConfigError::InvalidRange {
                axis,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        rng.gen_range(self.min..=self.max)
    }

    /// Whether `value` lies inside the interval.
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Sampling box for attractor positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttractorBounds {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
}

impl Default for AttractorBounds {
    fn default() -> Self {
        Self {
            x: AxisRange::new(-80.0, 80.0),
            y: AxisRange::new(-50.0, 50.0),
            z: AxisRange::new(-20.0, 0.0),
        }
    }
}

impl AttractorBounds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.x.validate('x')?;
        self.y.validate('y')?;
        self.z.validate('z')
    }
}

/// An immutable set of attractors in axis-major layout.
#[derive(Debug, Clone, PartialEq)]
pub struct AttractorSet {
    count: usize,
    flat: Vec<f32>,
}

impl AttractorSet {
    /// Sample `count` attractors uniformly inside `bounds`.
    pub fn generate<R: Rng>(
        count: u32,
        bounds: &AttractorBounds,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        if count > MAX_ATTRACTORS {
            return Err(ConfigError::TooManyAttractors {
                count,
                max: MAX_ATTRACTORS,
            });
        }
        bounds.validate()?;

        let count = count as usize;
        let mut flat = Vec::with_capacity(count * 3);
        for range in [bounds.x, bounds.y, bounds.z] {
            flat.extend((0..count).map(|_| range.sample(rng)));
        }

        Ok(Self { count, flat })
    }

    /// Build a set from explicit positions.
    pub fn from_positions(positions: &[Vec3]) -> Result<Self, ConfigError> {
        if positions.len() > MAX_ATTRACTORS as usize {
            return Err(ConfigError::TooManyAttractors {
                count: positions.len() as u32,
                max: MAX_ATTRACTORS,
            });
        }

        let mut flat = Vec::with_capacity(positions.len() * 3);
        flat.extend(positions.iter().map(|p| p.x));
        flat.extend(positions.iter().map(|p| p.y));
        flat.extend(positions.iter().map(|p| p.z));

        Ok(Self {
            count: positions.len(),
            flat,
        })
    }

    /// Set with no attractors at all.
    pub fn empty() -> Self {
        Self {
            count: 0,
            flat: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The axis-major scalar sequence.
    pub fn as_flat(&self) -> &[f32] {
        &self.flat
    }

    /// Position of attractor `i`.
    pub fn position(&self, i: usize) -> Vec3 {
        let n = self.count;
        Vec3::new(self.flat[i], self.flat[n + i], self.flat[2 * n + i])
    }

    pub fn iter(&self) -> impl Iterator<Item = Vec3> + '_ {
        (0..self.count).map(|i| self.position(i))
    }
}

/// Uniform block read by the compute kernel: `dt` followed by the attractors.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ParticleDataBlock {
    lanes: [[f32; 4]; BLOCK_VEC4S],
}

impl ParticleDataBlock {
    pub fn new(dt: f32, attractors: &AttractorSet) -> Self {
        let mut block = Self::zeroed();
        let scalars = block.scalars_mut();
        scalars[0] = dt;
        scalars[1..1 + attractors.flat.len()].copy_from_slice(&attractors.flat);
        block
    }

    pub fn dt(&self) -> f32 {
        self.lanes[0][0]
    }

    pub fn set_dt(&mut self, dt: f32) {
        self.lanes[0][0] = dt;
    }

    /// The block as one flat run of scalars.
    pub fn scalars(&self) -> &[f32] {
        bytemuck::cast_slice(&self.lanes)
    }

    fn scalars_mut(&mut self) -> &mut [f32] {
        bytemuck::cast_slice_mut(&mut self.lanes)
    }

    /// Scalar `k` read the way the kernel reads it: lane `k % 4` of element `k / 4`.
    pub fn scalar(&self, k: usize) -> f32 {
        self.lanes[k / 4][k % 4]
    }

    /// Position of attractor `a` out of `count`, decoded from the block.
    pub fn attractor(&self, a: usize, count: usize) -> Vec3 {
        Vec3::new(
            self.scalar(1 + a),
            self.scalar(1 + count + a),
            self.scalar(1 + 2 * count + a),
        )
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_is_axis_major() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = AttractorSet::generate(3, &AttractorBounds::default(), &mut rng).unwrap();
        let flat = set.as_flat();

        assert_eq!(flat.len(), 9);
        for i in 0..3 {
            let p = set.position(i);
            assert_eq!(p.x, flat[i]);
            assert_eq!(p.y, flat[3 + i]);
            assert_eq!(p.z, flat[6 + i]);
        }
    }

    #[test]
    fn test_generate_respects_bounds() {
        let bounds = AttractorBounds::default();
        let mut rng = StdRng::seed_from_u64(42);
        let set = AttractorSet::generate(MAX_ATTRACTORS, &bounds, &mut rng).unwrap();

        for p in set.iter() {
            assert!(bounds.x.contains(p.x), "x out of range: {}", p.x);
            assert!(bounds.y.contains(p.y), "y out of range: {}", p.y);
            assert!(bounds.z.contains(p.z), "z out of range: {}", p.z);
        }
    }

    #[test]
    fn test_generate_same_seed_same_set() {
        let bounds = AttractorBounds::default();
        let a = AttractorSet::generate(3, &bounds, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = AttractorSet::generate(3, &bounds, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_many_attractors() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = AttractorSet::generate(MAX_ATTRACTORS + 1, &AttractorBounds::default(), &mut rng);
        assert_eq!(
            err,
            Err(ConfigError::TooManyAttractors {
                count: MAX_ATTRACTORS + 1,
                max: MAX_ATTRACTORS
            })
        );
    }

    #[test]
    fn test_inverted_range_rejected() {
        let bounds = AttractorBounds {
            y: AxisRange::new(10.0, -10.0),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            AttractorSet::generate(1, &bounds, &mut rng),
            Err(ConfigError::InvalidRange { axis: 'y', .. })
        ));
    }

    #[test]
    fn test_block_layout() {
        let set = AttractorSet::from_positions(&[
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::new(7.0, 8.0, 9.0),
        ])
        .unwrap();
        let block = ParticleDataBlock::new(0.5, &set);

        assert_eq!(
            &block.scalars()[..10],
            &[0.5, 1.0, 4.0, 7.0, 2.0, 5.0, 8.0, 3.0, 6.0, 9.0]
        );
        assert!(block.scalars()[10..].iter().all(|&s| s == 0.0));
        assert_eq!(block.attractor(1, 3), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(block.as_bytes().len(), BLOCK_SCALARS * 4);
    }

    #[test]
    fn test_block_lanes_match_flat_order() {
        let set = AttractorSet::from_positions(&[Vec3::splat(1.0); 5]).unwrap();
        let block = ParticleDataBlock::new(0.25, &set);
        for k in 0..BLOCK_SCALARS {
            assert_eq!(block.scalar(k), block.scalars()[k]);
        }
    }

    #[test]
    fn test_set_dt_keeps_attractors() {
        let set = AttractorSet::from_positions(&[Vec3::new(-3.0, 2.0, -1.0)]).unwrap();
        let mut block = ParticleDataBlock::new(0.0, &set);
        block.set_dt(0.016);

        assert_eq!(block.dt(), 0.016);
        assert_eq!(block.attractor(0, 1), Vec3::new(-3.0, 2.0, -1.0));
    }

    #[test]
    fn test_full_block_fits() {
        let set = AttractorSet::from_positions(&vec![Vec3::ONE; MAX_ATTRACTORS as usize]).unwrap();
        let block = ParticleDataBlock::new(1.0, &set);
        assert_eq!(block.scalars()[3 * MAX_ATTRACTORS as usize], 1.0);
    }
}
