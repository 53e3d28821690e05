//! Particle store: the position and velocity buffers shared by both stages.
//!
//! Both buffers hold one `vec4<f32>` per particle, tightly packed (16 bytes
//! per record). Positions carry `w = 1.0`, velocities carry `w = 0.0`
//! padding. The compute kernel reads and writes both; the renderer streams
//! the position buffer as per-instance vertex data.

use glam::Vec4;
use wgpu::util::DeviceExt;

use crate::error::{ConfigError, GpuError, StoreError};
use crate::gpu::{readback, GpuContext, WORKGROUP_SIZE};

/// Bytes per particle record in either buffer.
pub const RECORD_SIZE: u64 = std::mem::size_of::<Vec4>() as u64;

/// Deterministic placement rule for the starting configuration.
///
/// Particle `i` of `n` starts at
/// `x = ((i / n) * 2 - 1) * half_width`,
/// `y = height * (i mod period) / period - height / 2`, `z = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutPolicy {
    /// Half of the horizontal span; x runs from `-half_width` towards `+half_width`.
    pub half_width: f32,
    /// Full vertical span, centred on zero.
    pub height: f32,
    /// Number of particles per vertical sweep.
    pub period: u32,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self {
            half_width: 100.0,
            height: 110.0,
            period: 1000,
        }
    }
}

impl LayoutPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 || !self.half_width.is_finite() || !self.height.is_finite() {
            return Err(ConfigError::InvalidLayout {
                half_width: self.half_width,
                height: self.height,
                period: self.period,
            });
        }
        Ok(())
    }

    /// Starting position of particle `i` out of `n`.
    pub fn position(&self, i: u32, n: u32) -> Vec4 {
        let x = ((i as f32 / n as f32) * 2.0 - 1.0) * self.half_width;
        let y = self.height * (i % self.period) as f32 / self.period as f32 - self.height * 0.5;
        Vec4::new(x, y, 0.0, 1.0)
    }
}

/// Build the initial position and velocity arrays for `n` particles.
pub fn initial_layout(n: u32, policy: &LayoutPolicy) -> (Vec<Vec4>, Vec<Vec4>) {
    let positions = (0..n).map(|i| policy.position(i, n)).collect();
    let velocities = vec![Vec4::ZERO; n as usize];
    (positions, velocities)
}

/// Check that `count` particles can be stored, bound and dispatched on a
/// device with `limits`.
pub fn validate_count(count: u64, limits: &wgpu::Limits) -> Result<(), StoreError> {
    if count == 0 {
        return Err(StoreError::Empty);
    }

    let by_binding = limits.max_storage_buffer_binding_size as u64 / RECORD_SIZE;
    let by_buffer = limits.max_buffer_size / RECORD_SIZE;
    let by_dispatch = limits.max_compute_workgroups_per_dimension as u64 * WORKGROUP_SIZE as u64;
    let max = by_binding.min(by_buffer).min(by_dispatch);

    if count > max {
        return Err(StoreError::TooLarge { count, max });
    }
    Ok(())
}

/// GPU-resident particle state.
pub struct ParticleStore {
    positions: wgpu::Buffer,
    velocities: wgpu::Buffer,
    count: u32,
}

impl ParticleStore {
    /// Upload the given arrays. Fails if they differ in length, are empty, or
    /// exceed what the device can hold.
    pub fn new(ctx: &GpuContext, positions: &[Vec4], velocities: &[Vec4]) -> Result<Self, StoreError> {
        if positions.len() != velocities.len() {
            return Err(StoreError::LengthMismatch {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        validate_count(positions.len() as u64, &ctx.limits)?;

        let (buffers, error) = ctx.scoped(wgpu::ErrorFilter::OutOfMemory, |device| {
            let position_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Position Buffer"),
                contents: bytemuck::cast_slice(positions),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::COPY_SRC,
            });
            let velocity_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Velocity Buffer"),
                contents: bytemuck::cast_slice(velocities),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            });
            (position_buffer, velocity_buffer)
        });
        if let Some(e) = error {
            return Err(StoreError::Allocation(e.to_string()));
        }

        Ok(Self {
            positions: buffers.0,
            velocities: buffers.1,
            count: positions.len() as u32,
        })
    }

    /// Upload the deterministic starting layout for `n` particles.
    pub fn with_layout(ctx: &GpuContext, n: u32, policy: &LayoutPolicy) -> Result<Self, StoreError> {
        let (positions, velocities) = initial_layout(n, policy);
        Self::new(ctx, &positions, &velocities)
    }

    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn positions(&self) -> &wgpu::Buffer {
        &self.positions
    }

    pub fn velocities(&self) -> &wgpu::Buffer {
        &self.velocities
    }

    /// Copy both buffers back to the CPU. Blocks until the GPU is idle.
    pub fn read_back(&self, ctx: &GpuContext) -> Result<(Vec<Vec4>, Vec<Vec4>), GpuError> {
        let positions = readback::read_vec4s(ctx, &self.positions, self.count as usize)?;
        let velocities = readback::read_vec4s(ctx, &self.velocities, self.count as usize)?;
        Ok((positions, velocities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_layout_extremes() {
        let n = 1000;
        let (positions, _) = initial_layout(n, &LayoutPolicy::default());

        let min_x = positions.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let max_x = positions.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);

        assert_eq!(positions[0].x, -100.0);
        assert_eq!(positions[0].x, min_x);
        assert_eq!(positions[999].x, max_x);
        assert!(positions.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn test_initial_layout_y_period() {
        let (positions, _) = initial_layout(3_000, &LayoutPolicy::default());

        assert_eq!(positions[0].y, -55.0);
        for i in 0..1000 {
            assert_eq!(positions[i].y, positions[i + 1000].y);
            assert_eq!(positions[i].y, positions[i + 2000].y);
            assert!(positions[i].y >= -55.0 && positions[i].y < 55.0);
        }
    }

    #[test]
    fn test_initial_layout_format() {
        let (positions, velocities) = initial_layout(1000, &LayoutPolicy::default());

        assert_eq!(positions.len(), velocities.len());
        assert!(positions.iter().all(|p| p.z == 0.0 && p.w == 1.0));
        assert!(velocities.iter().all(|v| *v == Vec4::ZERO));
    }

    #[test]
    fn test_initial_layout_is_reproducible() {
        let a = initial_layout(5_000, &LayoutPolicy::default());
        let b = initial_layout(5_000, &LayoutPolicy::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_layout_validation() {
        assert!(LayoutPolicy::default().validate().is_ok());

        let no_period = LayoutPolicy {
            period: 0,
            ..Default::default()
        };
        assert_eq!(
            no_period.validate(),
            Err(ConfigError::InvalidLayout {
                half_width: 100.0,
                height: 110.0,
                period: 0
            })
        );

        let infinite = LayoutPolicy {
            half_width: f32::INFINITY,
            ..Default::default()
        };
        assert!(infinite.validate().is_err());

        let nan = LayoutPolicy {
            height: f32::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_validate_count() {
        let limits = wgpu::Limits::default();

        assert_eq!(validate_count(0, &limits), Err(StoreError::Empty));
        assert!(validate_count(1_000_000, &limits).is_ok());

        let huge = limits.max_storage_buffer_binding_size as u64;
        assert!(matches!(
            validate_count(huge, &limits),
            Err(StoreError::TooLarge { count, .. }) if count == huge
        ));
    }

    #[test]
    fn test_record_size() {
        assert_eq!(RECORD_SIZE, 16);
    }
}
