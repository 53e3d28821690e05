//! Fixed perspective camera.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Where the camera sits and what it sees. Set once at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 100.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Camera that never moves after creation.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    config: CameraConfig,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Self {
        Self { config: *config }
    }

    /// Calculate the view matrix for rendering.
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.config.eye, self.config.target, self.config.up)
    }

    /// Perspective projection for a viewport with the given aspect ratio.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.config.fov_y_degrees.to_radians(),
            aspect,
            self.config.near,
            self.config.far,
        )
    }

    /// Pack the matrices and viewport for the vertex shader.
    pub fn uniform(&self, viewport: (u32, u32), point_size: f32) -> CameraUniform {
        let (width, height) = viewport;
        let aspect = width as f32 / height.max(1) as f32;
        CameraUniform {
            projection: self.projection(aspect).to_cols_array_2d(),
            view: self.view().to_cols_array_2d(),
            viewport: [width as f32, height as f32],
            point_size,
            _padding: 0.0,
        }
    }
}

/// Layout of the `Camera` uniform in `shaders/vert.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    pub point_size: f32,
    _padding: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_origin_projects_to_screen_centre() {
        let camera = Camera::new(&CameraConfig::default());
        let clip = camera.projection(1280.0 / 720.0) * camera.view() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;

        assert!(ndc.x.abs() < 1e-6);
        assert!(ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_initial_layout_is_in_view() {
        let camera = Camera::new(&CameraConfig::default());
        let view_proj = camera.projection(1280.0 / 720.0) * camera.view();

        for corner in [
            Vec4::new(-100.0, -55.0, 0.0, 1.0),
            Vec4::new(100.0, 55.0, 0.0, 1.0),
        ] {
            let clip = view_proj * corner;
            let ndc = clip / clip.w;
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{:?} clipped", corner);
        }
    }

    #[test]
    fn test_uniform_size_matches_shader() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 144);
    }

    #[test]
    fn test_uniform_carries_viewport() {
        let uniform = Camera::new(&CameraConfig::default()).uniform((1280, 720), 3.0);
        assert_eq!(uniform.viewport, [1280.0, 720.0]);
        assert_eq!(uniform.point_size, 3.0);
    }
}
