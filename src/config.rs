//! Startup parameters.
//!
//! Everything the application needs to know before the first frame, with
//! defaults that reproduce the classic one-million-particle scene.
//!
//! ```ignore
//! use particles::ParticlesConfig;
//!
//! let config = ParticlesConfig::default()
//!     .with_particle_count(250_000)
//!     .with_attractor_count(5)
//!     .with_seed(42);
//! particles::run(config)?;
//! ```

use std::path::PathBuf;

use winit::keyboard::KeyCode;

use crate::attractors::{AttractorBounds, MAX_ATTRACTORS};
use crate::binding::BindingLayout;
use crate::camera::CameraConfig;
use crate::error::ConfigError;
use crate::input::KeyBindings;
use crate::physics::ForceLaw;
use crate::store::LayoutPolicy;

/// Prefix of the window title.
pub const APP_NAME: &str = "Particles";

#[derive(Debug, Clone)]
pub struct ParticlesConfig {
    pub particle_count: u32,
    pub attractor_count: u32,
    pub window_size: (u32, u32),
    pub vsync: bool,
    /// Side length of each drawn particle, in pixels.
    pub point_size: f32,
    pub shader_dir: PathBuf,
    /// Fixed RNG seed for the attractors. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Constant integration step instead of the measured frame time.
    pub fixed_timestep: Option<f32>,
    pub layout: LayoutPolicy,
    pub force: ForceLaw,
    pub camera: CameraConfig,
    pub bindings: BindingLayout,
    pub attractor_bounds: AttractorBounds,
    pub keys: KeyBindings,
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        Self {
            particle_count: 1_000_000,
            attractor_count: 3,
            window_size: (1280, 720),
            vsync: true,
            point_size: 3.0,
            shader_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders")),
            seed: None,
            fixed_timestep: None,
            layout: LayoutPolicy::default(),
            force: ForceLaw::default(),
            camera: CameraConfig::default(),
            bindings: BindingLayout::default(),
            attractor_bounds: AttractorBounds::default(),
            keys: KeyBindings::default(),
        }
    }
}

impl ParticlesConfig {
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particle_count = count;
        self
    }

    pub fn with_attractor_count(mut self, count: u32) -> Self {
        self.attractor_count = count;
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    pub fn with_vsync(mut self, enabled: bool) -> Self {
        self.vsync = enabled;
        self
    }

    pub fn with_point_size(mut self, size: f32) -> Self {
        self.point_size = size;
        self
    }

    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = dir.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_fixed_timestep(mut self, dt: f32) -> Self {
        self.fixed_timestep = Some(dt);
        self
    }

    pub fn with_force(mut self, force: ForceLaw) -> Self {
        self.force = force;
        self
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_exit_key(mut self, key: KeyCode) -> Self {
        self.keys.exit = key;
        self
    }

    /// Check everything that can be checked before a device exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::NoParticles);
        }
        if self.attractor_count > MAX_ATTRACTORS {
            return Err(ConfigError::TooManyAttractors {
                count: self.attractor_count,
                max: MAX_ATTRACTORS,
            });
        }
        let (width, height) = self.window_size;
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidWindowSize { width, height });
        }
        if !(self.point_size.is_finite() && self.point_size > 0.0) {
            return Err(ConfigError::InvalidPointSize(self.point_size));
        }
        self.force.validate()?;
        self.layout.validate()?;
        self.attractor_bounds.validate()?;
        self.bindings.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ParticlesConfig::default();
        assert_eq!(config.particle_count, 1_000_000);
        assert_eq!(config.attractor_count, 3);
        assert_eq!(config.window_size, (1280, 720));
        assert_eq!(config.point_size, 3.0);
        assert_eq!(config.keys.exit, KeyCode::Escape);
        assert!(config.shader_dir.ends_with("shaders"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ParticlesConfig::default()
            .with_particle_count(4)
            .with_attractor_count(1)
            .with_seed(9)
            .with_vsync(false)
            .with_exit_key(KeyCode::KeyQ);

        assert_eq!(config.particle_count, 4);
        assert_eq!(config.attractor_count, 1);
        assert_eq!(config.seed, Some(9));
        assert!(!config.vsync);
        assert_eq!(config.keys.exit, KeyCode::KeyQ);
    }

    #[test]
    fn test_rejects_zero_particles() {
        let config = ParticlesConfig::default().with_particle_count(0);
        assert_eq!(config.validate(), Err(ConfigError::NoParticles));
    }

    #[test]
    fn test_rejects_too_many_attractors() {
        let config = ParticlesConfig::default().with_attractor_count(MAX_ATTRACTORS + 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooManyAttractors { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_window_and_point_size() {
        let config = ParticlesConfig::default().with_window_size(0, 720);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidWindowSize { width: 0, height: 720 })
        );

        let config = ParticlesConfig::default().with_point_size(f32::NAN);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPointSize(_))));
    }

    #[test]
    fn test_rejects_zero_softening() {
        let config = ParticlesConfig::default().with_force(ForceLaw::new(2000.0, 0.0));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidForce {
                strength: 2000.0,
                softening: 0.0
            })
        );
    }

    #[test]
    fn test_rejects_zero_layout_period() {
        let mut config = ParticlesConfig::default();
        config.layout.period = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLayout { period: 0, .. })
        ));
    }

    #[test]
    fn test_zero_attractors_allowed() {
        let config = ParticlesConfig::default().with_attractor_count(0);
        assert!(config.validate().is_ok());
    }
}
