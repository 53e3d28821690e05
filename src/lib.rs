//! # Particles
//!
//! One million GPU particles pulled by a handful of fixed attractors.
//!
//! Every frame a compute pass integrates all particles in place, then a
//! render pass draws the same position buffer as a point cloud. Both passes
//! are recorded into one command encoder, so the GPU never draws positions
//! the current step has not finished writing.
//!
//! ## Quick Start
//!
//! ```ignore
//! use particles::ParticlesConfig;
//!
//! fn main() -> Result<(), particles::AppError> {
//!     particles::run(ParticlesConfig::default())
//! }
//! ```
//!
//! ## Frame Sequence
//!
//! 1. Poll input. Escape or the close button ends the loop.
//! 2. Write last frame's duration into the particle data block.
//! 3. Dispatch `ceil(N / 256)` workgroups of `shaders/particles.wgsl`.
//! 4. Barrier: the compute pass ends before the render pass begins.
//! 5. Clear to black and draw one quad per particle.
//! 6. Present and measure the frame; update the FPS title once a second.
//!
//! The first frame steps with `dt = 0`, since no frame has been measured yet.
//!
//! ## Force Law
//!
//! Each attractor pulls with a softened inverse-square force; see
//! [`physics`] for the CPU reference of the kernel.

pub mod attractors;
pub mod binding;
pub mod camera;
pub mod config;
pub mod error;
pub mod gpu;
pub mod input;
pub mod physics;
pub mod shader;
pub mod store;
pub mod sync;
pub mod time;

mod app;

pub use app::{run, LoopState};
pub use attractors::{AttractorBounds, AttractorSet, AxisRange, ParticleDataBlock, MAX_ATTRACTORS};
pub use binding::BindingLayout;
pub use camera::{Camera, CameraConfig};
pub use config::{ParticlesConfig, APP_NAME};
pub use error::{AppError, ConfigError, FrameError, GpuError, ShaderError, StoreError, SyncError};
pub use glam::{Vec3, Vec4};
pub use gpu::{GpuContext, GpuState, WORKGROUP_SIZE};
pub use physics::ForceLaw;
pub use store::{LayoutPolicy, ParticleStore};
pub use sync::FrameFence;
