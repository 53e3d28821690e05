//! Error types for the particle system.
//!
//! Every failure here is fatal for the application: initialization errors
//! abort before the frame loop starts, frame errors halt the loop.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while talking to the GPU.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// The surface reports no usable texture format.
    NoSurfaceFormat,
    /// Failed to map buffer for reading.
    BufferMapping(String),
    /// The device reported an error outside of any error scope.
    Device(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::NoSurfaceFormat => write!(f, "Surface exposes no texture format"),
            GpuError::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {}", msg),
            GpuError::Device(msg) => write!(f, "GPU device error: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors raised while loading, compiling or linking a shader program.
#[derive(Debug)]
pub enum ShaderError {
    /// The source file could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The source did not parse or validate. `log` holds the compiler diagnostic.
    Compile { path: PathBuf, log: String },
    /// The program is missing an entry point or its stages do not fit together.
    Link { program: String, log: String },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Io { path, source } => {
                write!(f, "Failed to read shader {}: {}", path.display(), source)
            }
            ShaderError::Compile { path, log } => {
                write!(f, "Failed to compile {}:\n{}", path.display(), log)
            }
            ShaderError::Link { program, log } => {
                write!(f, "Failed to link {} program:\n{}", program, log)
            }
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShaderError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors raised when the particle store is misconfigured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A store must hold at least one particle.
    Empty,
    /// Position and velocity arrays differ in length.
    LengthMismatch { positions: usize, velocities: usize },
    /// The requested store exceeds what the device can bind or dispatch.
    TooLarge { count: u64, max: u64 },
    /// The device refused to allocate a buffer.
    Allocation(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Empty => write!(f, "Particle store needs at least one particle"),
            StoreError::LengthMismatch { positions, velocities } => write!(
                f,
                "Position buffer holds {} particles but velocity buffer holds {}",
                positions, velocities
            ),
            StoreError::TooLarge { count, max } => write!(
                f,
                "{} particles exceed the device limit of {}",
                count, max
            ),
            StoreError::Allocation(msg) => write!(f, "Failed to allocate particle buffers: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors raised by invalid startup parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Particle count must be positive.
    NoParticles,
    /// The parameter block cannot hold this many attractors.
    TooManyAttractors { count: u32, max: u32 },
    /// An attractor sampling range has `min > max` or a non-finite bound.
    InvalidRange { axis: char, min: f32, max: f32 },
    /// Window dimensions must be positive.
    InvalidWindowSize { width: u32, height: u32 },
    /// Two binding-layout entries share a slot.
    DuplicateSlot(u32),
    /// Point size must be positive and finite.
    InvalidPointSize(f32),
    /// Strength must be finite; softening must be finite and positive.
    InvalidForce { strength: f32, softening: f32 },
    /// The starting layout needs a positive period and finite spans.
    InvalidLayout { half_width: f32, height: f32, period: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoParticles => write!(f, "Particle count must be greater than zero"),
            ConfigError::TooManyAttractors { count, max } => {
                write!(f, "{} attractors requested, at most {} fit the parameter block", count, max)
            }
            ConfigError::InvalidRange { axis, min, max } => {
                write!(f, "Invalid {} range for attractors: [{}, {}]", axis, min, max)
            }
            ConfigError::InvalidWindowSize { width, height } => {
                write!(f, "Invalid window size {}x{}", width, height)
            }
            ConfigError::DuplicateSlot(slot) => {
                write!(f, "Binding slot {} is assigned more than once", slot)
            }
            ConfigError::InvalidPointSize(size) => write!(f, "Invalid point size {}", size),
            ConfigError::InvalidForce { strength, softening } => write!(
                f,
                "Invalid force law: strength {} must be finite, softening {} must be finite and positive",
                strength, softening
            ),
            ConfigError::InvalidLayout {
                half_width,
                height,
                period,
            } => write!(
                f,
                "Invalid particle layout: half width {}, height {}, period {}",
                half_width, height, period
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Violations of the compute-then-draw ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// The draw was handed writes older than the latest dispatch.
    Stale { observed: u64, latest: u64 },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Stale { observed, latest } => write!(
                f,
                "Draw observed compute epoch {} but epoch {} is the latest",
                observed, latest
            ),
        }
    }
}

impl std::error::Error for SyncError {}

/// Errors that stop a frame from being produced.
#[derive(Debug)]
pub enum FrameError {
    /// The swapchain texture could not be acquired.
    Surface(wgpu::SurfaceError),
    /// The device reported an error while the frame was recorded or executed.
    Gpu(GpuError),
    /// Compute and draw ran out of order.
    Sync(SyncError),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Surface(e) => write!(f, "Failed to acquire frame: {}", e),
            FrameError::Gpu(e) => write!(f, "{}", e),
            FrameError::Sync(e) => write!(f, "Frame synchronization error: {}", e),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Surface(e) => Some(e),
            FrameError::Gpu(e) => Some(e),
            FrameError::Sync(e) => Some(e),
        }
    }
}

impl From<wgpu::SurfaceError> for FrameError {
    fn from(e: wgpu::SurfaceError) -> Self {
        FrameError::Surface(e)
    }
}

impl From<GpuError> for FrameError {
    fn from(e: GpuError) -> Self {
        FrameError::Gpu(e)
    }
}

impl From<SyncError> for FrameError {
    fn from(e: SyncError) -> Self {
        FrameError::Sync(e)
    }
}

/// Errors that can occur when running the application.
#[derive(Debug)]
pub enum AppError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// Invalid startup parameters.
    Config(ConfigError),
    /// Shader loading or compilation failed.
    Shader(ShaderError),
    /// Particle store could not be created.
    Store(StoreError),
    /// GPU initialization failed.
    Gpu(GpuError),
    /// A frame could not be produced.
    Frame(FrameError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            AppError::Window(e) => write!(f, "Failed to create window: {}", e),
            AppError::Config(e) => write!(f, "Invalid configuration: {}", e),
            AppError::Shader(e) => write!(f, "Shader error: {}", e),
            AppError::Store(e) => write!(f, "Particle store error: {}", e),
            AppError::Gpu(e) => write!(f, "GPU error: {}", e),
            AppError::Frame(e) => write!(f, "Frame error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::EventLoop(e) => Some(e),
            AppError::Window(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Shader(e) => Some(e),
            AppError::Store(e) => Some(e),
            AppError::Gpu(e) => Some(e),
            AppError::Frame(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for AppError {
    fn from(e: winit::error::EventLoopError) -> Self {
        AppError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for AppError {
    fn from(e: winit::error::OsError) -> Self {
        AppError::Window(e)
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<ShaderError> for AppError {
    fn from(e: ShaderError) -> Self {
        AppError::Shader(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<GpuError> for AppError {
    fn from(e: GpuError) -> Self {
        AppError::Gpu(e)
    }
}

impl From<FrameError> for AppError {
    fn from(e: FrameError) -> Self {
        AppError::Frame(e)
    }
}
