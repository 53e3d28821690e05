//! GPU device ownership and the per-frame compute/draw sequence.

pub mod readback;

mod compute;
mod render;

use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use winit::window::Window;

use crate::attractors::AttractorSet;
use crate::camera::Camera;
use crate::config::ParticlesConfig;
use crate::error::{AppError, FrameError, GpuError};
use crate::shader::ShaderSet;
use crate::store::ParticleStore;
use crate::sync::FrameFence;

pub use compute::SimulationStage;
pub use render::RenderStage;

/// Invocations per compute workgroup. Must match `@workgroup_size` in
/// `shaders/particles.wgsl`.
pub const WORKGROUP_SIZE: u32 = 256;

/// Workgroups needed to cover `n` particles.
pub fn dispatch_size(n: u32) -> u32 {
    n.div_ceil(WORKGROUP_SIZE)
}

/// Device, queue and the slot that collects uncaptured device errors.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    pub limits: wgpu::Limits,
    failure: Arc<Mutex<Option<String>>>,
}

impl GpuContext {
    /// Open a device with no surface attached. Used by tests and tools that
    /// only need compute and readback.
    pub async fn headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let (_, ctx) = Self::from_instance(&instance, None).await?;
        Ok(ctx)
    }

    /// Pick an adapter (compatible with `surface`, if given) and open a device on it.
    pub async fn from_instance(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<(wgpu::Adapter, Self), GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let supported = adapter.limits();
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: supported.max_storage_buffer_binding_size,
            max_buffer_size: supported.max_buffer_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Particles Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        let failure = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&failure);
        device.on_uncaptured_error(Box::new(move |e: wgpu::Error| {
            if let Ok(mut slot) = sink.lock() {
                slot.get_or_insert_with(|| e.to_string());
            }
        }));

        let adapter_info = adapter.get_info();
        info!(
            "Using adapter {} ({:?} backend)",
            adapter_info.name, adapter_info.backend
        );

        Ok((
            adapter,
            Self {
                device,
                queue,
                adapter_info,
                limits,
                failure,
            },
        ))
    }

    /// Run `f` inside an error scope and report the first error it raised.
    pub fn scoped<T>(
        &self,
        filter: wgpu::ErrorFilter,
        f: impl FnOnce(&wgpu::Device) -> T,
    ) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(filter);
        let value = f(&self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error)
    }

    /// The first uncaptured device error since the last call, if any.
    pub fn take_failure(&self) -> Option<GpuError> {
        let message = self.failure.lock().ok()?.take()?;
        Some(GpuError::Device(message))
    }
}

/// Everything needed to produce frames into a window.
pub struct GpuState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    ctx: GpuContext,
    store: ParticleStore,
    simulation: SimulationStage,
    render: RenderStage,
    fence: FrameFence,
}

impl GpuState {
    pub async fn new(
        window: Arc<Window>,
        settings: &ParticlesConfig,
        shaders: &ShaderSet,
        attractors: &AttractorSet,
    ) -> Result<Self, AppError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window).map_err(GpuError::from)?;
        let (adapter, ctx) = GpuContext::from_instance(&instance, Some(&surface)).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if settings.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &config);
        info!(
            "Surface {}x{} {:?}, {:?}",
            config.width, config.height, format, config.present_mode
        );

        let store = ParticleStore::with_layout(&ctx, settings.particle_count, &settings.layout)?;

        let simulation = SimulationStage::new(
            &ctx,
            &shaders.compute,
            &store,
            attractors,
            &settings.force,
            &settings.bindings,
        )?;

        let camera = Camera::new(&settings.camera);
        let render = RenderStage::new(
            &ctx,
            &shaders.vertex,
            &shaders.fragment,
            format,
            &camera,
            (config.width, config.height),
            settings.point_size,
            &settings.bindings,
        )?;

        info!(
            "Simulating {} particles around {} attractors",
            store.len(),
            attractors.len()
        );

        Ok(Self {
            surface,
            config,
            ctx,
            store,
            simulation,
            render,
            fence: FrameFence::new(),
        })
    }

    /// Simulate one step of `dt` seconds, then draw and present the result.
    pub fn frame(&mut self, dt: f32) -> Result<(), FrameError> {
        if let Some(e) = self.ctx.take_failure() {
            return Err(e.into());
        }

        let output = self.acquire()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let pending = self
            .simulation
            .dispatch(&self.ctx.queue, &mut encoder, dt, &mut self.fence);
        // The compute pass is closed at this point; wgpu orders its storage
        // writes before the vertex reads of the next pass.
        let visible = self.fence.barrier(pending);
        self.render
            .draw(&mut encoder, &view, &self.store, &visible, &mut self.fence)?;

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if let Some(e) = self.ctx.take_failure() {
            return Err(e.into());
        }
        Ok(())
    }

    /// Acquire the next swapchain texture, reconfiguring once if the surface
    /// went stale.
    fn acquire(&mut self) -> Result<wgpu::SurfaceTexture, FrameError> {
        match self.surface.get_current_texture() {
            Ok(output) => Ok(output),
            Err(e) if recovery(&e) == SurfaceRecovery::Reconfigure => {
                warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.ctx.device, &self.config);
                Ok(self.surface.get_current_texture()?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// What to do when the swapchain refuses a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceRecovery {
    /// Reconfigure the surface and try once more.
    Reconfigure,
    /// Halt the loop.
    Fatal,
}

fn recovery(error: &wgpu::SurfaceError) -> SurfaceRecovery {
    match error {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceRecovery::Reconfigure,
        // a frame that cannot be produced stops the loop, it is never skipped
        _ => SurfaceRecovery::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_surface_is_reconfigured() {
        assert_eq!(recovery(&wgpu::SurfaceError::Lost), SurfaceRecovery::Reconfigure);
        assert_eq!(recovery(&wgpu::SurfaceError::Outdated), SurfaceRecovery::Reconfigure);
    }

    #[test]
    fn test_timeout_halts_instead_of_skipping() {
        assert_eq!(recovery(&wgpu::SurfaceError::Timeout), SurfaceRecovery::Fatal);
        assert_eq!(recovery(&wgpu::SurfaceError::OutOfMemory), SurfaceRecovery::Fatal);
    }

    #[test]
    fn test_dispatch_size_covers_every_particle() {
        for n in [1, 255, 256, 257, 1_000, 1_000_000] {
            let groups = dispatch_size(n);
            assert!(groups * WORKGROUP_SIZE >= n, "n = {}", n);
            assert!((groups - 1) * WORKGROUP_SIZE < n, "n = {}", n);
        }
    }

    #[test]
    fn test_dispatch_visits_each_index_once() {
        let n = 1_000u32;
        let mut visits = vec![0u32; n as usize];
        for group in 0..dispatch_size(n) {
            for local in 0..WORKGROUP_SIZE {
                let index = group * WORKGROUP_SIZE + local;
                if index < n {
                    visits[index as usize] += 1;
                }
            }
        }
        assert!(visits.iter().all(|&v| v == 1));
    }
}
