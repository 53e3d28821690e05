//! Window, event loop and the per-frame sequence.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::attractors::AttractorSet;
use crate::config::{ParticlesConfig, APP_NAME};
use crate::error::AppError;
use crate::gpu::GpuState;
use crate::input::Input;
use crate::shader::ShaderSet;
use crate::time::{fps_title, FrameClock};

/// Where the frame loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminating,
}

struct App {
    config: ParticlesConfig,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    input: Input,
    clock: FrameClock,
    state: LoopState,
    error: Option<AppError>,
}

impl App {
    fn new(config: ParticlesConfig) -> Self {
        let input = Input::new(config.keys);
        let clock = FrameClock::new(Instant::now()).with_fixed_delta(config.fixed_timestep);
        Self {
            config,
            window: None,
            gpu_state: None,
            input,
            clock,
            state: LoopState::Running,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let (width, height) = self.config.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(APP_NAME)
            .with_inner_size(winit::dpi::LogicalSize::new(width, height))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let shaders = ShaderSet::load(&self.config.shader_dir)?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let attractors = AttractorSet::generate(
            self.config.attractor_count,
            &self.config.attractor_bounds,
            &mut rng,
        )?;
        for (i, p) in attractors.iter().enumerate() {
            debug!("Attractor {} at ({:.2}, {:.2}, {:.2})", i, p.x, p.y, p.z);
        }

        let gpu_state = pollster::block_on(GpuState::new(
            window.clone(),
            &self.config,
            &shaders,
            &attractors,
        ))?;

        self.gpu_state = Some(gpu_state);
        self.window = Some(window);
        Ok(())
    }

    /// Stop the loop, keeping the first error that caused it.
    fn terminate(&mut self, event_loop: &ActiveEventLoop, cause: Option<AppError>) {
        if self.error.is_none() {
            self.error = cause;
        }
        self.state = LoopState::Terminating;
        // surface and buffers go before the window they draw into
        self.gpu_state = None;
        self.window = None;
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.clock.begin_frame(Instant::now());
        if self.input.exit_requested() {
            info!("Exit requested");
            self.terminate(event_loop, None);
            return;
        }
        let Some(gpu_state) = &mut self.gpu_state else {
            return;
        };

        let dt = self.clock.dt();
        if let Err(e) = gpu_state.frame(dt) {
            error!("Frame failed: {}", e);
            self.terminate(event_loop, Some(e.into()));
            return;
        }
        self.input.begin_frame();

        if let Some(fps) = self.clock.end_frame(Instant::now()) {
            debug!("{} fps", fps);
            if let Some(window) = &self.window {
                window.set_title(&fps_title(APP_NAME, fps));
            }
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.state == LoopState::Terminating {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            error!("Initialization failed: {}", e);
            self.terminate(event_loop, Some(e));
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if self.state == LoopState::Terminating {
            return;
        }
        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                info!("Window closed");
                self.terminate(event_loop, None);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Open the window and run until the exit key, the close button, or a fatal
/// error.
pub fn run(config: ParticlesConfig) -> Result<(), AppError> {
    config.validate()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
