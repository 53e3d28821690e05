//! The compute pipeline that advances every particle by one step.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::{dispatch_size, GpuContext};
use crate::attractors::{AttractorSet, ParticleDataBlock};
use crate::binding::BindingLayout;
use crate::error::ShaderError;
use crate::physics::ForceLaw;
use crate::shader::LoadedShader;
use crate::store::ParticleStore;
use crate::sync::{FrameFence, PendingWrites};

pub struct SimulationStage {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    data_buffer: wgpu::Buffer,
    particle_count: u32,
}

impl SimulationStage {
    /// Build the pipeline and upload the attractors. Only `dt` changes after
    /// this.
    pub fn new(
        ctx: &GpuContext,
        shader: &LoadedShader,
        store: &ParticleStore,
        attractors: &AttractorSet,
        force: &ForceLaw,
        bindings: &BindingLayout,
    ) -> Result<Self, ShaderError> {
        shader.check_layout(bindings)?;
        let device = &ctx.device;
        let module = shader.create_module(ctx)?;

        let block = ParticleDataBlock::new(0.0, attractors);
        let data_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Data Buffer"),
            contents: block.as_bytes(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Simulation Bind Group Layout"),
            entries: &bindings.compute_entries(),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Simulation Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: bindings.positions,
                    resource: store.positions().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: bindings.velocities,
                    resource: store.velocities().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: bindings.particle_data,
                    resource: data_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Simulation Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let constants = override_constants(attractors.len(), force);
        let (pipeline, error) = ctx.scoped(wgpu::ErrorFilter::Validation, |device| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Simulation Pipeline"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(shader.kind.entry_point()),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
                cache: None,
            })
        });
        if let Some(e) = error {
            return Err(ShaderError::Link {
                program: "simulation".to_string(),
                log: e.to_string(),
            });
        }

        Ok(Self {
            pipeline,
            bind_group,
            data_buffer,
            particle_count: store.len(),
        })
    }

    /// Record one integration step of `dt` seconds.
    ///
    /// `dt` is staged on the queue and lands before the encoder's commands
    /// run. The returned token must pass the fence barrier before a draw can
    /// read the results.
    pub fn dispatch(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        dt: f32,
        fence: &mut FrameFence,
    ) -> PendingWrites {
        // dt is scalar 0, the first four bytes of the block
        queue.write_buffer(&self.data_buffer, 0, bytemuck::bytes_of(&dt));

        let writes = fence.begin_writes();
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Simulation Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(dispatch_size(self.particle_count), 1, 1);
        writes
    }
}

/// Pipeline-overridable constants of `shaders/particles.wgsl`.
fn override_constants(attractor_count: usize, force: &ForceLaw) -> HashMap<String, f64> {
    HashMap::from([
        ("attractor_count".to_string(), attractor_count as f64),
        ("strength".to_string(), force.strength as f64),
        ("softening".to_string(), force.softening as f64),
    ])
}
