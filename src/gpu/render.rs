//! The render pipeline that draws the position buffer as a point cloud.

use wgpu::util::DeviceExt;

use super::GpuContext;
use crate::binding::BindingLayout;
use crate::camera::Camera;
use crate::error::{ShaderError, SyncError};
use crate::shader::LoadedShader;
use crate::store::ParticleStore;
use crate::sync::{FrameFence, VisibleWrites};

/// Vertices per particle quad (two triangles).
const QUAD_VERTICES: u32 = 6;

pub struct RenderStage {
    pipeline: wgpu::RenderPipeline,
    camera_bind_group: wgpu::BindGroup,
    // kept alive for the bind group
    _camera_buffer: wgpu::Buffer,
}

impl RenderStage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: &GpuContext,
        vertex: &LoadedShader,
        fragment: &LoadedShader,
        format: wgpu::TextureFormat,
        camera: &Camera,
        viewport: (u32, u32),
        point_size: f32,
        bindings: &BindingLayout,
    ) -> Result<Self, ShaderError> {
        vertex.check_layout(bindings)?;
        fragment.check_layout(bindings)?;
        let device = &ctx.device;
        let vertex_module = vertex.create_module(ctx)?;
        let fragment_module = fragment.create_module(ctx)?;

        let uniform = camera.uniform(viewport, point_size);
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &bindings.render_entries(),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: bindings.camera,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            push_constant_ranges: &[],
        });

        let attributes = bindings.position_attribute();
        let (pipeline, error) = ctx.scoped(wgpu::ErrorFilter::Validation, |device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some(vertex.kind.entry_point()),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: bindings.position_stride(),
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &attributes,
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment_module,
                    entry_point: Some(fragment.kind.entry_point()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(additive_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
        if let Some(e) = error {
            return Err(ShaderError::Link {
                program: "render".to_string(),
                log: e.to_string(),
            });
        }

        Ok(Self {
            pipeline,
            camera_bind_group,
            _camera_buffer: camera_buffer,
        })
    }

    /// Clear `view` to black and draw every particle in `store`.
    ///
    /// Refuses to record anything unless `writes` is the latest compute
    /// epoch.
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        store: &ParticleStore,
        writes: &VisibleWrites,
        fence: &mut FrameFence,
    ) -> Result<(), SyncError> {
        fence.begin_reads(writes)?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_vertex_buffer(0, store.positions().slice(..));
        pass.draw(0..QUAD_VERTICES, 0..store.len());
        Ok(())
    }
}

/// `dst + src`: overlapping particles brighten instead of hiding each other.
fn additive_blend() -> wgpu::BlendState {
    let add = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: add,
        alpha: add,
    }
}
