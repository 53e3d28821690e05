//! Binding slots shared by the shaders and both pipelines.
//!
//! The compute kernel sees group 0 with positions, velocities and the
//! particle data block. The renderer streams positions as a per-instance
//! vertex attribute and reads the camera from its own group 0.
//!
//! The slots must agree with the `@binding`/`@location` declarations in the
//! shaders; [`LoadedShader::check_layout`](crate::shader::LoadedShader::check_layout)
//! rejects a layout that does not before any pipeline is built.

use crate::error::ConfigError;
use crate::store::RECORD_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingLayout {
    /// Compute group 0: particle positions, read/write storage.
    pub positions: u32,
    /// Compute group 0: particle velocities, read/write storage.
    pub velocities: u32,
    /// Compute group 0: `dt` plus attractors, uniform.
    pub particle_data: u32,
    /// Vertex shader location of the per-instance position.
    pub position_attribute: u32,
    /// Render group 0: camera uniform.
    pub camera: u32,
}

impl Default for BindingLayout {
    fn default() -> Self {
        Self {
            positions: 0,
            velocities: 1,
            particle_data: 2,
            position_attribute: 0,
            camera: 0,
        }
    }
}

impl BindingLayout {
    /// Reject layouts that put two compute resources on one slot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let slots = [self.positions, self.velocities, self.particle_data];
        for (i, slot) in slots.iter().enumerate() {
            if slots[..i].contains(slot) {
                return Err(ConfigError::DuplicateSlot(*slot));
            }
        }
        Ok(())
    }

    pub fn compute_entries(&self) -> [wgpu::BindGroupLayoutEntry; 3] {
        [
            storage_entry(self.positions),
            storage_entry(self.velocities),
            wgpu::BindGroupLayoutEntry {
                binding: self.particle_data,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ]
    }

    pub fn render_entries(&self) -> [wgpu::BindGroupLayoutEntry; 1] {
        [wgpu::BindGroupLayoutEntry {
            binding: self.camera,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }]
    }

    /// The single `vec4<f32>` attribute read from the position buffer.
    pub fn position_attribute(&self) -> [wgpu::VertexAttribute; 1] {
        [wgpu::VertexAttribute {
            offset: 0,
            shader_location: self.position_attribute,
            format: wgpu::VertexFormat::Float32x4,
        }]
    }

    pub fn position_stride(&self) -> wgpu::BufferAddress {
        RECORD_SIZE
    }
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
