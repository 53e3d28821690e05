//! Blocking copies of GPU buffers back to the CPU.

use std::sync::mpsc;

use glam::Vec4;

use super::GpuContext;
use crate::error::GpuError;
use crate::store::RECORD_SIZE;

/// Copy the first `count` `vec4<f32>` records of `source` into a `Vec`.
///
/// `source` must have `COPY_SRC` usage. Waits for all submitted work to
/// finish before returning.
pub fn read_vec4s(ctx: &GpuContext, source: &wgpu::Buffer, count: usize) -> Result<Vec<Vec4>, GpuError> {
    let size = count as u64 * RECORD_SIZE;

    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.device.poll(wgpu::Maintain::Wait);

    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(GpuError::BufferMapping(e.to_string())),
        Err(_) => return Err(GpuError::BufferMapping("map callback never ran".into())),
    }

    let records = {
        let data = slice.get_mapped_range();
        // Vec4 is 16-byte aligned; the mapped range only guarantees 4.
        let raw: &[[f32; 4]] = bytemuck::cast_slice(&data[..]);
        raw.iter().copied().map(Vec4::from_array).collect()
    };
    staging.unmap();

    Ok(records)
}
