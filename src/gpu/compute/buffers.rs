//! GPU buffer management for FFT operations.

use std::sync::Arc;

use wgpu::{Buffer, BufferUsages, Device, Queue};

use super::params::PassParams;

/// Scratch ("first stage") buffer shared by the three kernels.
///
/// Holds one `Complex3` per texel between the horizontal and vertical passes.
/// Clones share one allocation, which is freed when the last handle drops.
#[derive(Clone)]
pub struct ScratchBuffer {
    buffer: Arc<Buffer>,
    element_count: usize,
}

impl ScratchBuffer {
    pub fn new(device: &Device, element_count: usize, element_size: usize) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fft_first_stage_buffer"),
            size: (element_count * element_size) as u64,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer: Arc::new(buffer),
            element_count,
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Whether `self` and `other` refer to the same GPU allocation.
    pub fn same_allocation(&self, other: &ScratchBuffer) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

/// Uniform buffer with one aligned [`PassParams`] slot per flag combination.
pub struct PassParamBuffer {
    buffer: Buffer,
    stride: u32,
}

impl PassParamBuffer {
    /// Create the buffer and write every slot once.
    pub fn new(device: &Device, queue: &Queue) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment;
        let size = std::mem::size_of::<PassParams>() as u32;
        let stride = size.div_ceil(alignment) * alignment;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fft_pass_params"),
            size: (stride as usize * PassParams::SLOTS) as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        for (slot, flags) in PassParams::all_flags().into_iter().enumerate() {
            let params = PassParams::new(flags);
            queue.write_buffer(
                &buffer,
                (slot as u32 * stride) as u64,
                bytemuck::bytes_of(&params),
            );
        }

        Self { buffer, stride }
    }

    /// Dynamic offset selecting the slot for `flags`.
    pub fn offset(&self, flags: crate::fft::PassFlags) -> u32 {
        PassParams::slot(flags) as u32 * self.stride
    }

    /// Binding covering a single slot.
    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: wgpu::BufferSize::new(std::mem::size_of::<PassParams>() as u64),
        })
    }
}
