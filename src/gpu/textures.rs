//! Surface management for FFT inputs and outputs.

use serde::{Deserialize, Serialize};
use wgpu::{
    Adapter, AddressMode, Device, FilterMode, Queue, Sampler, Texture, TextureFormat, TextureView,
};

use crate::fft::FftError;
use crate::gpu::GpuContext;

/// Texel formats offered to callers preparing transform surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceFormat {
    /// `R16Float`. Writable only where the adapter supports it.
    SingleChannelHalf,
    /// `Rgba16Float`.
    MultiChannelHalf,
    /// `R32Float`.
    SingleChannelFloat,
    /// `Rgba32Float`.
    MultiChannelFloat,
}

impl SurfaceFormat {
    pub const ALL: [SurfaceFormat; 4] = [
        SurfaceFormat::SingleChannelHalf,
        SurfaceFormat::MultiChannelHalf,
        SurfaceFormat::SingleChannelFloat,
        SurfaceFormat::MultiChannelFloat,
    ];

    pub fn texture_format(self) -> TextureFormat {
        match self {
            SurfaceFormat::SingleChannelHalf => TextureFormat::R16Float,
            SurfaceFormat::MultiChannelHalf => TextureFormat::Rgba16Float,
            SurfaceFormat::SingleChannelFloat => TextureFormat::R32Float,
            SurfaceFormat::MultiChannelFloat => TextureFormat::Rgba32Float,
        }
    }

    pub fn from_texture_format(format: TextureFormat) -> Option<Self> {
        match format {
            TextureFormat::R16Float => Some(SurfaceFormat::SingleChannelHalf),
            TextureFormat::Rgba16Float => Some(SurfaceFormat::MultiChannelHalf),
            TextureFormat::R32Float => Some(SurfaceFormat::SingleChannelFloat),
            TextureFormat::Rgba32Float => Some(SurfaceFormat::MultiChannelFloat),
            _ => None,
        }
    }

    /// Components stored per texel.
    pub fn components(self) -> usize {
        match self {
            SurfaceFormat::SingleChannelHalf | SurfaceFormat::SingleChannelFloat => 1,
            SurfaceFormat::MultiChannelHalf | SurfaceFormat::MultiChannelFloat => 4,
        }
    }

    pub fn is_half(self) -> bool {
        matches!(
            self,
            SurfaceFormat::SingleChannelHalf | SurfaceFormat::MultiChannelHalf
        )
    }

    pub fn bytes_per_texel(self) -> u32 {
        let component = if self.is_half() { 2 } else { 4 };
        (self.components() * component) as u32
    }

    /// WGSL storage texel format name.
    pub fn wgsl_name(self) -> &'static str {
        match self {
            SurfaceFormat::SingleChannelHalf => "r16float",
            SurfaceFormat::MultiChannelHalf => "rgba16float",
            SurfaceFormat::SingleChannelFloat => "r32float",
            SurfaceFormat::MultiChannelFloat => "rgba32float",
        }
    }

    fn index(self) -> usize {
        match self {
            SurfaceFormat::SingleChannelHalf => 0,
            SurfaceFormat::MultiChannelHalf => 1,
            SurfaceFormat::SingleChannelFloat => 2,
            SurfaceFormat::MultiChannelFloat => 3,
        }
    }
}

/// The surface formats compute kernels can write on one adapter and device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageFormats {
    writable: [bool; 4],
}

impl StorageFormats {
    /// Query storage support for every [`SurfaceFormat`].
    ///
    /// A format counts as writable when the adapter allows `STORAGE_BINDING`
    /// for it. Formats outside the WebGPU baseline (`R16Float`) additionally
    /// need `TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES` enabled on the device.
    pub fn query(adapter: &Adapter, device: &Device) -> Self {
        let adapter_specific = device
            .features()
            .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES);

        let mut writable = [false; 4];
        for format in SurfaceFormat::ALL {
            let texture_format = format.texture_format();
            let allowed = adapter
                .get_texture_format_features(texture_format)
                .allowed_usages
                .contains(wgpu::TextureUsages::STORAGE_BINDING);
            let baseline = texture_format
                .guaranteed_format_features(wgpu::Features::empty())
                .allowed_usages
                .contains(wgpu::TextureUsages::STORAGE_BINDING);
            writable[format.index()] = allowed && (baseline || adapter_specific);
        }
        Self { writable }
    }

    /// Set holding exactly `formats`.
    pub fn from_formats(formats: &[SurfaceFormat]) -> Self {
        let mut writable = [false; 4];
        for format in formats {
            writable[format.index()] = true;
        }
        Self { writable }
    }

    pub fn contains(&self, format: SurfaceFormat) -> bool {
        self.writable[format.index()]
    }

    /// `Ok` when kernels can write `format`, `UnsupportedFormat` otherwise.
    pub fn check(&self, format: SurfaceFormat) -> Result<(), FftError> {
        if self.contains(format) {
            Ok(())
        } else {
            Err(FftError::UnsupportedFormat(format!("{:?}", format)))
        }
    }
}

/// A GPU-writable 2D surface that owns its texture, view and sampler.
pub struct Surface {
    texture: Texture,
    view: TextureView,
    sampler: Sampler,
    format: SurfaceFormat,
    address_mode: AddressMode,
    filter_mode: FilterMode,
}

impl Surface {
    /// Create a surface with no mip chain, usable as kernel input and output.
    ///
    /// Fails with [`FftError::UnsupportedFormat`] when `storage` does not
    /// list `format`; the texture is never created in that case.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &Device,
        storage: &StorageFormats,
        label: &str,
        format: SurfaceFormat,
        filter_mode: FilterMode,
        width: u32,
        height: u32,
        address_mode: AddressMode,
    ) -> Result<Self, FftError> {
        storage.check(format)?;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: format.texture_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: filter_mode,
            min_filter: filter_mode,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            format,
            address_mode,
            filter_mode,
        })
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Sampler carrying the surface's wrap and filter modes.
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    pub fn address_mode(&self) -> AddressMode {
        self.address_mode
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    /// Number of f32 values in a full texel plane of this surface.
    pub fn texel_count(&self) -> usize {
        self.width() as usize * self.height() as usize * self.format.components()
    }

    /// Upload row-major texels, `format.components()` values per texel.
    ///
    /// # Panics
    ///
    /// Panics if `texels.len()` does not match [`Surface::texel_count`].
    pub fn upload(&self, queue: &Queue, texels: &[f32]) {
        assert_eq!(
            texels.len(),
            self.texel_count(),
            "texel count does not match surface"
        );

        let halves: Vec<half::f16>;
        let bytes: &[u8] = if self.format.is_half() {
            halves = texels.iter().map(|&v| half::f16::from_f32(v)).collect();
            bytemuck::cast_slice(&halves)
        } else {
            bytemuck::cast_slice(texels)
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width() * self.format.bytes_per_texel()),
                rows_per_image: Some(self.height()),
            },
            self.extent(),
        );
    }

    /// Copy the surface back to the CPU as row-major f32 texels.
    ///
    /// Blocks until the GPU has finished all submitted work.
    pub fn read_texels(&self, device: &Device, queue: &Queue) -> Result<Vec<f32>, FftError> {
        let readback = ReadbackBuffer::new(
            device,
            self.width(),
            self.height(),
            self.format.bytes_per_texel(),
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("surface_readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: readback.buffer(),
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(readback.padded_row_bytes()),
                    rows_per_image: Some(self.height()),
                },
            },
            self.extent(),
        );
        queue.submit(std::iter::once(encoder.finish()));

        let bytes = readback.read_bytes(device)?;
        // Readback bytes are not guaranteed to be aligned for a direct cast.
        let texels = if self.format.is_half() {
            bytes
                .chunks_exact(2)
                .map(|c| half::f16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect()
        } else {
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        };
        Ok(texels)
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width(),
            height: self.height(),
            depth_or_array_layers: 1,
        }
    }
}

/// Create a square surface for frequency-domain data (wraps with `Repeat`).
pub fn create_surface(
    ctx: &GpuContext,
    format: SurfaceFormat,
    filter_mode: FilterMode,
    size: u32,
) -> Result<Surface, FftError> {
    Surface::new(
        &ctx.device,
        &ctx.storage_formats,
        "fft_surface",
        format,
        filter_mode,
        size,
        size,
        AddressMode::Repeat,
    )
}

/// Create a rectangular surface (wraps with `ClampToEdge`).
pub fn create_surface_rect(
    ctx: &GpuContext,
    format: SurfaceFormat,
    filter_mode: FilterMode,
    width: u32,
    height: u32,
) -> Result<Surface, FftError> {
    Surface::new(
        &ctx.device,
        &ctx.storage_formats,
        "fft_surface_rect",
        format,
        filter_mode,
        width,
        height,
        AddressMode::ClampToEdge,
    )
}

/// Readback buffer for copying GPU texture data to CPU.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    height: u32,
    padded_row_bytes: u32,
    unpadded_row_bytes: u32,
}

impl ReadbackBuffer {
    /// Create a new readback buffer sized for the given dimensions.
    pub fn new(device: &Device, width: u32, height: u32, bytes_per_texel: u32) -> Self {
        let unpadded_row_bytes = width * bytes_per_texel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row_bytes = unpadded_row_bytes.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: (padded_row_bytes * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            height,
            padded_row_bytes,
            unpadded_row_bytes,
        }
    }

    /// Get the underlying buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Get the padded bytes per row (for texture copy).
    pub fn padded_row_bytes(&self) -> u32 {
        self.padded_row_bytes
    }

    /// Map the buffer and return its rows with padding removed.
    pub fn read_bytes(&self, device: &Device) -> Result<Vec<u8>, FftError> {
        let buffer_slice = self.buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| FftError::BufferMapFailed(e.to_string()))?;
        rx.recv()
            .map_err(|e| FftError::BufferMapFailed(e.to_string()))?
            .map_err(|e| FftError::BufferMapFailed(format!("{:?}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let mut bytes = Vec::with_capacity((self.unpadded_row_bytes * self.height) as usize);
        for row in 0..self.height {
            let start = (row * self.padded_row_bytes) as usize;
            let end = start + self.unpadded_row_bytes as usize;
            bytes.extend_from_slice(&data[start..end]);
        }
        drop(data);
        self.buffer.unmap();

        Ok(bytes)
    }
}
