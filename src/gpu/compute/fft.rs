//! wgpu implementation of the FFT kernel module.

use std::sync::Arc;
use wgpu::{Device, Queue};

use crate::fft::{
    Bindings, ChannelMode, FftError, FftSize, KernelId, KernelModule, PassFlags,
    SCRATCH_BUFFER_BINDING,
};
use crate::gpu::textures::{StorageFormats, Surface, SurfaceFormat};
use crate::gpu::GpuContext;

use super::buffers::{PassParamBuffer, ScratchBuffer};
use super::pipelines::{slot, BoundSlots, PipelineCache, PipelineKey, ShaderVariant};

/// Source of the bundled `R2C`/`C2R`/`R2R` kernels.
pub const FFT_KERNEL_SOURCE: &str = include_str!("../shaders/fft2d.wgsl");

/// Names of the `@compute` entry points declared in a WGSL source, in order.
///
/// The source is parsed as the smallest multi-channel variant so the
/// generated constants and output declarations resolve.
pub fn compute_entry_points(source: &str) -> Result<Vec<String>, FftError> {
    let placeholder = ShaderVariant {
        size: FftSize::S64,
        mode: ChannelMode::Multi,
        output_re: SurfaceFormat::MultiChannelFloat,
        output_im: SurfaceFormat::MultiChannelFloat,
    };
    let specialized = placeholder.specialize(source);
    let module = naga::front::wgsl::parse_str(&specialized)
        .map_err(|e| FftError::InvalidShader(e.emit_to_string(&specialized)))?;

    Ok(module
        .entry_points
        .iter()
        .filter(|entry| entry.stage == naga::ShaderStage::Compute)
        .map(|entry| entry.name.clone())
        .collect())
}

/// GPU program holding the FFT kernels and their specialization state.
pub struct FftComputeModule {
    device: Arc<Device>,
    queue: Arc<Queue>,
    storage: StorageFormats,
    source: String,
    entry_points: Vec<String>,
    size: Option<FftSize>,
    mode: Option<ChannelMode>,
    scratch: Vec<Option<ScratchBuffer>>,
    params: PassParamBuffer,
    pipelines: PipelineCache,
}

impl FftComputeModule {
    /// Module over the bundled kernels.
    pub fn new(ctx: &GpuContext) -> Result<Self, FftError> {
        Self::with_source(ctx, FFT_KERNEL_SOURCE)
    }

    /// Module over a custom kernel source.
    ///
    /// The source must not declare `outputRE`, `outputIM` or the size
    /// constants; those are generated per variant by [`ShaderVariant::specialize`].
    /// Fails with [`FftError::InvalidShader`] if the source does not parse.
    pub fn with_source(ctx: &GpuContext, source: impl Into<String>) -> Result<Self, FftError> {
        let source = source.into();
        let entry_points = compute_entry_points(&source)?;
        let params = PassParamBuffer::new(&ctx.device, &ctx.queue);

        Ok(Self {
            device: Arc::clone(&ctx.device),
            queue: Arc::clone(&ctx.queue),
            storage: ctx.storage_formats,
            scratch: vec![None; entry_points.len()],
            source,
            entry_points,
            size: None,
            mode: None,
            params,
            pipelines: PipelineCache::new(),
        })
    }

    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }

    /// Size selected by the enabled size keyword.
    pub fn active_size(&self) -> Option<FftSize> {
        self.size
    }

    /// Channel mode selected by the enabled channel keyword.
    pub fn active_mode(&self) -> Option<ChannelMode> {
        self.mode
    }

    /// Number of pipeline variants compiled so far.
    pub fn compiled_variants(&self) -> usize {
        self.pipelines.len()
    }

    fn pipeline_key(
        &self,
        kernel: KernelId,
        bindings: &Bindings<'_, Surface>,
    ) -> Result<PipelineKey, FftError> {
        let size = self.size.ok_or(FftError::NotConfigured)?;
        let mode = self.mode.ok_or(FftError::NotConfigured)?;

        let output_re = bindings.output_re.map(Surface::format);
        let output_im = bindings.output_im.map(Surface::format);
        for format in [output_re, output_im].into_iter().flatten() {
            self.storage.check(format)?;
        }
        let output_re = output_re
            .or(output_im)
            .unwrap_or(SurfaceFormat::MultiChannelFloat);
        let output_im = output_im.unwrap_or(output_re);

        Ok(PipelineKey {
            kernel,
            variant: ShaderVariant {
                size,
                mode,
                output_re,
                output_im,
            },
            slots: BoundSlots {
                input_re: bindings.input_re.is_some(),
                input_im: bindings.input_im.is_some(),
                output_re: bindings.output_re.is_some(),
                output_im: bindings.output_im.is_some(),
            },
        })
    }
}

impl KernelModule for FftComputeModule {
    type Buffer = ScratchBuffer;
    type Surface = Surface;
    type Encoder = wgpu::CommandEncoder;

    fn find_kernel(&self, name: &str) -> Option<KernelId> {
        self.entry_points
            .iter()
            .position(|entry| entry == name)
            .map(|i| KernelId(i as u32))
    }

    fn set_keyword(&mut self, keyword: &str, enabled: bool) {
        if let Some(size) = FftSize::from_keyword(keyword) {
            if enabled {
                self.size = Some(size);
            } else if self.size == Some(size) {
                self.size = None;
            }
        } else if let Some(mode) = ChannelMode::from_keyword(keyword) {
            if enabled {
                self.mode = Some(mode);
            } else if self.mode == Some(mode) {
                self.mode = None;
            }
        } else {
            log::warn!("Ignoring unknown FFT keyword `{}`", keyword);
        }
    }

    fn allocate_buffer(
        &mut self,
        element_count: usize,
        element_size: usize,
    ) -> Result<ScratchBuffer, FftError> {
        let bytes = (element_count * element_size) as u64;
        let limit = self.device.limits().max_storage_buffer_binding_size as u64;
        if bytes > limit {
            return Err(FftError::AllocationFailed(format!(
                "{} bytes exceeds the storage binding limit of {} bytes",
                bytes, limit
            )));
        }
        Ok(ScratchBuffer::new(&self.device, element_count, element_size))
    }

    fn release_buffer(&mut self, buffer: ScratchBuffer) {
        for bound in &mut self.scratch {
            if bound.as_ref().is_some_and(|b| b.same_allocation(&buffer)) {
                *bound = None;
            }
        }
        // Deferred command buffers may still reference the allocation, so it
        // is freed once the last handle drops rather than destroyed here.
        drop(buffer);
    }

    fn bind_buffer(&mut self, kernel: KernelId, name: &str, buffer: &ScratchBuffer) {
        if name != SCRATCH_BUFFER_BINDING {
            log::warn!("Ignoring unknown buffer binding `{}`", name);
            return;
        }
        if let Some(bound) = self.scratch.get_mut(kernel.0 as usize) {
            *bound = Some(buffer.clone());
        }
    }

    fn surface_extent(&self, surface: &Surface) -> (u32, u32) {
        (surface.width(), surface.height())
    }

    fn begin(&mut self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("fft_encoder"),
            })
    }

    fn dispatch(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        kernel: KernelId,
        bindings: Bindings<'_, Surface>,
        flags: PassFlags,
        groups: [u32; 3],
    ) -> Result<(), FftError> {
        let scratch = self
            .scratch
            .get(kernel.0 as usize)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or(FftError::NotConfigured)?;
        let key = self.pipeline_key(kernel, &bindings)?;
        let entry_point = &self.entry_points[kernel.0 as usize];
        let compiled = self
            .pipelines
            .get_or_create(&self.device, &self.source, entry_point, key);

        let mut entries = Vec::with_capacity(6);
        for (binding, surface) in [
            (slot::INPUT_RE, bindings.input_re),
            (slot::INPUT_IM, bindings.input_im),
            (slot::OUTPUT_RE, bindings.output_re),
            (slot::OUTPUT_IM, bindings.output_im),
        ] {
            if let Some(surface) = surface {
                entries.push(wgpu::BindGroupEntry {
                    binding,
                    resource: wgpu::BindingResource::TextureView(surface.view()),
                });
            }
        }
        entries.push(wgpu::BindGroupEntry {
            binding: slot::FIRST_STAGE,
            resource: scratch.buffer().as_entire_binding(),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: slot::PARAMS,
            resource: self.params.binding(),
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(entry_point),
            layout: &compiled.layout,
            entries: &entries,
        });

        let label = if flags.horizontal {
            "fft_horizontal_pass"
        } else {
            "fft_vertical_pass"
        };
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        pass.set_pipeline(&compiled.pipeline);
        pass.set_bind_group(0, &bind_group, &[self.params.offset(flags)]);
        pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        Ok(())
    }

    fn submit(&mut self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(Some(encoder.finish()));
    }
}
