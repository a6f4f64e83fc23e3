//! Compute pipeline creation and caching for the FFT kernels.
//!
//! A kernel variant is fixed by the enabled size and channel keywords plus the
//! formats of the bound output surfaces. Variants are compiled on first use by
//! prefixing the kernel source with the matching constants and output
//! declarations.

use std::collections::HashMap;

use wgpu::{BindGroupLayout, ComputePipeline, Device, ShaderModule};

use crate::fft::{ChannelMode, FftSize, KernelId};
use crate::gpu::layouts::BindGroupLayoutBuilder;
use crate::gpu::textures::SurfaceFormat;

use super::params::PassParams;

/// WGSL binding slots shared by all kernels.
pub mod slot {
    pub const INPUT_RE: u32 = 0;
    pub const INPUT_IM: u32 = 1;
    pub const OUTPUT_RE: u32 = 2;
    pub const OUTPUT_IM: u32 = 3;
    pub const FIRST_STAGE: u32 = 4;
    pub const PARAMS: u32 = 5;
}

/// Largest workgroup used by the kernels.
const MAX_THREADS: u32 = 256;

/// Compile-time specialization of the kernel source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderVariant {
    pub size: FftSize,
    pub mode: ChannelMode,
    pub output_re: SurfaceFormat,
    pub output_im: SurfaceFormat,
}

impl ShaderVariant {
    /// Threads per workgroup: one butterfly each, capped at [`MAX_THREADS`].
    pub fn threads(&self) -> u32 {
        (self.size.len() as u32 / 2).min(MAX_THREADS)
    }

    /// Kernel source with this variant's constants and output declarations.
    pub fn specialize(&self, source: &str) -> String {
        format!(
            "const FFT_SIZE: u32 = {size}u;\n\
             const LOG_SIZE: u32 = {log}u;\n\
             const CHANNELS: u32 = {channels}u;\n\
             const THREADS: u32 = {threads}u;\n\
             @group(0) @binding({re_slot}) var outputRE: texture_storage_2d<{re}, write>;\n\
             @group(0) @binding({im_slot}) var outputIM: texture_storage_2d<{im}, write>;\n\
             {source}",
            size = self.size.len(),
            log = self.size.log2(),
            channels = self.mode.channels(),
            threads = self.threads(),
            re_slot = slot::OUTPUT_RE,
            im_slot = slot::OUTPUT_IM,
            re = self.output_re.wgsl_name(),
            im = self.output_im.wgsl_name(),
            source = source,
        )
    }
}

/// Which surface slots a dispatch binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundSlots {
    pub input_re: bool,
    pub input_im: bool,
    pub output_re: bool,
    pub output_im: bool,
}

/// Key of a compiled pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub kernel: KernelId,
    pub variant: ShaderVariant,
    pub slots: BoundSlots,
}

/// Pipeline plus the bind group layout it was created with.
pub struct CompiledKernel {
    pub layout: BindGroupLayout,
    pub pipeline: ComputePipeline,
}

/// Lazily compiled shader modules and pipelines.
#[derive(Default)]
pub struct PipelineCache {
    shaders: HashMap<ShaderVariant, ShaderModule>,
    pipelines: HashMap<PipelineKey, CompiledKernel>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Get the pipeline for `key`, compiling it on first use.
    pub fn get_or_create(
        &mut self,
        device: &Device,
        source: &str,
        entry_point: &str,
        key: PipelineKey,
    ) -> &CompiledKernel {
        if !self.pipelines.contains_key(&key) {
            let variant = key.variant;
            let shader = self.shaders.entry(variant).or_insert_with(|| {
                log::debug!("Compiling FFT kernel variant {:?}", variant);
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("fft2d_shader"),
                    source: wgpu::ShaderSource::Wgsl(variant.specialize(source).into()),
                })
            });
            let compiled = Self::create_kernel(device, shader, entry_point, &key);
            self.pipelines.insert(key, compiled);
        }
        &self.pipelines[&key]
    }

    fn create_layout(device: &Device, entry_point: &str, key: &PipelineKey) -> BindGroupLayout {
        let mut builder = BindGroupLayoutBuilder::new(format!("{}_layout", entry_point));
        if key.slots.input_re {
            builder = builder.texture_2d(slot::INPUT_RE);
        }
        if key.slots.input_im {
            builder = builder.texture_2d(slot::INPUT_IM);
        }
        if key.slots.output_re {
            builder = builder.storage_texture(
                slot::OUTPUT_RE,
                key.variant.output_re.texture_format(),
            );
        }
        if key.slots.output_im {
            builder = builder.storage_texture(
                slot::OUTPUT_IM,
                key.variant.output_im.texture_format(),
            );
        }
        builder
            .storage_buffer(slot::FIRST_STAGE)
            .dynamic_uniform(slot::PARAMS, std::mem::size_of::<PassParams>() as u64)
            .build(device)
    }

    fn create_kernel(
        device: &Device,
        shader: &ShaderModule,
        entry_point: &str,
        key: &PipelineKey,
    ) -> CompiledKernel {
        let layout = Self::create_layout(device, entry_point, key);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}_pipeline_layout", entry_point)),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{}_pipeline", entry_point)),
            layout: Some(&pipeline_layout),
            module: shader,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        CompiledKernel { layout, pipeline }
    }
}
