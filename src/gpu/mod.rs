//! GPU resources using wgpu.
//!
//! Device setup, floating-point surfaces and the compute backend that runs
//! the FFT kernels.

pub mod compute;
pub mod context;
pub mod layouts;
pub mod textures;

pub use compute::{FftComputeModule, ScratchBuffer};
pub use context::{GpuContext, GpuError};
pub use textures::{
    create_surface, create_surface_rect, ReadbackBuffer, StorageFormats, Surface, SurfaceFormat,
};

/// Runtime driving the wgpu kernels.
pub type GpuFftRuntime = crate::fft::FftRuntime<FftComputeModule>;
