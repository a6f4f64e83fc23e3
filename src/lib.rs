//! GPU FFT 2D
//!
//! Square, power-of-two 2D Fourier transforms computed on the GPU with wgpu
//! compute shaders. Images stay resident on the GPU as floating-point
//! surfaces; the transform runs as a horizontal then a vertical pass over a
//! shared scratch buffer.
//!
//! # Features
//!
//! - Forward (real to complex), inverse (complex to real) and normalized
//!   magnitude spectrum transforms
//! - Sizes 64 through 1024, single or three-channel
//! - Zero frequency centred in the output
//! - Immediate submission or recording into a caller-owned command encoder
//! - Image conversion helpers via the `image` crate

pub mod fft;
pub mod gpu;
pub mod image_io;

// Re-export commonly used types
pub use fft::{
    bit_reverse_indices, ChannelMode, Execution, FftConfig, FftError, FftRuntime, FftSize, Kernel,
    KernelModule,
};
pub use gpu::{
    create_surface, create_surface_rect, FftComputeModule, GpuContext, GpuError, GpuFftRuntime,
    StorageFormats, Surface, SurfaceFormat,
};
pub use image_io::{fit_to_size, image_to_texels, texels_to_image};
