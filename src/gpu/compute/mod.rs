//! GPU compute backend for the 2D FFT.
//!
//! [`FftComputeModule`] implements [`crate::fft::KernelModule`] on top of wgpu
//! compute pipelines compiled from the bundled WGSL kernels.

mod buffers;
mod params;

pub mod fft;
pub mod pipelines;

pub use buffers::ScratchBuffer;
pub use fft::{compute_entry_points, FftComputeModule, FFT_KERNEL_SOURCE};
pub use params::PassParams;
