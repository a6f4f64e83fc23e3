//! Backend-neutral FFT runtime.
//!
//! This module provides:
//! - The [`FftRuntime`] orchestrator (configuration, scratch buffer, passes)
//! - The [`KernelModule`] contract a GPU backend implements
//! - Size/channel enums and the bit-reversal utility

pub mod config;
pub mod error;
pub mod kernel;
pub mod runtime;
pub mod size;

pub use config::FftConfig;
pub use error::FftError;
pub use kernel::{
    binding, Bindings, Complex3, Execution, Kernel, KernelId, KernelModule, PassFlags,
    SCRATCH_BUFFER_BINDING,
};
pub use runtime::FftRuntime;
pub use size::{
    bit_reverse_indices, ChannelMode, FftSize, CHANNEL_KEYWORDS, MAX_SIZE, MIN_SIZE,
    SIZE_KEYWORDS,
};
