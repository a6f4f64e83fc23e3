//! Error type for FFT runtime operations.

/// Errors that can occur while configuring or driving the FFT runtime.
#[derive(Debug, thiserror::Error)]
pub enum FftError {
    #[error("kernel module is missing required kernel `{0}`")]
    InvalidKernelModule(&'static str),
    #[error("kernel source failed to parse: {0}")]
    InvalidShader(String),
    #[error("FFT size must be a power of 2 between 64 and 1024, got {0}")]
    InvalidSize(usize),
    #[error("FFT runtime has not been configured for a size")]
    NotConfigured,
    #[error("FFT runtime has been disposed")]
    Disposed,
    #[error("surface `{binding}` is {width}x{height}, expected {expected}x{expected}")]
    SurfaceMismatch {
        binding: &'static str,
        width: u32,
        height: u32,
        expected: u32,
    },
    #[error("surface format {0} cannot be written by the FFT kernels")]
    UnsupportedFormat(String),
    #[error("GPU allocation failed: {0}")]
    AllocationFailed(String),
    #[error("GPU buffer mapping failed: {0}")]
    BufferMapFailed(String),
}
