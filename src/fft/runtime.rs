//! 2D radix-2 FFT runtime.
//!
//! Orchestrates a [`KernelModule`]: validates its kernels, keeps the size and
//! channel keywords and the scratch buffer consistent with the configured
//! size, and issues the horizontal and vertical passes of each transform.

use std::time::Instant;

use super::config::FftConfig;
use super::error::FftError;
use super::kernel::{
    Bindings, Complex3, Execution, Kernel, KernelId, KernelModule, PassFlags,
    SCRATCH_BUFFER_BINDING,
};
use super::size::{ChannelMode, FftSize, CHANNEL_KEYWORDS, SIZE_KEYWORDS};

/// Scratch buffer plus the size and mode it was allocated for.
struct Configuration<B> {
    size: FftSize,
    mode: ChannelMode,
    scratch: B,
}

enum State<B> {
    Unconfigured,
    Configured(Configuration<B>),
    Disposed,
}

/// GPU 2D FFT runtime over a kernel module `M`.
///
/// Not thread-safe: all operations take `&mut self`, so one instance serves
/// one transform pipeline at a time.
pub struct FftRuntime<M: KernelModule> {
    module: M,
    kernels: [KernelId; 3],
    state: State<M::Buffer>,
}

impl<M: KernelModule> FftRuntime<M> {
    /// Bind a kernel module, leaving the runtime unconfigured.
    ///
    /// Fails with [`FftError::InvalidKernelModule`] if `R2C`, `C2R` or `R2R`
    /// cannot be found in the module.
    pub fn new(module: M) -> Result<Self, FftError> {
        let mut kernels = [KernelId(0); 3];
        for kernel in Kernel::ALL {
            kernels[kernel.index()] = module
                .find_kernel(kernel.name())
                .ok_or(FftError::InvalidKernelModule(kernel.name()))?;
        }

        Ok(Self {
            module,
            kernels,
            state: State::Unconfigured,
        })
    }

    /// Bind a kernel module and configure it for `size` and `mode`.
    pub fn with_size(module: M, size: usize, mode: ChannelMode) -> Result<Self, FftError> {
        let mut runtime = Self::new(module)?;
        runtime.configure_for_size(size, mode)?;
        Ok(runtime)
    }

    pub fn from_config(module: M, config: &FftConfig) -> Result<Self, FftError> {
        Self::with_size(module, config.size, config.mode)
    }

    /// Reconfigure for a new size and channel mode.
    ///
    /// Allocates a `size * size` scratch buffer, releases the previous one and
    /// switches the module's size and channel keywords. On error the previous
    /// configuration stays in place.
    pub fn configure_for_size(&mut self, size: usize, mode: ChannelMode) -> Result<(), FftError> {
        if matches!(self.state, State::Disposed) {
            return Err(FftError::Disposed);
        }
        let size = FftSize::new(size)?;
        let scratch = self
            .module
            .allocate_buffer(size.len() * size.len(), std::mem::size_of::<Complex3>())?;

        if let State::Configured(previous) =
            std::mem::replace(&mut self.state, State::Unconfigured)
        {
            self.module.release_buffer(previous.scratch);
        }

        for keyword in SIZE_KEYWORDS {
            self.module.set_keyword(keyword, false);
        }
        self.module.set_keyword(size.keyword(), true);

        for kernel in self.kernels {
            self.module
                .bind_buffer(kernel, SCRATCH_BUFFER_BINDING, &scratch);
        }

        for keyword in CHANNEL_KEYWORDS {
            self.module.set_keyword(keyword, false);
        }
        self.module.set_keyword(mode.keyword(), true);

        log::debug!(
            "FFT runtime configured for {}x{} ({:?})",
            size.len(),
            size.len(),
            mode
        );
        self.state = State::Configured(Configuration {
            size,
            mode,
            scratch,
        });
        Ok(())
    }

    pub fn configure(&mut self, config: &FftConfig) -> Result<(), FftError> {
        self.configure_for_size(config.size, config.mode)
    }

    /// Currently configured side length.
    pub fn size(&self) -> Option<usize> {
        self.fft_size().map(FftSize::len)
    }

    pub fn fft_size(&self) -> Option<FftSize> {
        match &self.state {
            State::Configured(config) => Some(config.size),
            _ => None,
        }
    }

    pub fn log_size(&self) -> Option<u32> {
        self.fft_size().map(FftSize::log2)
    }

    pub fn channel_mode(&self) -> Option<ChannelMode> {
        match &self.state {
            State::Configured(config) => Some(config.mode),
            _ => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.state, State::Configured(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, State::Disposed)
    }

    /// The bound kernel module.
    pub fn module(&self) -> &M {
        &self.module
    }

    /// Forward real-to-complex transform, zero frequency centred.
    pub fn forward(
        &mut self,
        input_re: &M::Surface,
        output_re: &M::Surface,
        output_im: &M::Surface,
    ) -> Result<(), FftError> {
        self.transform(
            Kernel::R2C,
            Self::forward_bindings(input_re, output_re, output_im),
            Execution::Immediate,
        )
    }

    /// [`FftRuntime::forward`] recorded into `encoder`.
    pub fn forward_deferred(
        &mut self,
        encoder: &mut M::Encoder,
        input_re: &M::Surface,
        output_re: &M::Surface,
        output_im: &M::Surface,
    ) -> Result<(), FftError> {
        self.transform(
            Kernel::R2C,
            Self::forward_bindings(input_re, output_re, output_im),
            Execution::Deferred(encoder),
        )
    }

    /// Inverse complex-to-real transform of a zero-frequency-centred spectrum.
    pub fn inverse(
        &mut self,
        input_re: &M::Surface,
        input_im: &M::Surface,
        output_re: &M::Surface,
    ) -> Result<(), FftError> {
        self.transform(
            Kernel::C2R,
            Self::inverse_bindings(input_re, input_im, output_re),
            Execution::Immediate,
        )
    }

    /// [`FftRuntime::inverse`] recorded into `encoder`.
    pub fn inverse_deferred(
        &mut self,
        encoder: &mut M::Encoder,
        input_re: &M::Surface,
        input_im: &M::Surface,
        output_re: &M::Surface,
    ) -> Result<(), FftError> {
        self.transform(
            Kernel::C2R,
            Self::inverse_bindings(input_re, input_im, output_re),
            Execution::Deferred(encoder),
        )
    }

    /// Magnitude spectrum of a real surface, zero frequency centred.
    pub fn power_spectrum(
        &mut self,
        input_re: &M::Surface,
        output_re: &M::Surface,
    ) -> Result<(), FftError> {
        self.transform(
            Kernel::R2R,
            Self::spectrum_bindings(input_re, output_re),
            Execution::Immediate,
        )
    }

    /// [`FftRuntime::power_spectrum`] recorded into `encoder`.
    pub fn power_spectrum_deferred(
        &mut self,
        encoder: &mut M::Encoder,
        input_re: &M::Surface,
        output_re: &M::Surface,
    ) -> Result<(), FftError> {
        self.transform(
            Kernel::R2R,
            Self::spectrum_bindings(input_re, output_re),
            Execution::Deferred(encoder),
        )
    }

    /// Release the scratch buffer. Safe to call more than once.
    pub fn dispose(&mut self) {
        match std::mem::replace(&mut self.state, State::Disposed) {
            State::Configured(config) => {
                self.module.release_buffer(config.scratch);
                log::debug!("FFT runtime disposed");
            }
            State::Unconfigured => log::debug!("FFT runtime disposed"),
            State::Disposed => {}
        }
    }

    // --- Private helpers ---

    fn forward_bindings<'a>(
        input_re: &'a M::Surface,
        output_re: &'a M::Surface,
        output_im: &'a M::Surface,
    ) -> Bindings<'a, M::Surface> {
        Bindings {
            input_re: Some(input_re),
            input_im: None,
            output_re: Some(output_re),
            output_im: Some(output_im),
        }
    }

    fn inverse_bindings<'a>(
        input_re: &'a M::Surface,
        input_im: &'a M::Surface,
        output_re: &'a M::Surface,
    ) -> Bindings<'a, M::Surface> {
        Bindings {
            input_re: Some(input_re),
            input_im: Some(input_im),
            output_re: Some(output_re),
            output_im: None,
        }
    }

    fn spectrum_bindings<'a>(
        input_re: &'a M::Surface,
        output_re: &'a M::Surface,
    ) -> Bindings<'a, M::Surface> {
        Bindings {
            input_re: Some(input_re),
            input_im: None,
            output_re: Some(output_re),
            output_im: None,
        }
    }

    fn configured_size(&self) -> Result<FftSize, FftError> {
        match &self.state {
            State::Configured(config) => Ok(config.size),
            State::Unconfigured => Err(FftError::NotConfigured),
            State::Disposed => Err(FftError::Disposed),
        }
    }

    fn check_surfaces(
        &self,
        bindings: Bindings<'_, M::Surface>,
        size: FftSize,
    ) -> Result<(), FftError> {
        let expected = size.len() as u32;
        for (binding, surface) in bindings.iter() {
            let (width, height) = self.module.surface_extent(surface);
            if width != expected || height != expected {
                return Err(FftError::SurfaceMismatch {
                    binding,
                    width,
                    height,
                    expected,
                });
            }
        }
        Ok(())
    }

    /// Shared path of every transform: horizontal pass, then vertical pass.
    fn transform(
        &mut self,
        kernel: Kernel,
        bindings: Bindings<'_, M::Surface>,
        execution: Execution<'_, M::Encoder>,
    ) -> Result<(), FftError> {
        let size = self.configured_size()?;
        self.check_surfaces(bindings, size)?;

        match execution {
            Execution::Immediate => {
                let started = Instant::now();
                let mut encoder = self.module.begin();
                self.encode_passes(&mut encoder, kernel, bindings, size)?;
                self.module.submit(encoder);
                log::debug!(
                    "{} {}x{} submitted in {:?}",
                    kernel.name(),
                    size.len(),
                    size.len(),
                    started.elapsed()
                );
            }
            Execution::Deferred(encoder) => {
                self.encode_passes(encoder, kernel, bindings, size)?;
                log::debug!("{} {}x{} recorded", kernel.name(), size.len(), size.len());
            }
        }
        Ok(())
    }

    fn encode_passes(
        &mut self,
        encoder: &mut M::Encoder,
        kernel: Kernel,
        bindings: Bindings<'_, M::Surface>,
        size: FftSize,
    ) -> Result<(), FftError> {
        let id = self.kernels[kernel.index()];
        let groups = [1, size.len() as u32, 1];
        for horizontal in [true, false] {
            let flags = PassFlags {
                inverse: kernel.inverse(),
                horizontal,
            };
            self.module.dispatch(encoder, id, bindings, flags, groups)?;
        }
        Ok(())
    }
}

impl<M: KernelModule> Drop for FftRuntime<M> {
    fn drop(&mut self) {
        self.dispose();
    }
}
