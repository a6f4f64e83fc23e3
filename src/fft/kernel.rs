//! Kernel module contract.
//!
//! The runtime never performs FFT math itself. It selects a kernel, toggles
//! size/channel keywords, binds the scratch buffer and issues dispatches
//! against a [`KernelModule`]. Any GPU backend that exposes the three kernels
//! and honours the binding names below can drive the runtime.

use super::error::FftError;

/// Binding name of the scratch buffer shared by all three kernels.
pub const SCRATCH_BUFFER_BINDING: &str = "firstStageBuffer";

/// Surface binding names understood by the kernels.
pub mod binding {
    pub const INPUT_RE: &str = "inputRE";
    pub const INPUT_IM: &str = "inputIM";
    pub const OUTPUT_RE: &str = "outputRE";
    pub const OUTPUT_IM: &str = "outputIM";
}

/// The three logical kernels of the FFT program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Real to complex forward transform.
    R2C,
    /// Complex to real inverse transform.
    C2R,
    /// Real to real magnitude spectrum.
    R2R,
}

impl Kernel {
    pub const ALL: [Kernel; 3] = [Kernel::R2C, Kernel::C2R, Kernel::R2R];

    pub fn name(self) -> &'static str {
        match self {
            Kernel::R2C => "R2C",
            Kernel::C2R => "C2R",
            Kernel::R2R => "R2R",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Kernel::R2C => 0,
            Kernel::C2R => 1,
            Kernel::R2R => 2,
        }
    }

    /// Value of the `inverse` flag for both passes of this kernel.
    pub fn inverse(self) -> bool {
        matches!(self, Kernel::C2R)
    }
}

/// Handle to a kernel inside a specific module, as returned by
/// [`KernelModule::find_kernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId(pub u32);

/// Per-dispatch scalar flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PassFlags {
    pub inverse: bool,
    pub horizontal: bool,
}

/// Surfaces bound for one dispatch. Unused slots stay `None`.
#[derive(Debug)]
pub struct Bindings<'a, S> {
    pub input_re: Option<&'a S>,
    pub input_im: Option<&'a S>,
    pub output_re: Option<&'a S>,
    pub output_im: Option<&'a S>,
}

impl<'a, S> Bindings<'a, S> {
    /// Bound surfaces paired with their binding names.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'a S)> + '_ {
        [
            (binding::INPUT_RE, self.input_re),
            (binding::INPUT_IM, self.input_im),
            (binding::OUTPUT_RE, self.output_re),
            (binding::OUTPUT_IM, self.output_im),
        ]
        .into_iter()
        .filter_map(|(name, surface)| surface.map(|s| (name, s)))
    }
}

impl<S> Clone for Bindings<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Bindings<'_, S> {}

/// One element of the scratch buffer: a complex pair per colour channel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Complex3 {
    pub r: [f32; 2],
    pub g: [f32; 2],
    pub b: [f32; 2],
}

/// Where a transform's GPU work goes.
pub enum Execution<'a, E> {
    /// Record into a fresh encoder and submit it before returning.
    Immediate,
    /// Append to a caller-owned encoder that the caller submits later.
    Deferred(&'a mut E),
}

/// A GPU program exposing the `R2C`, `C2R` and `R2R` kernels.
pub trait KernelModule {
    /// Scratch buffer handle.
    type Buffer;
    /// 2D surface handle bound as kernel input or output.
    type Surface;
    /// Recordable command list.
    type Encoder;

    /// Locate a kernel by name.
    fn find_kernel(&self, name: &str) -> Option<KernelId>;

    /// Enable or disable a specialization keyword.
    fn set_keyword(&mut self, keyword: &str, enabled: bool);

    /// Allocate a buffer of `element_count` elements of `element_size` bytes.
    fn allocate_buffer(
        &mut self,
        element_count: usize,
        element_size: usize,
    ) -> Result<Self::Buffer, FftError>;

    /// Release a buffer returned by [`KernelModule::allocate_buffer`].
    fn release_buffer(&mut self, buffer: Self::Buffer);

    /// Bind a buffer to a kernel under `name`.
    fn bind_buffer(&mut self, kernel: KernelId, name: &str, buffer: &Self::Buffer);

    /// Width and height of a surface.
    fn surface_extent(&self, surface: &Self::Surface) -> (u32, u32);

    /// Start a command list for immediate execution.
    fn begin(&mut self) -> Self::Encoder;

    /// Bind `bindings` and `flags` and record one dispatch of `kernel`.
    fn dispatch(
        &mut self,
        encoder: &mut Self::Encoder,
        kernel: KernelId,
        bindings: Bindings<'_, Self::Surface>,
        flags: PassFlags,
        groups: [u32; 3],
    ) -> Result<(), FftError>;

    /// Submit a command list started with [`KernelModule::begin`].
    fn submit(&mut self, encoder: Self::Encoder);
}
