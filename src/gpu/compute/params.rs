//! Uniform parameter structs for the FFT kernels.
//!
//! These structs must match the WGSL shader definitions exactly,
//! including alignment requirements.

use crate::fft::PassFlags;

/// Per-dispatch flags.
/// WGSL: struct PassParams { horizontal: u32, inverse: u32, _pad0: u32, _pad1: u32 }
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PassParams {
    pub horizontal: u32,
    pub inverse: u32,
    pub _pad0: u32,
    pub _pad1: u32,
}

impl PassParams {
    /// Number of distinct flag combinations, one uniform slot each.
    pub const SLOTS: usize = 4;

    pub fn new(flags: PassFlags) -> Self {
        Self {
            horizontal: flags.horizontal as u32,
            inverse: flags.inverse as u32,
            _pad0: 0,
            _pad1: 0,
        }
    }

    /// Uniform slot holding the parameters for `flags`.
    pub fn slot(flags: PassFlags) -> usize {
        (flags.inverse as usize) * 2 + flags.horizontal as usize
    }

    /// Flags stored in each slot, in slot order.
    pub fn all_flags() -> [PassFlags; Self::SLOTS] {
        let mut all = [PassFlags::default(); Self::SLOTS];
        for inverse in [false, true] {
            for horizontal in [false, true] {
                let flags = PassFlags {
                    inverse,
                    horizontal,
                };
                all[Self::slot(flags)] = flags;
            }
        }
        all
    }
}
