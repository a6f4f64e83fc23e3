//! Transform sizes, channel modes and the bit-reversal permutation.

use serde::{Deserialize, Serialize};

use super::error::FftError;

/// Smallest supported transform size.
pub const MIN_SIZE: usize = 64;
/// Largest supported transform size.
pub const MAX_SIZE: usize = 1024;

/// Size-specialization keywords, indexed by `log2(size) - 6`.
pub const SIZE_KEYWORDS: [&str; 5] = ["FFT_64", "FFT_128", "FFT_256", "FFT_512", "FFT_1024"];

/// Channel keywords, one per [`ChannelMode`].
pub const CHANNEL_KEYWORDS: [&str; 2] = ["Single", "Multi"];

/// Side length of a square transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum FftSize {
    S64,
    S128,
    S256,
    S512,
    S1024,
}

impl FftSize {
    pub const ALL: [FftSize; 5] = [
        FftSize::S64,
        FftSize::S128,
        FftSize::S256,
        FftSize::S512,
        FftSize::S1024,
    ];

    /// Validate a side length: power of 2 in `[64, 1024]`.
    pub fn new(size: usize) -> Result<Self, FftError> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&size) || !size.is_power_of_two() {
            return Err(FftError::InvalidSize(size));
        }
        Ok(Self::ALL[size.trailing_zeros() as usize - 6])
    }

    /// Side length in texels.
    pub fn len(self) -> usize {
        MIN_SIZE << self.index()
    }

    pub fn log2(self) -> u32 {
        self.index() as u32 + 6
    }

    /// Position in [`SIZE_KEYWORDS`].
    pub fn index(self) -> usize {
        match self {
            FftSize::S64 => 0,
            FftSize::S128 => 1,
            FftSize::S256 => 2,
            FftSize::S512 => 3,
            FftSize::S1024 => 4,
        }
    }

    pub fn keyword(self) -> &'static str {
        SIZE_KEYWORDS[self.index()]
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        SIZE_KEYWORDS
            .iter()
            .position(|k| *k == keyword)
            .map(|i| Self::ALL[i])
    }
}

impl TryFrom<usize> for FftSize {
    type Error = FftError;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        Self::new(size)
    }
}

impl From<FftSize> for usize {
    fn from(size: FftSize) -> Self {
        size.len()
    }
}

/// Which colour channels a transform processes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    /// Red channel only.
    Single,
    /// Red, green and blue; alpha is ignored.
    #[default]
    Multi,
}

impl ChannelMode {
    pub fn keyword(self) -> &'static str {
        match self {
            ChannelMode::Single => CHANNEL_KEYWORDS[0],
            ChannelMode::Multi => CHANNEL_KEYWORDS[1],
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Single" => Some(ChannelMode::Single),
            "Multi" => Some(ChannelMode::Multi),
            _ => None,
        }
    }

    /// Number of colour channels transformed.
    pub fn channels(self) -> u32 {
        match self {
            ChannelMode::Single => 1,
            ChannelMode::Multi => 3,
        }
    }
}

/// Bit-reversal permutation of `0..n`.
///
/// Index `i` maps to `i` with its low `log2(n)` bits reversed, so
/// `bit_reverse_indices(8)` is `[0, 4, 2, 6, 1, 5, 3, 7]`.
///
/// # Panics
///
/// Panics if `n` is neither zero nor a power of 2.
pub fn bit_reverse_indices(n: usize) -> Vec<usize> {
    assert!(
        n == 0 || n.is_power_of_two(),
        "n must be a power of 2, got {}",
        n
    );
    if n <= 1 {
        return vec![0; n];
    }
    let bits = n.trailing_zeros();
    (0..n)
        .map(|i| i.reverse_bits() >> (usize::BITS - bits))
        .collect()
}
