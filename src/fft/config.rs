//! Runtime configuration.

use serde::{Deserialize, Serialize};

use super::size::ChannelMode;

/// Size and channel mode the runtime is configured for.
///
/// `size` is validated when the configuration is applied, so a deserialized
/// config with an unsupported size fails with [`super::FftError::InvalidSize`]
/// at that point rather than at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FftConfig {
    pub size: usize,
    pub mode: ChannelMode,
}

impl Default for FftConfig {
    fn default() -> Self {
        Self {
            size: 256,
            mode: ChannelMode::Multi,
        }
    }
}

impl FftConfig {
    pub fn new(size: usize, mode: ChannelMode) -> Self {
        Self { size, mode }
    }
}
