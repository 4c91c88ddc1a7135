use thiserror::Error;

use crate::DmaStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DmaError {
    /// The channel never went idle or halted within the configured timeout. The channel has
    /// been reset before this is returned.
    #[error("{channel}: transfer timed out (status=0x{:08x})", .status.bits())]
    Timeout {
        channel: &'static str,
        status: DmaStatus,
    },

    /// The channel finished with internal/slave/decode error bits set.
    #[error("{channel}: transfer failed (status=0x{:08x})", .status.bits())]
    HardwareFault {
        channel: &'static str,
        status: DmaStatus,
    },

    /// Only produced when [`crate::DmaConfig::reset_timeout`] is set.
    #[error("{channel}: reset did not complete")]
    ResetTimeout { channel: &'static str },
}

impl DmaError {
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Timeout { channel, .. }
            | Self::HardwareFault { channel, .. }
            | Self::ResetTimeout { channel } => channel,
        }
    }
}
