use std::io;

use axi_dma::DmaError;
use pcie_tlp::DecodeError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors returned by every bridge operation.
///
/// Any error aborts the whole logical operation; data past the last completed chunk of a read
/// is unspecified. Nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Misaligned address or length, or an otherwise unusable request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The identity register reads zero: the link is down or the endpoint is not enumerated.
    #[error("PCI Express endpoint is not initialized (requester ID is zero)")]
    NotConnected,

    /// A channel did not settle in time. It has been reset.
    #[error("{channel}: DMA transfer timed out")]
    Timeout { channel: &'static str },

    /// A channel reported internal/slave/decode error bits. It has been reset.
    #[error("{channel}: DMA hardware fault (status=0x{status:08x})")]
    HardwareFault { channel: &'static str, status: u32 },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// The remote side answered with something the bridge cannot accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("expected a completion with data, got fmt/type 0x{found:02x}")]
    UnexpectedType { found: u8 },

    #[error("completion tag 0x{found:02x} does not match request tag 0x{expected:02x}")]
    TagMismatch { expected: u8, found: u8 },

    #[error("malformed completion of {words} dwords")]
    Malformed { words: usize },

    #[error("completion carries no data")]
    EmptyCompletion,

    #[error("completion carries {received} dwords but only {outstanding} are outstanding")]
    Overrun { outstanding: u32, received: usize },

    #[error("receive length {bytes} is not a multiple of 4")]
    UnalignedTransfer { bytes: u32 },

    #[error("receive length {bytes} exceeds receive buffer of {capacity} bytes")]
    OversizedTransfer { bytes: u32, capacity: usize },
}

impl From<DecodeError> for ProtocolError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::TooShort { len, .. } => Self::Malformed { words: len },
            DecodeError::UnknownType(found) => Self::UnexpectedType { found },
        }
    }
}

/// Size disagreements between the staging buffer, the hardware and the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("{region} region access at word {offset} (+{len}) exceeds capacity of {capacity} words")]
    OutOfRange {
        region: &'static str,
        offset: usize,
        len: usize,
        capacity: usize,
    },

    #[error("expected a {expected}-byte response, got {actual} bytes")]
    SizeMismatch { expected: u32, actual: u32 },

    #[error("caller buffer holds {available} words but {needed} were received")]
    TooSmall { needed: usize, available: usize },
}

impl From<DmaError> for BridgeError {
    fn from(err: DmaError) -> Self {
        match err {
            DmaError::Timeout { channel, .. } | DmaError::ResetTimeout { channel } => {
                Self::Timeout { channel }
            }
            DmaError::HardwareFault { channel, status } => Self::HardwareFault {
                channel,
                status: status.bits(),
            },
        }
    }
}

impl From<DecodeError> for BridgeError {
    fn from(err: DecodeError) -> Self {
        Self::Protocol(err.into())
    }
}

impl From<BridgeError> for io::Error {
    fn from(err: BridgeError) -> Self {
        let kind = match &err {
            BridgeError::InvalidArgument(_) | BridgeError::InvalidConfig(_) => {
                io::ErrorKind::InvalidInput
            }
            BridgeError::NotConnected => io::ErrorKind::NotConnected,
            BridgeError::Timeout { .. } => io::ErrorKind::TimedOut,
            BridgeError::HardwareFault { .. }
            | BridgeError::Protocol(_)
            | BridgeError::Buffer(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
