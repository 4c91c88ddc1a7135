use thiserror::Error;

/// Errors produced while decoding a received TLP.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("TLP too short: got {len} dwords, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("unknown TLP fmt/type byte 0x{0:02x}")]
    UnknownType(u8),
}
