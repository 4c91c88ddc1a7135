//! PCI Express Transaction Layer Packets as seen by the AXI-stream bridge.
//!
//! The bridge hardware moves TLPs as a stream of 32-bit words. A header word is written to
//! the staging buffer exactly as the host sees it; only payload dwords go through the wire
//! byte-order conversion in [`wire`].
//!
//! This crate is pure data: it knows how to build request headers and how to pick apart a
//! completion, but it never touches hardware.

mod completion;
mod error;
mod kind;
mod request;
mod requester;
pub mod wire;

pub use completion::{Completion, CompletionStatus, COMPLETION_HEADER_DWORDS};
pub use error::DecodeError;
pub use kind::{TlpFormat, TlpType};
pub use request::{
    MemReadRequest, MemWriteRequest, ALL_BYTES_ENABLED, MEM_READ_REQUEST_DWORDS,
    MEM_WRITE_REQUEST_DWORDS, MAX_LENGTH_DWORDS,
};
pub use requester::RequesterId;

/// Size of one TLP dword in bytes.
pub const DWORD_BYTES: usize = 4;

/// Extracts the fmt/type byte from the first header word.
#[inline]
pub const fn header_type_byte(word0: u32) -> u8 {
    (word0 >> 24) as u8
}

/// Extracts the 10-bit length field from the first header word.
#[inline]
pub const fn header_length(word0: u32) -> u32 {
    word0 & 0x3ff
}
