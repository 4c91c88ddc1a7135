//! Payload byte order on the wire.
//!
//! The byte at the lowest memory address travels in the most significant byte of the payload
//! dword. This holds independently of host endianness: every payload dword crossing the bridge
//! goes through exactly this pair of functions.

use crate::DWORD_BYTES;

/// Converts four memory bytes into the payload dword placed in the transmit buffer.
#[inline]
pub const fn encode_payload(bytes: [u8; DWORD_BYTES]) -> u32 {
    u32::from_be_bytes(bytes)
}

/// Converts a received payload dword back into memory byte order.
#[inline]
pub const fn decode_payload(word: u32) -> [u8; DWORD_BYTES] {
    word.to_be_bytes()
}

/// Encodes a dword-aligned byte slice into wire words.
///
/// # Panics
///
/// Panics if `bytes.len()` is not a multiple of four.
pub fn encode_payload_slice(bytes: &[u8]) -> Vec<u32> {
    assert!(
        bytes.len() % DWORD_BYTES == 0,
        "payload length {} is not dword aligned",
        bytes.len()
    );
    bytes
        .chunks_exact(DWORD_BYTES)
        .map(|chunk| encode_payload([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Decodes wire words into `out`, which must hold exactly `words.len() * 4` bytes.
///
/// # Panics
///
/// Panics on a length mismatch.
pub fn decode_payload_into(words: &[u32], out: &mut [u8]) {
    assert_eq!(
        out.len(),
        words.len() * DWORD_BYTES,
        "output buffer does not match payload length"
    );
    for (word, chunk) in words.iter().zip(out.chunks_exact_mut(DWORD_BYTES)) {
        chunk.copy_from_slice(&decode_payload(*word));
    }
}
