use crate::{RequesterId, TlpType};

/// Header size of a 64-bit Memory Read request.
pub const MEM_READ_REQUEST_DWORDS: usize = 4;

/// Header plus single payload dword of a 64-bit Memory Write request.
pub const MEM_WRITE_REQUEST_DWORDS: usize = 5;

/// Largest length a TLP length field can express (encoded as 0).
pub const MAX_LENGTH_DWORDS: u32 = 1024;

/// First and last dword byte enables, all bytes meaningful.
pub const ALL_BYTES_ENABLED: u8 = 0xff;

fn word0(ty: TlpType, length_dw: u32) -> u32 {
    debug_assert!((1..=MAX_LENGTH_DWORDS).contains(&length_dw));
    (u32::from(ty.as_u8()) << 24) | (length_dw & 0x3ff)
}

fn address_words(address: u64) -> [u32; 2] {
    [(address >> 32) as u32, address as u32]
}

/// 64-bit Memory Read request (MRd64).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemReadRequest {
    pub requester: RequesterId,
    pub tag: u8,
    pub address: u64,
    pub length_dw: u32,
}

impl MemReadRequest {
    /// Builds the four header words.
    ///
    /// - word0: fmt/type in bits 31..24, length in bits 9..0
    /// - word1: requester ID in bits 31..16, tag in 15..8, byte enables in 7..0
    /// - word2/word3: address high/low
    pub fn encode(&self) -> [u32; MEM_READ_REQUEST_DWORDS] {
        let [hi, lo] = address_words(self.address);
        [
            word0(TlpType::MRd64, self.length_dw),
            (u32::from(self.requester.pack_u16()) << 16)
                | (u32::from(self.tag) << 8)
                | u32::from(ALL_BYTES_ENABLED),
            hi,
            lo,
        ]
    }
}

/// 64-bit Memory Write request (MWr64) carrying one payload dword.
///
/// `data` must already be in wire order, see [`crate::wire::encode_payload`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemWriteRequest {
    pub requester: RequesterId,
    pub address: u64,
    pub data: u32,
}

impl MemWriteRequest {
    pub fn encode(&self) -> [u32; MEM_WRITE_REQUEST_DWORDS] {
        let [hi, lo] = address_words(self.address);
        [
            word0(TlpType::MWr64, 1),
            (u32::from(self.requester.pack_u16()) << 16) | u32::from(ALL_BYTES_ENABLED),
            hi,
            lo,
            self.data,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_read_header_layout() {
        let req = MemReadRequest {
            requester: RequesterId::new(1, 0, 0),
            tag: 0x2a,
            address: 0x0000_0001_0000_1000,
            length_dw: 16,
        };
        assert_eq!(
            req.encode(),
            [0x2000_0010, 0x0100_2aff, 0x0000_0001, 0x0000_1000]
        );
    }

    #[test]
    fn mem_write_header_layout() {
        let req = MemWriteRequest {
            requester: RequesterId::new(0, 1, 2),
            address: 0x1004,
            data: 0xaabb_ccdd,
        };
        assert_eq!(
            req.encode(),
            [0x6000_0001, 0x000a_00ff, 0, 0x1004, 0xaabb_ccdd]
        );
    }
}
