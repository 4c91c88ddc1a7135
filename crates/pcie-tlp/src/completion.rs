use crate::{header_length, header_type_byte, DecodeError, RequesterId, TlpType};

/// Completions always carry a 3 DW header.
pub const COMPLETION_HEADER_DWORDS: usize = 3;

/// Completion status field (word1 bits 15..13).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionStatus {
    SuccessfulCompletion,
    UnsupportedRequest,
    ConfigRequestRetry,
    CompleterAbort,
    Reserved(u8),
}

impl CompletionStatus {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x7 {
            0 => Self::SuccessfulCompletion,
            1 => Self::UnsupportedRequest,
            2 => Self::ConfigRequestRetry,
            4 => Self::CompleterAbort,
            other => Self::Reserved(other),
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            Self::SuccessfulCompletion => 0,
            Self::UnsupportedRequest => 1,
            Self::ConfigRequestRetry => 2,
            Self::CompleterAbort => 4,
            Self::Reserved(bits) => bits & 0x7,
        }
    }
}

/// A received completion TLP, borrowed from the receive buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion<'a> {
    pub ty: TlpType,
    /// Length field of the header. The bridge trusts the transfer size instead, see
    /// [`Completion::payload`].
    pub length_dw: u32,
    pub completer: RequesterId,
    pub status: CompletionStatus,
    pub byte_count: u16,
    pub requester: RequesterId,
    pub tag: u8,
    pub lower_address: u8,
    payload: &'a [u32],
}

impl<'a> Completion<'a> {
    /// Decodes a completion from the words the receive channel actually delivered.
    ///
    /// Everything after the 3 DW header is treated as payload, regardless of the header's
    /// length field.
    pub fn parse(words: &'a [u32]) -> Result<Self, DecodeError> {
        if words.len() < COMPLETION_HEADER_DWORDS {
            return Err(DecodeError::TooShort {
                len: words.len(),
                min: COMPLETION_HEADER_DWORDS,
            });
        }

        let ty = TlpType::try_from(header_type_byte(words[0]))?;
        let w1 = words[1];
        let w2 = words[2];

        Ok(Self {
            ty,
            length_dw: header_length(words[0]),
            completer: RequesterId::unpack_u16((w1 >> 16) as u16),
            status: CompletionStatus::from_bits(((w1 >> 13) & 0x7) as u8),
            byte_count: (w1 & 0xfff) as u16,
            requester: RequesterId::unpack_u16((w2 >> 16) as u16),
            tag: (w2 >> 8) as u8,
            lower_address: (w2 & 0x7f) as u8,
            payload: &words[COMPLETION_HEADER_DWORDS..],
        })
    }

    /// Payload dwords, still in wire order.
    pub fn payload(&self) -> &'a [u32] {
        self.payload
    }

    /// Builds a completion-with-data header. Used by endpoint models and diagnostics.
    pub fn encode_header(
        completer: RequesterId,
        requester: RequesterId,
        tag: u8,
        length_dw: u32,
        byte_count: u16,
        lower_address: u8,
    ) -> [u32; COMPLETION_HEADER_DWORDS] {
        [
            (u32::from(TlpType::CplD.as_u8()) << 24) | (length_dw & 0x3ff),
            (u32::from(completer.pack_u16()) << 16) | u32::from(byte_count & 0xfff),
            (u32::from(requester.pack_u16()) << 16)
                | (u32::from(tag) << 8)
                | u32::from(lower_address & 0x7f),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_status_bits_roundtrip() {
        for bits in 0..8u8 {
            assert_eq!(CompletionStatus::from_bits(bits).bits(), bits);
        }
        assert_eq!(
            CompletionStatus::from_bits(1),
            CompletionStatus::UnsupportedRequest
        );
    }
}
