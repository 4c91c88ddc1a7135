//! The remote PCI Express endpoint behind the bridge.

use std::collections::{HashMap, VecDeque};

use pcie_tlp::{header_length, header_type_byte, Completion, RequesterId, TlpType};
use tracing::trace;

/// How completions are deliberately damaged before delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    /// Completions echo a tag one higher than the request's.
    WrongTag,
    /// Completions are sent as completion-without-data (Unsupported Request).
    WrongType,
}

#[derive(Debug)]
pub(crate) struct Endpoint {
    pub completer: RequesterId,
    /// Sparse byte-addressable memory space; unwritten bytes read as zero.
    pub memory: HashMap<u64, u8>,
    pub config_space: HashMap<u32, u32>,
    /// Data dwords per completion; larger reads are answered with split completions.
    pub split_dwords: usize,
    pub corruption: Option<Corruption>,
    pub completions: VecDeque<Vec<u32>>,
}

impl Endpoint {
    pub fn new(completer: RequesterId, split_dwords: usize) -> Self {
        Self {
            completer,
            memory: HashMap::new(),
            config_space: HashMap::new(),
            split_dwords: split_dwords.max(1),
            corruption: None,
            completions: VecDeque::new(),
        }
    }

    pub fn read_byte(&self, address: u64) -> u8 {
        self.memory.get(&address).copied().unwrap_or(0)
    }

    pub fn write_byte(&mut self, address: u64, value: u8) {
        self.memory.insert(address, value);
    }

    /// Accepts one TLP from the link.
    pub fn receive_tlp(&mut self, words: &[u32]) {
        let Some(&word0) = words.first() else {
            return;
        };
        let Ok(ty) = TlpType::try_from(header_type_byte(word0)) else {
            trace!(word0, "endpoint ignoring unknown TLP");
            return;
        };
        let header_dwords = ty.format().header_dwords();
        if words.len() < header_dwords {
            trace!(?ty, len = words.len(), "endpoint ignoring truncated TLP");
            return;
        }

        let address = match header_dwords {
            4 => (u64::from(words[2]) << 32) | u64::from(words[3]),
            _ => u64::from(words[2]),
        };
        let length_dw = match header_length(word0) {
            0 => 1024,
            len => len as usize,
        };

        match ty {
            TlpType::MRd32 | TlpType::MRd64 => {
                let requester = RequesterId::unpack_u16((words[1] >> 16) as u16);
                let tag = (words[1] >> 8) as u8;
                self.answer_read(requester, tag, address, length_dw);
            }
            TlpType::MWr32 | TlpType::MWr64 => {
                let data = &words[header_dwords..];
                for (i, word) in data.iter().take(length_dw).enumerate() {
                    let base = address.wrapping_add(i as u64 * 4);
                    for (j, byte) in word.to_be_bytes().into_iter().enumerate() {
                        self.write_byte(base.wrapping_add(j as u64), byte);
                    }
                }
            }
            other => trace!(ty = other.name(), "endpoint ignoring TLP"),
        }
    }

    fn answer_read(&mut self, requester: RequesterId, tag: u8, address: u64, length_dw: usize) {
        let data: Vec<u32> = (0..length_dw)
            .map(|i| {
                let base = address.wrapping_add(i as u64 * 4);
                u32::from_be_bytes(std::array::from_fn(|j| {
                    self.read_byte(base.wrapping_add(j as u64))
                }))
            })
            .collect();

        let mut remaining_bytes = length_dw * 4;
        let mut offset = 0;
        for chunk in data.chunks(self.split_dwords) {
            let lower_address = (address.wrapping_add(offset as u64) & 0x7f) as u8;
            let mut tlp = Completion::encode_header(
                self.completer,
                requester,
                tag,
                chunk.len() as u32,
                (remaining_bytes & 0xfff) as u16,
                lower_address,
            )
            .to_vec();
            tlp.extend_from_slice(chunk);

            match self.corruption {
                Some(Corruption::WrongTag) => {
                    tlp[2] = (tlp[2] & !0xff00) | (u32::from(tag.wrapping_add(1)) << 8);
                }
                Some(Corruption::WrongType) => {
                    tlp.truncate(3);
                    tlp[0] = u32::from(TlpType::Cpl.as_u8()) << 24;
                    // Unsupported Request.
                    tlp[1] |= 1 << 13;
                }
                None => {}
            }

            remaining_bytes -= chunk.len() * 4;
            offset += chunk.len() * 4;
            self.completions.push_back(tlp);
        }
    }
}
