//! Remote memory reads and writes built from MRd64/MWr64 requests.

use axi_dma::{Clock, DmaMemory, RegisterBlock};
use pcie_tlp::{wire, Completion, MemReadRequest, MemWriteRequest, TlpType, DWORD_BYTES};
use tracing::{debug, trace};

use crate::bridge::BridgeState;
use crate::error::ProtocolError;
use crate::transport::Transport;
use crate::{BridgeError, Result};

/// Length in dwords of the next read request.
///
/// The request is capped by what is left to read, by `max_dwords`, and by the distance to the
/// next `page_size` boundary, so a request never crosses a page.
pub fn read_chunk_dwords(
    address: u64,
    remaining_dwords: u32,
    max_dwords: u32,
    page_size: u64,
) -> u32 {
    debug_assert!(page_size.is_power_of_two());
    let to_boundary = (page_size - (address & (page_size - 1))) / DWORD_BYTES as u64;
    let to_boundary = u32::try_from(to_boundary).unwrap_or(u32::MAX);
    remaining_dwords.min(max_dwords).min(to_boundary)
}

pub(crate) fn check_aligned(op: &str, address: u64, len: usize) -> Result<()> {
    if address % 4 != 0 || len % 4 != 0 {
        return Err(BridgeError::InvalidArgument(format!(
            "{op} at 0x{address:x} of {len} bytes is not dword aligned"
        )));
    }
    if len == 0 {
        return Err(BridgeError::InvalidArgument(format!(
            "{op} at 0x{address:x} has zero length"
        )));
    }
    if address.checked_add(len as u64 - 1).is_none() {
        return Err(BridgeError::InvalidArgument(format!(
            "{op} at 0x{address:x} of {len} bytes wraps the address space"
        )));
    }
    Ok(())
}

impl<R, M, C> BridgeState<R, M, C>
where
    R: RegisterBlock,
    M: DmaMemory,
    C: Clock,
{
    /// Reads `buf.len()` bytes of remote memory starting at `address`.
    pub(crate) fn mem_read(&mut self, address: u64, buf: &mut [u8]) -> Result<()> {
        check_aligned("read", address, buf.len())?;
        let requester = self.identity.resolve()?;
        let max_dwords = self.config.max_read_dwords;
        let page_size = self.config.page_size as u64;

        let mut address = address;
        let mut done = 0;
        while done < buf.len() {
            let remaining = u32::try_from((buf.len() - done) / DWORD_BYTES).unwrap_or(u32::MAX);
            let length_dw = read_chunk_dwords(address, remaining, max_dwords, page_size);
            let tag = self.tag;
            let request = MemReadRequest {
                requester,
                tag,
                address,
                length_dw,
            };
            debug!(address, length_dw, tag, "memory read request");

            let mut transport = Transport::new(&mut self.memory, &mut self.staging, &self.clock);
            transport.send_words(&request.encode())?;
            self.tag = tag.wrapping_add(1);

            // The endpoint may split the answer over several completions.
            let chunk = &mut buf[done..done + length_dw as usize * DWORD_BYTES];
            let mut received = 0usize;
            while received < chunk.len() {
                let words = transport.receive_words()?;
                let data = accept_completion(&words, tag)?;
                let outstanding = (chunk.len() - received) / DWORD_BYTES;
                if data.len() > outstanding {
                    return Err(ProtocolError::Overrun {
                        outstanding: outstanding as u32,
                        received: data.len(),
                    }
                    .into());
                }
                let end = received + data.len() * DWORD_BYTES;
                wire::decode_payload_into(data, &mut chunk[received..end]);
                trace!(tag, dwords = data.len(), "completion accepted");
                received = end;
            }

            // Wraps to zero only after the last dword of the address space, when the loop ends.
            address = address.wrapping_add(received as u64);
            done += received;
        }
        Ok(())
    }

    /// Writes `data` to remote memory at `address`, one dword per request.
    pub(crate) fn mem_write(&mut self, address: u64, data: &[u8]) -> Result<()> {
        check_aligned("write", address, data.len())?;
        let requester = self.identity.resolve()?;

        let mut transport = Transport::new(&mut self.memory, &mut self.staging, &self.clock);
        for (i, word) in wire::encode_payload_slice(data).into_iter().enumerate() {
            let request = MemWriteRequest {
                requester,
                address: address + (i * DWORD_BYTES) as u64,
                data: word,
            };
            trace!(address = request.address, "memory write request");
            transport.send_words(&request.encode())?;
        }
        debug!(address, len = data.len(), "memory write done");
        Ok(())
    }
}

/// Validates one received completion against the outstanding request and returns its data.
fn accept_completion(words: &[u32], tag: u8) -> Result<&[u32]> {
    let completion = Completion::parse(words).map_err(ProtocolError::from)?;
    if completion.ty != TlpType::CplD {
        return Err(ProtocolError::UnexpectedType {
            found: completion.ty.as_u8(),
        }
        .into());
    }
    if completion.tag != tag {
        return Err(ProtocolError::TagMismatch {
            expected: tag,
            found: completion.tag,
        }
        .into());
    }
    if completion.payload().is_empty() {
        return Err(ProtocolError::EmptyCompletion.into());
    }
    Ok(completion.payload())
}
