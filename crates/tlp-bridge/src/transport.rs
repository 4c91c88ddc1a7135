use axi_dma::{Clock, DmaChannel, DmaMemory, RegisterBlock};
use tracing::trace;

use crate::error::ProtocolError;
use crate::staging::StagingBuffer;
use crate::Result;

/// A transmit/receive channel pair carrying one stream of words each way.
#[derive(Debug)]
pub(crate) struct ChannelPair<R> {
    pub tx: DmaChannel<R>,
    pub rx: DmaChannel<R>,
}

/// Moves whole packets between the staging buffer and a channel pair.
///
/// Borrows its parts for the duration of one logical operation, so a caller holding the bridge
/// lock can interleave transport calls with its own bookkeeping.
pub(crate) struct Transport<'a, R, M, C> {
    pair: &'a mut ChannelPair<R>,
    staging: &'a mut StagingBuffer<M>,
    clock: &'a C,
}

impl<'a, R, M, C> Transport<'a, R, M, C>
where
    R: RegisterBlock,
    M: DmaMemory,
    C: Clock,
{
    pub fn new(
        pair: &'a mut ChannelPair<R>,
        staging: &'a mut StagingBuffer<M>,
        clock: &'a C,
    ) -> Self {
        Self {
            pair,
            staging,
            clock,
        }
    }

    /// Transmits the first `word_count` words already placed in the transmit region.
    pub fn send(&mut self, word_count: usize) -> Result<()> {
        trace!(channel = self.pair.tx.name(), word_count, "sending");
        let len = word_count * 4;
        debug_assert!(len <= self.staging.capacity_bytes());
        self.pair
            .tx
            .transfer(self.clock, self.staging.tx_phys(), len as u32)?;
        Ok(())
    }

    /// Stages `words` at the start of the transmit region and sends them.
    pub fn send_words(&mut self, words: &[u32]) -> Result<()> {
        self.staging.write_tx(0, words)?;
        self.send(words.len())
    }

    /// Receives one packet into the receive region and returns its raw byte count.
    pub fn receive_bytes(&mut self) -> Result<u32> {
        let capacity = self.staging.capacity_bytes();
        self.pair
            .rx
            .transfer(self.clock, self.staging.rx_phys(), capacity as u32)?;
        let bytes = self.pair.rx.transferred_len();
        trace!(channel = self.pair.rx.name(), bytes, "received");
        Ok(bytes)
    }

    /// Receives one packet and returns its length in words.
    pub fn receive(&mut self) -> Result<usize> {
        let bytes = self.receive_bytes()?;
        let capacity = self.staging.capacity_bytes();
        if bytes as usize > capacity {
            return Err(ProtocolError::OversizedTransfer { bytes, capacity }.into());
        }
        if bytes % 4 != 0 {
            return Err(ProtocolError::UnalignedTransfer { bytes }.into());
        }
        Ok(bytes as usize / 4)
    }

    /// Receives one packet and copies it out of the receive region.
    pub fn receive_words(&mut self) -> Result<Vec<u32>> {
        let count = self.receive()?;
        Ok(self.staging.rx_words(count)?)
    }
}
