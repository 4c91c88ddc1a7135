use axi_dma::DmaMemory;

use crate::error::BufferError;
use crate::BridgeError;

/// The DMA-coherent buffer shared with both channel pairs.
///
/// The first page is the transmit region, the page after it the receive region. Every access
/// is bounds-checked against the region it targets.
#[derive(Debug)]
pub struct StagingBuffer<M> {
    mem: M,
    page_words: usize,
}

impl<M: DmaMemory> StagingBuffer<M> {
    pub fn new(mem: M, page_size: usize) -> Result<Self, BridgeError> {
        let page_words = page_size / 4;
        if mem.len_words() < 2 * page_words {
            return Err(BridgeError::InvalidConfig(
                "staging buffer must hold one transmit and one receive page",
            ));
        }
        if mem.phys_addr() % 4 != 0 {
            return Err(BridgeError::InvalidConfig(
                "staging buffer bus address must be word aligned",
            ));
        }
        Ok(Self { mem, page_words })
    }

    /// Capacity of each region in words.
    pub fn capacity_words(&self) -> usize {
        self.page_words
    }

    pub fn capacity_bytes(&self) -> usize {
        self.page_words * 4
    }

    pub fn tx_phys(&self) -> u64 {
        self.mem.phys_addr()
    }

    pub fn rx_phys(&self) -> u64 {
        self.mem.phys_addr() + self.capacity_bytes() as u64
    }

    pub fn memory(&self) -> &M {
        &self.mem
    }

    pub fn write_tx(&mut self, offset: usize, words: &[u32]) -> Result<(), BufferError> {
        self.check("tx", offset, words.len())?;
        for (i, word) in words.iter().enumerate() {
            self.mem.write_word(offset + i, *word);
        }
        Ok(())
    }

    pub fn read_rx(&self, offset: usize, out: &mut [u32]) -> Result<(), BufferError> {
        self.check("rx", offset, out.len())?;
        let base = self.page_words + offset;
        for (i, word) in out.iter_mut().enumerate() {
            *word = self.mem.read_word(base + i);
        }
        Ok(())
    }

    /// Copies the first `count` received words out of the receive region.
    pub fn rx_words(&self, count: usize) -> Result<Vec<u32>, BufferError> {
        let mut words = vec![0; count];
        self.read_rx(0, &mut words)?;
        Ok(words)
    }

    fn check(&self, region: &'static str, offset: usize, len: usize) -> Result<(), BufferError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.page_words => Ok(()),
            _ => Err(BufferError::OutOfRange {
                region,
                offset,
                len,
                capacity: self.page_words,
            }),
        }
    }
}
