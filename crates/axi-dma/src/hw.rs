/// A block of 32-bit hardware registers addressed by register index.
///
/// Reads take `&self`, but implementations are free to have side effects (status registers
/// on real hardware, bookkeeping in models).
pub trait RegisterBlock {
    fn read_reg(&self, index: usize) -> u32;
    fn write_reg(&mut self, index: usize, value: u32);
}

impl<T: RegisterBlock + ?Sized> RegisterBlock for Box<T> {
    fn read_reg(&self, index: usize) -> u32 {
        (**self).read_reg(index)
    }

    fn write_reg(&mut self, index: usize, value: u32) {
        (**self).write_reg(index, value)
    }
}

/// DMA-coherent memory shared with the DMA engines, addressed in 32-bit words.
///
/// Word values are host-order `u32`s; the engine moves the underlying bytes unchanged.
/// Implementations may panic on an index at or beyond [`DmaMemory::len_words`]; callers are
/// expected to bounds-check first.
pub trait DmaMemory {
    /// Bus address the DMA engine uses for word 0.
    fn phys_addr(&self) -> u64;
    fn len_words(&self) -> usize;
    fn read_word(&self, index: usize) -> u32;
    fn write_word(&mut self, index: usize, value: u32);
}

impl<T: DmaMemory + ?Sized> DmaMemory for Box<T> {
    fn phys_addr(&self) -> u64 {
        (**self).phys_addr()
    }

    fn len_words(&self) -> usize {
        (**self).len_words()
    }

    fn read_word(&self, index: usize) -> u32 {
        (**self).read_word(index)
    }

    fn write_word(&mut self, index: usize, value: u32) {
        (**self).write_word(index, value)
    }
}

/// Plain heap-backed [`DmaMemory`] with a caller-chosen bus address.
///
/// Nothing can DMA into this; it exists for code paths that only stage words (unit tests,
/// dry runs).
#[derive(Debug, Clone)]
pub struct VecMemory {
    phys_addr: u64,
    words: Vec<u32>,
}

impl VecMemory {
    pub fn new(phys_addr: u64, len_words: usize) -> Self {
        Self {
            phys_addr,
            words: vec![0; len_words],
        }
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

impl DmaMemory for VecMemory {
    fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    fn len_words(&self) -> usize {
        self.words.len()
    }

    fn read_word(&self, index: usize) -> u32 {
        self.words[index]
    }

    fn write_word(&mut self, index: usize, value: u32) {
        self.words[index] = value;
    }
}
