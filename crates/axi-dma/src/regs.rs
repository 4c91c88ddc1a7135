//! AXI DMA register map (simple mode), as register indices into a channel's block.

use bitflags::bitflags;

/// Number of 32-bit registers in one channel's block. The receive channel of an engine
/// starts right after the transmit channel.
pub const REGS_PER_CHANNEL: usize = 12;

pub const CONTROL: usize = 0x00;
pub const STATUS: usize = 0x01;
pub const ADDR_LO: usize = 0x06;
pub const ADDR_HI: usize = 0x07;
pub const LENGTH: usize = 0x0a;

bitflags! {
    /// Channel control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmaControl: u32 {
        const START = 1 << 0;
        const RESET = 1 << 2;
    }
}

bitflags! {
    /// Channel status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmaStatus: u32 {
        const HALTED = 1 << 0;
        const IDLE = 1 << 1;
        /// Internal error.
        const ERR_INT = 1 << 4;
        /// Slave error.
        const ERR_SLV = 1 << 5;
        /// Decode error.
        const ERR_DEC = 1 << 6;

        const ERRORS = Self::ERR_INT.bits() | Self::ERR_SLV.bits() | Self::ERR_DEC.bits();
    }
}

impl DmaStatus {
    /// The channel is no longer moving data.
    pub fn is_settled(self) -> bool {
        self.intersects(Self::IDLE | Self::HALTED)
    }

    pub fn has_error(self) -> bool {
        self.intersects(Self::ERRORS)
    }
}
