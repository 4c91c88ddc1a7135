//! Register-level control of AXI DMA engines running in simple (direct register) mode.
//!
//! Each engine has two channels (memory-to-stream "transmit" and stream-to-memory "receive"),
//! each driven through a block of [`regs::REGS_PER_CHANNEL`] 32-bit registers. A transfer is a
//! single blocking operation: program the buffer address, start the channel, write the length
//! and poll the status register until the channel goes idle or halts.
//!
//! Hardware access goes through two small traits so the same driver runs against mapped
//! registers ([`mmio`]) or a software model in tests:
//! - [`RegisterBlock`]: 32-bit register file indexed by register number
//! - [`DmaMemory`]: DMA-coherent buffer addressed in words
//!
//! Time is taken from a [`Clock`]; tests use [`FakeClock`] to make timeouts deterministic.

mod channel;
mod clock;
mod config;
mod error;
mod hw;
#[cfg(unix)]
pub mod mmio;
pub mod regs;

pub use channel::{ChannelState, Direction, DmaChannel};
pub use clock::{Clock, FakeClock, StdClock};
pub use config::DmaConfig;
pub use error::DmaError;
pub use hw::{DmaMemory, RegisterBlock, VecMemory};
pub use regs::{DmaControl, DmaStatus};
