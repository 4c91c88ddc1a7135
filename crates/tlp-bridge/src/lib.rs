//! Memory and configuration space access to a remote PCI Express endpoint.
//!
//! The endpoint sits behind an FPGA bridge that turns an AXI stream into a TLP link. Two AXI
//! DMA engines feed it: one channel pair carries memory request/completion TLPs, the other
//! talks to the endpoint's configuration management port. A read-only identity register holds
//! the requester ID the endpoint was enumerated with.
//!
//! [`Bridge`] owns all of this and serializes access to it. Remote memory is read with MRd64
//! requests and written with MWr64 requests; payload bytes keep their memory order on the wire
//! (see [`pcie_tlp::wire`]).

mod bridge;
mod config;
mod config_space;
mod error;
mod identity;
mod memory;
mod staging;
mod transport;
mod window;

pub use bridge::{Bridge, BridgeHardware};
pub use config::BridgeConfig;
pub use config_space::CONFIG_REPLY_BYTES;
pub use error::{BridgeError, BufferError, ProtocolError, Result};
pub use identity::{IdentityRegister, IDENTITY_REG};
pub use memory::read_chunk_dwords;
pub use staging::StagingBuffer;
pub use window::MemoryWindow;

pub use axi_dma::{DmaConfig, FakeClock, StdClock};
pub use pcie_tlp::RequesterId;
