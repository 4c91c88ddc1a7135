use std::sync::{Mutex, MutexGuard, PoisonError};

use axi_dma::{Clock, Direction, DmaChannel, DmaMemory, RegisterBlock};
use pcie_tlp::RequesterId;
use tracing::{debug, error, info};

use crate::error::BufferError;
use crate::identity::IdentityRegister;
use crate::staging::StagingBuffer;
use crate::transport::{ChannelPair, Transport};
use crate::window::MemoryWindow;
use crate::{BridgeConfig, BridgeError, Result};

/// Register blocks and staging memory making up one bridge instance.
///
/// `mem_*` is the channel pair carrying memory TLPs, `cfg_*` the pair wired to the endpoint's
/// configuration management port. The staging buffer is shared by both pairs.
#[derive(Debug)]
pub struct BridgeHardware<R, M> {
    pub mem_tx: R,
    pub mem_rx: R,
    pub cfg_tx: R,
    pub cfg_rx: R,
    pub identity: R,
    pub staging: M,
}

/// Everything one logical operation needs exclusive access to.
#[derive(Debug)]
pub(crate) struct BridgeState<R, M, C> {
    pub memory: ChannelPair<R>,
    pub config_port: ChannelPair<R>,
    pub identity: IdentityRegister<R>,
    pub staging: StagingBuffer<M>,
    pub clock: C,
    pub config: BridgeConfig,
    /// Tag for the next memory read request.
    pub tag: u8,
}

impl<R, M, C> BridgeState<R, M, C>
where
    R: RegisterBlock,
    M: DmaMemory,
    C: Clock,
{
    fn reset_all(&mut self) -> Result<()> {
        self.memory.rx.reset(&self.clock)?;
        self.memory.tx.reset(&self.clock)?;
        self.config_port.rx.reset(&self.clock)?;
        self.config_port.tx.reset(&self.clock)?;
        Ok(())
    }

    fn memory_transport(&mut self) -> Transport<'_, R, M, C> {
        Transport::new(&mut self.memory, &mut self.staging, &self.clock)
    }

    /// Reads any byte range by widening it to whole dwords.
    pub(crate) fn read_bytes(&mut self, address: u64, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let (start, span_len) = dword_span(address, buf.len())?;
        if start == address && span_len == buf.len() {
            return self.mem_read(address, buf);
        }

        let mut span = vec![0; span_len];
        self.mem_read(start, &mut span)?;
        let skip = (address - start) as usize;
        buf.copy_from_slice(&span[skip..skip + buf.len()]);
        Ok(())
    }

    /// Writes any byte range, reading back the partial dwords at either edge first.
    pub(crate) fn write_bytes(&mut self, address: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let (start, span_len) = dword_span(address, data.len())?;
        let skip = (address - start) as usize;
        if skip == 0 && span_len == data.len() {
            return self.mem_write(address, data);
        }

        let mut span = vec![0; span_len];
        let last = span_len - 4;
        if skip != 0 {
            self.mem_read(start, &mut span[..4])?;
        }
        // A single-dword span was already fetched as the head.
        if skip + data.len() < span_len && (last != 0 || skip == 0) {
            self.mem_read(start + last as u64, &mut span[last..])?;
        }
        span[skip..skip + data.len()].copy_from_slice(data);
        self.mem_write(start, &span)
    }
}

/// Dword-aligned start and byte length of the span covering `len` bytes at `address`.
///
/// `len` must be non-zero. The span may end at the very top of the address space.
fn dword_span(address: u64, len: usize) -> Result<(u64, usize)> {
    let last = address.checked_add(len as u64 - 1).ok_or_else(|| {
        BridgeError::InvalidArgument(format!(
            "access at 0x{address:x} of {len} bytes wraps the address space"
        ))
    })?;
    let start = address & !3;
    Ok((start, ((last & !3) - start) as usize + 4))
}

/// Access to a remote PCI Express endpoint through the TLP bridge.
///
/// Operations are serialized by an internal lock: each one owns the staging buffer and the
/// channels from its first request to its last completion, so any number of threads may share
/// a `Bridge`. A panic in one caller does not wedge the others; the next caller takes over the
/// state as it was left.
#[derive(Debug)]
pub struct Bridge<R, M, C> {
    state: Mutex<BridgeState<R, M, C>>,
    config: BridgeConfig,
}

impl<R, M, C> Bridge<R, M, C>
where
    R: RegisterBlock,
    M: DmaMemory,
    C: Clock,
{
    /// Takes ownership of the hardware and resets all four channels.
    pub fn new(hw: BridgeHardware<R, M>, clock: C, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let staging = StagingBuffer::new(hw.staging, config.page_size)?;

        let channel = |name, direction, regs| DmaChannel::new(name, direction, regs, config.dma);
        let mut state = BridgeState {
            memory: ChannelPair {
                tx: channel("mem_tx", Direction::Transmit, hw.mem_tx),
                rx: channel("mem_rx", Direction::Receive, hw.mem_rx),
            },
            config_port: ChannelPair {
                tx: channel("cfg_tx", Direction::Transmit, hw.cfg_tx),
                rx: channel("cfg_rx", Direction::Receive, hw.cfg_rx),
            },
            identity: IdentityRegister::new(hw.identity),
            staging,
            clock,
            config,
            tag: 0,
        };
        state.reset_all()?;

        info!(
            tx_phys = state.staging.tx_phys(),
            rx_phys = state.staging.rx_phys(),
            page_size = config.page_size,
            "bridge ready"
        );
        Ok(Self {
            state: Mutex::new(state),
            config,
        })
    }

    fn lock(&self) -> MutexGuard<'_, BridgeState<R, M, C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Reads `buf.len()` bytes of endpoint memory at `address`.
    ///
    /// Address and length must be multiples of four and the length non-zero. The range is
    /// fetched with memory read requests of at most `max_read_dwords` that never cross a page
    /// boundary.
    pub fn read(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();
        self.lock().mem_read(address, buf).map_err(|err| {
            error!(address, len, %err, "memory read failed");
            err
        })
    }

    /// Writes `data` to endpoint memory at `address`. Same alignment rules as [`Bridge::read`].
    pub fn write(&self, address: u64, data: &[u8]) -> Result<()> {
        self.lock().mem_write(address, data).map_err(|err| {
            error!(address, len = data.len(), %err, "memory write failed");
            err
        })
    }

    /// Like [`Bridge::read`] but for any address and length.
    pub fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();
        self.lock().read_bytes(address, buf).map_err(|err| {
            error!(address, len, %err, "memory read failed");
            err
        })
    }

    /// Like [`Bridge::write`] but for any address and length.
    ///
    /// Partial dwords at either edge are read first and merged, under the same lock, so no
    /// other caller of this bridge can interleave. The endpoint itself may still see the
    /// untouched bytes rewritten.
    pub fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        self.lock().write_bytes(address, data).map_err(|err| {
            error!(address, len = data.len(), %err, "memory write failed");
            err
        })
    }

    /// Reads one dword of configuration space. The reply is returned as delivered.
    pub fn config_read(&self, token: u32) -> Result<u32> {
        self.lock().config_read(token).map_err(|err| {
            error!(token, %err, "config read failed");
            err
        })
    }

    /// The identity register value, unvalidated. Zero means the endpoint is not enumerated.
    pub fn device_id(&self) -> u32 {
        self.lock().identity.raw()
    }

    /// The requester ID placed in outgoing requests.
    pub fn requester_id(&self) -> Result<RequesterId> {
        self.lock().identity.resolve()
    }

    /// Tag the next memory read request will carry.
    pub fn next_tag(&self) -> u8 {
        self.lock().tag
    }

    /// Resets all four channels.
    pub fn reset(&self) -> Result<()> {
        debug!("resetting all channels");
        self.lock().reset_all()
    }

    /// Transmits caller-built words on the memory channel pair without inspecting them.
    pub fn send_raw(&self, words: &[u32]) -> Result<()> {
        let capacity = self.config.page_words();
        if words.is_empty() || words.len() > capacity {
            return Err(BridgeError::InvalidArgument(format!(
                "raw packet of {} words must hold between 1 and {capacity} words",
                words.len()
            )));
        }
        self.lock().memory_transport().send_words(words)
    }

    /// Receives one packet from the memory channel pair without inspecting it.
    pub fn receive_raw(&self) -> Result<Vec<u32>> {
        self.lock().memory_transport().receive_words()
    }

    /// Receives one packet into `out` and returns its length in words.
    ///
    /// Fails with [`BufferError::TooSmall`] if the packet does not fit; the packet is lost.
    pub fn receive_raw_into(&self, out: &mut [u32]) -> Result<usize> {
        let mut state = self.lock();
        let count = state.memory_transport().receive()?;
        if count > out.len() {
            return Err(BufferError::TooSmall {
                needed: count,
                available: out.len(),
            }
            .into());
        }
        state.staging.read_rx(0, &mut out[..count])?;
        Ok(count)
    }

    /// A cursor over endpoint memory starting at address zero.
    pub fn window(&self) -> MemoryWindow<'_, R, M, C> {
        MemoryWindow::new(self)
    }
}
