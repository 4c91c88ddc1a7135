//! A software model of the TLP bridge hardware.
//!
//! [`SimHardware`] owns the whole model: four AXI DMA channels, the staging memory they move
//! words through, the identity register, and a remote endpoint with a byte-addressable memory
//! space and a configuration space. The driver talks to it through [`SimRegisters`] and
//! [`SimMemory`] handles that implement the `axi-dma` hardware seams, so the real driver code
//! runs unchanged on top.
//!
//! Transfers complete synchronously inside the register write that starts them. Knobs on
//! [`SimHardware`] inject the faults real hardware can produce.

mod endpoint;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axi_dma::regs::{self, DmaControl, DmaStatus, REGS_PER_CHANNEL};
use axi_dma::{DmaMemory, RegisterBlock};
use pcie_tlp::RequesterId;
use tracing::{debug, trace};

pub use endpoint::Corruption;

use endpoint::Endpoint;

/// The four simulated DMA channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimChannel {
    MemTx,
    MemRx,
    CfgTx,
    CfgRx,
}

impl SimChannel {
    pub const ALL: [SimChannel; 4] = [Self::MemTx, Self::MemRx, Self::CfgTx, Self::CfgRx];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Bus address of the staging memory.
    pub staging_phys: u64,
    pub page_size: usize,
    /// Initial identity register value.
    pub identity: u32,
    /// Requester ID the endpoint answers completions with.
    pub completer: RequesterId,
    /// Data dwords per completion.
    pub split_dwords: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            staging_phys: 0x3000_0000,
            page_size: 4096,
            identity: 0x0100,
            completer: RequesterId::new(2, 0, 0),
            split_dwords: 1024,
        }
    }
}

#[derive(Debug, Default)]
struct ChannelModel {
    regs: [u32; REGS_PER_CHANNEL],
    resets: usize,
    transfers: usize,
    stalled: bool,
    error_bits: u32,
}

#[derive(Debug)]
struct SimState {
    config: SimConfig,
    staging: Vec<u32>,
    identity: u32,
    channels: [ChannelModel; 4],
    endpoint: Endpoint,
    /// Read-enable tokens seen on the config transmit channel awaiting their reply.
    config_replies: VecDeque<u32>,
    config_reply_bytes: u32,
    mem_tx_log: Vec<Vec<u32>>,
    cfg_tx_log: Vec<Vec<u32>>,
}

impl SimState {
    fn channel(&mut self, channel: SimChannel) -> &mut ChannelModel {
        &mut self.channels[channel.index()]
    }

    fn write_channel_reg(&mut self, channel: SimChannel, index: usize, value: u32) {
        let model = self.channel(channel);
        model.regs[index] = value;

        if index == regs::CONTROL && value & DmaControl::RESET.bits() != 0 {
            model.resets += 1;
            model.regs[regs::STATUS] = DmaStatus::HALTED.bits();
            trace!(?channel, "channel reset");
            return;
        }
        if index != regs::LENGTH || model.regs[regs::CONTROL] & DmaControl::START.bits() == 0 {
            return;
        }

        // Start of a transfer.
        model.transfers += 1;
        model.regs[regs::STATUS] = 0;
        if model.stalled {
            return;
        }
        if model.error_bits != 0 {
            model.regs[regs::STATUS] = DmaStatus::IDLE.bits() | model.error_bits;
            return;
        }

        let address = (u64::from(model.regs[regs::ADDR_HI]) << 32)
            | u64::from(model.regs[regs::ADDR_LO]);
        let status = match self.run_transfer(channel, address, value) {
            Some(true) => DmaStatus::IDLE,
            // A receive with nothing to deliver waits for data that never arrives.
            Some(false) => DmaStatus::empty(),
            // The engine's AXI master got a SLVERR back for an address outside the buffer.
            None => DmaStatus::IDLE | DmaStatus::ERR_SLV,
        };
        self.channel(channel).regs[regs::STATUS] = status.bits();
    }

    /// Moves data for one started transfer and reports whether it completed. Returns `None` on
    /// a bus address outside staging memory.
    fn run_transfer(&mut self, channel: SimChannel, address: u64, len: u32) -> Option<bool> {
        let first = usize::try_from(address.checked_sub(self.config.staging_phys)? / 4).ok()?;
        let words = len as usize / 4;
        if first.checked_add(words)? > self.staging.len() {
            return None;
        }

        match channel {
            SimChannel::MemTx => {
                let tlp = self.staging[first..first + words].to_vec();
                debug!(words = tlp.len(), word0 = ?tlp.first(), "endpoint <- TLP");
                self.endpoint.receive_tlp(&tlp);
                self.mem_tx_log.push(tlp);
            }
            SimChannel::CfgTx => {
                let pulse = self.staging[first..first + words].to_vec();
                // The read strobe must stay asserted for two consecutive words.
                if let [a, b, ..] = pulse.as_slice() {
                    if a == b {
                        self.config_replies.push_back(*a);
                    }
                }
                self.cfg_tx_log.push(pulse);
            }
            SimChannel::MemRx => {
                let Some(tlp) = self.endpoint.completions.pop_front() else {
                    trace!(?channel, "receive waiting for data");
                    return Some(false);
                };
                let delivered = tlp.len().min(words);
                self.staging[first..first + delivered].copy_from_slice(&tlp[..delivered]);
                self.channel(channel).regs[regs::LENGTH] = (delivered * 4) as u32;
            }
            SimChannel::CfgRx => {
                let Some(token) = self.config_replies.pop_front() else {
                    trace!(?channel, "receive waiting for data");
                    return Some(false);
                };
                let value = self.endpoint.config_space.get(&token).copied().unwrap_or(0);
                let bytes = self.config_reply_bytes.min(len);
                let reply_words = (bytes as usize).div_ceil(4);
                for (i, slot) in self.staging[first..first + reply_words].iter_mut().enumerate() {
                    *slot = if i == 0 { value } else { 0 };
                }
                self.channel(channel).regs[regs::LENGTH] = bytes;
            }
        }
        Some(true)
    }
}

type Shared = Arc<Mutex<SimState>>;

fn lock(state: &Shared) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The simulated hardware and its fault-injection knobs.
///
/// Cloning gives another handle to the same model.
#[derive(Debug, Clone)]
pub struct SimHardware {
    state: Shared,
}

/// Register and memory handles for one bridge instance.
#[derive(Debug)]
pub struct SimHandles {
    pub mem_tx: SimRegisters,
    pub mem_rx: SimRegisters,
    pub cfg_tx: SimRegisters,
    pub cfg_rx: SimRegisters,
    pub identity: SimRegisters,
    pub staging: SimMemory,
}

impl SimHardware {
    pub fn new(config: SimConfig) -> Self {
        let state = SimState {
            config,
            staging: vec![0; 2 * config.page_size / 4],
            identity: config.identity,
            channels: Default::default(),
            endpoint: Endpoint::new(config.completer, config.split_dwords),
            config_replies: VecDeque::new(),
            config_reply_bytes: 4,
            mem_tx_log: Vec::new(),
            cfg_tx_log: Vec::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn handles(&self) -> SimHandles {
        let regs = |target| SimRegisters {
            state: self.state.clone(),
            target,
        };
        SimHandles {
            mem_tx: regs(Target::Channel(SimChannel::MemTx)),
            mem_rx: regs(Target::Channel(SimChannel::MemRx)),
            cfg_tx: regs(Target::Channel(SimChannel::CfgTx)),
            cfg_rx: regs(Target::Channel(SimChannel::CfgRx)),
            identity: regs(Target::Identity),
            staging: SimMemory {
                state: self.state.clone(),
                phys_addr: lock(&self.state).config.staging_phys,
            },
        }
    }

    pub fn set_identity(&self, raw: u32) {
        lock(&self.state).identity = raw;
    }

    /// Data dwords per completion (minimum 1).
    pub fn set_split_dwords(&self, dwords: usize) {
        lock(&self.state).endpoint.split_dwords = dwords.max(1);
    }

    pub fn set_corruption(&self, corruption: Option<Corruption>) {
        lock(&self.state).endpoint.corruption = corruption;
    }

    /// A stalled channel never leaves the running state after a start.
    pub fn set_stalled(&self, channel: SimChannel, stalled: bool) {
        lock(&self.state).channel(channel).stalled = stalled;
    }

    /// Error bits every subsequent transfer on `channel` settles with. Empty to clear.
    pub fn set_error_bits(&self, channel: SimChannel, bits: DmaStatus) {
        lock(&self.state).channel(channel).error_bits = (bits & DmaStatus::ERRORS).bits();
    }

    /// Byte length the configuration port reports for each reply (4 on real hardware).
    pub fn set_config_reply_bytes(&self, bytes: u32) {
        lock(&self.state).config_reply_bytes = bytes;
    }

    pub fn set_config_word(&self, token: u32, value: u32) {
        lock(&self.state).endpoint.config_space.insert(token, value);
    }

    pub fn resets(&self, channel: SimChannel) -> usize {
        lock(&self.state).channels[channel.index()].resets
    }

    pub fn transfers(&self, channel: SimChannel) -> usize {
        lock(&self.state).channels[channel.index()].transfers
    }

    /// Every packet sent on the memory transmit channel, oldest first.
    pub fn mem_tx_log(&self) -> Vec<Vec<u32>> {
        lock(&self.state).mem_tx_log.clone()
    }

    /// Every pulse sent on the config transmit channel, oldest first.
    pub fn cfg_tx_log(&self) -> Vec<Vec<u32>> {
        lock(&self.state).cfg_tx_log.clone()
    }

    /// Queues a packet for the memory receive channel, ahead of nothing else already queued.
    pub fn push_completion(&self, words: Vec<u32>) {
        lock(&self.state).endpoint.completions.push_back(words);
    }

    pub fn pending_completions(&self) -> usize {
        lock(&self.state).endpoint.completions.len()
    }

    /// Stores bytes directly in the endpoint's memory space.
    pub fn poke(&self, address: u64, bytes: &[u8]) {
        let mut state = lock(&self.state);
        for (i, byte) in bytes.iter().enumerate() {
            state.endpoint.write_byte(address.wrapping_add(i as u64), *byte);
        }
    }

    /// Loads bytes directly from the endpoint's memory space.
    pub fn peek(&self, address: u64, len: usize) -> Vec<u8> {
        let state = lock(&self.state);
        (0..len)
            .map(|i| state.endpoint.read_byte(address.wrapping_add(i as u64)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Channel(SimChannel),
    Identity,
}

/// A register block handle into the model.
#[derive(Debug, Clone)]
pub struct SimRegisters {
    state: Shared,
    target: Target,
}

impl RegisterBlock for SimRegisters {
    fn read_reg(&self, index: usize) -> u32 {
        let state = lock(&self.state);
        match self.target {
            Target::Channel(channel) => state.channels[channel.index()].regs[index],
            Target::Identity => state.identity,
        }
    }

    fn write_reg(&mut self, index: usize, value: u32) {
        let mut state = lock(&self.state);
        match self.target {
            Target::Channel(channel) => state.write_channel_reg(channel, index, value),
            Target::Identity => {}
        }
    }
}

/// The staging memory handle.
#[derive(Debug, Clone)]
pub struct SimMemory {
    state: Shared,
    phys_addr: u64,
}

impl DmaMemory for SimMemory {
    fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    fn len_words(&self) -> usize {
        lock(&self.state).staging.len()
    }

    fn read_word(&self, index: usize) -> u32 {
        lock(&self.state).staging[index]
    }

    fn write_word(&mut self, index: usize, value: u32) {
        lock(&self.state).staging[index] = value;
    }
}
