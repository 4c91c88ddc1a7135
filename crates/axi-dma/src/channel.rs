use tracing::{error, trace, warn};

use crate::regs::{self, DmaControl, DmaStatus};
use crate::{Clock, DmaConfig, DmaError, RegisterBlock};

/// Data direction of a channel, from the point of view of memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Memory to stream (MM2S).
    Transmit,
    /// Stream to memory (S2MM).
    Receive,
}

/// Driver-side view of a channel.
///
/// `Idle -> Running` on start, `Running -> Idle | Halted` on completion, `Error` when the
/// hardware reported a fault. A reset always ends in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Running,
    Halted,
    Error,
}

/// One direction of one AXI DMA engine.
///
/// All operations busy-wait on the calling thread. At most one transfer is ever in flight
/// because [`DmaChannel::transfer`] does not return until the channel has settled.
#[derive(Debug)]
pub struct DmaChannel<R> {
    name: &'static str,
    direction: Direction,
    regs: R,
    config: DmaConfig,
    state: ChannelState,
}

impl<R: RegisterBlock> DmaChannel<R> {
    pub fn new(name: &'static str, direction: Direction, regs: R, config: DmaConfig) -> Self {
        Self {
            name,
            direction,
            regs,
            config,
            state: ChannelState::Idle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn config(&self) -> &DmaConfig {
        &self.config
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }

    pub fn status(&self) -> DmaStatus {
        DmaStatus::from_bits_retain(self.regs.read_reg(regs::STATUS))
    }

    /// Byte count from the length register.
    ///
    /// After a receive transfer this is the number of bytes the hardware actually wrote, which
    /// may be less than the length that was programmed.
    pub fn transferred_len(&self) -> u32 {
        self.regs.read_reg(regs::LENGTH)
    }

    /// Pulses the reset bit and waits for the channel to report halted.
    pub fn reset<C: Clock>(&mut self, clock: &C) -> Result<(), DmaError> {
        trace!(channel = self.name, "resetting DMA channel");

        self.regs
            .write_reg(regs::CONTROL, DmaControl::RESET.bits());
        self.regs.write_reg(regs::CONTROL, 0);

        let started = clock.now();
        while !self.status().contains(DmaStatus::HALTED) {
            if let Some(limit) = self.config.reset_timeout {
                if clock.now().saturating_sub(started) > limit {
                    self.state = ChannelState::Error;
                    error!(channel = self.name, "DMA channel reset did not complete");
                    return Err(DmaError::ResetTimeout { channel: self.name });
                }
            }
            std::hint::spin_loop();
        }

        self.state = ChannelState::Idle;
        Ok(())
    }

    /// Runs one transfer of `len` bytes to/from the buffer at `phys_addr` and waits for it.
    ///
    /// `len` must be a multiple of four. On timeout or hardware fault the channel is reset
    /// before the error is returned, so it is always usable by the next caller.
    pub fn transfer<C: Clock>(
        &mut self,
        clock: &C,
        phys_addr: u64,
        len: u32,
    ) -> Result<(), DmaError> {
        debug_assert!(len % 4 == 0, "DMA length {len} is not word aligned");

        self.regs.write_reg(regs::ADDR_HI, (phys_addr >> 32) as u32);
        self.regs.write_reg(regs::ADDR_LO, phys_addr as u32);

        // Writing the length register is what kicks off the transfer.
        self.regs
            .write_reg(regs::CONTROL, DmaControl::START.bits());
        self.regs.write_reg(regs::LENGTH, len);
        self.state = ChannelState::Running;

        let started = clock.now();
        let status = loop {
            let status = self.status();
            if status.is_settled() {
                break status;
            }

            if clock.now().saturating_sub(started) > self.config.timeout {
                warn!(
                    channel = self.name,
                    status = status.bits(),
                    "DMA transfer timed out, resetting channel"
                );
                self.reset(clock)?;
                return Err(DmaError::Timeout {
                    channel: self.name,
                    status,
                });
            }
            std::hint::spin_loop();
        };

        if status.has_error() {
            self.state = ChannelState::Error;
            error!(
                channel = self.name,
                status = status.bits(),
                "DMA transfer failed"
            );
            self.reset(clock)?;
            return Err(DmaError::HardwareFault {
                channel: self.name,
                status,
            });
        }

        self.state = if status.contains(DmaStatus::HALTED) {
            ChannelState::Halted
        } else {
            ChannelState::Idle
        };
        Ok(())
    }
}
