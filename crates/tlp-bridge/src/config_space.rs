use axi_dma::{Clock, DmaMemory, RegisterBlock};
use tracing::debug;

use crate::bridge::BridgeState;
use crate::error::BufferError;
use crate::transport::Transport;
use crate::Result;

/// Size of a configuration space reply in bytes.
pub const CONFIG_REPLY_BYTES: u32 = 4;

impl<R, M, C> BridgeState<R, M, C>
where
    R: RegisterBlock,
    M: DmaMemory,
    C: Clock,
{
    /// Reads one dword of the endpoint's configuration space through the management port.
    ///
    /// `token` is the address/enable word the management port expects; it is written twice and
    /// sent as a two-word pulse. The reply word is returned exactly as delivered.
    pub(crate) fn config_read(&mut self, token: u32) -> Result<u32> {
        self.identity.resolve()?;

        let mut transport = Transport::new(&mut self.config_port, &mut self.staging, &self.clock);
        transport.send_words(&[token, token])?;
        let bytes = transport.receive_bytes()?;
        if bytes != CONFIG_REPLY_BYTES {
            return Err(BufferError::SizeMismatch {
                expected: CONFIG_REPLY_BYTES,
                actual: bytes,
            }
            .into());
        }

        let mut value = [0];
        self.staging.read_rx(0, &mut value)?;
        debug!(token, value = value[0], "config read");
        Ok(value[0])
    }
}
