use std::time::Duration;

/// Per-channel driver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaConfig {
    /// Wall-clock bound on a single transfer. On expiry the channel is reset and the transfer
    /// reports [`crate::DmaError::Timeout`].
    pub timeout: Duration,
    /// Bound on waiting for a reset to reach the halted state.
    ///
    /// `None` (the default) spins until the hardware reports halted, however long that takes.
    /// Setting a bound makes [`crate::DmaChannel::reset`] fail with
    /// [`crate::DmaError::ResetTimeout`] instead of hanging on wedged hardware.
    pub reset_timeout: Option<Duration>,
}

impl DmaConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
}

impl Default for DmaConfig {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            reset_timeout: None,
        }
    }
}
