use axi_dma::RegisterBlock;
use pcie_tlp::RequesterId;

use crate::{BridgeError, Result};

/// Index of the identity word inside its register block.
pub const IDENTITY_REG: usize = 0;

/// Read-only register holding the requester ID the endpoint was enumerated with.
///
/// The value is re-read on every call; the endpoint may be re-enumerated at any time.
#[derive(Debug)]
pub struct IdentityRegister<R> {
    regs: R,
}

impl<R: RegisterBlock> IdentityRegister<R> {
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// The full register value, unvalidated.
    pub fn raw(&self) -> u32 {
        self.regs.read_reg(IDENTITY_REG)
    }

    /// The requester ID to place in outgoing requests.
    pub fn resolve(&self) -> Result<RequesterId> {
        RequesterId::from_status(self.raw()).ok_or(BridgeError::NotConnected)
    }
}
