use axi_dma::DmaConfig;
use pcie_tlp::MAX_LENGTH_DWORDS;

use crate::BridgeError;

/// Bridge-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Settings shared by all four DMA channels.
    pub dma: DmaConfig,
    /// Hardware page size. The staging buffer holds one page for each direction, and a memory
    /// read request never crosses a boundary of this size.
    pub page_size: usize,
    /// Cap on the length of one memory read request, in dwords.
    pub max_read_dwords: u32,
}

impl BridgeConfig {
    pub const DEFAULT_PAGE_SIZE: usize = 4096;
    pub const DEFAULT_MAX_READ_DWORDS: u32 = 16;

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.page_size < 16 || !self.page_size.is_power_of_two() {
            return Err(BridgeError::InvalidConfig(
                "page_size must be a power of two of at least 16 bytes",
            ));
        }
        if u32::try_from(self.page_size).is_err() {
            return Err(BridgeError::InvalidConfig("page_size must fit in 32 bits"));
        }
        if self.max_read_dwords == 0 || self.max_read_dwords > MAX_LENGTH_DWORDS {
            return Err(BridgeError::InvalidConfig(
                "max_read_dwords must be between 1 and 1024",
            ));
        }
        Ok(())
    }

    pub(crate) fn page_words(&self) -> usize {
        self.page_size / 4
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            dma: DmaConfig::default(),
            page_size: Self::DEFAULT_PAGE_SIZE,
            max_read_dwords: Self::DEFAULT_MAX_READ_DWORDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BridgeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.page_words(), 1024);
        assert_eq!(config.dma.timeout, std::time::Duration::from_secs(1));
    }

    #[test]
    fn rejects_odd_page_size_and_read_cap() {
        let bad_page = BridgeConfig {
            page_size: 3000,
            ..BridgeConfig::default()
        };
        assert!(matches!(
            bad_page.validate(),
            Err(BridgeError::InvalidConfig(_))
        ));

        let bad_cap = BridgeConfig {
            max_read_dwords: 0,
            ..BridgeConfig::default()
        };
        assert!(bad_cap.validate().is_err());

        let too_big = BridgeConfig {
            max_read_dwords: 2048,
            ..BridgeConfig::default()
        };
        assert!(too_big.validate().is_err());
    }
}
