use anyhow::Result;
use axi_dma::{DmaMemory, RegisterBlock, StdClock};
use tlp_bridge::{Bridge, BridgeConfig, BridgeHardware};
use tlp_bridge_sim::{SimConfig, SimHardware};

use crate::config::HardwareArgs;

pub type DynRegisters = Box<dyn RegisterBlock + Send>;
pub type DynMemory = Box<dyn DmaMemory + Send>;
pub type CliBridge = Bridge<DynRegisters, DynMemory, StdClock>;

/// Vendor/device word the simulated endpoint reports at configuration offset 0.
const SIM_VENDOR_DEVICE: u32 = 0x1337_10ee;

pub fn open(args: &HardwareArgs, config: BridgeConfig) -> Result<CliBridge> {
    let hw = if args.simulate {
        simulated(config)
    } else {
        mapped(args)?
    };
    Ok(Bridge::new(hw, StdClock::new(), config)?)
}

fn simulated(config: BridgeConfig) -> BridgeHardware<DynRegisters, DynMemory> {
    let sim = SimHardware::new(SimConfig {
        page_size: config.page_size,
        ..SimConfig::default()
    });
    sim.set_config_word(0, SIM_VENDOR_DEVICE);
    tracing::info!("using simulated bridge hardware");

    let h = sim.handles();
    BridgeHardware {
        mem_tx: Box::new(h.mem_tx),
        mem_rx: Box::new(h.mem_rx),
        cfg_tx: Box::new(h.cfg_tx),
        cfg_rx: Box::new(h.cfg_rx),
        identity: Box::new(h.identity),
        staging: Box::new(h.staging),
    }
}

#[cfg(unix)]
fn mapped(args: &HardwareArgs) -> Result<BridgeHardware<DynRegisters, DynMemory>> {
    use anyhow::Context;
    use axi_dma::mmio::{MmioMemory, MmioRegisters, PhysMapping};
    use axi_dma::regs::REGS_PER_CHANNEL;

    let required = |value: Option<u64>, name: &str| {
        value.with_context(|| format!("--{name} is required without --simulate"))
    };
    let engine_bytes = 2 * REGS_PER_CHANNEL * 4;
    let map = |phys: u64, len: usize, what: &str| {
        PhysMapping::map(&args.mem_dev, phys, len).with_context(|| {
            format!(
                "failed to map {what} at 0x{phys:x} from {}",
                args.mem_dev.display()
            )
        })
    };

    let dma0 = map(required(args.dma0_base, "dma0-base")?, engine_bytes, "DMA engine 0")?;
    let dma1 = map(required(args.dma1_base, "dma1-base")?, engine_bytes, "DMA engine 1")?;
    let gpio = map(required(args.gpio_base, "gpio-base")?, 4, "identity register")?;
    let buffer = map(
        required(args.dma_buffer, "dma-buffer")?,
        args.dma_buffer_len,
        "DMA buffer",
    )?;

    // Each engine has its transmit channel registers first and its receive channel right after.
    Ok(BridgeHardware {
        mem_tx: Box::new(MmioRegisters::new(dma0.clone(), 0, REGS_PER_CHANNEL)?),
        mem_rx: Box::new(MmioRegisters::new(dma0, REGS_PER_CHANNEL, REGS_PER_CHANNEL)?),
        cfg_tx: Box::new(MmioRegisters::new(dma1.clone(), 0, REGS_PER_CHANNEL)?),
        cfg_rx: Box::new(MmioRegisters::new(dma1, REGS_PER_CHANNEL, REGS_PER_CHANNEL)?),
        identity: Box::new(MmioRegisters::new(gpio, 0, 1)?),
        staging: Box::new(MmioMemory::new(buffer)),
    })
}

#[cfg(not(unix))]
fn mapped(_args: &HardwareArgs) -> Result<BridgeHardware<DynRegisters, DynMemory>> {
    anyhow::bail!("mapping physical memory is only supported on unix hosts; use --simulate")
}
