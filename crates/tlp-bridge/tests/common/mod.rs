#![allow(dead_code)]

use std::time::Duration;

use tlp_bridge::{Bridge, BridgeConfig, BridgeHardware, FakeClock};
use tlp_bridge_sim::{SimConfig, SimHardware, SimMemory, SimRegisters};

pub type SimBridge = Bridge<SimRegisters, SimMemory, FakeClock>;

/// Each clock read moves time forward, so a channel that never settles hits its deadline after
/// a bounded number of polls.
pub const POLL_STEP: Duration = Duration::from_millis(1);

pub fn bridge_on(sim: &SimHardware, clock: FakeClock) -> SimBridge {
    let h = sim.handles();
    let hw = BridgeHardware {
        mem_tx: h.mem_tx,
        mem_rx: h.mem_rx,
        cfg_tx: h.cfg_tx,
        cfg_rx: h.cfg_rx,
        identity: h.identity,
        staging: h.staging,
    };
    Bridge::new(hw, clock, BridgeConfig::default()).unwrap()
}

pub fn setup() -> (SimHardware, SimBridge, FakeClock) {
    setup_with(SimConfig::default())
}

pub fn setup_with(config: SimConfig) -> (SimHardware, SimBridge, FakeClock) {
    let sim = SimHardware::new(config);
    let clock = FakeClock::with_auto_advance(POLL_STEP);
    let bridge = bridge_on(&sim, clock.clone());
    (sim, bridge, clock)
}

/// Decoded fields of a logged memory read request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggedRead {
    pub tag: u8,
    pub address: u64,
    pub length_dw: u32,
}

pub fn logged_reads(sim: &SimHardware) -> Vec<LoggedRead> {
    sim.mem_tx_log()
        .iter()
        .filter(|tlp| tlp[0] >> 24 == 0x20)
        .map(|tlp| LoggedRead {
            tag: (tlp[1] >> 8) as u8,
            address: (u64::from(tlp[2]) << 32) | u64::from(tlp[3]),
            length_dw: tlp[0] & 0x3ff,
        })
        .collect()
}
