use std::time::Duration;

use axi_dma::{Direction, DmaChannel, DmaConfig, DmaError, DmaMemory, DmaStatus, FakeClock};
use pcie_tlp::{wire, Completion, MemReadRequest, RequesterId};
use tlp_bridge_sim::{SimChannel, SimConfig, SimHardware, SimRegisters};

const STAGING: u64 = 0x3000_0000;
const PAGE: u32 = 4096;

fn channel(
    name: &'static str,
    direction: Direction,
    regs: SimRegisters,
) -> DmaChannel<SimRegisters> {
    DmaChannel::new(name, direction, regs, DmaConfig::default())
}

fn clock() -> FakeClock {
    FakeClock::with_auto_advance(Duration::from_millis(1))
}

#[test]
fn read_request_is_answered_through_real_channels() {
    let sim = SimHardware::new(SimConfig::default());
    sim.poke(0x1000, &[0xaa, 0xbb, 0xcc, 0xdd, 0x11, 0x22, 0x33, 0x44]);
    let h = sim.handles();
    let mut staging = h.staging;
    let mut tx = channel("mem_tx", Direction::Transmit, h.mem_tx);
    let mut rx = channel("mem_rx", Direction::Receive, h.mem_rx);
    let clock = clock();
    tx.reset(&clock).unwrap();
    rx.reset(&clock).unwrap();

    let request = MemReadRequest {
        requester: RequesterId::new(1, 0, 0),
        tag: 5,
        address: 0x1000,
        length_dw: 2,
    };
    for (i, word) in request.encode().iter().enumerate() {
        staging.write_word(i, *word);
    }
    tx.transfer(&clock, STAGING, 16).unwrap();
    assert_eq!(sim.mem_tx_log(), vec![request.encode().to_vec()]);
    assert_eq!(sim.pending_completions(), 1);

    rx.transfer(&clock, STAGING + u64::from(PAGE), PAGE).unwrap();
    assert_eq!(rx.transferred_len(), 20);

    let first = PAGE as usize / 4;
    let words: Vec<u32> = (first..first + 5).map(|i| staging.read_word(i)).collect();
    let completion = Completion::parse(&words).unwrap();
    assert_eq!(completion.tag, 5);
    assert_eq!(completion.requester, RequesterId::new(1, 0, 0));
    assert_eq!(completion.byte_count, 8);
    assert_eq!(
        completion.payload(),
        &[
            wire::encode_payload([0xaa, 0xbb, 0xcc, 0xdd]),
            wire::encode_payload([0x11, 0x22, 0x33, 0x44]),
        ]
    );
}

#[test]
fn stalled_receive_times_out_with_one_forced_reset() {
    let sim = SimHardware::new(SimConfig::default());
    let mut rx = channel("mem_rx", Direction::Receive, sim.handles().mem_rx);
    let clock = clock();
    rx.reset(&clock).unwrap();
    sim.set_stalled(SimChannel::MemRx, true);

    let err = rx
        .transfer(&clock, STAGING + u64::from(PAGE), PAGE)
        .unwrap_err();
    assert!(matches!(err, DmaError::Timeout { channel: "mem_rx", .. }));
    assert_eq!(sim.resets(SimChannel::MemRx), 2);
    assert_eq!(sim.transfers(SimChannel::MemRx), 1);
}

#[test]
fn injected_error_bits_surface_as_a_hardware_fault() {
    let sim = SimHardware::new(SimConfig::default());
    let mut tx = channel("mem_tx", Direction::Transmit, sim.handles().mem_tx);
    let clock = clock();
    tx.reset(&clock).unwrap();
    sim.set_error_bits(SimChannel::MemTx, DmaStatus::ERR_DEC);

    match tx.transfer(&clock, STAGING, 16) {
        Err(DmaError::HardwareFault { channel, status }) => {
            assert_eq!(channel, "mem_tx");
            assert!(status.contains(DmaStatus::ERR_DEC));
        }
        other => panic!("expected a hardware fault, got {other:?}"),
    }
    assert_eq!(sim.resets(SimChannel::MemTx), 2);
    assert!(sim.mem_tx_log().is_empty());
}

#[test]
fn bus_address_outside_staging_memory_is_a_slave_error() {
    let sim = SimHardware::new(SimConfig::default());
    let mut tx = channel("mem_tx", Direction::Transmit, sim.handles().mem_tx);
    let clock = clock();
    tx.reset(&clock).unwrap();

    match tx.transfer(&clock, 0x1000, 16) {
        Err(DmaError::HardwareFault { status, .. }) => {
            assert!(status.contains(DmaStatus::ERR_SLV));
        }
        other => panic!("expected a hardware fault, got {other:?}"),
    }
}
