mod common;

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::time::Duration;

use axi_dma::DmaStatus;
use pcie_tlp::Completion;
use tlp_bridge::{BridgeError, DmaConfig};
use tlp_bridge_sim::SimChannel;

use common::setup;

#[test]
fn channels_are_reset_when_the_bridge_is_opened() {
    let (sim, bridge, _clock) = setup();
    for channel in SimChannel::ALL {
        assert_eq!(sim.resets(channel), 1, "{channel:?}");
    }

    bridge.reset().unwrap();
    for channel in SimChannel::ALL {
        assert_eq!(sim.resets(channel), 2, "{channel:?}");
    }
}

#[test]
fn hardware_fault_aborts_and_leaves_the_cursor_alone() {
    let (sim, bridge, _clock) = setup();
    sim.set_error_bits(SimChannel::MemTx, DmaStatus::ERR_SLV);

    let mut window = bridge.window();
    window.seek(SeekFrom::Start(0x4000)).unwrap();
    let err = window.write(&[1, 2, 3, 4]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert_eq!(window.position(), 0x4000);

    assert_eq!(
        bridge.write(0x4000, &[1, 2, 3, 4]),
        Err(BridgeError::HardwareFault {
            channel: "mem_tx",
            status: (DmaStatus::IDLE | DmaStatus::ERR_SLV).bits(),
        })
    );
    // Opening reset, then one per fault.
    assert_eq!(sim.resets(SimChannel::MemTx), 3);
    assert_eq!(sim.peek(0x4000, 4), [0, 0, 0, 0]);

    // Clearing the fault makes the same channel usable again without intervention.
    sim.set_error_bits(SimChannel::MemTx, DmaStatus::empty());
    window.write_all(&[1, 2, 3, 4]).unwrap();
    assert_eq!(window.position(), 0x4004);
}

#[test]
fn every_error_bit_is_a_hardware_fault() {
    for bit in [DmaStatus::ERR_INT, DmaStatus::ERR_SLV, DmaStatus::ERR_DEC] {
        let (sim, bridge, _clock) = setup();
        sim.set_error_bits(SimChannel::MemRx, bit);
        let mut buf = [0; 4];
        assert!(matches!(
            bridge.read(0, &mut buf),
            Err(BridgeError::HardwareFault { channel: "mem_rx", status }) if status & bit.bits() != 0
        ));
    }
}

#[test]
fn stalled_receive_times_out_after_exactly_one_reset() {
    let (sim, bridge, clock) = setup();
    sim.set_stalled(SimChannel::MemRx, true);

    let mut window = bridge.window();
    let mut buf = [0; 8];
    let err = window.read(&mut buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TimedOut);
    assert_eq!(window.position(), 0);

    assert_eq!(sim.resets(SimChannel::MemRx), 2);
    assert_eq!(sim.resets(SimChannel::MemTx), 1);
    assert!(clock.peek() > DmaConfig::DEFAULT_TIMEOUT);

    // The channel that timed out is ready for the next caller, which finds the late answer.
    sim.set_stalled(SimChannel::MemRx, false);
    let late = bridge.receive_raw().unwrap();
    assert_eq!(Completion::parse(&late).unwrap().tag, 0);
    bridge.read(0x10, &mut buf).unwrap();
}

#[test]
fn stalled_transmit_reports_timeout_on_that_channel() {
    let (sim, bridge, clock) = setup();
    sim.set_stalled(SimChannel::MemTx, true);
    let before = clock.peek();

    assert_eq!(
        bridge.write(0, &[0; 4]),
        Err(BridgeError::Timeout { channel: "mem_tx" })
    );
    assert_eq!(sim.resets(SimChannel::MemTx), 2);
    let waited = clock.peek() - before;
    assert!(waited > Duration::from_secs(1) && waited < Duration::from_millis(1100));
}

#[test]
fn unenumerated_endpoint_fails_fast_without_traffic() {
    let (sim, bridge, _clock) = setup();
    sim.set_identity(0);

    let mut buf = [0; 4];
    assert_eq!(bridge.read(0, &mut buf), Err(BridgeError::NotConnected));
    assert_eq!(bridge.write(0, &buf), Err(BridgeError::NotConnected));
    assert_eq!(bridge.config_read(0), Err(BridgeError::NotConnected));
    assert_eq!(bridge.device_id(), 0);
    assert!(sim.mem_tx_log().is_empty());
    assert!(sim.cfg_tx_log().is_empty());
    assert_eq!(bridge.next_tag(), 0);

    sim.set_identity(0x0001_0108);
    assert_eq!(bridge.device_id(), 0x0001_0108);
    assert_eq!(bridge.requester_id().unwrap().to_string(), "01:01.0");
}

#[test]
fn misaligned_access_is_rejected_before_anything_else() {
    let (sim, bridge, _clock) = setup();
    sim.set_identity(0);

    let mut buf = [0; 6];
    assert!(matches!(
        bridge.read(0x1000, &mut buf),
        Err(BridgeError::InvalidArgument(_))
    ));
    assert!(matches!(
        bridge.write(0x1002, &[0; 4]),
        Err(BridgeError::InvalidArgument(_))
    ));
    assert!(matches!(
        bridge.read(0x1000, &mut []),
        Err(BridgeError::InvalidArgument(_))
    ));
    assert!(sim.mem_tx_log().is_empty());
}
