mod common;

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use proptest::prelude::*;
use tlp_bridge::BridgeError;
use tlp_bridge_sim::{SimConfig, SimHardware};

use common::{bridge_on, logged_reads, setup, LoggedRead, SimBridge};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn bridge_can_be_shared_between_threads() {
    assert_send_sync::<SimBridge>();

    let (sim, bridge, _clock) = setup();
    std::thread::scope(|s| {
        for t in 0..4u8 {
            let bridge = &bridge;
            s.spawn(move || {
                let address = 0x1_0000 * u64::from(t + 1);
                let data = [t; 64];
                bridge.write(address, &data).unwrap();
                let mut back = [0; 64];
                bridge.read(address, &mut back).unwrap();
                assert_eq!(back, data);
            });
        }
    });
    assert_eq!(sim.pending_completions(), 0);
}

#[test]
fn written_bytes_land_in_endpoint_memory_in_order() {
    let (sim, bridge, _clock) = setup();
    bridge
        .write(0x8000_0000, &[0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04])
        .unwrap();
    assert_eq!(
        sim.peek(0x8000_0000, 8),
        [0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04]
    );

    // One posted MWr64 per dword.
    let log = sim.mem_tx_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0], [0x6000_0001, 0x0100_00ff, 0, 0x8000_0000, 0xdead_beef]);
    assert_eq!(log[1], [0x6000_0001, 0x0100_00ff, 0, 0x8000_0004, 0x0102_0304]);
}

#[test]
fn last_dword_of_the_address_space_is_reachable() {
    let (sim, bridge, _clock) = setup();
    sim.poke(u64::MAX - 3, &[0x10, 0x20, 0x30, 0x40]);

    let mut buf = [0; 4];
    bridge.read(u64::MAX - 3, &mut buf).unwrap();
    assert_eq!(buf, [0x10, 0x20, 0x30, 0x40]);
    assert_eq!(
        logged_reads(&sim),
        [LoggedRead {
            tag: 0,
            address: u64::MAX - 3,
            length_dw: 1
        }]
    );

    bridge.write(u64::MAX - 3, &[1, 2, 3, 4]).unwrap();
    assert_eq!(sim.peek(u64::MAX - 3, 4), [1, 2, 3, 4]);

    // The lock is still usable afterwards.
    assert_eq!(bridge.next_tag(), 1);
}

#[test]
fn byte_access_accepts_the_same_top_range_as_aligned_access() {
    let (sim, bridge, _clock) = setup();
    sim.poke(u64::MAX - 3, &[0x10, 0x20, 0x30, 0x40]);

    let mut buf = [0; 4];
    bridge.read_bytes(u64::MAX - 3, &mut buf).unwrap();
    assert_eq!(buf, [0x10, 0x20, 0x30, 0x40]);

    let mut tail = [0; 2];
    bridge.read_bytes(u64::MAX - 1, &mut tail).unwrap();
    assert_eq!(tail, [0x30, 0x40]);

    bridge.write_bytes(u64::MAX, &[0xff]).unwrap();
    assert_eq!(sim.peek(u64::MAX - 3, 4), [0x10, 0x20, 0x30, 0xff]);

    assert!(matches!(
        bridge.read_bytes(u64::MAX - 1, &mut [0; 4]),
        Err(BridgeError::InvalidArgument(_))
    ));
}

#[test]
fn sub_dword_writes_preserve_neighbouring_bytes() {
    let (sim, bridge, _clock) = setup();
    sim.poke(0x100, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);

    bridge.write_bytes(0x101, &[0xaa, 0xbb]).unwrap();
    assert_eq!(sim.peek(0x100, 4), [0, 0xaa, 0xbb, 3]);

    bridge.write_bytes(0x103, &[0xc0, 0xc1, 0xc2, 0xc3, 0xc4, 0xc5]).unwrap();
    assert_eq!(
        sim.peek(0x100, 12),
        [0, 0xaa, 0xbb, 0xc0, 0xc1, 0xc2, 0xc3, 0xc4, 0xc5, 9, 10, 11]
    );

    let mut buf = [0; 5];
    bridge.read_bytes(0x102, &mut buf).unwrap();
    assert_eq!(buf, [0xbb, 0xc0, 0xc1, 0xc2, 0xc3]);

    // Empty accesses touch nothing.
    let before = sim.mem_tx_log().len();
    bridge.write_bytes(0x105, &[]).unwrap();
    bridge.read_bytes(0x105, &mut []).unwrap();
    assert_eq!(sim.mem_tx_log().len(), before);
}

#[test]
fn memory_window_reads_writes_and_seeks() {
    let (sim, bridge, _clock) = setup();
    let mut window = bridge.window();

    assert_eq!(window.seek(SeekFrom::Start(0x2001)).unwrap(), 0x2001);
    window.write_all(b"hello").unwrap();
    assert_eq!(window.position(), 0x2006);
    assert_eq!(sim.peek(0x2001, 5), b"hello");

    assert_eq!(window.seek(SeekFrom::Current(-5)).unwrap(), 0x2001);
    let mut buf = [0; 5];
    window.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"hello");

    let err = window.seek(SeekFrom::End(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    window.seek(SeekFrom::Start(2)).unwrap();
    let err = window.seek(SeekFrom::Current(-3)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(window.position(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn write_then_read_returns_the_same_bytes(
        dword_address in 0u64..(1 << 38),
        data in prop::collection::vec(any::<[u8; 4]>(), 1..160),
        split_dwords in 1usize..20,
    ) {
        let address = dword_address * 4;
        let data: Vec<u8> = data.concat();

        let sim = SimHardware::new(SimConfig { split_dwords, ..SimConfig::default() });
        let bridge = bridge_on(&sim, tlp_bridge::FakeClock::with_auto_advance(common::POLL_STEP));

        bridge.write(address, &data).unwrap();
        let mut back = vec![0; data.len()];
        bridge.read(address, &mut back).unwrap();

        prop_assert_eq!(&back, &data);
        prop_assert_eq!(sim.peek(address, data.len()), data);
    }
}
