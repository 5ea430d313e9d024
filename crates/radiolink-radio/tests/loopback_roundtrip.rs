use std::sync::mpsc;
use std::time::{Duration, Instant};

use radiolink_frame::{decode_message, Frame, Message, HEADER_SIZE};
use radiolink_hal::{Ether, LoopbackRadio, RadioDevice};
use radiolink_radio::{Radio, RadioConfig};

const WAIT: Duration = Duration::from_secs(2);

fn pair(ether: &Ether) -> (Radio<LoopbackRadio>, Radio<LoopbackRadio>) {
    pair_with(ether, RadioConfig::default())
}

fn pair_with(
    ether: &Ether,
    rx_config: RadioConfig,
) -> (Radio<LoopbackRadio>, Radio<LoopbackRadio>) {
    let mut tx = Radio::new(ether.attach(), RadioConfig::default()).expect("tx radio");
    let mut rx = Radio::new(ether.attach(), rx_config).expect("rx radio");
    tx.enable().expect("tx enable");
    rx.enable().expect("rx enable");
    (tx, rx)
}

/// Poll until `n` frames have been committed by the receive loop.
fn await_committed(radio: &Radio<LoopbackRadio>, n: u64) {
    let deadline = Instant::now() + WAIT;
    while radio.stats().committed < n {
        assert!(Instant::now() < deadline, "timed out: {:?}", radio.stats());
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn int_round_trip() {
    let ether = Ether::new();
    let (tx, mut rx) = pair(&ether);
    let (seen_tx, seen) = mpsc::channel();
    rx.on_int(move |v| {
        let _ = seen_tx.send(v);
    });

    tx.send_number(42).expect("send");

    assert!(rx.wait_for(WAIT));
    assert_eq!(seen.try_recv().expect("int handler should run"), 42);
    assert_eq!(rx.rssi(), -40);
}

#[test]
fn string_round_trip() {
    let ether = Ether::new();
    let (tx, mut rx) = pair(&ether);
    let (seen_tx, seen) = mpsc::channel();
    rx.on_string(move |text| {
        let _ = seen_tx.send(text.to_string());
    });

    tx.send_string("hi").expect("send");

    assert!(rx.wait_for(WAIT));
    assert_eq!(seen.try_recv().expect("string handler should run"), "hi");
}

#[test]
fn keyed_double_round_trip() {
    let ether = Ether::new();
    let (tx, mut rx) = pair(&ether);
    let (seen_tx, seen) = mpsc::channel();
    rx.on_keyed_double(move |value, key| {
        let _ = seen_tx.send((value, key.to_string()));
    });

    tx.send_keyed("k", 3.5).expect("send");

    assert!(rx.wait_for(WAIT));
    assert_eq!(
        seen.try_recv().expect("keyed handler should run"),
        (3.5, "k".to_string())
    );
}

#[test]
fn unknown_tag_only_reaches_fallback() {
    let ether = Ether::new();
    let (tx, mut rx) = pair(&ether);
    let (typed_tx, typed) = mpsc::channel::<&'static str>();
    let (unknown_tx, unknown) = mpsc::channel();

    let t = typed_tx.clone();
    rx.on_int(move |_| {
        let _ = t.send("int");
    });
    let t = typed_tx.clone();
    rx.on_double(move |_| {
        let _ = t.send("double");
    });
    let t = typed_tx.clone();
    rx.on_string(move |_| {
        let _ = t.send("string");
    });
    let t = typed_tx.clone();
    rx.on_keyed_int(move |_, _| {
        let _ = t.send("keyed_int");
    });
    rx.on_keyed_double(move |_, _| {
        let _ = typed_tx.send("keyed_double");
    });
    rx.on_unknown(move |frame| {
        let _ = unknown_tx.send(frame.payload()[0]);
    });

    let mut frame = Frame::new(0);
    frame.payload_mut()[0] = 99;
    frame.set_payload_len(1).expect("payload length should fit");
    tx.send(&mut frame).expect("raw send");

    assert!(rx.wait_for(WAIT));
    assert_eq!(unknown.try_recv().expect("fallback should run"), 99);
    assert!(typed.try_recv().is_err());
    assert_eq!(rx.stats().fallback, 1);
}

#[test]
fn fifo_across_the_air() {
    let ether = Ether::new();
    let (tx, mut rx) = pair(&ether);

    for n in 0..8 {
        tx.send_number(n).expect("send");
    }
    await_committed(&rx, 8);

    let (seen_tx, seen) = mpsc::channel();
    rx.on_int(move |v| {
        let _ = seen_tx.send(v);
    });
    assert_eq!(rx.poll(), 8);
    assert_eq!(seen.try_iter().collect::<Vec<_>>(), (0..8).collect::<Vec<_>>());
}

#[test]
fn pool_exhaustion_drops_without_stalling() {
    let ether = Ether::new();
    let config = RadioConfig {
        rx_buffers: 3,
        ..RadioConfig::default()
    };
    let (tx, mut rx) = pair_with(&ether, config);

    for n in 0..6 {
        tx.send_number(n).expect("send");
    }

    let deadline = Instant::now() + WAIT;
    loop {
        let stats = rx.stats();
        if stats.committed + stats.dropped_pool_exhausted >= 6 {
            break;
        }
        assert!(Instant::now() < deadline, "timed out: {stats:?}");
        std::thread::sleep(Duration::from_millis(2));
    }

    let stats = rx.stats();
    assert_eq!(stats.committed, 3);
    assert_eq!(stats.dropped_pool_exhausted, 3);
    assert_eq!(stats.queued, 3);
    assert_eq!(stats.free_buffers, 0);

    let mut values = Vec::new();
    rx.handle_queue(|frame| match decode_message(frame) {
        Ok(Message::Int { value }) => values.push(value),
        other => panic!("unexpected {other:?}"),
    });
    assert_eq!(values, [0, 1, 2]);

    // The receive loop is parked on a scratch buffer; the next frame must
    // still land in one of the buffers the drain just freed.
    tx.send_number(7).expect("send");
    await_committed(&rx, 4);
    let stats = rx.stats();
    assert_eq!(stats.dropped_pool_exhausted, 3);
    assert_eq!(stats.received, 7);

    let mut values = Vec::new();
    rx.handle_queue(|frame| {
        if let Ok(Message::Int { value }) = decode_message(frame) {
            values.push(value);
        }
    });
    assert_eq!(values, [7]);
}

#[test]
fn frames_after_exhaustion_recover_every_buffer() {
    let ether = Ether::new();
    let config = RadioConfig {
        rx_buffers: 2,
        ..RadioConfig::default()
    };
    let (tx, mut rx) = pair_with(&ether, config);

    for round in 0..3 {
        let base = round * 10;
        for n in 0..3 {
            tx.send_number(base + n).expect("send");
        }
        let deadline = Instant::now() + WAIT;
        loop {
            let stats = rx.stats();
            if stats.committed + stats.dropped_pool_exhausted >= 3 * (round as u64 + 1) {
                break;
            }
            assert!(Instant::now() < deadline, "timed out: {stats:?}");
            std::thread::sleep(Duration::from_millis(2));
        }

        let mut values = Vec::new();
        rx.handle_queue(|frame| {
            if let Ok(Message::Int { value }) = decode_message(frame) {
                values.push(value);
            }
        });
        assert_eq!(values, [base, base + 1], "round {round}");
    }
    assert_eq!(rx.stats().dropped_pool_exhausted, 3);
}

#[test]
fn foreign_group_is_filtered() {
    let ether = Ether::new();
    let (mut tx, mut rx) = pair(&ether);
    tx.set_group(5).expect("set group");

    tx.send_number(1).expect("send");

    let deadline = Instant::now() + WAIT;
    while rx.stats().dropped_foreign_group < 1 {
        assert!(Instant::now() < deadline, "timed out: {:?}", rx.stats());
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(!rx.wait_for(Duration::from_millis(20)));
    assert_eq!(rx.stats().committed, 0);
}

#[test]
fn unfiltered_radio_hears_all_groups() {
    let ether = Ether::new();
    let config = RadioConfig {
        filter_group: false,
        ..RadioConfig::default()
    };
    let (mut tx, mut rx) = pair_with(&ether, config);
    tx.set_group(5).expect("set group");

    tx.send_number(1).expect("send");

    let mut groups = Vec::new();
    await_committed(&rx, 1);
    rx.handle_queue(|frame| groups.push(frame.group()));
    assert_eq!(groups, [5]);
}

#[test]
fn truncated_reception_counted_as_malformed() {
    let ether = Ether::new();
    let (_tx, rx) = pair(&ether);

    // Length claims 10 bytes follow, but only the header arrives.
    ether.inject(7, &[10, 1, 111, 1], -50);

    let deadline = Instant::now() + WAIT;
    while rx.stats().dropped_malformed < 1 {
        assert!(Instant::now() < deadline, "timed out: {:?}", rx.stats());
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(rx.stats().committed, 0);
}

#[test]
fn disable_keeps_queued_frames_and_reenables() {
    let ether = Ether::new();
    let (tx, mut rx) = pair(&ether);

    tx.send_number(1).expect("send");
    await_committed(&rx, 1);

    rx.disable().expect("disable");
    assert!(!rx.device().is_enabled());
    assert_eq!(rx.pending(), 1);
    assert_eq!(rx.poll(), 1);

    rx.enable().expect("re-enable");
    tx.send_number(2).expect("send");
    await_committed(&rx, 2);
    assert_eq!(rx.pending(), 1);
}

#[test]
fn band_change_isolates_radios() {
    let ether = Ether::new();
    let (tx, mut rx) = pair(&ether);
    rx.set_frequency_band(50).expect("band 50");

    tx.send_number(1).expect("send");
    assert!(!rx.wait_for(Duration::from_millis(100)));
    assert_eq!(rx.stats().received, 0);
}

#[test]
fn rssi_tracks_sender_power() {
    let ether = Ether::new();
    let (mut tx, mut rx) = pair(&ether);
    tx.set_transmit_power(4).expect("power 4");

    tx.send_number(1).expect("send");
    assert!(rx.wait_for(WAIT));
    assert_eq!(rx.rssi(), -58);
}

#[test]
fn frame_sizes_on_the_air() {
    let ether = Ether::new();
    let (tx, mut rx) = pair(&ether);

    tx.send_keyed("temperature", 21).expect("send");
    await_committed(&rx, 1);

    let mut sizes = Vec::new();
    rx.handle_queue(|frame| sizes.push(frame.wire_size()));
    // tag + i32 + key length + key
    assert_eq!(sizes, [HEADER_SIZE + 1 + 4 + 1 + 11]);
}
