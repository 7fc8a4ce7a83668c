//! Integration tests for the sent packet handler
//!
//! Each test drives the public handler API the way a connection layer would:
//! record sends, feed ack frames, poll for retransmissions.

use bytes::Bytes;
use std::time::Duration;
use ugo::io::{Clock, ManualClock};
use ugo::protocol::{AckRange, HandlerStats, RenoSender, SharedRttStats};
use ugo::{AckFrame, HandlerConfig, HandlerError, Packet, SentPacketHandler};

type TestHandler = SentPacketHandler<RenoSender, SharedRttStats, ManualClock>;

fn payload(len: usize) -> Bytes {
    Bytes::from(vec![0xAB; len])
}

fn handler_with_clock() -> (TestHandler, ManualClock) {
    let clock = ManualClock::new();
    let handler = SentPacketHandler::with_clock(HandlerConfig::default(), clock.clone());
    (handler, clock)
}

fn send_range(handler: &mut TestHandler, numbers: std::ops::RangeInclusive<u32>) {
    for number in numbers {
        handler
            .sent(Packet::trackable(number, payload(100)))
            .unwrap();
    }
}

#[test]
fn test_full_ack_clears_flight() {
    let (mut handler, clock) = handler_with_clock();
    send_range(&mut handler, 1..=5);
    assert_eq!(handler.bytes_in_flight(), 500);

    clock.advance(Duration::from_millis(30));
    let frame = AckFrame::new(1, 5).with_ranges(vec![AckRange::new(1, 5)]);
    handler.received_ack(&frame, 1).unwrap();

    assert_eq!(handler.bytes_in_flight(), 0);
    assert_eq!(handler.largest_in_order_acked(), 5);
    assert_eq!(handler.largest_acked(), 5);
    assert_eq!(handler.stop_waiting_boundary(), 6);
    assert_eq!(handler.smoothed_rtt(), Duration::from_millis(30));
}

#[test]
fn test_gap_is_nacked_and_rest_acked() {
    let (mut handler, _clock) = handler_with_clock();
    send_range(&mut handler, 1..=4);

    let frame = AckFrame::new(1, 4)
        .with_ranges(vec![AckRange::new(3, 4), AckRange::new(1, 1)]);
    handler.received_ack(&frame, 1).unwrap();

    assert_eq!(handler.bytes_in_flight(), 100);
    assert_eq!(handler.largest_in_order_acked(), 1);
    assert_eq!(handler.stats().queued_retransmissions, 0);
    assert!(!handler.probably_has_packet_for_retransmission());
}

#[test]
fn test_fourth_missing_report_fast_retransmits() {
    let (mut handler, _clock) = handler_with_clock();
    send_range(&mut handler, 1..=7);

    for (sequence, largest) in (4..=7).enumerate() {
        let frame = AckFrame::new(1, largest)
            .with_ranges(vec![AckRange::new(3, largest), AckRange::new(1, 1)]);
        handler.received_ack(&frame, sequence as u32 + 1).unwrap();

        let queued = handler.stats().queued_retransmissions;
        if largest < 7 {
            assert_eq!(queued, 0, "queued after ack for {}", largest);
        } else {
            assert_eq!(queued, 1);
        }
    }

    let stats = handler.stats();
    assert_eq!(stats.fast_retransmits, 1);
    assert_eq!(stats.bytes_in_flight, 0);
    assert_eq!(handler.largest_in_order_acked(), 7);

    let packet = handler.dequeue_for_retransmission().unwrap();
    assert_eq!(packet.number, 2);
    assert_eq!(packet.payload, payload(100));
    assert!(handler.dequeue_for_retransmission().is_none());
}

#[test]
fn test_too_many_tracked_packets() {
    let (mut handler, _clock) = handler_with_clock();
    send_range(&mut handler, 1..=2000);
    assert!(handler.check_for_error().is_ok());

    send_range(&mut handler, 2001..=2001);
    assert_eq!(
        handler.check_for_error(),
        Err(HandlerError::TooManyTrackedPackets(2001))
    );
}

#[test]
fn test_duplicate_ack_sequence_rejected() {
    let (mut handler, _clock) = handler_with_clock();
    send_range(&mut handler, 1..=3);

    handler.received_ack(&AckFrame::new(1, 2), 5).unwrap();
    assert_eq!(handler.bytes_in_flight(), 100);

    let err = handler.received_ack(&AckFrame::new(1, 3), 5).unwrap_err();
    assert_eq!(
        err,
        HandlerError::DuplicateOrOutOfOrderAck {
            sequence: 5,
            last_seen: 5
        }
    );
    assert!(!err.is_fatal());
    assert_eq!(handler.bytes_in_flight(), 100);

    assert!(handler.received_ack(&AckFrame::new(1, 3), 4).is_err());

    // Sequence zero skips the check
    handler.received_ack(&AckFrame::new(1, 3), 0).unwrap();
    assert_eq!(handler.bytes_in_flight(), 0);
}

#[test]
fn test_stale_ack_is_idempotent() {
    let (mut handler, _clock) = handler_with_clock();
    send_range(&mut handler, 1..=3);

    handler.received_ack(&AckFrame::new(1, 3), 1).unwrap();
    let before: HandlerStats = handler.stats();

    handler.received_ack(&AckFrame::new(1, 3), 2).unwrap();
    handler.received_ack(&AckFrame::new(1, 2), 3).unwrap();
    assert_eq!(handler.stats(), before);
}

#[test]
fn test_ack_for_unsent_packet() {
    let (mut handler, _clock) = handler_with_clock();
    send_range(&mut handler, 1..=3);

    let err = handler.received_ack(&AckFrame::new(1, 10), 1).unwrap_err();
    assert_eq!(
        err,
        HandlerError::AckForUnsentPacket {
            largest_acked: 10,
            last_sent: 3
        }
    );
    assert!(err.is_fatal());
    assert_eq!(handler.bytes_in_flight(), 300);
}

#[test]
fn test_retransmission_timeout() {
    let (mut handler, clock) = handler_with_clock();
    let start = clock.now();
    send_range(&mut handler, 1..=3);

    assert_eq!(
        handler.time_of_first_rto(),
        Some(start + Duration::from_millis(500))
    );

    clock.advance(Duration::from_millis(499));
    assert!(!handler.probably_has_packet_for_retransmission());

    // Each poll past the deadline declares one more loss
    clock.advance(Duration::from_millis(1));
    let packet = handler.dequeue_for_retransmission().unwrap();
    assert_eq!(packet.number, 1);

    let stats = handler.stats();
    assert_eq!(stats.timeout_retransmits, 1);
    assert_eq!(stats.bytes_in_flight, 200);
    assert_eq!(stats.largest_in_order_acked, 1);
    assert_eq!(handler.congestion_window(), 2 * 1350);
}

#[test]
fn test_timeout_moves_in_order_past_largest_acked() {
    let (mut handler, clock) = handler_with_clock();
    send_range(&mut handler, 1..=4);

    let frame = AckFrame::new(1, 2).with_ranges(vec![AckRange::new(2, 2)]);
    handler.received_ack(&frame, 1).unwrap();
    assert_eq!(handler.largest_acked(), 2);
    assert_eq!(handler.largest_in_order_acked(), 0);

    // Packet 1 times out, which resolves 1 and skips the acked 2
    clock.advance(Duration::from_millis(500));
    assert_eq!(handler.dequeue_for_retransmission().unwrap().number, 1);
    assert_eq!(handler.largest_in_order_acked(), 2);

    // The next timeout resolves 3, which nobody acknowledged
    assert_eq!(handler.dequeue_for_retransmission().unwrap().number, 3);
    assert_eq!(handler.largest_in_order_acked(), 3);
    assert_eq!(handler.largest_acked(), 2);
    assert_eq!(handler.stop_waiting_boundary(), 4);
}

#[test]
fn test_belated_ack_cancels_retransmission() {
    let (mut handler, clock) = handler_with_clock();
    send_range(&mut handler, 1..=3);

    clock.advance(Duration::from_millis(500));
    assert!(handler.probably_has_packet_for_retransmission());
    assert_eq!(handler.bytes_in_flight(), 200);

    handler.received_ack(&AckFrame::new(1, 3), 1).unwrap();

    assert_eq!(handler.bytes_in_flight(), 0);
    assert_eq!(handler.largest_in_order_acked(), 3);
    assert!(handler.dequeue_for_retransmission().is_none());
    assert_eq!(handler.stats().total_acked, 200);
}

#[test]
fn test_control_packets_take_numbers_but_no_bytes() {
    let (mut handler, _clock) = handler_with_clock();

    handler.sent(Packet::control(1)).unwrap();
    handler.sent(Packet::trackable(2, payload(100))).unwrap();
    assert_eq!(handler.bytes_in_flight(), 100);
    assert_eq!(handler.last_sent_packet_number(), 2);

    handler.received_ack(&AckFrame::new(1, 2), 1).unwrap();
    assert_eq!(handler.bytes_in_flight(), 0);
    assert_eq!(handler.largest_in_order_acked(), 2);
}

#[test]
fn test_send_errors() {
    let (mut handler, _clock) = handler_with_clock();
    handler.sent(Packet::trackable(1, payload(10))).unwrap();

    assert_eq!(
        handler.sent(Packet::trackable(1, payload(10))),
        Err(HandlerError::DuplicatePacketNumber(1))
    );
    assert_eq!(
        handler.sent(Packet::trackable(2, Bytes::new())),
        Err(HandlerError::EmptyPacket(2))
    );
    assert_eq!(handler.bytes_in_flight(), 10);
}

#[test]
fn test_congestion_gate_opens_after_ack() {
    let (mut handler, _clock) = handler_with_clock();
    let window = handler.congestion_window() as usize;

    let mut number = 0;
    while handler.congestion_allows_sending() {
        number += 1;
        handler.sent(Packet::trackable(number, payload(1000))).unwrap();
    }
    assert!(handler.bytes_in_flight() as usize > window);

    handler.received_ack(&AckFrame::new(1, number), 1).unwrap();
    assert!(handler.congestion_allows_sending());
    assert!(handler.congestion_window() as usize > window);
}
