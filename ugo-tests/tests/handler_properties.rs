//! Property-based tests for sent packet accounting
//!
//! These tests use proptest to drive the tracker and the handler through
//! random sequences of sends, acks, timeouts and retransmissions, checking
//! the accounting invariants after every step.

use bytes::Bytes;
use proptest::prelude::*;
use std::time::Duration;
use ugo::io::{ManualClock, Timestamp};
use ugo::protocol::{AckRange, PacketNumber, RenoSender, SentPacketTracker, SharedRttStats};
use ugo::{AckFrame, HandlerConfig, Packet, SentPacketHandler};

type TestHandler = SentPacketHandler<RenoSender, SharedRttStats, ManualClock>;

// Property test strategies

#[derive(Debug, Clone)]
enum TrackerOp {
    Send(u32),
    Ack(u32),
    Queue(u32),
    Dequeue,
}

fn tracker_op_strategy() -> impl Strategy<Value = TrackerOp> {
    prop_oneof![
        4 => (1u32..=1500).prop_map(TrackerOp::Send),
        3 => (1u32..=64).prop_map(TrackerOp::Ack),
        2 => (1u32..=64).prop_map(TrackerOp::Queue),
        1 => Just(TrackerOp::Dequeue),
    ]
}

#[derive(Debug, Clone)]
enum HandlerOp {
    Send(usize),
    /// Ack the current window; the mask marks which numbers arrived
    Ack(Vec<bool>),
    Advance(u64),
    Dequeue,
}

fn handler_op_strategy() -> impl Strategy<Value = HandlerOp> {
    prop_oneof![
        5 => (1usize..=1400).prop_map(HandlerOp::Send),
        3 => prop::collection::vec(any::<bool>(), 1..8).prop_map(HandlerOp::Ack),
        1 => (1u64..=400).prop_map(HandlerOp::Advance),
        2 => Just(HandlerOp::Dequeue),
    ]
}

/// Received numbers in `first..=last` as descending ranges
fn ranges_from_mask(first: PacketNumber, last: PacketNumber, mask: &[bool]) -> Vec<AckRange> {
    let mut ranges: Vec<AckRange> = Vec::new();
    for number in first..=last {
        let received = number == last || mask[(number - first) as usize % mask.len()];
        if !received {
            continue;
        }
        match ranges.last_mut() {
            Some(range) if range.last + 1 == number => range.last = number,
            _ => ranges.push(AckRange::single(number)),
        }
    }
    ranges.reverse();
    ranges
}

fn outstanding_bytes(tracker: &SentPacketTracker) -> u32 {
    (1..=tracker.last_sent_packet_number())
        .filter_map(|number| tracker.history().get(number))
        .filter(|packet| !packet.retransmitted)
        .map(|packet| packet.length)
        .sum()
}

proptest! {
    #[test]
    fn prop_bytes_in_flight_matches_history(ops in prop::collection::vec(tracker_op_strategy(), 1..200)) {
        let mut tracker = SentPacketTracker::new();
        let now = Timestamp::now();
        let mut next: PacketNumber = 1;

        for op in ops {
            match op {
                TrackerOp::Send(len) => {
                    let payload = Bytes::from(vec![0u8; len as usize]);
                    tracker.record_sent(Packet::trackable(next, payload), now).unwrap();
                    next += 1;
                }
                TrackerOp::Ack(number) => {
                    tracker.ack_packet(number);
                }
                TrackerOp::Queue(number) => {
                    tracker.queue_for_retransmission(number);
                }
                TrackerOp::Dequeue => {
                    if let Some(packet) = tracker.dequeue_for_retransmission() {
                        prop_assert!(packet.retransmitted);
                    }
                }
            }

            prop_assert_eq!(tracker.history().bytes_in_flight(), outstanding_bytes(&tracker));
        }
    }

    #[test]
    fn prop_packet_resolved_once(ops in prop::collection::vec(tracker_op_strategy(), 1..200)) {
        let mut tracker = SentPacketTracker::new();
        let now = Timestamp::now();
        let mut next: PacketNumber = 1;
        let mut sent_bytes = 0u64;

        for op in ops {
            match op {
                TrackerOp::Send(len) => {
                    let payload = Bytes::from(vec![0u8; len as usize]);
                    tracker.record_sent(Packet::trackable(next, payload), now).unwrap();
                    sent_bytes += u64::from(len);
                    next += 1;
                }
                TrackerOp::Ack(number) => {
                    let tracked = tracker.history().contains(number);
                    prop_assert_eq!(tracker.ack_packet(number).is_some(), tracked);
                    prop_assert!(tracker.ack_packet(number).is_none());
                }
                TrackerOp::Queue(number) => {
                    tracker.queue_for_retransmission(number);
                    prop_assert!(tracker.queue_for_retransmission(number).is_none());
                }
                TrackerOp::Dequeue => {
                    tracker.dequeue_for_retransmission();
                }
            }

            let history = tracker.history();
            prop_assert_eq!(history.total_sent(), sent_bytes);
            prop_assert!(history.total_acked() + u64::from(history.bytes_in_flight()) <= sent_bytes);
        }
    }

    #[test]
    fn prop_handler_invariants(ops in prop::collection::vec(handler_op_strategy(), 1..150)) {
        let clock = ManualClock::new();
        let mut handler: TestHandler =
            SentPacketHandler::with_clock(HandlerConfig::default(), clock.clone());
        let mut next: PacketNumber = 1;
        let mut sequence = 0u32;
        let mut in_order = 0;
        let mut largest_acked = 0;

        for op in ops {
            match op {
                HandlerOp::Send(len) => {
                    handler.sent(Packet::trackable(next, Bytes::from(vec![1u8; len]))).unwrap();
                    next += 1;
                }
                HandlerOp::Ack(mask) => {
                    let first = handler.stop_waiting_boundary();
                    let last = handler.last_sent_packet_number();
                    if first <= last {
                        sequence += 1;
                        let frame = AckFrame::new(first, last)
                            .with_ranges(ranges_from_mask(first, last, &mask));
                        handler.received_ack(&frame, sequence).unwrap();
                    }
                }
                HandlerOp::Advance(ms) => clock.advance(Duration::from_millis(ms)),
                HandlerOp::Dequeue => {
                    // Resend under a fresh number, as the connection layer does
                    if let Some(packet) = handler.dequeue_for_retransmission() {
                        handler.sent(Packet::trackable(next, packet.payload)).unwrap();
                        next += 1;
                    }
                }
            }

            let stats = handler.stats();
            prop_assert!(stats.largest_in_order_acked >= in_order);
            prop_assert!(stats.largest_acked >= largest_acked);
            prop_assert!(stats.largest_acked <= handler.last_sent_packet_number());
            prop_assert!(stats.largest_in_order_acked <= handler.last_sent_packet_number());
            // Only a timeout can resolve packets past the largest acknowledged one
            if stats.timeout_retransmits == 0 {
                prop_assert!(stats.largest_in_order_acked <= stats.largest_acked);
            }
            prop_assert_eq!(handler.stop_waiting_boundary(), stats.largest_in_order_acked + 1);
            prop_assert!(stats.total_acked + u64::from(stats.bytes_in_flight) <= stats.total_sent);
            prop_assert!(handler.check_for_error().is_ok());
            in_order = stats.largest_in_order_acked;
            largest_acked = stats.largest_acked;
        }

        // Acknowledging the whole outstanding window drains the flight
        handler.sent(Packet::trackable(next, Bytes::from_static(b"final"))).unwrap();
        sequence += 1;
        let frame = AckFrame::new(handler.stop_waiting_boundary(), next);
        handler.received_ack(&frame, sequence).unwrap();

        prop_assert_eq!(handler.bytes_in_flight(), 0);
        prop_assert_eq!(handler.largest_in_order_acked(), next);
    }

    #[test]
    fn prop_repeated_ack_is_idempotent(count in 1u32..50, mask in prop::collection::vec(any::<bool>(), 1..8)) {
        let clock = ManualClock::new();
        let mut handler: TestHandler =
            SentPacketHandler::with_clock(HandlerConfig::default(), clock.clone());
        for number in 1..=count {
            handler.sent(Packet::trackable(number, Bytes::from(vec![0u8; 100]))).unwrap();
        }

        let frame = AckFrame::new(1, count).with_ranges(ranges_from_mask(1, count, &mask));
        handler.received_ack(&frame, 1).unwrap();
        let after_first = handler.stats();

        handler.received_ack(&frame, 2).unwrap();
        prop_assert_eq!(handler.stats(), after_first);
    }
}
