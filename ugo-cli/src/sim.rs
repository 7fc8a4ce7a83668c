//! Lossy-link simulation
//!
//! Drives a [`SentPacketHandler`] against the [`Receiver`] model in synthetic
//! time. Both directions of the link share one fixed delay, so each direction
//! is a FIFO of in-flight items ordered by arrival time.

use crate::config::SimConfig;
use crate::receiver::{Receiver, ReceiverStats};
use bytes::{BufMut, Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;
use ugo_io::{Clock, ManualClock, Timestamp};
use ugo_protocol::{
    AckFrame, HandlerError, HandlerStats, Packet, PacketNumber, RenoSender, SentPacketHandler,
    SharedRttStats,
};

/// Handler type driven by the simulator
pub type SimHandler = SentPacketHandler<RenoSender, SharedRttStats, ManualClock>;

/// Data packet on the forward path
#[derive(Debug)]
struct DataInTransit {
    arrival: Timestamp,
    number: PacketNumber,
    stop_waiting: PacketNumber,
    payload: Bytes,
}

/// Ack frame on the return path
#[derive(Debug)]
struct AckInTransit {
    arrival: Timestamp,
    frame: AckFrame,
    sequence: u32,
}

/// Sender-side and link counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Packets handed to the link, including retransmissions
    pub packets_sent: u64,
    /// Packets resent under a fresh number
    pub retransmissions: u64,
    /// Data packets dropped by the link
    pub data_dropped: u64,
    /// Ack frames dropped by the link
    pub acks_dropped: u64,
    /// Ack frames rejected as duplicate or out of order
    pub acks_rejected: u64,
}

/// Result of a simulation run
#[derive(Debug, Clone)]
pub struct SimReport {
    /// Simulated time elapsed
    pub elapsed: Duration,
    /// Messages the sender had to deliver
    pub messages: u64,
    /// Whether every message reached the receiver
    pub completed: bool,
    pub link: LinkStats,
    pub receiver: ReceiverStats,
    pub handler: HandlerStats,
}

/// Simulation state
pub struct Simulation {
    config: SimConfig,
    clock: ManualClock,
    start: Timestamp,
    handler: SimHandler,
    receiver: Receiver,
    rng: StdRng,
    forward: VecDeque<DataInTransit>,
    backward: VecDeque<AckInTransit>,
    next_packet_number: PacketNumber,
    next_message: u64,
    stats: LinkStats,
}

impl Simulation {
    /// Create a simulation from its configuration
    pub fn new(config: SimConfig) -> Self {
        let clock = ManualClock::new();
        let start = clock.now();
        let handler =
            SentPacketHandler::with_clock(config.handler.to_handler_config(), clock.clone());
        let receiver = Receiver::new(config.link.ack_every, config.link.ack_delay());
        let rng = StdRng::seed_from_u64(config.link.seed);

        Simulation {
            config,
            clock,
            start,
            handler,
            receiver,
            rng,
            forward: VecDeque::new(),
            backward: VecDeque::new(),
            next_packet_number: 1,
            next_message: 0,
            stats: LinkStats::default(),
        }
    }

    /// Run until every message is delivered or the time limit passes
    ///
    /// `on_interval` is called with a progress report once per stats interval.
    pub fn run<F>(&mut self, mut on_interval: F) -> Result<SimReport, HandlerError>
    where
        F: FnMut(&SimReport),
    {
        let tick = self.config.sender.tick();
        let limit = self.config.sender.duration();
        let interval = self.config.sender.stats_interval();
        let mut next_report = interval;

        tracing::info!(
            "simulating {} messages over a {:?} link, loss {:.1}%",
            self.config.sender.messages,
            self.config.link.delay(),
            self.config.link.loss_rate * 100.0
        );

        while !self.is_complete() && self.elapsed() < limit {
            self.step()?;
            self.clock.advance(tick);

            if !interval.is_zero() && self.elapsed() >= next_report {
                on_interval(&self.report());
                next_report += interval;
            }
        }

        let report = self.report();
        if report.completed {
            tracing::info!("all messages delivered after {:?}", report.elapsed);
        } else {
            tracing::warn!(
                "time limit reached with {} of {} messages delivered",
                report.receiver.messages_delivered,
                report.messages
            );
        }
        Ok(report)
    }

    /// Advance the simulation by one tick at the current clock time
    pub fn step(&mut self) -> Result<(), HandlerError> {
        let now = self.clock.now();

        self.deliver_data(now);
        self.send_ack(now);
        self.deliver_acks(now)?;
        self.send_packets(now)?;

        self.handler.check_for_error()
    }

    fn deliver_data(&mut self, now: Timestamp) {
        while self.forward.front().map_or(false, |item| item.arrival <= now) {
            if let Some(item) = self.forward.pop_front() {
                self.receiver
                    .on_packet(item.number, item.stop_waiting, &item.payload, now);
            }
        }
    }

    fn send_ack(&mut self, now: Timestamp) {
        if !self.receiver.ack_due(now) {
            return;
        }
        let Some((frame, sequence)) = self.receiver.build_ack(now) else {
            return;
        };

        if self.rng.gen_bool(self.config.link.ack_loss_rate) {
            tracing::trace!("link dropped ack {}", sequence);
            self.stats.acks_dropped += 1;
            return;
        }
        self.backward.push_back(AckInTransit {
            arrival: now + self.config.link.delay(),
            frame,
            sequence,
        });
    }

    fn deliver_acks(&mut self, now: Timestamp) -> Result<(), HandlerError> {
        while self.backward.front().map_or(false, |item| item.arrival <= now) {
            let Some(item) = self.backward.pop_front() else {
                break;
            };
            match self.handler.received_ack(&item.frame, item.sequence) {
                Ok(()) => {}
                Err(e) if !e.is_fatal() => {
                    tracing::debug!("ack {} rejected: {}", item.sequence, e);
                    self.stats.acks_rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn send_packets(&mut self, now: Timestamp) -> Result<(), HandlerError> {
        // Runs the retransmission timer even when the window is closed
        self.handler.probably_has_packet_for_retransmission();

        while self.handler.congestion_allows_sending() {
            if let Some(packet) = self.handler.dequeue_for_retransmission() {
                tracing::trace!("resending {}", packet);
                self.stats.retransmissions += 1;
                self.transmit(packet.payload, now)?;
            } else if self.next_message < self.config.sender.messages {
                let payload = self.next_payload();
                self.transmit(payload, now)?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn next_payload(&mut self) -> Bytes {
        let mut payload = BytesMut::with_capacity(self.config.sender.payload_size);
        payload.put_u64(self.next_message);
        payload.resize(self.config.sender.payload_size, 0);
        self.next_message += 1;
        payload.freeze()
    }

    fn transmit(&mut self, payload: Bytes, now: Timestamp) -> Result<(), HandlerError> {
        let number = self.next_packet_number;
        self.handler
            .sent(Packet::trackable(number, payload.clone()))?;
        self.next_packet_number += 1;
        self.stats.packets_sent += 1;

        if self.rng.gen_bool(self.config.link.loss_rate) {
            tracing::trace!("link dropped packet {}", number);
            self.stats.data_dropped += 1;
            return Ok(());
        }
        self.forward.push_back(DataInTransit {
            arrival: now + self.config.link.delay(),
            number,
            stop_waiting: self.handler.stop_waiting_boundary(),
            payload,
        });
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.receiver.stats().messages_delivered >= self.config.sender.messages
    }

    fn elapsed(&self) -> Duration {
        self.clock.now().duration_since(self.start)
    }

    /// Snapshot of the current state
    pub fn report(&self) -> SimReport {
        SimReport {
            elapsed: self.elapsed(),
            messages: self.config.sender.messages,
            completed: self.is_complete(),
            link: self.stats.clone(),
            receiver: self.receiver.stats().clone(),
            handler: self.handler.stats(),
        }
    }

    pub fn handler(&self) -> &SimHandler {
        &self.handler
    }
}
