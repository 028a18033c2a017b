//! In-process transport hub.
//!
//! Every endpoint of a session shares one hub behind a `parking_lot::Mutex`.
//! Datagrams are real encoded bytes; the hub only decides when (and whether)
//! each one shows up at its destination.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{Delivery, Envelope, PeerId, Target, Transport, TransportStats};
use crate::protocol::{decode, encode, Message};
use crate::simulation::NetworkConditions;

/// Give up simulating retransmits after this many consecutive losses.
const MAX_RETRANSMITS: u32 = 16;

#[derive(Debug)]
struct Datagram {
    deliver_at: f64,
    sequence: u64,
    from: PeerId,
    to: PeerId,
    delivery: Delivery,
    bytes: Vec<u8>,
}

#[derive(Debug)]
struct Hub {
    now: f64,
    rng: StdRng,
    conditions: NetworkConditions,
    peers: Vec<PeerId>,
    in_flight: Vec<Datagram>,
    next_sequence: u64,
    /// Latest scheduled reliable arrival per (sender, receiver).
    reliable_tail: HashMap<(PeerId, PeerId), f64>,
    dropped: u64,
    duplicated: u64,
}

impl Hub {
    fn resolve(&self, from: PeerId, target: Target) -> Vec<PeerId> {
        let server = self.peers.first().copied().unwrap_or_default();
        match target {
            Target::Server => vec![server],
            Target::Peer(peer) => vec![peer],
            Target::Broadcast => self.peers.iter().copied().filter(|&p| p != from).collect(),
            Target::BroadcastExcept(skip) => self
                .peers
                .iter()
                .copied()
                .filter(|&p| p != from && p != skip)
                .collect(),
        }
    }

    fn push(&mut self, deliver_at: f64, from: PeerId, to: PeerId, delivery: Delivery, bytes: Vec<u8>) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.in_flight.push(Datagram {
            deliver_at,
            sequence,
            from,
            to,
            delivery,
            bytes,
        });
    }

    fn schedule(&mut self, from: PeerId, to: PeerId, delivery: Delivery, bytes: &[u8]) {
        match delivery {
            Delivery::Unreliable => {
                if self.conditions.should_drop(&mut self.rng) {
                    self.dropped += 1;
                    tracing::trace!(%from, %to, "unreliable datagram lost");
                    return;
                }
                let at = self.now + self.conditions.sample_latency(&mut self.rng);
                self.push(at, from, to, delivery, bytes.to_vec());
                if self.conditions.should_duplicate(&mut self.rng) {
                    self.duplicated += 1;
                    let again = self.now + self.conditions.sample_latency(&mut self.rng);
                    self.push(again, from, to, delivery, bytes.to_vec());
                }
            }
            Delivery::Reliable => {
                let mut at = self.now + self.conditions.sample_latency(&mut self.rng);
                let mut attempts = 0;
                while attempts < MAX_RETRANSMITS && self.conditions.should_drop(&mut self.rng) {
                    // Lost on the wire: the sender notices after a round trip and resends.
                    at += 2.0 * self.conditions.sample_latency(&mut self.rng);
                    attempts += 1;
                }
                let tail = self.reliable_tail.entry((from, to)).or_insert(f64::MIN);
                at = at.max(*tail);
                *tail = at;
                self.push(at, from, to, delivery, bytes.to_vec());
            }
        }
    }

    fn take_due(&mut self, to: PeerId) -> Vec<Datagram> {
        let now = self.now;
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|d| d.to == to && d.deliver_at <= now);
        self.in_flight = rest;
        due.sort_by(|a, b| {
            a.deliver_at
                .total_cmp(&b.deliver_at)
                .then(a.sequence.cmp(&b.sequence))
        });
        due
    }
}

/// Shared in-process network. Cloning yields another handle to the same hub.
///
/// The first endpoint connected is the server.
#[derive(Clone, Debug)]
pub struct LoopbackNetwork {
    hub: Arc<Mutex<Hub>>,
}

impl LoopbackNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new(conditions: NetworkConditions, seed: u64) -> Self {
        Self {
            hub: Arc::new(Mutex::new(Hub {
                now: 0.0,
                rng: StdRng::seed_from_u64(seed),
                conditions,
                peers: Vec::new(),
                in_flight: Vec::new(),
                next_sequence: 0,
                reliable_tail: HashMap::new(),
                dropped: 0,
                duplicated: 0,
            })),
        }
    }

    /// Connects a new endpoint.
    #[must_use]
    pub fn connect(&self) -> LoopbackEndpoint {
        let mut hub = self.hub.lock();
        let id = PeerId(hub.peers.len() as u16);
        hub.peers.push(id);
        let server = hub.peers[0];
        tracing::info!(peer = %id, server = %server, "peer connected");
        LoopbackEndpoint {
            id,
            server,
            hub: Arc::clone(&self.hub),
            stats: TransportStats::default(),
        }
    }

    /// Advances the hub clock.
    pub fn advance(&self, dt: f32) {
        self.hub.lock().now += f64::from(dt);
    }

    /// Hub clock in seconds.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.hub.lock().now
    }

    /// Replaces the network conditions for future sends.
    pub fn set_conditions(&self, conditions: NetworkConditions) {
        self.hub.lock().conditions = conditions;
    }

    /// Current network conditions.
    #[must_use]
    pub fn conditions(&self) -> NetworkConditions {
        self.hub.lock().conditions
    }

    /// Datagrams not yet delivered.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.hub.lock().in_flight.len()
    }

    /// Unreliable datagrams lost so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.hub.lock().dropped
    }

    /// Unreliable datagrams duplicated so far.
    #[must_use]
    pub fn duplicated(&self) -> u64 {
        self.hub.lock().duplicated
    }
}

/// One process's view of a [`LoopbackNetwork`].
#[derive(Debug)]
pub struct LoopbackEndpoint {
    id: PeerId,
    server: PeerId,
    hub: Arc<Mutex<Hub>>,
    stats: TransportStats,
}

impl LoopbackEndpoint {
    /// Hub clock in seconds.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.hub.lock().now
    }
}

impl Transport for LoopbackEndpoint {
    fn local_peer(&self) -> PeerId {
        self.id
    }

    fn server_peer(&self) -> PeerId {
        self.server
    }

    fn send(&mut self, target: Target, delivery: Delivery, message: &Message) {
        let bytes = encode(message);
        let mut hub = self.hub.lock();
        for to in hub.resolve(self.id, target) {
            if to == self.id {
                continue;
            }
            self.stats.packets_sent += 1;
            self.stats.bytes_sent += bytes.len() as u64;
            hub.schedule(self.id, to, delivery, &bytes);
        }
    }

    fn receive(&mut self) -> Vec<Envelope> {
        let due = self.hub.lock().take_due(self.id);
        let mut envelopes = Vec::with_capacity(due.len());
        for datagram in due {
            self.stats.bytes_received += datagram.bytes.len() as u64;
            match decode(&datagram.bytes) {
                Ok(message) => {
                    self.stats.packets_received += 1;
                    envelopes.push(Envelope {
                        from: datagram.from,
                        delivery: datagram.delivery,
                        message,
                    });
                }
                Err(e) => {
                    self.stats.decode_errors += 1;
                    tracing::warn!(peer = %self.id, from = %datagram.from, error = %e, "dropping datagram");
                }
            }
        }
        envelopes
    }

    fn round_trip_estimate(&self) -> f32 {
        self.hub.lock().conditions.mean_round_trip()
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}
