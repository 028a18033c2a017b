//! # Transport Layer
//!
//! The seam between the synchronization core and whatever carries bytes.
//!
//! ## Design
//!
//! - Delivery guarantee is an argument of every send, not a property of
//!   the message type
//! - `Unreliable`: best effort, may be lost, duplicated or reordered, never
//!   corrupted
//! - `Reliable`: at-least-once on the wire, handed to the application once,
//!   in send order per sender
//! - `send` never blocks; replies show up in a later `receive`

mod loopback;

pub use loopback::{LoopbackEndpoint, LoopbackNetwork};

use std::fmt;

use crate::protocol::Message;

/// Identity of one process in a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(pub u16);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// Delivery guarantee of a send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// At-least-once, ordered per sender, eventually.
    Reliable,
    /// Best effort, unordered.
    Unreliable,
}

/// Destination of a send.
///
/// Broadcasts never loop back to the sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// The authoritative server.
    Server,
    /// One peer.
    Peer(PeerId),
    /// Every other peer.
    Broadcast,
    /// Every other peer except one.
    BroadcastExcept(PeerId),
}

/// A received message with its origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    /// Sender.
    pub from: PeerId,
    /// Guarantee it was sent with.
    pub delivery: Delivery,
    /// Decoded message.
    pub message: Message,
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransportStats {
    /// Datagrams sent (one per destination).
    pub packets_sent: u64,
    /// Datagrams handed to the application.
    pub packets_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Datagrams that failed to decode.
    pub decode_errors: u64,
}

/// What the core needs from the network.
pub trait Transport {
    /// This process.
    fn local_peer(&self) -> PeerId;

    /// The authoritative process.
    fn server_peer(&self) -> PeerId;

    /// Returns true if this process is the server.
    fn is_server(&self) -> bool {
        self.local_peer() == self.server_peer()
    }

    /// Queues a message; returns immediately.
    fn send(&mut self, target: Target, delivery: Delivery, message: &Message);

    /// Drains every message due by now, in arrival order.
    fn receive(&mut self) -> Vec<Envelope>;

    /// Current round-trip estimate in seconds.
    fn round_trip_estimate(&self) -> f32;

    /// Statistics for this endpoint.
    fn stats(&self) -> TransportStats;
}
