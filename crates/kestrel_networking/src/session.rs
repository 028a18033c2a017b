//! # Session
//!
//! Owns the loopback network and every peer, and steps them in lockstep.
//! Peer 0 is the server; every other peer is a client.
//!
//! ```text
//! step(dt):  network.advance(dt) -> server.step(dt) -> client 1 .. N step(dt)
//! ```

use kestrel_shared::{EntityId, GameConfig, Vec3};

use crate::integration::ArenaWorld;
use crate::peer::Peer;
use crate::pickup::PickupKind;
use crate::simulation::NetworkConditions;
use crate::transport::{LoopbackNetwork, PeerId};

/// A server plus its clients over one in-process network.
pub struct Session {
    network: LoopbackNetwork,
    peers: Vec<Peer>,
    next_entity: u32,
    time: f64,
    ticks: u64,
}

impl Session {
    /// Creates a server and `clients` clients.
    #[must_use]
    pub fn new(config: GameConfig, conditions: NetworkConditions, seed: u64, clients: usize) -> Self {
        let network = LoopbackNetwork::new(conditions, seed);
        let peers = (0..=clients)
            .map(|_| Peer::new(network.connect(), ArenaWorld::default(), config))
            .collect();
        tracing::info!(clients, seed, "session created");
        Self {
            network,
            peers,
            next_entity: 1,
            time: 0.0,
            ticks: 0,
        }
    }

    /// The server peer.
    #[must_use]
    pub fn server(&self) -> &Peer {
        &self.peers[0]
    }

    /// A peer by id.
    #[must_use]
    pub fn peer(&self, id: PeerId) -> Option<&Peer> {
        self.peers.get(usize::from(id.0))
    }

    /// A mutable peer by id.
    pub fn peer_mut(&mut self, id: PeerId) -> Option<&mut Peer> {
        self.peers.get_mut(usize::from(id.0))
    }

    /// Every peer, server first.
    #[must_use]
    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    /// Ids of the client peers.
    pub fn client_ids(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.peers.iter().skip(1).map(Peer::id)
    }

    /// The shared network.
    #[must_use]
    pub const fn network(&self) -> &LoopbackNetwork {
        &self.network
    }

    /// Replaces the network conditions for future sends.
    pub fn set_conditions(&self, conditions: NetworkConditions) {
        self.network.set_conditions(conditions);
    }

    /// Seconds simulated.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Steps taken.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Creates a craft owned by `owner` on every peer.
    pub fn spawn_craft(&mut self, owner: PeerId, location: Vec3, yaw: f32) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        for peer in &mut self.peers {
            peer.spawn_craft(id, owner, location, yaw);
        }
        tracing::info!(entity = %id, %owner, "craft spawned on every peer");
        id
    }

    /// Places a pickup on every peer.
    pub fn add_pickup(&mut self, kind: PickupKind, location: Vec3) {
        for peer in &mut self.peers {
            peer.add_pickup(kind, location);
        }
    }

    /// Advances the network and every peer by one tick.
    pub fn step(&mut self, dt: f32) {
        self.network.advance(dt);
        for peer in &mut self.peers {
            peer.step(dt);
        }
        self.time += f64::from(dt);
        self.ticks += 1;
    }

    /// Steps until `duration` seconds have elapsed.
    pub fn run_for(&mut self, duration: f32, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let steps = (duration / dt).round() as u64;
        for _ in 0..steps {
            self.step(dt);
        }
    }
}
