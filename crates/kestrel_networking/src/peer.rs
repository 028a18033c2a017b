//! # Peer
//!
//! One simulated process: a transport endpoint, a world, the replicas of
//! every craft, and the cosmetic channel its presentation layer reads.
//!
//! ## Step Order
//!
//! ```text
//! step(dt)
//!   1. receive    - every datagram due now, dispatched to its craft
//!   2. simulate   - every craft ticks once (predict or extrapolate,
//!                   scalars, rockets)
//!   3. authority  - server only: rocket hits, pickups
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use kestrel_shared::{CosmeticEvent, EntityId, GameConfig, ScalarChannel, Vec3};

use crate::entity::{AmmoHolder, Context, Craft, Damageable, HitReport, Movable};
use crate::fire::FireRejection;
use crate::integration::{ArenaWorld, CosmeticChannel, World, DEFAULT_EVENT_CAPACITY};
use crate::movement::CraftInput;
use crate::pickup::{Pickup, PickupKind};
use crate::projectile::SlotIndex;
use crate::transport::{LoopbackEndpoint, PeerId, Transport};

/// Misuse of a peer by the code driving it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerError {
    /// No craft with this id exists on the peer.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// Only the owning peer may drive this craft.
    #[error("{entity} is not owned by {peer}")]
    NotOwner {
        /// Craft.
        entity: EntityId,
        /// Peer that tried to drive it.
        peer: PeerId,
    },

    /// The craft has no scalar on this channel.
    #[error("{entity} has no scalar channel {channel}")]
    UnknownScalar {
        /// Craft.
        entity: EntityId,
        /// Requested channel.
        channel: ScalarChannel,
    },

    /// The launch was refused locally.
    #[error("fire refused: {0}")]
    Fire(#[from] FireRejection),
}

/// Result type for peer operations.
pub type PeerResult<T> = Result<T, PeerError>;

/// One process taking part in a session.
pub struct Peer<T: Transport = LoopbackEndpoint, W: World = ArenaWorld> {
    transport: T,
    world: W,
    config: GameConfig,
    crafts: BTreeMap<EntityId, Craft>,
    pickups: Vec<Pickup>,
    events: CosmeticChannel,
    clock: f64,
    ticks: u64,
}

impl<T: Transport, W: World> Peer<T, W> {
    /// Creates a peer with no crafts.
    #[must_use]
    pub fn new(transport: T, world: W, config: GameConfig) -> Self {
        Self::with_event_capacity(transport, world, config, DEFAULT_EVENT_CAPACITY)
    }

    /// Creates a peer whose cosmetic channel holds at most `capacity` undrained events.
    #[must_use]
    pub fn with_event_capacity(transport: T, world: W, config: GameConfig, capacity: usize) -> Self {
        tracing::info!(peer = %transport.local_peer(), server = transport.is_server(), capacity, "peer created");
        Self {
            transport,
            world,
            config,
            crafts: BTreeMap::new(),
            pickups: Vec::new(),
            events: CosmeticChannel::new(capacity),
            clock: 0.0,
            ticks: 0,
        }
    }

    /// This process.
    #[must_use]
    pub fn id(&self) -> PeerId {
        self.transport.local_peer()
    }

    /// Returns true if this process is the server.
    #[must_use]
    pub fn is_server(&self) -> bool {
        self.transport.is_server()
    }

    /// Network endpoint.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Collision world.
    #[must_use]
    pub const fn world(&self) -> &W {
        &self.world
    }

    /// Configuration every craft on this peer is built from.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Seconds simulated.
    #[must_use]
    pub const fn clock(&self) -> f64 {
        self.clock
    }

    /// Steps taken.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Creates the local replica of a craft.
    pub fn spawn_craft(&mut self, id: EntityId, owner: PeerId, location: Vec3, yaw: f32) {
        let craft = Craft::new(id, owner, &self.config, location, yaw);
        self.world.sync_body(id, location);
        tracing::debug!(peer = %self.id(), entity = %id, %owner, role = ?craft.role(&self.transport), "craft spawned");
        self.crafts.insert(id, craft);
    }

    /// A craft replica.
    #[must_use]
    pub fn craft(&self, id: EntityId) -> Option<&Craft> {
        self.crafts.get(&id)
    }

    /// A mutable craft replica.
    pub fn craft_mut(&mut self, id: EntityId) -> Option<&mut Craft> {
        self.crafts.get_mut(&id)
    }

    /// Every craft replica, in id order.
    pub fn crafts(&self) -> impl Iterator<Item = &Craft> {
        self.crafts.values()
    }

    /// Places a pickup. Only the server's pickups grant anything.
    pub fn add_pickup(&mut self, kind: PickupKind, location: Vec3) {
        self.pickups
            .push(Pickup::new(kind, location, &self.config.pickup));
    }

    /// Pickups on this peer.
    #[must_use]
    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    /// Sets the input of a locally controlled craft.
    ///
    /// # Errors
    ///
    /// Fails if the craft is unknown or owned by another peer.
    pub fn set_input(&mut self, entity: EntityId, input: CraftInput) -> PeerResult<()> {
        let local = self.transport.local_peer();
        let craft = Self::owned(&mut self.crafts, entity, local)?;
        craft.set_input(input);
        Ok(())
    }

    /// Pulls the trigger of a locally controlled craft.
    ///
    /// # Errors
    ///
    /// Fails if the craft is unknown or the launch was refused locally.
    pub fn fire_rocket(&mut self, entity: EntityId) -> PeerResult<SlotIndex> {
        let craft = self
            .crafts
            .get_mut(&entity)
            .ok_or(PeerError::UnknownEntity(entity))?;
        let mut ctx = Context {
            transport: &mut self.transport,
            world: &mut self.world,
            events: &self.events,
        };
        Ok(craft.fire_rocket(&mut ctx)?)
    }

    /// Writes a replicated scalar of a locally controlled craft.
    ///
    /// # Errors
    ///
    /// Fails if the craft is unknown, owned elsewhere, or has no such channel.
    pub fn set_scalar(&mut self, entity: EntityId, channel: ScalarChannel, value: f32) -> PeerResult<()> {
        let local = self.transport.local_peer();
        let craft = Self::owned(&mut self.crafts, entity, local)?;
        let replicator = craft
            .scalars_mut()
            .get_mut(channel)
            .ok_or(PeerError::UnknownScalar { entity, channel })?;
        replicator.set_value(value);
        Ok(())
    }

    /// Cosmetic channel of this peer.
    #[must_use]
    pub const fn events(&self) -> &CosmeticChannel {
        &self.events
    }

    /// Takes every pending cosmetic event.
    pub fn drain_events(&self) -> Vec<CosmeticEvent> {
        self.events.drain()
    }

    /// Advances this process by one tick.
    pub fn step(&mut self, dt: f32) {
        self.clock += f64::from(dt);
        self.ticks += 1;

        for envelope in self.transport.receive() {
            let entity = envelope.message.entity();
            let Some(craft) = self.crafts.get_mut(&entity) else {
                tracing::debug!(peer = %self.transport.local_peer(), %entity, kind = ?envelope.message.kind(), "message for unknown entity");
                continue;
            };
            let mut ctx = Context {
                transport: &mut self.transport,
                world: &mut self.world,
                events: &self.events,
            };
            craft.handle_message(&envelope, &mut ctx);
        }

        let mut hits: Vec<HitReport> = Vec::new();
        for craft in self.crafts.values_mut() {
            let mut ctx = Context {
                transport: &mut self.transport,
                world: &mut self.world,
                events: &self.events,
            };
            hits.extend(craft.step(dt, &mut ctx));
        }

        if self.transport.is_server() {
            self.apply_hits(&hits);
            self.collect_pickups();
        }
    }

    fn apply_hits(&mut self, hits: &[HitReport]) {
        for hit in hits {
            let Some(target) = self.crafts.get_mut(&hit.target) else {
                continue;
            };
            tracing::debug!(shooter = %hit.shooter, target = %hit.target, damage = hit.damage, "rocket hit");
            let mut ctx = Context {
                transport: &mut self.transport,
                world: &mut self.world,
                events: &self.events,
            };
            target.on_hit(hit.damage, &mut ctx);
        }
    }

    fn collect_pickups(&mut self) {
        let now = self.clock;
        for craft in self.crafts.values_mut() {
            let location = craft.location();
            for pickup in &mut self.pickups {
                if !pickup.overlaps(location) {
                    continue;
                }
                if let Some(grant) = pickup.try_collect(now) {
                    tracing::info!(entity = %craft.id(), kind = ?pickup.kind(), "pickup collected");
                    let mut ctx = Context {
                        transport: &mut self.transport,
                        world: &mut self.world,
                        events: &self.events,
                    };
                    craft.on_pickup(grant, &mut ctx);
                }
            }
        }
    }

    fn owned(
        crafts: &mut BTreeMap<EntityId, Craft>,
        entity: EntityId,
        local: PeerId,
    ) -> PeerResult<&mut Craft> {
        let craft = crafts
            .get_mut(&entity)
            .ok_or(PeerError::UnknownEntity(entity))?;
        if craft.owner() != local {
            return Err(PeerError::NotOwner {
                entity,
                peer: local,
            });
        }
        Ok(craft)
    }
}
