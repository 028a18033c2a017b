//! # Message Definitions
//!
//! Application-level messages exchanged between peers. These are the types
//! the rest of the crate works with; [`super::packets`] holds their wire
//! layout.

use kestrel_shared::{EntityId, ScalarChannel, Vec3};

use crate::projectile::SlotIndex;
use crate::sync_tag::SyncTag;

/// One tick of a controlling peer's movement.
///
/// Produced once per tick by the predictor, consumed (never mutated) by
/// reconciliation. Lives for a single round trip.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MovementSample {
    /// Location after this tick's movement was resolved.
    pub world_location: Vec3,
    /// Facing yaw in degrees.
    pub facing_yaw: f32,
    /// Sender's simulation clock (seconds).
    pub timestamp: f64,
    /// Forward input in `[-1, 1]` that produced this tick.
    pub forward_input: f32,
    /// Whether the brake was held.
    pub braking: bool,
}

/// One value of a replicated scalar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalarMessage {
    /// Entity owning the scalar.
    pub entity: EntityId,
    /// Scalar within the entity.
    pub channel: ScalarChannel,
    /// Ordering tag.
    pub tag: SyncTag,
    /// The value.
    pub value: f32,
}

/// A rocket launch: which slot, from where, facing which way.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FireOrder {
    /// Craft owning the pool.
    pub entity: EntityId,
    /// Slot within the pool.
    pub slot: SlotIndex,
    /// Launch point.
    pub origin: Vec3,
    /// Unit facing direction.
    pub facing: Vec3,
}

/// Type tag written in front of every datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// Controlling peer -> server -> observers: movement sample.
    Movement = 1,
    /// Owner -> server -> observers: unreliable scalar value.
    ScalarUpdate = 2,
    /// Owner -> server -> observers: reliable settled scalar value.
    ScalarTerminal = 3,
    /// Controlling peer -> server: please launch this slot.
    FireRequest = 4,
    /// Server -> everyone: launch confirmed.
    FireConfirmed = 5,
    /// Server -> requester: undo the optimistic launch.
    FireRollback = 6,
    /// Server -> owner: rockets were granted.
    AmmoGranted = 7,
    /// Server -> everyone: authoritative health.
    HealthUpdate = 8,
}

impl MessageKind {
    /// Parses a type tag.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::Movement,
            2 => Self::ScalarUpdate,
            3 => Self::ScalarTerminal,
            4 => Self::FireRequest,
            5 => Self::FireConfirmed,
            6 => Self::FireRollback,
            7 => Self::AmmoGranted,
            8 => Self::HealthUpdate,
            _ => return None,
        })
    }
}

/// Every message a peer can send.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Message {
    /// Movement sample of a craft.
    Movement {
        /// Craft.
        entity: EntityId,
        /// The sample.
        sample: MovementSample,
    },
    /// Unreliable scalar update.
    ScalarUpdate(ScalarMessage),
    /// Reliable terminal scalar value.
    ScalarTerminal(ScalarMessage),
    /// Fire request.
    FireRequest(FireOrder),
    /// Fire confirmation broadcast.
    FireConfirmed(FireOrder),
    /// Compensating instruction for a rejected fire request.
    FireRollback {
        /// Craft owning the pool.
        entity: EntityId,
        /// Slot to return to free.
        slot: SlotIndex,
    },
    /// Rockets granted to the owner.
    AmmoGranted {
        /// Craft.
        entity: EntityId,
        /// Rockets added.
        amount: u32,
    },
    /// Authoritative health.
    HealthUpdate {
        /// Craft.
        entity: EntityId,
        /// Current health.
        health: f32,
    },
}

impl Message {
    /// Type tag of this message.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Movement { .. } => MessageKind::Movement,
            Self::ScalarUpdate(_) => MessageKind::ScalarUpdate,
            Self::ScalarTerminal(_) => MessageKind::ScalarTerminal,
            Self::FireRequest(_) => MessageKind::FireRequest,
            Self::FireConfirmed(_) => MessageKind::FireConfirmed,
            Self::FireRollback { .. } => MessageKind::FireRollback,
            Self::AmmoGranted { .. } => MessageKind::AmmoGranted,
            Self::HealthUpdate { .. } => MessageKind::HealthUpdate,
        }
    }

    /// Entity the message is about.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match self {
            Self::Movement { entity, .. }
            | Self::FireRollback { entity, .. }
            | Self::AmmoGranted { entity, .. }
            | Self::HealthUpdate { entity, .. } => *entity,
            Self::ScalarUpdate(m) | Self::ScalarTerminal(m) => m.entity,
            Self::FireRequest(o) | Self::FireConfirmed(o) => o.entity,
        }
    }
}
