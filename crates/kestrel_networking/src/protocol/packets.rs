//! # Packet Layouts
//!
//! Fixed-size wire layouts for every [`super::Message`]. All of them are
//! `Pod` so encoding is a straight byte copy and decoding never trusts
//! alignment of the incoming buffer.

use bytemuck::{Pod, Zeroable};
use kestrel_shared::{EntityId, ScalarChannel, Vec3};

use super::messages::{FireOrder, MovementSample, ScalarMessage};
use crate::projectile::SlotIndex;
use crate::sync_tag::SyncTag;

/// Movement sample on the wire.
///
/// Size: 40 bytes
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct MovementPacket {
    /// Sender clock (seconds).
    pub timestamp: f64,
    /// Craft.
    pub entity: u32,
    /// Location.
    pub location: Vec3,
    /// Facing yaw (degrees).
    pub yaw: f32,
    /// Forward input.
    pub forward: f32,
    /// Input flags.
    pub flags: u32,
    /// Padding for alignment.
    pub _reserved: u32,
}

impl MovementPacket {
    /// Size in bytes.
    pub const SIZE: usize = 40;

    /// Flag: brake held.
    pub const FLAG_BRAKING: u32 = 1 << 0;

    /// Packs a sample.
    #[must_use]
    pub fn pack(entity: EntityId, sample: &MovementSample) -> Self {
        Self {
            timestamp: sample.timestamp,
            entity: entity.0,
            location: sample.world_location,
            yaw: sample.facing_yaw,
            forward: sample.forward_input,
            flags: if sample.braking { Self::FLAG_BRAKING } else { 0 },
            _reserved: 0,
        }
    }

    /// Unpacks into the entity and sample.
    #[must_use]
    pub fn unpack(&self) -> (EntityId, MovementSample) {
        (
            EntityId(self.entity),
            MovementSample {
                world_location: self.location,
                facing_yaw: self.yaw,
                timestamp: self.timestamp,
                forward_input: self.forward,
                braking: self.flags & Self::FLAG_BRAKING != 0,
            },
        )
    }
}

/// Scalar value on the wire (update or terminal).
///
/// Size: 16 bytes
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct ScalarPacket {
    /// Entity.
    pub entity: u32,
    /// Channel.
    pub channel: u16,
    /// Padding for alignment.
    pub _padding: u16,
    /// Sync tag.
    pub tag: i32,
    /// Value.
    pub value: f32,
}

impl From<&ScalarMessage> for ScalarPacket {
    fn from(m: &ScalarMessage) -> Self {
        Self {
            entity: m.entity.0,
            channel: m.channel.0,
            _padding: 0,
            tag: m.tag.0,
            value: m.value,
        }
    }
}

impl From<ScalarPacket> for ScalarMessage {
    fn from(p: ScalarPacket) -> Self {
        Self {
            entity: EntityId(p.entity),
            channel: ScalarChannel(p.channel),
            tag: SyncTag(p.tag),
            value: p.value,
        }
    }
}

/// Fire request or confirmation on the wire.
///
/// Size: 32 bytes
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct FirePacket {
    /// Craft.
    pub entity: u32,
    /// Slot index.
    pub slot: u32,
    /// Launch point.
    pub origin: Vec3,
    /// Facing direction.
    pub facing: Vec3,
}

impl From<&FireOrder> for FirePacket {
    fn from(o: &FireOrder) -> Self {
        Self {
            entity: o.entity.0,
            slot: u32::from(o.slot.0),
            origin: o.origin,
            facing: o.facing,
        }
    }
}

impl From<FirePacket> for FireOrder {
    fn from(p: FirePacket) -> Self {
        Self {
            entity: EntityId(p.entity),
            slot: SlotIndex(p.slot.min(u32::from(u8::MAX)) as u8),
            origin: p.origin,
            facing: p.facing,
        }
    }
}

/// Entity plus one 32-bit field: rollback slot, granted ammo, or health bits.
///
/// Size: 8 bytes
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct EntityWordPacket {
    /// Entity.
    pub entity: u32,
    /// Payload word.
    pub word: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_sizes() {
        assert_eq!(std::mem::size_of::<MovementPacket>(), MovementPacket::SIZE);
        assert_eq!(std::mem::size_of::<ScalarPacket>(), 16);
        assert_eq!(std::mem::size_of::<FirePacket>(), 32);
        assert_eq!(std::mem::size_of::<EntityWordPacket>(), 8);
    }

    #[test]
    fn test_braking_flag_survives_packing() {
        let sample = MovementSample {
            braking: true,
            forward_input: -1.0,
            ..Default::default()
        };
        let (_, back) = MovementPacket::pack(EntityId(3), &sample).unpack();
        assert!(back.braking);
        assert_eq!(back.forward_input, -1.0);
    }
}
