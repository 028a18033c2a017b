//! # Message Serialization
//!
//! `[kind: u8][payload: Pod bytes]`, nothing else. Every message is a
//! few dozen bytes, well under [`MAX_MESSAGE_SIZE`].

use bytemuck::{bytes_of, Pod};
use kestrel_shared::EntityId;
use thiserror::Error;

use super::messages::{Message, MessageKind};
use super::packets::{EntityWordPacket, FirePacket, MovementPacket, ScalarPacket};
use crate::projectile::SlotIndex;

/// Largest encoded message.
pub const MAX_MESSAGE_SIZE: usize = 64;

/// Errors raised while decoding a datagram.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Zero-length datagram.
    #[error("empty datagram")]
    Empty,

    /// The type tag is not a known [`MessageKind`].
    #[error("unknown message kind: {0}")]
    UnknownKind(u8),

    /// The payload is shorter than the kind requires.
    #[error("truncated {kind:?} payload: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Kind being decoded.
        kind: MessageKind,
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Message writer - writes into a reusable fixed buffer.
pub struct MessageWriter {
    buffer: [u8; MAX_MESSAGE_SIZE],
    position: usize,
}

impl MessageWriter {
    /// Creates a new writer with a fresh buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; MAX_MESSAGE_SIZE],
            position: 0,
        }
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> bool {
        if self.position >= MAX_MESSAGE_SIZE {
            return false;
        }
        self.buffer[self.position] = value;
        self.position += 1;
        true
    }

    /// Writes a Pod type directly.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> bool {
        let bytes = bytes_of(value);
        if self.position + bytes.len() > MAX_MESSAGE_SIZE {
            return false;
        }
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        true
    }

    /// Serializes a complete message, replacing any previous content.
    pub fn write_message(&mut self, message: &Message) -> bool {
        self.position = 0;
        if !self.write_u8(message.kind() as u8) {
            return false;
        }
        match message {
            Message::Movement { entity, sample } => {
                self.write_pod(&MovementPacket::pack(*entity, sample))
            }
            Message::ScalarUpdate(m) | Message::ScalarTerminal(m) => {
                self.write_pod(&ScalarPacket::from(m))
            }
            Message::FireRequest(o) | Message::FireConfirmed(o) => {
                self.write_pod(&FirePacket::from(o))
            }
            Message::FireRollback { entity, slot } => self.write_pod(&EntityWordPacket {
                entity: entity.0,
                word: u32::from(slot.0),
            }),
            Message::AmmoGranted { entity, amount } => self.write_pod(&EntityWordPacket {
                entity: entity.0,
                word: *amount,
            }),
            Message::HealthUpdate { entity, health } => self.write_pod(&EntityWordPacket {
                entity: entity.0,
                word: health.to_bits(),
            }),
        }
    }
}

impl Default for MessageWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Message reader - decodes one datagram.
pub struct MessageReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> MessageReader<'a> {
    /// Creates a new reader over a datagram.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.buffer.get(self.position)?;
        self.position += 1;
        Some(value)
    }

    /// Reads a Pod type directly.
    #[inline]
    pub fn read_pod<T: Pod>(&mut self) -> Option<T> {
        let size = std::mem::size_of::<T>();
        if self.position + size > self.buffer.len() {
            return None;
        }
        let slice = &self.buffer[self.position..self.position + size];
        self.position += size;
        bytemuck::try_pod_read_unaligned(slice).ok()
    }

    fn expect_pod<T: Pod>(&mut self, kind: MessageKind) -> ProtocolResult<T> {
        let actual = self.remaining();
        self.read_pod().ok_or(ProtocolError::Truncated {
            kind,
            expected: std::mem::size_of::<T>(),
            actual,
        })
    }

    /// Decodes the datagram into a message.
    ///
    /// # Errors
    ///
    /// Fails on an empty buffer, an unknown type tag or a short payload.
    pub fn read_message(&mut self) -> ProtocolResult<Message> {
        let byte = self.read_u8().ok_or(ProtocolError::Empty)?;
        let kind = MessageKind::from_u8(byte).ok_or(ProtocolError::UnknownKind(byte))?;

        Ok(match kind {
            MessageKind::Movement => {
                let (entity, sample) = self.expect_pod::<MovementPacket>(kind)?.unpack();
                Message::Movement { entity, sample }
            }
            MessageKind::ScalarUpdate => {
                Message::ScalarUpdate(self.expect_pod::<ScalarPacket>(kind)?.into())
            }
            MessageKind::ScalarTerminal => {
                Message::ScalarTerminal(self.expect_pod::<ScalarPacket>(kind)?.into())
            }
            MessageKind::FireRequest => {
                Message::FireRequest(self.expect_pod::<FirePacket>(kind)?.into())
            }
            MessageKind::FireConfirmed => {
                Message::FireConfirmed(self.expect_pod::<FirePacket>(kind)?.into())
            }
            MessageKind::FireRollback => {
                let p = self.expect_pod::<EntityWordPacket>(kind)?;
                Message::FireRollback {
                    entity: EntityId(p.entity),
                    slot: SlotIndex(p.word.min(u32::from(u8::MAX)) as u8),
                }
            }
            MessageKind::AmmoGranted => {
                let p = self.expect_pod::<EntityWordPacket>(kind)?;
                Message::AmmoGranted {
                    entity: EntityId(p.entity),
                    amount: p.word,
                }
            }
            MessageKind::HealthUpdate => {
                let p = self.expect_pod::<EntityWordPacket>(kind)?;
                Message::HealthUpdate {
                    entity: EntityId(p.entity),
                    health: f32::from_bits(p.word),
                }
            }
        })
    }
}

/// Encodes a message into an owned datagram.
#[must_use]
pub fn encode(message: &Message) -> Vec<u8> {
    let mut writer = MessageWriter::new();
    // Every layout fits MAX_MESSAGE_SIZE, so the write cannot run out of room.
    let written = writer.write_message(message);
    debug_assert!(written, "message larger than MAX_MESSAGE_SIZE");
    writer.as_slice().to_vec()
}

/// Decodes one datagram.
///
/// # Errors
///
/// See [`MessageReader::read_message`].
pub fn decode(bytes: &[u8]) -> ProtocolResult<Message> {
    MessageReader::new(bytes).read_message()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{FireOrder, MovementSample, ScalarMessage};
    use crate::sync_tag::SyncTag;
    use kestrel_shared::{ScalarChannel, Vec3};

    #[test]
    fn test_movement_message_survives_the_wire() {
        let message = Message::Movement {
            entity: EntityId(7),
            sample: MovementSample {
                world_location: Vec3::new(10.0, -4.0, 2.5),
                facing_yaw: 135.0,
                timestamp: 100.25,
                forward_input: 0.5,
                braking: false,
            },
        };

        let bytes = encode(&message);
        assert_eq!(bytes.len(), 1 + MovementPacket::SIZE);
        assert_eq!(decode(&bytes).unwrap(), message);
    }

    #[test]
    fn test_terminal_and_update_keep_their_kind() {
        let scalar = ScalarMessage {
            entity: EntityId(1),
            channel: ScalarChannel(2),
            tag: SyncTag(41),
            value: 5.0,
        };
        let update = decode(&encode(&Message::ScalarUpdate(scalar))).unwrap();
        let terminal = decode(&encode(&Message::ScalarTerminal(scalar))).unwrap();
        assert_eq!(update.kind(), MessageKind::ScalarUpdate);
        assert_eq!(terminal, Message::ScalarTerminal(scalar));
    }

    #[test]
    fn test_health_bits_are_exact() {
        let message = Message::HealthUpdate {
            entity: EntityId(9),
            health: 7.3,
        };
        assert_eq!(decode(&encode(&message)).unwrap(), message);
    }

    #[test]
    fn test_fire_order_slot_index() {
        let order = FireOrder {
            entity: EntityId(2),
            slot: SlotIndex(5),
            origin: Vec3::new(1.0, 2.0, 3.0),
            facing: Vec3::X,
        };
        match decode(&encode(&Message::FireRequest(order))).unwrap() {
            Message::FireRequest(back) => assert_eq!(back.slot, SlotIndex(5)),
            other => panic!("Expected FireRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode(&[]), Err(ProtocolError::Empty));
        assert_eq!(decode(&[200]), Err(ProtocolError::UnknownKind(200)));
        assert!(matches!(
            decode(&[MessageKind::FireRequest as u8, 0, 0, 0]),
            Err(ProtocolError::Truncated { expected: 32, actual: 3, .. })
        ));
    }
}
