//! # Network Protocol
//!
//! Every message a peer can exchange, and its wire form.
//!
//! ## Datagram Structure
//!
//! ```text
//! ┌──────────────┬────────────────────────────────────────────┐
//! │ Kind (1)     │ Payload (fixed size per kind, Pod layout)   │
//! └──────────────┴────────────────────────────────────────────┘
//! ```
//!
//! Delivery guarantees are not part of the datagram: the sender picks
//! them per send (see [`crate::transport::Delivery`]).

mod messages;
mod packets;
mod serialization;

pub use messages::{FireOrder, Message, MessageKind, MovementSample, ScalarMessage};
pub use packets::{EntityWordPacket, FirePacket, MovementPacket, ScalarPacket};
pub use serialization::{
    decode, encode, MessageReader, MessageWriter, ProtocolError, ProtocolResult,
    MAX_MESSAGE_SIZE,
};
