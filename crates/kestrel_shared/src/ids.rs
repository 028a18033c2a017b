//! Identities that are safe to send across the network.
//!
//! Nothing here refers to memory on another peer: an id is only meaningful
//! after the receiving peer resolves it against its own tables.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Identity of a replicated entity, identical on every peer.
#[repr(transparent)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Index of a replicated scalar within its entity's replicator set.
#[repr(transparent)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct ScalarChannel(pub u16);

impl std::fmt::Display for ScalarChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}
