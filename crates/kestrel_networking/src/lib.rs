//! # Kestrel Networking - The Synchronization Core
//!
//! Keeps a small rocket duel consistent across one server and several
//! clients over an unreliable network.
//!
//! ## Architecture
//!
//! - **Movement**: the controlling peer predicts its own craft every tick and
//!   streams samples; observers dead-reckon between samples and hide
//!   corrections behind a decaying visual offset
//! - **Scalars**: low-rate replication of named floats with tag ordering,
//!   crumb-trail smoothing and sleep when idle
//! - **Fire**: the controlling peer launches immediately, the server confirms
//!   against its own ammunition count or orders a rollback
//! - **Transport**: reliable and unreliable delivery over an in-process hub
//!   with seeded loss, jitter and duplication
//!
//! ## Authority Model
//!
//! ```text
//! CONTROLLING PEER                 SERVER                    OBSERVERS
//!   |--- Movement (unreliable) ---->|--- relay (unreliable) --->|
//!   |--- FireRequest (reliable) --->| <- checks its own ammo   |
//!   |<-- FireConfirmed / Rollback --|--- FireConfirmed -------->|
//! ```
//!
//! The server owns every count that matters. Clients only ever predict.
//!
//! ## Example
//!
//! ```rust,ignore
//! use kestrel_networking::{CraftInput, NetworkConditions, PeerId, Session};
//! use kestrel_shared::{GameConfig, Vec3};
//!
//! let mut session = Session::new(GameConfig::default(), NetworkConditions::GOOD, 7, 2);
//! let craft = session.spawn_craft(PeerId(1), Vec3::ZERO, 0.0);
//! session.peer_mut(PeerId(1)).unwrap().set_input(craft, CraftInput::new(1.0, 0.0, false))?;
//! session.run_for(5.0, 1.0 / 60.0);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod entity;
pub mod fire;
pub mod integration;
pub mod movement;
pub mod peer;
pub mod pickup;
pub mod projectile;
pub mod protocol;
pub mod reconciliation;
pub mod replicator;
pub mod session;
pub mod simulation;
pub mod smoothing;
pub mod sync_tag;
pub mod transport;
pub mod vitals;

// Re-exports for convenience
pub use entity::{AmmoHolder, Craft, Damageable, DebugObservable, DebugStats, Movable, Role};
pub use fire::{AmmoLedger, FireAuthority, FireDecision, FireRejection, Shooter};
pub use integration::{ArenaWorld, CosmeticChannel, EventChannel, World};
pub use movement::{CraftInput, Kinematics, MovementPredictor};
pub use peer::{Peer, PeerError, PeerResult};
pub use pickup::{Pickup, PickupGrant, PickupKind};
pub use projectile::{ProjectilePool, SlotIndex, SlotState};
pub use protocol::{FireOrder, Message, MessageKind, MovementSample, ProtocolError, ScalarMessage};
pub use reconciliation::{ReconcileOutcome, ReconciliationApplier};
pub use replicator::{ReplicatorSet, ScalarReplicator, ScalarSend};
pub use session::Session;
pub use simulation::NetworkConditions;
pub use smoothing::VisualSmoother;
pub use sync_tag::{SyncTag, SyncTagAllocator};
pub use transport::{Delivery, Envelope, LoopbackEndpoint, LoopbackNetwork, PeerId, Target, Transport};
pub use vitals::Health;
