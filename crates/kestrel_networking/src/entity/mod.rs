//! # Entity Shell
//!
//! A craft is a thin shell composing independent capabilities:
//!
//! ```text
//!                 ┌──────────── Craft ─────────────┐
//! Movable ───────>│ Kinematics + predictor/reconc. │
//! Damageable ────>│ Health                         │
//! AmmoHolder ────>│ AmmoLedger + Shooter + pool    │
//! DebugObservable>│ counters from all of the above │
//!                 └────────────────────────────────┘
//! ```
//!
//! ## Roles
//!
//! Role is never stored. It is derived on demand from the craft's owning
//! peer and the transport's local and server peers:
//!
//! | local is server | local owns craft | role              |
//! |-----------------|------------------|-------------------|
//! | yes             | any              | Authority         |
//! | no              | yes              | ControllingProxy  |
//! | no              | no               | ObservingProxy    |
//!
//! A listen server owning a craft is Authority AND locally controlled.

mod craft;

pub use craft::{Craft, HitReport, MUZZLE_OFFSET};

use kestrel_shared::{EntityId, Vec3};

use crate::integration::{CosmeticChannel, World};
use crate::pickup::PickupGrant;
use crate::transport::{PeerId, Transport};
use crate::vitals::Health;

/// Role of one entity instance on one peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// This process is the source of truth.
    Authority,
    /// This process drives the entity but does not own the truth.
    ControllingProxy,
    /// This process only receives and renders.
    ObservingProxy,
}

impl Role {
    /// Resolves the role of an entity owned by `owner`, as seen from `local`.
    #[must_use]
    pub fn resolve(owner: PeerId, local: PeerId, server: PeerId) -> Self {
        if local == server {
            Self::Authority
        } else if local == owner {
            Self::ControllingProxy
        } else {
            Self::ObservingProxy
        }
    }
}

/// Collaborators a craft reaches during a step or a message.
pub struct Context<'a> {
    /// This process's network endpoint.
    pub transport: &'a mut dyn Transport,
    /// Collision.
    pub world: &'a mut dyn World,
    /// Presentation notifications.
    pub events: &'a CosmeticChannel,
}

impl Context<'_> {
    /// Returns true if this process is the server.
    #[must_use]
    pub fn is_server(&self) -> bool {
        self.transport.is_server()
    }

    /// This process.
    #[must_use]
    pub fn local_peer(&self) -> PeerId {
        self.transport.local_peer()
    }
}

/// Something that moves.
pub trait Movable {
    /// Logical location.
    fn location(&self) -> Vec3;

    /// Facing yaw in degrees.
    fn facing_yaw(&self) -> f32;

    /// Signed speed along the facing.
    fn velocity(&self) -> f32;

    /// Where the mesh should be drawn.
    fn visual_location(&self) -> Vec3;
}

/// Something that takes damage.
pub trait Damageable {
    /// Current health.
    fn health(&self) -> Health;

    /// Server side: applies damage and publishes the new health.
    /// Returns true if health changed.
    fn on_hit(&mut self, damage: f32, ctx: &mut Context<'_>) -> bool;
}

/// Something that carries rockets.
pub trait AmmoHolder {
    /// Count the controlling peer believes it has.
    fn predicted_ammo(&self) -> u32;

    /// Authoritative count (server only).
    fn server_ammo(&self) -> u32;

    /// Server side: applies a collected pickup.
    fn on_pickup(&mut self, grant: PickupGrant, ctx: &mut Context<'_>);
}

/// Snapshot for the debug overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugStats {
    /// Entity.
    pub entity: EntityId,
    /// Role on this peer.
    pub role: Role,
    /// Logical location.
    pub location: Vec3,
    /// Facing yaw packed into one byte.
    pub yaw_byte: u8,
    /// Signed speed.
    pub velocity: f32,
    /// Current health.
    pub health: f32,
    /// Predicted rockets.
    pub predicted_ammo: u32,
    /// Authoritative rockets.
    pub server_ammo: u32,
    /// Rockets in flight.
    pub rockets_in_flight: usize,
    /// Movement samples discarded as stale.
    pub stale_samples: u64,
    /// Corrections applied.
    pub corrections: u64,
    /// Round trip estimate in seconds.
    pub round_trip: f32,
}

/// Something the debug overlay can inspect.
pub trait DebugObservable {
    /// Current counters.
    fn debug_stats(&self, transport: &dyn Transport) -> DebugStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_resolution() {
        let server = PeerId(0);
        let a = PeerId(1);
        let b = PeerId(2);

        assert_eq!(Role::resolve(a, server, server), Role::Authority);
        assert_eq!(Role::resolve(server, server, server), Role::Authority);
        assert_eq!(Role::resolve(a, a, server), Role::ControllingProxy);
        assert_eq!(Role::resolve(a, b, server), Role::ObservingProxy);
        assert_eq!(Role::resolve(server, a, server), Role::ObservingProxy);
    }
}
