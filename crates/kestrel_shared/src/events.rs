//! Cosmetic notifications.
//!
//! These are emitted by the synchronization core and consumed by the
//! presentation layer (HUD, particles, sounds). Nothing in the core ever
//! reads them back, so dropping every event changes no simulation outcome.

use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, ScalarChannel};
use crate::math::Vec3;

/// Event for the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CosmeticEvent {
    /// The quantized value of a replicated scalar changed.
    ValueChanged {
        /// Entity owning the scalar.
        entity: EntityId,
        /// Scalar within the entity.
        channel: ScalarChannel,
        /// New value (already quantized).
        value: f32,
    },

    /// Health of a craft changed.
    HealthChanged {
        /// Craft.
        entity: EntityId,
        /// Current health.
        health: f32,
        /// Maximum health.
        max_health: f32,
    },

    /// The locally visible rocket count changed.
    AmmoChanged {
        /// Craft.
        entity: EntityId,
        /// Rockets available.
        count: u32,
    },

    /// A rocket slot started moving.
    RocketLaunched {
        /// Craft owning the pool.
        entity: EntityId,
        /// Slot index within the pool.
        slot: u8,
        /// Launch point.
        origin: Vec3,
    },

    /// A rocket slot exploded or was recalled.
    RocketExploded {
        /// Craft owning the pool.
        entity: EntityId,
        /// Slot index within the pool.
        slot: u8,
        /// Where it ended.
        location: Vec3,
    },

    /// An observed craft was corrected toward its authoritative position.
    CorrectionApplied {
        /// Craft.
        entity: EntityId,
        /// Distance between the local and authoritative position.
        error: f32,
        /// Whether the correction is being hidden by visual smoothing.
        smoothed: bool,
    },
}

impl CosmeticEvent {
    /// Entity the event is about.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match self {
            Self::ValueChanged { entity, .. }
            | Self::HealthChanged { entity, .. }
            | Self::AmmoChanged { entity, .. }
            | Self::RocketLaunched { entity, .. }
            | Self::RocketExploded { entity, .. }
            | Self::CorrectionApplied { entity, .. } => *entity,
        }
    }
}
