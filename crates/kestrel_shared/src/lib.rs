//! # Kestrel Shared
//!
//! Common types used by every peer, whether it is the server, the controlling
//! client of a craft, or a client merely observing it.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on the transport. Anything that sends or
//! receives bytes belongs in `kestrel_networking`.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod ids;
pub mod math;

pub use config::{
    GameConfig, MovementProfile, PickupSettings, ProjectileSettings, ReconciliationSettings,
    ReplicatorSettings, SmoothMode,
};
pub use constants::{DEFAULT_POOL_CAPACITY, MAX_STEP, TICK_RATE};
pub use error::{ConfigError, ConfigResult};
pub use events::CosmeticEvent;
pub use ids::{EntityId, ScalarChannel};
pub use math::Vec3;
