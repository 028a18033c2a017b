//! # Simulation Constants
//!
//! Values every peer must agree on. Tunables that designers change live in
//! [`crate::config`] instead.

/// Nominal simulation rate (steps per second) used by the session loop.
pub const TICK_RATE: u32 = 60;

/// Nominal step length in seconds.
pub const TICK_DT: f32 = 1.0 / TICK_RATE as f32;

/// Largest catch-up step a reconciliation may integrate in one go (seconds).
pub const MAX_STEP: f32 = 0.125;

/// Squared distance beyond which an observed craft needs a correction.
pub const CORRECTION_THRESHOLD_SQ: f32 = 40.0;

/// Rocket slots pre-allocated per craft.
pub const DEFAULT_POOL_CAPACITY: usize = 8;

/// Crumbs kept per replicated scalar.
pub const CRUMB_TRAIL_CAPACITY: usize = 10;

/// Maximum datagram size (MTU-safe).
pub const MAX_PACKET_SIZE: usize = 1200;
