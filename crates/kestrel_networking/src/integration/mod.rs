//! # Integration Layer
//!
//! The two collaborators the core talks to but does not own: the world
//! (collision queries) and the presentation layer (cosmetic events).

pub mod events;
pub mod world;

pub use events::{CosmeticChannel, EventChannel, DEFAULT_EVENT_CAPACITY};
pub use world::{ArenaWorld, SweepResult, TraceHit, World};
