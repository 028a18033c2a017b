//! Frame movement accumulator.
//!
//! Everything that moves a craft during one tick (its own velocity,
//! gravity, future knockback) is added here and resolved against the world
//! in a single sweep, so collision is evaluated once per tick, not once per
//! force.

use kestrel_shared::{EntityId, Vec3};

use crate::integration::{SweepResult, World};

/// Displacement gathered over one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameMovement {
    delta: Vec3,
    contributions: u32,
}

impl FrameMovement {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delta: Vec3::ZERO,
            contributions: 0,
        }
    }

    /// Adds a displacement.
    pub fn add_delta(&mut self, delta: Vec3) {
        self.delta += delta;
        self.contributions += 1;
    }

    /// Adds gravity for `dt` seconds.
    pub fn add_gravity(&mut self, gravity_speed: f32, dt: f32) {
        self.add_delta(Vec3::new(0.0, 0.0, gravity_speed * dt));
    }

    /// Accumulated displacement.
    #[must_use]
    pub const fn delta(&self) -> Vec3 {
        self.delta
    }

    /// Returns true if nothing was added.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.contributions == 0
    }

    /// Resolves the whole frame against the world and clears the accumulator.
    pub fn resolve<W: World + ?Sized>(
        &mut self,
        world: &mut W,
        entity: EntityId,
        start: Vec3,
    ) -> SweepResult {
        let delta = std::mem::take(self).delta;
        world.sweep(entity, start, delta)
    }
}
