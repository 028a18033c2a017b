//! # Projectile Pool
//!
//! Fixed arena of rocket slots, allocated once per craft at spawn and
//! reused forever.
//!
//! ```text
//!        start_moving            explode / make_free
//! Free ───────────────> InFlight ───────────────────> Free
//! ```
//!
//! The slot index is the only identity a rocket has on the wire, so every
//! peer's pool for the same craft has the same capacity and the same
//! indices. Slots hold the owning entity's id, never a reference to it.

use std::collections::BTreeSet;

use kestrel_shared::{EntityId, ProjectileSettings, Vec3};

use crate::integration::World;

/// Index of a slot within one craft's pool.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(pub u8);

impl SlotIndex {
    /// Position in the pool.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Lifecycle state of a slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlotState {
    /// Available for launch.
    #[default]
    Free,
    /// Moving.
    InFlight,
}

/// One reusable rocket.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSlot {
    /// Craft owning the pool.
    pub owner: EntityId,
    /// Lifecycle state.
    pub state: SlotState,
    /// Launch point.
    pub origin: Vec3,
    /// Current location.
    pub location: Vec3,
    /// Unit direction of travel.
    pub facing: Vec3,
    /// Direction the facing is being eased toward.
    pub correction_target: Option<Vec3>,
    /// Seconds since launch.
    pub elapsed_lifetime: f32,
    /// Distance flown since launch.
    pub traveled_distance: f32,
}

impl ProjectileSlot {
    fn free(owner: EntityId) -> Self {
        Self {
            owner,
            state: SlotState::Free,
            origin: Vec3::ZERO,
            location: Vec3::ZERO,
            facing: Vec3::X,
            correction_target: None,
            elapsed_lifetime: 0.0,
            traveled_distance: 0.0,
        }
    }

    /// Returns true if the slot can be launched.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.state == SlotState::Free
    }
}

/// Why a rocket stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExplosionCause {
    /// Hit another craft.
    HitCraft(EntityId),
    /// Hit static geometry.
    Blocked,
    /// Lifetime ran out.
    Expired,
}

/// Something that happened to a slot during [`ProjectilePool::tick`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileEvent {
    /// Slot that exploded (it is already free again).
    pub slot: SlotIndex,
    /// Where it exploded.
    pub location: Vec3,
    /// Why.
    pub cause: ExplosionCause,
}

/// The rockets of one craft.
#[derive(Clone, Debug)]
pub struct ProjectilePool {
    owner: EntityId,
    slots: Vec<ProjectileSlot>,
    settings: ProjectileSettings,
}

impl ProjectilePool {
    /// Allocates every slot, all free.
    #[must_use]
    pub fn new(owner: EntityId, settings: ProjectileSettings) -> Self {
        let capacity = settings.pool_capacity.clamp(1, usize::from(u8::MAX) + 1);
        Self {
            owner,
            slots: vec![ProjectileSlot::free(owner); capacity],
            settings,
        }
    }

    /// Craft owning the pool.
    #[must_use]
    pub const fn owner(&self) -> EntityId {
        self.owner
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Damage a hit deals.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.settings.damage
    }

    /// Slot by index.
    #[must_use]
    pub fn slot(&self, slot: SlotIndex) -> Option<&ProjectileSlot> {
        self.slots.get(slot.index())
    }

    /// All slots.
    pub fn slots(&self) -> impl Iterator<Item = (SlotIndex, &ProjectileSlot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, s)| (SlotIndex(i as u8), s))
    }

    /// Slots currently moving.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_free()).count()
    }

    /// Lowest free slot not in `reserved`.
    #[must_use]
    pub fn find_free(&self, reserved: &BTreeSet<SlotIndex>) -> Option<SlotIndex> {
        self.slots()
            .find(|(index, slot)| slot.is_free() && !reserved.contains(index))
            .map(|(index, _)| index)
    }

    /// Returns true if `slot` exists and is free.
    #[must_use]
    pub fn is_free(&self, slot: SlotIndex) -> bool {
        self.slot(slot).is_some_and(ProjectileSlot::is_free)
    }

    /// Launches a free slot. Returns false if it is out of range or already moving.
    pub fn start_moving(&mut self, slot: SlotIndex, origin: Vec3, facing: Vec3) -> bool {
        let owner = self.owner;
        let Some(s) = self.slots.get_mut(slot.index()) else {
            return false;
        };
        if !s.is_free() {
            return false;
        }
        *s = ProjectileSlot {
            owner,
            state: SlotState::InFlight,
            origin,
            location: origin,
            facing: facing.normalized_or_zero(),
            correction_target: None,
            elapsed_lifetime: 0.0,
            traveled_distance: 0.0,
        };
        true
    }

    /// Eases an in-flight slot's facing toward `facing`. Returns false if the slot is free.
    pub fn apply_correction(&mut self, slot: SlotIndex, facing: Vec3) -> bool {
        match self.slots.get_mut(slot.index()) {
            Some(s) if !s.is_free() => {
                s.correction_target = Some(facing.normalized_or_zero());
                true
            }
            _ => false,
        }
    }

    /// Returns a slot to free regardless of state. Returns true if it was moving.
    pub fn make_free(&mut self, slot: SlotIndex) -> bool {
        let owner = self.owner;
        match self.slots.get_mut(slot.index()) {
            Some(s) => {
                let was_moving = !s.is_free();
                *s = ProjectileSlot::free(owner);
                was_moving
            }
            None => false,
        }
    }

    /// Explodes an in-flight slot, returning where it ended.
    pub fn explode(&mut self, slot: SlotIndex) -> Option<Vec3> {
        let location = self.slot(slot).filter(|s| !s.is_free())?.location;
        self.make_free(slot);
        Some(location)
    }

    /// Flies every in-flight slot for one tick.
    pub fn tick<W: World + ?Sized>(&mut self, dt: f32, world: &W) -> Vec<ProjectileEvent> {
        let mut events = Vec::new();
        for index in 0..self.slots.len() {
            let slot = SlotIndex(index as u8);
            if let Some((location, cause)) = self.fly(index, dt, world) {
                self.make_free(slot);
                events.push(ProjectileEvent {
                    slot,
                    location,
                    cause,
                });
            }
        }
        events
    }

    fn fly<W: World + ?Sized>(
        &mut self,
        index: usize,
        dt: f32,
        world: &W,
    ) -> Option<(Vec3, ExplosionCause)> {
        let settings = self.settings;
        let s = &mut self.slots[index];
        if s.is_free() {
            return None;
        }

        s.elapsed_lifetime += dt;
        if s.elapsed_lifetime >= settings.lifetime {
            return Some((s.location, ExplosionCause::Expired));
        }

        if let Some(target) = s.correction_target {
            s.facing = s.facing.slerp(target, settings.correction_rate * dt);
            if s.facing.dot(target) > 0.9999 {
                s.facing = target;
                s.correction_target = None;
            }
        }

        let step = settings.speed * dt;
        let reach = settings.trace_length.max(step);
        let ahead = s.location + s.facing * reach;
        if let Some(hit) = world.line_trace(s.location, ahead, s.owner) {
            let cause = hit
                .entity
                .map_or(ExplosionCause::Blocked, ExplosionCause::HitCraft);
            return Some((hit.location, cause));
        }

        s.location += s.facing * step;
        s.traveled_distance += step;
        None
    }
}
