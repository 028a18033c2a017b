//! # Pickups
//!
//! Server-side resource dispensers. A craft overlapping an active pickup
//! collects it once; the pickup then stays dormant until its reactivation
//! time has passed. What a pickup looks like while dormant is presentation
//! and lives elsewhere.

use kestrel_shared::{PickupSettings, Vec3};

/// What a pickup grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickupKind {
    /// Rockets, added to the authoritative ammo count.
    Rockets,
    /// Health, clamped at the craft's max.
    Health,
}

/// One collected pickup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PickupGrant {
    /// Rockets granted.
    Rockets(u32),
    /// Health restored.
    Health(f32),
}

/// A pickup placed in the arena.
#[derive(Clone, Debug)]
pub struct Pickup {
    kind: PickupKind,
    location: Vec3,
    radius: f32,
    rocket_amount: u32,
    health_amount: f32,
    reactivate_after: f64,
    available_at: f64,
}

impl Pickup {
    /// Default overlap radius.
    pub const DEFAULT_RADIUS: f32 = 100.0;

    /// Creates an active pickup.
    #[must_use]
    pub fn new(kind: PickupKind, location: Vec3, settings: &PickupSettings) -> Self {
        Self {
            kind,
            location,
            radius: Self::DEFAULT_RADIUS,
            rocket_amount: settings.rocket_amount,
            health_amount: settings.health_amount,
            reactivate_after: f64::from(settings.reactivate_after),
            available_at: 0.0,
        }
    }

    /// What it grants.
    #[must_use]
    pub const fn kind(&self) -> PickupKind {
        self.kind
    }

    /// Where it is.
    #[must_use]
    pub const fn location(&self) -> Vec3 {
        self.location
    }

    /// Returns true if it can be collected at `now`.
    #[must_use]
    pub fn is_active(&self, now: f64) -> bool {
        now >= self.available_at
    }

    /// Returns true if a craft at `location` overlaps it.
    #[must_use]
    pub fn overlaps(&self, location: Vec3) -> bool {
        self.location.distance_squared(location) <= self.radius * self.radius
    }

    /// Collects the pickup if it is active.
    pub fn try_collect(&mut self, now: f64) -> Option<PickupGrant> {
        if !self.is_active(now) {
            return None;
        }
        self.available_at = now + self.reactivate_after;
        Some(match self.kind {
            PickupKind::Rockets => PickupGrant::Rockets(self.rocket_amount),
            PickupKind::Health => PickupGrant::Health(self.health_amount),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_once_then_reactivate() {
        let mut pickup = Pickup::new(PickupKind::Rockets, Vec3::ZERO, &PickupSettings::default());
        assert_eq!(pickup.try_collect(1.0), Some(PickupGrant::Rockets(5)));
        assert_eq!(pickup.try_collect(1.1), None);
        assert_eq!(pickup.try_collect(5.9), None);
        assert!(pickup.is_active(6.0));
        assert_eq!(pickup.try_collect(6.0), Some(PickupGrant::Rockets(5)));
    }

    #[test]
    fn test_health_pickup() {
        let mut pickup = Pickup::new(PickupKind::Health, Vec3::ZERO, &PickupSettings::default());
        assert_eq!(pickup.try_collect(0.0), Some(PickupGrant::Health(5.0)));
    }

    #[test]
    fn test_overlap_radius() {
        let pickup = Pickup::new(PickupKind::Rockets, Vec3::ZERO, &PickupSettings::default());
        assert!(pickup.overlaps(Vec3::new(99.0, 0.0, 0.0)));
        assert!(!pickup.overlaps(Vec3::new(101.0, 0.0, 0.0)));
    }
}
