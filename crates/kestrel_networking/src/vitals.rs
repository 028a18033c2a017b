//! Craft health.
//!
//! Only the server applies damage or healing; every other peer overwrites
//! its copy from the reliable `HealthUpdate` broadcast.

/// Current and maximum health.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Returns true at zero health.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    /// Applies damage, clamped at zero. Returns true if health changed.
    pub fn on_hit(&mut self, damage: f32) -> bool {
        self.set((self.current - damage.max(0.0)).max(0.0))
    }

    /// Heals, clamped at max. Returns true if health changed.
    pub fn heal(&mut self, amount: f32) -> bool {
        self.set((self.current + amount.max(0.0)).min(self.max))
    }

    /// Overwrites with an authoritative value. Returns true if it changed.
    pub fn set(&mut self, value: f32) -> bool {
        let value = value.clamp(0.0, self.max);
        if (value - self.current).abs() <= f32::EPSILON {
            return false;
        }
        self.current = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut health = Health::new(10.0);
        assert!(health.on_hit(4.0));
        assert_eq!(health.current(), 6.0);
        assert!(health.on_hit(100.0));
        assert_eq!(health.current(), 0.0);
        assert!(health.is_depleted());
        assert!(!health.on_hit(1.0));
    }

    #[test]
    fn test_heal_clamps_at_max() {
        let mut health = Health::new(10.0);
        assert!(!health.heal(5.0));
        health.on_hit(8.0);
        assert!(health.heal(5.0));
        assert_eq!(health.current(), 7.0);
        health.heal(50.0);
        assert_eq!(health.current(), 10.0);
    }

    #[test]
    fn test_negative_amounts_do_nothing() {
        let mut health = Health::new(10.0);
        assert!(!health.on_hit(-3.0));
        health.on_hit(5.0);
        assert!(!health.heal(-3.0));
        assert_eq!(health.current(), 5.0);
    }
}
