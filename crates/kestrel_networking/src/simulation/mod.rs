//! # Network Simulation
//!
//! Network conditions applied by the loopback hub.
//!
//! ## Features
//!
//! - Latency between a minimum and a maximum (jitter, hence reordering)
//! - Packet loss
//! - Duplicate packets
//!
//! Rolls come from a seeded `StdRng` owned by the hub, so a session replays
//! identically for the same seed.

use rand::Rng;

/// Network conditions for simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NetworkConditions {
    /// Lowest one-way latency in milliseconds.
    pub min_latency_ms: u32,
    /// Highest one-way latency in milliseconds.
    pub max_latency_ms: u32,
    /// Packet loss percentage (0-100).
    pub packet_loss_percent: u8,
    /// Duplicate packet percentage (0-100).
    pub duplicate_percent: u8,
}

impl NetworkConditions {
    /// Perfect network conditions: instant, lossless.
    pub const PERFECT: Self = Self {
        min_latency_ms: 0,
        max_latency_ms: 0,
        packet_loss_percent: 0,
        duplicate_percent: 0,
    };

    /// Good network conditions (fiber).
    pub const GOOD: Self = Self {
        min_latency_ms: 15,
        max_latency_ms: 25,
        packet_loss_percent: 0,
        duplicate_percent: 0,
    };

    /// Average network conditions (cable).
    pub const AVERAGE: Self = Self {
        min_latency_ms: 30,
        max_latency_ms: 70,
        packet_loss_percent: 1,
        duplicate_percent: 1,
    };

    /// Poor network conditions (mobile/wifi).
    pub const POOR: Self = Self {
        min_latency_ms: 50,
        max_latency_ms: 150,
        packet_loss_percent: 5,
        duplicate_percent: 2,
    };

    /// Hostile conditions used by the chaos tests: heavy loss and jitter.
    pub const HOSTILE: Self = Self {
        min_latency_ms: 20,
        max_latency_ms: 200,
        packet_loss_percent: 20,
        duplicate_percent: 10,
    };

    /// Draws a one-way latency in seconds.
    #[must_use]
    pub fn sample_latency<R: Rng>(&self, rng: &mut R) -> f64 {
        let low = self.min_latency_ms.min(self.max_latency_ms);
        let high = self.min_latency_ms.max(self.max_latency_ms);
        let ms = if high > low {
            rng.gen_range(low..=high)
        } else {
            low
        };
        f64::from(ms) / 1000.0
    }

    /// Returns true if the packet should be dropped.
    #[must_use]
    pub fn should_drop<R: Rng>(&self, rng: &mut R) -> bool {
        self.packet_loss_percent > 0 && rng.gen_range(0u8..100) < self.packet_loss_percent
    }

    /// Returns true if the packet should arrive twice.
    #[must_use]
    pub fn should_duplicate<R: Rng>(&self, rng: &mut R) -> bool {
        self.duplicate_percent > 0 && rng.gen_range(0u8..100) < self.duplicate_percent
    }

    /// Expected round trip in seconds, using the mean latency.
    #[must_use]
    pub fn mean_round_trip(&self) -> f32 {
        (self.min_latency_ms + self.max_latency_ms) as f32 / 1000.0
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::GOOD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_latency_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let conditions = NetworkConditions::POOR;
        for _ in 0..1000 {
            let latency = conditions.sample_latency(&mut rng);
            assert!((0.05..=0.15).contains(&latency), "latency {latency}");
        }
    }

    #[test]
    fn test_perfect_never_drops() {
        let mut rng = StdRng::seed_from_u64(1);
        let conditions = NetworkConditions::PERFECT;
        for _ in 0..1000 {
            assert!(!conditions.should_drop(&mut rng));
            assert!(!conditions.should_duplicate(&mut rng));
            assert_eq!(conditions.sample_latency(&mut rng), 0.0);
        }
    }

    #[test]
    fn test_loss_rate_is_roughly_honored() {
        let mut rng = StdRng::seed_from_u64(42);
        let conditions = NetworkConditions::HOSTILE;
        let dropped = (0..10_000).filter(|_| conditions.should_drop(&mut rng)).count();
        // 20% +- a generous margin.
        assert!((1500..2500).contains(&dropped), "dropped {dropped}");
    }
}
