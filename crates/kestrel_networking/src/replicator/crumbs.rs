//! Crumb trail: the last few targets an observer received, with the
//! receiver clock at which each one arrived.

use std::collections::VecDeque;

/// One received target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crumb {
    /// Target value.
    pub value: f32,
    /// Receiver clock (seconds) when it arrived.
    pub received_at: f64,
}

impl Crumb {
    /// Seconds between `earlier` arriving and this crumb arriving.
    #[must_use]
    pub fn gap_since(&self, earlier: f64) -> f32 {
        (self.received_at - earlier).max(0.0) as f32
    }
}

/// Bounded history of received targets with a playback cursor.
///
/// When full, pushing drops the oldest crumb. The cursor marks the next
/// crumb spline playback will head for; constant-velocity smoothing only
/// looks at the newest one.
#[derive(Clone, Debug)]
pub struct CrumbTrail {
    crumbs: VecDeque<Crumb>,
    capacity: usize,
    cursor: usize,
}

impl CrumbTrail {
    /// Creates an empty trail.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            crumbs: VecDeque::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// Appends a target received at `received_at`, evicting the oldest when full.
    pub fn push(&mut self, value: f32, received_at: f64) {
        if self.crumbs.len() == self.capacity {
            self.crumbs.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
        }
        self.crumbs.push_back(Crumb { value, received_at });
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.crumbs.clear();
        self.cursor = 0;
    }

    /// Number of crumbs held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.crumbs.len()
    }

    /// Returns true if no crumbs are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.crumbs.is_empty()
    }

    /// Crumbs not yet reached by playback.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.crumbs.len() - self.cursor
    }

    /// Crumb playback is heading for, and the one after it.
    #[must_use]
    pub fn upcoming(&self) -> Option<(Crumb, Option<Crumb>)> {
        let next = *self.crumbs.get(self.cursor)?;
        Some((next, self.crumbs.get(self.cursor + 1).copied()))
    }

    /// Marks the upcoming crumb as reached.
    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1).min(self.crumbs.len());
    }

    /// Newest crumb.
    #[must_use]
    pub fn latest(&self) -> Option<Crumb> {
        self.crumbs.back().copied()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = Crumb> + '_ {
        self.crumbs.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(trail: &CrumbTrail) -> Vec<f32> {
        trail.iter().map(|c| c.value).collect()
    }

    #[test]
    fn test_trail_is_bounded() {
        let mut trail = CrumbTrail::new(10);
        for i in 0..25 {
            trail.push(i as f32, f64::from(i) * 0.1);
        }
        assert_eq!(trail.len(), 10);
        assert_eq!(values(&trail)[0], 15.0);
        assert_eq!(trail.latest().map(|c| c.value), Some(24.0));
    }

    #[test]
    fn test_cursor_survives_eviction() {
        let mut trail = CrumbTrail::new(3);
        trail.push(1.0, 0.0);
        trail.push(2.0, 0.1);
        trail.advance();
        assert_eq!(trail.upcoming().map(|(next, after)| (next.value, after)), Some((2.0, None)));

        trail.push(3.0, 0.2);
        trail.push(4.0, 0.3);
        // 1.0 evicted; cursor still on 2.0.
        let (next, after) = trail.upcoming().expect("crumbs pending");
        assert_eq!(next.value, 2.0);
        assert_eq!(after.map(|c| c.value), Some(3.0));
        assert_eq!(trail.pending(), 3);
    }

    #[test]
    fn test_arrival_gaps_are_kept() {
        let mut trail = CrumbTrail::new(4);
        trail.push(1.0, 0.0);
        trail.push(2.0, 0.05);
        trail.push(3.0, 0.45);
        let arrivals: Vec<f64> = trail.iter().map(|c| c.received_at).collect();
        assert_eq!(arrivals, vec![0.0, 0.05, 0.45]);
        let newest = trail.latest().expect("three crumbs");
        assert!((newest.gap_since(0.05) - 0.4).abs() < 1e-6);
        assert_eq!(newest.gap_since(1.0), 0.0);
    }

    #[test]
    fn test_advance_stops_at_end() {
        let mut trail = CrumbTrail::new(3);
        trail.push(1.0, 0.0);
        trail.advance();
        trail.advance();
        assert_eq!(trail.pending(), 0);
        assert_eq!(trail.upcoming(), None);
    }
}
