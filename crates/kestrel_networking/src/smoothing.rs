//! # Visual Correction Smoothing
//!
//! When reconciliation snaps an observed craft, the logical position jumps
//! and the mesh should not.
//!
//! ## Architecture:
//! - **Logical Position**: where the craft IS (collision, traces, samples)
//! - **Visual Position**: where it APPEARS, logical plus a cosmetic offset
//! - On a correction the offset absorbs the jump (`old - new`), then decays
//!   toward zero every tick
//!
//! ```text
//! offset |\
//!        | \__        fast while |offset| > max_smooth_distance
//!        |    \______ slow once inside it
//!        +------------------------> ticks
//! ```

use kestrel_shared::math::decay_toward_zero;
use kestrel_shared::{ReconciliationSettings, Vec3};

/// Offsets shorter than this are considered settled.
const SETTLED_DISTANCE: f32 = 0.01;

/// Cosmetic offset between the logical and the rendered location.
#[derive(Clone, Debug)]
pub struct VisualSmoother {
    offset: Vec3,
    max_smooth_distance: f32,
    fast_speed: f32,
    slow_speed: f32,
    /// Statistics: total corrections absorbed.
    pub total_corrections: u32,
}

impl VisualSmoother {
    /// Creates a smoother with no offset.
    #[must_use]
    pub fn new(settings: &ReconciliationSettings) -> Self {
        Self {
            offset: Vec3::ZERO,
            max_smooth_distance: settings.max_smooth_distance,
            fast_speed: settings.fast_interp_speed,
            slow_speed: settings.slow_interp_speed,
            total_corrections: 0,
        }
    }

    /// Absorbs a logical jump from `old_logical` to `new_logical`.
    ///
    /// Offsets accumulate, so a second correction while the first is still
    /// decaying keeps the mesh continuous.
    pub fn start_correction(&mut self, old_logical: Vec3, new_logical: Vec3) {
        self.offset += old_logical - new_logical;
        self.total_corrections += 1;
    }

    /// Decays the offset for one tick.
    pub fn update(&mut self, dt: f32) {
        if !self.is_correcting() {
            self.offset = Vec3::ZERO;
            return;
        }
        let speed = if self.offset.length() > self.max_smooth_distance {
            self.fast_speed
        } else {
            self.slow_speed
        };
        self.offset = decay_toward_zero(self.offset, dt, speed);
    }

    /// Where the mesh should be drawn.
    #[must_use]
    pub fn visual_position(&self, logical: Vec3) -> Vec3 {
        logical + self.offset
    }

    /// Remaining cosmetic offset.
    #[must_use]
    pub const fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Returns true if a correction is still being hidden.
    #[must_use]
    pub fn is_correcting(&self) -> bool {
        self.offset.length_squared() > SETTLED_DISTANCE * SETTLED_DISTANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ReconciliationSettings {
        ReconciliationSettings::default()
    }

    #[test]
    fn test_correction_starts_at_old_visual() {
        let mut smoother = VisualSmoother::new(&settings());
        let old = Vec3::new(0.0, 0.0, 0.0);
        let new = Vec3::new(50.0, 0.0, 0.0);
        smoother.start_correction(old, new);

        // Right after the snap the mesh has not moved.
        assert_eq!(smoother.visual_position(new), old);
        assert!(smoother.is_correcting());
        assert_eq!(smoother.total_corrections, 1);
    }

    #[test]
    fn test_offset_shrinks_monotonically_to_zero() {
        let mut smoother = VisualSmoother::new(&settings());
        smoother.start_correction(Vec3::ZERO, Vec3::new(50.0, 0.0, 0.0));

        let mut previous = smoother.offset().length();
        for _ in 0..600 {
            smoother.update(1.0 / 60.0);
            let now = smoother.offset().length();
            assert!(now <= previous);
            previous = now;
        }
        assert!(!smoother.is_correcting());
    }

    #[test]
    fn test_large_offsets_decay_faster() {
        let s = settings();
        let mut far = VisualSmoother::new(&s);
        let mut near = VisualSmoother::new(&s);
        far.start_correction(Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0));
        near.start_correction(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0));

        far.update(0.05);
        near.update(0.05);

        let far_ratio = far.offset().length() / 1000.0;
        let near_ratio = near.offset().length() / 100.0;
        assert!(far_ratio < near_ratio);
    }
}
