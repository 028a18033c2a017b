//! # Reconciliation
//!
//! Observer-side consumption of movement samples. The server takes samples
//! verbatim through [`ReconciliationApplier::apply_authoritative`] instead.
//!
//! ## How It Works
//!
//! 1. Samples older than (or as old as) the last applied one are dropped
//! 2. Velocity is re-integrated with the sample's input over
//!    `min(t - last, max_step)`, so a stalled connection never produces one
//!    huge catch-up step
//! 3. Between samples the craft keeps moving along its facing at that
//!    velocity (dead reckoning in [`ReconciliationApplier::extrapolate`])
//! 4. If the sample is further than the threshold from where dead reckoning
//!    put the craft, the logical location snaps to the sample and the
//!    visual smoother absorbs the jump
//! 5. Facing always comes straight from the sample
//!
//! ```text
//! logical:  ──────────●  snap
//!                     │
//! visual:   ──────────╰──╮___ eases in
//! ```

use kestrel_shared::{EntityId, MovementProfile, ReconciliationSettings, Vec3};

use crate::integration::World;
use crate::movement::{integrate_velocity, FrameMovement, Kinematics};
use crate::protocol::MovementSample;
use crate::smoothing::VisualSmoother;

/// A correction that was applied to the logical location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correction {
    /// Distance between the extrapolated and the authoritative location.
    pub error: f32,
    /// Whether the jump is hidden by visual smoothing.
    pub smoothed: bool,
}

/// Result of feeding one sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReconcileOutcome {
    /// Not newer than the last applied sample; nothing changed.
    Stale,
    /// First sample: the craft was placed on it directly.
    Initialized,
    /// Sample applied.
    Applied {
        /// Integration step actually used.
        step: f32,
        /// Correction, if the error exceeded the threshold.
        correction: Option<Correction>,
    },
}

/// Counters for the debug readout.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReconciliationStats {
    /// Samples applied.
    pub applied: u64,
    /// Samples discarded as stale or duplicate.
    pub discarded: u64,
    /// Samples that needed a correction.
    pub corrections: u64,
    /// Largest correction seen.
    pub max_error: f32,
}

/// Observer-side movement state of one craft.
#[derive(Clone, Debug)]
pub struct ReconciliationApplier {
    settings: ReconciliationSettings,
    last_applied: Option<f64>,
    last_step: Option<f32>,
    smoother: VisualSmoother,
    frame: FrameMovement,
    stats: ReconciliationStats,
}

impl ReconciliationApplier {
    /// Creates an applier that has not seen any sample yet.
    #[must_use]
    pub fn new(settings: ReconciliationSettings) -> Self {
        Self {
            settings,
            last_applied: None,
            last_step: None,
            smoother: VisualSmoother::new(&settings),
            frame: FrameMovement::new(),
            stats: ReconciliationStats::default(),
        }
    }

    /// Timestamp of the newest applied sample.
    #[must_use]
    pub const fn last_applied(&self) -> Option<f64> {
        self.last_applied
    }

    /// Integration step used by the newest applied sample.
    #[must_use]
    pub const fn last_step(&self) -> Option<f32> {
        self.last_step
    }

    /// Cosmetic smoother.
    #[must_use]
    pub const fn smoother(&self) -> &VisualSmoother {
        &self.smoother
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> ReconciliationStats {
        self.stats
    }

    /// Where the mesh should be drawn.
    #[must_use]
    pub fn visual_location(&self, kinematics: &Kinematics) -> Vec3 {
        self.smoother.visual_position(kinematics.location)
    }

    /// Applies one authoritative sample.
    pub fn apply_sample<W: World + ?Sized>(
        &mut self,
        kinematics: &mut Kinematics,
        profile: &MovementProfile,
        sample: &MovementSample,
        world: &mut W,
        entity: EntityId,
    ) -> ReconcileOutcome {
        let Some(last) = self.last_applied else {
            kinematics.location = sample.world_location;
            kinematics.yaw = sample.facing_yaw;
            world.sync_body(entity, kinematics.location);
            self.last_applied = Some(sample.timestamp);
            self.stats.applied += 1;
            return ReconcileOutcome::Initialized;
        };

        if sample.timestamp <= last {
            self.stats.discarded += 1;
            tracing::debug!(%entity, t = sample.timestamp, last, "stale movement sample discarded");
            return ReconcileOutcome::Stale;
        }

        let step = ((sample.timestamp - last) as f32).min(self.settings.max_step);
        self.last_applied = Some(sample.timestamp);
        self.last_step = Some(step);
        self.stats.applied += 1;

        kinematics.velocity = integrate_velocity(
            profile,
            kinematics.velocity,
            sample.forward_input,
            sample.braking,
            step,
        );
        kinematics.yaw = sample.facing_yaw;

        let error_sq = kinematics.location.distance_squared(sample.world_location);
        let correction = if error_sq > self.settings.correction_threshold_sq {
            let smoothed = self.settings.smoothing_enabled;
            if smoothed {
                self.smoother
                    .start_correction(kinematics.location, sample.world_location);
            }
            kinematics.location = sample.world_location;
            world.sync_body(entity, kinematics.location);

            let error = error_sq.sqrt();
            self.stats.corrections += 1;
            self.stats.max_error = self.stats.max_error.max(error);
            tracing::debug!(%entity, error, smoothed, "movement correction");
            Some(Correction { error, smoothed })
        } else {
            None
        };

        ReconcileOutcome::Applied { step, correction }
    }

    /// Server side: takes a fresh sample as the craft's state, with no
    /// extrapolation and no smoothing. Stale samples are still discarded.
    pub fn apply_authoritative<W: World + ?Sized>(
        &mut self,
        kinematics: &mut Kinematics,
        profile: &MovementProfile,
        sample: &MovementSample,
        world: &mut W,
        entity: EntityId,
    ) -> ReconcileOutcome {
        let step = match self.last_applied {
            Some(last) if sample.timestamp <= last => {
                self.stats.discarded += 1;
                tracing::debug!(%entity, t = sample.timestamp, last, "stale movement sample discarded");
                return ReconcileOutcome::Stale;
            }
            Some(last) => Some(((sample.timestamp - last) as f32).min(self.settings.max_step)),
            None => None,
        };
        self.last_applied = Some(sample.timestamp);
        self.last_step = step.or(self.last_step);
        self.stats.applied += 1;

        if let Some(step) = step {
            kinematics.velocity = integrate_velocity(
                profile,
                kinematics.velocity,
                sample.forward_input,
                sample.braking,
                step,
            );
        }
        kinematics.location = sample.world_location;
        kinematics.yaw = sample.facing_yaw;
        world.sync_body(entity, kinematics.location);

        match step {
            Some(step) => ReconcileOutcome::Applied {
                step,
                correction: None,
            },
            None => ReconcileOutcome::Initialized,
        }
    }

    /// Dead-reckons the craft for one tick and decays the visual offset.
    pub fn extrapolate<W: World + ?Sized>(
        &mut self,
        kinematics: &mut Kinematics,
        profile: &MovementProfile,
        dt: f32,
        world: &mut W,
        entity: EntityId,
    ) {
        self.smoother.update(dt);
        if self.last_applied.is_none() {
            return;
        }
        self.frame.add_gravity(profile.gravity_speed, dt);
        self.frame
            .add_delta(kinematics.forward() * (kinematics.velocity * dt));
        kinematics.location = self.frame.resolve(world, entity, kinematics.location).final_location;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::ArenaWorld;

    fn sample_at(t: f64, x: f32) -> MovementSample {
        MovementSample {
            world_location: Vec3::new(x, 0.0, 0.0),
            facing_yaw: 0.0,
            timestamp: t,
            forward_input: 0.0,
            braking: false,
        }
    }

    struct Rig {
        applier: ReconciliationApplier,
        kin: Kinematics,
        profile: MovementProfile,
        world: ArenaWorld,
    }

    impl Rig {
        fn new(settings: ReconciliationSettings) -> Self {
            Self {
                applier: ReconciliationApplier::new(settings),
                kin: Kinematics::default(),
                profile: MovementProfile::default(),
                world: ArenaWorld::default(),
            }
        }

        fn apply(&mut self, sample: MovementSample) -> ReconcileOutcome {
            self.applier
                .apply_sample(&mut self.kin, &self.profile, &sample, &mut self.world, EntityId(1))
        }
    }

    #[test]
    fn test_older_sample_is_discarded() {
        let mut rig = Rig::new(ReconciliationSettings::default());
        assert_eq!(rig.apply(sample_at(100.0, 10.0)), ReconcileOutcome::Initialized);
        let before = rig.kin;

        assert_eq!(rig.apply(sample_at(99.0, 500.0)), ReconcileOutcome::Stale);
        assert_eq!(rig.apply(sample_at(100.0, 500.0)), ReconcileOutcome::Stale);
        assert_eq!(rig.kin, before);
        assert_eq!(rig.applier.last_applied(), Some(100.0));
        assert_eq!(rig.applier.stats().discarded, 2);
    }

    #[test]
    fn test_step_is_clamped_to_max_step() {
        let mut rig = Rig::new(ReconciliationSettings::default());
        rig.apply(sample_at(10.0, 0.0));

        match rig.apply(sample_at(10.05, 0.0)) {
            ReconcileOutcome::Applied { step, .. } => assert!((step - 0.05).abs() < 1e-6),
            other => panic!("Expected Applied, got {other:?}"),
        }
        match rig.apply(sample_at(12.0, 0.0)) {
            ReconcileOutcome::Applied { step, .. } => assert_eq!(step, 0.125),
            other => panic!("Expected Applied, got {other:?}"),
        }
    }

    #[test]
    fn test_small_error_keeps_extrapolation() {
        let mut rig = Rig::new(ReconciliationSettings::default());
        rig.apply(sample_at(1.0, 0.0));
        // 6 units: 36 < 40.
        match rig.apply(sample_at(1.1, 6.0)) {
            ReconcileOutcome::Applied { correction, .. } => assert!(correction.is_none()),
            other => panic!("Expected Applied, got {other:?}"),
        }
        assert_eq!(rig.kin.location, Vec3::ZERO);
    }

    #[test]
    fn test_large_error_snaps_logical_and_smooths_visual() {
        let mut rig = Rig::new(ReconciliationSettings::default());
        rig.apply(sample_at(1.0, 0.0));

        let outcome = rig.apply(sample_at(1.1, 50.0));
        match outcome {
            ReconcileOutcome::Applied {
                correction: Some(c),
                ..
            } => {
                assert!((c.error - 50.0).abs() < 1e-3);
                assert!(c.smoothed);
            }
            other => panic!("Expected a correction, got {other:?}"),
        }
        assert_eq!(rig.kin.location, Vec3::new(50.0, 0.0, 0.0));
        assert_eq!(rig.applier.visual_location(&rig.kin), Vec3::ZERO);

        let mut previous = rig.applier.smoother().offset().length();
        for _ in 0..30 {
            rig.applier
                .extrapolate(&mut rig.kin, &rig.profile, 1.0 / 60.0, &mut rig.world, EntityId(1));
            let now = rig.applier.smoother().offset().length();
            assert!(now < previous);
            previous = now;
        }
    }

    #[test]
    fn test_smoothing_disabled_snaps_visual_too() {
        let settings = ReconciliationSettings {
            smoothing_enabled: false,
            ..Default::default()
        };
        let mut rig = Rig::new(settings);
        rig.apply(sample_at(1.0, 0.0));
        rig.apply(sample_at(1.1, 50.0));
        assert_eq!(rig.applier.visual_location(&rig.kin), Vec3::new(50.0, 0.0, 0.0));
    }

    #[test]
    fn test_yaw_is_applied_directly() {
        let mut rig = Rig::new(ReconciliationSettings::default());
        rig.apply(sample_at(1.0, 0.0));
        let mut turned = sample_at(1.1, 0.0);
        turned.facing_yaw = 135.0;
        rig.apply(turned);
        assert_eq!(rig.kin.yaw, 135.0);
    }

    #[test]
    fn test_authoritative_sample_is_taken_verbatim() {
        let mut rig = Rig::new(ReconciliationSettings::default());
        let mut first = sample_at(1.0, 0.0);
        first.forward_input = 1.0;
        assert_eq!(
            rig.applier
                .apply_authoritative(&mut rig.kin, &rig.profile, &first, &mut rig.world, EntityId(1)),
            ReconcileOutcome::Initialized
        );

        // 3 units off: below the threshold, still taken as is.
        let mut next = sample_at(1.1, 3.0);
        next.facing_yaw = 45.0;
        next.forward_input = 1.0;
        let outcome = rig
            .applier
            .apply_authoritative(&mut rig.kin, &rig.profile, &next, &mut rig.world, EntityId(1));
        assert!(matches!(outcome, ReconcileOutcome::Applied { correction: None, .. }));
        assert_eq!(rig.kin.location, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(rig.kin.yaw, 45.0);
        assert!(rig.kin.velocity > 0.0);
        assert_eq!(rig.applier.visual_location(&rig.kin), rig.kin.location);

        let stale = sample_at(1.05, 90.0);
        assert_eq!(
            rig.applier
                .apply_authoritative(&mut rig.kin, &rig.profile, &stale, &mut rig.world, EntityId(1)),
            ReconcileOutcome::Stale
        );
        assert_eq!(rig.kin.location, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_velocity_follows_sample_input() {
        let mut rig = Rig::new(ReconciliationSettings::default());
        rig.apply(sample_at(1.0, 0.0));
        let mut throttle = sample_at(1.1, 0.0);
        throttle.forward_input = 1.0;
        rig.apply(throttle);

        let expected = integrate_velocity(&rig.profile, 0.0, 1.0, false, 0.1);
        assert!((rig.kin.velocity - expected).abs() < 1e-4);

        rig.applier
            .extrapolate(&mut rig.kin, &rig.profile, 0.1, &mut rig.world, EntityId(1));
        assert!(rig.kin.location.x > 0.0);
    }
}
