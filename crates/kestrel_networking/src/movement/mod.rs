//! # Craft Movement
//!
//! Integration of input into yaw, scalar velocity and position.
//!
//! ## One Tick
//!
//! ```text
//! turn speed = ease_out(0, turn_speed_default, |v| / (0.75 * max_v))
//! yaw       += (v > 0 ? turn : -turn) * turn speed * dt
//! v         += forward * acceleration * dt
//! v          = clamp(v, -max_v, max_v) * friction^dt
//! frame     += forward_vector(yaw) * v * dt + gravity * dt
//! location   = world.sweep(frame)
//! ```
//!
//! The controlling peer runs the whole tick in [`MovementPredictor`].
//! Observers reuse [`integrate_velocity`] inside reconciliation so both
//! sides agree on how velocity evolves between samples.

mod frame;

pub use frame::FrameMovement;

use kestrel_shared::math::{interp_ease_out, normalize_axis};
use kestrel_shared::{EntityId, MovementProfile, Vec3};

use crate::integration::World;
use crate::protocol::MovementSample;

/// Speed ratio at which the full turn speed is reached.
const FULL_TURN_SPEED_RATIO: f32 = 0.75;

/// Input axes for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CraftInput {
    /// Throttle in `[-1, 1]`.
    pub forward: f32,
    /// Steering in `[-1, 1]`.
    pub turn: f32,
    /// Brake held.
    pub braking: bool,
}

impl CraftInput {
    /// Creates an input with both axes clamped to `[-1, 1]`.
    #[must_use]
    pub fn new(forward: f32, turn: f32, braking: bool) -> Self {
        Self {
            forward: forward.clamp(-1.0, 1.0),
            turn: turn.clamp(-1.0, 1.0),
            braking,
        }
    }
}

/// Location, facing and scalar velocity of a craft.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Kinematics {
    /// Root location.
    pub location: Vec3,
    /// Facing yaw in degrees.
    pub yaw: f32,
    /// Signed speed along the facing direction.
    pub velocity: f32,
}

impl Kinematics {
    /// Creates a craft at rest.
    #[must_use]
    pub const fn at_rest(location: Vec3, yaw: f32) -> Self {
        Self {
            location,
            yaw,
            velocity: 0.0,
        }
    }

    /// Unit facing direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        Vec3::from_yaw(self.yaw)
    }

    /// `|velocity|` as a fraction of the profile's maximum.
    #[must_use]
    pub fn speed_ratio(&self, profile: &MovementProfile) -> f32 {
        if profile.max_velocity <= 0.0 {
            return 0.0;
        }
        (self.velocity.abs() / profile.max_velocity).clamp(0.0, 1.0)
    }
}

/// Turn rate in degrees per second at `velocity`.
#[must_use]
pub fn turn_speed(profile: &MovementProfile, velocity: f32) -> f32 {
    let full = profile.max_velocity * FULL_TURN_SPEED_RATIO;
    let alpha = if full > 0.0 {
        (velocity.abs() / full).clamp(0.0, 1.0)
    } else {
        0.0
    };
    interp_ease_out(0.0, profile.turn_speed_default, alpha, profile.turn_ease_exponent)
}

/// Yaw after turning for `dt`. Steering inverts while reversing.
#[must_use]
pub fn integrate_yaw(profile: &MovementProfile, yaw: f32, velocity: f32, turn: f32, dt: f32) -> f32 {
    let direction = if velocity > 0.0 { turn } else { -turn };
    normalize_axis(yaw + direction * turn_speed(profile, velocity) * dt)
}

/// Velocity after `dt` of throttle, clamp and friction.
#[must_use]
pub fn integrate_velocity(
    profile: &MovementProfile,
    velocity: f32,
    forward: f32,
    braking: bool,
    dt: f32,
) -> f32 {
    let friction = if braking {
        profile.braking_friction
    } else {
        profile.friction
    };
    let v = velocity + forward * profile.acceleration * dt;
    let v = v.clamp(-profile.max_velocity, profile.max_velocity);
    v * friction.powf(dt)
}

/// Owner-side movement simulation.
///
/// Runs only where a craft is locally controlled, once per tick, and
/// produces the sample that every other peer reconciles against.
#[derive(Clone, Debug, Default)]
pub struct MovementPredictor {
    frame: FrameMovement,
    clock: f64,
    ticks: u64,
}

impl MovementPredictor {
    /// Creates a predictor with its clock at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frame: FrameMovement::new(),
            clock: 0.0,
            ticks: 0,
        }
    }

    /// Sender clock stamped into the next sample.
    #[must_use]
    pub const fn clock(&self) -> f64 {
        self.clock
    }

    /// Ticks simulated so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulates one tick and returns the sample to publish.
    pub fn tick<W: World + ?Sized>(
        &mut self,
        kinematics: &mut Kinematics,
        profile: &MovementProfile,
        input: CraftInput,
        dt: f32,
        world: &mut W,
        entity: EntityId,
    ) -> MovementSample {
        kinematics.yaw = integrate_yaw(profile, kinematics.yaw, kinematics.velocity, input.turn, dt);
        kinematics.velocity =
            integrate_velocity(profile, kinematics.velocity, input.forward, input.braking, dt);

        self.frame.add_gravity(profile.gravity_speed, dt);
        self.frame
            .add_delta(kinematics.forward() * (kinematics.velocity * dt));
        let result = self.frame.resolve(world, entity, kinematics.location);
        kinematics.location = result.final_location;

        self.clock += f64::from(dt);
        self.ticks += 1;

        let sample = MovementSample {
            world_location: kinematics.location,
            facing_yaw: kinematics.yaw,
            timestamp: self.clock,
            forward_input: input.forward,
            braking: input.braking,
        };
        tracing::trace!(%entity, t = sample.timestamp, v = kinematics.velocity, "movement sample");
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::ArenaWorld;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_turn_speed_eases_in_with_speed() {
        let profile = MovementProfile::default();
        assert_eq!(turn_speed(&profile, 0.0), 0.0);
        let full = profile.max_velocity * 0.75;
        assert!((turn_speed(&profile, full) - profile.turn_speed_default).abs() < 1e-3);
        assert!((turn_speed(&profile, profile.max_velocity) - profile.turn_speed_default).abs() < 1e-3);
        // Ease-out: half of the ratio already gives most of the turn rate.
        assert!(turn_speed(&profile, full * 0.5) > profile.turn_speed_default * 0.9);
    }

    #[test]
    fn test_steering_inverts_in_reverse() {
        let profile = MovementProfile::default();
        let forward = integrate_yaw(&profile, 0.0, 1000.0, 1.0, 0.1);
        let reverse = integrate_yaw(&profile, 0.0, -1000.0, 1.0, 0.1);
        assert!(forward > 0.0);
        assert!((forward + reverse).abs() < 1e-4);
    }

    #[test]
    fn test_velocity_clamps_then_decays() {
        let profile = MovementProfile::default();
        let v = integrate_velocity(&profile, 1990.0, 1.0, false, 1.0);
        assert!((v - profile.max_velocity * profile.friction).abs() < 1e-2);

        let coast = integrate_velocity(&profile, 100.0, 0.0, false, 1.0);
        assert!((coast - 75.0).abs() < 1e-3);

        let brake = integrate_velocity(&profile, 100.0, 0.0, true, 1.0);
        assert!(brake < 1.0);
    }

    #[test]
    fn test_predictor_moves_along_facing() {
        let profile = MovementProfile::default();
        let mut world = ArenaWorld::default();
        let mut kin = Kinematics::at_rest(Vec3::ZERO, 0.0);
        let mut predictor = MovementPredictor::new();
        let input = CraftInput::new(1.0, 0.0, false);

        let mut last = None;
        for _ in 0..60 {
            let sample = predictor.tick(&mut kin, &profile, input, DT, &mut world, EntityId(1));
            if let Some(prev) = last {
                assert!(sample.timestamp > prev);
            }
            last = Some(sample.timestamp);
        }

        assert!(kin.velocity > 0.0);
        assert!(kin.location.x > 0.0);
        assert!(kin.location.y.abs() < 1e-3);
        assert_eq!(kin.location.z, 0.0);
        assert_eq!(predictor.ticks(), 60);
        assert_eq!(world.body(EntityId(1)), Some(kin.location));
    }

    #[test]
    fn test_input_is_clamped() {
        let input = CraftInput::new(3.0, -7.0, false);
        assert_eq!(input.forward, 1.0);
        assert_eq!(input.turn, -1.0);
    }
}
