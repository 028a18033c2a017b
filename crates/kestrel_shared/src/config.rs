//! # Game Configuration
//!
//! Every tunable the synchronization core reads. All of it is authored
//! externally (TOML), loaded once at startup, and read-only afterwards.
//!
//! ```toml
//! [movement]
//! acceleration = 500.0
//! max_velocity = 2000.0
//!
//! [replicator]
//! replications_per_second = 10
//! mode = "constant_velocity"
//! ```
//!
//! Every section and field is optional; anything missing keeps its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{CORRECTION_THRESHOLD_SQ, DEFAULT_POOL_CAPACITY, MAX_STEP};
use crate::error::{ConfigError, ConfigResult};

/// Movement Profile of a craft.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementProfile {
    /// Velocity gained per second at full forward input.
    pub acceleration: f32,
    /// Absolute velocity clamp.
    pub max_velocity: f32,
    /// Turn rate (degrees/s) reached at or above 75% of max velocity.
    pub turn_speed_default: f32,
    /// Exponent of the ease-out turn-speed curve.
    pub turn_ease_exponent: f32,
    /// Per-second velocity retention while coasting, in `[0, 1]`.
    pub friction: f32,
    /// Per-second velocity retention while braking, in `[0, 1]`.
    pub braking_friction: f32,
    /// Vertical displacement speed applied every tick (negative is down).
    pub gravity_speed: f32,
    /// Seconds between two accepted fire requests.
    pub fire_cooldown: f32,
    /// Health a craft spawns with.
    pub max_health: f32,
}

impl Default for MovementProfile {
    fn default() -> Self {
        Self {
            acceleration: 500.0,
            max_velocity: 2000.0,
            turn_speed_default: 100.0,
            turn_ease_exponent: 5.0,
            friction: 0.75,
            braking_friction: 0.001,
            gravity_speed: -980.0,
            fire_cooldown: 0.45,
            max_health: 10.0,
        }
    }
}

/// Interpolation used by an observer between scalar updates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothMode {
    /// Step toward the newest target at a rate derived from the replication interval.
    #[default]
    ConstantVelocity,
    /// Play back the crumb trail along a Catmull-Rom spline.
    Spline,
}

/// Settings of one replicated scalar.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicatorSettings {
    /// Unreliable updates sent per second while awake.
    pub replications_per_second: u32,
    /// Seconds a value must stay unchanged before the owner goes to sleep.
    pub sleep_after: f32,
    /// Observer-side interpolation.
    pub mode: SmoothMode,
    /// Granularity of the externally visible value (change notifications).
    pub quantum: f32,
}

impl ReplicatorSettings {
    /// Seconds between two unreliable updates.
    #[must_use]
    pub fn interval(&self) -> f32 {
        1.0 / self.replications_per_second.max(1) as f32
    }
}

impl Default for ReplicatorSettings {
    fn default() -> Self {
        Self {
            replications_per_second: 10,
            sleep_after: 1.0,
            mode: SmoothMode::ConstantVelocity,
            quantum: 0.01,
        }
    }
}

/// Settings of the observer-side movement reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationSettings {
    /// Largest step integrated for one sample (seconds).
    pub max_step: f32,
    /// Squared distance that triggers a correction.
    pub correction_threshold_sq: f32,
    /// Hide corrections behind a decaying visual offset instead of snapping.
    pub smoothing_enabled: bool,
    /// Offset length above which the fast catch-up speed is used.
    pub max_smooth_distance: f32,
    /// Decay speed while the offset is larger than `max_smooth_distance`.
    pub fast_interp_speed: f32,
    /// Decay speed once the offset is inside `max_smooth_distance`.
    pub slow_interp_speed: f32,
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self {
            max_step: MAX_STEP,
            correction_threshold_sq: CORRECTION_THRESHOLD_SQ,
            smoothing_enabled: true,
            max_smooth_distance: 250.0,
            fast_interp_speed: 12.0,
            slow_interp_speed: 4.0,
        }
    }
}

/// Rocket and ammunition settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileSettings {
    /// Rocket slots pre-allocated per craft.
    pub pool_capacity: usize,
    /// Seconds a rocket flies before exploding on its own.
    pub lifetime: f32,
    /// Rocket speed (units/s).
    pub speed: f32,
    /// Damage dealt on a direct hit.
    pub damage: f32,
    /// Length of the per-tick impact trace ahead of the rocket.
    pub trace_length: f32,
    /// Rate at which a rocket turns toward a facing correction.
    pub correction_rate: f32,
    /// Share of the client/server yaw drift removed when confirming a shot.
    pub facing_blend: f32,
    /// Skip the ammunition check entirely.
    pub unlimited: bool,
    /// Rockets a craft spawns with.
    pub starting_ammo: u32,
}

impl Default for ProjectileSettings {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            lifetime: 2.0,
            speed: 1300.0,
            damage: 2.0,
            trace_length: 100.0,
            correction_rate: 0.9,
            facing_blend: 0.5,
            unlimited: false,
            starting_ammo: 0,
        }
    }
}

/// Pickup settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupSettings {
    /// Rockets granted by a rocket pickup.
    pub rocket_amount: u32,
    /// Health restored by a health pickup.
    pub health_amount: f32,
    /// Seconds before a collected pickup becomes available again.
    pub reactivate_after: f32,
}

impl Default for PickupSettings {
    fn default() -> Self {
        Self {
            rocket_amount: 5,
            health_amount: 5.0,
            reactivate_after: 5.0,
        }
    }
}

/// Aggregate configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Craft movement.
    pub movement: MovementProfile,
    /// Scalar replication.
    pub replicator: ReplicatorSettings,
    /// Observer reconciliation.
    pub reconciliation: ReconciliationSettings,
    /// Rockets and ammunition.
    pub projectile: ProjectileSettings,
    /// Pickups.
    pub pickup: PickupSettings,
}

impl GameConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`GameConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks every range constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        let m = &self.movement;
        check_unit("movement.friction", m.friction)?;
        check_unit("movement.braking_friction", m.braking_friction)?;
        check_positive("movement.max_velocity", m.max_velocity)?;
        check_positive("movement.max_health", m.max_health)?;
        if m.fire_cooldown < 0.0 {
            return Err(ConfigError::Invalid("movement.fire_cooldown must be >= 0".into()));
        }

        let r = &self.replicator;
        if r.replications_per_second == 0 {
            return Err(ConfigError::Invalid(
                "replicator.replications_per_second must be >= 1".into(),
            ));
        }
        check_positive("replicator.sleep_after", r.sleep_after)?;
        check_positive("replicator.quantum", r.quantum)?;

        let c = &self.reconciliation;
        check_positive("reconciliation.max_step", c.max_step)?;
        if c.correction_threshold_sq < 0.0 {
            return Err(ConfigError::Invalid(
                "reconciliation.correction_threshold_sq must be >= 0".into(),
            ));
        }

        let p = &self.projectile;
        if p.pool_capacity == 0 {
            return Err(ConfigError::Invalid("projectile.pool_capacity must be >= 1".into()));
        }
        check_positive("projectile.lifetime", p.lifetime)?;
        check_unit("projectile.facing_blend", p.facing_blend)?;

        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {value}")))
    }
}

fn check_positive(name: &str, value: f32) -> ConfigResult<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be > 0, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_all_defaults() {
        let config = GameConfig::from_toml_str("").unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.replicator.replications_per_second, 10);
        assert_eq!(config.projectile.pool_capacity, 8);
    }

    #[test]
    fn test_partial_override() {
        let config = GameConfig::from_toml_str(
            r#"
            [movement]
            acceleration = 750.0

            [replicator]
            mode = "spline"
            "#,
        )
        .unwrap();

        assert_eq!(config.movement.acceleration, 750.0);
        assert_eq!(config.movement.max_velocity, 2000.0);
        assert_eq!(config.replicator.mode, SmoothMode::Spline);
    }

    #[test]
    fn test_rejects_out_of_range_friction() {
        let err = GameConfig::from_toml_str("[movement]\nfriction = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_rate() {
        let err =
            GameConfig::from_toml_str("[replicator]\nreplications_per_second = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = GameConfig::from_toml_str("[movement\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_bundled_config_parses() {
        let config = GameConfig::from_toml_str(include_str!("../../../data/kestrel.toml")).unwrap();
        assert_eq!(config.reconciliation.correction_threshold_sq, 40.0);
    }

    #[test]
    fn test_interval() {
        let settings = ReplicatorSettings::default();
        assert!((settings.interval() - 0.1).abs() < 1.0e-6);
    }
}
