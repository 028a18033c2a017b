//! Mathematical types shared by every peer.
//!
//! World space is Z-up; a yaw of 0 degrees faces +X and positive yaw turns
//! toward +Y. These are the canonical representations used on the wire.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 3D Vector - position, velocity, direction
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit X vector (yaw 0 forward)
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit Z vector (up)
    pub const UP: Self = Self::new(0.0, 0.0, 1.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Distance squared (avoids sqrt)
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        (self - other).length_squared()
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or zero for a degenerate vector.
    #[must_use]
    pub fn normalized_or_zero(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Returns true when every component is within `tolerance` of zero.
    #[must_use]
    pub fn is_nearly_zero(self, tolerance: f32) -> bool {
        self.x.abs() <= tolerance && self.y.abs() <= tolerance && self.z.abs() <= tolerance
    }

    /// Linear interpolation.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// Unit direction for a yaw in degrees (horizontal plane).
    #[must_use]
    pub fn from_yaw(yaw_degrees: f32) -> Self {
        let (sin, cos) = yaw_degrees.to_radians().sin_cos();
        Self::new(cos, sin, 0.0)
    }

    /// Yaw in degrees of the horizontal part of this vector.
    #[must_use]
    pub fn yaw(self) -> f32 {
        if self.x.abs() <= f32::EPSILON && self.y.abs() <= f32::EPSILON {
            return 0.0;
        }
        self.y.atan2(self.x).to_degrees()
    }

    /// Spherical interpolation between two directions.
    ///
    /// Both inputs are normalized first; `t` is clamped to `[0, 1]`. Nearly
    /// parallel directions fall back to a normalized lerp.
    #[must_use]
    pub fn slerp(self, other: Self, t: f32) -> Self {
        let a = self.normalized_or_zero();
        let b = other.normalized_or_zero();
        let t = t.clamp(0.0, 1.0);
        let dot = a.dot(b).clamp(-1.0, 1.0);
        let theta = dot.acos();
        if theta.abs() < 1.0e-4 {
            return a.lerp(b, t).normalized_or_zero();
        }
        let sin_theta = theta.sin();
        if sin_theta.abs() < 1.0e-4 {
            // Opposite directions: any great circle works, go through the up axis.
            let mid = Self::UP;
            return if t < 0.5 {
                a.slerp(mid, t * 2.0)
            } else {
                mid.slerp(b, (t - 0.5) * 2.0)
            };
        }
        let wa = ((1.0 - t) * theta).sin() / sin_theta;
        let wb = (t * theta).sin() / sin_theta;
        (a * wa + b * wb).normalized_or_zero()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Wraps an angle in degrees into `(-180, 180]`.
#[must_use]
pub fn normalize_axis(degrees: f32) -> f32 {
    let mut angle = degrees % 360.0;
    if angle > 180.0 {
        angle -= 360.0;
    } else if angle <= -180.0 {
        angle += 360.0;
    }
    angle
}

/// Shortest signed rotation in degrees that takes `from` to `to`.
#[must_use]
pub fn delta_angle_degrees(from: f32, to: f32) -> f32 {
    normalize_axis(to - from)
}

/// Ease-out between `a` and `b`: fast at first, flattening toward `b`.
///
/// `alpha` is clamped to `[0, 1]`; larger exponents flatten sooner.
#[must_use]
pub fn interp_ease_out(a: f32, b: f32, alpha: f32, exponent: f32) -> f32 {
    let alpha = alpha.clamp(0.0, 1.0);
    let eased = 1.0 - (1.0 - alpha).powf(exponent);
    a + (b - a) * eased
}

/// Moves `current` toward `target` at a constant rate, never overshooting.
#[must_use]
pub fn interp_constant_to(current: f32, target: f32, dt: f32, speed: f32) -> f32 {
    let delta = target - current;
    let step = speed * dt;
    if step <= 0.0 || delta.abs() <= step {
        target
    } else {
        current + step * delta.signum()
    }
}

/// Moves a vector toward zero exponentially; `speed * dt` of the remainder
/// is removed per call (clamped to the whole remainder).
#[must_use]
pub fn decay_toward_zero(offset: Vec3, dt: f32, speed: f32) -> Vec3 {
    if speed <= 0.0 {
        return Vec3::ZERO;
    }
    let alpha = (dt * speed).clamp(0.0, 1.0);
    offset * (1.0 - alpha)
}

/// Catmull-Rom spline through `p1..p2` with `p0`/`p3` as tangent guides.
#[must_use]
pub fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Packs an angle in degrees into a single byte (1.4 degree resolution).
#[must_use]
pub fn compress_axis_to_byte(degrees: f32) -> u8 {
    let wrapped = degrees.rem_euclid(360.0);
    ((wrapped * 256.0 / 360.0).round() as u32 & 0xFF) as u8
}

/// Inverse of [`compress_axis_to_byte`], in `[0, 360)`.
#[must_use]
pub fn decompress_axis_from_byte(byte: u8) -> f32 {
    f32::from(byte) * 360.0 / 256.0
}
