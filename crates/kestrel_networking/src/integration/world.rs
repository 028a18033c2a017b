//! # World Collaborator
//!
//! Collision is not ours. The core asks the world exactly two questions:
//!
//! - "move this body by this much": one swept move per tick per craft
//! - "what is along this segment": one line trace per tick per rocket
//!
//! [`ArenaWorld`] is a deliberately small reference world (flat floor,
//! square walls, sphere bodies) that the session, tests and benches use.

use std::collections::HashMap;

use kestrel_shared::{EntityId, Vec3};

/// Something a sweep or trace ran into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceHit {
    /// Body that was hit; `None` for static geometry.
    pub entity: Option<EntityId>,
    /// Impact point.
    pub location: Vec3,
}

/// Outcome of a swept move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepResult {
    /// Where the body ended up.
    pub final_location: Vec3,
    /// Blocking hit, if the move was cut short.
    pub hit: Option<TraceHit>,
}

/// Collision queries consumed by movement and projectiles.
pub trait World {
    /// Moves `entity` from `start` by `delta`, stopping at blocking geometry.
    fn sweep(&mut self, entity: EntityId, start: Vec3, delta: Vec3) -> SweepResult;

    /// Closest hit along `start..end`, ignoring `ignore`'s own body.
    fn line_trace(&self, start: Vec3, end: Vec3, ignore: EntityId) -> Option<TraceHit>;

    /// Teleports a body (snaps from reconciliation).
    fn sync_body(&mut self, entity: EntityId, location: Vec3);
}

/// Flat square arena with sphere bodies.
#[derive(Clone, Debug)]
pub struct ArenaWorld {
    half_extent: f32,
    body_radius: f32,
    bodies: HashMap<EntityId, Vec3>,
}

impl ArenaWorld {
    /// Default half width of the arena.
    pub const DEFAULT_HALF_EXTENT: f32 = 5000.0;

    /// Default body radius.
    pub const DEFAULT_BODY_RADIUS: f32 = 50.0;

    /// Creates an arena spanning `[-half_extent, half_extent]` on both axes.
    #[must_use]
    pub fn new(half_extent: f32, body_radius: f32) -> Self {
        Self {
            half_extent,
            body_radius,
            bodies: HashMap::new(),
        }
    }

    /// Radius of every body.
    #[must_use]
    pub const fn body_radius(&self) -> f32 {
        self.body_radius
    }

    /// Location of a body, if registered.
    #[must_use]
    pub fn body(&self, entity: EntityId) -> Option<Vec3> {
        self.bodies.get(&entity).copied()
    }

    /// Removes a body.
    pub fn remove_body(&mut self, entity: EntityId) {
        self.bodies.remove(&entity);
    }

    fn clamp_to_arena(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(-self.half_extent, self.half_extent),
            point.y.clamp(-self.half_extent, self.half_extent),
            point.z.max(0.0),
        )
    }

    /// Fraction along `start..end` where the segment leaves the arena walls.
    fn wall_fraction(&self, start: Vec3, end: Vec3) -> Option<f32> {
        let mut best: Option<f32> = None;
        for (s, e) in [(start.x, end.x), (start.y, end.y)] {
            let wall = if e > self.half_extent {
                self.half_extent
            } else if e < -self.half_extent {
                -self.half_extent
            } else {
                continue;
            };
            let span = e - s;
            let t = if span.abs() > f32::EPSILON {
                ((wall - s) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            best = Some(best.map_or(t, |b| b.min(t)));
        }
        best
    }

    /// Fraction along `start..end` of the first contact with a sphere.
    fn sphere_fraction(start: Vec3, end: Vec3, center: Vec3, radius: f32) -> Option<f32> {
        let d = end - start;
        let f = start - center;
        let c = f.length_squared() - radius * radius;
        if c <= 0.0 {
            return Some(0.0);
        }
        let a = d.length_squared();
        if a <= f32::EPSILON {
            return None;
        }
        let b = 2.0 * f.dot(d);
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let t = (-b - disc.sqrt()) / (2.0 * a);
        (0.0..=1.0).contains(&t).then_some(t)
    }
}

impl Default for ArenaWorld {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HALF_EXTENT, Self::DEFAULT_BODY_RADIUS)
    }
}

impl World for ArenaWorld {
    fn sweep(&mut self, entity: EntityId, start: Vec3, delta: Vec3) -> SweepResult {
        let wanted = start + delta;
        let final_location = self.clamp_to_arena(wanted);
        let blocked_horizontally =
            (final_location.x - wanted.x).abs() > 0.0 || (final_location.y - wanted.y).abs() > 0.0;
        let hit = blocked_horizontally.then_some(TraceHit {
            entity: None,
            location: final_location,
        });
        self.bodies.insert(entity, final_location);
        SweepResult {
            final_location,
            hit,
        }
    }

    fn line_trace(&self, start: Vec3, end: Vec3, ignore: EntityId) -> Option<TraceHit> {
        let mut best: Option<(f32, Option<EntityId>)> =
            self.wall_fraction(start, end).map(|t| (t, None));

        if end.z < 0.0 && start.z >= 0.0 {
            let t = start.z / (start.z - end.z);
            if best.map_or(true, |(b, _)| t < b) {
                best = Some((t, None));
            }
        }

        for (&entity, &center) in &self.bodies {
            if entity == ignore {
                continue;
            }
            if let Some(t) = Self::sphere_fraction(start, end, center, self.body_radius) {
                if best.map_or(true, |(b, _)| t < b) {
                    best = Some((t, Some(entity)));
                }
            }
        }

        best.map(|(t, entity)| TraceHit {
            entity,
            location: start.lerp(end, t),
        })
    }

    fn sync_body(&mut self, entity: EntityId, location: Vec3) {
        self.bodies.insert(entity, location);
    }
}
