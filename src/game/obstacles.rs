//! Obstacle colliders, segment casts and transient trigger probes.

use hashbrown::HashMap;

use crate::game::pool::EnemyHandle;
use crate::util::vec2::Vec2;

/// Collider shape in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { center: Vec2, radius: f32 },
    Aabb { min: Vec2, max: Vec2 },
}

impl Shape {
    /// Axis-aligned box from a center and half extents
    pub fn rect(center: Vec2, half_extents: Vec2) -> Self {
        Shape::Aabb {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        match *self {
            Shape::Circle { center, radius } => point.distance_sq_to(center) <= radius * radius,
            Shape::Aabb { min, max } => {
                point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
            }
        }
    }

    /// Distance along `dir` (unit) from `origin` to the first surface point,
    /// if within `max_distance`. A ray starting inside hits at 0.
    pub fn ray_distance(&self, origin: Vec2, dir: Vec2, max_distance: f32) -> Option<f32> {
        if self.contains(origin) {
            return Some(0.0);
        }
        let t = match *self {
            Shape::Circle { center, radius } => {
                let to_origin = origin - center;
                let b = to_origin.dot(dir);
                let c = to_origin.length_sq() - radius * radius;
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                -b - disc.sqrt()
            }
            Shape::Aabb { min, max } => {
                let mut t_min = f32::NEG_INFINITY;
                let mut t_max = f32::INFINITY;
                for (o, d, lo, hi) in [(origin.x, dir.x, min.x, max.x), (origin.y, dir.y, min.y, max.y)] {
                    if d.abs() < 1e-8 {
                        if o < lo || o > hi {
                            return None;
                        }
                    } else {
                        let inv = 1.0 / d;
                        let (t1, t2) = ((lo - o) * inv, (hi - o) * inv);
                        t_min = t_min.max(t1.min(t2));
                        t_max = t_max.min(t1.max(t2));
                    }
                }
                if t_max < t_min {
                    return None;
                }
                t_min
            }
        };
        (t >= 0.0 && t <= max_distance).then_some(t)
    }
}

/// Who a collider belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColliderOwner {
    /// Level geometry
    Static(u32),
    Player,
    Enemy(EnemyHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId(pub u32);

#[derive(Debug, Clone, Copy)]
pub struct Collider {
    pub id: ColliderId,
    pub shape: Shape,
    pub owner: ColliderOwner,
}

/// Nearest intersection of a cast
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub collider: ColliderId,
    pub owner: ColliderOwner,
    pub distance: f32,
    pub point: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeId(pub u32);

/// Transient trigger circle attached to an owner for the length of an action.
/// Probes never block casts; they only mark where the action's hitbox is.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub owner: ColliderOwner,
    pub center: Vec2,
    pub radius: f32,
}

/// Colliders on the obstacle layer plus live trigger probes
#[derive(Debug, Default)]
pub struct ObstacleField {
    colliders: Vec<Collider>,
    next_collider: u32,
    probes: HashMap<ProbeId, Probe>,
    next_probe: u32,
}

impl ObstacleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, shape: Shape, owner: ColliderOwner) -> ColliderId {
        let id = ColliderId(self.next_collider);
        self.next_collider += 1;
        self.colliders.push(Collider { id, shape, owner });
        id
    }

    /// Add level geometry; the owner tag is the collider id
    pub fn add_static(&mut self, shape: Shape) -> ColliderId {
        let owner = ColliderOwner::Static(self.next_collider);
        self.add(shape, owner)
    }

    pub fn remove(&mut self, id: ColliderId) -> bool {
        let before = self.colliders.len();
        self.colliders.retain(|c| c.id != id);
        self.colliders.len() != before
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Nearest obstacle hit along a ray of `max_distance`
    pub fn raycast(&self, origin: Vec2, dir: Vec2, max_distance: f32) -> Option<RayHit> {
        let dir = dir.normalize();
        if dir == Vec2::ZERO {
            return None;
        }
        self.colliders
            .iter()
            .filter_map(|c| {
                c.shape.ray_distance(origin, dir, max_distance).map(|distance| RayHit {
                    collider: c.id,
                    owner: c.owner,
                    distance,
                    point: origin + dir * distance,
                })
            })
            .min_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.collider.cmp(&b.collider))
            })
    }

    /// Nearest obstacle hit on the segment `start..end`
    pub fn linecast(&self, start: Vec2, end: Vec2) -> Option<RayHit> {
        let (dir, length) = (end - start).normalize_with_length();
        if length <= 0.0 {
            return None;
        }
        self.raycast(start, dir, length)
    }

    /// Register a trigger probe
    pub fn attach_probe(&mut self, owner: ColliderOwner, center: Vec2, radius: f32) -> ProbeId {
        let id = ProbeId(self.next_probe);
        self.next_probe = self.next_probe.wrapping_add(1);
        self.probes.insert(
            id,
            Probe {
                owner,
                center,
                radius,
            },
        );
        id
    }

    pub fn move_probe(&mut self, id: ProbeId, center: Vec2) {
        if let Some(probe) = self.probes.get_mut(&id) {
            probe.center = center;
        }
    }

    pub fn release_probe(&mut self, id: ProbeId) -> bool {
        self.probes.remove(&id).is_some()
    }

    pub fn probe(&self, id: ProbeId) -> Option<&Probe> {
        self.probes.get(&id)
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_circle_ray() {
        let shape = Shape::Circle {
            center: Vec2::new(5.0, 0.0),
            radius: 1.0,
        };
        let t = shape.ray_distance(Vec2::ZERO, Vec2::RIGHT, 10.0).unwrap();
        assert!((t - 4.0).abs() < EPSILON);
        assert!(shape.ray_distance(Vec2::ZERO, Vec2::UP, 10.0).is_none());
        assert!(shape.ray_distance(Vec2::ZERO, Vec2::RIGHT, 3.0).is_none());
        assert!(shape.ray_distance(Vec2::ZERO, Vec2::LEFT, 10.0).is_none());
    }

    #[test]
    fn test_aabb_ray() {
        let shape = Shape::rect(Vec2::new(5.0, 0.0), Vec2::new(1.0, 2.0));
        let t = shape.ray_distance(Vec2::ZERO, Vec2::RIGHT, 10.0).unwrap();
        assert!((t - 4.0).abs() < EPSILON);
        assert!(shape
            .ray_distance(Vec2::new(0.0, 3.0), Vec2::RIGHT, 10.0)
            .is_none());
        // Parallel ray inside the slab still hits
        assert!(shape
            .ray_distance(Vec2::new(5.0, -10.0), Vec2::UP, 20.0)
            .is_some());
    }

    #[test]
    fn test_start_inside_hits_at_zero() {
        let shape = Shape::Circle {
            center: Vec2::ZERO,
            radius: 1.0,
        };
        assert_eq!(shape.ray_distance(Vec2::ZERO, Vec2::RIGHT, 0.2), Some(0.0));
    }

    #[test]
    fn test_linecast_returns_nearest() {
        let mut field = ObstacleField::new();
        let far = field.add_static(Shape::Circle {
            center: Vec2::new(8.0, 0.0),
            radius: 0.5,
        });
        let near = field.add_static(Shape::rect(Vec2::new(3.0, 0.0), Vec2::new(0.5, 0.5)));

        let hit = field.linecast(Vec2::ZERO, Vec2::new(10.0, 0.0)).unwrap();
        assert_eq!(hit.collider, near);
        assert!((hit.point.x - 2.5).abs() < EPSILON);

        assert!(field.remove(near));
        let hit = field.linecast(Vec2::ZERO, Vec2::new(10.0, 0.0)).unwrap();
        assert_eq!(hit.collider, far);

        assert!(field.linecast(Vec2::ZERO, Vec2::new(5.0, 0.0)).is_none());
        assert!(field.linecast(Vec2::ZERO, Vec2::ZERO).is_none());
    }

    #[test]
    fn test_probe_lifecycle() {
        let mut field = ObstacleField::new();
        let id = field.attach_probe(ColliderOwner::Player, Vec2::ZERO, 0.5);
        assert_eq!(field.probe_count(), 1);
        field.move_probe(id, Vec2::new(1.0, 1.0));
        assert_eq!(field.probe(id).unwrap().center, Vec2::new(1.0, 1.0));
        assert!(field.release_probe(id));
        assert!(!field.release_probe(id));
        assert_eq!(field.probe_count(), 0);
    }
}
