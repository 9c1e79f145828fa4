//! Target selection over the detection set and line-of-sight tests.
//!
//! All queries are read-only. Ties on distance go to the lower pool handle so
//! results do not depend on set iteration order.

use std::cmp::Ordering;

use crate::game::detection::DetectionSet;
use crate::game::obstacles::{ColliderOwner, ObstacleField};
use crate::game::pool::{EnemyHandle, EnemyPool};
use crate::util::vec2::Vec2;

/// A resolved target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetChoice {
    pub handle: EnemyHandle,
    pub position: Vec2,
    pub distance: f32,
}

fn closer(a: &TargetChoice, b: &TargetChoice) -> Ordering {
    a.distance
        .partial_cmp(&b.distance)
        .unwrap_or(Ordering::Equal)
        .then(a.handle.cmp(&b.handle))
}

/// Live detected enemies with their distance from `origin`
fn candidates<'a>(
    origin: Vec2,
    detected: &'a DetectionSet,
    pool: &'a EnemyPool,
) -> impl Iterator<Item = TargetChoice> + 'a {
    detected.iter().filter_map(move |handle| {
        pool.get_alive(handle).map(|enemy| TargetChoice {
            handle,
            position: enemy.position,
            distance: origin.distance_to(enemy.position),
        })
    })
}

/// Closest live enemy in the detection set
pub fn nearest_enemy(
    origin: Vec2,
    detected: &DetectionSet,
    pool: &EnemyPool,
) -> Option<TargetChoice> {
    candidates(origin, detected, pool).min_by(closer)
}

/// Closest live enemy within `threshold_degrees` of `direction` and ahead of it
pub fn nearest_in_cone(
    origin: Vec2,
    direction: Vec2,
    threshold_degrees: f32,
    detected: &DetectionSet,
    pool: &EnemyPool,
) -> Option<TargetChoice> {
    let direction = direction.normalize();
    if direction == Vec2::ZERO {
        return None;
    }
    candidates(origin, detected, pool)
        .filter(|c| {
            let to_enemy = (c.position - origin).normalize();
            direction.angle_between_degrees(to_enemy) <= threshold_degrees
                && direction.dot(to_enemy) > 0.0
        })
        .min_by(closer)
}

/// Segment `start..end` crosses an obstacle that belongs to neither the mover
/// nor the target. Only the nearest hit is considered.
pub fn is_obstacle_between(
    field: &ObstacleField,
    start: Vec2,
    end: Vec2,
    mover: ColliderOwner,
    target: ColliderOwner,
) -> bool {
    match field.linecast(start, end) {
        Some(hit) if hit.owner != mover && hit.owner != target => {
            tracing::trace!(
                "Line of sight blocked by {:?} at ({:.2}, {:.2})",
                hit.owner,
                hit.point.x,
                hit.point.y
            );
            true
        }
        _ => false,
    }
}

/// Short forward cast used while travelling
pub fn is_obstructed_ahead(
    field: &ObstacleField,
    origin: Vec2,
    direction: Vec2,
    distance: f32,
    mover: ColliderOwner,
    target: ColliderOwner,
) -> bool {
    match field.raycast(origin, direction, distance) {
        Some(hit) => hit.owner != mover && hit.owner != target,
        None => false,
    }
}
