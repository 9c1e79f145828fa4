//! Enemies believed to be inside the player's detection radius.
//!
//! The set is fed by enter/exit events from a proximity sensor on the physics
//! step and corrected by periodic authoritative re-scans through the spatial
//! grid. Removals found while iterating are queued and applied afterwards.

use rustc_hash::FxHashSet;

use crate::game::pool::{EnemyHandle, EnemyPool};
use crate::game::spatial::EnemyGrid;
use crate::util::vec2::Vec2;

/// Range event produced by the proximity sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionEvent {
    Entered(EnemyHandle),
    Exited(EnemyHandle),
}

/// Outcome of an authoritative re-scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescanReport {
    /// Live enemies in range that the events had missed
    pub added: usize,
    /// Stale or out-of-range handles purged
    pub removed: usize,
}

#[derive(Debug, Default)]
pub struct DetectionSet {
    members: FxHashSet<EnemyHandle>,
    pending_removals: Vec<EnemyHandle>,
}

impl DetectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: DetectionEvent) {
        match event {
            DetectionEvent::Entered(handle) => {
                self.members.insert(handle);
            }
            DetectionEvent::Exited(handle) => {
                self.members.remove(&handle);
            }
        }
    }

    /// Queue a removal to be applied by `flush`
    pub fn schedule_removal(&mut self, handle: EnemyHandle) {
        self.pending_removals.push(handle);
    }

    /// Apply queued removals. Returns how many members were removed.
    pub fn flush(&mut self) -> usize {
        let mut removed = 0;
        for handle in self.pending_removals.drain(..) {
            if self.members.remove(&handle) {
                removed += 1;
            }
        }
        removed
    }

    /// Remove immediately. Only valid outside an iteration over the set.
    pub fn remove(&mut self, handle: EnemyHandle) -> bool {
        self.members.remove(&handle)
    }

    #[inline]
    pub fn contains(&self, handle: EnemyHandle) -> bool {
        self.members.contains(&handle)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EnemyHandle> + '_ {
        self.members.iter().copied()
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.pending_removals.clear();
    }

    /// Rebuild the grid and reconcile the set against it: add live enemies in
    /// range, purge handles that are stale, dead, or out of range.
    pub fn rescan(
        &mut self,
        center: Vec2,
        radius: f32,
        pool: &EnemyPool,
        grid: &mut EnemyGrid,
    ) -> RescanReport {
        grid.rebuild(pool);

        let mut report = RescanReport::default();
        for entry in grid.query_radius(center, radius) {
            if self.members.insert(entry.handle) {
                report.added += 1;
            }
        }

        let radius_sq = radius * radius;
        for handle in &self.members {
            let keep = pool
                .get_alive(*handle)
                .is_some_and(|e| e.position.distance_sq_to(center) <= radius_sq);
            if !keep {
                self.pending_removals.push(*handle);
            }
        }
        report.removed = self.flush();

        if report.added > 0 || report.removed > 0 {
            tracing::debug!(
                "Detection re-scan corrected set: +{} -{} ({} tracked)",
                report.added,
                report.removed,
                self.members.len()
            );
        }
        report
    }
}

/// Physics-side contact tracker. Emits an event whenever a collidable enemy
/// crosses the sensor radius, or when a tracked handle stops existing.
#[derive(Debug, Default)]
pub struct ProximitySensor {
    contacts: FxHashSet<EnemyHandle>,
}

impl ProximitySensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sense(&mut self, center: Vec2, radius: f32, pool: &EnemyPool) -> Vec<DetectionEvent> {
        let radius_sq = radius * radius;
        let mut events = Vec::new();

        for (handle, enemy) in pool.iter_active() {
            let inside =
                enemy.collidable && enemy.position.distance_sq_to(center) <= radius_sq;
            match (inside, self.contacts.contains(&handle)) {
                (true, false) => {
                    self.contacts.insert(handle);
                    events.push(DetectionEvent::Entered(handle));
                }
                (false, true) => {
                    self.contacts.remove(&handle);
                    events.push(DetectionEvent::Exited(handle));
                }
                _ => {}
            }
        }

        let vanished: Vec<EnemyHandle> = self
            .contacts
            .iter()
            .copied()
            .filter(|h| !pool.contains(*h))
            .collect();
        for handle in vanished {
            self.contacts.remove(&handle);
            events.push(DetectionEvent::Exited(handle));
        }
        events
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn clear(&mut self) {
        self.contacts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(pool: &mut EnemyPool, position: Vec2) -> EnemyHandle {
        let handle = pool.acquire().unwrap();
        pool.get_mut(handle).unwrap().spawn_at(position, None);
        handle
    }

    #[test]
    fn test_sensor_enter_exit() {
        let mut pool = EnemyPool::new(4, 4);
        let a = spawn(&mut pool, Vec2::new(3.0, 0.0));
        let b = spawn(&mut pool, Vec2::new(8.0, 0.0));
        let mut sensor = ProximitySensor::new();
        let mut set = DetectionSet::new();

        for event in sensor.sense(Vec2::ZERO, 5.0, &pool) {
            set.apply(event);
        }
        assert!(set.contains(a));
        assert!(!set.contains(b));

        pool.get_mut(a).unwrap().position = Vec2::new(6.0, 0.0);
        pool.get_mut(b).unwrap().position = Vec2::new(4.0, 0.0);
        let events = sensor.sense(Vec2::ZERO, 5.0, &pool);
        assert_eq!(events.len(), 2);
        for event in events {
            set.apply(event);
        }
        assert!(!set.contains(a));
        assert!(set.contains(b));
    }

    #[test]
    fn test_sensor_exit_on_death_and_release() {
        let mut pool = EnemyPool::new(2, 2);
        let a = spawn(&mut pool, Vec2::new(1.0, 0.0));
        let mut sensor = ProximitySensor::new();
        assert_eq!(sensor.sense(Vec2::ZERO, 5.0, &pool).len(), 1);

        pool.get_mut(a).unwrap().take_damage(100);
        assert_eq!(
            sensor.sense(Vec2::ZERO, 5.0, &pool),
            vec![DetectionEvent::Exited(a)]
        );

        let b = spawn(&mut pool, Vec2::new(1.0, 0.0));
        sensor.sense(Vec2::ZERO, 5.0, &pool);
        pool.release(b);
        assert_eq!(
            sensor.sense(Vec2::ZERO, 5.0, &pool),
            vec![DetectionEvent::Exited(b)]
        );
        assert_eq!(sensor.contact_count(), 0);
    }

    #[test]
    fn test_rescan_adds_missed_and_purges_stale() {
        let mut pool = EnemyPool::new(4, 4);
        let near = spawn(&mut pool, Vec2::new(2.0, 0.0));
        let dying = spawn(&mut pool, Vec2::new(1.0, 1.0));
        let far = spawn(&mut pool, Vec2::new(20.0, 0.0));
        let released = spawn(&mut pool, Vec2::new(0.5, 0.0));

        let mut set = DetectionSet::new();
        // Stale beliefs: out-of-range and released handles
        set.apply(DetectionEvent::Entered(far));
        set.apply(DetectionEvent::Entered(dying));
        set.apply(DetectionEvent::Entered(released));
        pool.get_mut(dying).unwrap().take_damage(100);
        pool.release(released);

        let mut grid = EnemyGrid::default();
        let report = set.rescan(Vec2::ZERO, 5.0, &pool, &mut grid);

        assert_eq!(report.added, 1);
        assert_eq!(report.removed, 3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![near]);
        for handle in set.iter() {
            assert!(pool.get_alive(handle).is_some());
        }
    }

    #[test]
    fn test_deferred_removal() {
        let mut pool = EnemyPool::new(3, 3);
        let handles: Vec<_> = (0..3)
            .map(|i| spawn(&mut pool, Vec2::new(i as f32, 0.0)))
            .collect();
        let mut set = DetectionSet::new();
        for h in &handles {
            set.apply(DetectionEvent::Entered(*h));
        }

        let to_remove: Vec<_> = set.iter().filter(|h| h.index() != 1).collect();
        for handle in to_remove {
            set.schedule_removal(handle);
        }
        assert_eq!(set.len(), 3);
        assert_eq!(set.flush(), 2);
        assert_eq!(set.len(), 1);
        assert!(set.contains(handles[1]));
    }
}
