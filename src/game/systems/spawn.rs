//! Spawn director: periodic off-screen spawns under a population cap, and
//! exactly-once reclaim of dead enemies.

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::config::{CameraConfig, DemonModel, SpawnProfile, SpawnerConfig};
use crate::game::constants::spawn as consts;
use crate::game::events::GameLoopEvent;
use crate::game::pool::{EnemyHandle, EnemyPool};
use crate::game::presentation::Presentation;
use crate::util::vec2::Vec2;

/// Distance band `(min, max)` from the player. The minimum keeps spawns
/// outside the camera; if it exceeds the configured maximum, the band
/// collapses onto the minimum.
pub fn spawn_distance_band(spawner: &SpawnerConfig, camera: &CameraConfig) -> (f32, f32) {
    let camera_clearance = camera.width().max(camera.height()) * consts::CAMERA_CLEARANCE;
    let min = spawner.min_spawn_distance.max(camera_clearance);
    let max = spawner.max_spawn_distance.max(min);
    (min, max)
}

/// Uniform angle, uniform distance within the band
pub fn spawn_position(rng: &mut impl Rng, center: Vec2, min: f32, max: f32) -> Vec2 {
    let angle = rng.gen_range(0.0..TAU);
    let distance = if max > min {
        rng.gen_range(min..=max)
    } else {
        min
    };
    center + Vec2::from_angle(angle) * distance
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SpawnStats {
    pub spawned: u64,
    pub reclaimed: u64,
    /// Due spawns skipped because the pool was exhausted
    pub pool_exhausted: u64,
    /// Due spawns skipped by the profile's global chance or group caps
    pub skipped: u64,
}

/// Picked demon type and placement
#[derive(Debug, Clone, Copy)]
struct SpawnChoice {
    model_index: usize,
    group: Option<usize>,
    position: Vec2,
}

#[derive(Debug)]
pub struct SpawnDirector {
    config: SpawnerConfig,
    demons: Vec<DemonModel>,
    profile: Option<SpawnProfile>,
    band: (f32, f32),
    rng: StdRng,
    next_spawn_at: f64,
    active: Vec<EnemyHandle>,
    /// Enemies whose death has not been handled yet
    death_subscriptions: FxHashSet<EnemyHandle>,
    stats: SpawnStats,
}

impl SpawnDirector {
    pub fn new(
        config: SpawnerConfig,
        camera: &CameraConfig,
        demons: Vec<DemonModel>,
        profile: Option<SpawnProfile>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let band = spawn_distance_band(&config, camera);
        tracing::debug!("Spawn band {:.1}..{:.1}", band.0, band.1);
        Self {
            next_spawn_at: config.spawn_interval as f64,
            config,
            demons,
            profile,
            band,
            rng,
            active: Vec::new(),
            death_subscriptions: FxHashSet::default(),
            stats: SpawnStats::default(),
        }
    }

    pub fn active(&self) -> &[EnemyHandle] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn stats(&self) -> SpawnStats {
        self.stats
    }

    pub fn band(&self) -> (f32, f32) {
        self.band
    }

    pub fn next_spawn_at(&self) -> f64 {
        self.next_spawn_at
    }

    /// Spawn one enemy when the interval has elapsed and the cap allows it
    pub fn update(
        &mut self,
        now: f64,
        player_position: Vec2,
        pool: &mut EnemyPool,
        presentation: &mut dyn Presentation,
        events: &mut Vec<GameLoopEvent>,
    ) -> Option<EnemyHandle> {
        if now < self.next_spawn_at || self.active.len() >= self.config.max_demons_alive {
            return None;
        }
        self.next_spawn_at = now + self.config.spawn_interval as f64;
        self.spawn(player_position, pool, presentation, events)
    }

    /// Spawn immediately, ignoring the interval but not the cap
    pub fn spawn(
        &mut self,
        player_position: Vec2,
        pool: &mut EnemyPool,
        presentation: &mut dyn Presentation,
        events: &mut Vec<GameLoopEvent>,
    ) -> Option<EnemyHandle> {
        if self.demons.is_empty() || self.active.len() >= self.config.max_demons_alive {
            return None;
        }
        let Some(choice) = self.choose(player_position, pool) else {
            self.stats.skipped += 1;
            return None;
        };
        self.place(choice, pool, presentation, events)
    }

    /// Spawn a specific demon type at a fixed position (scripted encounters).
    /// Counts against the cap and is reclaimed like any other spawn.
    pub fn spawn_at(
        &mut self,
        model_index: usize,
        position: Vec2,
        pool: &mut EnemyPool,
        presentation: &mut dyn Presentation,
        events: &mut Vec<GameLoopEvent>,
    ) -> Option<EnemyHandle> {
        if model_index >= self.demons.len() || self.active.len() >= self.config.max_demons_alive {
            return None;
        }
        self.place(
            SpawnChoice {
                model_index,
                group: None,
                position,
            },
            pool,
            presentation,
            events,
        )
    }

    fn place(
        &mut self,
        choice: SpawnChoice,
        pool: &mut EnemyPool,
        presentation: &mut dyn Presentation,
        events: &mut Vec<GameLoopEvent>,
    ) -> Option<EnemyHandle> {
        let Some(handle) = pool.acquire() else {
            self.stats.pool_exhausted += 1;
            return None;
        };
        let enemy = pool.get_mut(handle)?;
        enemy.apply_model(choice.model_index, &self.demons[choice.model_index]);
        enemy.spawn_at(choice.position, choice.group);

        self.active.push(handle);
        self.death_subscriptions.insert(handle);
        self.stats.spawned += 1;
        presentation.on_acquire(handle);
        events.push(GameLoopEvent::EnemySpawned {
            enemy: handle,
            model_index: choice.model_index,
            position: choice.position,
        });
        tracing::debug!(
            "Spawned {} at ({:.1}, {:.1})",
            self.demons[choice.model_index].name,
            choice.position.x,
            choice.position.y
        );
        Some(handle)
    }

    fn choose(&mut self, center: Vec2, pool: &EnemyPool) -> Option<SpawnChoice> {
        let (min, max) = self.band;
        let Some(profile) = &self.profile else {
            let model_index = self.rng.gen_range(0..self.demons.len());
            return Some(SpawnChoice {
                model_index,
                group: None,
                position: spawn_position(&mut self.rng, center, min, max),
            });
        };

        if self.rng.gen::<f32>() >= profile.global_spawn_chance {
            return None;
        }

        let live_in_group = |group: usize| {
            self.active
                .iter()
                .filter_map(|h| pool.get_alive(*h))
                .filter(|e| e.group == Some(group))
                .count()
        };
        let eligible: Vec<(usize, f32)> = profile
            .groups
            .iter()
            .enumerate()
            .filter(|(i, g)| {
                !g.demon_types.is_empty()
                    && g.spawn_probability > 0.0
                    && (g.max_instances == 0 || live_in_group(*i) < g.max_instances)
            })
            .map(|(i, g)| (i, g.spawn_probability))
            .collect();
        let total_weight: f32 = eligible.iter().map(|(_, w)| w).sum();
        if eligible.is_empty() || total_weight <= 0.0 {
            return None;
        }

        let mut roll = self.rng.gen_range(0.0..total_weight);
        let mut group_index = eligible[eligible.len() - 1].0;
        for (i, weight) in &eligible {
            if roll < *weight {
                group_index = *i;
                break;
            }
            roll -= weight;
        }
        let group = &profile.groups[group_index];
        let model_index = group.demon_types[self.rng.gen_range(0..group.demon_types.len())];

        let mut position = center;
        for _ in 0..consts::MAX_PLACEMENT_ATTEMPTS {
            position = spawn_position(&mut self.rng, center, min, max);
            let clear = self
                .active
                .iter()
                .filter_map(|h| pool.get_alive(*h))
                .all(|e| {
                    let required = if e.model_index == model_index {
                        group.min_distance_between_same_type
                    } else {
                        group.min_distance_from_other_types
                    };
                    e.position.distance_to(position) >= required
                });
            if clear {
                break;
            }
        }

        Some(SpawnChoice {
            model_index,
            group: Some(group_index),
            position,
        })
    }

    /// Death notification. The subscription is dropped on first delivery so
    /// a repeated notification is a no-op.
    pub fn handle_death(
        &mut self,
        handle: EnemyHandle,
        pool: &mut EnemyPool,
        presentation: &mut dyn Presentation,
        events: &mut Vec<GameLoopEvent>,
    ) -> bool {
        if !self.death_subscriptions.remove(&handle) {
            tracing::trace!("Ignoring repeated death notification for {:?}", handle);
            return false;
        }
        self.active.retain(|h| *h != handle);
        if pool.release(handle) {
            presentation.on_release(handle);
            self.stats.reclaimed += 1;
            events.push(GameLoopEvent::EnemyReclaimed { enemy: handle });
        }
        true
    }

    /// Return every active enemy to the pool (level teardown)
    pub fn despawn_all(&mut self, pool: &mut EnemyPool, presentation: &mut dyn Presentation) {
        for handle in self.active.drain(..) {
            self.death_subscriptions.remove(&handle);
            if pool.release(handle) {
                presentation.on_release(handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrefabGroup;
    use crate::game::presentation::RecordingPresentation;

    fn director(profile: Option<SpawnProfile>, demons: usize) -> SpawnDirector {
        SpawnDirector::new(
            SpawnerConfig {
                max_demons_alive: 5,
                ..Default::default()
            },
            &CameraConfig::default(),
            (0..demons)
                .map(|i| DemonModel {
                    name: format!("Demon{}", i),
                    ..Default::default()
                })
                .collect(),
            profile,
            Some(7),
        )
    }

    #[test]
    fn test_band_respects_camera() {
        let spawner = SpawnerConfig::default();
        // 20x10 view: 0.75 * 20 = 15
        let camera = CameraConfig {
            orthographic_size: 5.0,
            aspect: 2.0,
        };
        assert_eq!(spawn_distance_band(&spawner, &camera), (15.0, 25.0));

        let big = CameraConfig {
            orthographic_size: 20.0,
            aspect: 1.0,
        };
        // 0.75 * 40 = 30 > max 25: band collapses onto the minimum
        assert_eq!(spawn_distance_band(&spawner, &big), (30.0, 30.0));
    }

    #[test]
    fn test_spawn_positions_outside_camera() {
        let camera = CameraConfig::default();
        let spawner = SpawnerConfig {
            min_spawn_distance: 0.0,
            ..Default::default()
        };
        let (min, max) = spawn_distance_band(&spawner, &camera);
        let mut rng = StdRng::seed_from_u64(1);
        let center = Vec2::new(3.0, -2.0);
        let half_w = camera.width() / 2.0;
        let half_h = camera.height() / 2.0;
        for _ in 0..500 {
            let p = spawn_position(&mut rng, center, min, max);
            let d = p.distance_to(center);
            assert!(d >= min - 1e-3 && d <= max + 1e-3);
            let offset = p - center;
            assert!(offset.x.abs() > half_w || offset.y.abs() > half_h);
        }
    }

    #[test]
    fn test_interval_and_cap() {
        let mut spawner = director(None, 2);
        let mut pool = EnemyPool::new(10, 10);
        let mut presentation = RecordingPresentation::default();
        let mut events = Vec::new();

        assert!(spawner
            .update(1.0, Vec2::ZERO, &mut pool, &mut presentation, &mut events)
            .is_none());
        let mut now = 2.0;
        for _ in 0..10 {
            spawner.update(now, Vec2::ZERO, &mut pool, &mut presentation, &mut events);
            now += 2.0;
        }
        assert_eq!(spawner.active_count(), 5);
        assert_eq!(pool.active_count(), 5);
        assert_eq!(presentation.acquired.len(), 5);
        for handle in spawner.active() {
            let enemy = pool.get(*handle).unwrap();
            assert!(enemy.position.length() >= 15.0 - 1e-3);
            assert_eq!(enemy.health, enemy.max_health);
        }
    }

    #[test]
    fn test_pool_exhaustion_skips_cycle() {
        let mut spawner = director(None, 1);
        let mut pool = EnemyPool::new(1, 2);
        let mut presentation = RecordingPresentation::default();
        let mut events = Vec::new();
        for _ in 0..4 {
            spawner.spawn(Vec2::ZERO, &mut pool, &mut presentation, &mut events);
        }
        assert_eq!(spawner.active_count(), 2);
        assert_eq!(spawner.stats().pool_exhausted, 2);
    }

    #[test]
    fn test_death_handled_exactly_once() {
        let mut spawner = director(None, 1);
        let mut pool = EnemyPool::new(2, 2);
        let mut presentation = RecordingPresentation::default();
        let mut events = Vec::new();
        let handle = spawner
            .spawn(Vec2::ZERO, &mut pool, &mut presentation, &mut events)
            .unwrap();
        pool.get_mut(handle).unwrap().take_damage(100);

        assert!(spawner.handle_death(handle, &mut pool, &mut presentation, &mut events));
        assert!(!spawner.handle_death(handle, &mut pool, &mut presentation, &mut events));
        assert_eq!(spawner.active_count(), 0);
        assert_eq!(pool.free_count(), 2);
        assert_eq!(presentation.released, vec![handle]);
        assert_eq!(spawner.stats().reclaimed, 1);

        // The slot is reused under a new generation
        let again = spawner
            .spawn(Vec2::ZERO, &mut pool, &mut presentation, &mut events)
            .unwrap();
        assert_ne!(again, handle);
        assert!(!spawner.handle_death(handle, &mut pool, &mut presentation, &mut events));
        assert!(pool.contains(again));
    }

    #[test]
    fn test_profile_group_cap_and_types() {
        let profile = SpawnProfile {
            global_spawn_chance: 1.0,
            groups: vec![
                PrefabGroup {
                    name: "Capped".into(),
                    demon_types: vec![0],
                    spawn_probability: 1.0,
                    max_instances: 1,
                    ..Default::default()
                },
                PrefabGroup {
                    name: "Swarm".into(),
                    demon_types: vec![1, 2],
                    spawn_probability: 0.5,
                    max_instances: 0,
                    ..Default::default()
                },
            ],
        };
        let mut spawner = director(Some(profile), 3);
        let mut pool = EnemyPool::new(10, 10);
        let mut presentation = RecordingPresentation::default();
        let mut events = Vec::new();
        for _ in 0..5 {
            spawner.spawn(Vec2::ZERO, &mut pool, &mut presentation, &mut events);
        }
        let capped = spawner
            .active()
            .iter()
            .filter(|h| pool.get(**h).unwrap().group == Some(0))
            .count();
        assert!(capped <= 1);
        for handle in spawner.active() {
            let enemy = pool.get(*handle).unwrap();
            match enemy.group {
                Some(0) => assert_eq!(enemy.model_index, 0),
                Some(1) => assert!(enemy.model_index == 1 || enemy.model_index == 2),
                other => panic!("unexpected group {:?}", other),
            }
        }
    }

    #[test]
    fn test_profile_zero_chance_never_spawns() {
        let profile = SpawnProfile {
            global_spawn_chance: 0.0,
            groups: vec![PrefabGroup::default()],
        };
        let mut spawner = director(Some(profile), 1);
        let mut pool = EnemyPool::new(4, 4);
        let mut events = Vec::new();
        for _ in 0..10 {
            spawner.spawn(
                Vec2::ZERO,
                &mut pool,
                &mut RecordingPresentation::default(),
                &mut events,
            );
        }
        assert_eq!(spawner.active_count(), 0);
        assert_eq!(spawner.stats().skipped, 10);
    }

    #[test]
    fn test_profile_separation() {
        let profile = SpawnProfile {
            global_spawn_chance: 1.0,
            groups: vec![PrefabGroup {
                min_distance_between_same_type: 8.0,
                ..Default::default()
            }],
        };
        let mut spawner = director(Some(profile), 1);
        let mut pool = EnemyPool::new(4, 4);
        let mut presentation = RecordingPresentation::default();
        let mut events = Vec::new();
        let a = spawner
            .spawn(Vec2::ZERO, &mut pool, &mut presentation, &mut events)
            .unwrap();
        let b = spawner
            .spawn(Vec2::ZERO, &mut pool, &mut presentation, &mut events)
            .unwrap();
        let pa = pool.get(a).unwrap().position;
        let pb = pool.get(b).unwrap().position;
        // Ring of radius 15..25 has plenty of room for 8 units of separation
        assert!(pa.distance_to(pb) >= 8.0);
    }

    #[test]
    fn test_spawn_at_fixed_position() {
        let mut spawner = director(None, 2);
        let mut pool = EnemyPool::new(2, 2);
        let mut presentation = RecordingPresentation::default();
        let mut events = Vec::new();
        let handle = spawner
            .spawn_at(1, Vec2::new(2.0, 0.0), &mut pool, &mut presentation, &mut events)
            .unwrap();
        let enemy = pool.get(handle).unwrap();
        assert_eq!(enemy.model_index, 1);
        assert_eq!(enemy.position, Vec2::new(2.0, 0.0));
        assert!(spawner
            .spawn_at(5, Vec2::ZERO, &mut pool, &mut presentation, &mut events)
            .is_none());
    }

    #[test]
    fn test_despawn_all() {
        let mut spawner = director(None, 1);
        let mut pool = EnemyPool::new(4, 4);
        let mut presentation = RecordingPresentation::default();
        let mut events = Vec::new();
        for _ in 0..3 {
            spawner.spawn(Vec2::ZERO, &mut pool, &mut presentation, &mut events);
        }
        spawner.despawn_all(&mut pool, &mut presentation);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(spawner.active_count(), 0);
        assert_eq!(presentation.released.len(), 3);
    }
}
