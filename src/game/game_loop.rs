//! Session driver. One `tick` runs input, the variable-rate update and the
//! owed fixed-rate steps, and returns the events produced along the way.

use serde::Serialize;

use crate::config::{ConfigError, GameConfig};
use crate::game::clock::GameClock;
use crate::game::detection::{DetectionSet, ProximitySensor};
use crate::game::enemy::EnemyState;
use crate::game::events::GameLoopEvent;
use crate::game::input_buffer::{InputBuffer, InputSender};
use crate::game::obstacles::{ColliderId, ObstacleField, Shape};
use crate::game::player::PlayerState;
use crate::game::pool::{EnemyHandle, EnemyPool};
use crate::game::presentation::{NullPresentation, Presentation};
use crate::game::spatial::EnemyGrid;
use crate::game::systems::dash::{DashContext, DashController, DashStats};
use crate::game::systems::enemy_ai;
use crate::game::systems::progression::{Progression, ScoreKeeper};
use crate::game::systems::slow_motion::SlowMotion;
use crate::game::systems::spawn::{SpawnDirector, SpawnStats};
use crate::util::vec2::Vec2;

/// Snapshot of session counters
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionStats {
    pub ticks: u64,
    pub elapsed: f64,
    pub time_scale: f32,
    pub live_enemies: usize,
    pub dying_enemies: usize,
    pub pool_free: usize,
    pub pool_created: usize,
    pub detected: usize,
    pub dash: DashStats,
    pub spawn: SpawnStats,
    pub score: u64,
    pub level: u32,
    pub player_health: i32,
    pub game_over: bool,
}

/// One play session
pub struct GameLoop<P: Presentation = NullPresentation, R: Progression = ScoreKeeper> {
    config: GameConfig,
    clock: GameClock,
    player: PlayerState,
    pool: EnemyPool,
    grid: EnemyGrid,
    detected: DetectionSet,
    sensor: ProximitySensor,
    obstacles: ObstacleField,
    dash: DashController,
    spawner: SpawnDirector,
    slow_motion: SlowMotion,
    input: InputBuffer,
    presentation: P,
    progression: R,
    ticks: u64,
    next_rescan_at: f64,
    manual_dash_requested: bool,
    /// Events raised outside `tick`, delivered with the next one
    pending_events: Vec<GameLoopEvent>,
    torn_down: bool,
}

impl GameLoop {
    /// Session with no presentation layer and in-memory scoring
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        let progression = ScoreKeeper::new(config.level_curve.clone());
        Self::with_parts(config, NullPresentation, progression)
    }
}

impl<P: Presentation, R: Progression> GameLoop<P, R> {
    pub fn with_parts(config: GameConfig, presentation: P, progression: R) -> Result<Self, ConfigError> {
        config.validate()?;

        let clock = GameClock::new(config.timing.fixed_dt, config.timing.max_fixed_steps);
        let player = PlayerState::new(&config.player, Vec2::ZERO);
        let pool = EnemyPool::new(config.pool.initial_pool_size, config.pool.max_pool_size);
        let spawner = SpawnDirector::new(
            config.spawner.clone(),
            &config.camera,
            config.demons.clone(),
            config.spawn_profile.clone(),
            config.seed,
        );
        let dash = DashController::new(config.dash.clone());
        let slow_motion = SlowMotion::new(config.slow_motion.clone());

        tracing::info!(
            "Session ready: {} demon types, pool {}/{}, spawn every {:.1}s (max {} alive)",
            config.demons.len(),
            config.pool.initial_pool_size,
            config.pool.max_pool_size,
            config.spawner.spawn_interval,
            config.spawner.max_demons_alive
        );

        Ok(Self {
            clock,
            player,
            pool,
            grid: EnemyGrid::default(),
            detected: DetectionSet::new(),
            sensor: ProximitySensor::new(),
            obstacles: ObstacleField::new(),
            dash,
            spawner,
            slow_motion,
            input: InputBuffer::default(),
            presentation,
            progression,
            ticks: 0,
            next_rescan_at: 0.0,
            manual_dash_requested: false,
            pending_events: Vec::new(),
            torn_down: false,
            config,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn pool(&self) -> &EnemyPool {
        &self.pool
    }

    pub fn detected(&self) -> &DetectionSet {
        &self.detected
    }

    pub fn dash(&self) -> &DashController {
        &self.dash
    }

    pub fn dash_mut(&mut self) -> &mut DashController {
        &mut self.dash
    }

    pub fn spawner(&self) -> &SpawnDirector {
        &self.spawner
    }

    pub fn progression(&self) -> &R {
        &self.progression
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    pub fn slow_motion(&self) -> &SlowMotion {
        &self.slow_motion
    }

    /// Sender for input sources on other threads or tasks
    pub fn input_sender(&self) -> InputSender {
        self.input.sender()
    }

    pub fn set_move_input(&mut self, input: Vec2) {
        self.player.set_move_input(input);
    }

    /// Queue a manual dash; it is attempted on the next tick
    pub fn request_dash(&mut self) {
        self.manual_dash_requested = true;
    }

    pub fn set_automatic_dash(&mut self, enabled: bool) {
        self.dash.set_automatic_dash(enabled, self.clock.now());
    }

    pub fn add_obstacle(&mut self, shape: Shape) -> ColliderId {
        self.obstacles.add_static(shape)
    }

    pub fn remove_obstacle(&mut self, id: ColliderId) -> bool {
        self.obstacles.remove(id)
    }

    /// Place a demon type at a fixed position, bypassing the spawn timer.
    /// The `EnemySpawned` event comes out of the next `tick`.
    pub fn spawn_enemy_at(&mut self, model_index: usize, position: Vec2) -> Option<EnemyHandle> {
        self.spawner.spawn_at(
            model_index,
            position,
            &mut self.pool,
            &mut self.presentation,
            &mut self.pending_events,
        )
    }

    fn dash_parts<'a>(
        &'a mut self,
        events: &'a mut Vec<GameLoopEvent>,
    ) -> (&'a mut DashController, DashContext<'a>) {
        let now = self.clock.now();
        let ctx = DashContext {
            now,
            player: &mut self.player,
            pool: &mut self.pool,
            detected: &mut self.detected,
            grid: &mut self.grid,
            obstacles: &mut self.obstacles,
            presentation: &mut self.presentation,
            events,
        };
        (&mut self.dash, ctx)
    }

    /// Advance the session by `real_dt` seconds of wall time
    pub fn tick(&mut self, real_dt: f32) -> Vec<GameLoopEvent> {
        if self.torn_down {
            return Vec::new();
        }
        let mut events = std::mem::take(&mut self.pending_events);
        self.ticks += 1;

        self.drain_input();

        let dt = self.clock.advance(real_dt);

        #[cfg(feature = "slow_motion")]
        {
            let idle = self.player.alive
                && !self.player.is_moving(self.dash.tuning().min_movement_speed)
                && !self.dash.is_dashing();
            self.slow_motion
                .update(idle, &mut self.clock, &mut self.presentation);
        }

        self.variable_update(dt, &mut events);

        let steps = self.clock.drain_fixed_steps();
        let fixed_dt = self.clock.fixed_dt();
        for _ in 0..steps {
            self.fixed_update(fixed_dt, &mut events);
        }

        self.apply_awards(&mut events);
        events
    }

    fn drain_input(&mut self) {
        let drained = self.input.drain();
        if let Some(movement) = drained.movement {
            self.player.set_move_input(movement);
        }
        if let Some(enabled) = drained.automatic_dash {
            self.dash.set_automatic_dash(enabled, self.clock.now());
        }
        if drained.dash_requests > 0 {
            self.manual_dash_requested = true;
        }
    }

    fn variable_update(&mut self, dt: f32, events: &mut Vec<GameLoopEvent>) {
        let now = self.clock.now();
        let radius = self.dash.tuning().detection_radius;

        if now >= self.next_rescan_at {
            self.detected
                .rescan(self.player.position, radius, &self.pool, &mut self.grid);
            self.next_rescan_at = now + self.dash.tuning().scan_interval as f64;
        }

        let deaths = enemy_ai::update_enemies(
            &mut self.pool,
            dt,
            now,
            self.player.position,
            &mut self.presentation,
        );

        if std::mem::take(&mut self.manual_dash_requested) {
            let (dash, mut ctx) = self.dash_parts(events);
            if !dash.request_dash(&mut ctx) {
                tracing::debug!("Manual dash request had no valid target");
            }
        }
        {
            let (dash, mut ctx) = self.dash_parts(events);
            dash.update(&mut ctx);
        }

        if !self.progression.is_game_over() {
            self.spawner.update(
                now,
                self.player.position,
                &mut self.pool,
                &mut self.presentation,
                events,
            );
        }

        for handle in deaths {
            self.detected.remove(handle);
            self.spawner
                .handle_death(handle, &mut self.pool, &mut self.presentation, events);
        }
    }

    fn fixed_update(&mut self, dt: f32, events: &mut Vec<GameLoopEvent>) {
        let was_dashing = self.dash.is_dashing();
        {
            let (dash, mut ctx) = self.dash_parts(events);
            dash.fixed_update(dt, &mut ctx);
        }
        if !was_dashing {
            self.player.steer(dt);
            self.player.integrate(dt);
        }

        enemy_ai::fixed_update_enemies(&mut self.pool, dt, self.player.position);

        let radius = self.dash.tuning().detection_radius;
        for event in self.sensor.sense(self.player.position, radius, &self.pool) {
            self.detected.apply(event);
        }

        let was_alive = self.player.alive;
        enemy_ai::resolve_attacks(
            &mut self.pool,
            &mut self.player,
            self.clock.now(),
            &mut self.presentation,
            events,
        );
        if was_alive && !self.player.alive {
            self.dash.abandon(&mut self.obstacles);
            self.progression.player_died();
        }
    }

    /// Credit kills produced this tick and report level changes
    fn apply_awards(&mut self, events: &mut Vec<GameLoopEvent>) {
        let kills: Vec<(u32, u32)> = events
            .iter()
            .filter_map(|e| match e {
                GameLoopEvent::EnemyKilled {
                    score, experience, ..
                } => Some((*score, *experience)),
                _ => None,
            })
            .collect();
        for (score, experience) in kills {
            let gained = self.progression.award(score, experience);
            let level = self.progression.level();
            for offset in (0..gained).rev() {
                events.push(GameLoopEvent::LevelUp {
                    level: level - offset,
                });
            }
        }
    }

    pub fn stats(&self) -> SessionStats {
        let dying_enemies = self
            .pool
            .iter_active()
            .filter(|(_, e)| matches!(e.state, EnemyState::Dying { .. }))
            .count();
        SessionStats {
            ticks: self.ticks,
            elapsed: self.clock.now(),
            time_scale: self.clock.time_scale(),
            live_enemies: self.pool.active_count() - dying_enemies,
            dying_enemies,
            pool_free: self.pool.free_count(),
            pool_created: self.pool.created(),
            detected: self.detected.len(),
            dash: self.dash.stats(),
            spawn: self.spawner.stats(),
            score: self.progression.score(),
            level: self.progression.level(),
            player_health: self.player.health,
            game_over: self.progression.is_game_over(),
        }
    }

    /// Stop the session: abandon any dash, return enemies to the pool and
    /// restore normal time. Later ticks do nothing.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.dash.abandon(&mut self.obstacles);
        self.spawner.despawn_all(&mut self.pool, &mut self.presentation);
        self.detected.clear();
        self.sensor.clear();
        self.slow_motion.teardown(&mut self.clock);
        tracing::info!("Session stopped after {} ticks", self.ticks);
    }
}

impl<P: Presentation, R: Progression> Drop for GameLoop<P, R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemonModel;
    use crate::game::input_buffer::InputCommand;
    use crate::game::presentation::RecordingPresentation;

    const FRAME: f32 = 1.0 / 60.0;

    fn quiet_config() -> GameConfig {
        let mut config = GameConfig {
            seed: Some(3),
            demons: vec![DemonModel {
                max_health: 5,
                ..Default::default()
            }],
            ..Default::default()
        };
        config.spawner.spawn_interval = 1000.0;
        config.slow_motion.enabled = false;
        config
    }

    fn run(game: &mut GameLoop<impl Presentation, impl Progression>, seconds: f32) -> Vec<GameLoopEvent> {
        let mut events = Vec::new();
        let frames = (seconds / FRAME).round() as usize;
        for _ in 0..frames {
            events.extend(game.tick(FRAME));
        }
        events
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = GameConfig::default();
        config.demons.clear();
        assert!(GameLoop::new(config).is_err());
    }

    #[test]
    fn test_spawner_populates_world() {
        let mut config = quiet_config();
        config.spawner.spawn_interval = 0.5;
        config.dash.automatic_dash_enabled = false;
        let mut game = GameLoop::new(config).unwrap();

        let events = run(&mut game, 2.1);
        let spawned = events
            .iter()
            .filter(|e| matches!(e, GameLoopEvent::EnemySpawned { .. }))
            .count();
        assert_eq!(spawned, 4);
        assert_eq!(game.stats().live_enemies, 4);
        assert!(game.stats().pool_free > 0);
    }

    #[test]
    fn test_automatic_dash_kills_and_reclaims() {
        let mut game = GameLoop::new(quiet_config()).unwrap();
        let handle = game.spawn_enemy_at(0, Vec2::new(3.0, 0.0)).unwrap();

        let events = run(&mut game, 0.5);
        assert!(events.contains(&GameLoopEvent::EnemyKilled {
            enemy: handle,
            score: 100,
            experience: 10,
        }));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameLoopEvent::DashFinished { .. })));
        assert_eq!(game.progression().score(), 100);
        assert!(!game.detected().contains(handle));

        let events = run(&mut game, 1.5);
        assert!(events.contains(&GameLoopEvent::EnemyReclaimed { enemy: handle }));
        assert!(!game.pool().contains(handle));
        assert_eq!(game.stats().live_enemies, 0);
        assert!(!game.player().velocity.x.is_nan());
        assert!(game.player().movement_enabled);
    }

    #[test]
    fn test_level_up_event() {
        let mut config = quiet_config();
        config.demons[0].experience_value = 200;
        let mut game = GameLoop::new(config).unwrap();
        game.spawn_enemy_at(0, Vec2::new(3.0, 0.0)).unwrap();

        let events = run(&mut game, 0.5);
        assert!(events.contains(&GameLoopEvent::LevelUp { level: 2 }));
        assert_eq!(game.stats().level, 2);
    }

    #[test]
    fn test_manual_dash_through_input() {
        let mut config = quiet_config();
        config.dash.automatic_dash_enabled = false;
        config.dash.directional_dash_enabled = false;
        let mut game = GameLoop::new(config).unwrap();
        game.spawn_enemy_at(0, Vec2::new(-3.0, 0.0)).unwrap();

        let events = run(&mut game, 0.2);
        assert!(!events
            .iter()
            .any(|e| matches!(e, GameLoopEvent::DashStarted { .. })));

        game.input_sender().try_send(InputCommand::Dash).unwrap();
        let events = game.tick(FRAME);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameLoopEvent::DashStarted { .. })));
        assert!(game.dash().is_dashing());
    }

    #[test]
    fn test_last_move_input_wins() {
        let mut game = GameLoop::new(quiet_config()).unwrap();
        let sender = game.input_sender();
        sender.try_send(InputCommand::Move(Vec2::new(0.0, 1.0))).unwrap();
        sender.try_send(InputCommand::Move(Vec2::new(1.0, 0.0))).unwrap();
        game.tick(FRAME);
        assert_eq!(game.player().move_input, Vec2::new(1.0, 0.0));
        run(&mut game, 0.1);
        assert!(game.player().position.x > 0.0);
        assert_eq!(game.player().position.y, 0.0);
    }

    #[test]
    fn test_player_death_ends_session() {
        let mut config = quiet_config();
        config.dash.automatic_dash_enabled = false;
        config.dash.directional_dash_enabled = false;
        config.demons[0].damage = 500;
        let mut game = GameLoop::with_parts(
            config,
            RecordingPresentation::default(),
            ScoreKeeper::default(),
        )
        .unwrap();
        game.spawn_enemy_at(0, Vec2::new(1.0, 0.0)).unwrap();

        let events = run(&mut game, 1.0);
        assert_eq!(
            events
                .iter()
                .filter(|e| **e == GameLoopEvent::PlayerDied)
                .count(),
            1
        );
        assert!(game.progression().is_game_over());
        assert!(game.dash().is_abandoned());
        assert!(!game.player().alive);
        assert!(game.stats().game_over);
    }

    #[test]
    fn test_blocked_dash_reported() {
        let mut config = quiet_config();
        config.dash.directional_dash_enabled = false;
        let mut game = GameLoop::new(config).unwrap();
        game.add_obstacle(Shape::rect(Vec2::new(1.5, 0.0), Vec2::new(0.2, 2.0)));
        let handle = game.spawn_enemy_at(0, Vec2::new(3.0, 0.0)).unwrap();

        let events = game.tick(FRAME);
        assert!(events.contains(&GameLoopEvent::DashBlocked { target: handle }));
        assert!(!game.dash().is_dashing());
        assert_eq!(game.stats().dash.blocked, 1);
    }

    #[test]
    fn test_scripted_spawn_reported_on_next_tick() {
        let mut config = quiet_config();
        config.dash.automatic_dash_enabled = false;
        let mut game = GameLoop::new(config).unwrap();
        let handle = game.spawn_enemy_at(0, Vec2::new(8.0, 0.0)).unwrap();

        let events = game.tick(FRAME);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameLoopEvent::EnemySpawned { enemy, .. } if *enemy == handle))
                .count(),
            1
        );
        assert!(!game
            .tick(FRAME)
            .iter()
            .any(|e| matches!(e, GameLoopEvent::EnemySpawned { .. })));
    }

    #[cfg(not(feature = "slow_motion"))]
    #[test]
    fn test_slow_motion_compiled_out() {
        let mut config = quiet_config();
        config.slow_motion.enabled = true;
        let mut game = GameLoop::new(config).unwrap();
        run(&mut game, 0.5);
        assert!(!game.slow_motion().is_active());
        assert_eq!(game.clock().time_scale(), 1.0);
    }

    #[cfg(feature = "slow_motion")]
    #[test]
    fn test_idle_slow_motion_and_shutdown() {
        let mut config = quiet_config();
        config.slow_motion.enabled = true;
        let mut game = GameLoop::new(config).unwrap();
        game.tick(FRAME);
        assert!(game.slow_motion().is_active());
        assert_eq!(game.clock().time_scale(), 0.9);

        game.set_move_input(Vec2::new(1.0, 0.0));
        run(&mut game, 0.2);
        assert!(!game.slow_motion().is_active());
        assert_eq!(game.clock().time_scale(), 1.0);

        game.set_move_input(Vec2::ZERO);
        run(&mut game, 1.0);
        assert_eq!(game.clock().time_scale(), 0.9);

        game.shutdown();
        assert_eq!(game.clock().time_scale(), 1.0);
        assert!(game.tick(FRAME).is_empty());
    }
}
