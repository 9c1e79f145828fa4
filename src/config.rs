use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::game::constants::{camera, dash, detection, player, pool, progression, spawn, time};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Player tuning record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerModel {
    pub name: String,
    pub max_health: i32,
    pub damage: i32,
    pub move_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub input_deadzone: f32,
    /// Seconds of invulnerability after a hit
    pub invincibility_duration: f32,
}

impl Default for PlayerModel {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            max_health: player::MAX_HEALTH,
            damage: player::DAMAGE,
            move_speed: player::MOVE_SPEED,
            acceleration: player::ACCELERATION,
            deceleration: player::DECELERATION,
            input_deadzone: player::INPUT_DEADZONE,
            invincibility_duration: player::INVINCIBILITY_DURATION,
        }
    }
}

/// Demon type record. One entry per spawnable type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemonModel {
    pub name: String,
    pub max_health: i32,
    pub damage: i32,
    pub attack_range: f32,
    /// Seconds between attacks
    pub attack_cooldown: f32,
    pub move_speed: f32,
    pub detection_range: f32,
    pub score_value: u32,
    pub experience_value: u32,
}

impl Default for DemonModel {
    fn default() -> Self {
        Self {
            name: "Demon".to_string(),
            max_health: 10,
            damage: 1,
            attack_range: 1.5,
            attack_cooldown: 1.0,
            move_speed: 3.0,
            detection_range: 10.0,
            score_value: 100,
            experience_value: 10,
        }
    }
}

/// Spawn director tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub min_spawn_distance: f32,
    pub max_spawn_distance: f32,
    pub spawn_interval: f32,
    pub max_demons_alive: usize,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            min_spawn_distance: spawn::MIN_DISTANCE,
            max_spawn_distance: spawn::MAX_DISTANCE,
            spawn_interval: spawn::INTERVAL,
            max_demons_alive: spawn::MAX_ALIVE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub initial_pool_size: usize,
    pub max_pool_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_pool_size: pool::INITIAL_SIZE,
            max_pool_size: pool::MAX_SIZE,
        }
    }
}

/// Dash attack tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashTuning {
    pub detection_radius: f32,
    pub dash_speed: f32,
    pub dash_cooldown: f32,
    pub dash_offset: f32,
    pub automatic_dash_enabled: bool,
    pub automatic_dash_interval: f32,
    pub directional_dash_enabled: bool,
    /// Cone half-angle in degrees
    pub direction_angle_threshold: f32,
    pub min_movement_speed: f32,
    pub path_width: f32,
    pub retry_backoff: f32,
    /// Seconds between authoritative detection re-scans
    pub scan_interval: f32,
    pub sound_length: f32,
}

impl Default for DashTuning {
    fn default() -> Self {
        Self {
            detection_radius: dash::DETECTION_RADIUS,
            dash_speed: dash::SPEED,
            dash_cooldown: dash::COOLDOWN,
            dash_offset: dash::OFFSET,
            automatic_dash_enabled: true,
            automatic_dash_interval: dash::AUTOMATIC_INTERVAL,
            directional_dash_enabled: true,
            direction_angle_threshold: dash::DIRECTION_ANGLE_THRESHOLD,
            min_movement_speed: dash::MIN_MOVEMENT_SPEED,
            path_width: dash::PATH_WIDTH,
            retry_backoff: dash::RETRY_BACKOFF,
            scan_interval: detection::SCAN_INTERVAL,
            sound_length: dash::SOUND_LENGTH,
        }
    }
}

/// Orthographic camera used to keep spawns off screen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Half of the visible height in world units
    pub orthographic_size: f32,
    /// Width / height
    pub aspect: f32,
}

impl CameraConfig {
    pub fn height(&self) -> f32 {
        2.0 * self.orthographic_size
    }

    pub fn width(&self) -> f32 {
        self.height() * self.aspect
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            orthographic_size: camera::ORTHOGRAPHIC_SIZE,
            aspect: camera::ASPECT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowMotionConfig {
    pub enabled: bool,
    pub idle_time_scale: f32,
    pub transition_speed: f32,
}

impl Default for SlowMotionConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(feature = "slow_motion"),
            idle_time_scale: time::IDLE_TIME_SCALE,
            transition_speed: time::SLOW_MOTION_TRANSITION_SPEED,
        }
    }
}

/// Experience curve coefficients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelCurve {
    pub base_experience: u32,
    pub log_growth: f32,
    pub linear_growth: f32,
    pub exp_growth: f32,
    pub exp_power: f32,
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self {
            base_experience: progression::BASE_EXPERIENCE,
            log_growth: progression::LOG_GROWTH,
            linear_growth: progression::LINEAR_GROWTH,
            exp_growth: progression::EXP_GROWTH,
            exp_power: progression::EXP_POWER,
        }
    }
}

/// A weighted group of demon types inside a spawn profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefabGroup {
    pub name: String,
    /// Indices into `GameConfig::demons`
    pub demon_types: Vec<usize>,
    /// Selection weight relative to the other eligible groups, in [0, 1]
    pub spawn_probability: f32,
    /// Live instances allowed at once (0 = unlimited)
    pub max_instances: usize,
    pub min_distance_between_same_type: f32,
    pub min_distance_from_other_types: f32,
}

impl Default for PrefabGroup {
    fn default() -> Self {
        Self {
            name: "Group".to_string(),
            demon_types: vec![0],
            spawn_probability: 1.0,
            max_instances: 0,
            min_distance_between_same_type: 0.0,
            min_distance_from_other_types: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnProfile {
    /// Chance in [0, 1] that a due spawn actually happens
    pub global_spawn_chance: f32,
    pub groups: Vec<PrefabGroup>,
}

impl Default for SpawnProfile {
    fn default() -> Self {
        Self {
            global_spawn_chance: 1.0,
            groups: Vec::new(),
        }
    }
}

/// Clock settings for the tick driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub fixed_dt: f32,
    pub max_fixed_steps: u32,
    pub tick_rate: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fixed_dt: time::FIXED_DT,
            max_fixed_steps: time::MAX_FIXED_STEPS,
            tick_rate: time::TICK_RATE,
        }
    }
}

/// Full session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub player: PlayerModel,
    pub demons: Vec<DemonModel>,
    pub spawner: SpawnerConfig,
    pub pool: PoolConfig,
    pub dash: DashTuning,
    pub camera: CameraConfig,
    pub slow_motion: SlowMotionConfig,
    pub level_curve: LevelCurve,
    pub spawn_profile: Option<SpawnProfile>,
    pub timing: TimingConfig,
    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player: PlayerModel::default(),
            demons: vec![DemonModel::default()],
            spawner: SpawnerConfig::default(),
            pool: PoolConfig::default(),
            dash: DashTuning::default(),
            camera: CameraConfig::default(),
            slow_motion: SlowMotionConfig::default(),
            level_curve: LevelCurve::default(),
            spawn_profile: None,
            timing: TimingConfig::default(),
            seed: None,
        }
    }
}

impl GameConfig {
    /// Parse a JSON config file. Missing sections fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load config from file/environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = match std::env::var("DEMON_DASH_CONFIG") {
            Ok(path) => match Self::from_json_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("{}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        if let Ok(interval) = std::env::var("SPAWN_INTERVAL") {
            match interval.parse::<f32>() {
                Ok(parsed) if parsed > 0.0 => config.spawner.spawn_interval = parsed,
                Ok(_) => tracing::warn!("SPAWN_INTERVAL must be > 0, using default"),
                Err(_) => tracing::warn!("Invalid SPAWN_INTERVAL '{}', using default", interval),
            }
        }

        if let Ok(max_alive) = std::env::var("MAX_DEMONS_ALIVE") {
            match max_alive.parse::<usize>() {
                Ok(parsed) if parsed <= 10_000 => config.spawner.max_demons_alive = parsed,
                Ok(_) => tracing::warn!("MAX_DEMONS_ALIVE must be 0-10000, using default"),
                Err(_) => tracing::warn!("Invalid MAX_DEMONS_ALIVE '{}', using default", max_alive),
            }
        }

        if let Ok(max_pool) = std::env::var("MAX_POOL_SIZE") {
            match max_pool.parse::<usize>() {
                Ok(parsed) if parsed > 0 && parsed <= 10_000 => {
                    config.pool.max_pool_size = parsed;
                    if config.pool.initial_pool_size > parsed {
                        config.pool.initial_pool_size = parsed;
                    }
                }
                Ok(_) => tracing::warn!("MAX_POOL_SIZE must be 1-10000, using default"),
                Err(_) => tracing::warn!("Invalid MAX_POOL_SIZE '{}', using default", max_pool),
            }
        }

        if let Ok(cooldown) = std::env::var("DASH_COOLDOWN") {
            match cooldown.parse::<f32>() {
                Ok(parsed) if parsed >= 0.0 => config.dash.dash_cooldown = parsed,
                Ok(_) => tracing::warn!("DASH_COOLDOWN must be >= 0, using default"),
                Err(_) => tracing::warn!("Invalid DASH_COOLDOWN '{}', using default", cooldown),
            }
        }

        if let Ok(seed) = std::env::var("RNG_SEED") {
            match seed.parse::<u64>() {
                Ok(parsed) => config.seed = Some(parsed),
                Err(_) => tracing::warn!("Invalid RNG_SEED '{}', ignoring", seed),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.dash.dash_speed <= 0.0 {
            return invalid("dash_speed must be positive");
        }
        if self.timing.fixed_dt <= 0.0 {
            return invalid("fixed_dt must be positive");
        }
        if self.timing.max_fixed_steps == 0 {
            return invalid("max_fixed_steps must be at least 1");
        }
        if self.pool.max_pool_size == 0 {
            return invalid("max_pool_size must be at least 1");
        }
        if self.pool.initial_pool_size > self.pool.max_pool_size {
            return invalid("initial_pool_size cannot exceed max_pool_size");
        }
        if self.spawner.min_spawn_distance > self.spawner.max_spawn_distance {
            return invalid("min_spawn_distance cannot exceed max_spawn_distance");
        }
        if self.spawner.spawn_interval <= 0.0 {
            return invalid("spawn_interval must be positive");
        }
        if self.demons.is_empty() {
            return invalid("at least one demon model is required");
        }
        if self.demons.iter().any(|d| d.max_health <= 0) {
            return invalid("demon max_health must be positive");
        }
        if self.player.max_health <= 0 {
            return invalid("player max_health must be positive");
        }
        let threshold = self.dash.direction_angle_threshold;
        if !(threshold > 0.0 && threshold <= 180.0) {
            return invalid("direction_angle_threshold must be in (0, 180]");
        }
        if self.slow_motion.idle_time_scale <= 0.0 {
            return invalid("idle_time_scale must be positive");
        }
        if let Some(profile) = &self.spawn_profile {
            if !(0.0..=1.0).contains(&profile.global_spawn_chance) {
                return invalid("global_spawn_chance must be in [0, 1]");
            }
            for group in &profile.groups {
                if !(0.0..=1.0).contains(&group.spawn_probability) {
                    return invalid("spawn_probability must be in [0, 1]");
                }
                if group.demon_types.is_empty() {
                    return invalid("prefab group needs at least one demon type");
                }
                if group.demon_types.iter().any(|&t| t >= self.demons.len()) {
                    return invalid("prefab group references an unknown demon type");
                }
            }
        }
        Ok(())
    }
}
