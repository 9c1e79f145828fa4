/// Dash attack constants
pub mod dash {
    /// Radius of the player's enemy sensor
    pub const DETECTION_RADIUS: f32 = 5.0;
    /// Travel speed while dashing (units per second)
    pub const SPEED: f32 = 15.0;
    /// Seconds after a dash starts before another may start
    pub const COOLDOWN: f32 = 1.0;
    /// Distance travelled past the target
    pub const OFFSET: f32 = 1.0;
    /// Extra travel as a fraction of (target distance + offset)
    pub const LENGTH_BUFFER_RATIO: f32 = 0.1;
    /// Seconds between automatic dashes
    pub const AUTOMATIC_INTERVAL: f32 = 1.0;
    /// Delay before an automatic dash is re-evaluated after finding no clear target
    pub const RETRY_BACKOFF: f32 = 0.2;
    /// Cone half-angle (degrees) for directional dashes
    pub const DIRECTION_ANGLE_THRESHOLD: f32 = 30.0;
    /// Speed above which the player counts as moving
    pub const MIN_MOVEMENT_SPEED: f32 = 0.1;
    /// Perpendicular distance from the dash segment that still counts as "in the path"
    pub const PATH_WIDTH: f32 = 1.5;
    /// Distance at which an enemy counts as reached
    pub const HIT_DISTANCE: f32 = 1.0;
    /// Length of the forward obstacle probe cast every travel step
    pub const OBSTACLE_PROBE_DISTANCE: f32 = 0.2;
    /// Radius of the transient hit probe attached while travelling
    pub const HIT_PROBE_RADIUS: f32 = 0.5;
    /// Fraction of the pre-dash velocity kept after a dash
    pub const RECOVERY_VELOCITY_FACTOR: f32 = 0.5;
    /// Knockback impulse applied to enemies hit by a dash
    pub const KNOCKBACK_IMPULSE: f32 = 5.0;
    /// Length of the dash sound clip in seconds (pitch is fitted to the dash duration)
    pub const SOUND_LENGTH: f32 = 0.5;
}

/// Detection set maintenance
pub mod detection {
    /// Seconds between authoritative re-scans of the detection radius
    pub const SCAN_INTERVAL: f32 = 0.2;
}

/// Enemy agent timing
pub mod enemy {
    /// Delay between the start of an attack and its hitbox going live
    pub const ATTACK_WINDUP: f32 = 0.1;
    /// How long the attack hitbox stays live
    pub const ATTACK_ACTIVE: f32 = 0.3;
    /// Death animation time before the enemy reports its death
    pub const DEATH_DURATION: f32 = 1.0;
    /// Linear damping applied to knockback velocity (per second)
    pub const KNOCKBACK_DAMPING: f32 = 1.0;
    /// Knockback below this speed is discarded
    pub const KNOCKBACK_EPSILON: f32 = 0.01;
}

/// Spawn director defaults
pub mod spawn {
    /// Minimum distance from the player
    pub const MIN_DISTANCE: f32 = 15.0;
    /// Maximum distance from the player
    pub const MAX_DISTANCE: f32 = 25.0;
    /// Seconds between spawn attempts
    pub const INTERVAL: f32 = 2.0;
    /// Population cap
    pub const MAX_ALIVE: usize = 20;
    /// Fraction of the larger camera dimension kept clear around the player.
    /// 0.75 exceeds the half-diagonal ratio (~0.707), so spawns land off screen.
    pub const CAMERA_CLEARANCE: f32 = 0.75;
    /// Placement attempts when a spawn profile imposes separations
    pub const MAX_PLACEMENT_ATTEMPTS: u32 = 30;
}

/// Object pool sizing
pub mod pool {
    /// Enemies created up front
    pub const INITIAL_SIZE: usize = 30;
    /// Hard cap on pooled + active enemies
    pub const MAX_SIZE: usize = 50;
}

/// Player defaults
pub mod player {
    pub const MAX_HEALTH: i32 = 100;
    pub const DAMAGE: i32 = 5;
    pub const MOVE_SPEED: f32 = 5.0;
    /// How quickly the player reaches max speed
    pub const ACCELERATION: f32 = 10.0;
    /// How quickly the player stops
    pub const DECELERATION: f32 = 15.0;
    /// Joystick magnitude below this is treated as no input
    pub const INPUT_DEADZONE: f32 = 0.1;
    /// Invulnerability after taking a hit (seconds)
    pub const INVINCIBILITY_DURATION: f32 = 0.5;
}

/// Clock and scheduling
pub mod time {
    /// Physics step in scaled seconds
    pub const FIXED_DT: f32 = 0.02;
    /// Upper bound on physics steps drained per tick
    pub const MAX_FIXED_STEPS: u32 = 8;
    /// Real-time driver rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Time scale applied while the player idles
    pub const IDLE_TIME_SCALE: f32 = 0.9;
    /// Effect blend speed (per unscaled second)
    pub const SLOW_MOTION_TRANSITION_SPEED: f32 = 5.0;
}

/// Experience curve defaults
pub mod progression {
    pub const BASE_EXPERIENCE: u32 = 100;
    pub const LOG_GROWTH: f32 = 0.3;
    pub const LINEAR_GROWTH: f32 = 0.4;
    pub const EXP_GROWTH: f32 = 0.001;
    pub const EXP_POWER: f32 = 1.5;
}

/// Camera defaults (orthographic)
pub mod camera {
    pub const ORTHOGRAPHIC_SIZE: f32 = 5.0;
    pub const ASPECT: f32 = 16.0 / 9.0;
}
