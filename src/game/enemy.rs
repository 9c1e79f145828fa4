use crate::config::DemonModel;
use crate::game::constants::enemy as tuning;
use crate::util::vec2::Vec2;

/// Enemy agent state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnemyState {
    /// Walking toward the player
    Seeking,
    /// Stationary attack: windup, then a live window
    Attacking { elapsed: f32, landed: bool },
    /// Death animation; reported once `elapsed` passes the death delay
    Dying { elapsed: f32 },
    /// Sitting in the pool free list
    Pooled,
}

/// Result of `Enemy::take_damage`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Dead, inactive, or non-positive amount
    Ignored,
    Hurt { remaining: i32 },
    /// Health reached zero on this hit
    Killed,
}

/// Transition reported by `Enemy::update`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyTransition {
    AttackStarted,
    AttackEnded,
    /// Death delay elapsed; the enemy must be reclaimed
    DeathReady,
}

/// A pooled demon instance
#[derive(Debug, Clone)]
pub struct Enemy {
    /// Index into the configured demon list
    pub model_index: usize,
    pub name: String,
    pub max_health: i32,
    pub health: i32,
    pub damage: i32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub move_speed: f32,
    pub score_value: u32,
    pub experience_value: u32,
    /// Spawn profile group this instance was placed for
    pub group: Option<usize>,

    pub position: Vec2,
    /// Seeking velocity
    pub velocity: Vec2,
    /// Decaying impulse from dash hits
    pub knockback: Vec2,

    pub state: EnemyState,
    /// Scaled time the last attack finished
    pub last_attack_at: Option<f64>,
    pub collidable: bool,
    pub dead: bool,
    /// Handed out by the pool
    pub active: bool,
    death_reported: bool,
}

impl Enemy {
    /// A fresh pooled instance
    pub fn new() -> Self {
        let model = DemonModel::default();
        let mut enemy = Self {
            model_index: 0,
            name: String::new(),
            max_health: 0,
            health: 0,
            damage: 0,
            attack_range: 0.0,
            attack_cooldown: 0.0,
            move_speed: 0.0,
            score_value: 0,
            experience_value: 0,
            group: None,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            knockback: Vec2::ZERO,
            state: EnemyState::Pooled,
            last_attack_at: None,
            collidable: true,
            dead: false,
            active: false,
            death_reported: false,
        };
        enemy.apply_model(0, &model);
        enemy
    }

    /// Copy a demon type's stats onto this instance and restore full health
    pub fn apply_model(&mut self, model_index: usize, model: &DemonModel) {
        self.model_index = model_index;
        self.name.clone_from(&model.name);
        self.max_health = model.max_health;
        self.health = model.max_health;
        self.damage = model.damage;
        self.attack_range = model.attack_range;
        self.attack_cooldown = model.attack_cooldown;
        self.move_speed = model.move_speed;
        self.score_value = model.score_value;
        self.experience_value = model.experience_value;
    }

    /// Place a freshly acquired instance into the world
    pub fn spawn_at(&mut self, position: Vec2, group: Option<usize>) {
        self.position = position;
        self.group = group;
        self.state = EnemyState::Seeking;
    }

    /// Restore combat state. Refused while the instance is handed out.
    pub fn reset_state(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.health = self.max_health;
        self.dead = false;
        self.collidable = true;
        self.state = EnemyState::Pooled;
        self.last_attack_at = None;
        self.velocity = Vec2::ZERO;
        self.knockback = Vec2::ZERO;
        self.group = None;
        self.death_reported = false;
        true
    }

    /// Active and not dead
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.active && !self.dead
    }

    #[inline]
    pub fn is_attacking(&self) -> bool {
        matches!(self.state, EnemyState::Attacking { .. })
    }

    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        if !self.is_alive() || amount <= 0 {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount).max(0);
        if self.health == 0 {
            self.dead = true;
            self.collidable = false;
            self.velocity = Vec2::ZERO;
            self.state = EnemyState::Dying { elapsed: 0.0 };
            DamageOutcome::Killed
        } else {
            DamageOutcome::Hurt {
                remaining: self.health,
            }
        }
    }

    pub fn apply_knockback(&mut self, impulse: Vec2) {
        if self.is_alive() {
            self.knockback += impulse;
        }
    }

    fn cooldown_ready(&self, now: f64) -> bool {
        match self.last_attack_at {
            Some(last) => now - last >= self.attack_cooldown as f64,
            None => true,
        }
    }

    /// Variable-rate state machine step
    pub fn update(&mut self, dt: f32, now: f64, target: Vec2) -> Option<EnemyTransition> {
        if !self.active {
            return None;
        }
        match self.state {
            EnemyState::Seeking => {
                let in_range = self.position.distance_to(target) <= self.attack_range;
                if in_range && self.cooldown_ready(now) {
                    self.state = EnemyState::Attacking {
                        elapsed: 0.0,
                        landed: false,
                    };
                    self.velocity = Vec2::ZERO;
                    return Some(EnemyTransition::AttackStarted);
                }
                None
            }
            EnemyState::Attacking { elapsed, landed } => {
                let elapsed = elapsed + dt;
                if elapsed >= tuning::ATTACK_WINDUP + tuning::ATTACK_ACTIVE {
                    self.state = EnemyState::Seeking;
                    self.last_attack_at = Some(now);
                    Some(EnemyTransition::AttackEnded)
                } else {
                    self.state = EnemyState::Attacking { elapsed, landed };
                    None
                }
            }
            EnemyState::Dying { elapsed } => {
                let elapsed = elapsed + dt;
                self.state = EnemyState::Dying { elapsed };
                if elapsed >= tuning::DEATH_DURATION && !self.death_reported {
                    self.death_reported = true;
                    return Some(EnemyTransition::DeathReady);
                }
                None
            }
            EnemyState::Pooled => None,
        }
    }

    /// Attack hitbox is live and has not connected yet
    pub fn attack_window_open(&self) -> bool {
        match self.state {
            EnemyState::Attacking { elapsed, landed } => {
                !landed
                    && elapsed >= tuning::ATTACK_WINDUP
                    && elapsed < tuning::ATTACK_WINDUP + tuning::ATTACK_ACTIVE
            }
            _ => false,
        }
    }

    /// Land the current attack on `target` if it is within reach.
    /// Returns the damage dealt; each attack lands at most once.
    pub fn try_land_attack(&mut self, target: Vec2) -> Option<i32> {
        if !self.attack_window_open() || self.position.distance_to(target) > self.attack_range {
            return None;
        }
        if let EnemyState::Attacking { elapsed, .. } = self.state {
            self.state = EnemyState::Attacking {
                elapsed,
                landed: true,
            };
        }
        Some(self.damage)
    }

    /// Fixed-rate movement step
    pub fn fixed_update(&mut self, dt: f32, target: Vec2) {
        if !self.active {
            return;
        }
        self.velocity = match self.state {
            // Hold position inside attack range while the cooldown runs
            EnemyState::Seeking if self.position.distance_to(target) > self.attack_range => {
                (target - self.position).normalize() * self.move_speed
            }
            _ => Vec2::ZERO,
        };
        self.position += (self.velocity + self.knockback) * dt;

        let decay = (1.0 - tuning::KNOCKBACK_DAMPING * dt).max(0.0);
        self.knockback *= decay;
        if self.knockback.length_sq() < tuning::KNOCKBACK_EPSILON * tuning::KNOCKBACK_EPSILON {
            self.knockback = Vec2::ZERO;
        }
    }
}

impl Default for Enemy {
    fn default() -> Self {
        Self::new()
    }
}
