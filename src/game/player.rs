use crate::config::PlayerModel;
use crate::util::vec2::Vec2;

/// Result of `PlayerState::take_damage`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerDamage {
    /// Invincible, dead, or non-positive amount
    Ignored,
    Hurt { remaining: i32 },
    Died,
}

/// Player body, steering and health
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Joystick direction after the dead zone (length <= 1)
    pub move_input: Vec2,
    /// Steering is suspended while a dash owns the velocity
    pub movement_enabled: bool,

    pub health: i32,
    pub max_health: i32,
    pub damage: i32,
    pub alive: bool,
    /// Scaled time until which hits are ignored
    invincible_until: f64,

    move_speed: f32,
    acceleration: f32,
    deceleration: f32,
    input_deadzone: f32,
    invincibility_duration: f32,
}

impl PlayerState {
    pub fn new(model: &PlayerModel, position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            move_input: Vec2::ZERO,
            movement_enabled: true,
            health: model.max_health,
            max_health: model.max_health,
            damage: model.damage,
            alive: true,
            invincible_until: f64::NEG_INFINITY,
            move_speed: model.move_speed,
            acceleration: model.acceleration,
            deceleration: model.deceleration,
            input_deadzone: model.input_deadzone,
            invincibility_duration: model.invincibility_duration,
        }
    }

    /// Feed a raw joystick vector
    pub fn set_move_input(&mut self, input: Vec2) {
        let (dir, len) = input.normalize_with_length();
        self.move_input = if len < self.input_deadzone {
            Vec2::ZERO
        } else if len > 1.0 {
            dir
        } else {
            input
        };
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn is_moving(&self, min_speed: f32) -> bool {
        self.speed() > min_speed
    }

    /// Unit velocity direction, or zero when stationary
    pub fn movement_direction(&self) -> Vec2 {
        self.velocity.normalize()
    }

    /// Ease velocity toward the joystick target. No-op while movement is disabled.
    pub fn steer(&mut self, dt: f32) {
        if !self.movement_enabled || !self.alive {
            return;
        }
        let (target, rate) = if self.move_input.length() > self.input_deadzone {
            (self.move_input * self.move_speed, self.acceleration)
        } else {
            (Vec2::ZERO, self.deceleration)
        };
        self.velocity = self.velocity.lerp(target, (rate * dt).min(1.0));
    }

    pub fn integrate(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }

    #[inline]
    pub fn is_invincible(&self, now: f64) -> bool {
        now < self.invincible_until
    }

    pub fn take_damage(&mut self, amount: i32, now: f64) -> PlayerDamage {
        if !self.alive || amount <= 0 || self.is_invincible(now) {
            return PlayerDamage::Ignored;
        }
        self.health = (self.health - amount).max(0);
        if self.health == 0 {
            self.alive = false;
            self.velocity = Vec2::ZERO;
            self.movement_enabled = false;
            return PlayerDamage::Died;
        }
        self.invincible_until = now + self.invincibility_duration as f64;
        PlayerDamage::Hurt {
            remaining: self.health,
        }
    }

    /// Restore health, clamped at max. Dead players stay dead.
    pub fn heal(&mut self, amount: i32) {
        if self.alive && amount > 0 {
            self.health = (self.health + amount).min(self.max_health);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> PlayerState {
        PlayerState::new(&PlayerModel::default(), Vec2::ZERO)
    }

    #[test]
    fn test_deadzone() {
        let mut p = player();
        p.set_move_input(Vec2::new(0.05, 0.0));
        assert_eq!(p.move_input, Vec2::ZERO);
        p.set_move_input(Vec2::new(3.0, 4.0));
        assert!((p.move_input.length() - 1.0).abs() < 1e-5);
        p.set_move_input(Vec2::new(0.5, 0.0));
        assert_eq!(p.move_input, Vec2::new(0.5, 0.0));
    }

    #[test]
    fn test_steer_accelerates_and_decelerates() {
        let mut p = player();
        p.set_move_input(Vec2::RIGHT);
        for _ in 0..100 {
            p.steer(0.02);
        }
        assert!((p.velocity.x - p.move_speed).abs() < 0.01);
        assert!(p.is_moving(0.1));
        assert!(p.movement_direction().approx_eq(Vec2::RIGHT, 1e-4));

        p.set_move_input(Vec2::ZERO);
        for _ in 0..100 {
            p.steer(0.02);
        }
        assert!(!p.is_moving(0.1));
    }

    #[test]
    fn test_steer_disabled() {
        let mut p = player();
        p.velocity = Vec2::new(15.0, 0.0);
        p.movement_enabled = false;
        p.set_move_input(Vec2::ZERO);
        p.steer(0.02);
        assert_eq!(p.velocity, Vec2::new(15.0, 0.0));
    }

    #[test]
    fn test_invincibility_window() {
        let mut p = player();
        assert_eq!(p.take_damage(10, 0.0), PlayerDamage::Hurt { remaining: 90 });
        assert_eq!(p.take_damage(10, 0.3), PlayerDamage::Ignored);
        assert_eq!(p.take_damage(10, 0.6), PlayerDamage::Hurt { remaining: 80 });
    }

    #[test]
    fn test_death_and_heal() {
        let mut p = player();
        p.heal(50);
        assert_eq!(p.health, 100);
        p.take_damage(30, 0.0);
        p.heal(10);
        assert_eq!(p.health, 80);
        assert_eq!(p.take_damage(500, 1.0), PlayerDamage::Died);
        assert_eq!(p.health, 0);
        assert!(!p.alive);
        p.heal(10);
        assert_eq!(p.health, 0);
        assert_eq!(p.take_damage(1, 5.0), PlayerDamage::Ignored);
    }
}
