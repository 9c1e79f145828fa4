//! Scaled and unscaled session time.
//!
//! Gameplay timers and movement read scaled time. Audio/visual pacing reads
//! unscaled time. The fixed physics channel accumulates scaled time and is
//! drained in `fixed_dt` steps.

/// Session clock with a global time scale
#[derive(Debug, Clone)]
pub struct GameClock {
    scaled_time: f64,
    unscaled_time: f64,
    time_scale: f32,
    fixed_dt: f32,
    max_fixed_steps: u32,
    accumulator: f32,
    /// Scaled delta of the most recent advance
    delta: f32,
    /// Unscaled delta of the most recent advance
    unscaled_delta: f32,
}

impl GameClock {
    pub fn new(fixed_dt: f32, max_fixed_steps: u32) -> Self {
        Self {
            scaled_time: 0.0,
            unscaled_time: 0.0,
            time_scale: 1.0,
            fixed_dt,
            max_fixed_steps: max_fixed_steps.max(1),
            accumulator: 0.0,
            delta: 0.0,
            unscaled_delta: 0.0,
        }
    }

    /// Advance by `real_dt` seconds of wall time. Returns the scaled delta.
    pub fn advance(&mut self, real_dt: f32) -> f32 {
        let real_dt = real_dt.max(0.0);
        self.unscaled_delta = real_dt;
        self.delta = real_dt * self.time_scale;
        self.unscaled_time += real_dt as f64;
        self.scaled_time += self.delta as f64;
        self.accumulator += self.delta;
        self.delta
    }

    /// Number of fixed steps owed since the last call, capped at `max_fixed_steps`.
    /// Time beyond the cap is dropped so a long stall does not spiral.
    pub fn drain_fixed_steps(&mut self) -> u32 {
        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < self.max_fixed_steps {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }
        if steps == self.max_fixed_steps && self.accumulator >= self.fixed_dt {
            tracing::debug!(
                "Dropping {:.3}s of physics backlog",
                self.accumulator - self.accumulator % self.fixed_dt
            );
            self.accumulator %= self.fixed_dt;
        }
        steps
    }

    #[inline]
    pub fn now(&self) -> f64 {
        self.scaled_time
    }

    #[inline]
    pub fn unscaled_now(&self) -> f64 {
        self.unscaled_time
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    #[inline]
    pub fn unscaled_delta(&self) -> f32 {
        self.unscaled_delta
    }

    #[inline]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }
}

impl Default for GameClock {
    fn default() -> Self {
        use super::constants::time;
        Self::new(time::FIXED_DT, time::MAX_FIXED_STEPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_advance_applies_scale() {
        let mut clock = GameClock::new(0.02, 8);
        clock.set_time_scale(0.5);
        let dt = clock.advance(0.1);
        assert!((dt - 0.05).abs() < EPSILON);
        assert!((clock.now() - 0.05).abs() < 1e-6);
        assert!((clock.unscaled_now() - 0.1).abs() < 1e-6);
        assert!((clock.unscaled_delta() - 0.1).abs() < EPSILON);
    }

    #[test]
    fn test_fixed_steps_accumulate() {
        let mut clock = GameClock::new(0.02, 8);
        clock.advance(0.03);
        assert_eq!(clock.drain_fixed_steps(), 1);
        clock.advance(0.011);
        // 0.01 carried + 0.011
        assert_eq!(clock.drain_fixed_steps(), 1);
        clock.advance(0.0);
        assert_eq!(clock.drain_fixed_steps(), 0);
    }

    #[test]
    fn test_fixed_steps_capped() {
        let mut clock = GameClock::new(0.02, 4);
        clock.advance(1.0);
        assert_eq!(clock.drain_fixed_steps(), 4);
        // Backlog is dropped rather than replayed
        assert_eq!(clock.drain_fixed_steps(), 0);
    }

    #[test]
    fn test_negative_dt_ignored() {
        let mut clock = GameClock::default();
        clock.advance(-1.0);
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn test_zero_scale_freezes_scaled_time() {
        let mut clock = GameClock::default();
        clock.set_time_scale(0.0);
        clock.advance(1.0);
        assert_eq!(clock.now(), 0.0);
        assert!(clock.unscaled_now() > 0.9);
    }
}
