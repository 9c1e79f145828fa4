//! Idle slow motion: the clock slows while the player stands still and is not
//! dashing. The effect blend eases on unscaled time.

use crate::config::SlowMotionConfig;
use crate::game::clock::GameClock;
use crate::game::presentation::Presentation;

#[derive(Debug, Clone)]
pub struct SlowMotion {
    config: SlowMotionConfig,
    active: bool,
    /// Scale in force before slow motion engaged
    previous_scale: f32,
    blend: f32,
}

impl SlowMotion {
    pub fn new(config: SlowMotionConfig) -> Self {
        Self {
            config,
            active: false,
            previous_scale: 1.0,
            blend: 0.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn blend(&self) -> f32 {
        self.blend
    }

    /// Enable or disable at runtime. Disabling while active restores the scale.
    pub fn set_enabled(&mut self, enabled: bool, clock: &mut GameClock) {
        self.config.enabled = enabled;
        if !enabled {
            self.disengage(clock);
        }
    }

    /// Engage or release slow motion for this tick and ease the blend
    pub fn update(
        &mut self,
        idle: bool,
        clock: &mut GameClock,
        presentation: &mut dyn Presentation,
    ) {
        if !self.config.enabled {
            return;
        }
        if idle && !self.active {
            self.previous_scale = clock.time_scale();
            clock.set_time_scale(self.config.idle_time_scale);
            self.active = true;
            tracing::trace!("Slow motion engaged");
        } else if !idle && self.active {
            self.disengage(clock);
        }

        let target = if self.active { 1.0 } else { 0.0 };
        let step = self.config.transition_speed * clock.unscaled_delta();
        let blend = if self.blend < target {
            (self.blend + step).min(target)
        } else {
            (self.blend - step).max(target)
        };
        if blend != self.blend {
            self.blend = blend;
            presentation.set_slow_motion_blend(blend);
        }
    }

    fn disengage(&mut self, clock: &mut GameClock) {
        if self.active {
            clock.set_time_scale(self.previous_scale);
            self.active = false;
            tracing::trace!("Slow motion released");
        }
    }

    /// Session teardown: the clock returns to normal speed
    pub fn teardown(&mut self, clock: &mut GameClock) {
        self.active = false;
        self.blend = 0.0;
        clock.set_time_scale(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::presentation::RecordingPresentation;

    fn enabled() -> SlowMotion {
        SlowMotion::new(SlowMotionConfig {
            enabled: true,
            idle_time_scale: 0.9,
            transition_speed: 5.0,
        })
    }

    #[test]
    fn test_idle_slows_and_moving_restores() {
        let mut slow = enabled();
        let mut clock = GameClock::default();
        let mut presentation = RecordingPresentation::default();

        clock.advance(0.1);
        slow.update(true, &mut clock, &mut presentation);
        assert!(slow.is_active());
        assert_eq!(clock.time_scale(), 0.9);

        clock.advance(0.1);
        slow.update(false, &mut clock, &mut presentation);
        assert!(!slow.is_active());
        assert_eq!(clock.time_scale(), 1.0);
    }

    #[test]
    fn test_blend_eases_on_unscaled_time() {
        let mut slow = enabled();
        let mut clock = GameClock::default();
        let mut presentation = RecordingPresentation::default();

        clock.advance(0.1);
        slow.update(true, &mut clock, &mut presentation);
        assert!((slow.blend() - 0.5).abs() < 1e-5);
        // Scaled delta is 0.09 now, the blend still advances by 5 * 0.1
        clock.advance(0.1);
        slow.update(true, &mut clock, &mut presentation);
        assert_eq!(slow.blend(), 1.0);
        assert_eq!(presentation.slow_motion_blend, 1.0);

        clock.advance(0.1);
        slow.update(false, &mut clock, &mut presentation);
        assert!((slow.blend() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_disabled_does_nothing() {
        let mut slow = SlowMotion::new(SlowMotionConfig {
            enabled: false,
            ..Default::default()
        });
        let mut clock = GameClock::default();
        clock.advance(0.1);
        slow.update(true, &mut clock, &mut RecordingPresentation::default());
        assert_eq!(clock.time_scale(), 1.0);
        assert_eq!(slow.blend(), 0.0);
    }

    #[test]
    fn test_teardown_restores_normal_speed() {
        let mut slow = enabled();
        let mut clock = GameClock::default();
        clock.advance(0.1);
        slow.update(true, &mut clock, &mut RecordingPresentation::default());
        slow.teardown(&mut clock);
        assert_eq!(clock.time_scale(), 1.0);

        slow.update(true, &mut clock, &mut RecordingPresentation::default());
        slow.set_enabled(false, &mut clock);
        assert_eq!(clock.time_scale(), 1.0);
    }
}
