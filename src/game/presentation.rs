//! Fire-and-forget calls into the presentation layer.
//!
//! Rendering, audio and animation live outside the core. Every method has a
//! no-op default so collaborators only override what they render.

use crate::game::pool::EnemyHandle;
use crate::util::vec2::Vec2;

/// Who a presentation call is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Player,
    Enemy(EnemyHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Dash,
    EnemyAttack,
    EnemyHurt,
    EnemyDeath,
    PlayerHurt,
    PlayerDeath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    DashStart,
    DashHit,
    EnemyDeath,
}

/// Animation trigger names
pub mod triggers {
    pub const ATTACK: &str = "Attack";
    pub const HIT: &str = "Hit";
    pub const DEATH: &str = "Death";
    pub const DASH: &str = "Dash";
}

pub trait Presentation {
    /// Pool handed an instance out; rebind visuals
    fn on_acquire(&mut self, _enemy: EnemyHandle) {}
    /// Pool took an instance back; reset visuals
    fn on_release(&mut self, _enemy: EnemyHandle) {}
    fn play_animation_trigger(&mut self, _actor: Actor, _trigger: &'static str) {}
    fn play_sound(&mut self, _actor: Actor, _cue: SoundCue, _pitch: f32) {}
    fn spawn_effect(&mut self, _effect: Effect, _position: Vec2) {}
    /// Dash trail/afterimage on or off
    fn set_dash_visuals(&mut self, _active: bool) {}
    /// Idle slow-motion effect weight in [0, 1]
    fn set_slow_motion_blend(&mut self, _weight: f32) {}
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresentation;

impl Presentation for NullPresentation {}

/// Logs presentation calls at trace level; used by the headless driver
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresentation;

impl Presentation for TracingPresentation {
    fn on_acquire(&mut self, enemy: EnemyHandle) {
        tracing::trace!("acquire visuals for {:?}", enemy);
    }

    fn on_release(&mut self, enemy: EnemyHandle) {
        tracing::trace!("reset visuals for {:?}", enemy);
    }

    fn play_animation_trigger(&mut self, actor: Actor, trigger: &'static str) {
        tracing::trace!("{:?} animation '{}'", actor, trigger);
    }

    fn play_sound(&mut self, actor: Actor, cue: SoundCue, pitch: f32) {
        tracing::trace!("{:?} sound {:?} (pitch {:.2})", actor, cue, pitch);
    }

    fn spawn_effect(&mut self, effect: Effect, position: Vec2) {
        tracing::trace!("effect {:?} at ({:.1}, {:.1})", effect, position.x, position.y);
    }

    fn set_dash_visuals(&mut self, active: bool) {
        tracing::trace!("dash visuals {}", if active { "on" } else { "off" });
    }
}

/// Records calls; lets tests assert on presentation traffic
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingPresentation {
    pub acquired: Vec<EnemyHandle>,
    pub released: Vec<EnemyHandle>,
    pub triggers: Vec<(Actor, &'static str)>,
    pub sounds: Vec<(Actor, SoundCue, f32)>,
    pub effects: Vec<(Effect, Vec2)>,
    pub dash_visuals: Vec<bool>,
    pub slow_motion_blend: f32,
}

#[cfg(test)]
impl Presentation for RecordingPresentation {
    fn on_acquire(&mut self, enemy: EnemyHandle) {
        self.acquired.push(enemy);
    }

    fn on_release(&mut self, enemy: EnemyHandle) {
        self.released.push(enemy);
    }

    fn play_animation_trigger(&mut self, actor: Actor, trigger: &'static str) {
        self.triggers.push((actor, trigger));
    }

    fn play_sound(&mut self, actor: Actor, cue: SoundCue, pitch: f32) {
        self.sounds.push((actor, cue, pitch));
    }

    fn spawn_effect(&mut self, effect: Effect, position: Vec2) {
        self.effects.push((effect, position));
    }

    fn set_dash_visuals(&mut self, active: bool) {
        self.dash_visuals.push(active);
    }

    fn set_slow_motion_blend(&mut self, weight: f32) {
        self.slow_motion_blend = weight;
    }
}
