//! Dash attack state machine.
//!
//! `Idle -> Windup -> Traveling -> Recovering -> Idle`. Decisions run on the
//! variable update; travel and recovery run on the fixed step. Travel spans
//! many fixed steps and carries its loop state (distance, hit set, target) in
//! `TravelState`. `abandon` is the cancellation path: it releases the hit
//! probe and makes every later resume a no-op.

use serde::Serialize;
use smallvec::SmallVec;

use crate::config::DashTuning;
use crate::game::constants::dash as consts;
use crate::game::detection::DetectionSet;
use crate::game::enemy::DamageOutcome;
use crate::game::events::GameLoopEvent;
use crate::game::obstacles::{ColliderOwner, ObstacleField, ProbeId};
use crate::game::player::PlayerState;
use crate::game::pool::{EnemyHandle, EnemyPool};
use crate::game::presentation::{triggers, Actor, Effect, Presentation, SoundCue};
use crate::game::spatial::EnemyGrid;
use crate::game::systems::targeting::{self, TargetChoice};
use crate::util::vec2::Vec2;

/// What triggered a dash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DashKind {
    /// Enemy inside the movement cone; hits everything along the path
    Directional,
    /// Timer-driven, nearest enemy
    Automatic,
    /// Requested by input, nearest enemy
    Manual,
}

impl DashKind {
    #[inline]
    pub fn is_directional(self) -> bool {
        matches!(self, DashKind::Directional)
    }
}

/// How a dash ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DashOutcome {
    /// Travelled the full path
    Completed,
    /// Target was reclaimed mid-travel
    TargetLost,
    /// Obstacle ahead; hard stop
    Interrupted,
    /// No target left when travel was about to begin; cooldown refunded
    Cancelled,
}

/// Enemy lying along a dash segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathEnemy {
    pub handle: EnemyHandle,
    /// Distance from the dash start
    pub distance: f32,
}

/// Geometry of one dash, computed when travel begins
#[derive(Debug, Clone)]
pub struct DashPath {
    pub start: Vec2,
    pub target_point: Vec2,
    pub direction: Vec2,
    pub target_distance: f32,
    /// (target distance + offset) plus a 10% buffer
    pub total_distance: f32,
    /// Sorted by distance from `start`; always contains the target
    pub enemies: Vec<PathEnemy>,
}

impl DashPath {
    /// Build the path toward `target`. `fallback_direction` is used when the
    /// target sits exactly on the start point. `candidates` are the other
    /// enemies that may lie along the segment.
    pub fn compute(
        start: Vec2,
        target: EnemyHandle,
        target_point: Vec2,
        fallback_direction: Vec2,
        offset: f32,
        path_width: f32,
        candidates: impl IntoIterator<Item = (EnemyHandle, Vec2)>,
    ) -> Self {
        let (mut direction, target_distance) = (target_point - start).normalize_with_length();
        if direction == Vec2::ZERO {
            direction = fallback_direction.normalize();
            if direction == Vec2::ZERO {
                direction = Vec2::RIGHT;
            }
        }
        let reach = target_distance + offset;
        let total_distance = reach + reach * consts::LENGTH_BUFFER_RATIO;

        let mut enemies = vec![PathEnemy {
            handle: target,
            distance: target_distance,
        }];
        for (handle, position) in candidates {
            if handle == target {
                continue;
            }
            let to_enemy = position - start;
            let projection = to_enemy.dot(direction);
            if projection < 0.0 || projection > target_distance {
                continue;
            }
            let off_path = position.distance_to(start + direction * projection);
            if off_path < path_width {
                enemies.push(PathEnemy {
                    handle,
                    distance: to_enemy.length(),
                });
            }
        }
        enemies.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.handle.cmp(&b.handle))
        });

        Self {
            start,
            target_point,
            direction,
            target_distance,
            total_distance,
            enemies,
        }
    }

    /// Seconds to cover `total_distance` at `speed`
    pub fn expected_duration(&self, speed: f32) -> f32 {
        if speed > 0.0 {
            self.total_distance / speed
        } else {
            0.0
        }
    }
}

/// Playback rate that fits the dash sound to the dash duration
pub fn dash_sound_pitch(sound_length: f32, expected_duration: f32) -> f32 {
    if sound_length > 0.0 && expected_duration > 0.0 {
        sound_length / expected_duration
    } else {
        1.0
    }
}

/// World access for one dash update
pub struct DashContext<'a> {
    pub now: f64,
    pub player: &'a mut PlayerState,
    pub pool: &'a mut EnemyPool,
    pub detected: &'a mut DetectionSet,
    pub grid: &'a mut EnemyGrid,
    pub obstacles: &'a mut ObstacleField,
    pub presentation: &'a mut dyn Presentation,
    pub events: &'a mut Vec<GameLoopEvent>,
}

#[derive(Debug, Clone, Copy)]
struct PendingDash {
    kind: DashKind,
    target: EnemyHandle,
}

#[derive(Debug, Clone)]
struct TravelState {
    kind: DashKind,
    target: EnemyHandle,
    path: DashPath,
    traveled: f32,
    pre_velocity: Vec2,
    hit_set: SmallVec<[EnemyHandle; 8]>,
    has_hit_target: bool,
    /// Trigger circle that follows the player while travelling. It is the
    /// dash hitbox other layers see through `ObstacleField::probe`; hits
    /// themselves are resolved by distance in `travel_step`.
    probe: ProbeId,
}

#[derive(Debug, Clone)]
struct RecoverState {
    kind: DashKind,
    target: EnemyHandle,
    direction: Vec2,
    pre_velocity: Vec2,
    outcome: DashOutcome,
    target_hit: bool,
    hits: usize,
}

#[derive(Debug, Clone)]
enum DashPhase {
    Idle,
    Windup(PendingDash),
    Traveling(Box<TravelState>),
    Recovering(RecoverState),
}

/// Coarse phase for callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DashPhaseKind {
    Idle,
    Windup,
    Traveling,
    Recovering,
}

/// Dash counters
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DashStats {
    pub started: u64,
    pub completed: u64,
    pub interrupted: u64,
    pub target_lost: u64,
    pub cancelled: u64,
    pub abandoned: u64,
    pub blocked: u64,
    pub enemies_hit: u64,
}

/// Owns the player's dash state
#[derive(Debug)]
pub struct DashController {
    tuning: DashTuning,
    phase: DashPhase,
    cooldown_started_at: Option<f64>,
    next_auto_dash_at: f64,
    abandoned: bool,
    stats: DashStats,
}

impl DashController {
    pub fn new(tuning: DashTuning) -> Self {
        let mut tuning = tuning;
        tuning.automatic_dash_interval = tuning.automatic_dash_interval.max(tuning.dash_cooldown);
        Self {
            tuning,
            phase: DashPhase::Idle,
            cooldown_started_at: None,
            next_auto_dash_at: 0.0,
            abandoned: false,
            stats: DashStats::default(),
        }
    }

    pub fn tuning(&self) -> &DashTuning {
        &self.tuning
    }

    pub fn stats(&self) -> DashStats {
        self.stats
    }

    pub fn phase(&self) -> DashPhaseKind {
        match self.phase {
            DashPhase::Idle => DashPhaseKind::Idle,
            DashPhase::Windup(_) => DashPhaseKind::Windup,
            DashPhase::Traveling(_) => DashPhaseKind::Traveling,
            DashPhase::Recovering(_) => DashPhaseKind::Recovering,
        }
    }

    #[inline]
    pub fn is_dashing(&self) -> bool {
        !matches!(self.phase, DashPhase::Idle)
    }

    #[inline]
    pub fn is_traveling(&self) -> bool {
        matches!(self.phase, DashPhase::Traveling(_))
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// Cooldown elapsed since the last dash start
    pub fn can_dash(&self, now: f64) -> bool {
        match self.cooldown_started_at {
            Some(started) => now - started >= self.tuning.dash_cooldown as f64,
            None => true,
        }
    }

    pub fn next_auto_dash_at(&self) -> f64 {
        self.next_auto_dash_at
    }

    /// Current dash target, if any
    pub fn target(&self) -> Option<EnemyHandle> {
        match &self.phase {
            DashPhase::Idle => None,
            DashPhase::Windup(p) => Some(p.target),
            DashPhase::Traveling(t) => Some(t.target),
            DashPhase::Recovering(r) => Some(r.target),
        }
    }

    /// Enemies hit by the dash in flight
    pub fn current_hits(&self) -> &[EnemyHandle] {
        match &self.phase {
            DashPhase::Traveling(t) => t.hit_set.as_slice(),
            _ => &[],
        }
    }

    pub fn current_path(&self) -> Option<&DashPath> {
        match &self.phase {
            DashPhase::Traveling(t) => Some(&t.path),
            _ => None,
        }
    }

    /// Enabling schedules an automatic dash right away
    pub fn set_automatic_dash(&mut self, enabled: bool, now: f64) {
        self.tuning.automatic_dash_enabled = enabled;
        if enabled {
            self.next_auto_dash_at = now;
        }
    }

    /// Clamped to at least the dash cooldown
    pub fn set_automatic_dash_interval(&mut self, interval: f32) {
        self.tuning.automatic_dash_interval = interval.max(self.tuning.dash_cooldown);
    }

    pub fn set_directional_dash(&mut self, enabled: bool) {
        self.tuning.directional_dash_enabled = enabled;
    }

    /// Variable-rate update: pick a target and start a dash when one is due
    pub fn update(&mut self, ctx: &mut DashContext<'_>) {
        if self.abandoned || !ctx.player.alive || self.is_dashing() || !self.can_dash(ctx.now) {
            return;
        }
        let now = ctx.now;
        let mut auto_due =
            self.tuning.automatic_dash_enabled && now >= self.next_auto_dash_at;

        if self.tuning.directional_dash_enabled
            && ctx.player.is_moving(self.tuning.min_movement_speed)
        {
            let direction = ctx.player.movement_direction();
            if let Some(choice) = targeting::nearest_in_cone(
                ctx.player.position,
                direction,
                self.tuning.direction_angle_threshold,
                ctx.detected,
                ctx.pool,
            ) {
                if self.try_start(DashKind::Directional, choice, ctx) {
                    self.next_auto_dash_at = now + self.tuning.automatic_dash_interval as f64;
                    return;
                }
                self.next_auto_dash_at = now + self.tuning.retry_backoff as f64;
                auto_due = false;
            }
        }

        if auto_due {
            let started = match self.nearest_target(ctx) {
                Some(choice) => self.try_start(DashKind::Automatic, choice, ctx),
                None => false,
            };
            let delay = if started {
                self.tuning.automatic_dash_interval
            } else {
                self.tuning.retry_backoff
            };
            self.next_auto_dash_at = now + delay as f64;
        }
    }

    /// Manual dash at the nearest enemy. Returns whether a dash started.
    pub fn request_dash(&mut self, ctx: &mut DashContext<'_>) -> bool {
        if self.abandoned || !ctx.player.alive || self.is_dashing() || !self.can_dash(ctx.now) {
            return false;
        }
        match self.nearest_target(ctx) {
            Some(choice) => self.try_start(DashKind::Manual, choice, ctx),
            None => false,
        }
    }

    /// Nearest enemy, re-scanning first when the set is empty
    fn nearest_target(&self, ctx: &mut DashContext<'_>) -> Option<TargetChoice> {
        if ctx.detected.is_empty() {
            ctx.detected.rescan(
                ctx.player.position,
                self.tuning.detection_radius,
                ctx.pool,
                ctx.grid,
            );
        }
        targeting::nearest_enemy(ctx.player.position, ctx.detected, ctx.pool)
    }

    /// Idle -> Windup when line of sight is clear
    fn try_start(
        &mut self,
        kind: DashKind,
        choice: TargetChoice,
        ctx: &mut DashContext<'_>,
    ) -> bool {
        if targeting::is_obstacle_between(
            ctx.obstacles,
            ctx.player.position,
            choice.position,
            ColliderOwner::Player,
            ColliderOwner::Enemy(choice.handle),
        ) {
            tracing::debug!("Dash blocked by obstacle ({:?} -> {:?})", kind, choice.handle);
            self.stats.blocked += 1;
            ctx.events.push(GameLoopEvent::DashBlocked {
                target: choice.handle,
            });
            return false;
        }

        self.cooldown_started_at = Some(ctx.now);
        ctx.player.movement_enabled = false;
        ctx.presentation
            .spawn_effect(Effect::DashStart, ctx.player.position);
        ctx.presentation.set_dash_visuals(true);
        ctx.presentation
            .play_animation_trigger(Actor::Player, triggers::DASH);

        self.phase = DashPhase::Windup(PendingDash {
            kind,
            target: choice.handle,
        });
        self.stats.started += 1;
        ctx.events.push(GameLoopEvent::DashStarted {
            kind,
            target: choice.handle,
            distance: choice.distance,
        });
        tracing::debug!(
            "{:?} dash at {:?} ({:.2} away)",
            kind,
            choice.handle,
            choice.distance
        );
        true
    }

    /// Fixed-rate update: advance windup, travel and recovery
    pub fn fixed_update(&mut self, dt: f32, ctx: &mut DashContext<'_>) {
        if self.abandoned {
            return;
        }
        match std::mem::replace(&mut self.phase, DashPhase::Idle) {
            DashPhase::Idle => {}
            DashPhase::Windup(pending) => {
                if let Some(travel) = self.begin_travel(pending, ctx) {
                    self.phase = DashPhase::Traveling(travel);
                    self.travel_step(dt, ctx);
                }
            }
            DashPhase::Traveling(travel) => {
                self.phase = DashPhase::Traveling(travel);
                self.travel_step(dt, ctx);
            }
            DashPhase::Recovering(recover) => self.recover(recover, ctx),
        }
    }

    /// Windup -> Traveling. Re-targets the nearest enemy when the original
    /// one is gone; cancels and refunds the cooldown when there is none.
    fn begin_travel(
        &mut self,
        pending: PendingDash,
        ctx: &mut DashContext<'_>,
    ) -> Option<Box<TravelState>> {
        let original = ctx.pool.get_alive(pending.target).map(|e| e.position);
        let target = match original {
            Some(position) => Some((pending.target, position)),
            None => self
                .nearest_target(ctx)
                .map(|choice| (choice.handle, choice.position)),
        };
        let Some((target, target_point)) = target else {
            tracing::debug!("Dash target vanished before travel; cancelling");
            self.cooldown_started_at = None;
            ctx.player.movement_enabled = true;
            ctx.presentation.set_dash_visuals(false);
            self.stats.cancelled += 1;
            ctx.events.push(GameLoopEvent::DashFinished {
                outcome: DashOutcome::Cancelled,
                hits: 0,
            });
            return None;
        };

        let start = ctx.player.position;
        let candidates: Vec<(EnemyHandle, Vec2)> = if pending.kind.is_directional() {
            ctx.detected
                .iter()
                .filter_map(|h| ctx.pool.get_alive(h).map(|e| (h, e.position)))
                .collect()
        } else {
            Vec::new()
        };
        let path = DashPath::compute(
            start,
            target,
            target_point,
            ctx.player.movement_direction(),
            self.tuning.dash_offset,
            self.tuning.path_width,
            candidates,
        );

        let pitch = dash_sound_pitch(
            self.tuning.sound_length,
            path.expected_duration(self.tuning.dash_speed),
        );
        ctx.presentation
            .play_sound(Actor::Player, SoundCue::Dash, pitch);

        let pre_velocity = ctx.player.velocity;
        ctx.player.velocity = path.direction * self.tuning.dash_speed;
        let probe = ctx
            .obstacles
            .attach_probe(ColliderOwner::Player, start, consts::HIT_PROBE_RADIUS);

        Some(Box::new(TravelState {
            kind: pending.kind,
            target,
            path,
            traveled: 0.0,
            pre_velocity,
            hit_set: SmallVec::new(),
            has_hit_target: false,
            probe,
        }))
    }

    fn travel_step(&mut self, dt: f32, ctx: &mut DashContext<'_>) {
        let DashPhase::Traveling(travel) = &mut self.phase else {
            return;
        };

        let outcome = 'step: {
            // Reclaimed target ends travel; a dying one keeps it going
            if !ctx.pool.contains(travel.target) {
                break 'step Some(DashOutcome::TargetLost);
            }

            // Look at least one step ahead so a thin wall cannot be skipped
            let direction = travel.path.direction;
            let look_ahead = consts::OBSTACLE_PROBE_DISTANCE.max(self.tuning.dash_speed * dt);
            if targeting::is_obstructed_ahead(
                ctx.obstacles,
                ctx.player.position,
                direction,
                look_ahead,
                ColliderOwner::Player,
                ColliderOwner::Enemy(travel.target),
            ) {
                tracing::debug!("Dash interrupted by obstacle");
                ctx.player.velocity = Vec2::ZERO;
                break 'step Some(DashOutcome::Interrupted);
            }

            ctx.player.velocity = direction * self.tuning.dash_speed;
            ctx.player.integrate(dt);
            ctx.obstacles.move_probe(travel.probe, ctx.player.position);

            if travel.kind.is_directional() {
                for i in 0..travel.path.enemies.len() {
                    let handle = travel.path.enemies[i].handle;
                    if travel.hit_set.contains(&handle) {
                        continue;
                    }
                    let Some(enemy) = ctx.pool.get_alive(handle) else {
                        continue;
                    };
                    let to_enemy = enemy.position - ctx.player.position;
                    let passed = to_enemy.length() < consts::HIT_DISTANCE
                        || direction.dot(to_enemy.normalize()) < 0.0;
                    if passed && strike(handle, direction, ctx) {
                        travel.hit_set.push(handle);
                        self.stats.enemies_hit += 1;
                    }
                }
            } else if !travel.has_hit_target {
                let reached = ctx.pool.get_alive(travel.target).is_some_and(|e| {
                    e.position.distance_to(ctx.player.position) < consts::HIT_DISTANCE
                });
                if reached && strike(travel.target, direction, ctx) {
                    travel.has_hit_target = true;
                    self.stats.enemies_hit += 1;
                }
            }
            ctx.detected.flush();

            travel.traveled = travel.path.start.distance_to(ctx.player.position);
            if travel.traveled >= travel.path.total_distance {
                break 'step Some(DashOutcome::Completed);
            }
            None
        };

        if let Some(outcome) = outcome {
            self.end_travel(outcome, ctx);
        }
    }

    /// Traveling -> Recovering; releases the hit probe
    fn end_travel(&mut self, outcome: DashOutcome, ctx: &mut DashContext<'_>) {
        let DashPhase::Traveling(travel) =
            std::mem::replace(&mut self.phase, DashPhase::Idle)
        else {
            return;
        };
        ctx.obstacles.release_probe(travel.probe);

        let target_hit = if travel.kind.is_directional() {
            travel.hit_set.contains(&travel.target)
        } else {
            travel.has_hit_target
        };
        let hits = if travel.kind.is_directional() {
            travel.hit_set.len()
        } else {
            usize::from(travel.has_hit_target)
        };
        self.phase = DashPhase::Recovering(RecoverState {
            kind: travel.kind,
            target: travel.target,
            direction: travel.path.direction,
            pre_velocity: travel.pre_velocity,
            outcome,
            target_hit,
            hits,
        });
    }

    /// Recovering -> Idle
    fn recover(&mut self, state: RecoverState, ctx: &mut DashContext<'_>) {
        ctx.player.velocity = match state.outcome {
            DashOutcome::Interrupted => Vec2::ZERO,
            _ => state.pre_velocity * consts::RECOVERY_VELOCITY_FACTOR,
        };
        ctx.player.movement_enabled = true;
        ctx.presentation.set_dash_visuals(false);

        let mut hits = state.hits;
        if !state.target_hit && ctx.pool.get_alive(state.target).is_some() {
            if strike(state.target, state.direction, ctx) {
                hits += 1;
                self.stats.enemies_hit += 1;
            }
            ctx.detected.flush();
        }

        match state.outcome {
            DashOutcome::Completed => self.stats.completed += 1,
            DashOutcome::Interrupted => self.stats.interrupted += 1,
            DashOutcome::TargetLost => self.stats.target_lost += 1,
            DashOutcome::Cancelled => self.stats.cancelled += 1,
        }
        tracing::debug!("{:?} dash finished: {:?}, {} hit", state.kind, state.outcome, hits);
        ctx.events.push(GameLoopEvent::DashFinished {
            outcome: state.outcome,
            hits,
        });
        self.phase = DashPhase::Idle;
    }

    /// Owner is gone: drop the in-flight dash without any callbacks and
    /// release the hit probe. Later updates are no-ops.
    pub fn abandon(&mut self, obstacles: &mut ObstacleField) {
        if self.abandoned {
            return;
        }
        self.abandoned = true;
        match std::mem::replace(&mut self.phase, DashPhase::Idle) {
            DashPhase::Idle => {}
            DashPhase::Traveling(travel) => {
                obstacles.release_probe(travel.probe);
                self.stats.abandoned += 1;
            }
            DashPhase::Windup(_) | DashPhase::Recovering(_) => self.stats.abandoned += 1,
        }
        tracing::debug!("Dash controller abandoned");
    }
}

/// Apply one dash hit with knockback. Returns whether damage landed.
fn strike(handle: EnemyHandle, direction: Vec2, ctx: &mut DashContext<'_>) -> bool {
    let damage = ctx.player.damage;
    let Some(enemy) = ctx.pool.get_mut(handle) else {
        return false;
    };
    enemy.apply_knockback(direction * consts::KNOCKBACK_IMPULSE);
    let position = enemy.position;
    let (score, experience) = (enemy.score_value, enemy.experience_value);

    match enemy.take_damage(damage) {
        DamageOutcome::Ignored => false,
        DamageOutcome::Hurt { remaining } => {
            let actor = Actor::Enemy(handle);
            ctx.presentation.play_animation_trigger(actor, triggers::HIT);
            ctx.presentation.play_sound(actor, SoundCue::EnemyHurt, 1.0);
            ctx.presentation.spawn_effect(Effect::DashHit, position);
            ctx.events.push(GameLoopEvent::EnemyHit {
                enemy: handle,
                damage,
                remaining,
            });
            true
        }
        DamageOutcome::Killed => {
            let actor = Actor::Enemy(handle);
            ctx.presentation.play_animation_trigger(actor, triggers::DEATH);
            ctx.presentation.play_sound(actor, SoundCue::EnemyDeath, 1.0);
            ctx.presentation.spawn_effect(Effect::EnemyDeath, position);
            ctx.detected.schedule_removal(handle);
            ctx.events.push(GameLoopEvent::EnemyHit {
                enemy: handle,
                damage,
                remaining: 0,
            });
            ctx.events.push(GameLoopEvent::EnemyKilled {
                enemy: handle,
                score,
                experience,
            });
            true
        }
    }
}
