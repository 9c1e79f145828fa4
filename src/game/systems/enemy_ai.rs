//! Per-tick driving of every active enemy agent.

use crate::game::enemy::EnemyTransition;
use crate::game::events::GameLoopEvent;
use crate::game::player::{PlayerDamage, PlayerState};
use crate::game::pool::{EnemyHandle, EnemyPool};
use crate::game::presentation::{triggers, Actor, Presentation, SoundCue};
use crate::util::vec2::Vec2;

/// Variable-rate update. Returns enemies whose death delay just elapsed;
/// each handle is reported once.
pub fn update_enemies(
    pool: &mut EnemyPool,
    dt: f32,
    now: f64,
    player_position: Vec2,
    presentation: &mut dyn Presentation,
) -> Vec<EnemyHandle> {
    let mut deaths = Vec::new();
    for (handle, enemy) in pool.iter_active_mut() {
        match enemy.update(dt, now, player_position) {
            Some(EnemyTransition::AttackStarted) => {
                let actor = Actor::Enemy(handle);
                presentation.play_animation_trigger(actor, triggers::ATTACK);
                presentation.play_sound(actor, SoundCue::EnemyAttack, 1.0);
            }
            Some(EnemyTransition::DeathReady) => deaths.push(handle),
            Some(EnemyTransition::AttackEnded) | None => {}
        }
    }
    deaths
}

/// Fixed-rate movement for every active enemy
pub fn fixed_update_enemies(pool: &mut EnemyPool, dt: f32, player_position: Vec2) {
    for (_, enemy) in pool.iter_active_mut() {
        enemy.fixed_update(dt, player_position);
    }
}

/// Land live attacks on the player. Stops once the player dies.
pub fn resolve_attacks(
    pool: &mut EnemyPool,
    player: &mut PlayerState,
    now: f64,
    presentation: &mut dyn Presentation,
    events: &mut Vec<GameLoopEvent>,
) {
    if !player.alive {
        return;
    }
    for (handle, enemy) in pool.iter_active_mut() {
        if !enemy.is_alive() {
            continue;
        }
        let Some(damage) = enemy.try_land_attack(player.position) else {
            continue;
        };
        match player.take_damage(damage, now) {
            PlayerDamage::Ignored => {}
            PlayerDamage::Hurt { remaining } => {
                presentation.play_animation_trigger(Actor::Player, triggers::HIT);
                presentation.play_sound(Actor::Player, SoundCue::PlayerHurt, 1.0);
                events.push(GameLoopEvent::PlayerDamaged { damage, remaining });
            }
            PlayerDamage::Died => {
                tracing::info!("Player killed by {:?}", handle);
                presentation.play_animation_trigger(Actor::Player, triggers::DEATH);
                presentation.play_sound(Actor::Player, SoundCue::PlayerDeath, 1.0);
                events.push(GameLoopEvent::PlayerDamaged {
                    damage,
                    remaining: 0,
                });
                events.push(GameLoopEvent::PlayerDied);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DemonModel, PlayerModel};
    use crate::game::presentation::RecordingPresentation;

    fn spawn(pool: &mut EnemyPool, position: Vec2, damage: i32) -> EnemyHandle {
        let handle = pool.acquire().unwrap();
        let enemy = pool.get_mut(handle).unwrap();
        enemy.apply_model(
            0,
            &DemonModel {
                damage,
                ..Default::default()
            },
        );
        enemy.spawn_at(position, None);
        handle
    }

    #[test]
    fn test_attack_lands_once_per_attack() {
        let mut pool = EnemyPool::new(2, 2);
        spawn(&mut pool, Vec2::new(1.0, 0.0), 7);
        let mut player = PlayerState::new(&PlayerModel::default(), Vec2::ZERO);
        let mut presentation = RecordingPresentation::default();
        let mut events = Vec::new();

        update_enemies(&mut pool, 0.016, 0.0, player.position, &mut presentation);
        assert_eq!(presentation.triggers.len(), 1);

        let mut now = 0.0;
        for _ in 0..20 {
            now += 0.02;
            update_enemies(&mut pool, 0.02, now, player.position, &mut presentation);
            resolve_attacks(&mut pool, &mut player, now, &mut presentation, &mut events);
        }
        assert_eq!(player.health, 93);
        assert_eq!(
            events,
            vec![GameLoopEvent::PlayerDamaged {
                damage: 7,
                remaining: 93
            }]
        );
    }

    #[test]
    fn test_deaths_reported_once() {
        let mut pool = EnemyPool::new(2, 2);
        let a = spawn(&mut pool, Vec2::new(10.0, 0.0), 1);
        spawn(&mut pool, Vec2::new(-10.0, 0.0), 1);
        pool.get_mut(a).unwrap().take_damage(100);
        let mut presentation = RecordingPresentation::default();

        let mut reported = Vec::new();
        let mut now = 0.0;
        for _ in 0..100 {
            now += 0.05;
            reported.extend(update_enemies(
                &mut pool,
                0.05,
                now,
                Vec2::ZERO,
                &mut presentation,
            ));
        }
        assert_eq!(reported, vec![a]);
    }

    #[test]
    fn test_lethal_attack_stops_resolution() {
        let mut pool = EnemyPool::new(2, 2);
        for _ in 0..2 {
            let h = spawn(&mut pool, Vec2::new(0.5, 0.0), 200);
            pool.get_mut(h).unwrap().state = crate::game::enemy::EnemyState::Attacking {
                elapsed: 0.2,
                landed: false,
            };
        }
        let mut player = PlayerState::new(&PlayerModel::default(), Vec2::ZERO);
        let mut events = Vec::new();
        resolve_attacks(
            &mut pool,
            &mut player,
            0.0,
            &mut RecordingPresentation::default(),
            &mut events,
        );
        assert!(!player.alive);
        assert_eq!(events.last(), Some(&GameLoopEvent::PlayerDied));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_fixed_update_moves_toward_player() {
        let mut pool = EnemyPool::new(1, 1);
        let h = spawn(&mut pool, Vec2::new(10.0, 0.0), 1);
        fixed_update_enemies(&mut pool, 0.5, Vec2::ZERO);
        assert!((pool.get(h).unwrap().position.x - 8.5).abs() < 1e-4);
    }
}
