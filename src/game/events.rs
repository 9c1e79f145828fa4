use serde::Serialize;

use crate::game::pool::EnemyHandle;
use crate::game::systems::dash::{DashKind, DashOutcome};
use crate::util::vec2::Vec2;

/// Events emitted by a game loop tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameLoopEvent {
    EnemySpawned {
        enemy: EnemyHandle,
        model_index: usize,
        position: Vec2,
    },
    EnemyHit {
        enemy: EnemyHandle,
        damage: i32,
        remaining: i32,
    },
    EnemyKilled {
        enemy: EnemyHandle,
        score: u32,
        experience: u32,
    },
    /// Death delay elapsed and the instance went back to the pool
    EnemyReclaimed { enemy: EnemyHandle },
    DashStarted {
        kind: DashKind,
        target: EnemyHandle,
        distance: f32,
    },
    /// Line of sight to the chosen target was blocked
    DashBlocked { target: EnemyHandle },
    DashFinished { outcome: DashOutcome, hits: usize },
    PlayerDamaged { damage: i32, remaining: i32 },
    PlayerDied,
    LevelUp { level: u32 },
}
