//! Score and experience bookkeeping behind the `Progression` seam.

use serde::Serialize;

use crate::config::LevelCurve;

/// Receives kill rewards and the player's death
pub trait Progression {
    /// Credit a kill; returns how many levels were gained
    fn award(&mut self, score: u32, experience: u32) -> u32;
    fn player_died(&mut self);
    fn is_game_over(&self) -> bool;

    fn score(&self) -> u64 {
        0
    }

    fn level(&self) -> u32 {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressionSnapshot {
    pub score: u64,
    pub level: u32,
    pub experience: u32,
    pub experience_to_next: u32,
    pub game_over: bool,
}

/// In-memory score and level tracker
#[derive(Debug, Clone)]
pub struct ScoreKeeper {
    curve: LevelCurve,
    score: u64,
    level: u32,
    experience: u32,
    experience_to_next: u32,
    game_over: bool,
}

impl ScoreKeeper {
    pub fn new(curve: LevelCurve) -> Self {
        let experience_to_next = experience_for_level(&curve, 1);
        Self {
            curve,
            score: 0,
            level: 1,
            experience: 0,
            experience_to_next,
            game_over: false,
        }
    }

    pub fn experience(&self) -> u32 {
        self.experience
    }

    pub fn experience_to_next(&self) -> u32 {
        self.experience_to_next
    }

    pub fn snapshot(&self) -> ProgressionSnapshot {
        ProgressionSnapshot {
            score: self.score,
            level: self.level,
            experience: self.experience,
            experience_to_next: self.experience_to_next,
            game_over: self.game_over,
        }
    }
}

impl Default for ScoreKeeper {
    fn default() -> Self {
        Self::new(LevelCurve::default())
    }
}

/// Experience needed to advance past `level`
pub fn experience_for_level(curve: &LevelCurve, level: u32) -> u32 {
    let base = curve.base_experience as f64;
    let l = level as f64;
    let multiplier = 1.0
        + curve.log_growth as f64 * (l + 1.0).log2()
        + curve.linear_growth as f64 * l
        + curve.exp_growth as f64 * l.powf(curve.exp_power as f64);
    let scaled = (base * multiplier).round();
    if scaled >= u32::MAX as f64 {
        return u32::MAX;
    }
    (scaled as u32).max(curve.base_experience)
}

impl Progression for ScoreKeeper {
    fn award(&mut self, score: u32, experience: u32) -> u32 {
        if self.game_over {
            return 0;
        }
        self.score += score as u64;
        self.experience = self.experience.saturating_add(experience);

        let mut gained = 0;
        while self.experience_to_next > 0 && self.experience >= self.experience_to_next {
            self.experience -= self.experience_to_next;
            self.level += 1;
            gained += 1;
            self.experience_to_next = experience_for_level(&self.curve, self.level);
            tracing::info!(
                "Reached level {} ({} xp to next)",
                self.level,
                self.experience_to_next
            );
        }
        gained
    }

    fn player_died(&mut self) {
        if !self.game_over {
            tracing::info!("Game over at level {} with score {}", self.level, self.score);
        }
        self.game_over = true;
    }

    fn is_game_over(&self) -> bool {
        self.game_over
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn level(&self) -> u32 {
        self.level
    }
}
