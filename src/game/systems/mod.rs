pub mod dash;
pub mod enemy_ai;
pub mod progression;
pub mod slow_motion;
pub mod spawn;
pub mod targeting;
