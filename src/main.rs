use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use demon_dash::config::GameConfig;
use demon_dash::game::events::GameLoopEvent;
use demon_dash::game::game_loop::GameLoop;
use demon_dash::game::input_buffer::{InputBufferError, InputCommand, InputSender};
use demon_dash::game::presentation::TracingPresentation;
use demon_dash::game::systems::progression::ScoreKeeper;
use demon_dash::util::vec2::Vec2;

/// Seconds between periodic stat lines
const STATS_INTERVAL_SECS: u64 = 5;

/// Drive the joystick in slow circles with pauses, so both directional
/// dashes and idle slow motion get exercised.
async fn scripted_joystick(sender: InputSender) {
    let mut ticker = interval(Duration::from_millis(100));
    let mut step: u32 = 0;
    loop {
        ticker.tick().await;
        step = step.wrapping_add(1);
        let phase = step % 80;
        let command = if phase < 60 {
            InputCommand::Move(Vec2::from_angle(step as f32 * 0.05))
        } else {
            InputCommand::Move(Vec2::ZERO)
        };
        match sender.try_send(command) {
            Ok(()) | Err(InputBufferError::Full) => {}
            Err(InputBufferError::Disconnected) => break,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Demon Dash v{}", env!("CARGO_PKG_VERSION"));

    let config = GameConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: {} demon types, spawn every {:.1}s, dash cooldown {:.1}s",
        config.demons.len(),
        config.spawner.spawn_interval,
        config.dash.dash_cooldown
    );

    let tick_rate = config.timing.tick_rate.max(1);
    let progression = ScoreKeeper::new(config.level_curve.clone());
    let mut game = GameLoop::with_parts(config, TracingPresentation, progression)?;

    tokio::spawn(scripted_joystick(game.input_sender()));

    let mut ticker = interval(Duration::from_secs_f64(1.0 / tick_rate as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Game loop started at {} Hz", tick_rate);

    let start = Instant::now();
    let mut last_tick = Instant::now();
    let mut next_stats = Duration::from_secs(STATS_INTERVAL_SECS);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let real_dt = now.duration_since(last_tick).as_secs_f32();
                last_tick = now;

                for event in game.tick(real_dt) {
                    match event {
                        GameLoopEvent::EnemyKilled { enemy, score, .. } => {
                            info!("Killed {:?} (+{})", enemy, score);
                        }
                        GameLoopEvent::LevelUp { level } => info!("Level up: {}", level),
                        GameLoopEvent::PlayerDied => warn!("Player died"),
                        _ => {}
                    }
                }

                if start.elapsed() >= next_stats {
                    next_stats += Duration::from_secs(STATS_INTERVAL_SECS);
                    let stats = game.stats();
                    info!(
                        "Game: {:.0}s, tick {}, {} enemies ({} dying), {} detected | dashes {} hits {} | score {} level {} hp {}",
                        stats.elapsed,
                        stats.ticks,
                        stats.live_enemies,
                        stats.dying_enemies,
                        stats.detected,
                        stats.dash.started,
                        stats.dash.enemies_hit,
                        stats.score,
                        stats.level,
                        stats.player_health
                    );
                }

                if game.stats().game_over {
                    info!("Game over");
                    break;
                }
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown signal received");
                break;
            }
        }
    }

    game.shutdown();
    info!("Final stats: {}", serde_json::to_string(&game.stats())?);

    Ok(())
}
