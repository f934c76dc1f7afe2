use anyhow::{Context, Result};
use log::info;
use std::time::Duration;

use rusted_stack::engine::game_loop::GameLoop;
use rusted_stack::engine::physics::PhysicsWorld;
use rusted_stack::game::{GameConfig, GameEvent, GameSession, JsonFileStore, SessionPhase};

/// Seconds of attract mode before the demo "presses start"
const ATTRACT_SECS: f32 = 3.0;

/// Hard cap on the assisted session
const SESSION_CAP_SECS: f32 = 60.0;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting Rusted Stack...");

    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => GameConfig::default(),
    };

    let store = JsonFileStore::new(&config.best_score_file);
    let physics = PhysicsWorld::new();
    let mut session = GameSession::new(config, physics, Box::new(store))?;
    let mut game_loop = GameLoop::new();

    let mut started = false;
    let mut session_start = 0.0;

    // Main loop
    loop {
        for _ in 0..game_loop.begin_frame() {
            let snapshot = session.on_frame(game_loop.fixed_timestep())?;

            for event in session.drain_events() {
                match event {
                    GameEvent::LayerPlaced { score, perfect }
                        if snapshot.phase == SessionPhase::Playing =>
                    {
                        info!(
                            "Placed layer {} (height {:.0}){}",
                            score,
                            snapshot.stack_height,
                            if perfect { ", perfect!" } else { "" }
                        );
                    }
                    GameEvent::SessionEnded { score, new_best } => {
                        let record = if new_best { "new best" } else { "no record" };
                        info!("Game over at {} ({})", score, record);
                    }
                    _ => {}
                }
            }
        }

        let elapsed = game_loop.simulated_secs();
        if !started && elapsed >= ATTRACT_SECS {
            info!("Leaving attract mode with {} layers up", session.layers().len());
            session.trigger()?;
            session.set_assist(true);
            started = true;
            session_start = elapsed;
        }

        if started
            && (session.phase() == SessionPhase::Ended
                || elapsed - session_start >= SESSION_CAP_SECS)
        {
            break;
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    info!(
        "Finished with score {}, best {}, {} overhangs still falling",
        session.score(),
        session.best_score(),
        session.overhang_count()
    );
    Ok(())
}
