//! Headless runner demo -- boots the game, starts a run and lets a simple
//! autopilot jump over obstacles until the run ends.
//!
//! Run with:
//!   cargo run --example headless_run -p runner-engine -- [seed]
//!
//! Set `RUST_LOG=runner_engine=debug` to follow scene transitions and pickups.

use anyhow::{bail, Context};
use runner_engine::prelude::*;

/// Ticks allowed for the whole session (about ten minutes at 60 Hz).
const MAX_TICKS: u64 = 36_000;

/// How far ahead of the player an obstacle triggers a jump.
const JUMP_LOOKAHEAD: f32 = 120.0;

fn autopilot(sim: &SimulationLoop) -> InputFrame {
    let Some(player) = sim.player_position() else {
        return InputFrame::IDLE;
    };
    let threat = sim.entities_of(EntityKind::Obstacle).any(|(_, obstacle)| {
        let ahead = obstacle.position.x - player.x;
        ahead > 0.0 && ahead < JUMP_LOOKAHEAD
    });
    if threat && sim.is_player_grounded() {
        InputFrame::jump()
    } else {
        InputFrame::IDLE
    }
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = GameConfig::default();
    if let Some(arg) = std::env::args().nth(1) {
        config.seed = arg
            .parse()
            .with_context(|| format!("seed must be an integer, got {arg:?}"))?;
    }

    let ctx = GameContext::new(config, HeadlessBackend::new())?;
    let mut game = TickLoop::new(ctx, TickConfig::default());

    if !game.run_until(|m| m.active_id() == SceneId::MainMenu, 600) {
        bail!("main menu not reached, stuck in {:?}", game.machine().active_id());
    }
    game.start_game();

    while game.tick_count() < MAX_TICKS {
        let input = game
            .machine()
            .playing()
            .map(autopilot)
            .unwrap_or(InputFrame::IDLE);
        game.set_input(input);

        match game.tick() {
            SceneId::GameOver => break,
            SceneId::Recovery => {
                let message = game
                    .machine()
                    .recovery()
                    .map(|r| r.message.clone())
                    .unwrap_or_default();
                bail!("entered recovery: {message}");
            }
            _ => {}
        }
    }

    match game.machine().game_over_score() {
        Some(score) => tracing::info!(
            score,
            ticks = game.tick_count(),
            sim_time = game.sim_time(),
            "run finished"
        ),
        None => tracing::info!(ticks = game.tick_count(), "tick budget exhausted"),
    }
    Ok(())
}
