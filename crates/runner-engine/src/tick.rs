//! Fixed-timestep frame driver.
//!
//! The [`TickLoop`] owns the [`GameContext`] and the [`SceneMachine`] and
//! advances both by `fixed_dt` per tick. Each tick feeds the current
//! [`InputFrame`] to the machine; the pause toggle is edge-triggered and is
//! cleared after the tick that consumed it.
//!
//! # Example
//!
//! ```
//! use runner_engine::prelude::*;
//!
//! let ctx = GameContext::new(GameConfig::default(), HeadlessBackend::new()).unwrap();
//! let mut tick_loop = TickLoop::new(ctx, TickConfig::default());
//!
//! assert!(tick_loop.run_until(|m| m.active_id() == SceneId::MainMenu, 600));
//! assert_eq!(tick_loop.machine().entered()[..2], [SceneId::Boot, SceneId::Loading]);
//! ```

use std::time::{Duration, Instant};

use runner_assets::backend::AssetBackend;

use crate::context::GameContext;
use crate::input::InputFrame;
use crate::scene::{SceneId, SceneMachine};

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-timestep tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
}

impl Default for TickConfig {
    /// Defaults to 60 Hz.
    fn default() -> Self {
        Self { fixed_dt: 1.0 / 60.0 }
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time of the whole tick.
    pub total_time: Duration,
    /// Scene active when the tick ended.
    pub scene: Option<SceneId>,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

pub struct TickLoop<B: AssetBackend> {
    ctx: GameContext<B>,
    machine: SceneMachine,
    tick_counter: u64,
    fixed_dt: f64,
    last_diagnostics: TickDiagnostics,
    current_input: InputFrame,
}

impl<B: AssetBackend> TickLoop<B> {
    /// Create a tick loop with a fresh scene machine in Boot.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(ctx: GameContext<B>, config: TickConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        Self {
            ctx,
            machine: SceneMachine::new(),
            tick_counter: 0,
            fixed_dt: config.fixed_dt,
            last_diagnostics: TickDiagnostics::default(),
            current_input: InputFrame::default(),
        }
    }

    /// Execute one tick and return the scene active afterwards.
    pub fn tick(&mut self) -> SceneId {
        let tick_start = Instant::now();
        let dt = Duration::from_secs_f64(self.fixed_dt);

        self.machine.tick(&mut self.ctx, dt, &self.current_input);
        self.current_input.toggle_pause = false;
        self.tick_counter += 1;

        let scene = self.machine.active_id();
        self.last_diagnostics = TickDiagnostics {
            total_time: tick_start.elapsed(),
            scene: Some(scene),
        };
        scene
    }

    pub fn run_ticks(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    /// Tick until `done` holds or `max_ticks` have run. Returns whether
    /// `done` was reached.
    pub fn run_until(&mut self, mut done: impl FnMut(&SceneMachine) -> bool, max_ticks: u64) -> bool {
        for _ in 0..max_ticks {
            if done(&self.machine) {
                return true;
            }
            self.tick();
        }
        done(&self.machine)
    }

    // -- user actions -------------------------------------------------------

    pub fn start_game(&mut self) -> bool {
        self.machine.start_game(&mut self.ctx)
    }

    pub fn restart(&mut self) -> bool {
        self.machine.restart(&mut self.ctx)
    }

    // -- accessors ----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Computed as `tick_count * fixed_dt` to avoid drift from repeated
    /// addition.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    pub fn context(&self) -> &GameContext<B> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut GameContext<B> {
        &mut self.ctx
    }

    pub fn machine(&self) -> &SceneMachine {
        &self.machine
    }

    /// The machine and the context together, for calling machine actions
    /// directly.
    pub fn parts_mut(&mut self) -> (&mut SceneMachine, &mut GameContext<B>) {
        (&mut self.machine, &mut self.ctx)
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    /// Input used from the next tick on.
    pub fn set_input(&mut self, input: InputFrame) {
        self.current_input = input;
    }

    pub fn current_input(&self) -> &InputFrame {
        &self.current_input
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use runner_assets::backend::HeadlessBackend;

    fn tick_loop() -> TickLoop<HeadlessBackend> {
        let ctx = GameContext::new(GameConfig::default(), HeadlessBackend::new()).unwrap();
        TickLoop::new(ctx, TickConfig::default())
    }

    // -- 1. Counters ----------------------------------------------------------

    #[test]
    fn sim_time_computed_not_accumulated() {
        let mut tl = tick_loop();
        tl.run_ticks(60);
        assert_eq!(tl.tick_count(), 60);
        assert!((tl.sim_time() - 1.0).abs() < 1e-12);
    }

    // -- 2. Config validation ---------------------------------------------------

    #[test]
    #[should_panic(expected = "fixed_dt must be positive and finite")]
    fn zero_dt_panics() {
        let ctx = GameContext::new(GameConfig::default(), HeadlessBackend::new()).unwrap();
        TickLoop::new(ctx, TickConfig { fixed_dt: 0.0 });
    }

    #[test]
    fn default_runs_at_sixty_hertz() {
        assert!((tick_loop().fixed_dt() - 1.0 / 60.0).abs() < 1e-12);
    }

    // -- 3. Pause toggle is edge-triggered --------------------------------------

    #[test]
    fn toggle_pause_is_cleared_after_one_tick() {
        let mut tl = tick_loop();
        tl.set_input(InputFrame::toggle_pause());
        tl.tick();
        assert!(!tl.current_input().toggle_pause);
    }

    // -- 4. Diagnostics ---------------------------------------------------------

    #[test]
    fn diagnostics_record_scene() {
        let mut tl = tick_loop();
        assert_eq!(tl.tick(), SceneId::Boot);
        assert_eq!(tl.last_diagnostics().scene, Some(SceneId::Boot));
        assert_eq!(tl.tick(), SceneId::Loading);
    }
}
