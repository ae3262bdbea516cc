//! Scene state machine.
//!
//! Exactly one [`SceneState`] is active at any time. Transitions are
//! requested, held as the single pending [`SceneRequest`], and applied at the
//! start of the next tick: the old scene is torn down, every scene timer is
//! cancelled, and the new scene's setup runs. A setup error replaces the
//! target with [`SceneState::Recovery`], which shows the error and can retry
//! the scene that failed.
//!
//! ```text
//! Boot ─► Loading ─► MainMenu ─► Playing ─► GameOver ─┐
//!                       ▲           ▲                 │
//!                       │           └──── restart ────┤
//!                       └─────────── main menu ───────┘
//! ```
//!
//! Starting a run (and restarting one) passes through a [`StartGate`]: an
//! optional ad, raced against a safety timer, whichever ends first.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use runner_assets::backend::AssetBackend;
use runner_assets::manifest::ResourceManifest;

use crate::context::GameContext;
use crate::error::EngineError;
use crate::input::InputFrame;
use crate::sdk::{AdCompletion, AdKind, AdOutcome, AdTicket};
use crate::simulation::{SimulationLoop, TickOutcome};
use crate::spawner::run_seed;
use crate::timer::{TimerId, TimerQueue};

// ---------------------------------------------------------------------------
// Identifiers and requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneId {
    Boot,
    Loading,
    MainMenu,
    Playing,
    GameOver,
    /// Stand-in shown when another scene fails to set up.
    Recovery,
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A transition waiting to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneRequest {
    pub target: SceneId,
    /// Only meaningful for GameOver; absent means 0.
    pub final_score: Option<u32>,
}

impl SceneRequest {
    pub fn to(target: SceneId) -> Self {
        Self {
            target,
            final_score: None,
        }
    }

    pub fn game_over(final_score: u32) -> Self {
        Self {
            target: SceneId::GameOver,
            final_score: Some(final_score),
        }
    }
}

/// Scene timer payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SceneEvent {
    MenuReady,
    AdSafety,
    StartDelay,
}

// ---------------------------------------------------------------------------
// Scene states
// ---------------------------------------------------------------------------

/// Progress of a start or restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartGate {
    Idle,
    /// Waiting for the ad or the safety timer.
    AwaitingAd { ticket: AdTicket, safety: TimerId },
    /// Triggered; waiting out the short start delay.
    Delaying,
    /// Playing has been requested.
    Started,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadingScene {
    pub elapsed: Duration,
    /// Simulated load time.
    pub duration: Duration,
    /// Set once the bar is full and the menu delay is armed.
    pub complete: bool,
}

impl LoadingScene {
    /// Fill of the loading bar in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuScene {
    pub gate: StartGate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameOverScene {
    pub final_score: u32,
    pub gate: StartGate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryScene {
    pub failed: SceneId,
    pub message: String,
}

/// The active scene and the data it owns.
pub enum SceneState {
    Boot,
    Loading(LoadingScene),
    MainMenu(MenuScene),
    Playing(Box<SimulationLoop>),
    GameOver(GameOverScene),
    Recovery(RecoveryScene),
}

impl SceneState {
    pub fn id(&self) -> SceneId {
        match self {
            SceneState::Boot => SceneId::Boot,
            SceneState::Loading(_) => SceneId::Loading,
            SceneState::MainMenu(_) => SceneId::MainMenu,
            SceneState::Playing(_) => SceneId::Playing,
            SceneState::GameOver(_) => SceneId::GameOver,
            SceneState::Recovery(_) => SceneId::Recovery,
        }
    }

    fn gate_mut(&mut self) -> Option<&mut StartGate> {
        match self {
            SceneState::MainMenu(menu) => Some(&mut menu.gate),
            SceneState::GameOver(over) => Some(&mut over.gate),
            _ => None,
        }
    }
}

impl fmt::Debug for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneState::Boot => f.write_str("Boot"),
            SceneState::Loading(s) => f.debug_tuple("Loading").field(s).finish(),
            SceneState::MainMenu(s) => f.debug_tuple("MainMenu").field(s).finish(),
            SceneState::Playing(sim) => f
                .debug_struct("Playing")
                .field("score", &sim.score())
                .field("paused", &sim.is_paused())
                .finish(),
            SceneState::GameOver(s) => f.debug_tuple("GameOver").field(s).finish(),
            SceneState::Recovery(s) => f.debug_tuple("Recovery").field(s).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// SceneMachine
// ---------------------------------------------------------------------------

/// Drives the scene flow.
#[derive(Debug)]
pub struct SceneMachine {
    active: SceneState,
    pending: Option<SceneRequest>,
    timers: TimerQueue<SceneEvent>,
    ad_tx: Sender<AdCompletion>,
    ad_rx: Receiver<AdCompletion>,
    next_ticket: u64,
    /// Runs built so far; picks each run's spawner seed.
    runs_started: u64,
    entered: Vec<SceneId>,
    last_error: Option<EngineError>,
}

impl Default for SceneMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneMachine {
    /// A machine sitting in Boot, whose setup runs on the first tick.
    pub fn new() -> Self {
        let (ad_tx, ad_rx) = unbounded();
        Self {
            active: SceneState::Boot,
            pending: Some(SceneRequest::to(SceneId::Boot)),
            timers: TimerQueue::new(),
            ad_tx,
            ad_rx,
            next_ticket: 0,
            runs_started: 0,
            entered: Vec::new(),
            last_error: None,
        }
    }

    /// Queue a transition. Refused, with a warning, while another one is
    /// still pending.
    pub fn request(&mut self, request: SceneRequest) -> bool {
        if let Some(pending) = self.pending {
            warn!(
                requested = %request.target,
                pending = %pending.target,
                "scene transition rejected, one already pending"
            );
            return false;
        }
        debug!(scene = %request.target, "scene transition queued");
        self.pending = Some(request);
        true
    }

    /// Run one frame.
    pub fn tick<B: AssetBackend>(
        &mut self,
        ctx: &mut GameContext<B>,
        dt: Duration,
        input: &InputFrame,
    ) {
        if let Some(request) = self.pending.take() {
            self.enter(ctx, request);
        }

        for completion in self.ad_rx.try_iter().collect::<Vec<_>>() {
            self.on_ad_completion(ctx, completion);
        }

        for fired in self.timers.drain() {
            self.on_timer(ctx, fired.id, fired.event);
        }

        self.tick_active(ctx, dt, input);
        self.timers.advance(dt);
        ctx.pump_audio();
    }

    fn enter<B: AssetBackend>(&mut self, ctx: &mut GameContext<B>, request: SceneRequest) {
        let from = self.active.id();
        if let SceneState::Playing(sim) = &mut self.active {
            sim.teardown();
        }
        self.timers.clear();

        let next = match self.setup(ctx, request) {
            Ok(state) => state,
            Err(error) => {
                warn!(scene = %request.target, error = %error, "scene setup failed, showing recovery");
                let state = SceneState::Recovery(RecoveryScene {
                    failed: request.target,
                    message: error.to_string(),
                });
                self.last_error = Some(error);
                state
            }
        };
        info!(from = %from, to = %next.id(), "scene entered");
        self.entered.push(next.id());
        self.active = next;
    }

    fn setup<B: AssetBackend>(
        &mut self,
        ctx: &mut GameContext<B>,
        request: SceneRequest,
    ) -> Result<SceneState, EngineError> {
        match request.target {
            SceneId::Boot => {
                self.boot(ctx)?;
                Ok(SceneState::Boot)
            }
            SceneId::Loading => Ok(SceneState::Loading(LoadingScene {
                elapsed: Duration::ZERO,
                duration: Duration::from_millis(ctx.config.flow.loading_ms),
                complete: false,
            })),
            SceneId::MainMenu => Ok(SceneState::MainMenu(MenuScene {
                gate: StartGate::Idle,
            })),
            SceneId::Playing => {
                // Rebuild anything evicted since boot before checking.
                ctx.synthesizer
                    .ensure(&ctx.manifest, &mut ctx.backend, &mut ctx.registry);
                ctx.registry.verify(&ctx.manifest)?;
                let seed = run_seed(ctx.config.seed, self.runs_started);
                self.runs_started += 1;
                Ok(SceneState::Playing(Box::new(SimulationLoop::with_seed(
                    &ctx.config,
                    ctx.audio.handle(),
                    seed,
                ))))
            }
            SceneId::GameOver => {
                let final_score = request.final_score.unwrap_or(0);
                if let Err(e) = ctx.sdk.submit_score(final_score) {
                    warn!(error = %e, "score submission failed");
                }
                Ok(SceneState::GameOver(GameOverScene {
                    final_score,
                    gate: StartGate::Idle,
                }))
            }
            SceneId::Recovery => Err(EngineError::SceneLoad {
                scene: SceneId::Recovery,
                reason: "recovery is only entered after a failure".into(),
            }),
        }
    }

    /// Synthesize resources, check them, then move on to Loading.
    fn boot<B: AssetBackend>(&mut self, ctx: &mut GameContext<B>) -> Result<(), EngineError> {
        let report = ctx
            .synthesizer
            .ensure(&ctx.manifest, &mut ctx.backend, &mut ctx.registry);
        info!(
            synthesized = report.synthesized.len(),
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            "boot resources ready"
        );
        ctx.registry.verify(&ctx.manifest)?;

        for key in ResourceManifest::loading_bar_keys() {
            if !ctx.backend.contains(&key) {
                return Err(EngineError::SceneLoad {
                    scene: SceneId::Boot,
                    reason: format!("loading bar resource '{key}' is not in the cache"),
                });
            }
        }

        if let Err(e) = ctx.sdk.loading_start() {
            warn!(error = %e, "SDK loading start failed");
        }
        self.request(SceneRequest::to(SceneId::Loading));
        Ok(())
    }

    fn tick_active<B: AssetBackend>(
        &mut self,
        ctx: &mut GameContext<B>,
        dt: Duration,
        input: &InputFrame,
    ) {
        match &mut self.active {
            SceneState::Loading(loading) => {
                loading.elapsed += dt;
                if loading.progress() >= 1.0 && !loading.complete {
                    loading.complete = true;
                    info!("loading complete");
                    if let Err(e) = ctx.sdk.loading_stop() {
                        warn!(error = %e, "SDK loading stop failed");
                    }
                    self.timers.add_once(
                        Duration::from_millis(ctx.config.flow.menu_delay_ms),
                        SceneEvent::MenuReady,
                    );
                }
            }
            SceneState::Playing(sim) => {
                if let TickOutcome::RunEnded { final_score } = sim.tick(dt, input) {
                    if self.pending.is_none() {
                        if let Err(e) = ctx.sdk.gameplay_stop() {
                            warn!(error = %e, "SDK gameplay stop failed");
                        }
                        self.request(SceneRequest::game_over(final_score));
                    }
                }
            }
            SceneState::Boot
            | SceneState::MainMenu(_)
            | SceneState::GameOver(_)
            | SceneState::Recovery(_) => {}
        }
    }

    fn on_timer<B: AssetBackend>(&mut self, ctx: &mut GameContext<B>, id: TimerId, event: SceneEvent) {
        match event {
            SceneEvent::MenuReady => {
                self.request(SceneRequest::to(SceneId::MainMenu));
            }
            SceneEvent::AdSafety => {
                let waiting = matches!(
                    self.active.gate_mut(),
                    Some(StartGate::AwaitingAd { safety, .. }) if *safety == id
                );
                if waiting {
                    info!("ad did not finish in time, starting anyway");
                    self.trigger_start(ctx);
                }
            }
            SceneEvent::StartDelay => {
                if let Some(gate) = self.active.gate_mut() {
                    if *gate == StartGate::Delaying {
                        *gate = StartGate::Started;
                        self.enter_gameplay(ctx);
                    }
                }
            }
        }
    }

    fn on_ad_completion<B: AssetBackend>(&mut self, ctx: &mut GameContext<B>, completion: AdCompletion) {
        let current = matches!(
            self.active.gate_mut(),
            Some(StartGate::AwaitingAd { ticket, .. }) if *ticket == completion.ticket
        );
        if !current {
            debug!(ticket = ?completion.ticket, "stale ad completion ignored");
            return;
        }
        match &completion.outcome {
            AdOutcome::Finished => info!(kind = %completion.kind, "ad finished"),
            AdOutcome::Failed(reason) => warn!(kind = %completion.kind, %reason, "ad failed"),
        }
        self.trigger_start(ctx);
    }

    // -- start gate -----------------------------------------------------------

    fn begin_start<B: AssetBackend>(&mut self, ctx: &mut GameContext<B>, kind: AdKind) -> bool {
        let Some(gate) = self.active.gate_mut() else {
            return false;
        };
        if *gate != StartGate::Idle {
            debug!(%kind, "start already in flight");
            return false;
        }
        let ticket = AdTicket(self.next_ticket);
        self.next_ticket += 1;
        let safety = self.timers.add_once(
            Duration::from_millis(ctx.config.flow.ad_safety_ms),
            SceneEvent::AdSafety,
        );
        *gate = StartGate::AwaitingAd { ticket, safety };

        let sdk = ctx.sdk.as_mut();
        let ad_requested = sdk.is_present()
            && match sdk.ad_blocked() {
                Ok(false) => match sdk.request_ad(kind, ticket, self.ad_tx.clone()) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(%kind, error = %e, "ad request failed");
                        false
                    }
                },
                Ok(true) => {
                    info!("ad blocker detected, skipping ad");
                    false
                }
                Err(e) => {
                    warn!(error = %e, "ad blocker check failed");
                    false
                }
            };

        if !ad_requested {
            self.trigger_start(ctx);
        }
        true
    }

    /// First of ad completion and safety timer wins; later ones find the
    /// gate no longer waiting.
    fn trigger_start<B: AssetBackend>(&mut self, ctx: &mut GameContext<B>) {
        let from_menu = self.active.id() == SceneId::MainMenu;
        let Some(gate) = self.active.gate_mut() else {
            return;
        };
        let StartGate::AwaitingAd { safety, .. } = *gate else {
            return;
        };
        self.timers.cancel(safety);

        if from_menu {
            *gate = StartGate::Delaying;
            self.timers.add_once(
                Duration::from_millis(ctx.config.flow.start_delay_ms),
                SceneEvent::StartDelay,
            );
        } else {
            *gate = StartGate::Started;
            self.enter_gameplay(ctx);
        }
    }

    fn enter_gameplay<B: AssetBackend>(&mut self, ctx: &mut GameContext<B>) {
        if let Err(e) = ctx.sdk.gameplay_start() {
            warn!(error = %e, "SDK gameplay start failed");
        }
        self.request(SceneRequest::to(SceneId::Playing));
    }

    // -- user actions ---------------------------------------------------------

    /// Main menu "play". Idempotent while a start is in flight.
    pub fn start_game<B: AssetBackend>(&mut self, ctx: &mut GameContext<B>) -> bool {
        if self.active.id() != SceneId::MainMenu {
            return false;
        }
        self.begin_start(ctx, AdKind::Midgame)
    }

    /// Game over "play again".
    pub fn restart<B: AssetBackend>(&mut self, ctx: &mut GameContext<B>) -> bool {
        if self.active.id() != SceneId::GameOver {
            return false;
        }
        self.begin_start(ctx, AdKind::Rewarded)
    }

    /// Game over "main menu".
    pub fn main_menu(&mut self) -> bool {
        if self.active.id() != SceneId::GameOver {
            return false;
        }
        self.request(SceneRequest::to(SceneId::MainMenu))
    }

    /// Recovery "retry": request the scene that failed.
    pub fn retry(&mut self) -> bool {
        let SceneState::Recovery(recovery) = &self.active else {
            return false;
        };
        let target = recovery.failed;
        self.request(SceneRequest::to(target))
    }

    // -- accessors ------------------------------------------------------------

    pub fn active(&self) -> &SceneState {
        &self.active
    }

    pub fn active_id(&self) -> SceneId {
        self.active.id()
    }

    pub fn pending(&self) -> Option<SceneRequest> {
        self.pending
    }

    /// Every scene entered so far, in order.
    /// How many Playing runs have been built.
    pub fn runs_started(&self) -> u64 {
        self.runs_started
    }

    pub fn entered(&self) -> &[SceneId] {
        &self.entered
    }

    pub fn last_error(&self) -> Option<&EngineError> {
        self.last_error.as_ref()
    }

    /// Sender for ad completions, for SDKs that answer from elsewhere.
    pub fn ad_sender(&self) -> Sender<AdCompletion> {
        self.ad_tx.clone()
    }

    pub fn loading_progress(&self) -> Option<f32> {
        match &self.active {
            SceneState::Loading(loading) => Some(loading.progress()),
            _ => None,
        }
    }

    pub fn start_gate(&self) -> Option<StartGate> {
        match &self.active {
            SceneState::MainMenu(menu) => Some(menu.gate),
            SceneState::GameOver(over) => Some(over.gate),
            _ => None,
        }
    }

    pub fn playing(&self) -> Option<&SimulationLoop> {
        match &self.active {
            SceneState::Playing(sim) => Some(sim),
            _ => None,
        }
    }

    pub fn playing_mut(&mut self) -> Option<&mut SimulationLoop> {
        match &mut self.active {
            SceneState::Playing(sim) => Some(sim),
            _ => None,
        }
    }

    pub fn game_over_score(&self) -> Option<u32> {
        match &self.active {
            SceneState::GameOver(over) => Some(over.final_score),
            _ => None,
        }
    }

    pub fn recovery(&self) -> Option<&RecoveryScene> {
        match &self.active {
            SceneState::Recovery(recovery) => Some(recovery),
            _ => None,
        }
    }
}
