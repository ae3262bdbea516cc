//! End-to-end scene flow over the headless backend.
//!
//! These drive the full Boot -> Loading -> MainMenu -> Playing -> GameOver
//! path through [`TickLoop`], with and without a platform SDK, and with
//! resource failures that must surface as the Recovery scene.

use std::collections::BTreeMap;

use crossbeam_channel::Receiver;
use runner_engine::prelude::*;

fn quiet_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.spawner.platform.probability = 0.0;
    config.spawner.coin.probability = 0.0;
    config.spawner.obstacle.probability = 0.0;
    config
}

fn game(config: GameConfig, backend: HeadlessBackend) -> TickLoop<HeadlessBackend> {
    let ctx = GameContext::new(config, backend).unwrap();
    TickLoop::new(ctx, TickConfig::default())
}

fn game_with_sdk(sdk: RecordingSdk) -> TickLoop<HeadlessBackend> {
    let ctx = GameContext::new(quiet_config(), HeadlessBackend::new())
        .unwrap()
        .with_sdk(sdk);
    TickLoop::new(ctx, TickConfig::default())
}

fn reach(tl: &mut TickLoop<HeadlessBackend>, scene: SceneId, max_ticks: u64) {
    assert!(
        tl.run_until(|m| m.active_id() == scene, max_ticks),
        "never reached {scene:?}, stuck in {:?}",
        tl.machine().active()
    );
}

fn to_playing(tl: &mut TickLoop<HeadlessBackend>) {
    reach(tl, SceneId::MainMenu, 600);
    assert!(tl.start_game());
    reach(tl, SceneId::Playing, 300);
}

fn spawn_at_player(tl: &mut TickLoop<HeadlessBackend>, class: SpawnClass) {
    let (machine, _) = tl.parts_mut();
    let sim = machine.playing_mut().unwrap();
    let p = sim.player_position().unwrap();
    sim.spawn(SpawnRequest {
        class,
        x: p.x,
        y: p.y,
    });
}

/// Every platform and coin seen over `ticks` ticks, as (kind, y), in spawn
/// order.
fn spawned_layout(tl: &mut TickLoop<HeadlessBackend>, ticks: u64) -> Vec<(EntityKind, i32)> {
    let mut seen = BTreeMap::new();
    for _ in 0..ticks {
        tl.tick();
        let sim = tl.machine().playing().unwrap();
        for kind in [EntityKind::Platform, EntityKind::Coin] {
            for (id, entity) in sim.entities_of(kind) {
                seen.entry(id).or_insert((kind, entity.position.y as i32));
            }
        }
    }
    seen.into_values().collect()
}

fn busy_config() -> GameConfig {
    let mut config = quiet_config();
    config.spawner.platform.probability = 1.0;
    config.spawner.coin.probability = 1.0;
    config
}

fn calls(rx: &Receiver<SdkCall>) -> Vec<SdkCall> {
    rx.try_iter().collect()
}

// -- 1. Full run --------------------------------------------------------------

#[test]
fn three_coins_then_obstacle_ends_with_thirty() {
    let mut tl = game(quiet_config(), HeadlessBackend::new());
    to_playing(&mut tl);
    tl.run_ticks(150);
    assert!(tl.machine().playing().unwrap().is_player_grounded());

    for _ in 0..3 {
        spawn_at_player(&mut tl, SpawnClass::Coin);
        tl.tick();
    }
    assert_eq!(tl.machine().playing().unwrap().score(), 30);

    spawn_at_player(&mut tl, SpawnClass::Obstacle);
    reach(&mut tl, SceneId::GameOver, 5);

    assert_eq!(tl.machine().game_over_score(), Some(30));
    assert_eq!(
        tl.machine().entered(),
        [
            SceneId::Boot,
            SceneId::Loading,
            SceneId::MainMenu,
            SceneId::Playing,
            SceneId::GameOver
        ]
    );

    let backend = &tl.context().backend;
    assert_eq!(backend.play_count(keys::COLLECT), 3);
    assert_eq!(backend.play_count(keys::HIT), 1);
    assert_eq!(backend.playback_state(keys::MUSIC), None, "music stopped");
}

#[test]
fn sound_failures_never_reach_the_run() {
    let backend = HeadlessBackend::with_faults(BackendFaults {
        failing_sounds: [keys::COLLECT, keys::HIT, keys::MUSIC]
            .into_iter()
            .map(String::from)
            .collect(),
        ..BackendFaults::default()
    });
    let mut tl = game(quiet_config(), backend);
    to_playing(&mut tl);
    tl.run_ticks(150);

    spawn_at_player(&mut tl, SpawnClass::Coin);
    tl.tick();
    spawn_at_player(&mut tl, SpawnClass::Obstacle);
    reach(&mut tl, SceneId::GameOver, 5);

    assert_eq!(tl.machine().game_over_score(), Some(10));
    assert!(!tl.context().audio.take_failures().is_empty());
}

#[test]
fn sdk_lifecycle_calls_follow_the_flow() {
    let (sdk, rx) = RecordingSdk::new(AdScript::Complete);
    let mut tl = game_with_sdk(sdk);
    to_playing(&mut tl);
    tl.run_ticks(150);
    spawn_at_player(&mut tl, SpawnClass::Obstacle);
    reach(&mut tl, SceneId::GameOver, 5);

    assert_eq!(
        calls(&rx),
        [
            SdkCall::LoadingStart,
            SdkCall::LoadingStop,
            SdkCall::AdBlocked,
            SdkCall::RequestAd {
                kind: AdKind::Midgame,
                ticket: AdTicket(0)
            },
            SdkCall::GameplayStart,
            SdkCall::GameplayStop,
            SdkCall::SubmitScore(0),
        ]
    );
}

// -- 2. Start gate --------------------------------------------------------------

#[test]
fn safety_timer_starts_game_when_ad_never_finishes() {
    let (sdk, rx) = RecordingSdk::new(AdScript::Never);
    let mut tl = game_with_sdk(sdk);
    reach(&mut tl, SceneId::MainMenu, 600);
    calls(&rx);

    assert!(tl.start_game());
    assert!(!tl.start_game(), "second start while in flight is ignored");
    tl.run_ticks(100);
    assert_eq!(tl.machine().active_id(), SceneId::MainMenu);

    reach(&mut tl, SceneId::Playing, 40);
    let requested = calls(&rx)
        .into_iter()
        .filter(|c| matches!(c, SdkCall::RequestAd { .. }))
        .count();
    assert_eq!(requested, 1);
}

#[test]
fn finished_ad_starts_game_without_waiting_for_safety() {
    let (sdk, _rx) = RecordingSdk::new(AdScript::Complete);
    let mut tl = game_with_sdk(sdk);
    reach(&mut tl, SceneId::MainMenu, 600);

    assert!(tl.start_game());
    tl.tick();
    assert_eq!(tl.machine().start_gate(), Some(StartGate::Delaying));
    reach(&mut tl, SceneId::Playing, 10);
}

#[test]
fn failed_ad_and_refused_request_both_start() {
    for script in [AdScript::Fail("no fill".into()), AdScript::Error] {
        let (sdk, _rx) = RecordingSdk::new(script);
        let mut tl = game_with_sdk(sdk);
        to_playing(&mut tl);
    }
}

#[test]
fn adblock_skips_the_ad() {
    let (sdk, rx) = RecordingSdk::new(AdScript::Never);
    let mut tl = game_with_sdk(sdk.with_adblock(true));
    reach(&mut tl, SceneId::MainMenu, 600);
    assert!(tl.start_game());
    reach(&mut tl, SceneId::Playing, 10);
    assert!(!calls(&rx)
        .iter()
        .any(|c| matches!(c, SdkCall::RequestAd { .. })));
}

#[test]
fn failing_sdk_never_blocks_the_flow() {
    let (sdk, _rx) = RecordingSdk::new(AdScript::Complete);
    let mut tl = game_with_sdk(sdk.with_failing_calls(true));
    to_playing(&mut tl);
}

#[test]
fn stale_ad_completion_is_ignored() {
    let (sdk, _rx) = RecordingSdk::new(AdScript::Never);
    let mut tl = game_with_sdk(sdk);
    reach(&mut tl, SceneId::MainMenu, 600);
    assert!(tl.start_game());

    let gate = tl.machine().start_gate();
    tl.machine()
        .ad_sender()
        .send(AdCompletion {
            ticket: AdTicket(999),
            kind: AdKind::Midgame,
            outcome: AdOutcome::Finished,
        })
        .unwrap();
    tl.tick();
    assert_eq!(tl.machine().start_gate(), gate);
    assert!(matches!(gate, Some(StartGate::AwaitingAd { .. })));
}

// -- 3. Game over ---------------------------------------------------------------

#[test]
fn restart_runs_a_fresh_game() {
    let (sdk, rx) = RecordingSdk::new(AdScript::Complete);
    let mut tl = game_with_sdk(sdk);
    to_playing(&mut tl);
    tl.run_ticks(150);
    spawn_at_player(&mut tl, SpawnClass::Coin);
    tl.tick();
    spawn_at_player(&mut tl, SpawnClass::Obstacle);
    reach(&mut tl, SceneId::GameOver, 5);
    calls(&rx);

    assert!(tl.restart());
    reach(&mut tl, SceneId::Playing, 5);
    let sim = tl.machine().playing().unwrap();
    assert_eq!(sim.score(), 0);
    assert_eq!(sim.game_speed(), 300.0);
    assert_eq!(sim.timers().len(), 3);
    assert!(calls(&rx).contains(&SdkCall::RequestAd {
        kind: AdKind::Rewarded,
        ticket: AdTicket(1)
    }));
}

#[test]
fn restart_spawns_a_new_layout() {
    let mut tl = game(busy_config(), HeadlessBackend::new());
    to_playing(&mut tl);
    let first = spawned_layout(&mut tl, 400);

    spawn_at_player(&mut tl, SpawnClass::Obstacle);
    reach(&mut tl, SceneId::GameOver, 5);
    assert!(tl.restart());
    reach(&mut tl, SceneId::Playing, 5);
    let second = spawned_layout(&mut tl, 400);

    assert_eq!(tl.machine().runs_started(), 2);
    assert!(first.len() >= 4 && second.len() >= 4);
    assert_ne!(first, second);
}

#[test]
fn first_run_is_reproducible_from_the_seed() {
    let layout = || {
        let mut tl = game(busy_config(), HeadlessBackend::new());
        to_playing(&mut tl);
        spawned_layout(&mut tl, 400)
    };
    let first = layout();
    assert!(!first.is_empty());
    assert_eq!(first, layout());
}

#[test]
fn game_over_without_score_defaults_to_zero() {
    let mut tl = game(quiet_config(), HeadlessBackend::new());
    reach(&mut tl, SceneId::MainMenu, 600);
    let (machine, _) = tl.parts_mut();
    assert!(machine.request(SceneRequest::to(SceneId::GameOver)));
    tl.tick();
    assert_eq!(tl.machine().game_over_score(), Some(0));

    let (machine, _) = tl.parts_mut();
    assert!(machine.main_menu());
    tl.tick();
    assert_eq!(tl.machine().active_id(), SceneId::MainMenu);
}

#[test]
fn only_one_transition_may_be_pending() {
    let mut tl = game(quiet_config(), HeadlessBackend::new());
    reach(&mut tl, SceneId::MainMenu, 600);

    let (machine, _) = tl.parts_mut();
    assert!(machine.request(SceneRequest::game_over(70)));
    assert!(!machine.request(SceneRequest::to(SceneId::Playing)));
    assert_eq!(machine.pending(), Some(SceneRequest::game_over(70)));

    tl.tick();
    assert_eq!(tl.machine().game_over_score(), Some(70));
    assert_eq!(tl.machine().pending(), None);
}

// -- 4. Recovery ----------------------------------------------------------------

#[test]
fn unrecoverable_boot_shows_recovery_then_retries() {
    let backend = HeadlessBackend::with_faults(BackendFaults {
        failed_uploads_per_key: u32::MAX,
        reject_stubs: true,
        ..BackendFaults::default()
    });
    let mut tl = game(quiet_config(), backend);
    reach(&mut tl, SceneId::Recovery, 5);

    let recovery = tl.machine().recovery().unwrap();
    assert_eq!(recovery.failed, SceneId::Boot);
    assert!(!recovery.message.is_empty());
    assert!(matches!(
        tl.machine().last_error(),
        Some(EngineError::ResourceMissing(_))
    ));

    tl.run_ticks(30);
    assert_eq!(tl.machine().active_id(), SceneId::Recovery, "no silent exit");

    tl.context_mut().backend.set_faults(BackendFaults::default());
    let (machine, _) = tl.parts_mut();
    assert!(machine.retry());
    reach(&mut tl, SceneId::MainMenu, 600);
}

#[test]
fn playing_setup_rebuilds_evicted_resources() {
    let mut tl = game(quiet_config(), HeadlessBackend::new());
    reach(&mut tl, SceneId::MainMenu, 600);
    assert!(tl.context_mut().backend.evict(keys::PLAYER));
    assert!(tl.start_game());
    reach(&mut tl, SceneId::Playing, 30);
    assert!(tl.context().backend.contains(&ResourceKey::from(keys::PLAYER)));
}

#[test]
fn playing_setup_failure_recovers_and_retries() {
    let mut tl = game(quiet_config(), HeadlessBackend::new());
    reach(&mut tl, SceneId::MainMenu, 600);

    let backend = &mut tl.context_mut().backend;
    backend.evict(keys::MUSIC);
    backend.set_faults(BackendFaults {
        audio_available: false,
        reject_stubs: true,
        ..BackendFaults::default()
    });
    assert!(tl.start_game());
    reach(&mut tl, SceneId::Recovery, 30);
    assert_eq!(tl.machine().recovery().unwrap().failed, SceneId::Playing);

    tl.context_mut().backend.set_faults(BackendFaults::default());
    let (machine, _) = tl.parts_mut();
    assert!(machine.retry());
    reach(&mut tl, SceneId::Playing, 5);
}
