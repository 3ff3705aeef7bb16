//! End-to-end sessions driven through the headless host

use glam::{IVec2, Vec2};
use party_arcade::input::{EventKind, Key, ListenTarget};
use party_arcade::overlay::OverlayKind;
use party_arcade::sim::World;
use party_arcade::sim::merge::MergeState;
use party_arcade::{
    ActiveModal, GameKind, GamePhase, HeadlessHost, KeyValueStore, MemoryStore, RawEvent, Session,
    Settings, TicTacToeTally,
};

const FRAME_MS: f64 = 1000.0 / 60.0;

fn session(game: GameKind, seed: u64) -> Session {
    Session::new(game, Settings::default(), Box::new(|_| true), seed)
}

/// Pump frames until the run ends; returns the number of frames fired
fn run_frames(host: &mut HeadlessHost, session: &mut Session, limit: usize) -> usize {
    let mut now = 0.0;
    for n in 0..limit {
        if !host.pump_frame(session, now) {
            return n;
        }
        now += FRAME_MS;
    }
    limit
}

fn tap(host: &mut HeadlessHost, session: &mut Session, cell: usize) -> bool {
    let (row, col) = (cell / 3, cell % 3);
    let point = Vec2::new(50.0 + col as f32 * 100.0, 50.0 + row as f32 * 100.0);
    host.dispatch(session, &RawEvent::PointerDown(point))
}

#[test]
fn test_flappy_fall_ends_once() {
    let mut host = HeadlessHost::default();
    let mut session = session(GameKind::Flappy, 1);
    session.init(&mut host).unwrap();

    assert!(host.pump_frame(&mut session, 0.0));
    match &session.state().world {
        World::Flappy(f) => {
            assert!((f.bird.vel.y - 0.42).abs() < 1e-5);
            assert!((f.bird.pos.y - 300.42).abs() < 1e-3);
        }
        _ => unreachable!(),
    }

    run_frames(&mut host, &mut session, 2_000);
    assert_eq!(session.phase(), GamePhase::Lost);
    assert_eq!(host.overlays_shown(), 1);
    assert_eq!(host.overlay().unwrap().kind, OverlayKind::Lost);
    assert!(host.pending_frame().is_none());
    assert!(!session.loop_scheduled());

    // Nothing left to fire
    assert!(!host.pump_frame(&mut session, 1e9));
    assert_eq!(host.overlays_shown(), 1);
}

#[test]
fn test_runner_spawns_once_for_two_half_intervals() {
    let mut host = HeadlessHost::default();
    let mut session = session(GameKind::Runner, 3);
    session.init(&mut host).unwrap();

    for now in [0.0, 500.0, 1000.0] {
        assert!(host.pump_frame(&mut session, now));
    }
    match &session.state().world {
        World::Runner(r) => assert_eq!(r.obstacles.len(), 1),
        _ => unreachable!(),
    }
    assert_eq!(session.phase(), GamePhase::Running);
}

#[test]
fn test_runner_resize_relayouts() {
    let mut host = HeadlessHost::default();
    let mut session = session(GameKind::Runner, 3);
    session.init(&mut host).unwrap();
    assert!(host.is_listening(ListenTarget::Window, EventKind::Resize));

    let renders = host.renders();
    assert!(host.dispatch(&mut session, &RawEvent::Resize { container_width: 2000.0 }));
    assert_eq!(host.renders(), renders + 1);
    match &session.state().world {
        World::Runner(r) => {
            assert_eq!(r.width, 820.0);
            assert_eq!(r.player.body.pos.y + r.player.body.height(), r.ground_y);
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_render_failure_crashes_and_restart_recovers() {
    let mut host = HeadlessHost::default();
    let mut session = session(GameKind::Runner, 5);
    session.init(&mut host).unwrap();
    assert_eq!(host.active_listeners(), 4);

    host.fail_render(Some("context lost"));
    assert!(host.pump_frame(&mut session, 0.0));

    assert_eq!(session.phase(), GamePhase::Crashed);
    assert_eq!(host.active_listeners(), 0);
    assert!(host.pending_frame().is_none());
    let overlay = host.overlay().unwrap();
    assert_eq!(overlay.kind, OverlayKind::Crashed);
    assert_eq!(overlay.title, "Oops! Crash");
    assert_eq!(overlay.action, "Restart");
    assert!(overlay.detail.as_deref().unwrap().contains("context lost"));

    host.fail_render(None);
    session.restart(&mut host).unwrap();
    assert_eq!(session.phase(), GamePhase::Running);
    assert_eq!(host.visible_overlays(), 0);
    assert_eq!(host.active_listeners(), 4);
    assert!(host.pending_frame().is_some());
}

#[test]
fn test_cleanup_twice_leaves_nothing_behind() {
    for game in GameKind::ALL {
        let mut host = HeadlessHost::default();
        let mut session = session(game, 9);
        session.init(&mut host).unwrap();

        session.cleanup(&mut host);
        session.cleanup(&mut host);

        assert_eq!(host.active_listeners(), 0, "{}", game.as_str());
        assert!(host.pending_frame().is_none());
        assert!(host.interval().is_none());
        assert_eq!(session.phase(), GamePhase::Idle);
        assert!(!host.pump_frame(&mut session, 0.0));
        assert!(!host.pump_interval(&mut session));
    }
}

#[test]
fn test_reopen_does_not_leak_listeners() {
    let mut host = HeadlessHost::default();
    let mut session = session(GameKind::Breakout, 2);
    for _ in 0..5 {
        session.init(&mut host).unwrap();
    }
    assert_eq!(host.active_listeners(), 5);
    assert!(host.pending_frame().is_some());
}

#[test]
fn test_cleanup_controls_keeps_loop() {
    let mut host = HeadlessHost::default();
    let mut session = session(GameKind::Snake, 2);
    session.init(&mut host).unwrap();

    session.cleanup_controls(&mut host);
    assert_eq!(host.active_listeners(), 0);
    assert!(host.interval().is_some());
    assert!(!host.dispatch(&mut session, &RawEvent::KeyDown(Key::ArrowUp)));
}

#[test]
fn test_background_modal_ignores_input() {
    let modal = ActiveModal::default();
    let mut host = HeadlessHost::default();
    let mut session = Session::new(
        GameKind::Snake,
        Settings::default(),
        Box::new(modal.clone()),
        4,
    );
    session.init(&mut host).unwrap();

    modal.open(GameKind::Merge);
    assert!(!host.dispatch(&mut session, &RawEvent::KeyDown(Key::ArrowRight)));
    host.pump_interval(&mut session);
    match &session.state().world {
        World::Snake(s) => assert_eq!(s.head(), IVec2::new(200, 200)),
        _ => unreachable!(),
    }

    modal.open(GameKind::Snake);
    assert!(host.dispatch(&mut session, &RawEvent::KeyDown(Key::ArrowRight)));
    host.pump_interval(&mut session);
    match &session.state().world {
        World::Snake(s) => assert_eq!(s.head(), IVec2::new(220, 200)),
        _ => unreachable!(),
    }
}

#[test]
fn test_background_modal_ignores_pointer_and_touch() {
    let modal = ActiveModal::default();
    let mut host = HeadlessHost::default();
    let mut session = Session::new(
        GameKind::Breakout,
        Settings::default(),
        Box::new(modal.clone()),
        4,
    );
    session.init(&mut host).unwrap();
    let paddle_x = |session: &Session| match &session.state().world {
        World::Breakout(b) => b.paddle_x,
        _ => unreachable!(),
    };
    let start = paddle_x(&session);

    let far_left = Vec2::new(60.0, 500.0);
    assert!(!host.dispatch(&mut session, &RawEvent::PointerMove(far_left)));
    assert!(!host.dispatch(&mut session, &RawEvent::TouchStart(vec![far_left])));
    assert!(!host.dispatch(&mut session, &RawEvent::TouchMove(vec![far_left])));
    host.pump_frame(&mut session, 0.0);
    assert_eq!(paddle_x(&session), start);

    modal.open(GameKind::Breakout);
    assert!(host.dispatch(&mut session, &RawEvent::PointerMove(far_left)));
    host.pump_frame(&mut session, FRAME_MS);
    assert_eq!(paddle_x(&session), 0.0);
}

#[test]
fn test_snake_wraps_on_interval() {
    let mut host = HeadlessHost::default();
    let mut session = session(GameKind::Snake, 11);
    session.init(&mut host).unwrap();
    assert_eq!(host.interval().map(|(_, ms)| ms), Some(150));

    host.dispatch(&mut session, &RawEvent::KeyDown(Key::ArrowRight));
    for _ in 0..10 {
        assert!(host.pump_interval(&mut session));
    }
    match &session.state().world {
        World::Snake(s) => assert_eq!(s.head(), IVec2::new(0, 200)),
        _ => unreachable!(),
    }
    assert_eq!(session.phase(), GamePhase::Running);
}

#[test]
fn test_best_score_written_only_when_higher() {
    let mut store = MemoryStore::default();
    store.set("flappy-best", "100");
    let mut host = HeadlessHost::with_store(store);
    let mut session = session(GameKind::Flappy, 6);
    session.init(&mut host).unwrap();
    assert_eq!(session.best(), Some(100));

    run_frames(&mut host, &mut session, 2_000);
    assert_eq!(session.phase(), GamePhase::Lost);
    assert_eq!(host.memory_store().get("flappy-best").as_deref(), Some("100"));
    let overlay = host.overlay().unwrap();
    assert_eq!(overlay.best, Some(100));
    assert!(!overlay.new_best);
}

#[test]
fn test_merge_game_over_records_best() {
    let mut host = HeadlessHost::default();
    let mut session = session(GameKind::Merge, 2);
    session.init(&mut host).unwrap();
    assert!(host.pending_frame().is_none());
    assert!(host.interval().is_none());

    if let World::Merge(m) = &mut session.state_mut().world {
        *m = MergeState::from_rows(&[
            &[2, 2, 8, 16],
            &[32, 64, 128, 256],
            &[512, 1024, 2048, 4096],
            &[8192, 16384, 32768, 65536],
        ]);
    }
    assert!(host.dispatch(&mut session, &RawEvent::KeyDown(Key::ArrowLeft)));

    assert_eq!(session.phase(), GamePhase::Lost);
    assert_eq!(session.best(), Some(4));
    assert_eq!(host.memory_store().get("2048-best").as_deref(), Some("4"));
    let overlay = host.overlay().unwrap();
    assert!(overlay.new_best);
    assert_eq!(overlay.detail.as_deref(), Some("Best tile: 65536"));
}

#[test]
fn test_tictactoe_loss_updates_tally() {
    let mut host = HeadlessHost::default();
    let mut session = session(GameKind::TicTacToe, 1);
    session.init(&mut host).unwrap();
    assert!(host.is_listening(ListenTarget::Canvas, EventKind::PointerDown));

    // O takes the centre, blocks at 2, then wins on the 2-4-6 diagonal
    assert!(tap(&mut host, &mut session, 0));
    assert!(tap(&mut host, &mut session, 1));
    assert!(tap(&mut host, &mut session, 3));

    assert_eq!(session.phase(), GamePhase::Lost);
    let overlay = host.overlay().unwrap();
    assert_eq!(overlay.title, "AI Wins!");
    assert_eq!(overlay.detail.as_deref(), Some("You: 0 | AI: 1 | Ties: 0"));

    let saved = TicTacToeTally::load(host.memory_store());
    assert_eq!(saved.ai, 1);

    // A new run reads the persisted tally
    session.restart(&mut host).unwrap();
    assert_eq!(session.tally().ai, 1);
    assert_eq!(host.visible_overlays(), 0);
}

#[test]
fn test_same_seed_same_run() {
    let play = |seed| {
        let mut host = HeadlessHost::default();
        let mut session = session(GameKind::Snake, seed);
        session.init(&mut host).unwrap();
        host.dispatch(&mut session, &RawEvent::KeyDown(Key::ArrowDown));
        for _ in 0..40 {
            host.pump_interval(&mut session);
        }
        session.state().clone()
    };
    assert_eq!(play(21), play(21));
}
