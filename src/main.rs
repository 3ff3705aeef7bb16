//! Party Arcade entry point
//!
//! The browser build exports its entry points from the library; natively this
//! runs one game headless with scripted input and logs how it went.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let name = args.next().unwrap_or_else(|| "flappy".to_string());
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(7);

    let Some(game) = party_arcade::GameKind::from_str(&name) else {
        let names: Vec<_> = party_arcade::GameKind::ALL.iter().map(|g| g.as_str()).collect();
        log::error!("Unknown game `{}`; expected one of {}", name, names.join(", "));
        std::process::exit(2);
    };

    if let Err(e) = demo::run(game, seed) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry points live in platform::web
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use glam::Vec2;
    use party_arcade::input::Key;
    use party_arcade::{GameError, GameKind, HeadlessHost, LoopMode, RawEvent, Session, Settings};

    /// Upper bound on simulated callbacks
    const MAX_STEPS: u32 = 20_000;

    pub fn run(game: GameKind, seed: u64) -> Result<(), GameError> {
        let mut host = HeadlessHost::default();
        let settings = Settings::default();
        let mode = game.loop_mode(&settings);
        let mut session = Session::new(game, settings, Box::new(|_| true), seed);
        session.init(&mut host)?;
        log::info!("{} started ({:?}, seed {})", game.as_str(), mode, seed);

        let mut now = 0.0;
        for step in 0..MAX_STEPS {
            if session.phase().is_terminal() {
                break;
            }
            if let Some(event) = scripted_input(game, step) {
                host.dispatch(&mut session, &event);
                if let RawEvent::KeyDown(key) = event {
                    host.dispatch(&mut session, &RawEvent::KeyUp(key));
                }
            }
            match mode {
                LoopMode::Frame => {
                    now += 1000.0 / 60.0;
                    host.pump_frame(&mut session, now);
                }
                LoopMode::Interval(_) => {
                    host.pump_interval(&mut session);
                }
                LoopMode::OnInput => {}
            }
        }

        let state = session.state();
        log::info!(
            "{} finished: {:?} after {} ticks, score {}, best {:?}",
            game.as_str(),
            state.phase,
            state.time_ticks,
            state.score,
            session.best()
        );
        if let Some(overlay) = host.overlay() {
            log::info!("overlay: {} ({})", overlay.title, overlay.summary());
        }
        session.cleanup(&mut host);
        Ok(())
    }

    /// A crude player: enough input to exercise every game
    fn scripted_input(game: GameKind, step: u32) -> Option<RawEvent> {
        match game {
            GameKind::Runner if step % 45 == 0 => Some(RawEvent::KeyDown(Key::Space)),
            GameKind::Flappy if step % 28 == 0 => Some(RawEvent::KeyDown(Key::Space)),
            GameKind::Breakout => Some(RawEvent::PointerMove(Vec2::new(400.0, 500.0))),
            GameKind::Snake if step % 12 == 0 => {
                let keys = [Key::ArrowRight, Key::ArrowDown, Key::ArrowLeft, Key::ArrowUp];
                Some(RawEvent::KeyDown(keys[(step / 12) as usize % 4]))
            }
            GameKind::Merge => {
                let keys = [Key::ArrowLeft, Key::ArrowDown, Key::ArrowRight, Key::ArrowDown];
                Some(RawEvent::KeyDown(keys[step as usize % 4]))
            }
            GameKind::TicTacToe if step < 9 => {
                let (col, row) = (step % 3, step / 3);
                Some(RawEvent::PointerDown(Vec2::new(
                    50.0 + col as f32 * 100.0,
                    50.0 + row as f32 * 100.0,
                )))
            }
            _ => None,
        }
    }
}
