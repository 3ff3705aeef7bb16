//! Browser host
//!
//! Canvas 2D drawing, DOM listeners, `requestAnimationFrame`, `setInterval`,
//! LocalStorage and the DOM overlay. One `WebApp` per game, created on the
//! first `init_game` call and reused for every reopen of its modal.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, EventTarget, HtmlCanvasElement, KeyboardEvent,
    MouseEvent, Storage, TouchEvent, TouchList, Window,
};

use super::{FrameHandle, Host, ListenerHandle, TimerHandle};
use crate::error::{GameError, HostError};
use crate::highscores::{KeyValueStore, MemoryStore};
use crate::input::{EventKind, Key, ListenTarget, ModalGuard, RawEvent};
use crate::overlay::Overlay;
use crate::session::Session;
use crate::settings::Settings;
use crate::sim::state::{GameKind, GamePhase, GameState, World};
use crate::sim::tictactoe::Mark;

type EventClosure = Closure<dyn FnMut(web_sys::Event)>;
type TimerClosure = Closure<dyn FnMut()>;
type FrameClosure = Closure<dyn FnMut(f64)>;

/// DOM ids used by each game's markup
///
/// Every game, 2048 and tic-tac-toe included, draws to a canvas.
#[derive(Debug, Clone, Copy)]
struct DomIds {
    canvas: &'static str,
    modal: &'static str,
    /// Selector of the element the overlay is appended to
    container: &'static str,
}

impl DomIds {
    fn for_game(game: GameKind) -> Self {
        match game {
            GameKind::Runner => Self {
                canvas: "runnerCanvas",
                modal: "runnerModal",
                container: ".runner-container",
            },
            GameKind::Flappy => Self {
                canvas: "flappyCanvas",
                modal: "flappyModal",
                container: ".flappy-container",
            },
            GameKind::Breakout => Self {
                canvas: "breakoutCanvas",
                modal: "breakoutModal",
                container: ".breakout-container",
            },
            GameKind::Snake => Self {
                canvas: "snakeCanvas",
                modal: "snakeModal",
                container: ".snake-container",
            },
            GameKind::Merge => Self {
                canvas: "game2048Canvas",
                modal: "game2048Modal",
                container: ".game2048-container",
            },
            GameKind::TicTacToe => Self {
                canvas: "ticTacToeCanvas",
                modal: "ticTacToeModal",
                container: ".ttt-container",
            },
        }
    }
}

/// Modal is visible when it carries the `active` class
struct DomModalGuard {
    document: Document,
    modal_id: &'static str,
}

impl ModalGuard for DomModalGuard {
    fn is_active(&self, _game: GameKind) -> bool {
        self.document
            .get_element_by_id(self.modal_id)
            .is_some_and(|modal| modal.class_list().contains("active"))
    }
}

/// LocalStorage, or memory when the browser refuses it
pub struct WebStore {
    storage: Option<Storage>,
    fallback: MemoryStore,
}

impl WebStore {
    fn new(window: &Window) -> Self {
        let storage = window.local_storage().ok().flatten();
        if storage.is_none() {
            log::warn!("LocalStorage unavailable; scores will not persist");
        }
        Self {
            storage,
            fallback: MemoryStore::default(),
        }
    }
}

impl KeyValueStore for WebStore {
    fn get(&self, key: &str) -> Option<String> {
        match &self.storage {
            Some(storage) => storage.get_item(key).ok().flatten(),
            None => self.fallback.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        match &self.storage {
            Some(storage) => {
                if storage.set_item(key, value).is_err() {
                    log::warn!("Failed to write {} to LocalStorage", key);
                }
            }
            None => self.fallback.set(key, value),
        }
    }
}

pub struct WebHost {
    game: GameKind,
    ids: DomIds,
    settings: Settings,
    app: Weak<RefCell<WebApp>>,
    window: Window,
    document: Document,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    next_id: u32,
    /// Our handle -> requestAnimationFrame id and its callback
    frames: HashMap<u32, (i32, FrameClosure)>,
    intervals: HashMap<u32, (i32, TimerClosure)>,
    listeners: HashMap<u32, (EventTarget, &'static str, EventClosure)>,
    overlay: Option<(Element, EventClosure)>,
    // Closures detached while one of them may still be on the stack;
    // dropped at the start of the next callback
    retired_events: Vec<EventClosure>,
    retired_timers: Vec<TimerClosure>,
    retired_frames: Vec<FrameClosure>,
    store: WebStore,
}

impl WebHost {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn drop_retired(&mut self) {
        self.retired_events.clear();
        self.retired_timers.clear();
        self.retired_frames.clear();
    }

    fn event_target(&self, target: ListenTarget) -> EventTarget {
        match target {
            ListenTarget::Window => self.window.clone().into(),
            ListenTarget::Document => self.document.clone().into(),
            ListenTarget::Canvas => self.canvas.clone().into(),
        }
    }

    fn element(&self, tag: &str, class: &str) -> Result<Element, HostError> {
        let el = self
            .document
            .create_element(tag)
            .map_err(|_| HostError::MissingElement(tag.to_string()))?;
        el.set_class_name(class);
        Ok(el)
    }

    fn build_overlay(&mut self, overlay: &Overlay) -> Result<(), HostError> {
        self.clear_overlay(self.game);

        let container = self
            .document
            .query_selector(self.ids.container)
            .ok()
            .flatten()
            .or_else(|| self.canvas.parent_element())
            .ok_or_else(|| HostError::MissingElement(self.ids.container.to_string()))?;

        let root = self.element("div", "game-over-overlay")?;
        let content = self.element("div", "game-over-content")?;

        let title = self.element("h2", "game-over-title")?;
        title.set_text_content(Some(&overlay.title));
        let summary = self.element("p", "game-over-score")?;
        summary.set_text_content(Some(&overlay.summary()));
        let button = self.element("button", "play-again-btn")?;
        button.set_text_content(Some(overlay.action));

        let attach = |parent: &Element, child: &Element| {
            parent
                .append_child(child)
                .map(|_| ())
                .map_err(|_| HostError::MissingElement("overlay".to_string()))
        };
        attach(&content, &title)?;
        attach(&content, &summary)?;
        if let Some(detail) = &overlay.detail {
            let p = self.element("p", "game-over-detail")?;
            p.set_text_content(Some(detail));
            attach(&content, &p)?;
        }
        if overlay.new_best {
            let p = self.element("p", "game-over-best")?;
            p.set_text_content(Some("New best!"));
            attach(&content, &p)?;
        }
        attach(&content, &button)?;
        attach(&root, &content)?;

        let app = self.app.clone();
        let on_click = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if let Some(app) = app.upgrade()
                && let Ok(mut app) = app.try_borrow_mut()
            {
                app.restart();
            }
        });
        button
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
            .map_err(|_| HostError::MissingElement("overlay button".to_string()))?;
        attach(&container, &root)?;

        self.overlay = Some((root, on_click));
        Ok(())
    }

    fn fit_canvas(&self, width: f32, height: f32) {
        let (w, h) = (width.round() as u32, height.round() as u32);
        if self.canvas.width() != w {
            self.canvas.set_width(w);
        }
        if self.canvas.height() != h {
            self.canvas.set_height(h);
        }
    }
}

impl Host for WebHost {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id());
        let app = self.app.clone();
        let callback: FrameClosure = Closure::once(move |now: f64| {
            if let Some(app) = app.upgrade()
                && let Ok(mut app) = app.try_borrow_mut()
            {
                app.on_frame(handle, now);
            }
        });
        match self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            Ok(id) => {
                self.frames.insert(handle.0, (id, callback));
            }
            Err(e) => log::error!("requestAnimationFrame failed: {:?}", e),
        }
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Some((id, callback)) = self.frames.remove(&handle.0) {
            if let Err(e) = self.window.cancel_animation_frame(id) {
                log::warn!("cancelAnimationFrame failed: {:?}", e);
            }
            self.retired_frames.push(callback);
        }
    }

    fn start_interval(&mut self, ms: u32) -> TimerHandle {
        let handle = TimerHandle(self.next_id());
        let app = self.app.clone();
        let callback = Closure::<dyn FnMut()>::new(move || {
            if let Some(app) = app.upgrade()
                && let Ok(mut app) = app.try_borrow_mut()
            {
                app.on_interval(handle);
            }
        });
        match self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                ms as i32,
            ) {
            Ok(id) => {
                self.intervals.insert(handle.0, (id, callback));
            }
            Err(e) => log::error!("setInterval failed: {:?}", e),
        }
        handle
    }

    fn cancel_interval(&mut self, handle: TimerHandle) {
        if let Some((id, callback)) = self.intervals.remove(&handle.0) {
            self.window.clear_interval_with_handle(id);
            self.retired_timers.push(callback);
        }
    }

    fn listen(&mut self, target: ListenTarget, kind: EventKind) -> Result<ListenerHandle, HostError> {
        let handle = ListenerHandle(self.next_id());
        let element = self.event_target(target);
        let canvas = self.canvas.clone();
        let app = self.app.clone();

        let callback = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
            let Some(raw) = raw_event(kind, &event, &canvas) else {
                return;
            };
            let Some(app) = app.upgrade() else {
                return;
            };
            let Ok(mut app) = app.try_borrow_mut() else {
                log::debug!("dropping {} during another callback", kind.dom_name());
                return;
            };
            let accepted = app.handle_event(&raw);
            let scrolls = matches!(kind, EventKind::TouchStart | EventKind::TouchMove | EventKind::TouchEnd);
            let keys_scroll = matches!(&raw, RawEvent::KeyDown(key) if key.command().is_some());
            if accepted && (scrolls || keys_scroll) {
                event.prevent_default();
            }
        });

        element
            .add_event_listener_with_callback(kind.dom_name(), callback.as_ref().unchecked_ref())
            .map_err(|_| HostError::MissingElement(format!("{target:?}")))?;
        self.listeners
            .insert(handle.0, (element, kind.dom_name(), callback));
        Ok(handle)
    }

    fn unlisten(&mut self, handle: ListenerHandle) {
        if let Some((element, name, callback)) = self.listeners.remove(&handle.0) {
            if let Err(e) =
                element.remove_event_listener_with_callback(name, callback.as_ref().unchecked_ref())
            {
                log::warn!("removeEventListener({}) failed: {:?}", name, e);
            }
            self.retired_events.push(callback);
        }
    }

    fn render(&mut self, state: &GameState) -> Result<(), HostError> {
        draw(self, state)
    }

    fn show_overlay(&mut self, overlay: &Overlay) {
        if let Err(e) = self.build_overlay(overlay) {
            log::warn!("Overlay not shown: {}", e);
        }
    }

    fn clear_overlay(&mut self, _game: GameKind) {
        if let Some((root, on_click)) = self.overlay.take() {
            root.remove();
            self.retired_events.push(on_click);
        }
    }

    fn store(&mut self) -> &mut dyn KeyValueStore {
        &mut self.store
    }
}

/// Canvas-local logical coordinates of a client position
fn canvas_point(canvas: &HtmlCanvasElement, client_x: i32, client_y: i32) -> Vec2 {
    let rect = canvas.get_bounding_client_rect();
    let sx = if rect.width() > 0.0 { canvas.width() as f64 / rect.width() } else { 1.0 };
    let sy = if rect.height() > 0.0 { canvas.height() as f64 / rect.height() } else { 1.0 };
    Vec2::new(
        ((client_x as f64 - rect.left()) * sx) as f32,
        ((client_y as f64 - rect.top()) * sy) as f32,
    )
}

fn touch_points(canvas: &HtmlCanvasElement, list: &TouchList) -> Vec<Vec2> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .map(|t| canvas_point(canvas, t.client_x(), t.client_y()))
        .collect()
}

/// Convert a DOM event; `None` for events of an unexpected shape
fn raw_event(kind: EventKind, event: &web_sys::Event, canvas: &HtmlCanvasElement) -> Option<RawEvent> {
    match kind {
        EventKind::KeyDown => {
            let e = event.dyn_ref::<KeyboardEvent>()?;
            Some(RawEvent::KeyDown(Key::from_dom(&e.key())))
        }
        EventKind::KeyUp => {
            let e = event.dyn_ref::<KeyboardEvent>()?;
            Some(RawEvent::KeyUp(Key::from_dom(&e.key())))
        }
        EventKind::PointerDown => {
            let e = event.dyn_ref::<MouseEvent>()?;
            Some(RawEvent::PointerDown(canvas_point(canvas, e.client_x(), e.client_y())))
        }
        EventKind::PointerMove => {
            let e = event.dyn_ref::<MouseEvent>()?;
            Some(RawEvent::PointerMove(canvas_point(canvas, e.client_x(), e.client_y())))
        }
        EventKind::TouchStart => {
            let e = event.dyn_ref::<TouchEvent>()?;
            Some(RawEvent::TouchStart(touch_points(canvas, &e.touches())))
        }
        EventKind::TouchMove => {
            let e = event.dyn_ref::<TouchEvent>()?;
            Some(RawEvent::TouchMove(touch_points(canvas, &e.touches())))
        }
        EventKind::TouchEnd => {
            let e = event.dyn_ref::<TouchEvent>()?;
            Some(RawEvent::TouchEnd(touch_points(canvas, &e.changed_touches())))
        }
        EventKind::Resize => {
            let container = canvas.parent_element()?;
            Some(RawEvent::Resize {
                container_width: container.client_width() as f32,
            })
        }
    }
}

fn draw(host: &WebHost, state: &GameState) -> Result<(), HostError> {
    let ctx = &host.ctx;
    let fail = |what: &str| HostError::Render(what.to_string());

    match &state.world {
        World::Runner(r) => {
            host.fit_canvas(r.width, r.height);
            ctx.set_fill_style_str("#87ceeb");
            ctx.fill_rect(0.0, 0.0, r.width as f64, r.height as f64);

            // Parallax hills
            ctx.set_fill_style_str("#a8d8a0");
            let spacing = 200.0;
            let mut x = -(r.bg_offset % spacing) as f64;
            while x < r.width as f64 {
                ctx.fill_rect(x, r.ground_y as f64 - 30.0, 120.0, 30.0);
                x += spacing as f64;
            }

            ctx.set_fill_style_str("#6b8e23");
            ctx.fill_rect(0.0, r.ground_y as f64, r.width as f64, (r.height - r.ground_y) as f64);

            let p = &r.player.body;
            ctx.set_fill_style_str(if r.anim_frame == 0 { "#ff6f61" } else { "#e85a4f" });
            ctx.fill_rect(p.pos.x as f64, p.pos.y as f64, p.width() as f64, p.height() as f64);

            ctx.set_fill_style_str("#5d4037");
            for o in &r.obstacles {
                let b = &o.body;
                ctx.fill_rect(b.pos.x as f64, b.pos.y as f64, b.width() as f64, b.height() as f64);
            }
        }
        World::Flappy(f) => {
            let t = &host.settings.flappy;
            host.fit_canvas(f.width, f.height);
            ctx.set_fill_style_str("#70c5ce");
            ctx.fill_rect(0.0, 0.0, f.width as f64, f.height as f64);

            let floor = f.floor_y(t) as f64;
            ctx.set_fill_style_str("#2e8b57");
            for pipe in &f.pipes {
                let (top, bottom) = f.gap_span(pipe);
                ctx.fill_rect(pipe.x as f64, 0.0, t.pipe_w as f64, top as f64);
                ctx.fill_rect(pipe.x as f64, bottom as f64, t.pipe_w as f64, floor - bottom as f64);
            }

            ctx.set_fill_style_str("#ded895");
            ctx.fill_rect(0.0, floor, f.width as f64, t.ground_h as f64);

            ctx.set_fill_style_str("#ffd700");
            ctx.begin_path();
            ctx.arc(
                f.bird.pos.x as f64,
                f.bird.pos.y as f64,
                f.bird.radius() as f64,
                0.0,
                std::f64::consts::TAU,
            )
            .map_err(|_| fail("bird"))?;
            ctx.fill();
        }
        World::Breakout(b) => {
            let t = &host.settings.breakout;
            host.fit_canvas(b.width, b.height);
            ctx.set_fill_style_str("#1a1a2e");
            ctx.fill_rect(0.0, 0.0, b.width as f64, b.height as f64);

            const ROW_COLORS: [&str; 5] = ["#ff6b6b", "#ffa94d", "#ffd43b", "#69db7c", "#4dabf7"];
            for brick in &b.bricks {
                let body = &brick.body;
                ctx.set_fill_style_str(ROW_COLORS[brick.row as usize % ROW_COLORS.len()]);
                ctx.fill_rect(
                    body.pos.x as f64,
                    body.pos.y as f64,
                    body.width() as f64,
                    body.height() as f64,
                );
            }

            ctx.set_fill_style_str("#e0e0e0");
            ctx.fill_rect(b.paddle_x as f64, b.paddle_y(t) as f64, t.paddle_w as f64, t.paddle_h as f64);

            ctx.begin_path();
            ctx.arc(
                b.ball.pos.x as f64,
                b.ball.pos.y as f64,
                b.ball.radius() as f64,
                0.0,
                std::f64::consts::TAU,
            )
            .map_err(|_| fail("ball"))?;
            ctx.fill();

            ctx.set_font("16px sans-serif");
            ctx.set_text_align("right");
            ctx.fill_text(&format!("Lives: {}", b.lives), b.width as f64 - 10.0, 24.0)
                .map_err(|_| fail("lives"))?;
        }
        World::Snake(s) => {
            host.fit_canvas(s.board as f32, s.board as f32);
            let cell = s.cell as f64;
            ctx.set_fill_style_str("#111");
            ctx.fill_rect(0.0, 0.0, s.board as f64, s.board as f64);

            ctx.set_fill_style_str("#ff5252");
            ctx.fill_rect(s.food.x as f64, s.food.y as f64, cell - 1.0, cell - 1.0);

            for (i, seg) in s.body.iter().enumerate() {
                ctx.set_fill_style_str(if i == 0 { "#00e676" } else { "#43a047" });
                ctx.fill_rect(seg.x as f64, seg.y as f64, cell - 1.0, cell - 1.0);
            }
        }
        World::Merge(m) => {
            let side = host.canvas.width().min(host.canvas.height()) as f64;
            let gap = 8.0;
            let tile = (side - gap * (m.size as f64 + 1.0)) / m.size as f64;
            ctx.set_fill_style_str("#bbada0");
            ctx.fill_rect(0.0, 0.0, side, side);
            ctx.set_font("bold 28px sans-serif");
            ctx.set_text_align("center");
            ctx.set_text_baseline("middle");

            for row in 0..m.size {
                for col in 0..m.size {
                    let value = m.get(row, col);
                    let x = gap + col as f64 * (tile + gap);
                    let y = gap + row as f64 * (tile + gap);
                    ctx.set_fill_style_str(tile_color(value));
                    ctx.fill_rect(x, y, tile, tile);
                    if value != 0 {
                        ctx.set_fill_style_str(if value <= 4 { "#776e65" } else { "#f9f6f2" });
                        ctx.fill_text(&value.to_string(), x + tile / 2.0, y + tile / 2.0)
                            .map_err(|_| fail("tile"))?;
                    }
                }
            }
        }
        World::TicTacToe(t) => {
            host.fit_canvas(t.size, t.size);
            let size = t.size as f64;
            let cell = size / 3.0;
            ctx.set_fill_style_str("#fafafa");
            ctx.fill_rect(0.0, 0.0, size, size);

            ctx.set_fill_style_str("#333");
            for i in 1..3 {
                let at = i as f64 * cell;
                ctx.fill_rect(at - 2.0, 0.0, 4.0, size);
                ctx.fill_rect(0.0, at - 2.0, size, 4.0);
            }

            ctx.set_font("bold 64px sans-serif");
            ctx.set_text_align("center");
            ctx.set_text_baseline("middle");
            for (i, mark) in t.board.iter().enumerate() {
                let (text, color) = match mark {
                    Mark::X => ("X", "#e53935"),
                    Mark::O => ("O", "#1e88e5"),
                    Mark::Empty => continue,
                };
                let cx = (i % 3) as f64 * cell + cell / 2.0;
                let cy = (i / 3) as f64 * cell + cell / 2.0;
                ctx.set_fill_style_str(color);
                ctx.fill_text(text, cx, cy).map_err(|_| fail("mark"))?;
            }
        }
    }

    // Score and pause banner for the real-time games
    if !matches!(state.world, World::TicTacToe(_) | World::Merge(_)) {
        ctx.set_fill_style_str("#ffffff");
        ctx.set_font("bold 20px sans-serif");
        ctx.set_text_align("left");
        ctx.set_text_baseline("alphabetic");
        ctx.fill_text(&format!("Score: {}", state.score), 10.0, 26.0)
            .map_err(|_| fail("score"))?;
    }
    if state.phase == GamePhase::Paused {
        let (w, h) = (host.canvas.width() as f64, host.canvas.height() as f64);
        ctx.set_fill_style_str("rgba(0,0,0,0.5)");
        ctx.fill_rect(0.0, 0.0, w, h);
        ctx.set_fill_style_str("#ffffff");
        ctx.set_font("bold 32px sans-serif");
        ctx.set_text_align("center");
        ctx.fill_text("Paused", w / 2.0, h / 2.0).map_err(|_| fail("pause"))?;
    }
    Ok(())
}

fn tile_color(value: u32) -> &'static str {
    match value {
        0 => "#cdc1b4",
        2 => "#eee4da",
        4 => "#ede0c8",
        8 => "#f2b179",
        16 => "#f59563",
        32 => "#f67c5f",
        64 => "#f65e3b",
        128 => "#edcf72",
        256 => "#edcc61",
        512 => "#edc850",
        1024 => "#edc53f",
        _ => "#edc22e",
    }
}

/// A session and the host it drives
pub struct WebApp {
    session: Session,
    host: WebHost,
}

impl WebApp {
    fn create(game: GameKind) -> Result<Rc<RefCell<WebApp>>, HostError> {
        let window = web_sys::window().ok_or_else(|| HostError::MissingElement("window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| HostError::MissingElement("document".into()))?;
        let ids = DomIds::for_game(game);

        let canvas: HtmlCanvasElement = document
            .get_element_by_id(ids.canvas)
            .and_then(|el| el.dyn_into().ok())
            .ok_or_else(|| HostError::MissingElement(ids.canvas.to_string()))?;
        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or(HostError::MissingContext)?;

        let store = WebStore::new(&window);
        let settings = Settings::load(&store);
        let guard = DomModalGuard {
            document: document.clone(),
            modal_id: ids.modal,
        };
        let seed = js_sys::Date::now() as u64;
        let session = Session::new(game, settings.clone(), Box::new(guard), seed);

        Ok(Rc::new_cyclic(|app| {
            RefCell::new(WebApp {
                session,
                host: WebHost {
                    game,
                    ids,
                    settings,
                    app: app.clone(),
                    window,
                    document,
                    canvas,
                    ctx,
                    next_id: 0,
                    frames: HashMap::new(),
                    intervals: HashMap::new(),
                    listeners: HashMap::new(),
                    overlay: None,
                    retired_events: Vec::new(),
                    retired_timers: Vec::new(),
                    retired_frames: Vec::new(),
                    store,
                },
            })
        }))
    }

    fn init(&mut self) -> Result<(), GameError> {
        self.host.drop_retired();
        self.session.init(&mut self.host)
    }

    fn restart(&mut self) {
        self.host.drop_retired();
        if let Err(e) = self.session.restart(&mut self.host) {
            log::error!("Restart failed: {}", e);
        }
    }

    fn cleanup(&mut self) {
        self.session.cleanup(&mut self.host);
    }

    fn cleanup_controls(&mut self) {
        self.session.cleanup_controls(&mut self.host);
    }

    fn on_frame(&mut self, handle: FrameHandle, now: f64) {
        self.host.drop_retired();
        // This closure is running now; free it on the next callback
        if let Some((_, callback)) = self.host.frames.remove(&handle.0) {
            self.host.retired_frames.push(callback);
        }
        self.session.on_frame(&mut self.host, handle, now);
    }

    fn on_interval(&mut self, handle: TimerHandle) {
        self.host.drop_retired();
        self.session.on_interval(&mut self.host, handle);
    }

    fn handle_event(&mut self, event: &RawEvent) -> bool {
        self.host.drop_retired();
        self.session.handle_event(&mut self.host, event)
    }
}

thread_local! {
    static APPS: RefCell<HashMap<GameKind, Rc<RefCell<WebApp>>>> = RefCell::new(HashMap::new());
}

fn parse_game(name: &str) -> Result<GameKind, JsValue> {
    GameKind::from_str(name).ok_or_else(|| JsValue::from_str(&format!("unknown game `{name}`")))
}

fn existing_app(game: GameKind) -> Option<Rc<RefCell<WebApp>>> {
    APPS.with(|apps| apps.borrow().get(&game).cloned())
}

fn with_app<R>(name: &str, f: impl FnOnce(&mut WebApp) -> R) -> Result<Option<R>, JsValue> {
    let game = parse_game(name)?;
    let Some(app) = existing_app(game) else {
        return Ok(None);
    };
    let mut app = app
        .try_borrow_mut()
        .map_err(|_| JsValue::from_str("game is busy"))?;
    Ok(Some(f(&mut app)))
}

/// Called by the navigation shell when a game's modal opens
#[wasm_bindgen]
pub fn init_game(name: &str) -> Result<(), JsValue> {
    let game = parse_game(name)?;
    let app = match existing_app(game) {
        Some(app) => app,
        None => {
            let app = WebApp::create(game).map_err(|e| JsValue::from_str(&e.to_string()))?;
            APPS.with(|apps| apps.borrow_mut().insert(game, app.clone()));
            app
        }
    };
    let mut app = app
        .try_borrow_mut()
        .map_err(|_| JsValue::from_str("game is busy"))?;
    app.init().map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Called when the modal closes: stops the loop and detaches every listener
#[wasm_bindgen]
pub fn cleanup_game(name: &str) -> Result<(), JsValue> {
    with_app(name, WebApp::cleanup).map(|_| ())
}

#[wasm_bindgen]
pub fn cleanup_game_controls(name: &str) -> Result<(), JsValue> {
    with_app(name, WebApp::cleanup_controls).map(|_| ())
}

#[wasm_bindgen]
pub fn restart_game(name: &str) -> Result<(), JsValue> {
    match with_app(name, WebApp::restart)? {
        Some(()) => Ok(()),
        None => init_game(name),
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"logger already initialized".into());
    }
    log::info!("Party arcade loaded");
}
