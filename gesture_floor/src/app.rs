//! Top-level application state machine.
//!
//! `AppState` owns the circle ledger, its store and autosaver, the scene
//! registry, and at most one mode session.  Each inference frame is
//! classified once and routed to the current session; whatever the session
//! emits is recorded in the registry and forwarded to the render sink.
//!
//! ```text
//!            switch_mode                     switch_mode
//!   Idle ───────────────▶ Connect ◀──────────────────────▶ Prayer
//!     ▲   (exit: discard stroke,       (exit: force prayer end)
//!     └──── tracking lost ─────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::mpsc::{self, TryRecvError};
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};

use circle_ledger::{
    Autosaver, CircleLedger, CircleStore, JsonFileStore, MemoryStore, SaveOutcome, load_initial,
};
use hand_gesture::{FrameError, GestureFacts, HandLandmarkFrame, StrokePoint, classify_raw};

use crate::config::AppConfig;
use crate::connect::ConnectSession;
use crate::prayer::PrayerSession;
use crate::render::{NullSink, PrayerIntensity, RenderCommand, RenderSink, SceneRegistry};
use crate::session::{Mode, SessionOutput};
use crate::source::{
    ReplayFrameSource, SimFrameSource, SimInput, SourceEvent, spawn_frame_source,
};
use crate::visualizer::{UiAction, Visualizer};

/// How long an intersection sparkle stays registered.
pub const EFFECT_LIFETIME_MS: f64 = 2500.0;

// ════════════════════════════════════════════════════════════════════════════
// Session / tracking state
// ════════════════════════════════════════════════════════════════════════════

enum Session {
    Idle,
    Connect(ConnectSession),
    Prayer(PrayerSession),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Tracking {
    Available,
    Unavailable(String),
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    config:    AppConfig,

    // ── circles ──────────────────────────────────────────────────────────
    ledger:    CircleLedger,
    store:     Box<dyn CircleStore>,
    autosaver: Autosaver,

    // ── mode ─────────────────────────────────────────────────────────────
    session:   Session,
    tracking:  Tracking,
    facts:     GestureFacts,

    // ── scene ────────────────────────────────────────────────────────────
    registry:  SceneRegistry,
    status:    String,
}

impl AppState {
    pub fn new(config: AppConfig, store: Box<dyn CircleStore>) -> Self {
        let loaded = load_initial(store.as_ref(), config.radius_bounds());
        let status = loaded.notice.clone().unwrap_or_else(|| {
            format!("Ready: {} circles from {} users", loaded.ledger.circle_count(), loaded.ledger.owners().len())
        });
        AppState {
            autosaver: Autosaver::new(config.autosave_interval_ms),
            config,
            ledger:    loaded.ledger,
            store,
            session:   Session::Idle,
            tracking:  Tracking::Available,
            facts:     GestureFacts::none(),
            registry:  SceneRegistry::new(),
            status,
        }
    }

    /// Store for `config.data_path`, or memory when none is set.
    pub fn open_store(config: &AppConfig) -> Box<dyn CircleStore> {
        match &config.data_path {
            Some(path) => Box::new(JsonFileStore::new(path.clone())),
            None       => Box::new(MemoryStore::new()),
        }
    }

    /// Draw every stored circle.  Call once before the first frame.
    pub fn start(&mut self, now_ms: f64, sink: &mut dyn RenderSink) -> usize {
        let mut out = SessionOutput::default();
        for c in self.ledger.all_circles() {
            out.push(RenderCommand::DrawCircle {
                owner_id: c.owner_id.clone(),
                x:        c.x,
                z:        c.z,
                radius:   c.radius,
            });
        }
        let n = out.commands.len();
        self.emit(out, now_ms, sink);
        n
    }

    // ── modes ────────────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        match self.session {
            Session::Idle       => Mode::Idle,
            Session::Connect(_) => Mode::Connect,
            Session::Prayer(_)  => Mode::Prayer,
        }
    }

    /// Leave the current mode and enter `mode` with a fresh session.
    /// Returns false when the switch was refused.
    pub fn switch_mode(&mut self, mode: Mode, now_ms: f64, sink: &mut dyn RenderSink) -> bool {
        if mode == self.mode() {
            return false;
        }
        if mode != Mode::Idle {
            if let Tracking::Unavailable(reason) = &self.tracking {
                self.status = format!("{} needs hand tracking ({})", mode, reason);
                return false;
            }
        }

        let exit = match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Idle => SessionOutput::default(),
            Session::Connect(mut s) => {
                let (summary, out) = s.exit(now_ms);
                info!("connect session ended: {:?}", summary);
                out
            }
            Session::Prayer(mut s) => {
                let (summary, out) = s.exit(now_ms);
                info!("prayer session ended: {:?}", summary);
                out
            }
        };
        self.emit(exit, now_ms, sink);

        let cfg = &self.config;
        self.session = match mode {
            Mode::Idle    => Session::Idle,
            Mode::Connect => Session::Connect(ConnectSession::new(
                &cfg.user_id, cfg.screen, cfg.mapping(), cfg.connect, cfg.stroke,
            )),
            Mode::Prayer  => Session::Prayer(PrayerSession::new(cfg.prayer)),
        };
        match mode {
            Mode::Idle    => {}
            Mode::Connect => self.status = "Connect: point and trace a circle".into(),
            Mode::Prayer  => self.status = "Prayer: bring your hands together".into(),
        }
        info!("mode → {}", mode);
        true
    }

    // ── frames ───────────────────────────────────────────────────────────

    /// Classify one inference frame and route it to the current session.
    /// Returns the commands that were forwarded to `sink`.
    pub fn handle_frame(
        &mut self,
        frame: Result<HandLandmarkFrame, FrameError>,
        now_ms: f64,
        sink: &mut dyn RenderSink,
    ) -> Vec<RenderCommand> {
        self.facts = classify_raw(frame, &self.config.gesture);
        let out = match &mut self.session {
            Session::Idle       => SessionOutput::default(),
            Session::Connect(s) => s.on_frame(&self.facts, now_ms, &mut self.ledger),
            Session::Prayer(s)  => s.on_frame(&self.facts, now_ms),
        };
        self.emit(out, now_ms, sink)
    }

    /// The inference source is gone: drop back to Idle and stay there.
    pub fn tracking_lost(&mut self, reason: &str, now_ms: f64, sink: &mut dyn RenderSink) {
        warn!("hand tracking unavailable: {}", reason);
        self.switch_mode(Mode::Idle, now_ms, sink);
        self.tracking = Tracking::Unavailable(reason.to_string());
        self.status = format!("Hand tracking unavailable: {}", reason);
    }

    /// Remove every circle this user has drawn.
    pub fn clear_own_circles(&mut self, now_ms: f64, sink: &mut dyn RenderSink) -> usize {
        let removed = self.ledger.clear_owner(&self.config.user_id);
        let mut out = SessionOutput::default();
        out.push(RenderCommand::ClearCircles { owner_id: self.config.user_id.clone() });
        out.set_status(format!("Cleared {} of your circles", removed));
        self.emit(out, now_ms, sink);
        removed
    }

    // ── per-tick housekeeping ────────────────────────────────────────────

    pub fn tick(&mut self, now_ms: f64) -> SaveOutcome {
        self.registry.expire_effects(now_ms, EFFECT_LIFETIME_MS);
        let outcome = self.autosaver.tick(&mut self.ledger, self.store.as_mut(), now_ms);
        if let SaveOutcome::Failed { message } = &outcome {
            self.status = message.clone();
        }
        outcome
    }

    /// Leave any mode and save whatever is unsaved.
    pub fn shutdown(&mut self, now_ms: f64) -> SaveOutcome {
        let mut sink = NullSink;
        self.switch_mode(Mode::Idle, now_ms, &mut sink);
        let outcome = self.autosaver.flush(&mut self.ledger, self.store.as_mut(), now_ms);
        if let SaveOutcome::Failed { message } = &outcome {
            self.status = message.clone();
        }
        outcome
    }

    fn emit(&mut self, out: SessionOutput, now_ms: f64, sink: &mut dyn RenderSink) -> Vec<RenderCommand> {
        for c in &out.commands {
            self.registry.record(c, now_ms);
            sink.submit(c);
        }
        if let Some(s) = out.status {
            self.status = s;
        }
        out.commands
    }

    // ── accessors for the render loop ────────────────────────────────────

    pub fn config(&self)    -> &AppConfig     { &self.config }
    pub fn ledger(&self)    -> &CircleLedger  { &self.ledger }
    pub fn registry(&self)  -> &SceneRegistry { &self.registry }
    pub fn status(&self)    -> &str           { &self.status }
    pub fn tracking(&self)  -> &Tracking      { &self.tracking }
    pub fn facts(&self)     -> &GestureFacts  { &self.facts }

    /// The stroke being traced, empty outside Connect.
    pub fn stroke(&self) -> &[StrokePoint] {
        match &self.session {
            Session::Connect(s) => s.stroke(),
            _ => &[],
        }
    }

    pub fn prayer_intensity(&self) -> Option<PrayerIntensity> {
        match &self.session {
            Session::Prayer(s) => s.intensity(),
            _ => None,
        }
    }

    pub fn prayer_count(&self) -> u32 {
        match &self.session {
            Session::Prayer(s) => s.prayer_count(),
            _ => 0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the interactive loop
// ════════════════════════════════════════════════════════════════════════════

pub struct RunOptions {
    /// Replay a recording instead of the simulated hand.
    pub replay:       Option<PathBuf>,
    pub initial_mode: Mode,
}

/// Open the window and drive frames, input and rendering at ~60 fps until
/// the window closes or `Q` is pressed.
pub fn run(cfg: AppConfig, opts: RunOptions) -> Result<()> {
    let clock = Instant::now();
    let now_ms = || clock.elapsed().as_secs_f64() * 1000.0;

    // ── Frame source ─────────────────────────────────────────────────────
    let (sim_tx, frames) = match &opts.replay {
        Some(path) => (None, spawn_frame_source(ReplayFrameSource::new(path.clone(), true))),
        None => {
            let (tx, rx) = mpsc::channel::<SimInput>();
            let source = SimFrameSource { rx, mirror_x: cfg.screen.mirror_x };
            (Some(tx), spawn_frame_source(source))
        }
    };

    // ── Visualizer + state ───────────────────────────────────────────────
    let mut vis = Visualizer::new(&cfg, sim_tx).context("failed to open the floor window")?;
    let store = AppState::open_store(&cfg);
    let mut app = AppState::new(cfg, store);
    app.start(now_ms(), vis.view_mut());
    app.switch_mode(opts.initial_mode, now_ms(), vis.view_mut());

    // ── Main loop ────────────────────────────────────────────────────────
    while vis.is_open() {
        for action in vis.poll_input(now_ms()) {
            match action {
                UiAction::Quit           => return finish(&mut app, now_ms()),
                UiAction::SwitchMode(m)  => { app.switch_mode(m, now_ms(), vis.view_mut()); }
                UiAction::ClearOwn       => { app.clear_own_circles(now_ms(), vis.view_mut()); }
            }
        }

        loop {
            match frames.try_recv() {
                Ok(SourceEvent::Frame(f))           => { app.handle_frame(f.frame, now_ms(), vis.view_mut()); }
                Ok(SourceEvent::Unavailable(why))   => app.tracking_lost(&why, now_ms(), vis.view_mut()),
                Ok(SourceEvent::Finished)           => app.tracking_lost("recording finished", now_ms(), vis.view_mut()),
                Err(TryRecvError::Empty)            => break,
                Err(TryRecvError::Disconnected)     => {
                    if *app.tracking() == Tracking::Available {
                        app.tracking_lost("frame source stopped", now_ms(), vis.view_mut());
                    }
                    break;
                }
            }
        }

        app.tick(now_ms());
        vis.render(&app, now_ms());
    }

    finish(&mut app, now_ms())
}

fn finish(app: &mut AppState, now_ms: f64) -> Result<()> {
    if let SaveOutcome::Failed { message } = app.shutdown(now_ms) {
        anyhow::bail!("circles were not saved on exit: {}", message);
    }
    Ok(())
}

/// Run a recording through the gesture pipeline without a window, using the
/// recorded timestamps.  Returns the final state for inspection.
pub fn replay_headless(cfg: AppConfig, path: PathBuf, mode: Mode) -> Result<AppState> {
    let frames = ReplayFrameSource::new(path.clone(), false)
        .load()
        .with_context(|| format!("failed to read recording {}", path.display()))?;

    let store = AppState::open_store(&cfg);
    let mut app = AppState::new(cfg, store);
    let mut sink = NullSink;
    let t0 = frames.first().map_or(0.0, |f| f.t_ms);
    app.start(t0, &mut sink);
    app.switch_mode(mode, t0, &mut sink);

    let mut last = t0;
    for f in frames {
        last = f.t_ms;
        app.handle_frame(f.frame, f.t_ms, &mut sink);
        app.tick(f.t_ms);
    }
    app.shutdown(last);
    Ok(app)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use circle_ledger::{CircleRecord, LedgerError};
    use floor_geometry::CircleShape;
    use hand_gesture::classifier::poses;
    use crate::render::{PrayerEffect, RecordingSink};
    use std::f32::consts::TAU;

    const FRAME_MS: f64 = 33.0;

    fn config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.user_id = "bob".into();
        cfg.data_path = None;
        cfg.screen.mirror_x = false;
        cfg
    }

    fn app_with(records: Vec<CircleRecord>) -> AppState {
        AppState::new(config(), Box::new(MemoryStore::with_records(records)))
    }

    fn point(x: f32, y: f32) -> Result<HandLandmarkFrame, FrameError> {
        Ok(HandLandmarkFrame::new(vec![poses::pointing_at(x, y)]))
    }

    fn pray() -> Result<HandLandmarkFrame, FrameError> { Ok(poses::pair(0.5, 0.5, 0.05)) }

    fn rest() -> Result<HandLandmarkFrame, FrameError> { Ok(HandLandmarkFrame::empty()) }

    /// Trace a circle of 240 px radius centred on screen; returns the time
    /// after release.
    fn trace_circle(app: &mut AppState, sink: &mut RecordingSink, t0: f64) -> f64 {
        let mut t = t0;
        for _ in 0..10 {
            app.handle_frame(point(0.6875, 0.5), t, sink);
            t += FRAME_MS;
        }
        for i in 0..36 {
            let a = TAU * i as f32 / 36.0;
            app.handle_frame(point(0.5 + 0.1875 * a.cos(), 0.5 + (1.0 / 3.0) * a.sin()), t, sink);
            t += FRAME_MS;
        }
        app.handle_frame(rest(), t, sink);
        t + FRAME_MS
    }

    struct BrokenStore;

    impl CircleStore for BrokenStore {
        fn load(&self) -> Result<Vec<CircleRecord>, LedgerError> {
            Err(LedgerError::Unavailable("disk gone".into()))
        }
        fn save(&mut self, _: &[CircleRecord]) -> Result<(), LedgerError> {
            Err(LedgerError::Unavailable("disk gone".into()))
        }
        fn describe(&self) -> String { "broken".into() }
    }

    #[test]
    fn start_draws_every_stored_circle() {
        let mut app = app_with(vec![
            CircleRecord::new("alice", 0.0, 0.0, 2.0),
            CircleRecord::new("carol", 3.0, 1.0, 1.0),
        ]);
        let mut sink = RecordingSink::new();
        assert_eq!(app.start(0.0, &mut sink), 2);
        assert_eq!(sink.circles_drawn(), 2);
        assert_eq!(app.registry().count(crate::render::EntityKind::FloorCircle), 2);
    }

    #[test]
    fn in_memory_start_is_ready() {
        let cfg = config();
        let app = AppState::new(cfg.clone(), AppState::open_store(&cfg));
        assert!(app.status().starts_with("Ready"), "{}", app.status());
        assert!(!app.status().contains("unreadable"));
        assert!(app.ledger().circle_count() > 0);
    }

    #[test]
    fn unreadable_store_falls_back_with_status() {
        let app = AppState::new(config(), Box::new(BrokenStore));
        assert!(app.ledger().circle_count() > 0);
        assert!(app.status().contains("disk gone"));
    }

    #[test]
    fn idle_ignores_gestures() {
        let mut app = app_with(vec![]);
        let mut sink = RecordingSink::new();
        for i in 0..20 {
            assert!(app.handle_frame(point(0.5, 0.5), i as f64 * FRAME_MS, &mut sink).is_empty());
        }
        assert!(app.facts().is_pointing());
        assert!(sink.commands.is_empty());
    }

    #[test]
    fn alice_and_bob_connect() {
        let mut app = app_with(vec![CircleRecord::new("alice", 4.0, 0.0, 2.0)]);
        let mut sink = RecordingSink::new();
        app.start(0.0, &mut sink);
        assert!(app.switch_mode(Mode::Connect, 0.0, &mut sink));
        sink.drain();

        trace_circle(&mut app, &mut sink, 0.0);
        assert_eq!(app.ledger().circles_of("bob").len(), 1);
        assert_eq!(sink.circles_drawn(), 1);
        assert_eq!(sink.effects_spawned(), 2);
        assert!(app.ledger().is_dirty());
        assert!(app.status().contains("connected"));
    }

    #[test]
    fn leaving_connect_mid_stroke_discards_it() {
        let mut app = app_with(vec![]);
        let mut sink = RecordingSink::new();
        app.switch_mode(Mode::Connect, 0.0, &mut sink);
        for i in 0..25 {
            app.handle_frame(point(0.5, 0.5 + i as f32 * 0.005), i as f64 * FRAME_MS, &mut sink);
        }
        assert!(!app.stroke().is_empty());
        app.switch_mode(Mode::Prayer, 900.0, &mut sink);
        assert_eq!(app.mode(), Mode::Prayer);
        assert!(app.stroke().is_empty());
        assert_eq!(app.ledger().circle_count(), 0);
    }

    #[test]
    fn prayer_rotates_figure_until_mode_exit() {
        let mut app = app_with(vec![]);
        let mut sink = RecordingSink::new();
        app.switch_mode(Mode::Prayer, 0.0, &mut sink);
        let mut t = 0.0;
        // default prayer hold is 500 ms
        for _ in 0..25 {
            app.handle_frame(pray(), t, &mut sink);
            t += FRAME_MS;
        }
        assert!(app.registry().is_figure_rotating());
        assert_eq!(app.prayer_count(), 1);
        assert!(app.prayer_intensity().is_some());

        app.switch_mode(Mode::Idle, t, &mut sink);
        assert!(!app.registry().is_figure_rotating());
        assert_eq!(sink.commands.last(), Some(&RenderCommand::PrayerEffect(PrayerEffect::End)));
    }

    #[test]
    fn malformed_frame_reads_as_no_hands() {
        let mut app = app_with(vec![]);
        let mut sink = RecordingSink::new();
        app.switch_mode(Mode::Connect, 0.0, &mut sink);
        let bad = Err(FrameError::PointCount { hand: 0, expected: 21, actual: 4 });
        let cmds = app.handle_frame(bad, 0.0, &mut sink);
        assert_eq!(cmds, vec![RenderCommand::SetCursor { x: 0.0, y: 0.0, visible: false }]);
        assert_eq!(app.facts().hands_detected, 0);
    }

    #[test]
    fn lost_tracking_blocks_gesture_modes() {
        let mut app = app_with(vec![]);
        let mut sink = RecordingSink::new();
        app.switch_mode(Mode::Connect, 0.0, &mut sink);
        app.tracking_lost("camera denied", 10.0, &mut sink);
        assert_eq!(app.mode(), Mode::Idle);
        assert!(!app.switch_mode(Mode::Prayer, 20.0, &mut sink));
        assert_eq!(app.mode(), Mode::Idle);
        assert!(app.status().contains("camera denied"));
    }

    #[test]
    fn clear_own_circles_leaves_others() {
        let mut app = app_with(vec![
            CircleRecord::new("alice", 0.0, 0.0, 2.0),
            CircleRecord::new("bob", 1.0, 0.0, 1.0),
            CircleRecord::new("bob", 2.0, 0.0, 1.0),
        ]);
        let mut sink = RecordingSink::new();
        app.start(0.0, &mut sink);
        assert_eq!(app.clear_own_circles(5.0, &mut sink), 2);
        assert_eq!(app.ledger().circle_count(), 1);
        assert_eq!(app.registry().owned_by("bob").count(), 0);
        assert_eq!(app.registry().owned_by("alice").count(), 1);
    }

    #[test]
    fn autosave_after_new_circle() {
        let mut app = app_with(vec![]);
        let mut sink = RecordingSink::new();
        app.switch_mode(Mode::Connect, 0.0, &mut sink);
        let t = trace_circle(&mut app, &mut sink, 0.0);
        assert!(matches!(app.tick(t), SaveOutcome::Saved { .. }));
        assert!(!app.ledger().is_dirty());
        assert_eq!(app.tick(t + 10_000.0), SaveOutcome::Skipped);
    }

    #[test]
    fn failed_save_surfaces_in_status() {
        let mut app = AppState::new(config(), Box::new(BrokenStore));
        let mut sink = NullSink;
        app.switch_mode(Mode::Connect, 0.0, &mut sink);
        app.ledger.add_circle(CircleShape::at(0.0, 0.0, 1.0), "bob").unwrap();
        assert!(matches!(app.tick(0.0), SaveOutcome::Failed { .. }));
        assert!(app.status().starts_with("Save failed"));
        assert!(app.ledger().is_dirty());
    }

    #[test]
    fn headless_replay_draws_circle_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let rec = dir.path().join("session.jsonl");
        let mut lines = Vec::new();
        let mut t = 0.0;
        let mut push = |hand: Option<HandLandmarkFrame>, t: f64| {
            let hands: Vec<Vec<Vec<f32>>> = hand.map_or(vec![], |f| f.hands.iter()
                .map(|h| h.points.iter().map(|p| vec![p.x, p.y, p.z]).collect())
                .collect());
            lines.push(serde_json::json!({ "t": t, "hands": hands }).to_string());
        };
        for _ in 0..10 {
            push(Some(HandLandmarkFrame::new(vec![poses::pointing_at(0.6875, 0.5)])), t);
            t += FRAME_MS;
        }
        for i in 0..36 {
            let a = TAU * i as f32 / 36.0;
            let tip = (0.5 + 0.1875 * a.cos(), 0.5 + (1.0 / 3.0) * a.sin());
            push(Some(HandLandmarkFrame::new(vec![poses::pointing_at(tip.0, tip.1)])), t);
            t += FRAME_MS;
        }
        push(None, t);
        std::fs::write(&rec, lines.join("\n")).unwrap();

        let mut cfg = config();
        cfg.data_path = Some(dir.path().join("circles.json"));
        let app = replay_headless(cfg, rec, Mode::Connect).unwrap();
        assert_eq!(app.ledger().circles_of("bob").len(), 1);
        assert!(dir.path().join("circles.json").exists());
    }

    #[test]
    fn demo_recording_draws_one_circle() {
        let path = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/trace_circle.jsonl"));
        let app = replay_headless(config(), path, Mode::Connect).unwrap();
        assert_eq!(app.ledger().circles_of("bob").len(), 1);
        let c = &app.ledger().circles_of("bob")[0];
        assert!(c.x.abs() < 0.1 && c.z.abs() < 0.1);
    }
}
