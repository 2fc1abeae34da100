//! Software-rendered floor view using `minifb`.
//!
//! Layout (top-down, screen = floor):
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ MODE                                        legend: users│
//! │        ◯ alice        ◯ bob                              │
//! │                ✦ crossing sparkle                        │
//! │                    ✚ figure (spins while praying)        │
//! │          · · · live stroke · ·   ○ cursor                │
//! │ status bar                                               │
//! │ key legend                                               │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;

use log::warn;
use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use floor_geometry::{FloorMapping, FloorPoint};

use crate::app::AppState;
use crate::config::AppConfig;
use crate::floor_view::FloorView;
use crate::render::rotation_angle;
use crate::session::Mode;
use crate::source::SimInput;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const STATUS_H:      usize = 36;
const BG_COLOR:      u32   = 0xFF10131C;
const GRID_COLOR:    u32   = 0xFF1C2233;
const TEXT_BG:       u32   = 0xFF0F3460;
const FIGURE_COLOR:  u32   = 0xFFE8E2D0;
const GLOW_COLOR:    u32   = 0xFFFFD700;  // gold
const SPARKLE_COLOR: u32   = 0xFFFFFFFF;
const STROKE_COLOR:  u32   = 0xFF7FDBFF;
const CURSOR_COLOR:  u32   = 0xFFFF4136;

// ════════════════════════════════════════════════════════════════════════════
// Canvas — pixel buffer and drawing primitives
// ════════════════════════════════════════════════════════════════════════════

pub struct Canvas {
    pub w:   usize,
    pub h:   usize,
    pub buf: Vec<u32>,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Canvas { w, h, buf: vec![BG_COLOR; w * h] }
    }

    pub fn clear(&mut self, color: u32) { self.buf.fill(color); }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.w && y < self.h).then(|| self.buf[y * self.w + x])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.w && y < self.h {
            self.buf[y * self.w + x] = color;
        }
    }

    fn set_pixel_i(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize, color);
        }
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.h) {
            for col in x..(x + w).min(self.w) {
                self.buf[row * self.w + col] = color;
            }
        }
    }

    /// Bresenham line.
    pub fn draw_line(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, color: u32) {
        let (mut x, mut y) = (x0, y0);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.set_pixel_i(x, y, color);
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    /// Circle outline `thickness` pixels wide, drawn inward from `r`.
    pub fn draw_ring(&mut self, cx: f64, cy: f64, r: f64, thickness: usize, color: u32) {
        for k in 0..thickness {
            let rr = r - k as f64;
            if rr <= 0.0 { break; }
            let steps = (rr * std::f64::consts::TAU).ceil().max(8.0) as usize;
            for i in 0..steps {
                let a = std::f64::consts::TAU * i as f64 / steps as f64;
                self.set_pixel_i((cx + rr * a.cos()).round() as isize, (cy + rr * a.sin()).round() as isize, color);
            }
        }
    }

    fn draw_diamond(&mut self, cx: isize, cy: isize, r: isize, color: u32) {
        for dy in 0..=r {
            let dx = r - dy;
            for (sx, sy) in [(cx + dx, cy + dy), (cx - dx, cy + dy), (cx + dx, cy - dy), (cx - dx, cy - dy)] {
                self.set_pixel_i(sx, sy, color);
            }
        }
    }

    /// Ring with a centre dot.  The cursor may sit off-canvas while a hand
    /// is tracked past the edge of the frame.
    pub fn draw_cursor_mark(&mut self, x: f64, y: f64, color: u32) {
        self.draw_ring(x, y, 9.0, 2, color);
        self.set_pixel_i(x.floor() as isize, y.floor() as isize, color);
    }

    /// Minimal bitmap font — 3×5 characters.
    pub fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4;
            if cx + 4 > self.w { break; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

/// Window input that the shell acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiAction {
    SwitchMode(Mode),
    ClearOwn,
    Quit,
}

pub struct Visualizer {
    window:         Window,
    canvas:         Canvas,
    view:           FloorView,
    mapping:        FloorMapping,
    sim_tx:         Option<Sender<SimInput>>,
    last_ms:        Option<f64>,
    palm_threshold: f32,
    rotation_speed: f64,
}

impl Visualizer {
    /// Open a window the size of the configured screen.  With `sim_tx` set,
    /// mouse and keys also drive the simulated hand.
    pub fn new(cfg: &AppConfig, sim_tx: Option<Sender<SimInput>>) -> Result<Self, minifb::Error> {
        let (w, h) = (cfg.screen.width as usize, cfg.screen.height as usize);
        let mut window = Window::new(
            "Gesture Floor",
            w, h,
            WindowOptions { resize: false, ..WindowOptions::default() },
        )?;
        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            canvas:         Canvas::new(w, h),
            view:           FloorView::new(),
            mapping:        cfg.mapping(),
            sim_tx,
            last_ms:        None,
            palm_threshold: cfg.gesture.palm_threshold,
            rotation_speed: cfg.figure.rotation_speed,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// The render sink fed by the shell.
    pub fn view_mut(&mut self) -> &mut FloorView { &mut self.view }

    /// Poll keys (and, in simulation, the mouse).
    pub fn poll_input(&mut self, now_ms: f64) -> Vec<UiAction> {
        let mut actions = Vec::new();
        if !self.window.is_open() {
            actions.push(UiAction::Quit);
            return actions;
        }

        let pressed = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        if pressed(Key::Q)    { actions.push(UiAction::Quit); }
        if pressed(Key::Key1) { actions.push(UiAction::SwitchMode(Mode::Connect)); }
        if pressed(Key::Key2) { actions.push(UiAction::SwitchMode(Mode::Prayer)); }
        if pressed(Key::Key0) { actions.push(UiAction::SwitchMode(Mode::Idle)); }
        if pressed(Key::C)    { actions.push(UiAction::ClearOwn); }

        if let Some(tx) = &self.sim_tx {
            let mouse = self.window.get_mouse_pos(MouseMode::Discard);
            let (mx, my) = mouse.unwrap_or((0.0, 0.0));
            let input = SimInput {
                t_ms:     now_ms,
                pointer:  (mx / self.canvas.w as f32, my / self.canvas.h as f32),
                pointing: self.window.is_key_down(Key::P),
                praying:  self.window.is_key_down(Key::Space),
                away:     mouse.is_none(),
            };
            // the source thread only stops when we drop the sender
            let _ = tx.send(input);
        }
        actions
    }

    /// Render one frame.
    pub fn render(&mut self, app: &AppState, now_ms: f64) {
        let dt = self.last_ms.map_or(0.0, |last| ((now_ms - last) / 1000.0) as f32);
        self.last_ms = Some(now_ms);
        self.view.tick(dt, app.registry().is_figure_rotating());

        self.canvas.clear(BG_COLOR);
        self.draw_grid();
        self.draw_circles();
        self.draw_sparkles();
        self.draw_figure();
        self.draw_stroke(app);
        self.draw_cursor();
        self.draw_hud(app);

        if let Err(e) = self.window.update_with_buffer(&self.canvas.buf, self.canvas.w, self.canvas.h) {
            warn!("window update failed: {}", e);
        }
    }

    // ── floor ─────────────────────────────────────────────────────────────

    fn to_screen(&self, x: f64, z: f64) -> (f64, f64) {
        let p = self.mapping.world_to_screen(FloorPoint::new(x, z));
        (p.x, p.y)
    }

    fn draw_grid(&mut self) {
        let half_w = (self.mapping.floor_w / 2.0).floor() as i32;
        let half_d = (self.mapping.floor_d / 2.0).floor() as i32;
        let (w, h) = (self.canvas.w as isize, self.canvas.h as isize);
        for i in -half_w..=half_w {
            let (sx, _) = self.to_screen(i as f64, 0.0);
            self.canvas.draw_line(sx as isize, 0, sx as isize, h - 1, GRID_COLOR);
        }
        for j in -half_d..=half_d {
            let (_, sy) = self.to_screen(0.0, j as f64);
            self.canvas.draw_line(0, sy as isize, w - 1, sy as isize, GRID_COLOR);
        }
    }

    fn draw_circles(&mut self) {
        let circles: Vec<_> = self.view.circles.iter()
            .map(|c| (self.to_screen(c.x, c.z), self.mapping.world_to_pixels(c.radius), c.color))
            .collect();
        for ((sx, sy), r, color) in circles {
            self.canvas.draw_ring(sx, sy, r, 3, color);
        }
    }

    fn draw_sparkles(&mut self) {
        let sparkles: Vec<_> = self.view.sparkles.iter()
            .map(|s| (self.to_screen(s.x, s.z), s.age))
            .collect();
        for ((sx, sy), age) in sparkles {
            let size = (10.0 * (1.0 - age)).max(1.0) as isize;
            let color = blend(SPARKLE_COLOR, BG_COLOR, age);
            self.canvas.draw_diamond(sx as isize, sy as isize, size, color);
            self.canvas.draw_diamond(sx as isize, sy as isize, size / 2, GLOW_COLOR);
        }
    }

    fn draw_figure(&mut self) {
        let (cx, cy) = self.to_screen(0.0, 0.0);
        let arm = 28.0;
        let angle = rotation_angle(self.view.spin_secs, self.rotation_speed);

        if let Some(glow) = self.view.glow {
            let strength = glow.strength(self.palm_threshold) as f64;
            let radius = arm + 12.0 + 40.0 * strength;
            self.canvas.draw_ring(cx, cy, radius, 2 + (4.0 * strength) as usize,
                                  blend(GLOW_COLOR, BG_COLOR, 0.5 - 0.4 * strength as f32));
        }

        for k in 0..4 {
            let a = angle + k as f64 * std::f64::consts::FRAC_PI_2;
            let (ex, ey) = (cx + arm * a.cos(), cy + arm * a.sin());
            self.canvas.draw_line(cx as isize, cy as isize, ex as isize, ey as isize, FIGURE_COLOR);
            self.canvas.draw_diamond(ex as isize, ey as isize, 3, FIGURE_COLOR);
        }
        self.canvas.draw_ring(cx, cy, 6.0, 6, FIGURE_COLOR);
    }

    fn draw_stroke(&mut self, app: &AppState) {
        let pts = app.stroke();
        for pair in pts.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            self.canvas.draw_line(a.x as isize, a.y as isize, b.x as isize, b.y as isize, STROKE_COLOR);
        }
    }

    fn draw_cursor(&mut self) {
        if let Some((x, y)) = self.view.cursor {
            self.canvas.draw_cursor_mark(x, y, CURSOR_COLOR);
        }
    }

    // ── HUD ───────────────────────────────────────────────────────────────

    fn draw_hud(&mut self, app: &AppState) {
        let (w, h) = (self.canvas.w, self.canvas.h);

        let mode = match app.mode() {
            Mode::Prayer => format!("PRAYER  {}", app.prayer_count()),
            m            => m.to_string().to_uppercase(),
        };
        self.canvas.draw_label(&mode, 10, 10, 0xFFFFD700);

        // legend: one swatch per owner, in colour order
        let owners = self.view.owners().to_vec();
        let lx = w.saturating_sub(130);
        let mut ly = 10;
        for owner in owners {
            let color = self.view.color_of(&owner);
            self.canvas.fill_rect(lx, ly, 8, 5, color);
            let marker = if owner == app.config().user_id { "*" } else { "" };
            self.canvas.draw_label(&format!("{}{}", owner, marker), lx + 12, ly, 0xFFCCCCCC);
            ly += 9;
            if ly + 9 > h.saturating_sub(STATUS_H) { break; }
        }

        let status_y = h.saturating_sub(STATUS_H);
        self.canvas.fill_rect(0, status_y, w, STATUS_H, TEXT_BG);
        self.canvas.draw_label(app.status(), 10, status_y + 8, 0xFFEEEEEE);
        self.canvas.draw_label(
            "1=connect  2=prayer  0=idle  P=point  Space=pray  C=clear mine  Q=quit",
            10, h.saturating_sub(12), 0xFF888888,
        );
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '*' => [0b101, 0b010, 0b111, 0b010, 0b101],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
