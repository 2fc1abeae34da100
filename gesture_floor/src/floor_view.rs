//! Visual state of the floor.
//!
//! [`FloorView`] is the window's [`RenderSink`]: it turns render commands
//! into the things the visualizer paints each frame (coloured circles,
//! fading sparkles, the cursor, the prayer glow) and animates them.

use crate::render::{EffectKind, PrayerEffect, PrayerIntensity, RenderCommand, RenderSink};

// ════════════════════════════════════════════════════════════════════════════
// Colour palette — owner → ARGB
// ════════════════════════════════════════════════════════════════════════════

/// Colour for the `index`-th owner seen.  Hues step by the golden angle so
/// neighbours in the list never look alike.
pub fn owner_color(index: usize) -> u32 {
    let hue = (index as f32 * 137.508) % 360.0;
    hsv_to_argb(hue, 0.70, 0.95)
}

/// Convert HSV → packed ARGB (0xAARRGGBB, A=0xFF).
pub fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h  = h.rem_euclid(360.0);
    let hi = (h / 60.0) as u32;
    let f  = h / 60.0 - hi as f32;
    let p  = v * (1.0 - s);
    let q  = v * (1.0 - s * f);
    let t  = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let ri = (r * 255.0) as u32;
    let gi = (g * 255.0) as u32;
    let bi = (b * 255.0) as u32;
    0xFF000000 | (ri << 16) | (gi << 8) | bi
}

// ════════════════════════════════════════════════════════════════════════════
// Drawn things
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct DrawnCircle {
    pub owner_id: String,
    pub x:        f64,
    pub z:        f64,
    pub radius:   f64,
    pub color:    u32,
}

/// Short-lived burst where two users' circles cross.
#[derive(Clone, Debug, PartialEq)]
pub struct Sparkle {
    pub x:    f64,
    pub z:    f64,
    pub kind: EffectKind,
    /// 0.0 just spawned → 1.0 gone.
    pub age:  f32,
}

/// Seconds a sparkle takes to fade out.
const SPARKLE_SECS: f32 = 2.0;

// ════════════════════════════════════════════════════════════════════════════
// FloorView
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct FloorView {
    pub circles:   Vec<DrawnCircle>,
    pub sparkles:  Vec<Sparkle>,
    /// Screen pixels; `None` when hidden.
    pub cursor:    Option<(f64, f64)>,
    pub glow:      Option<PrayerIntensity>,
    /// Seconds the figure has spent rotating.
    pub spin_secs: f64,
    owners:        Vec<String>,
}

impl FloorView {
    pub fn new() -> Self { FloorView::default() }

    /// Colour assigned to `owner_id`, allocating one on first sight.
    pub fn color_of(&mut self, owner_id: &str) -> u32 {
        let idx = match self.owners.iter().position(|o| o == owner_id) {
            Some(i) => i,
            None => {
                self.owners.push(owner_id.to_string());
                self.owners.len() - 1
            }
        };
        owner_color(idx)
    }

    /// Owners in colour order, for the legend.
    pub fn owners(&self) -> &[String] { &self.owners }

    /// Advance animations by `dt_secs`.
    pub fn tick(&mut self, dt_secs: f32, figure_rotating: bool) {
        for s in &mut self.sparkles {
            s.age += dt_secs / SPARKLE_SECS;
        }
        self.sparkles.retain(|s| s.age < 1.0);
        if figure_rotating {
            self.spin_secs += dt_secs as f64;
        }
    }
}

impl RenderSink for FloorView {
    fn submit(&mut self, command: &RenderCommand) {
        match command {
            RenderCommand::DrawCircle { owner_id, x, z, radius } => {
                let color = self.color_of(owner_id);
                self.circles.push(DrawnCircle {
                    owner_id: owner_id.clone(),
                    x:        *x,
                    z:        *z,
                    radius:   *radius,
                    color,
                });
            }
            RenderCommand::SpawnEffect { x, z, kind } => {
                self.sparkles.push(Sparkle { x: *x, z: *z, kind: *kind, age: 0.0 });
            }
            RenderCommand::SetCursor { x, y, visible } => {
                self.cursor = if *visible { Some((*x, *y)) } else { None };
            }
            RenderCommand::PrayerEffect(PrayerEffect::Begin(i))
            | RenderCommand::PrayerEffect(PrayerEffect::Update(i)) => self.glow = Some(*i),
            RenderCommand::PrayerEffect(PrayerEffect::End) => self.glow = None,
            RenderCommand::ClearCircles { owner_id } => {
                self.circles.retain(|c| &c.owner_id != owner_id);
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
