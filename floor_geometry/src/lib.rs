//! # floor_geometry
//!
//! Plane geometry for the virtual floor that users draw on:
//!
//! * [`FloorMapping`] — affine map between screen pixels and world-floor
//!   coordinates `(x, z)`, centred at the world origin.
//! * [`circle_intersection`] — the two crossing points of two circles.
//! * [`circularity`] — how closely a screen path hugs a circle.
//! * [`Bounds`] — axis-aligned bounding box of a screen path.
//!
//! No external crates are required; everything here is pure `f64` math.
//!
//! ## Coordinate spaces
//!
//! | Space | Axes | Origin | Units |
//! |---|---|---|---|
//! | Screen | `x` right, `y` down | top-left corner | pixels |
//! | Floor  | `x` right, `z` toward viewer | floor centre | world units |
//!
//! ```rust
//! use floor_geometry::{FloorMapping, CircleShape, FloorPoint, circle_intersection};
//!
//! let map = FloorMapping::new(1280.0, 720.0, 16.0, 9.0);
//! let centre = map.screen_to_world(640.0, 360.0);
//! assert!(centre.x.abs() < 1e-9 && centre.z.abs() < 1e-9);
//!
//! let a = CircleShape::new(FloorPoint::new(0.0, 0.0), 2.0);
//! let b = CircleShape::new(FloorPoint::new(3.0, 0.0), 2.0);
//! let [p, q] = circle_intersection(&a, &b).unwrap();
//! assert!((p.x - 1.5).abs() < 1e-9 && (q.x - 1.5).abs() < 1e-9);
//! ```

// ════════════════════════════════════════════════════════════════════════════
// Defaults
// ════════════════════════════════════════════════════════════════════════════

/// Default world-floor width (x extent), centred at the origin.
pub const DEFAULT_FLOOR_WIDTH: f64 = 16.0;
/// Default world-floor depth (z extent), centred at the origin.
pub const DEFAULT_FLOOR_DEPTH: f64 = 9.0;

// ════════════════════════════════════════════════════════════════════════════
// Points
// ════════════════════════════════════════════════════════════════════════════

/// A point on the world floor.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct FloorPoint {
    pub x: f64,
    pub z: f64,
}

impl FloorPoint {
    pub fn new(x: f64, z: f64) -> Self { FloorPoint { x, z } }

    pub fn distance(&self, other: &FloorPoint) -> f64 {
        (self.x - other.x).hypot(self.z - other.z)
    }

    pub fn is_finite(&self) -> bool { self.x.is_finite() && self.z.is_finite() }
}

/// A point in screen space (pixels, `y` grows downward).
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self { ScreenPoint { x, y } }

    pub fn distance(&self, other: &ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FloorMapping — screen ↔ world
// ════════════════════════════════════════════════════════════════════════════

/// Affine map between a screen of `screen_w × screen_h` pixels and a floor
/// of `floor_w × floor_d` world units centred at the origin.
///
/// The screen point is first normalised to `[0,1] × [0,1]`, then scaled by
/// the floor extent and shifted so the screen centre lands on `(0, 0)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloorMapping {
    pub screen_w: f64,
    pub screen_h: f64,
    pub floor_w:  f64,
    pub floor_d:  f64,
}

impl FloorMapping {
    pub fn new(screen_w: f64, screen_h: f64, floor_w: f64, floor_d: f64) -> Self {
        FloorMapping { screen_w, screen_h, floor_w, floor_d }
    }

    /// Mapping for the given screen onto the default floor extent.
    pub fn for_screen(screen_w: f64, screen_h: f64) -> Self {
        FloorMapping::new(screen_w, screen_h, DEFAULT_FLOOR_WIDTH, DEFAULT_FLOOR_DEPTH)
    }

    pub fn screen_to_world(&self, screen_x: f64, screen_y: f64) -> FloorPoint {
        let nx = screen_x / self.screen_w;
        let nz = screen_y / self.screen_h;
        FloorPoint {
            x: (nx - 0.5) * self.floor_w,
            z: (nz - 0.5) * self.floor_d,
        }
    }

    /// Inverse of [`screen_to_world`](Self::screen_to_world).
    pub fn world_to_screen(&self, p: FloorPoint) -> ScreenPoint {
        ScreenPoint {
            x: (p.x / self.floor_w + 0.5) * self.screen_w,
            y: (p.z / self.floor_d + 0.5) * self.screen_h,
        }
    }

    /// World units per screen pixel.
    ///
    /// When the two axes scale differently this is the geometric mean of the
    /// horizontal and vertical ratios, so a circle keeps its area.
    pub fn world_per_pixel(&self) -> f64 {
        let rx = self.floor_w / self.screen_w;
        let rz = self.floor_d / self.screen_h;
        (rx * rz).sqrt()
    }

    /// Convert a length in pixels to world units.
    pub fn pixels_to_world(&self, px: f64) -> f64 { px * self.world_per_pixel() }

    /// Convert a length in world units to pixels.
    pub fn world_to_pixels(&self, world: f64) -> f64 { world / self.world_per_pixel() }

    /// True when the screen point lies on the screen.
    pub fn in_bounds(&self, p: ScreenPoint) -> bool {
        p.x >= 0.0 && p.x <= self.screen_w && p.y >= 0.0 && p.y <= self.screen_h
    }
}

/// Map a screen point onto the default floor extent.
pub fn screen_to_world(screen_x: f64, screen_y: f64, screen_w: f64, screen_h: f64) -> FloorPoint {
    FloorMapping::for_screen(screen_w, screen_h).screen_to_world(screen_x, screen_y)
}

/// Inverse of [`screen_to_world`] on the default floor extent.
pub fn world_to_screen(p: FloorPoint, screen_w: f64, screen_h: f64) -> ScreenPoint {
    FloorMapping::for_screen(screen_w, screen_h).world_to_screen(p)
}

// ════════════════════════════════════════════════════════════════════════════
// Circles
// ════════════════════════════════════════════════════════════════════════════

/// A circle on the floor, without owner or identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleShape {
    pub center: FloorPoint,
    pub radius: f64,
}

impl CircleShape {
    pub fn new(center: FloorPoint, radius: f64) -> Self { CircleShape { center, radius } }

    pub fn at(x: f64, z: f64, radius: f64) -> Self {
        CircleShape { center: FloorPoint::new(x, z), radius }
    }

    pub fn is_finite(&self) -> bool { self.center.is_finite() && self.radius.is_finite() }
}

/// The two points where circles `c1` and `c2` cross, or `None`.
///
/// Two points exist only for `|r1 - r2| < d < r1 + r2`.  Everything else is
/// `None`: circles too far apart, one inside the other, exact tangency, and
/// identical circles (`d == 0 && r1 == r2`, infinitely many solutions).
///
/// A slightly negative radicand from rounding near tangency is clamped to
/// zero.
pub fn circle_intersection(c1: &CircleShape, c2: &CircleShape) -> Option<[FloorPoint; 2]> {
    let (r1, r2) = (c1.radius, c2.radius);
    let dx = c2.center.x - c1.center.x;
    let dz = c2.center.z - c1.center.z;
    let d  = dx.hypot(dz);

    // also covers identical circles: d == 0 == |r1 - r2|
    if d >= r1 + r2 || d <= (r1 - r2).abs() { return None; }

    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();

    // Chord midpoint on the centre-to-centre axis
    let mx = c1.center.x + a * dx / d;
    let mz = c1.center.z + a * dz / d;

    // Offset along the perpendicular
    let ox = -dz * h / d;
    let oz =  dx * h / d;

    Some([
        FloorPoint::new(mx + ox, mz + oz),
        FloorPoint::new(mx - ox, mz - oz),
    ])
}

// ════════════════════════════════════════════════════════════════════════════
// Path analysis
// ════════════════════════════════════════════════════════════════════════════

/// Score in `[0, 1]` of how closely `path` lies on the circle of
/// `expected_radius` about `center`.
///
/// Each point contributes `1 - |dist - r| / r`; the mean is floored at 0.
/// An empty path or a non-positive radius scores 0.
pub fn circularity(path: &[ScreenPoint], center: ScreenPoint, expected_radius: f64) -> f64 {
    if path.is_empty() || !(expected_radius > 0.0) {
        return 0.0;
    }
    let total: f64 = path.iter()
        .map(|p| 1.0 - (p.distance(&center) - expected_radius).abs() / expected_radius)
        .sum();
    (total / path.len() as f64).clamp(0.0, 1.0)
}

/// Axis-aligned bounding box of a screen path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Bounding box of `points`, or `None` for an empty path.
    pub fn of(points: &[ScreenPoint]) -> Option<Bounds> {
        let first = points.first()?;
        let init = Bounds { min_x: first.x, min_y: first.y, max_x: first.x, max_y: first.y };
        Some(points.iter().skip(1).fold(init, |b, p| Bounds {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        }))
    }

    pub fn width(&self)  -> f64 { self.max_x - self.min_x }
    pub fn height(&self) -> f64 { self.max_y - self.min_y }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// `width / height`; infinite or NaN for a flat box.
    pub fn aspect_ratio(&self) -> f64 { self.width() / self.height() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
