//! Circle stroke recognition.
//!
//! A stroke is the screen path traced while pointing is sustained.  The
//! recognizer collects it point by point and, when the stroke ends, decides
//! whether the path was a circle:
//!
//! 1. at least `min_circle_points` samples,
//! 2. bounding-box aspect ratio inside `[min_aspect_ratio, max_aspect_ratio]`,
//! 3. circularity about the box centre (radius = half the longer side)
//!    at least `circle_detection_threshold`.
//!
//! Accepted strokes are mapped onto the floor and their radius clamped to
//! `[min_radius, max_radius]` world units.

use log::debug;
use serde::{Deserialize, Serialize};

use floor_geometry::{Bounds, CircleShape, FloorMapping, ScreenPoint, circularity};

use crate::error::ConfigError;

// ════════════════════════════════════════════════════════════════════════════
// StrokeConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    pub min_circle_points:          usize,
    pub circle_detection_threshold: f64,
    pub min_aspect_ratio:           f64,
    pub max_aspect_ratio:           f64,
    /// World units.
    pub min_radius:                 f64,
    /// World units.
    pub max_radius:                 f64,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        StrokeConfig {
            min_circle_points:          10,
            circle_detection_threshold: 0.3,
            min_aspect_ratio:           0.7,
            max_aspect_ratio:           1.4,
            min_radius:                 0.5,
            max_radius:                 3.0,
        }
    }
}

impl StrokeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_non_negative("circle_detection_threshold", self.circle_detection_threshold)?;
        ConfigError::check_positive("min_aspect_ratio", self.min_aspect_ratio)?;
        ConfigError::check_positive("max_aspect_ratio", self.max_aspect_ratio)?;
        ConfigError::check_range("min_aspect_ratio", self.min_aspect_ratio,
                                 "max_aspect_ratio", self.max_aspect_ratio)?;
        ConfigError::check_positive("min_radius", self.min_radius)?;
        ConfigError::check_positive("max_radius", self.max_radius)?;
        ConfigError::check_range("min_radius", self.min_radius, "max_radius", self.max_radius)?;
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Path and verdicts
// ════════════════════════════════════════════════════════════════════════════

/// One sample of a stroke.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokePoint {
    pub x:            f64,
    pub y:            f64,
    pub timestamp_ms: f64,
}

impl StrokePoint {
    pub fn new(x: f64, y: f64, timestamp_ms: f64) -> Self { StrokePoint { x, y, timestamp_ms } }

    pub fn screen(&self) -> ScreenPoint { ScreenPoint::new(self.x, self.y) }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RejectReason {
    TooFewPoints { count: usize },
    /// Zero-width or zero-height bounding box.
    DegenerateBounds,
    Elongated { aspect: f64 },
    NotCircular { score: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StrokeVerdict {
    Accepted(CircleShape),
    Rejected(RejectReason),
}

impl StrokeVerdict {
    pub fn circle(&self) -> Option<CircleShape> {
        match self {
            StrokeVerdict::Accepted(c) => Some(*c),
            StrokeVerdict::Rejected(_) => None,
        }
    }
}

/// Classify a finished path.
pub fn detect_circle(path: &[StrokePoint], config: &StrokeConfig, mapping: &FloorMapping) -> StrokeVerdict {
    if path.len() < config.min_circle_points {
        return StrokeVerdict::Rejected(RejectReason::TooFewPoints { count: path.len() });
    }

    let points: Vec<ScreenPoint> = path.iter().map(StrokePoint::screen).collect();
    let bounds = match Bounds::of(&points) {
        Some(b) if b.width() > 0.0 && b.height() > 0.0 => b,
        _ => return StrokeVerdict::Rejected(RejectReason::DegenerateBounds),
    };

    let aspect = bounds.aspect_ratio();
    if aspect < config.min_aspect_ratio || aspect > config.max_aspect_ratio {
        return StrokeVerdict::Rejected(RejectReason::Elongated { aspect });
    }

    let center = bounds.center();
    let radius_px = bounds.width().max(bounds.height()) / 2.0;
    let score = circularity(&points, center, radius_px);
    if score < config.circle_detection_threshold {
        return StrokeVerdict::Rejected(RejectReason::NotCircular { score });
    }

    let world = mapping.screen_to_world(center.x, center.y);
    let radius = mapping.pixels_to_world(radius_px).clamp(config.min_radius, config.max_radius);
    StrokeVerdict::Accepted(CircleShape::new(world, radius))
}

// ════════════════════════════════════════════════════════════════════════════
// StrokeRecognizer
// ════════════════════════════════════════════════════════════════════════════

/// NotDrawing → Drawing → (classify) → NotDrawing.
#[derive(Clone, Debug)]
pub struct StrokeRecognizer {
    config:  StrokeConfig,
    mapping: FloorMapping,
    path:    Option<Vec<StrokePoint>>,
}

impl StrokeRecognizer {
    pub fn new(config: StrokeConfig, mapping: FloorMapping) -> Self {
        StrokeRecognizer { config, mapping, path: None }
    }

    pub fn is_drawing(&self) -> bool { self.path.is_some() }

    /// The in-progress path, empty when not drawing.
    pub fn path(&self) -> &[StrokePoint] {
        self.path.as_deref().unwrap_or(&[])
    }

    /// Append a sample, starting a new stroke if none is in progress.
    pub fn push(&mut self, point: StrokePoint) {
        match self.path.as_mut() {
            Some(path) => path.push(point),
            None => {
                debug!("stroke started at ({:.0}, {:.0})", point.x, point.y);
                self.path = Some(vec![point]);
            }
        }
    }

    /// End the stroke and classify it.  `None` when no stroke was in progress.
    pub fn finish(&mut self) -> Option<StrokeVerdict> {
        let path = self.path.take()?;
        let verdict = detect_circle(&path, &self.config, &self.mapping);
        debug!("stroke of {} points → {:?}", path.len(), verdict);
        Some(verdict)
    }

    /// Throw the in-progress stroke away without classifying it.
    pub fn discard(&mut self) -> usize {
        self.path.take().map_or(0, |p| p.len())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn mapping() -> FloorMapping { FloorMapping::new(1280.0, 720.0, 16.0, 9.0) }

    fn ellipse(cx: f64, cy: f64, rx: f64, ry: f64, n: usize) -> Vec<StrokePoint> {
        (0..n).map(|i| {
            let a = TAU * i as f64 / n as f64;
            StrokePoint::new(cx + rx * a.cos(), cy + ry * a.sin(), i as f64 * 33.0)
        }).collect()
    }

    #[test]
    fn round_stroke_accepted_and_mapped() {
        let path = ellipse(640.0, 360.0, 80.0, 80.0, 36);
        let circle = detect_circle(&path, &StrokeConfig::default(), &mapping()).circle().unwrap();
        assert!(circle.center.x.abs() < 1e-6);
        assert!(circle.center.z.abs() < 1e-6);
        // 80 px × 0.0125 = 1.0 world unit
        assert!((circle.radius - 1.0).abs() < 1e-3);
    }

    #[test]
    fn squarish_aspect_accepted() {
        let path = ellipse(400.0, 300.0, 130.0, 100.0, 40);
        match detect_circle(&path, &StrokeConfig::default(), &mapping()) {
            StrokeVerdict::Accepted(c) => assert!(c.radius > 0.5),
            other => panic!("expected accept, got {:?}", other),
        }
    }

    #[test]
    fn elongated_rejected() {
        let path = ellipse(400.0, 300.0, 200.0, 100.0, 40);
        match detect_circle(&path, &StrokeConfig::default(), &mapping()) {
            StrokeVerdict::Rejected(RejectReason::Elongated { aspect }) => {
                assert!((aspect - 2.0).abs() < 1e-6)
            }
            other => panic!("expected elongated, got {:?}", other),
        }
    }

    #[test]
    fn elongated_rejected_even_with_permissive_circularity() {
        let cfg = StrokeConfig { circle_detection_threshold: 0.0, ..StrokeConfig::default() };
        let path = ellipse(400.0, 300.0, 200.0, 100.0, 40);
        assert!(detect_circle(&path, &cfg, &mapping()).circle().is_none());
    }

    #[test]
    fn too_few_points_rejected_first() {
        // a short, wildly non-circular path: count check must win
        let path: Vec<StrokePoint> = (0..9).map(|i| StrokePoint::new(i as f64, 0.0, 0.0)).collect();
        assert_eq!(
            detect_circle(&path, &StrokeConfig::default(), &mapping()),
            StrokeVerdict::Rejected(RejectReason::TooFewPoints { count: 9 })
        );
    }

    #[test]
    fn flat_path_is_degenerate() {
        let path: Vec<StrokePoint> = (0..20).map(|i| StrokePoint::new(i as f64 * 5.0, 100.0, 0.0)).collect();
        assert_eq!(
            detect_circle(&path, &StrokeConfig::default(), &mapping()),
            StrokeVerdict::Rejected(RejectReason::DegenerateBounds)
        );
    }

    #[test]
    fn scribble_in_square_box_fails_circularity() {
        // points clustered at the centre of a square box
        let mut path: Vec<StrokePoint> = (0..30).map(|i| StrokePoint::new(200.0 + (i % 3) as f64, 200.0 + (i % 2) as f64, 0.0)).collect();
        path.push(StrokePoint::new(100.0, 100.0, 0.0));
        path.push(StrokePoint::new(300.0, 300.0, 0.0));
        match detect_circle(&path, &StrokeConfig::default(), &mapping()) {
            StrokeVerdict::Rejected(RejectReason::NotCircular { score }) => assert!(score < 0.3),
            other => panic!("expected not circular, got {:?}", other),
        }
    }

    #[test]
    fn radius_is_clamped() {
        let cfg = StrokeConfig::default();
        let tiny = ellipse(640.0, 360.0, 10.0, 10.0, 24);
        assert_eq!(detect_circle(&tiny, &cfg, &mapping()).circle().unwrap().radius, cfg.min_radius);
        let huge = ellipse(640.0, 360.0, 340.0, 340.0, 60);
        assert_eq!(detect_circle(&huge, &cfg, &mapping()).circle().unwrap().radius, cfg.max_radius);
    }

    #[test]
    fn recognizer_lifecycle() {
        let mut r = StrokeRecognizer::new(StrokeConfig::default(), mapping());
        assert!(!r.is_drawing());
        assert!(r.finish().is_none());

        for p in ellipse(300.0, 300.0, 60.0, 60.0, 24) { r.push(p); }
        assert!(r.is_drawing());
        assert_eq!(r.path().len(), 24);

        let verdict = r.finish().unwrap();
        assert!(verdict.circle().is_some());
        assert!(!r.is_drawing());
        assert!(r.path().is_empty());
    }

    #[test]
    fn discard_drops_without_verdict() {
        let mut r = StrokeRecognizer::new(StrokeConfig::default(), mapping());
        for p in ellipse(300.0, 300.0, 60.0, 60.0, 24) { r.push(p); }
        assert_eq!(r.discard(), 24);
        assert!(r.finish().is_none());
    }

    #[test]
    fn inverted_radius_range_rejected() {
        let cfg = StrokeConfig { min_radius: 4.0, max_radius: 3.0, ..StrokeConfig::default() };
        assert!(cfg.validate().is_err());
        assert!(StrokeConfig::default().validate().is_ok());
    }
}
