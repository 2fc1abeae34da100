//! Per-frame gesture classification.
//!
//! [`classify`] is a pure function from one [`HandLandmarkFrame`] to the
//! semantic [`GestureFacts`] the mode controllers consume:
//!
//! | Fact | Needs | Rule |
//! |---|---|---|
//! | pointing | ≥ 1 hand (first hand only) | index extended, middle/ring/pinky folded |
//! | prayer   | exactly 2 hands | palm distance < palm threshold **and** index-tip distance < index threshold |
//!
//! Image `y` grows downward, so "extended" means strictly decreasing `y`
//! from knuckle to tip, and "folded" means the tip sits below its middle
//! joint.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, FrameError};
use crate::landmarks::*;

// ════════════════════════════════════════════════════════════════════════════
// GestureConfig
// ════════════════════════════════════════════════════════════════════════════

/// Distance thresholds in landmark-normalised units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Maximum distance between the two palm centres for a prayer.
    pub palm_threshold:  f32,
    /// Maximum distance between the two index fingertips for a prayer.
    pub index_threshold: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            palm_threshold:  0.25,
            index_threshold: 0.35,
        }
    }
}

impl GestureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_non_negative("palm_threshold", self.palm_threshold as f64)?;
        ConfigError::check_non_negative("index_threshold", self.index_threshold as f64)?;
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureFacts
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointingFacts {
    pub is_pointing: bool,
    /// Index fingertip in normalised camera space.
    pub tip: Landmark,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrayerFacts {
    pub is_prayer_gesture: bool,
    pub index_distance:    f32,
    pub palm_distance:     f32,
}

/// Everything one frame says about the user's hands.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct GestureFacts {
    pub hands_detected: usize,
    /// `None` with no hands.
    pub pointing: Option<PointingFacts>,
    /// `None` unless exactly two hands are present.
    pub prayer:   Option<PrayerFacts>,
}

impl GestureFacts {
    pub fn none() -> Self { GestureFacts::default() }

    pub fn is_pointing(&self) -> bool {
        self.pointing.map_or(false, |p| p.is_pointing)
    }

    pub fn is_praying(&self) -> bool {
        self.prayer.map_or(false, |p| p.is_prayer_gesture)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Classification
// ════════════════════════════════════════════════════════════════════════════

/// Classify one frame.  Never fails.
pub fn classify(frame: &HandLandmarkFrame, config: &GestureConfig) -> GestureFacts {
    let hands_detected = frame.hand_count();

    let pointing = frame.first().map(|hand| PointingFacts {
        is_pointing: is_pointing(hand),
        tip:         *hand.index_tip(),
    });

    let prayer = match frame.hands.as_slice() {
        [a, b] => Some(prayer_facts(a, b, config)),
        _      => None,
    };

    GestureFacts { hands_detected, pointing, prayer }
}

/// Classify a frame that may have failed to parse; malformed input reads as
/// "no hands detected".
pub fn classify_raw(frame: Result<HandLandmarkFrame, FrameError>, config: &GestureConfig) -> GestureFacts {
    match frame {
        Ok(f)  => classify(&f, config),
        Err(e) => {
            warn!("dropping malformed landmark frame: {}", e);
            GestureFacts::none()
        }
    }
}

/// Index extended (tip above first joint above knuckle) with the other three
/// fingertips folded below their middle joints.
pub fn is_pointing(hand: &HandLandmarks) -> bool {
    let y = |i: usize| hand.get(i).y;

    let index_extended = y(INDEX_TIP) < y(INDEX_PIP) && y(INDEX_PIP) < y(INDEX_MCP);
    let middle_folded  = y(MIDDLE_TIP) > y(MIDDLE_PIP);
    let ring_folded    = y(RING_TIP)   > y(RING_PIP);
    let pinky_folded   = y(PINKY_TIP)  > y(PINKY_PIP);

    index_extended && middle_folded && ring_folded && pinky_folded
}

fn prayer_facts(a: &HandLandmarks, b: &HandLandmarks, config: &GestureConfig) -> PrayerFacts {
    let index_distance = a.index_tip().distance(b.index_tip());
    let palm_distance  = a.palm_center().distance(b.palm_center());
    PrayerFacts {
        is_prayer_gesture: palm_distance < config.palm_threshold
                        && index_distance < config.index_threshold,
        index_distance,
        palm_distance,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic poses
// ════════════════════════════════════════════════════════════════════════════

/// Synthetic hand poses for simulation and tests.
pub mod poses {
    use super::*;

    /// An upright hand with its wrist at `(wx, wy)`; `extended[f]` selects
    /// which of index/middle/ring/pinky point up (thumb always relaxed).
    pub fn hand(wx: f32, wy: f32, extended: [bool; 4]) -> HandLandmarks {
        let mut pts = [Landmark::new(wx, wy, 0.0); LANDMARK_COUNT];

        pts[THUMB_CMC] = Landmark::new(wx - 0.03, wy - 0.02, 0.0);
        pts[THUMB_MCP] = Landmark::new(wx - 0.05, wy - 0.04, 0.0);
        pts[THUMB_IP]  = Landmark::new(wx - 0.06, wy - 0.06, 0.0);
        pts[THUMB_TIP] = Landmark::new(wx - 0.07, wy - 0.07, 0.0);

        let fingers = [
            (INDEX_MCP,  -0.02),
            (MIDDLE_MCP,  0.00),
            (RING_MCP,    0.02),
            (PINKY_MCP,   0.04),
        ];
        for (f, &(mcp, dx)) in fingers.iter().enumerate() {
            let x = wx + dx;
            let knuckle_y = wy - 0.08;
            pts[mcp] = Landmark::new(x, knuckle_y, 0.0);
            if extended[f] {
                pts[mcp + 1] = Landmark::new(x, knuckle_y - 0.03, 0.0);
                pts[mcp + 2] = Landmark::new(x, knuckle_y - 0.05, 0.0);
                pts[mcp + 3] = Landmark::new(x, knuckle_y - 0.07, 0.0);
            } else {
                // Curled: middle joint rises a little, tip folds back below it
                pts[mcp + 1] = Landmark::new(x, knuckle_y - 0.02, 0.0);
                pts[mcp + 2] = Landmark::new(x, knuckle_y - 0.01, 0.0);
                pts[mcp + 3] = Landmark::new(x, knuckle_y + 0.01, 0.0);
            }
        }
        HandLandmarks::new(pts)
    }

    /// A pointing hand whose index fingertip sits at `(tip_x, tip_y)`.
    pub fn pointing_at(tip_x: f32, tip_y: f32) -> HandLandmarks {
        hand(tip_x + 0.02, tip_y + 0.15, [true, false, false, false])
    }

    pub fn open_palm(wx: f32, wy: f32) -> HandLandmarks {
        hand(wx, wy, [true, true, true, true])
    }

    pub fn fist(wx: f32, wy: f32) -> HandLandmarks {
        hand(wx, wy, [false, false, false, false])
    }

    /// Two open hands whose palm centres are `gap` apart horizontally.
    pub fn pair(cx: f32, cy: f32, gap: f32) -> HandLandmarkFrame {
        let half = gap / 2.0;
        // open_palm puts the palm centre (middle knuckle) straight above the wrist
        let left  = open_palm(cx - half, cy + 0.08);
        let right = open_palm(cx + half, cy + 0.08);
        HandLandmarkFrame::new(vec![left, right])
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use super::poses::*;

    fn cfg() -> GestureConfig { GestureConfig::default() }

    #[test]
    fn no_hands_yields_empty_facts() {
        let facts = classify(&HandLandmarkFrame::empty(), &cfg());
        assert_eq!(facts.hands_detected, 0);
        assert!(facts.pointing.is_none());
        assert!(facts.prayer.is_none());
        assert!(!facts.is_pointing());
    }

    #[test]
    fn pointing_hand_is_pointing() {
        let frame = HandLandmarkFrame::new(vec![pointing_at(0.4, 0.3)]);
        let facts = classify(&frame, &cfg());
        assert_eq!(facts.hands_detected, 1);
        let p = facts.pointing.unwrap();
        assert!(p.is_pointing);
        assert!((p.tip.x - 0.4).abs() < 1e-6);
        assert!((p.tip.y - 0.3).abs() < 1e-6);
        assert!(facts.prayer.is_none());
    }

    #[test]
    fn open_palm_and_fist_are_not_pointing() {
        assert!(!is_pointing(&open_palm(0.5, 0.5)));
        assert!(!is_pointing(&fist(0.5, 0.5)));
        // index + middle up (peace sign)
        assert!(!is_pointing(&hand(0.5, 0.5, [true, true, false, false])));
    }

    #[test]
    fn index_must_strictly_rise() {
        let mut h = pointing_at(0.5, 0.3);
        h.points[INDEX_PIP].y = h.points[INDEX_MCP].y;
        assert!(!is_pointing(&h));
    }

    #[test]
    fn only_first_hand_is_checked_for_pointing() {
        let frame = HandLandmarkFrame::new(vec![fist(0.2, 0.6), pointing_at(0.7, 0.3)]);
        let facts = classify(&frame, &cfg());
        assert!(!facts.is_pointing());
    }

    #[test]
    fn close_hands_pray() {
        let facts = classify(&pair(0.5, 0.5, 0.05), &cfg());
        let p = facts.prayer.unwrap();
        assert!(p.is_prayer_gesture);
        assert!((p.palm_distance - 0.05).abs() < 1e-5);
        assert!((p.index_distance - 0.05).abs() < 1e-5);
    }

    #[test]
    fn distant_hands_do_not_pray() {
        let facts = classify(&pair(0.5, 0.5, 0.6), &cfg());
        let p = facts.prayer.unwrap();
        assert!(!p.is_prayer_gesture);
        assert!(p.palm_distance > 0.5);
    }

    #[test]
    fn both_thresholds_must_hold() {
        let frame = pair(0.5, 0.5, 0.3);
        // palm 0.3 ≥ 0.25 fails even though index 0.3 < 0.35
        assert!(!classify(&frame, &cfg()).is_praying());
        let loose = GestureConfig { palm_threshold: 0.4, index_threshold: 0.35 };
        assert!(classify(&frame, &loose).is_praying());
        let tight_index = GestureConfig { palm_threshold: 0.4, index_threshold: 0.2 };
        assert!(!classify(&frame, &tight_index).is_praying());
    }

    #[test]
    fn depth_counts_toward_distance() {
        let mut frame = pair(0.5, 0.5, 0.0);
        for p in frame.hands[1].points.iter_mut() { p.z = 0.3; }
        let p = classify(&frame, &cfg()).prayer.unwrap();
        assert!((p.palm_distance - 0.3).abs() < 1e-5);
        assert!(!p.is_prayer_gesture);
    }

    #[test]
    fn malformed_frame_reads_as_no_hands() {
        let bad = HandLandmarkFrame::from_flat(&[0.5; 10], 1);
        let facts = classify_raw(bad, &cfg());
        assert_eq!(facts, GestureFacts::none());
    }

    #[test]
    fn negative_threshold_rejected() {
        let bad = GestureConfig { palm_threshold: -0.1, ..GestureConfig::default() };
        assert!(bad.validate().is_err());
        assert!(GestureConfig::default().validate().is_ok());
    }
}
