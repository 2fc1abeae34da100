//! Hand landmark frames as delivered by the inference boundary.
//!
//! Each detected hand carries 21 keypoints in normalised camera space
//! (`x`, `y` in `[0,1]`, `y` growing downward, `z` depth relative to the
//! wrist).  A frame holds zero, one or two hands.

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

// ════════════════════════════════════════════════════════════════════════════
// Landmark indices
// ════════════════════════════════════════════════════════════════════════════

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Keypoints per hand.
pub const LANDMARK_COUNT: usize = 21;
/// The inference boundary reports at most this many hands.
pub const MAX_HANDS: usize = 2;
/// Landmark used as the approximate palm centre.
pub const PALM_CENTER: usize = MIDDLE_MCP;

// ════════════════════════════════════════════════════════════════════════════
// Data structures
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self { Landmark { x, y, z } }

    /// Build from a coordinate slice of arity 2 (`z` = 0) or 3.
    pub fn from_slice(coords: &[f32]) -> Option<Landmark> {
        match *coords {
            [x, y]    => Some(Landmark { x, y, z: 0.0 }),
            [x, y, z] => Some(Landmark { x, y, z }),
            _         => None,
        }
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// The 21 keypoints of one hand.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    pub points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self { HandLandmarks { points } }

    /// Validate a variable-length point list.
    pub fn from_points(hand: usize, points: &[Landmark]) -> Result<Self, FrameError> {
        if points.len() != LANDMARK_COUNT {
            return Err(FrameError::PointCount { hand, expected: LANDMARK_COUNT, actual: points.len() });
        }
        let mut out = [Landmark::default(); LANDMARK_COUNT];
        for (i, p) in points.iter().enumerate() {
            if !p.is_finite() {
                return Err(FrameError::NonFinite { hand, landmark: i });
            }
            out[i] = *p;
        }
        Ok(HandLandmarks { points: out })
    }

    pub fn get(&self, index: usize) -> &Landmark { &self.points[index] }

    pub fn index_tip(&self) -> &Landmark { &self.points[INDEX_TIP] }

    pub fn palm_center(&self) -> &Landmark { &self.points[PALM_CENTER] }
}

/// All hands seen in one inference tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandLandmarkFrame {
    pub hands: Vec<HandLandmarks>,
}

impl HandLandmarkFrame {
    pub fn empty() -> Self { HandLandmarkFrame { hands: Vec::new() } }

    pub fn new(hands: Vec<HandLandmarks>) -> Self {
        let mut hands = hands;
        hands.truncate(MAX_HANDS);
        HandLandmarkFrame { hands }
    }

    pub fn hand_count(&self) -> usize { self.hands.len() }

    pub fn first(&self) -> Option<&HandLandmarks> { self.hands.first() }

    /// Parse the flat `[x, y, z] × 21 × num_hands` array handed over by the
    /// browser bridge.  Hands beyond [`MAX_HANDS`] are ignored.
    pub fn from_flat(data: &[f32], num_hands: usize) -> Result<Self, FrameError> {
        let stride = LANDMARK_COUNT * 3;
        let expected = num_hands * stride;
        if data.len() != expected {
            return Err(FrameError::FlatLength { expected, actual: data.len() });
        }
        let hands = data.chunks_exact(stride)
            .take(MAX_HANDS)
            .enumerate()
            .map(|(h, chunk)| {
                let points: Vec<Landmark> = chunk.chunks_exact(3)
                    .map(|c| Landmark::new(c[0], c[1], c[2]))
                    .collect();
                HandLandmarks::from_points(h, &points)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HandLandmarkFrame { hands })
    }

    /// Parse nested per-point coordinate arrays.  Each point may carry two
    /// or three coordinates; a missing `z` reads as 0.
    pub fn from_nested(hands: &[Vec<Vec<f32>>]) -> Result<Self, FrameError> {
        let parsed = hands.iter()
            .take(MAX_HANDS)
            .enumerate()
            .map(|(h, raw)| {
                let points = raw.iter()
                    .enumerate()
                    .map(|(i, coords)| Landmark::from_slice(coords)
                        .ok_or(FrameError::Arity { hand: h, landmark: i, arity: coords.len() }))
                    .collect::<Result<Vec<_>, _>>()?;
                HandLandmarks::from_points(h, &points)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HandLandmarkFrame { hands: parsed })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
