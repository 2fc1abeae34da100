//! # hand_gesture
//!
//! Turns noisy per-frame hand landmarks into discrete intent:
//!
//! | Stage | Module | Input → Output |
//! |---|---|---|
//! | Intake | [`landmarks`] | raw arrays → [`HandLandmarkFrame`] (or [`FrameError`]) |
//! | Classify | [`classifier`] | frame → [`GestureFacts`] (pointing, prayer, distances) |
//! | Debounce | [`activation`] | per-frame bool → [`ActivationEvent`]s with hold time and cooldown |
//! | Strokes | [`stroke`] | pointer path → circle [`StrokeVerdict`] |
//!
//! Everything here is synchronous and clock-free: callers pass the frame
//! timestamp in milliseconds, so a whole session can be replayed in a test.
//!
//! ```rust
//! use hand_gesture::{ActivationConfig, ActivationEvent, ActivationMachine, GestureConfig, classify};
//! use hand_gesture::classifier::poses;
//! use hand_gesture::HandLandmarkFrame;
//!
//! let frame = HandLandmarkFrame::new(vec![poses::pointing_at(0.5, 0.4)]);
//! let facts = classify(&frame, &GestureConfig::default());
//! assert!(facts.is_pointing());
//!
//! let mut machine = ActivationMachine::new(ActivationConfig::default());
//! assert_eq!(machine.update(facts.is_pointing(), 0.0), None);
//! assert_eq!(machine.update(facts.is_pointing(), 300.0), Some(ActivationEvent::Activated));
//! ```

pub mod activation;
pub mod classifier;
pub mod error;
pub mod landmarks;
pub mod stroke;

pub use activation::{ActivationConfig, ActivationEvent, ActivationMachine, Phase, MAX_FRAME_GAP_MS};
pub use classifier::{
    GestureConfig, GestureFacts, PointingFacts, PrayerFacts,
    classify, classify_raw, is_pointing,
};
pub use error::{ConfigError, FrameError};
pub use landmarks::{HandLandmarkFrame, HandLandmarks, Landmark, LANDMARK_COUNT, MAX_HANDS};
pub use stroke::{
    RejectReason, StrokeConfig, StrokePoint, StrokeRecognizer, StrokeVerdict,
    detect_circle,
};
