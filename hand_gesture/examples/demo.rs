//! Replays a synthetic session: a pointing hand traces a circle, then two
//! hands come together in prayer.

use floor_geometry::FloorMapping;
use hand_gesture::classifier::poses;
use hand_gesture::{
    ActivationConfig, ActivationEvent, ActivationMachine, GestureConfig,
    HandLandmarkFrame, StrokeConfig, StrokePoint, StrokeRecognizer, StrokeVerdict,
    classify,
};

const FRAME_MS: f64 = 33.0;

fn main() {
    println!("\n=== Hand Gesture Demo ===\n");

    let gesture_cfg = GestureConfig::default();
    let mapping = FloorMapping::new(1280.0, 720.0, 16.0, 9.0);

    // ── 1. Pointing stroke ───────────────────────────────────────────────
    println!("1. Tracing a circle with a pointing hand");
    let mut machine = ActivationMachine::labelled("connect", ActivationConfig::default());
    let mut stroke = StrokeRecognizer::new(StrokeConfig::default(), mapping);

    let mut frames: Vec<HandLandmarkFrame> = Vec::new();
    for i in 0..60 {
        let a = std::f64::consts::TAU * i as f64 / 50.0;
        let (x, y) = (0.5 + 0.12 * a.cos(), 0.5 + 0.2 * a.sin());
        frames.push(HandLandmarkFrame::new(vec![poses::pointing_at(x as f32, y as f32)]));
    }
    frames.push(HandLandmarkFrame::new(vec![poses::open_palm(0.5, 0.6)]));

    for (i, frame) in frames.iter().enumerate() {
        let now = i as f64 * FRAME_MS;
        let facts = classify(frame, &gesture_cfg);
        let event = machine.update(facts.is_pointing(), now);
        if machine.is_active() {
            if let Some(p) = facts.pointing {
                stroke.push(StrokePoint::new(p.tip.x as f64 * 1280.0, p.tip.y as f64 * 720.0, now));
            }
        }
        match event {
            Some(ActivationEvent::Activated) => println!("   [{:>5.0}ms] drawing", now),
            Some(ActivationEvent::Deactivated) => match stroke.finish() {
                Some(StrokeVerdict::Accepted(c)) => println!(
                    "   [{:>5.0}ms] circle at ({:.2}, {:.2}) r={:.2}",
                    now, c.center.x, c.center.z, c.radius),
                Some(StrokeVerdict::Rejected(why)) => println!("   [{:>5.0}ms] rejected: {:?}", now, why),
                None => {}
            },
            None => {}
        }
    }
    println!();

    // ── 2. Prayer ────────────────────────────────────────────────────────
    println!("2. Bringing two hands together");
    let mut prayer = ActivationMachine::labelled("prayer", ActivationConfig::default());
    for (i, gap) in [0.6, 0.45, 0.3, 0.2, 0.1, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.4]
        .iter().enumerate()
    {
        let now = i as f64 * 50.0;
        let facts = classify(&poses::pair(0.5, 0.5, *gap), &gesture_cfg);
        let Some(p) = facts.prayer else { continue };
        let event = prayer.update(p.is_prayer_gesture, now);
        println!("   [{:>4.0}ms] palm {:.2} index {:.2}  {:?}{}",
                 now, p.palm_distance, p.index_distance, prayer.phase(),
                 event.map(|e| format!("  ← {:?}", e)).unwrap_or_default());
    }
    println!();
}
