//! Connect mode: draw circles on the floor by pointing.
//!
//! Sustained pointing activates the mode's machine; while Active every
//! fingertip sample extends the stroke.  When pointing stops the stroke is
//! classified.  An accepted circle goes into the ledger and every crossing
//! with another user's circle spawns an effect at both points.

use log::{debug, info, warn};

use circle_ledger::CircleLedger;
use floor_geometry::FloorMapping;
use hand_gesture::{
    ActivationConfig, ActivationEvent, ActivationMachine, GestureFacts, RejectReason,
    StrokeConfig, StrokePoint, StrokeRecognizer, StrokeVerdict,
};

use crate::config::ScreenConfig;
use crate::render::{EffectKind, RenderCommand};
use crate::session::SessionOutput;

/// Counts reported when the session ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectSummary {
    pub circles_added:     usize,
    pub strokes_rejected:  usize,
    pub intersections:     usize,
    /// Strokes thrown away because the mode was exited mid-stroke.
    pub strokes_discarded: usize,
}

pub struct ConnectSession {
    owner_id:   String,
    screen:     ScreenConfig,
    machine:    ActivationMachine,
    recognizer: StrokeRecognizer,
    summary:    ConnectSummary,
}

impl ConnectSession {
    pub fn new(
        owner_id: &str,
        screen: ScreenConfig,
        mapping: FloorMapping,
        activation: ActivationConfig,
        stroke: StrokeConfig,
    ) -> Self {
        ConnectSession {
            owner_id:   owner_id.to_string(),
            screen,
            machine:    ActivationMachine::labelled("connect", activation),
            recognizer: StrokeRecognizer::new(stroke, mapping),
            summary:    ConnectSummary::default(),
        }
    }

    pub fn summary(&self)     -> ConnectSummary      { self.summary }
    pub fn is_drawing(&self)  -> bool                { self.recognizer.is_drawing() }
    pub fn stroke(&self)      -> &[StrokePoint]      { self.recognizer.path() }
    pub fn machine(&self)     -> &ActivationMachine  { &self.machine }

    pub fn on_frame(&mut self, facts: &GestureFacts, now_ms: f64, ledger: &mut CircleLedger) -> SessionOutput {
        let mut out = SessionOutput::default();

        let tip = facts.pointing.map(|p| self.screen.landmark_to_screen(&p.tip));
        out.push(match tip {
            Some(p) => RenderCommand::SetCursor { x: p.x, y: p.y, visible: true },
            None    => RenderCommand::SetCursor { x: 0.0, y: 0.0, visible: false },
        });

        match self.machine.update(facts.is_pointing(), now_ms) {
            Some(ActivationEvent::Activated) => out.set_status("Drawing…"),
            Some(ActivationEvent::Deactivated) => {
                if let Some(verdict) = self.recognizer.finish() {
                    self.resolve(verdict, ledger, &mut out);
                }
            }
            None => {}
        }

        if self.machine.is_active() {
            if let Some(p) = tip {
                self.recognizer.push(StrokePoint::new(p.x, p.y, now_ms));
            }
        }
        out
    }

    /// Stop the session.  Any stroke in progress is discarded unclassified.
    pub fn exit(&mut self, now_ms: f64) -> (ConnectSummary, SessionOutput) {
        self.machine.force_idle(now_ms);
        let dropped = self.recognizer.discard();
        if dropped > 0 {
            debug!("connect: discarded {}-point stroke on exit", dropped);
            self.summary.strokes_discarded += 1;
        }
        let mut out = SessionOutput::default();
        out.push(RenderCommand::SetCursor { x: 0.0, y: 0.0, visible: false });
        out.set_status(format!(
            "Connect ended: {} circles, {} crossings, {} rejected",
            self.summary.circles_added, self.summary.intersections, self.summary.strokes_rejected
        ));
        (self.summary, out)
    }

    fn resolve(&mut self, verdict: StrokeVerdict, ledger: &mut CircleLedger, out: &mut SessionOutput) {
        let shape = match verdict {
            StrokeVerdict::Accepted(shape) => shape,
            StrokeVerdict::Rejected(RejectReason::TooFewPoints { count }) => {
                // taps and flicks are ignored without feedback
                debug!("connect: ignored {}-point stroke", count);
                return;
            }
            StrokeVerdict::Rejected(reason) => {
                self.summary.strokes_rejected += 1;
                debug!("connect: stroke rejected: {:?}", reason);
                out.set_status(reject_message(&reason));
                return;
            }
        };

        let circle = match ledger.add_circle(shape, &self.owner_id) {
            Ok(c) => c,
            Err(e) => {
                warn!("connect: could not store circle: {}", e);
                out.set_status(format!("Circle not saved: {}", e));
                return;
            }
        };
        self.summary.circles_added += 1;
        out.push(RenderCommand::DrawCircle {
            owner_id: circle.owner_id.clone(),
            x:        circle.x,
            z:        circle.z,
            radius:   circle.radius,
        });

        let hits = ledger.find_intersections(&circle);
        for hit in &hits {
            for p in &hit.points {
                out.push(RenderCommand::SpawnEffect { x: p.x, z: p.z, kind: EffectKind::Intersection });
            }
        }
        self.summary.intersections += hits.len();

        if hits.is_empty() {
            out.set_status(format!("Circle drawn (r={:.1})", circle.radius));
        } else {
            info!("connect: {} crosses {} circles", circle.id, hits.len());
            out.set_status(format!("Circle drawn, connected with {} others", hits.len()));
        }
    }
}

fn reject_message(reason: &RejectReason) -> String {
    match reason {
        RejectReason::TooFewPoints { count }  => format!("Stroke too short ({} points)", count),
        RejectReason::DegenerateBounds         => "Stroke was a line, try a circle".into(),
        RejectReason::Elongated { aspect }     => format!("Too oval (aspect {:.2})", aspect),
        RejectReason::NotCircular { score }    => format!("Not round enough ({:.2})", score),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use floor_geometry::CircleShape;
    use hand_gesture::classifier::poses;
    use hand_gesture::{classify, GestureConfig, HandLandmarkFrame};
    use std::f32::consts::TAU;

    const FRAME_MS: f64 = 33.0;

    fn screen() -> ScreenConfig { ScreenConfig { width: 1280, height: 720, mirror_x: false } }

    fn session() -> ConnectSession {
        ConnectSession::new(
            "bob",
            screen(),
            FloorMapping::new(1280.0, 720.0, 16.0, 9.0),
            ActivationConfig::default(),
            StrokeConfig::default(),
        )
    }

    fn pointing(x: f32, y: f32) -> GestureFacts {
        classify(&HandLandmarkFrame::new(vec![poses::pointing_at(x, y)]), &GestureConfig::default())
    }

    fn idle_hand() -> GestureFacts {
        classify(&HandLandmarkFrame::new(vec![poses::open_palm(0.5, 0.8)]), &GestureConfig::default())
    }

    /// Fingertip positions around a circle in normalised camera space.
    /// 0.1875 × 1280 = 240 px horizontally, 0.3333 × 720 = 240 px vertically.
    fn ring(cx: f32, cy: f32, n: usize) -> Vec<(f32, f32)> {
        (0..n).map(|i| {
            let a = TAU * i as f32 / n as f32;
            (cx + 0.1875 * a.cos(), cy + (1.0 / 3.0) * a.sin())
        }).collect()
    }

    /// Hold still to activate, trace `path`, then release.  Returns the
    /// outputs of every frame.
    fn draw(s: &mut ConnectSession, ledger: &mut CircleLedger, path: &[(f32, f32)], t0: f64) -> Vec<SessionOutput> {
        let mut outs = Vec::new();
        let mut t = t0;
        let (sx, sy) = path[0];
        for _ in 0..10 {
            outs.push(s.on_frame(&pointing(sx, sy), t, ledger));
            t += FRAME_MS;
        }
        for &(x, y) in path {
            outs.push(s.on_frame(&pointing(x, y), t, ledger));
            t += FRAME_MS;
        }
        outs.push(s.on_frame(&idle_hand(), t, ledger));
        outs
    }

    #[test]
    fn traced_circle_lands_in_ledger() {
        let mut ledger = CircleLedger::default();
        let mut s = session();
        let outs = draw(&mut s, &mut ledger, &ring(0.5, 0.5, 36), 0.0);

        assert_eq!(ledger.circles_of("bob").len(), 1);
        let c = &ledger.circles_of("bob")[0];
        // 240 px × 0.0125 = 3.0, the upper clamp
        assert!((c.radius - 3.0).abs() < 1e-4);
        assert!(c.x.abs() < 0.3 && c.z.abs() < 0.3);

        let last = outs.last().unwrap();
        assert!(last.commands.iter().any(|c| matches!(c, RenderCommand::DrawCircle { .. })));
        assert_eq!(s.summary().circles_added, 1);
        assert!(!s.is_drawing());
    }

    #[test]
    fn crossing_other_user_spawns_two_effects() {
        let mut ledger = CircleLedger::default();
        ledger.add_circle(CircleShape::at(4.0, 0.0, 2.0), "alice").unwrap();
        ledger.add_circle(CircleShape::at(0.0, 0.0, 0.5), "bob").unwrap(); // own circles never count

        let mut s = session();
        let outs = draw(&mut s, &mut ledger, &ring(0.5, 0.5, 36), 0.0);
        let effects = outs.last().unwrap().commands.iter()
            .filter(|c| matches!(c, RenderCommand::SpawnEffect { .. }))
            .count();
        assert_eq!(effects, 2);
        assert_eq!(s.summary().intersections, 1);
    }

    #[test]
    fn short_flick_is_silently_ignored() {
        let mut ledger = CircleLedger::default();
        let mut s = session();
        let flick: Vec<(f32, f32)> = (0..3).map(|i| (0.4 + i as f32 * 0.01, 0.5)).collect();
        let outs = draw(&mut s, &mut ledger, &flick, 0.0);
        assert_eq!(ledger.circle_count(), 0);
        assert_eq!(s.summary().strokes_rejected, 0);
        assert!(outs.last().unwrap().status.is_none());
    }

    #[test]
    fn cursor_follows_tip_and_hides_without_hands() {
        let mut ledger = CircleLedger::default();
        let mut s = session();
        let out = s.on_frame(&pointing(0.25, 0.5), 0.0, &mut ledger);
        match out.commands[0] {
            RenderCommand::SetCursor { x, y, visible } => {
                assert!(visible);
                assert!((x - 320.0).abs() < 1e-3);
                assert!((y - 360.0).abs() < 1e-3);
            }
            ref other => panic!("expected cursor, got {:?}", other),
        }
        let out = s.on_frame(&GestureFacts::none(), 33.0, &mut ledger);
        assert_eq!(out.commands[0], RenderCommand::SetCursor { x: 0.0, y: 0.0, visible: false });
    }

    #[test]
    fn exit_mid_stroke_discards_without_classifying() {
        let mut ledger = CircleLedger::default();
        let mut s = session();
        let mut t = 0.0;
        for (x, y) in ring(0.5, 0.5, 36).into_iter().take(30) {
            s.on_frame(&pointing(x, y), t, &mut ledger);
            t += FRAME_MS;
        }
        assert!(s.is_drawing());
        let (summary, out) = s.exit(t);
        assert_eq!(summary.strokes_discarded, 1);
        assert_eq!(summary.circles_added, 0);
        assert_eq!(ledger.circle_count(), 0);
        assert!(!s.machine().is_active());
        assert!(out.commands.contains(&RenderCommand::SetCursor { x: 0.0, y: 0.0, visible: false }));
    }
}
