//! Prayer mode: bring both hands together to light the figure.

use log::info;

use hand_gesture::{ActivationConfig, ActivationEvent, ActivationMachine, GestureFacts};

use crate::render::{PrayerEffect, PrayerIntensity, RenderCommand};
use crate::session::SessionOutput;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrayerSummary {
    pub prayer_count: u32,
    /// True when the session was exited mid-prayer.
    pub interrupted:  bool,
}

pub struct PrayerSession {
    machine:      ActivationMachine,
    prayer_count: u32,
    intensity:    Option<PrayerIntensity>,
}

impl PrayerSession {
    pub fn new(activation: ActivationConfig) -> Self {
        PrayerSession {
            machine:      ActivationMachine::labelled("prayer", activation),
            prayer_count: 0,
            intensity:    None,
        }
    }

    pub fn prayer_count(&self) -> u32 { self.prayer_count }
    pub fn is_praying(&self) -> bool { self.machine.is_active() }
    pub fn machine(&self) -> &ActivationMachine { &self.machine }

    /// Latest distances while a prayer is active.
    pub fn intensity(&self) -> Option<PrayerIntensity> { self.intensity }

    pub fn on_frame(&mut self, facts: &GestureFacts, now_ms: f64) -> SessionOutput {
        let mut out = SessionOutput::default();
        let current = facts.prayer.as_ref().map(PrayerIntensity::from_facts);

        match self.machine.update(facts.is_praying(), now_ms) {
            Some(ActivationEvent::Activated) => {
                self.prayer_count += 1;
                info!("prayer #{} began", self.prayer_count);
                if let Some(i) = current {
                    out.push(RenderCommand::PrayerEffect(PrayerEffect::Begin(i)));
                }
                self.intensity = current;
                out.set_status(format!("Praying ({})", self.prayer_count));
            }
            Some(ActivationEvent::Deactivated) => {
                self.intensity = None;
                out.push(RenderCommand::PrayerEffect(PrayerEffect::End));
                out.set_status("Prayer released");
            }
            None if self.machine.is_active() => {
                if let Some(i) = current {
                    out.push(RenderCommand::PrayerEffect(PrayerEffect::Update(i)));
                    self.intensity = Some(i);
                }
            }
            None => {}
        }
        out
    }

    /// Stop the session, ending the effect if a prayer was active.
    pub fn exit(&mut self, now_ms: f64) -> (PrayerSummary, SessionOutput) {
        let mut out = SessionOutput::default();
        let interrupted = self.machine.force_idle(now_ms) == Some(ActivationEvent::Deactivated);
        if interrupted {
            self.intensity = None;
            out.push(RenderCommand::PrayerEffect(PrayerEffect::End));
        }
        out.set_status(format!("Prayer ended: {} prayers", self.prayer_count));
        (PrayerSummary { prayer_count: self.prayer_count, interrupted }, out)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
