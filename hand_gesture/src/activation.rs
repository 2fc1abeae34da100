//! Debounced activation state machine.
//!
//! Turns a per-frame boolean ("is the gesture present?") into discrete
//! activation / deactivation events:
//!
//! ```text
//!            gesture                held ≥ activation_time
//!   Idle ────────────▶ Holding ───────────────────────────▶ Active
//!     ▲                   │        and cooldown elapsed        │
//!     │   no gesture      │                                    │
//!     ├───────────────────┘                                    │
//!     │                  no gesture (instant, emits Deactivated)
//!     └────────────────────────────────────────────────────────┘
//! ```
//!
//! The hold gate and the cooldown gate are independent: a gesture held past
//! `activation_time_ms` while the cooldown is still running stays in
//! `Holding` and activates on the first frame the cooldown clears, without
//! restarting the hold timer.
//!
//! Each true frame counts for the interval since the frame before it, so
//! `N` held frames at interval `dt` have held for `N × dt`.  The hold
//! therefore starts at the previous frame's timestamp; on the very first
//! frame a machine sees, or after a gap longer than [`MAX_FRAME_GAP_MS`],
//! it starts at the current frame.
//!
//! Timestamps are caller-supplied milliseconds, so the machine never reads a
//! clock and owns no timers.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest frame interval credited to a hold; a stalled stream is not a hold.
pub const MAX_FRAME_GAP_MS: f64 = 100.0;

// ════════════════════════════════════════════════════════════════════════════
// ActivationConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// How long the gesture must be held before activation.
    pub activation_time_ms: f64,
    /// Minimum quiet time after a deactivation before the next activation.
    pub cooldown_time_ms:   f64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        ActivationConfig {
            activation_time_ms: 300.0,
            cooldown_time_ms:   500.0,
        }
    }
}

impl ActivationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_non_negative("activation_time_ms", self.activation_time_ms)?;
        ConfigError::check_non_negative("cooldown_time_ms", self.cooldown_time_ms)?;
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Phase / events
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Holding,
    Active,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationEvent {
    /// Holding → Active.
    Activated,
    /// Active → Idle.
    Deactivated,
}

// ════════════════════════════════════════════════════════════════════════════
// ActivationMachine
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct ActivationMachine {
    config:               ActivationConfig,
    phase:                Phase,
    hold_start_ms:        Option<f64>,
    last_frame_ms:        Option<f64>,
    /// `None` until the first deactivation; the cooldown never blocks before.
    last_deactivation_ms: Option<f64>,
    label:                &'static str,
}

impl ActivationMachine {
    pub fn new(config: ActivationConfig) -> Self {
        ActivationMachine::labelled("gesture", config)
    }

    /// A machine whose debug logs are tagged with `label` (e.g. the mode name).
    pub fn labelled(label: &'static str, config: ActivationConfig) -> Self {
        ActivationMachine {
            config,
            phase:                Phase::Idle,
            hold_start_ms:        None,
            last_frame_ms:        None,
            last_deactivation_ms: None,
            label,
        }
    }

    pub fn phase(&self)         -> Phase             { self.phase }
    pub fn is_active(&self)     -> bool              { self.phase == Phase::Active }
    pub fn config(&self)        -> &ActivationConfig { &self.config }
    pub fn hold_start_ms(&self) -> Option<f64>       { self.hold_start_ms }
    pub fn last_deactivation_ms(&self) -> Option<f64> { self.last_deactivation_ms }

    /// Feed one frame's gesture fact observed at `now_ms`.
    pub fn update(&mut self, gesture: bool, now_ms: f64) -> Option<ActivationEvent> {
        let prev_frame = self.last_frame_ms.replace(now_ms);
        if !gesture {
            return self.release(now_ms);
        }

        if self.phase == Phase::Idle {
            let start = prev_frame
                .filter(|&prev| prev <= now_ms && now_ms - prev <= MAX_FRAME_GAP_MS)
                .unwrap_or(now_ms);
            self.phase = Phase::Holding;
            self.hold_start_ms = Some(start);
            debug!("{}: holding at {:.0}ms", self.label, now_ms);
        }

        if self.phase == Phase::Holding && self.hold_elapsed(now_ms) && self.cooldown_elapsed(now_ms) {
            self.phase = Phase::Active;
            debug!("{}: activated at {:.0}ms", self.label, now_ms);
            return Some(ActivationEvent::Activated);
        }
        None
    }

    /// Drop to Idle immediately, emitting `Deactivated` if the machine was
    /// Active.  Used when a mode is exited mid-gesture.
    pub fn force_idle(&mut self, now_ms: f64) -> Option<ActivationEvent> {
        self.release(now_ms)
    }

    /// Back to a freshly constructed state, forgetting the cooldown too.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.hold_start_ms = None;
        self.last_frame_ms = None;
        self.last_deactivation_ms = None;
    }

    fn release(&mut self, now_ms: f64) -> Option<ActivationEvent> {
        let was = self.phase;
        self.phase = Phase::Idle;
        self.hold_start_ms = None;
        match was {
            Phase::Active => {
                self.last_deactivation_ms = Some(now_ms);
                debug!("{}: deactivated at {:.0}ms", self.label, now_ms);
                Some(ActivationEvent::Deactivated)
            }
            _ => None,
        }
    }

    fn hold_elapsed(&self, now_ms: f64) -> bool {
        self.hold_start_ms
            .map_or(false, |start| now_ms - start >= self.config.activation_time_ms)
    }

    fn cooldown_elapsed(&self, now_ms: f64) -> bool {
        self.last_deactivation_ms
            .map_or(true, |last| now_ms - last >= self.config.cooldown_time_ms)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
