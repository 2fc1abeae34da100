//! Landmark frame sources.
//!
//! Inference runs off the render thread.  A [`FrameSource`] pushes
//! [`SourceEvent`]s down an `mpsc` channel and the shell drains it once per
//! render tick, so the consumer never knows whether frames came from the
//! simulated hand, a recording, or a real tracker.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hand_gesture::classifier::poses;
use hand_gesture::{FrameError, HandLandmarkFrame};

// ════════════════════════════════════════════════════════════════════════════
// Events
// ════════════════════════════════════════════════════════════════════════════

/// One inference result with its capture time.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedFrame {
    pub t_ms:  f64,
    pub frame: Result<HandLandmarkFrame, FrameError>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SourceEvent {
    Frame(TimedFrame),
    /// Hand tracking could not start or has stopped for good.
    Unavailable(String),
    /// A finite source ran out of frames.
    Finished,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot open recording {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait
// ════════════════════════════════════════════════════════════════════════════

pub trait FrameSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>);
}

/// Spawn a frame source on its own thread and return the receiving end.
pub fn spawn_frame_source<S: FrameSource>(source: S) -> Receiver<SourceEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// SimFrameSource — synthetic hands from window input
// ════════════════════════════════════════════════════════════════════════════

/// One sample of window input, in normalised screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimInput {
    pub t_ms:     f64,
    pub pointer:  (f32, f32),
    /// `P` held.
    pub pointing: bool,
    /// `Space` held.
    pub praying:  bool,
    /// Mouse is outside the window.
    pub away:     bool,
}

/// Turns [`SimInput`] samples from the visualizer into landmark frames.
pub struct SimFrameSource {
    pub rx:       Receiver<SimInput>,
    /// Must match the screen setting so the cursor lands under the mouse.
    pub mirror_x: bool,
}

/// Gap between the simulated praying hands, well inside the default
/// thresholds.
const SIM_PRAYER_GAP: f32 = 0.04;

impl SimFrameSource {
    pub fn synthesize(input: &SimInput, mirror_x: bool) -> HandLandmarkFrame {
        if input.away {
            return HandLandmarkFrame::empty();
        }
        let (sx, sy) = input.pointer;
        // landmarks are in camera space; undo the screen mirror
        let x = if mirror_x { 1.0 - sx } else { sx };
        if input.praying {
            poses::pair(x, sy, SIM_PRAYER_GAP)
        } else if input.pointing {
            HandLandmarkFrame::new(vec![poses::pointing_at(x, sy)])
        } else {
            HandLandmarkFrame::new(vec![poses::open_palm(x, sy + 0.15)])
        }
    }
}

impl FrameSource for SimFrameSource {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        for input in self.rx {
            let frame = SimFrameSource::synthesize(&input, self.mirror_x);
            let event = SourceEvent::Frame(TimedFrame { t_ms: input.t_ms, frame: Ok(frame) });
            if tx.send(event).is_err() { return; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ReplayFrameSource — JSON lines recorded from a tracker
// ════════════════════════════════════════════════════════════════════════════

/// `{ "t": 1234.5, "hands": [[[x, y, z], ... 21], ...] }`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayLine {
    pub t:     f64,
    #[serde(default)]
    pub hands: Vec<Vec<Vec<f32>>>,
}

pub fn parse_replay_line(line: &str) -> Result<TimedFrame, serde_json::Error> {
    let rec: ReplayLine = serde_json::from_str(line)?;
    Ok(TimedFrame { t_ms: rec.t, frame: HandLandmarkFrame::from_nested(&rec.hands) })
}

/// Read every frame of a recording.  Lines that are not valid JSON are
/// skipped with a warning; frames with bad landmark data are kept as errors
/// for the classifier to drop.
pub fn read_replay(reader: impl BufRead) -> Vec<TimedFrame> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("replay: read error at line {}: {}", i + 1, e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_replay_line(&line) {
            Ok(frame) => frames.push(frame),
            Err(e) => warn!("{}", SourceError::Line { line: i + 1, source: e }),
        }
    }
    frames
}

pub struct ReplayFrameSource {
    path:     PathBuf,
    /// Sleep between frames to match the recorded timing.
    realtime: bool,
}

impl ReplayFrameSource {
    pub fn new(path: impl Into<PathBuf>, realtime: bool) -> Self {
        ReplayFrameSource { path: path.into(), realtime }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn load(&self) -> Result<Vec<TimedFrame>, SourceError> {
        let file = File::open(&self.path)
            .map_err(|source| SourceError::Open { path: self.path.clone(), source })?;
        Ok(read_replay(BufReader::new(file)))
    }
}

impl FrameSource for ReplayFrameSource {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        let frames = match self.load() {
            Ok(f) => f,
            Err(e) => {
                warn!("replay unavailable: {}", e);
                let _ = tx.send(SourceEvent::Unavailable(e.to_string()));
                return;
            }
        };
        info!("replaying {} frames from {}", frames.len(), self.path.display());

        let mut prev_t: Option<f64> = None;
        for frame in frames {
            if self.realtime {
                if let Some(p) = prev_t {
                    let gap = (frame.t_ms - p).clamp(0.0, 1000.0);
                    thread::sleep(Duration::from_secs_f64(gap / 1000.0));
                }
                prev_t = Some(frame.t_ms);
            }
            if tx.send(SourceEvent::Frame(frame)).is_err() { return; }
        }
        let _ = tx.send(SourceEvent::Finished);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
