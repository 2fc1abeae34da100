//! # gesture_floor
//!
//! Shared drawing floor driven by hand gestures.  Users trace circles with a
//! pointing finger; where circles from different users cross, the floor
//! sparkles.  A second mode lights and spins a central figure while both
//! hands are held together in prayer.
//!
//! ## Modes
//!
//! | Mode | Gesture | Action |
//! |---|---|---|
//! | Connect | Point, hold, trace a loop, release | Add a circle; spawn effects at crossings with other users' circles |
//! | Prayer | Both palms and index tips together, hold | Glow and rotate the figure until the hands part |
//! | Idle | — | Gestures are classified but ignored |
//!
//! ## Simulation controls
//!
//! Without a recording, the window drives a simulated hand.
//!
//! | Key | Effect |
//! |---|---|
//! | mouse | Hand position |
//! | `P` held | Pointing pose |
//! | `Space` held | Prayer pose (both hands) |
//! | `1` / `2` / `0` | Connect / Prayer / Idle |
//! | `C` | Clear your circles |
//! | `Q` | Quit (saves first) |
//!
//! ## Crates
//!
//! * `floor_geometry` — screen ↔ floor mapping and circle intersection.
//! * `hand_gesture` — landmark classification, hold/cooldown machine, stroke fit.
//! * `circle_ledger` — the shared dataset and its JSON store.

pub mod app;
pub mod config;
pub mod connect;
pub mod floor_view;
pub mod prayer;
pub mod render;
pub mod session;
pub mod source;
pub mod visualizer;
