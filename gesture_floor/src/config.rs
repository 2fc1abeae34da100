//! Application configuration.
//!
//! Loaded from an optional JSON file; every field has a default so a partial
//! file (or none at all) is fine.  [`AppConfig::validate`] rejects values that
//! would make the gesture pipeline meaningless and is run once at startup.
//!
//! ```json
//! {
//!   "user_id": "alice",
//!   "screen":  { "width": 1280, "height": 720, "mirror_x": true },
//!   "connect": { "activation_time_ms": 300, "cooldown_time_ms": 500 },
//!   "stroke":  { "min_circle_points": 12 }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use circle_ledger::RadiusBounds;
use floor_geometry::{FloorMapping, ScreenPoint, DEFAULT_FLOOR_DEPTH, DEFAULT_FLOOR_WIDTH};
use hand_gesture::{ActivationConfig, GestureConfig, Landmark, StrokeConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {section} settings: {source}")]
    Gesture {
        section: &'static str,
        #[source]
        source: hand_gesture::ConfigError,
    },

    #[error("'{field}' {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ════════════════════════════════════════════════════════════════════════════
// Sections
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width:    u32,
    pub height:   u32,
    /// Selfie-view cameras see the user mirrored; flip x so the cursor
    /// follows the hand.
    pub mirror_x: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        ScreenConfig { width: 1280, height: 720, mirror_x: true }
    }
}

impl ScreenConfig {
    /// Screen position of a normalised camera-space landmark.
    pub fn landmark_to_screen(&self, lm: &Landmark) -> ScreenPoint {
        let nx = if self.mirror_x { 1.0 - lm.x } else { lm.x };
        ScreenPoint::new(nx as f64 * self.width as f64, lm.y as f64 * self.height as f64)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorConfig {
    pub width: f64,
    pub depth: f64,
}

impl Default for FloorConfig {
    fn default() -> Self {
        FloorConfig { width: DEFAULT_FLOOR_WIDTH, depth: DEFAULT_FLOOR_DEPTH }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    /// Radians per second while a prayer is active.
    pub rotation_speed: f64,
}

impl Default for FigureConfig {
    fn default() -> Self { FigureConfig { rotation_speed: 0.8 } }
}

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Owner id stamped on every circle this instance draws.
    pub user_id:              String,
    /// Circle data file; `None` keeps circles in memory only.
    pub data_path:            Option<PathBuf>,
    pub autosave_interval_ms: f64,
    pub screen:               ScreenConfig,
    pub floor:                FloorConfig,
    pub gesture:              GestureConfig,
    pub connect:              ActivationConfig,
    pub prayer:               ActivationConfig,
    pub stroke:               StrokeConfig,
    pub figure:               FigureConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            user_id:              "local_user".into(),
            data_path:            Some(PathBuf::from("gesture_floor_circles.json")),
            autosave_interval_ms: 2000.0,
            screen:               ScreenConfig::default(),
            floor:                FloorConfig::default(),
            gesture:              GestureConfig::default(),
            connect:              ActivationConfig::default(),
            prayer:               ActivationConfig { activation_time_ms: 500.0, cooldown_time_ms: 1000.0 },
            stroke:               StrokeConfig::default(),
            figure:               FigureConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read `path` if it exists, otherwise start from defaults.
    pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(AppConfig::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let cfg: AppConfig = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })?;
        info!("loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(invalid("user_id", "must not be empty"));
        }
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(invalid("screen", "width and height must be non-zero"));
        }
        for (field, v) in [("floor.width", self.floor.width), ("floor.depth", self.floor.depth)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(invalid(field, format!("must be positive, got {}", v)));
            }
        }
        if !(self.autosave_interval_ms.is_finite() && self.autosave_interval_ms >= 0.0) {
            return Err(invalid("autosave_interval_ms",
                               format!("must be non-negative, got {}", self.autosave_interval_ms)));
        }
        if !self.figure.rotation_speed.is_finite() {
            return Err(invalid("figure.rotation_speed", "must be finite"));
        }

        self.gesture.validate().map_err(section("gesture"))?;
        self.connect.validate().map_err(section("connect"))?;
        self.prayer.validate().map_err(section("prayer"))?;
        self.stroke.validate().map_err(section("stroke"))?;
        Ok(())
    }

    pub fn mapping(&self) -> FloorMapping {
        FloorMapping::new(
            self.screen.width as f64,
            self.screen.height as f64,
            self.floor.width,
            self.floor.depth,
        )
    }

    pub fn radius_bounds(&self) -> RadiusBounds {
        RadiusBounds::new(self.stroke.min_radius, self.stroke.max_radius)
    }
}

fn section(section: &'static str) -> impl FnOnce(hand_gesture::ConfigError) -> ConfigError {
    move |source| ConfigError::Gesture { section, source }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.into() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
