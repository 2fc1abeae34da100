//! Error types for frame intake and configuration.

use thiserror::Error;

/// A landmark frame that does not match the 21-point contract.
///
/// The classifier treats any of these as "no hands detected".
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameError {
    #[error("flat landmark array has {actual} values, expected {expected}")]
    FlatLength { expected: usize, actual: usize },

    #[error("hand {hand} has {actual} landmarks, expected {expected}")]
    PointCount { hand: usize, expected: usize, actual: usize },

    #[error("hand {hand} landmark {landmark} has {arity} coordinates, expected 2 or 3")]
    Arity { hand: usize, landmark: usize, arity: usize },

    #[error("hand {hand} landmark {landmark} is not finite")]
    NonFinite { hand: usize, landmark: usize },
}

/// Malformed gesture, activation or stroke configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("'{field}' must be a finite non-negative number, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("'{field}' must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("'{low_field}' ({low}) must not exceed '{high_field}' ({high})")]
    InvertedRange { low_field: &'static str, low: f64, high_field: &'static str, high: f64 },
}

impl ConfigError {
    pub(crate) fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
        if value.is_finite() && value >= 0.0 { Ok(()) } else { Err(ConfigError::Negative { field, value }) }
    }

    pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
        if value.is_finite() && value > 0.0 { Ok(()) } else { Err(ConfigError::NotPositive { field, value }) }
    }

    pub(crate) fn check_range(
        low_field: &'static str, low: f64,
        high_field: &'static str, high: f64,
    ) -> Result<(), ConfigError> {
        if low <= high { Ok(()) } else { Err(ConfigError::InvertedRange { low_field, low, high_field, high }) }
    }
}
