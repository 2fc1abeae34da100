//! Ledger and persistence errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("circle for '{owner_id}' has non-finite geometry (x={x}, z={z}, r={radius})")]
    NonFinite { owner_id: String, x: f64, z: f64, radius: f64 },

    #[error("owner id must not be empty")]
    EmptyOwner,

    #[error("failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("circle data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no circle data in {0}")]
    NothingStored(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// True when the store simply holds nothing yet: a missing file or an
    /// in-memory store that was never saved to.
    pub fn is_not_found(&self) -> bool {
        match self {
            LedgerError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            LedgerError::NothingStored(_)  => true,
            _ => false,
        }
    }
}
