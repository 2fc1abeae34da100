//! Persistence of the circle ledger.
//!
//! | Piece | Role |
//! |---|---|
//! | [`CircleStore`] | load / save a batch of [`CircleRecord`]s |
//! | [`JsonFileStore`] | JSON array on disk |
//! | [`MemoryStore`] | in-process store for tests and `--data` less runs |
//! | [`load_initial`] | load that never fails, falling back to the sample set |
//! | [`Autosaver`] | saves a dirty ledger at most once per interval |

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::circle::CircleRecord;
use crate::error::LedgerError;
use crate::ledger::{CircleLedger, RadiusBounds};

// ════════════════════════════════════════════════════════════════════════════
// CircleStore trait
// ════════════════════════════════════════════════════════════════════════════

pub trait CircleStore {
    fn load(&self) -> Result<Vec<CircleRecord>, LedgerError>;
    fn save(&mut self, records: &[CircleRecord]) -> Result<(), LedgerError>;
    /// Where the data lives, for log lines and the status bar.
    fn describe(&self) -> String;
}

// ════════════════════════════════════════════════════════════════════════════
// JsonFileStore
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { JsonFileStore { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn io_err(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io { path: self.path.clone(), source }
    }
}

impl CircleStore for JsonFileStore {
    fn load(&self) -> Result<Vec<CircleRecord>, LedgerError> {
        let text = fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&mut self, records: &[CircleRecord]) -> Result<(), LedgerError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        let json = serde_json::to_string_pretty(records)?;
        // write beside the target, then swap in
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
    }

    fn describe(&self) -> String { self.path.display().to_string() }
}

// ════════════════════════════════════════════════════════════════════════════
// MemoryStore
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: Option<Vec<CircleRecord>>,
    saves:   usize,
}

impl MemoryStore {
    pub fn new() -> Self { MemoryStore::default() }

    pub fn with_records(records: Vec<CircleRecord>) -> Self {
        MemoryStore { records: Some(records), saves: 0 }
    }

    pub fn records(&self) -> Option<&[CircleRecord]> { self.records.as_deref() }
    pub fn save_count(&self) -> usize { self.saves }
}

impl CircleStore for MemoryStore {
    fn load(&self) -> Result<Vec<CircleRecord>, LedgerError> {
        self.records.clone().ok_or_else(|| LedgerError::NothingStored(self.describe()))
    }

    fn save(&mut self, records: &[CircleRecord]) -> Result<(), LedgerError> {
        self.records = Some(records.to_vec());
        self.saves += 1;
        Ok(())
    }

    fn describe(&self) -> String { "memory".into() }
}

// ════════════════════════════════════════════════════════════════════════════
// Initial load
// ════════════════════════════════════════════════════════════════════════════

/// Result of [`load_initial`].  `notice` is set when the sample set was used
/// because the store could not be read.
#[derive(Debug)]
pub struct LoadOutcome {
    pub ledger: CircleLedger,
    pub notice: Option<String>,
}

/// Load the ledger from `store`, falling back to [`CircleLedger::sample`]
/// when the data is missing or unreadable.
pub fn load_initial(store: &dyn CircleStore, bounds: RadiusBounds) -> LoadOutcome {
    match store.load() {
        Ok(records) => {
            let ledger = CircleLedger::from_records(&records, bounds);
            info!("loaded {} circles for {} users from {}",
                  ledger.circle_count(), ledger.owners().len(), store.describe());
            LoadOutcome { ledger, notice: None }
        }
        Err(e) if e.is_not_found() => {
            info!("no circle data at {}, starting from sample set", store.describe());
            LoadOutcome { ledger: CircleLedger::sample(bounds), notice: None }
        }
        Err(e) => {
            warn!("could not load circles from {}: {}", store.describe(), e);
            LoadOutcome {
                ledger: CircleLedger::sample(bounds),
                notice: Some(format!("Circle data unreadable, using sample set ({})", e)),
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Autosaver
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum SaveOutcome {
    /// Nothing to do: ledger clean or interval not yet elapsed.
    Skipped,
    Saved { circles: usize },
    /// The ledger stays dirty so the next tick retries.
    Failed { message: String },
}

#[derive(Clone, Debug)]
pub struct Autosaver {
    interval_ms:  f64,
    last_save_ms: Option<f64>,
}

impl Autosaver {
    pub fn new(interval_ms: f64) -> Self { Autosaver { interval_ms, last_save_ms: None } }

    pub fn interval_ms(&self) -> f64 { self.interval_ms }

    /// Save when the ledger is dirty and at least one interval has passed
    /// since the last attempt.
    pub fn tick(&mut self, ledger: &mut CircleLedger, store: &mut dyn CircleStore, now_ms: f64) -> SaveOutcome {
        if !ledger.is_dirty() {
            return SaveOutcome::Skipped;
        }
        if let Some(last) = self.last_save_ms {
            if now_ms - last < self.interval_ms {
                return SaveOutcome::Skipped;
            }
        }
        self.last_save_ms = Some(now_ms);
        save_now(ledger, store)
    }

    /// Save immediately if dirty, ignoring the interval.
    pub fn flush(&mut self, ledger: &mut CircleLedger, store: &mut dyn CircleStore, now_ms: f64) -> SaveOutcome {
        if !ledger.is_dirty() {
            return SaveOutcome::Skipped;
        }
        self.last_save_ms = Some(now_ms);
        save_now(ledger, store)
    }
}

fn save_now(ledger: &mut CircleLedger, store: &mut dyn CircleStore) -> SaveOutcome {
    let records = ledger.serialize();
    match store.save(&records) {
        Ok(()) => {
            ledger.mark_clean();
            info!("saved {} circles to {}", records.len(), store.describe());
            SaveOutcome::Saved { circles: records.len() }
        }
        Err(e) => {
            warn!("autosave to {} failed: {}", store.describe(), e);
            SaveOutcome::Failed { message: format!("Save failed: {}", e) }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use floor_geometry::CircleShape;

    struct BrokenStore;

    impl CircleStore for BrokenStore {
        fn load(&self) -> Result<Vec<CircleRecord>, LedgerError> {
            Err(LedgerError::Unavailable("offline".into()))
        }
        fn save(&mut self, _: &[CircleRecord]) -> Result<(), LedgerError> {
            Err(LedgerError::Unavailable("offline".into()))
        }
        fn describe(&self) -> String { "broken".into() }
    }

    fn dirty_ledger() -> CircleLedger {
        let mut l = CircleLedger::default();
        l.add_circle(CircleShape::at(1.0, 1.0, 1.0), "alice").unwrap();
        l
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested").join("circles.json"));
        let ledger = dirty_ledger();
        store.save(&ledger.serialize()).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"ownerId\": \"alice\""));

        let loaded = load_initial(&store, RadiusBounds::default());
        assert!(loaded.notice.is_none());
        assert_eq!(loaded.ledger.serialize(), ledger.serialize());
        assert!(!loaded.ledger.is_dirty());
    }

    #[test]
    fn missing_file_falls_back_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        let loaded = load_initial(&store, RadiusBounds::default());
        assert!(loaded.notice.is_none());
        assert!(loaded.ledger.circle_count() > 0);
    }

    #[test]
    fn corrupt_file_falls_back_with_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circles.json");
        fs::write(&path, "{ not json").unwrap();
        let loaded = load_initial(&JsonFileStore::new(path), RadiusBounds::default());
        assert!(loaded.notice.is_some());
        assert_eq!(
            loaded.ledger.serialize(),
            CircleLedger::sample(RadiusBounds::default()).serialize()
        );
    }

    #[test]
    fn autosave_respects_dirty_and_interval() {
        let mut store = MemoryStore::new();
        let mut saver = Autosaver::new(1000.0);
        let mut ledger = CircleLedger::default();

        assert_eq!(saver.tick(&mut ledger, &mut store, 0.0), SaveOutcome::Skipped);

        ledger.add_circle(CircleShape::at(0.0, 0.0, 1.0), "a").unwrap();
        assert_eq!(saver.tick(&mut ledger, &mut store, 10.0), SaveOutcome::Saved { circles: 1 });
        assert!(!ledger.is_dirty());

        ledger.add_circle(CircleShape::at(2.0, 0.0, 1.0), "a").unwrap();
        assert_eq!(saver.tick(&mut ledger, &mut store, 500.0), SaveOutcome::Skipped);
        assert_eq!(saver.tick(&mut ledger, &mut store, 1010.0), SaveOutcome::Saved { circles: 2 });
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.records().map(|r| r.len()), Some(2));
    }

    #[test]
    fn failed_save_keeps_dirty() {
        let mut ledger = dirty_ledger();
        let mut saver = Autosaver::new(0.0);
        match saver.tick(&mut ledger, &mut BrokenStore, 0.0) {
            SaveOutcome::Failed { message } => assert!(message.contains("offline")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(ledger.is_dirty());
    }

    #[test]
    fn flush_ignores_interval() {
        let mut ledger = dirty_ledger();
        let mut store = MemoryStore::new();
        let mut saver = Autosaver::new(60_000.0);
        saver.tick(&mut ledger, &mut store, 0.0);
        ledger.add_circle(CircleShape::at(3.0, 0.0, 1.0), "b").unwrap();
        assert_eq!(saver.flush(&mut ledger, &mut store, 1.0), SaveOutcome::Saved { circles: 2 });
    }

    #[test]
    fn empty_memory_store_starts_quietly() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap_err().is_not_found());

        let loaded = load_initial(&store, RadiusBounds::default());
        assert!(loaded.notice.is_none());
        assert_eq!(
            loaded.ledger.serialize(),
            CircleLedger::sample(RadiusBounds::default()).serialize()
        );
    }

    #[test]
    fn unreadable_store_uses_sample() {
        let loaded = load_initial(&BrokenStore, RadiusBounds::default());
        assert!(loaded.notice.unwrap().contains("offline"));
    }
}
