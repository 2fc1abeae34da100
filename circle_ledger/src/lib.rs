//! # circle_ledger
//!
//! The shared record of every circle drawn on the floor, keyed by user.
//!
//! | Module | Contents |
//! |---|---|
//! | [`circle`] | [`Circle`], the persisted [`CircleRecord`], derived [`Intersection`]s |
//! | [`ledger`] | [`CircleLedger`]: add, query, intersect, merge, clear |
//! | [`store`]  | [`CircleStore`] backends, fallback loading, [`Autosaver`] |
//!
//! Intersections are always between a new circle and circles owned by
//! *other* users; a user's own circles never count.
//!
//! ```rust
//! use circle_ledger::CircleLedger;
//! use floor_geometry::CircleShape;
//!
//! let mut ledger = CircleLedger::default();
//! ledger.add_circle(CircleShape::at(0.0, 0.0, 2.0), "alice").unwrap();
//! let bob = ledger.add_circle(CircleShape::at(3.0, 0.0, 2.0), "bob").unwrap();
//! let hits = ledger.find_intersections(&bob);
//! assert_eq!(hits.len(), 1);
//! assert!((hits[0].points[0].x - 1.5).abs() < 1e-9);
//! ```

pub mod circle;
pub mod error;
pub mod ledger;
pub mod store;

pub use circle::{Circle, CircleRecord, Intersection};
pub use error::LedgerError;
pub use ledger::{CircleLedger, MergeReport, OwnerCircles, RadiusBounds, DUPLICATE_TOLERANCE};
pub use store::{
    Autosaver, CircleStore, JsonFileStore, LoadOutcome, MemoryStore, SaveOutcome,
    load_initial,
};
