//! The shared per-user circle dataset.
//!
//! Owners are kept in order of first appearance and each owner's circles in
//! creation order, so every query that flattens the ledger is stable.

use std::collections::HashSet;

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use floor_geometry::{CircleShape, circle_intersection};

use crate::circle::{Circle, CircleRecord, Intersection};
use crate::error::LedgerError;

/// Two circles of the same owner closer than this on every axis are
/// considered the same circle when merging.
pub const DUPLICATE_TOLERANCE: f64 = 0.1;

// ════════════════════════════════════════════════════════════════════════════
// RadiusBounds
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadiusBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for RadiusBounds {
    fn default() -> Self { RadiusBounds { min: 0.5, max: 3.0 } }
}

impl RadiusBounds {
    pub fn new(min: f64, max: f64) -> Self { RadiusBounds { min, max } }

    pub fn clamp(&self, radius: f64) -> f64 { radius.clamp(self.min, self.max) }
}

// ════════════════════════════════════════════════════════════════════════════
// OwnerCircles / MergeReport
// ════════════════════════════════════════════════════════════════════════════

/// One user's circles in creation order.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnerCircles {
    pub owner_id: String,
    pub circles:  Vec<Circle>,
}

/// What a merge did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added:      usize,
    pub duplicates: usize,
    pub invalid:    usize,
    pub new_owners: Vec<String>,
}

// ════════════════════════════════════════════════════════════════════════════
// CircleLedger
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct CircleLedger {
    owners:   Vec<OwnerCircles>,
    bounds:   RadiusBounds,
    next_seq: u64,
    dirty:    bool,
}

impl Default for CircleLedger {
    fn default() -> Self { CircleLedger::new(RadiusBounds::default()) }
}

impl CircleLedger {
    pub fn new(bounds: RadiusBounds) -> Self {
        CircleLedger { owners: Vec::new(), bounds, next_seq: 0, dirty: false }
    }

    /// Build a clean ledger from persisted records.  Records with non-finite
    /// geometry are skipped.
    pub fn from_records(records: &[CircleRecord], bounds: RadiusBounds) -> Self {
        let mut ledger = CircleLedger::new(bounds);
        for r in records {
            if let Err(e) = ledger.insert(r.shape(), &r.owner_id) {
                warn!("skipping stored circle: {}", e);
            }
        }
        ledger.dirty = false;
        ledger
    }

    /// Built-in dataset used when nothing can be loaded.
    pub fn sample(bounds: RadiusBounds) -> Self {
        let records = [
            CircleRecord::new("sample_north", -3.0, -1.5, 1.6),
            CircleRecord::new("sample_north",  2.5, -2.0, 1.2),
            CircleRecord::new("sample_south", -1.0,  1.5, 2.0),
            CircleRecord::new("sample_south",  4.0,  1.0, 1.4),
        ];
        CircleLedger::from_records(&records, bounds)
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn bounds(&self)       -> RadiusBounds     { self.bounds }
    pub fn owners(&self)       -> &[OwnerCircles]  { &self.owners }
    pub fn is_dirty(&self)     -> bool             { self.dirty }
    pub fn mark_clean(&mut self)                   { self.dirty = false; }

    pub fn owner_ids(&self) -> Vec<&str> {
        self.owners.iter().map(|o| o.owner_id.as_str()).collect()
    }

    pub fn circles_of(&self, owner_id: &str) -> &[Circle] {
        self.owner(owner_id).map_or(&[], |o| o.circles.as_slice())
    }

    pub fn circle_count(&self) -> usize {
        self.owners.iter().map(|o| o.circles.len()).sum()
    }

    /// Every circle, owners in first-appearance order.
    pub fn all_circles(&self) -> impl Iterator<Item = &Circle> {
        self.owners.iter().flat_map(|o| o.circles.iter())
    }

    // ── mutation ─────────────────────────────────────────────────────────

    /// Store a recognised circle for `owner_id`.  The radius is clamped to
    /// the ledger's bounds.
    pub fn add_circle(&mut self, shape: CircleShape, owner_id: &str) -> Result<Circle, LedgerError> {
        let circle = self.insert(shape, owner_id)?;
        self.dirty = true;
        info!("{} drew circle {} at ({:.2}, {:.2}) r={:.2}",
              owner_id, circle.id, circle.x, circle.z, circle.radius);
        Ok(circle)
    }

    /// Remove every circle of `owner_id`; returns how many were removed.
    pub fn clear_owner(&mut self, owner_id: &str) -> usize {
        let Some(pos) = self.owners.iter().position(|o| o.owner_id == owner_id) else {
            return 0;
        };
        let removed = self.owners.remove(pos).circles.len();
        self.dirty = true;
        removed
    }

    pub fn clear_all(&mut self) -> usize {
        let removed = self.circle_count();
        self.owners.clear();
        self.dirty = true;
        removed
    }

    /// Import an external batch.
    ///
    /// Owners already in the ledger get each incoming circle appended unless
    /// one of their circles matches it within [`DUPLICATE_TOLERANCE`] on x, z
    /// and radius.  Owners not yet in the ledger are added wholesale.  Every
    /// appended circle gets a fresh id.
    pub fn merge_circle_data(&mut self, batch: &[CircleRecord]) -> MergeReport {
        let known: HashSet<String> = self.owners.iter().map(|o| o.owner_id.clone()).collect();
        let mut report = MergeReport::default();

        for record in batch {
            let shape = CircleShape::at(record.x, record.z, self.bounds.clamp(record.radius));

            if known.contains(&record.owner_id) && self.has_duplicate(&record.owner_id, &shape) {
                report.duplicates += 1;
                continue;
            }

            match self.insert(shape, &record.owner_id) {
                Ok(_) => {
                    report.added += 1;
                    if !known.contains(&record.owner_id) && !report.new_owners.contains(&record.owner_id) {
                        report.new_owners.push(record.owner_id.clone());
                    }
                }
                Err(e) => {
                    warn!("merge skipped a circle: {}", e);
                    report.invalid += 1;
                }
            }
        }

        if report.added > 0 {
            self.dirty = true;
        }
        debug!("merge: {:?}", report);
        report
    }

    /// The persisted form of the whole ledger.
    pub fn serialize(&self) -> Vec<CircleRecord> {
        self.all_circles().map(Circle::record).collect()
    }

    // ── queries ──────────────────────────────────────────────────────────

    /// Circles of everyone except `current_owner_id`, owners in order of
    /// first appearance, circles in creation order.
    pub fn other_users_circles(&self, current_owner_id: &str) -> Vec<&Circle> {
        self.owners.iter()
            .filter(|o| o.owner_id != current_owner_id)
            .flat_map(|o| o.circles.iter())
            .collect()
    }

    /// Every other user's circle that `new_circle` crosses at two points, in
    /// the order of [`other_users_circles`](Self::other_users_circles).
    pub fn find_intersections(&self, new_circle: &Circle) -> Vec<Intersection> {
        let shape = new_circle.shape();
        self.other_users_circles(&new_circle.owner_id)
            .into_iter()
            .filter_map(|other| {
                circle_intersection(&shape, &other.shape()).map(|points| Intersection {
                    circle_a:   new_circle.clone(),
                    circle_b:   other.clone(),
                    points,
                    owner_pair: (new_circle.owner_id.clone(), other.owner_id.clone()),
                })
            })
            .collect()
    }

    // ── internals ────────────────────────────────────────────────────────

    fn owner(&self, owner_id: &str) -> Option<&OwnerCircles> {
        self.owners.iter().find(|o| o.owner_id == owner_id)
    }

    fn owner_mut(&mut self, owner_id: &str) -> &mut OwnerCircles {
        match self.owners.iter().position(|o| o.owner_id == owner_id) {
            Some(i) => &mut self.owners[i],
            None => {
                self.owners.push(OwnerCircles { owner_id: owner_id.to_string(), circles: Vec::new() });
                let last = self.owners.len() - 1;
                &mut self.owners[last]
            }
        }
    }

    fn has_duplicate(&self, owner_id: &str, shape: &CircleShape) -> bool {
        self.circles_of(owner_id).iter().any(|c| {
            (c.x - shape.center.x).abs() < DUPLICATE_TOLERANCE
                && (c.z - shape.center.z).abs() < DUPLICATE_TOLERANCE
                && (c.radius - shape.radius).abs() < DUPLICATE_TOLERANCE
        })
    }

    fn next_id(&mut self, owner_id: &str) -> String {
        loop {
            self.next_seq += 1;
            let id = format!("{}_{}", owner_id, self.next_seq);
            if !self.circles_of(owner_id).iter().any(|c| c.id == id) {
                return id;
            }
        }
    }

    fn insert(&mut self, shape: CircleShape, owner_id: &str) -> Result<Circle, LedgerError> {
        if owner_id.is_empty() {
            return Err(LedgerError::EmptyOwner);
        }
        if !shape.is_finite() {
            return Err(LedgerError::NonFinite {
                owner_id: owner_id.to_string(),
                x:        shape.center.x,
                z:        shape.center.z,
                radius:   shape.radius,
            });
        }
        let circle = Circle {
            id:         self.next_id(owner_id),
            x:          shape.center.x,
            z:          shape.center.z,
            radius:     self.bounds.clamp(shape.radius),
            owner_id:   owner_id.to_string(),
            created_at: Utc::now(),
        };
        self.owner_mut(owner_id).circles.push(circle.clone());
        Ok(circle)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> CircleLedger { CircleLedger::default() }

    #[test]
    fn add_assigns_unique_ids_and_marks_dirty() {
        let mut l = ledger();
        assert!(!l.is_dirty());
        let a = l.add_circle(CircleShape::at(0.0, 0.0, 1.0), "alice").unwrap();
        let b = l.add_circle(CircleShape::at(1.0, 0.0, 1.0), "alice").unwrap();
        assert!(l.is_dirty());
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("alice_"));
        assert_eq!(l.circles_of("alice").len(), 2);
        assert_eq!(l.circles_of("alice")[0], a);
    }

    #[test]
    fn add_clamps_radius() {
        let mut l = ledger();
        assert_eq!(l.add_circle(CircleShape::at(0.0, 0.0, 9.0), "a").unwrap().radius, 3.0);
        assert_eq!(l.add_circle(CircleShape::at(0.0, 0.0, 0.1), "a").unwrap().radius, 0.5);
    }

    #[test]
    fn add_rejects_non_finite_and_empty_owner() {
        let mut l = ledger();
        assert!(matches!(
            l.add_circle(CircleShape::at(f64::NAN, 0.0, 1.0), "a"),
            Err(LedgerError::NonFinite { .. })
        ));
        assert!(matches!(l.add_circle(CircleShape::at(0.0, 0.0, 1.0), ""), Err(LedgerError::EmptyOwner)));
        assert_eq!(l.circle_count(), 0);
        assert!(!l.is_dirty());
    }

    #[test]
    fn other_users_circles_keeps_order() {
        let mut l = ledger();
        l.add_circle(CircleShape::at(1.0, 0.0, 1.0), "bob").unwrap();
        l.add_circle(CircleShape::at(2.0, 0.0, 1.0), "me").unwrap();
        l.add_circle(CircleShape::at(3.0, 0.0, 1.0), "carol").unwrap();
        l.add_circle(CircleShape::at(4.0, 0.0, 1.0), "bob").unwrap();
        let xs: Vec<f64> = l.other_users_circles("me").iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![1.0, 4.0, 3.0]);
        assert_eq!(l.owner_ids(), vec!["bob", "me", "carol"]);
    }

    #[test]
    fn alice_and_bob_cross_symmetrically() {
        let mut l = ledger();
        l.add_circle(CircleShape::at(0.0, 0.0, 2.0), "alice").unwrap();
        let bob = l.add_circle(CircleShape::at(3.0, 0.0, 2.0), "bob").unwrap();

        let hits = l.find_intersections(&bob);
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.owner_pair, ("bob".to_string(), "alice".to_string()));
        for p in &hit.points {
            assert!((p.x - 1.5).abs() < 1e-9);
            assert!((p.distance(&hit.circle_a.center()) - 2.0).abs() < 1e-9);
            assert!((p.distance(&hit.circle_b.center()) - 2.0).abs() < 1e-9);
        }
        assert!((hit.points[0].z + hit.points[1].z).abs() < 1e-9);
    }

    #[test]
    fn own_circles_and_misses_are_ignored() {
        let mut l = ledger();
        l.add_circle(CircleShape::at(0.0, 0.0, 2.0), "bob").unwrap();
        l.add_circle(CircleShape::at(9.0, 0.0, 1.0), "alice").unwrap();
        l.add_circle(CircleShape::at(0.2, 0.0, 0.5), "alice").unwrap(); // nested
        l.add_circle(CircleShape::at(-2.5, 0.0, 2.0), "carol").unwrap();
        let bob = l.add_circle(CircleShape::at(1.0, 0.0, 2.0), "bob").unwrap();
        let hits = l.find_intersections(&bob);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].circle_b.owner_id, "carol");
    }

    #[test]
    fn merge_drops_duplicates_for_known_owner() {
        let mut l = ledger();
        l.add_circle(CircleShape::at(1.0, 1.0, 1.0), "alice").unwrap();
        l.mark_clean();
        let report = l.merge_circle_data(&[
            CircleRecord::new("alice", 1.05, 0.95, 1.09),
            CircleRecord::new("alice", 1.2, 1.0, 1.0),
        ]);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.added, 1);
        assert!(report.new_owners.is_empty());
        assert_eq!(l.circles_of("alice").len(), 2);
        assert!(l.is_dirty());
    }

    #[test]
    fn merging_same_circle_twice_keeps_one() {
        let mut l = ledger();
        let batch = [CircleRecord::new("dana", 2.0, -1.0, 1.5)];
        l.merge_circle_data(&batch);
        let second = l.merge_circle_data(&batch);
        assert_eq!(second.added, 0);
        assert_eq!(second.duplicates, 1);
        assert_eq!(l.circles_of("dana").len(), 1);
    }

    #[test]
    fn new_owner_added_wholesale() {
        let mut l = ledger();
        let report = l.merge_circle_data(&[
            CircleRecord::new("erin", 0.0, 0.0, 1.0),
            CircleRecord::new("erin", 0.0, 0.0, 1.0),
            CircleRecord::new("finn", 5.0, 0.0, 1.0),
        ]);
        assert_eq!(report.added, 3);
        assert_eq!(report.new_owners, vec!["erin".to_string(), "finn".to_string()]);
        let ids: Vec<&str> = l.circles_of("erin").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn merge_tolerance_is_per_axis() {
        let mut l = ledger();
        l.add_circle(CircleShape::at(0.0, 0.0, 1.0), "a").unwrap();
        let report = l.merge_circle_data(&[
            CircleRecord::new("a", 0.0, 0.0, 1.15),
            CircleRecord::new("a", 0.0, 0.15, 1.0),
        ]);
        assert_eq!(report.added, 2);
    }

    #[test]
    fn merge_skips_invalid_and_leaves_clean_when_nothing_added() {
        let mut l = ledger();
        let report = l.merge_circle_data(&[CircleRecord::new("a", f64::INFINITY, 0.0, 1.0)]);
        assert_eq!(report.invalid, 1);
        assert_eq!(report.added, 0);
        assert!(!l.is_dirty());
    }

    #[test]
    fn records_round_trip_through_ledger() {
        let mut l = ledger();
        l.add_circle(CircleShape::at(1.0, 2.0, 1.5), "x").unwrap();
        l.add_circle(CircleShape::at(-1.0, 0.5, 2.5), "y").unwrap();
        let records = l.serialize();
        let restored = CircleLedger::from_records(&records, RadiusBounds::default());
        assert!(!restored.is_dirty());
        assert_eq!(restored.serialize(), records);
    }

    #[test]
    fn ids_stay_unique_after_reload() {
        let records = vec![CircleRecord::new("a", 0.0, 0.0, 1.0); 3];
        let mut l = CircleLedger::from_records(&records, RadiusBounds::default());
        let c = l.add_circle(CircleShape::at(2.0, 0.0, 1.0), "a").unwrap();
        let ids: HashSet<&str> = l.circles_of("a").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.contains(c.id.as_str()));
    }

    #[test]
    fn clearing() {
        let mut l = CircleLedger::sample(RadiusBounds::default());
        assert!(l.circle_count() > 0);
        let north = l.circles_of("sample_north").len();
        assert_eq!(l.clear_owner("sample_north"), north);
        assert!(l.is_dirty());
        assert_eq!(l.clear_owner("nobody"), 0);
        l.clear_all();
        assert_eq!(l.circle_count(), 0);
    }
}
