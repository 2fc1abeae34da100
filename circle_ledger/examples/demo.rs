//! Walk through adding, intersecting and merging circles.
//!
//! ```
//! cargo run -p circle_ledger --example demo
//! ```

use circle_ledger::{CircleLedger, CircleRecord, MemoryStore, CircleStore};
use floor_geometry::CircleShape;

fn main() {
    let mut ledger = CircleLedger::default();
    ledger.add_circle(CircleShape::at(0.0, 0.0, 2.0), "alice").expect("finite circle");
    ledger.add_circle(CircleShape::at(-4.0, 2.0, 1.5), "carol").expect("finite circle");
    let bob = ledger.add_circle(CircleShape::at(3.0, 0.0, 2.0), "bob").expect("finite circle");

    println!("bob's circle {} crosses:", bob.id);
    for hit in ledger.find_intersections(&bob) {
        let [p, q] = hit.points;
        println!("  {:>6}  at ({:.3}, {:.3}) and ({:.3}, {:.3})",
                 hit.owner_pair.1, p.x, p.z, q.x, q.z);
    }

    let report = ledger.merge_circle_data(&[
        CircleRecord::new("alice", 0.05, 0.0, 2.02),
        CircleRecord::new("dave", 1.0, 3.0, 1.0),
    ]);
    println!("merge: {:?}", report);

    let mut store = MemoryStore::new();
    store.save(&ledger.serialize()).expect("memory store");
    println!("{} circles across {:?}", ledger.circle_count(), ledger.owner_ids());
}
