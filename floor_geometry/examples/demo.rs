//! Walks through the floor mapping, intersections and circularity scoring.

use floor_geometry::{
    FloorMapping, CircleShape, ScreenPoint, Bounds,
    circle_intersection, circularity,
};

fn main() {
    println!("\n=== Floor Geometry Demo ===\n");

    // ── 1. Screen ↔ floor ────────────────────────────────────────────────
    let map = FloorMapping::new(1280.0, 720.0, 16.0, 9.0);
    println!("1. Mapping a 1280×720 screen onto a 16×9 floor");
    for &(x, y) in &[(0.0, 0.0), (640.0, 360.0), (1280.0, 720.0), (320.0, 540.0)] {
        let w = map.screen_to_world(x, y);
        let s = map.world_to_screen(w);
        println!("   ({:>6.1}, {:>6.1}) px  →  ({:>5.2}, {:>5.2}) floor  →  ({:>6.1}, {:>6.1}) px",
                 x, y, w.x, w.z, s.x, s.y);
    }
    println!("   100 px = {:.3} world units\n", map.pixels_to_world(100.0));

    // ── 2. Circle intersections ──────────────────────────────────────────
    println!("2. Circle intersections");
    let alice = CircleShape::at(0.0, 0.0, 2.0);
    for other in [
        CircleShape::at(3.0, 0.0, 2.0),
        CircleShape::at(4.0, 0.0, 2.0),
        CircleShape::at(6.0, 0.0, 2.0),
        CircleShape::at(0.2, 0.0, 0.5),
    ] {
        match circle_intersection(&alice, &other) {
            Some([p, q]) => println!(
                "   r=2 @ (0,0)  ×  r={} @ ({},{})  →  ({:.3},{:.3}) and ({:.3},{:.3})",
                other.radius, other.center.x, other.center.z, p.x, p.z, q.x, q.z),
            None => println!(
                "   r=2 @ (0,0)  ×  r={} @ ({},{})  →  no crossing",
                other.radius, other.center.x, other.center.z),
        }
    }
    println!();

    // ── 3. Circularity ───────────────────────────────────────────────────
    println!("3. Circularity of sampled paths");
    let ring: Vec<ScreenPoint> = (0..36)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / 36.0;
            ScreenPoint::new(400.0 + 90.0 * a.cos(), 300.0 + 90.0 * a.sin())
        })
        .collect();
    let squiggle: Vec<ScreenPoint> = (0..36)
        .map(|i| ScreenPoint::new(300.0 + i as f64 * 6.0, 300.0 + (i % 3) as f64 * 4.0))
        .collect();
    for (label, path) in [("ring", &ring), ("squiggle", &squiggle)] {
        if let Some(b) = Bounds::of(path) {
            let r = b.width().max(b.height()) / 2.0;
            println!("   {:<9} aspect {:>6.2}  circularity {:.3}",
                     label, b.aspect_ratio(), circularity(path, b.center(), r));
        }
    }
    println!();
}
