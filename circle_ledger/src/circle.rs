//! Stored circles, persisted records and derived intersections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use floor_geometry::{CircleShape, FloorPoint};

/// A circle drawn on the floor by one user.  Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    /// Unique within the owner's collection.
    pub id:         String,
    pub x:          f64,
    pub z:          f64,
    pub radius:     f64,
    pub owner_id:   String,
    pub created_at: DateTime<Utc>,
}

impl Circle {
    pub fn shape(&self) -> CircleShape { CircleShape::at(self.x, self.z, self.radius) }

    pub fn center(&self) -> FloorPoint { FloorPoint::new(self.x, self.z) }

    pub fn record(&self) -> CircleRecord {
        CircleRecord {
            x:        self.x,
            z:        self.z,
            radius:   self.radius,
            owner_id: self.owner_id.clone(),
        }
    }
}

/// The persisted form of a circle: `{ x, z, radius, ownerId }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleRecord {
    pub x:        f64,
    pub z:        f64,
    pub radius:   f64,
    pub owner_id: String,
}

impl CircleRecord {
    pub fn new(owner_id: &str, x: f64, z: f64, radius: f64) -> Self {
        CircleRecord { x, z, radius, owner_id: owner_id.to_string() }
    }

    pub fn shape(&self) -> CircleShape { CircleShape::at(self.x, self.z, self.radius) }
}

/// Two crossing points between a new circle and another user's circle.
/// Derived on demand; never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Intersection {
    pub circle_a:   Circle,
    pub circle_b:   Circle,
    pub points:     [FloorPoint; 2],
    pub owner_pair: (String, String),
}
