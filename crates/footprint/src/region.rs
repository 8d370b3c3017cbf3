use serde::{Deserialize, Serialize};
use std::fmt;

/// Rectangular WGS84 region (degrees) used to scope source queries and to
/// key the region cache.
///
/// Equality is exact field identity: two boxes that overlap, or that differ
/// only by floating-point noise, are different regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub east: f64,
    pub south: f64,
    pub west: f64,
}

impl BoundingBox {
    pub const fn new(north: f64, east: f64, south: f64, west: f64) -> Self {
        Self {
            north,
            east,
            south,
            west,
        }
    }

    /// Downtown Calgary, the region the service answers for by default.
    pub const fn downtown_calgary() -> Self {
        Self::new(51.0575, -114.040, 51.0375, -114.080)
    }

    /// SODA `$where` clause selecting rows whose `geometry_column` lies in
    /// this box.
    pub fn within_box_clause(&self, geometry_column: &str) -> String {
        format!(
            "within_box({geometry_column},{},{},{},{})",
            self.north, self.east, self.south, self.west
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::downtown_calgary()
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[N {}, E {}, S {}, W {}]",
            self.north, self.east, self.south, self.west
        )
    }
}
