//! Coordinate reference systems the join can align between.

use crate::geometry::Areal;
use geo_types::Coord;
use std::f64::consts::{FRAC_PI_4, PI};
use std::fmt;

/// WGS84 semi-major axis in meters, the sphere radius of Web Mercator.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    /// EPSG:4326, lon/lat degrees. Everything the data portal serves.
    #[default]
    Wgs84,
    /// EPSG:3857, spherical Web Mercator meters.
    WebMercator,
}

impl Crs {
    pub fn epsg(self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
        }
    }

    /// Converts `areal` from `self` into `target`. The result may contain
    /// non-finite coordinates (e.g. a latitude beyond ±90° projected to
    /// Web Mercator); the caller decides whether that is acceptable.
    pub fn reproject(self, areal: &Areal, target: Crs) -> Areal {
        match (self, target) {
            (Crs::Wgs84, Crs::WebMercator) => areal.map_coords(lonlat_to_mercator),
            (Crs::WebMercator, Crs::Wgs84) => areal.map_coords(mercator_to_lonlat),
            _ => areal.clone(),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

fn lonlat_to_mercator(c: Coord<f64>) -> Coord<f64> {
    let x = EARTH_RADIUS_M * c.x.to_radians();
    let y = EARTH_RADIUS_M * (FRAC_PI_4 + c.y.to_radians() / 2.0).tan().ln();
    Coord { x, y }
}

fn mercator_to_lonlat(c: Coord<f64>) -> Coord<f64> {
    let lon = (c.x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (c.y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    Coord { x: lon, y: lat }
}
