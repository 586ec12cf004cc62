//! Bounding-box helpers for AOI handling.
//!
//! All of this is spherical approximation in WGS84 degrees: latitude spans
//! use a constant meters-per-degree scale and longitude spans grow with
//! 1/cos(lat). Good enough for AOIs up to ~100 km; real geodesy stays in
//! the external raster tooling.

use serde::{Deserialize, Serialize};

/// Meters per degree of latitude (and of longitude at the equator)
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Geographic extent in WGS84 degrees.
///
/// Serialized as the 4-array `[min_lon, min_lat, max_lon, max_lat]` used
/// by evidence records and AOI config files. Deserialization rejects
/// inverted extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = String;

    fn try_from(v: [f64; 4]) -> Result<Self, Self::Error> {
        let bbox = Self {
            min_lon: v[0],
            min_lat: v[1],
            max_lon: v[2],
            max_lat: v[3],
        };
        if !(bbox.min_lon < bbox.max_lon && bbox.min_lat < bbox.max_lat) {
            return Err(format!(
                "invalid bbox extents [{}, {}, {}, {}]: min must be less than max on both axes",
                v[0], v[1], v[2], v[3]
            ));
        }
        Ok(bbox)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_lon, b.min_lat, b.max_lon, b.max_lat]
    }
}

impl BoundingBox {
    /// Build a box from explicit extents, validating ordering
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> anyhow::Result<Self> {
        Self::try_from([min_lon, min_lat, max_lon, max_lat]).map_err(anyhow::Error::msg)
    }

    /// Center point as (lat, lon)
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Whether a point lies inside the box (edges inclusive)
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Grow the box by `pad_deg` degrees on every side
    pub fn pad(&self, pad_deg: f64) -> Self {
        Self {
            min_lon: self.min_lon - pad_deg,
            min_lat: self.min_lat - pad_deg,
            max_lon: self.max_lon + pad_deg,
            max_lat: self.max_lat + pad_deg,
        }
    }

    /// Grow the box by roughly `buffer_m` meters on every side
    pub fn buffered(&self, buffer_m: f64) -> Self {
        self.pad(buffer_m / METERS_PER_DEGREE)
    }

    /// Closed (lon, lat) polygon ring tracing the box counter-clockwise
    pub fn ring(&self) -> Vec<(f64, f64)> {
        vec![
            (self.min_lon, self.min_lat),
            (self.max_lon, self.min_lat),
            (self.max_lon, self.max_lat),
            (self.min_lon, self.max_lat),
            (self.min_lon, self.min_lat),
        ]
    }
}

/// Rough bbox from a center point and half-size in meters.
///
/// The half-latitude-span is latitude-invariant; the half-longitude-span
/// scales with 1/cos(lat) so the box stays approximately square on the
/// ground.
pub fn bbox_from_center(lat: f64, lon: f64, half_size_m: f64) -> BoundingBox {
    let dlat = half_size_m / METERS_PER_DEGREE;
    let dlon = half_size_m / (METERS_PER_DEGREE * lat.to_radians().cos());
    BoundingBox {
        min_lon: lon - dlon,
        min_lat: lat - dlat,
        max_lon: lon + dlon,
        max_lat: lat + dlat,
    }
}
