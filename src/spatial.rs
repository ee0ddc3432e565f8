//! Geodesic helpers: great-circle distance, latitude-corrected degree
//! lengths, a cheap planar approximation, and bearings.
//!
//! Exact distance wraps the `geo` crate's haversine metric. Cell sizing and
//! the planar approximation need the length of one degree of longitude at a
//! given latitude; that shrinks with cos(latitude), so it is memoized per
//! 0.1° latitude bucket to avoid repeated trigonometric evaluation.

use std::fmt;

use geo::{Distance, Haversine};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::point::GeoPoint;
use crate::units::Meters;

/// Meters per degree of latitude, derived from the haversine metric itself
/// so cell sizing and exact distances agree.
static LAT_DEGREE_LENGTH: Lazy<f64> = Lazy::new(|| {
    distance(
        &GeoPoint::new("", 0.0, 0.0),
        &GeoPoint::new("", 1.0, 0.0),
    )
    .get()
});

/// Meters per degree of longitude, keyed by 0.1° latitude bucket.
static LON_DEGREE_LENGTHS: Lazy<Mutex<FxHashMap<i32, f64>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

/// Great-circle distance between two points.
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> Meters {
    Meters(Haversine.distance(a.location(), b.location()))
}

pub(crate) fn lat_degree_length() -> f64 {
    *LAT_DEGREE_LENGTH
}

pub(crate) fn lon_degree_length(lat: f64) -> f64 {
    let bucket = (lat * 10.0) as i32;
    let mut cache = LON_DEGREE_LENGTHS.lock();
    if let Some(&length) = cache.get(&bucket) {
        return length;
    }

    let lat_rounded = f64::from(bucket) / 10.0;
    let length = distance(
        &GeoPoint::new("", lat_rounded, 0.0),
        &GeoPoint::new("", lat_rounded, 1.0),
    )
    .get();
    cache.insert(bucket, length);
    length
}

/// Squared planar distance between two nearby points, in square meters.
///
/// Latitude-scaled Euclidean approximation: cheap to compute and monotone
/// enough to compare candidates that are close together. Exact ordering and
/// cutoff decisions always use [`distance`].
pub fn approx_square_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let avg_lat = (a.lat + b.lat) / 2.0;

    let lat_len = (a.lat - b.lat).abs() * lat_degree_length();
    let lon_len = (a.lon - b.lon).abs() * lon_degree_length(avg_lat);

    lat_len * lat_len + lon_len * lon_len
}

/// Initial great-circle bearing from `from` to `to`, in degrees clockwise
/// from north, normalized to `[0, 360)`.
pub fn bearing(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// An 8-wind compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompassDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            CompassDirection::North => "N",
            CompassDirection::NorthEast => "NE",
            CompassDirection::East => "E",
            CompassDirection::SouthEast => "SE",
            CompassDirection::South => "S",
            CompassDirection::SouthWest => "SW",
            CompassDirection::West => "W",
            CompassDirection::NorthWest => "NW",
        }
    }
}

impl fmt::Display for CompassDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The compass direction from `from` to `to`.
///
/// Buckets the initial bearing into eight 45° sectors centered on the
/// cardinal and intercardinal directions.
pub fn direction(from: &GeoPoint, to: &GeoPoint) -> CompassDirection {
    const WINDS: [CompassDirection; 8] = [
        CompassDirection::North,
        CompassDirection::NorthEast,
        CompassDirection::East,
        CompassDirection::SouthEast,
        CompassDirection::South,
        CompassDirection::SouthWest,
        CompassDirection::West,
        CompassDirection::NorthWest,
    ];

    let sector = ((bearing(from, to) + 22.5) / 45.0) as usize % 8;
    WINDS[sector]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waterloo() -> GeoPoint {
        GeoPoint::new("Waterloo", 51.503299, -0.114934)
    }

    fn kings_cross() -> GeoPoint {
        GeoPoint::new("Kings Cross", 51.530600, -0.123800)
    }

    /// Reference haversine with a mean earth radius, written independently
    /// of the `geo` crate.
    fn reference_haversine(a: &GeoPoint, b: &GeoPoint) -> f64 {
        const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

        let d_lat = (b.lat - a.lat).to_radians();
        let d_lon = (b.lon - a.lon).to_radians();
        let h = (d_lat / 2.0).sin().powi(2)
            + (d_lon / 2.0).sin().powi(2) * a.lat.to_radians().cos() * b.lat.to_radians().cos();
        2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
    }

    #[test]
    fn distance_matches_reference_haversine() {
        let cases = [
            (waterloo(), kings_cross()),
            (
                GeoPoint::new("London", 51.5074, -0.1278),
                GeoPoint::new("Paris", 48.8566, 2.3522),
            ),
            (
                GeoPoint::new("Reykjavik", 64.1466, -21.9426),
                GeoPoint::new("Ankara", 39.9334, 32.8597),
            ),
        ];

        for (a, b) in &cases {
            let exact = distance(a, b).get();
            let reference = reference_haversine(a, b);
            let relative = (exact - reference).abs() / reference;
            assert!(
                relative < 1e-3,
                "distance {exact} deviates from reference {reference}"
            );
        }
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = waterloo();
        let b = kings_cross();
        assert_eq!(distance(&a, &b).get(), distance(&b, &a).get());
        assert_eq!(distance(&a, &a).get(), 0.0);
    }

    #[test]
    fn approximation_tracks_exact_distance_for_nearby_points() {
        let pairs = [
            (waterloo(), kings_cross()),
            (
                GeoPoint::new("Leicester Square", 51.511291, -0.128242),
                GeoPoint::new("Covent Garden", 51.513103, -0.124731),
            ),
        ];

        for (a, b) in &pairs {
            let approx = approx_square_distance(a, b).sqrt();
            let exact = distance(a, b).get();
            let relative = (approx - exact).abs() / exact;
            assert!(
                relative < 0.01,
                "approximation {approx} too far from exact {exact}"
            );
        }
    }

    #[test]
    fn lon_degree_length_shrinks_with_latitude() {
        let equator = lon_degree_length(0.0);
        let london = lon_degree_length(51.5);
        let arctic = lon_degree_length(66.5);

        assert!(equator > london && london > arctic);
        // cos(51.5°) ≈ 0.6225
        assert!((london / equator - 51.5_f64.to_radians().cos()).abs() < 0.01);

        // Memoized lookups return the same value.
        assert_eq!(lon_degree_length(51.5), london);
    }

    #[test]
    fn bearing_london_to_paris() {
        let london = GeoPoint::new("London", 51.5074, -0.1278);
        let paris = GeoPoint::new("Paris", 48.8566, 2.3522);

        let b = bearing(&london, &paris);
        assert!((b - 148.1).abs() < 1.0, "unexpected bearing {b}");
        assert_eq!(direction(&london, &paris), CompassDirection::SouthEast);
    }

    #[test]
    fn direction_covers_cardinals() {
        let origin = GeoPoint::new("origin", 0.0, 0.0);

        let north = GeoPoint::new("n", 1.0, 0.0);
        let east = GeoPoint::new("e", 0.0, 1.0);
        let south = GeoPoint::new("s", -1.0, 0.0);
        let west = GeoPoint::new("w", 0.0, -1.0);

        assert_eq!(direction(&origin, &north), CompassDirection::North);
        assert_eq!(direction(&origin, &east), CompassDirection::East);
        assert_eq!(direction(&origin, &south), CompassDirection::South);
        assert_eq!(direction(&origin, &west), CompassDirection::West);
    }
}
