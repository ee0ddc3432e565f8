//! Three-level clustering: raw points up close, aggregated counts as the
//! viewport widens.

use std::rc::Rc;

use crate::clock::{Clock, system_clock};
use crate::counters::CountPoint;
use crate::count_index::CountIndex;
use crate::error::Result;
use crate::point::GeoPoint;
use crate::points_index::PointsIndex;
use crate::spatial::distance;
use crate::units::{Meters, Minutes};

/// Cell size of the street-level points index.
const STREET_RESOLUTION_KM: f64 = 0.5;
/// Cell size of the city-level count index.
const CITY_RESOLUTION_KM: f64 = 5.0;
/// Cell size of the world-level count index.
const WORLD_RESOLUTION_KM: f64 = 500.0;

/// Queries whose corner distance is below this use raw street-level points.
const STREET_SPAN_KM: f64 = 45.0;
/// Queries below this (and above the street span) use city-level counts.
const CITY_SPAN_KM: f64 = 1000.0;

/// What a range query over a [`ClusteringIndex`] yields: raw points for
/// narrow viewports, per-cell cluster aggregates for wide ones.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeResult {
    Points(Vec<GeoPoint>),
    Clusters(Vec<CountPoint>),
}

impl RangeResult {
    /// Number of items in the result, whichever shape it took.
    pub fn len(&self) -> usize {
        match self {
            RangeResult::Points(points) => points.len(),
            RangeResult::Clusters(clusters) => clusters.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A composite index that keeps one points index at street resolution and
/// two count indexes at city and world resolution, routing each range query
/// to the level that bounds its result size.
///
/// Mutations fan out to all three levels unconditionally so they stay
/// consistent; query routing picks the level by the great-circle distance
/// between the query rectangle's corners. Useful for feeding map viewports:
/// street-level zooms see raw points, wider zooms see cluster counts
/// instead of unbounded point lists.
pub struct ClusteringIndex {
    street_level: PointsIndex,
    city_level: CountIndex,
    world_level: CountIndex,
}

impl ClusteringIndex {
    /// A clustering index with 0.5 km / 5 km / 500 km levels.
    pub fn new() -> Self {
        ClusteringIndex {
            street_level: PointsIndex::new(Meters::from_km(STREET_RESOLUTION_KM)),
            city_level: CountIndex::new(Meters::from_km(CITY_RESOLUTION_KM)),
            world_level: CountIndex::new(Meters::from_km(WORLD_RESOLUTION_KM)),
        }
    }

    /// A clustering index whose points expire `expiration` minutes after
    /// their most recent add, measured against the system clock.
    pub fn expiring(expiration: Minutes) -> Self {
        Self::expiring_with_clock(expiration, system_clock())
    }

    /// An expiring clustering index reading time from an injected clock,
    /// shared across all three levels.
    pub fn expiring_with_clock(expiration: Minutes, clock: Rc<dyn Clock>) -> Self {
        ClusteringIndex {
            street_level: PointsIndex::expiring_with_clock(
                Meters::from_km(STREET_RESOLUTION_KM),
                expiration,
                Rc::clone(&clock),
            ),
            city_level: CountIndex::expiring_with_clock(
                Meters::from_km(CITY_RESOLUTION_KM),
                expiration,
                Rc::clone(&clock),
            ),
            world_level: CountIndex::expiring_with_clock(
                Meters::from_km(WORLD_RESOLUTION_KM),
                expiration,
                clock,
            ),
        }
    }

    /// Add a point to all three levels.
    pub fn add(&mut self, point: GeoPoint) {
        self.street_level.add(point.clone());
        self.city_level.add(point.clone());
        self.world_level.add(point);
    }

    /// Remove a point from all three levels. Unknown ids are a no-op.
    pub fn remove(&mut self, point: &GeoPoint) {
        self.street_level.remove(&point.id);
        self.city_level.remove(point);
        self.world_level.remove(point);
    }

    /// Raw points or cluster aggregates inside the rectangle, depending on
    /// its corner-to-corner distance.
    pub fn range(&self, top_left: &GeoPoint, bottom_right: &GeoPoint) -> Result<RangeResult> {
        let span = distance(top_left, bottom_right);

        if span < Meters::from_km(STREET_SPAN_KM) {
            Ok(RangeResult::Points(
                self.street_level.range(top_left, bottom_right)?,
            ))
        } else if span < Meters::from_km(CITY_SPAN_KM) {
            Ok(RangeResult::Clusters(
                self.city_level.range(top_left, bottom_right)?,
            ))
        } else {
            Ok(RangeResult::Clusters(
                self.world_level.range(top_left, bottom_right)?,
            ))
        }
    }

    /// K-nearest always runs over the street-level points.
    pub fn k_nearest(
        &self,
        point: &GeoPoint,
        k: usize,
        max_distance: Meters,
        accept: impl Fn(&GeoPoint) -> bool,
    ) -> Vec<GeoPoint> {
        self.street_level.k_nearest(point, k, max_distance, accept)
    }
}

impl Default for ClusteringIndex {
    fn default() -> Self {
        Self::new()
    }
}
