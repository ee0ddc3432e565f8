//! The aggregating index: one counter per occupied cell.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::clock::{Clock, system_clock};
use crate::counters::{CountPoint, Counter, ExpiringCounter};
use crate::error::{GeoGridError, Result};
use crate::grid::GridIndex;
use crate::point::GeoPoint;
use crate::units::{Meters, Minutes};

/// A cell's aggregate: a plain counter, or one bounded by a trailing
/// expiry window.
pub(crate) enum CountCell {
    Plain(Counter),
    Expiring(ExpiringCounter),
}

impl CountCell {
    fn add(&mut self, point: &GeoPoint) {
        match self {
            CountCell::Plain(counter) => counter.add(point),
            CountCell::Expiring(counter) => counter.add(point),
        }
    }

    fn remove(&mut self, point: &GeoPoint) {
        match self {
            CountCell::Plain(counter) => counter.remove(point),
            CountCell::Expiring(counter) => counter.remove(point),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            CountCell::Plain(counter) => counter.is_empty(),
            CountCell::Expiring(counter) => counter.is_empty(),
        }
    }

    fn point(&self) -> CountPoint {
        match self {
            CountCell::Plain(counter) => counter.point(),
            CountCell::Expiring(counter) => counter.point(),
        }
    }
}

/// An index that collapses the points in each cell into a centroid and a
/// count, for map rendering at zoom levels where raw points are too dense.
///
/// Tracks each id's current position so a re-add retracts the previous
/// cell's contribution first, like [`crate::PointsIndex`]. K-nearest has no
/// well-defined meaning over aggregated cells and reports
/// [`GeoGridError::UnsupportedOperation`].
pub struct CountIndex {
    index: GridIndex<CountCell>,
    current_position: FxHashMap<String, GeoPoint>,
}

impl CountIndex {
    /// An index counting all points ever added per cell.
    pub fn new(resolution: Meters) -> Self {
        CountIndex {
            index: GridIndex::new(resolution, Rc::new(|| CountCell::Plain(Counter::new()))),
            current_position: FxHashMap::default(),
        }
    }

    /// An index whose per-cell counts only cover the trailing expiration
    /// window, measured against the system clock.
    pub fn expiring(resolution: Meters, expiration: Minutes) -> Self {
        Self::expiring_with_clock(resolution, expiration, system_clock())
    }

    /// An expiring index reading time from an injected clock.
    pub fn expiring_with_clock(
        resolution: Meters,
        expiration: Minutes,
        clock: Rc<dyn Clock>,
    ) -> Self {
        CountIndex {
            index: GridIndex::new(
                resolution,
                Rc::new(move || {
                    CountCell::Expiring(ExpiringCounter::new(expiration, Rc::clone(&clock)))
                }),
            ),
            current_position: FxHashMap::default(),
        }
    }

    pub fn resolution(&self) -> Meters {
        self.index.resolution()
    }

    /// Count a point, retracting its previous cell contribution if the id
    /// was already present.
    pub fn add(&mut self, point: GeoPoint) {
        if !point.has_finite_coords() {
            log::warn!("ignoring point {} with non-finite coordinates", point.id);
            return;
        }

        self.remove(&point);
        self.index.add_entry_at(&point).add(&point);
        self.current_position.insert(point.id.clone(), point);
    }

    /// Retract a point's contribution by id. Unknown ids are a no-op.
    pub fn remove(&mut self, point: &GeoPoint) {
        if let Some(previous) = self.current_position.remove(&point.id) {
            if let Some(cell) = self.index.entry_at_mut(&previous) {
                cell.remove(&previous);
            }
        }
    }

    /// The per-cell aggregates within the rectangle: one synthetic point
    /// per non-empty cell, carrying the cell centroid and its count.
    pub fn range(&self, top_left: &GeoPoint, bottom_right: &GeoPoint) -> Result<Vec<CountPoint>> {
        Ok(self
            .index
            .range(top_left, bottom_right)?
            .into_iter()
            .filter(|cell| !cell.is_empty())
            .map(CountCell::point)
            .collect())
    }

    /// Aggregated cells have no single nearest point; always fails with
    /// [`GeoGridError::UnsupportedOperation`].
    pub fn k_nearest(
        &self,
        _point: &GeoPoint,
        _k: usize,
        _max_distance: Meters,
        _accept: impl Fn(&GeoPoint) -> bool,
    ) -> Result<Vec<GeoPoint>> {
        Err(GeoGridError::UnsupportedOperation(
            "k-nearest on an aggregating index",
        ))
    }
}
