//! The raw-point index: per-cell id membership plus an id→point side table.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::clock::{Clock, system_clock};
use crate::error::{GeoGridError, Result};
use crate::grid::{Cell, GridIndex};
use crate::point::GeoPoint;
use crate::sets::ExpiringSet;
use crate::spatial::distance;
use crate::units::{Meters, Minutes};

/// A cell's id membership: plain, or bounded by a trailing expiry window.
pub(crate) enum PointsCell {
    Plain(FxHashSet<String>),
    Expiring(ExpiringSet),
}

impl PointsCell {
    /// Insert or refresh an id, returning ids evicted by the expiry purge.
    fn insert(&mut self, id: &str) -> Vec<String> {
        match self {
            PointsCell::Plain(set) => {
                set.insert(id.to_string());
                Vec::new()
            }
            PointsCell::Expiring(set) => set.insert(id),
        }
    }

    /// Drop an id, returning ids evicted by the expiry purge.
    fn discard(&mut self, id: &str) -> Vec<String> {
        match self {
            PointsCell::Plain(set) => {
                set.remove(id);
                Vec::new()
            }
            PointsCell::Expiring(set) => set.remove(id),
        }
    }

    fn contains(&self, id: &str) -> bool {
        match self {
            PointsCell::Plain(set) => set.contains(id),
            PointsCell::Expiring(set) => set.contains(id),
        }
    }

    /// Live ids in this cell.
    fn ids(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            PointsCell::Plain(set) => Box::new(set.iter().map(String::as_str)),
            PointsCell::Expiring(set) => Box::new(set.ids()),
        }
    }

    fn try_clone(&self) -> Result<PointsCell> {
        match self {
            PointsCell::Plain(set) => Ok(PointsCell::Plain(set.clone())),
            PointsCell::Expiring(_) => Err(GeoGridError::UnsupportedOperation(
                "clone of live expiry state",
            )),
        }
    }
}

/// An index of identified points supporting rectangular range queries and
/// k-nearest-neighbor search.
///
/// Each occupied cell holds the ids of the points currently inside it; a
/// side table maps every id to its last-known point, so a re-add with new
/// coordinates retracts the previous cell membership first (an id never
/// occupies two cells) and removal needs only the id.
///
/// The expiring variant drops points once their most recent add ages past
/// the window.
///
/// ```rust
/// use geogrid::{GeoPoint, Meters, PointsIndex};
///
/// let mut index = PointsIndex::new(Meters::from_km(0.5));
/// index.add(GeoPoint::new("embankment", 51.507312, -0.122367));
/// index.add(GeoPoint::new("oxford-circus", 51.515110, -0.141700));
///
/// let query = GeoPoint::new("query", 51.508, -0.125);
/// let nearest = index.k_nearest(&query, 1, Meters::from_km(2.0), |_| true);
/// assert_eq!(nearest[0].id, "embankment");
/// ```
pub struct PointsIndex {
    index: GridIndex<PointsCell>,
    current_position: FxHashMap<String, GeoPoint>,
    expiration: Option<Minutes>,
}

impl std::fmt::Debug for PointsIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointsIndex")
            .field("current_position", &self.current_position)
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl PointsIndex {
    /// An index with plain (non-expiring) cells.
    pub fn new(resolution: Meters) -> Self {
        PointsIndex {
            index: GridIndex::new(
                resolution,
                Rc::new(|| PointsCell::Plain(FxHashSet::default())),
            ),
            current_position: FxHashMap::default(),
            expiration: None,
        }
    }

    /// An index whose points expire `expiration` minutes after their most
    /// recent add, measured against the system clock.
    pub fn expiring(resolution: Meters, expiration: Minutes) -> Self {
        Self::expiring_with_clock(resolution, expiration, system_clock())
    }

    /// An expiring index reading time from an injected clock.
    pub fn expiring_with_clock(
        resolution: Meters,
        expiration: Minutes,
        clock: Rc<dyn Clock>,
    ) -> Self {
        PointsIndex {
            index: GridIndex::new(
                resolution,
                Rc::new(move || {
                    PointsCell::Expiring(ExpiringSet::new(expiration, Rc::clone(&clock)))
                }),
            ),
            current_position: FxHashMap::default(),
            expiration: Some(expiration),
        }
    }

    pub fn resolution(&self) -> Meters {
        self.index.resolution()
    }

    /// Add a point, or move it if its id is already present.
    pub fn add(&mut self, point: GeoPoint) {
        if !point.has_finite_coords() {
            log::warn!("ignoring point {} with non-finite coordinates", point.id);
            return;
        }

        // Retract the previous cell membership before inserting into the
        // new one.
        if let Some(previous) = self.current_position.remove(&point.id) {
            if let Some(cell) = self.index.entry_at_mut(&previous) {
                for evicted in cell.discard(&point.id) {
                    self.current_position.remove(&evicted);
                }
            }
        }

        let cell = self.index.add_entry_at(&point);
        let evicted = cell.insert(&point.id);
        for id in evicted {
            self.current_position.remove(&id);
        }
        self.current_position.insert(point.id.clone(), point);
    }

    /// Remove a point by id. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) {
        if let Some(previous) = self.current_position.remove(id) {
            if let Some(cell) = self.index.entry_at_mut(&previous) {
                for evicted in cell.discard(id) {
                    self.current_position.remove(&evicted);
                }
            }
        }
    }

    /// The current point for an id, if it is present and not expired.
    pub fn get(&self, id: &str) -> Option<&GeoPoint> {
        let point = self.current_position.get(id)?;
        let cell = self.index.entry_at(point)?;
        cell.contains(id).then_some(point)
    }

    /// Number of tracked ids, counting entries whose expiry has not yet
    /// been swept.
    pub fn len(&self) -> usize {
        self.current_position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current_position.is_empty()
    }

    /// All points inside the rectangle spanned by `top_left` (larger
    /// latitude, smaller longitude) and `bottom_right`, inclusive of the
    /// bounds. Resolution affects only the enumeration path, never the
    /// logical result set.
    pub fn range(&self, top_left: &GeoPoint, bottom_right: &GeoPoint) -> Result<Vec<GeoPoint>> {
        let mut points = Vec::new();

        for cell in self.index.range(top_left, bottom_right)? {
            for id in cell.ids() {
                if let Some(point) = self.current_position.get(id) {
                    if point.within(top_left, bottom_right) {
                        points.push(point.clone());
                    }
                }
            }
        }

        Ok(points)
    }

    /// The up-to-`k` nearest points to `point` within `max_distance` that
    /// satisfy `accept`, sorted by ascending great-circle distance with
    /// ties broken by id.
    ///
    /// Searches grid cells in concentric square rings around the query's
    /// own cell. After ring `r`, any point in a yet-unvisited ring is at
    /// least `r × resolution` away; the walk stops once `k` accepted
    /// candidates are closer than that bound, the bound passes
    /// `max_distance`, or every occupied cell has been swept. Points
    /// rejected by `accept` never count toward `k`.
    pub fn k_nearest(
        &self,
        point: &GeoPoint,
        k: usize,
        max_distance: Meters,
        accept: impl Fn(&GeoPoint) -> bool,
    ) -> Vec<GeoPoint> {
        if k == 0 {
            return Vec::new();
        }

        let cell_size = self.index.resolution().get();
        let center = self.index.cell_of(point);
        let Some((min_row, max_row, min_col, max_col)) = self.index.cell_bounds() else {
            return Vec::new();
        };

        let mut candidates: Vec<(f64, GeoPoint)> = Vec::new();

        let mut ring: i64 = 0;
        loop {
            self.scan_ring(center, ring, |candidate| {
                if !accept(candidate) {
                    return;
                }
                let dist = distance(point, candidate).get();
                if dist <= max_distance.get() {
                    candidates.push((dist, candidate.clone()));
                }
            });

            // Conservative lower bound on the distance of anything in a
            // ring beyond this one.
            let unvisited_floor = ring as f64 * cell_size;

            if candidates.len() >= k {
                candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
                if unvisited_floor > candidates[k - 1].0 {
                    break;
                }
            }
            if unvisited_floor > max_distance.get() {
                break;
            }
            // Exhausted: the ring walk has swept every occupied cell.
            if center.row - ring <= min_row
                && center.row + ring >= max_row
                && center.col - ring <= min_col
                && center.col + ring >= max_col
            {
                break;
            }

            ring += 1;
        }

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        candidates.truncate(k);
        candidates.into_iter().map(|(_, p)| p).collect()
    }

    /// Visit every live point in the cells forming ring `ring` around
    /// `center`: the border of the (2r+1)×(2r+1) block, excluding the
    /// rings already visited.
    fn scan_ring(&self, center: Cell, ring: i64, mut visit: impl FnMut(&GeoPoint)) {
        let mut visit_cell = |cell: Cell| {
            if let Some(entry) = self.index.entry_in_cell(cell) {
                for id in entry.ids() {
                    if let Some(point) = self.current_position.get(id) {
                        visit(point);
                    }
                }
            }
        };

        if ring == 0 {
            visit_cell(center);
            return;
        }

        for col in (center.col - ring)..=(center.col + ring) {
            visit_cell(Cell {
                row: center.row + ring,
                col,
            });
            visit_cell(Cell {
                row: center.row - ring,
                col,
            });
        }
        for row in (center.row - ring + 1)..=(center.row + ring - 1) {
            visit_cell(Cell {
                row,
                col: center.col - ring,
            });
            visit_cell(Cell {
                row,
                col: center.col + ring,
            });
        }
    }

    /// A deep, independent copy: same resolution, same contents, no shared
    /// backing storage.
    ///
    /// Fails with [`GeoGridError::UnsupportedOperation`] on an expiring
    /// index — duplicating live expiry state has no defined semantics.
    pub fn try_clone(&self) -> Result<PointsIndex> {
        if self.expiration.is_some() {
            return Err(GeoGridError::UnsupportedOperation(
                "clone of an expiring points index",
            ));
        }

        let mut cells = FxHashMap::default();
        for (cell, entry) in self.index.iter_cells() {
            cells.insert(*cell, entry.try_clone()?);
        }

        Ok(PointsIndex {
            index: GridIndex::from_parts(self.index.resolution(), self.index.factory(), cells),
            current_position: self.current_position.clone(),
            expiration: None,
        })
    }
}
