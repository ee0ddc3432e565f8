//! The generic grid-cell index.
//!
//! Maps geographic space onto fixed-size cells and owns one lazily created
//! entry per occupied cell. The entry type is a generic parameter chosen at
//! index construction; the grid addresses cells and manages entry lifecycle
//! but never interprets entry contents — callers mutate the entries it hands
//! back.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{GeoGridError, Result};
use crate::point::GeoPoint;
use crate::spatial::{lat_degree_length, lon_degree_length};
use crate::units::Meters;

/// Creates a fresh cell entry on first insertion into a cell.
pub type EntryFactory<E> = Rc<dyn Fn() -> E>;

/// A grid cell coordinate.
///
/// Rows grow northward, columns eastward. Cell height is fixed by the
/// index resolution; cell width is latitude-corrected so cells stay roughly
/// square in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub row: i64,
    pub col: i64,
}

/// A spatial hash from (lat, lon) to per-cell entries of type `E`.
///
/// The linear resolution is fixed at construction; changing it requires
/// building a new index. Entries are created by the factory on first
/// insertion and are never removed, even when they become empty.
pub struct GridIndex<E> {
    resolution: Meters,
    cells: FxHashMap<Cell, E>,
    new_entry: EntryFactory<E>,
}

impl<E> GridIndex<E> {
    pub fn new(resolution: Meters, new_entry: EntryFactory<E>) -> Self {
        GridIndex {
            resolution,
            cells: FxHashMap::default(),
            new_entry,
        }
    }

    pub(crate) fn from_parts(
        resolution: Meters,
        new_entry: EntryFactory<E>,
        cells: FxHashMap<Cell, E>,
    ) -> Self {
        GridIndex {
            resolution,
            cells,
            new_entry,
        }
    }

    pub fn resolution(&self) -> Meters {
        self.resolution
    }

    pub(crate) fn factory(&self) -> EntryFactory<E> {
        Rc::clone(&self.new_entry)
    }

    /// The cell containing a point at this index's resolution.
    pub fn cell_of(&self, point: &GeoPoint) -> Cell {
        let size = self.resolution.get();
        Cell {
            row: (point.lat * lat_degree_length() / size).floor() as i64,
            col: (point.lon * lon_degree_length(point.lat) / size).floor() as i64,
        }
    }

    /// The entry for the point's cell, created via the factory if absent.
    pub fn add_entry_at(&mut self, point: &GeoPoint) -> &mut E {
        let cell = self.cell_of(point);
        self.cells
            .entry(cell)
            .or_insert_with(|| (self.new_entry)())
    }

    /// The entry for the point's cell, if the cell is occupied.
    pub fn entry_at(&self, point: &GeoPoint) -> Option<&E> {
        self.cells.get(&self.cell_of(point))
    }

    pub fn entry_at_mut(&mut self, point: &GeoPoint) -> Option<&mut E> {
        let cell = self.cell_of(point);
        self.cells.get_mut(&cell)
    }

    pub(crate) fn entry_in_cell(&self, cell: Cell) -> Option<&E> {
        self.cells.get(&cell)
    }

    pub(crate) fn iter_cells(&self) -> impl Iterator<Item = (&Cell, &E)> {
        self.cells.iter()
    }

    /// The bounding (min row, max row, min col, max col) of all occupied
    /// cells, or `None` when the grid is empty.
    pub(crate) fn cell_bounds(&self) -> Option<(i64, i64, i64, i64)> {
        let mut bounds: Option<(i64, i64, i64, i64)> = None;
        for cell in self.cells.keys() {
            bounds = Some(match bounds {
                None => (cell.row, cell.row, cell.col, cell.col),
                Some((min_row, max_row, min_col, max_col)) => (
                    min_row.min(cell.row),
                    max_row.max(cell.row),
                    min_col.min(cell.col),
                    max_col.max(cell.col),
                ),
            });
        }
        bounds
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Every occupied cell entry in the rectangle spanned by `top_left`
    /// (larger latitude, smaller longitude) and `bottom_right`, enumerated
    /// row-major over the inclusive cell span.
    ///
    /// An empty span yields an empty vector. An inverted rectangle, where
    /// the bottom-right latitude exceeds the top-left latitude, is an
    /// [`GeoGridError::InvalidRange`] rather than a silently empty result.
    pub fn range(&self, top_left: &GeoPoint, bottom_right: &GeoPoint) -> Result<Vec<&E>> {
        if bottom_right.lat > top_left.lat {
            return Err(GeoGridError::InvalidRange {
                top_left_lat: top_left.lat,
                bottom_right_lat: bottom_right.lat,
            });
        }

        let top_left_cell = self.cell_of(top_left);
        let bottom_right_cell = self.cell_of(bottom_right);

        let mut entries = Vec::new();
        for row in bottom_right_cell.row..=top_left_cell.row {
            for col in top_left_cell.col..=bottom_right_cell.col {
                if let Some(entry) = self.cells.get(&Cell { row, col }) {
                    entries.push(entry);
                }
            }
        }

        Ok(entries)
    }
}
