//! In-memory geospatial point index with range queries, k-nearest search,
//! time-windowed expiry, and multi-resolution clustering.
//!
//! Points are identified (lat, lon) pairs hashed into fixed-size grid cells.
//! [`PointsIndex`] answers rectangular range queries and expanding-ring
//! k-nearest-neighbor searches over raw points; [`CountIndex`] collapses
//! each cell into a centroid and count; [`ClusteringIndex`] composes both at
//! street, city, and world resolutions and routes queries by viewport size.
//! The expiring variants drop entries once their most recent add ages past a
//! configured window, evaluated lazily against an injectable clock.
//!
//! ```rust
//! use geogrid::{ClusteringIndex, GeoPoint, Meters, RangeResult};
//!
//! let mut index = ClusteringIndex::new();
//! index.add(GeoPoint::new("embankment", 51.507312, -0.122367));
//! index.add(GeoPoint::new("oxford-circus", 51.515110, -0.141700));
//!
//! let top_left = GeoPoint::new("tl", 51.52, -0.15);
//! let bottom_right = GeoPoint::new("br", 51.50, -0.11);
//! match index.range(&top_left, &bottom_right)? {
//!     RangeResult::Points(points) => assert_eq!(points.len(), 2),
//!     RangeResult::Clusters(_) => unreachable!("narrow query"),
//! }
//!
//! let query = GeoPoint::new("query", 51.508, -0.125);
//! let nearest = index.k_nearest(&query, 1, Meters::from_km(2.0), |_| true);
//! assert_eq!(nearest[0].id, "embankment");
//! # Ok::<(), geogrid::GeoGridError>(())
//! ```
//!
//! Every index is a single-threaded data structure with no internal
//! synchronization; wrap externally for concurrent use.

pub mod clock;
pub mod clustering;
pub mod count_index;
pub mod counters;
pub mod error;
pub mod grid;
pub mod point;
pub mod points_index;
pub mod sets;
pub mod spatial;
pub mod units;

pub use clock::{Clock, ManualClock, SystemClock};
pub use clustering::{ClusteringIndex, RangeResult};
pub use count_index::CountIndex;
pub use counters::{AveragingCounter, CountPoint, Counter, ExpiringCounter, ExpiringMultiCounter};
pub use error::{GeoGridError, Result};
pub use grid::{Cell, EntryFactory, GridIndex};
pub use point::GeoPoint;
pub use points_index::PointsIndex;
pub use sets::ExpiringSet;
pub use spatial::{CompassDirection, approx_square_distance, bearing, direction, distance};
pub use units::{Meters, Minutes};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
