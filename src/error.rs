//! Error types for geogrid operations.

use thiserror::Error;

/// Errors surfaced by index operations.
///
/// Every other operation in the crate is total: removing an unknown id is a
/// no-op, re-adding an existing id is a move, and reading an empty aggregate
/// yields a zero-valued aggregate.
#[derive(Debug, Error, PartialEq)]
pub enum GeoGridError {
    /// The operation is not defined for this index variant, e.g. k-nearest
    /// on aggregated cells or cloning live expiry state.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// The query rectangle is inverted: its bottom-right corner lies above
    /// its top-left corner.
    #[error(
        "invalid range: bottom-right latitude {bottom_right_lat} exceeds top-left latitude {top_left_lat}"
    )]
    InvalidRange {
        top_left_lat: f64,
        bottom_right_lat: f64,
    },
}

pub type Result<T> = std::result::Result<T, GeoGridError>;
