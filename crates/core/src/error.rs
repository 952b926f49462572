//! Error types for flowgrid

use thiserror::Error;

/// Main error type for flowgrid operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid grid shape: expected {expected}, got {actual:?}")]
    Shape { expected: String, actual: Vec<usize> },

    #[error("Invalid flow direction code {code} at index {index}")]
    InvalidCode { index: usize, code: String },

    #[error("Cell {index} flows outside the grid")]
    OutOfGrid { index: usize },

    #[error("Cell {index} flows into nodata cell {downstream}")]
    NodataDownstream { index: usize, downstream: usize },

    #[error("Index out of bounds: {index} in grid of size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("Size mismatch: expected {expected} values, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch2D { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Loop detected in flow path starting at cell {index}")]
    Loop { index: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for flowgrid operations
pub type Result<T> = std::result::Result<T, Error>;
