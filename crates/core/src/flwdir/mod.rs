//! Flow direction code schemes
//!
//! A scheme defines how a single raster cell encodes the direction in which
//! it drains. Every code of a scheme belongs to exactly one class:
//! - a flow code pointing at one of the eight neighbors,
//! - a pit code (flow terminates in the cell),
//! - a nodata code (cell is not part of the network).
//!
//! Three schemes are provided:
//! - [`D8`]: ESRI-style bit flags (`u8`, one 2-D grid)
//! - [`Ldd`]: PCRaster local drain direction, keypad layout (`u8`, one 2-D grid)
//! - [`OffsetPair`]: relative (dx, dy) offsets (`i32`, a `(2, rows, cols)` grid)
//!
//! All parsing, serialization and point lookups are written once against
//! [`FlowDirScheme`]; schemes only provide their vocabulary and layout.

mod conversion;
mod d8;
mod ldd;
mod offset_pair;

pub use conversion::{convert, convert_code, d8_to_ldd, ldd_to_d8};
pub use d8::D8;
pub use ldd::Ldd;
pub use offset_pair::OffsetPair;

use std::fmt::Debug;

use ndarray::{Array2, ArrayD, ArrayViewD, Ix2};

use crate::error::{Error, Result};
use crate::grid::GridShape;
use crate::network::FlowNetwork;

/// Raster layout of a scheme, so generic callers can branch on the
/// expected raster rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirType {
    /// One code per cell in a `(rows, cols)` grid
    Flat,
    /// Two layers per cell in a `(2, rows, cols)` grid
    Paired,
}

impl FlowDirType {
    /// Number of dimensions of a raster in this layout
    pub fn ndim(&self) -> usize {
        match self {
            FlowDirType::Flat => 2,
            FlowDirType::Paired => 3,
        }
    }

    /// Expected raster shape, for error messages
    pub fn layout(&self) -> &'static str {
        match self {
            FlowDirType::Flat => "(rows, cols)",
            FlowDirType::Paired => "(2, rows, cols)",
        }
    }

    /// True if a raster of `shape` has this layout's rank (and, for paired
    /// rasters, two layers)
    pub fn accepts(&self, shape: &[usize]) -> bool {
        shape.len() == self.ndim() && (*self == FlowDirType::Flat || shape[0] == 2)
    }
}

/// Class of a recognized direction code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeClass {
    /// Flows to the neighbor at (row offset, col offset)
    Flow(isize, isize),
    Pit,
    Nodata,
}

/// A flow direction encoding.
///
/// Implementors describe the vocabulary (`classify`, `from_offset`) and the
/// raster layout (`codes`, `grid`); everything else is provided.
pub trait FlowDirScheme: Sized {
    /// Element type of the raw raster
    type Elem: Copy + PartialEq + Debug + Send + Sync + 'static;
    /// Direction code of a single cell
    type Code: Copy + PartialEq + Debug + Send + Sync + 'static;

    /// Short scheme name
    const NAME: &'static str;
    /// Raster layout tag
    const FTYPE: FlowDirType;

    /// The pit code
    fn pit() -> Self::Code;

    /// The nodata code
    fn nodata() -> Self::Code;

    /// Classify a code, `None` if it is not part of the vocabulary
    fn classify(code: Self::Code) -> Option<CodeClass>;

    /// Code for a neighbor offset; `(0, 0)` gives the pit code
    fn from_offset(dr: isize, dc: isize) -> Option<Self::Code>;

    /// Flatten a raw raster into row-major codes, checking its rank
    fn codes(grid: ArrayViewD<'_, Self::Elem>) -> Result<(Vec<Self::Code>, GridShape)>;

    /// Build a raw raster from row-major codes
    fn grid(codes: &[Self::Code], shape: GridShape) -> Result<ArrayD<Self::Elem>>;

    /// Reject rasters whose rank does not match [`Self::FTYPE`]
    fn check_rank(grid: &ArrayViewD<'_, Self::Elem>) -> Result<()> {
        if Self::FTYPE.accepts(grid.shape()) {
            Ok(())
        } else {
            Err(Error::Shape {
                expected: Self::FTYPE.layout().to_string(),
                actual: grid.shape().to_vec(),
            })
        }
    }

    fn is_code_valid(code: Self::Code) -> bool {
        Self::classify(code).is_some()
    }

    fn ispit(code: Self::Code) -> bool {
        matches!(Self::classify(code), Some(CodeClass::Pit))
    }

    fn isnodata(code: Self::Code) -> bool {
        matches!(Self::classify(code), Some(CodeClass::Nodata))
    }

    /// True if the raster has the expected rank and only contains codes of
    /// this scheme.
    fn isvalid(grid: ArrayViewD<'_, Self::Elem>) -> bool {
        match Self::codes(grid) {
            Ok((codes, _)) => codes.iter().all(|&code| Self::is_code_valid(code)),
            Err(_) => false,
        }
    }

    /// Parse a raw raster into a compressed flow network.
    fn from_flwdir(grid: ArrayViewD<'_, Self::Elem>) -> Result<FlowNetwork> {
        let (codes, shape) = Self::codes(grid)?;
        FlowNetwork::from_codes::<Self>(&codes, shape)
    }

    /// Encode a compressed network back into a raw raster.
    ///
    /// `downstream` holds local indices into `valid`; cells outside `valid`
    /// get the nodata code.
    fn to_flwdir(
        valid: &[usize],
        downstream: &[usize],
        shape: GridShape,
    ) -> Result<ArrayD<Self::Elem>> {
        if valid.len() != downstream.len() {
            return Err(Error::SizeMismatch {
                expected: valid.len(),
                actual: downstream.len(),
            });
        }
        let mut codes = vec![Self::nodata(); shape.len()];
        for (&idx, &local_ds) in valid.iter().zip(downstream) {
            shape.check(idx)?;
            let idx_ds = *valid.get(local_ds).ok_or(Error::IndexOutOfBounds {
                index: local_ds,
                size: valid.len(),
            })?;
            codes[idx] = Self::idx_to_dd(idx, idx_ds, shape).ok_or_else(|| {
                Error::InvalidParameter {
                    name: "downstream",
                    value: idx_ds.to_string(),
                    reason: format!("not a neighbor of cell {}", idx),
                }
            })?;
        }
        Self::grid(&codes, shape)
    }

    /// Flat indices of the cells draining into `idx` on a raw code array.
    fn upstream(idx: usize, flat: &[Self::Code], shape: GridShape) -> Vec<usize> {
        if !shape.contains(idx) {
            return Vec::new();
        }
        shape
            .neighbors(idx)
            .filter(|&(n, _)| Self::downstream(n, flat, shape, None) == Some(idx))
            .map(|(n, _)| n)
            .collect()
    }

    /// Flat index the cell `idx` drains to on a raw code array.
    ///
    /// `dd` overrides the stored code when supplied. Returns `None` whenever
    /// the walk cannot continue: pit and nodata codes, unrecognized codes and
    /// flow leaving the grid all end up here. Callers that must tell a pit
    /// apart from the other cases check [`FlowDirScheme::ispit`] on the code.
    fn downstream(
        idx: usize,
        flat: &[Self::Code],
        shape: GridShape,
        dd: Option<Self::Code>,
    ) -> Option<usize> {
        if !shape.contains(idx) {
            return None;
        }
        let code = match dd {
            Some(code) => code,
            None => *flat.get(idx)?,
        };
        match Self::classify(code)? {
            CodeClass::Flow(dr, dc) => shape.offset(idx, dr, dc),
            CodeClass::Pit | CodeClass::Nodata => None,
        }
    }

    /// Code that makes `idx` drain into `idx_ds`.
    ///
    /// Gives the pit code if both are the same cell and `None` if they are
    /// not neighbors.
    fn idx_to_dd(idx: usize, idx_ds: usize, shape: GridShape) -> Option<Self::Code> {
        if !shape.contains(idx) || !shape.contains(idx_ds) {
            return None;
        }
        let (dr, dc) = shape.offset_between(idx, idx_ds)?;
        Self::from_offset(dr, dc)
    }

    /// Upstream neighbor of `idx` with the largest weight, ignoring
    /// neighbors weighted below `min_weight`. The first maximum wins.
    ///
    /// `weights` holds one value per grid cell.
    fn upstream_main(
        idx: usize,
        flat: &[Self::Code],
        weights: &[f64],
        shape: GridShape,
        min_weight: f64,
    ) -> Result<Option<usize>> {
        if weights.len() != shape.len() {
            return Err(Error::SizeMismatch {
                expected: shape.len(),
                actual: weights.len(),
            });
        }
        let mut best = None;
        let mut best_weight = f64::NEG_INFINITY;
        for n in Self::upstream(idx, flat, shape) {
            let w = weights[n];
            if w >= min_weight && w > best_weight {
                best_weight = w;
                best = Some(n);
            }
        }
        Ok(best)
    }
}

/// Code lookup by neighbor offset in a scheme's code table
pub(crate) fn code_for_offset<C: Copy>(
    table: &[(C, (isize, isize))],
    dr: isize,
    dc: isize,
) -> Option<C> {
    table
        .iter()
        .find(|(_, offset)| *offset == (dr, dc))
        .map(|&(code, _)| code)
}

/// Neighbor offset lookup by code in a scheme's code table
pub(crate) fn offset_for_code<C: Copy + PartialEq>(
    table: &[(C, (isize, isize))],
    code: C,
) -> Option<(isize, isize)> {
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|&(_, offset)| offset)
}

/// Row-major codes of a flat `(rows, cols)` raster of scheme `S`
pub(crate) fn flat_codes<S: FlowDirScheme>(
    grid: ArrayViewD<'_, S::Elem>,
) -> Result<(Vec<S::Elem>, GridShape)> {
    S::check_rank(&grid)?;
    let view = grid
        .into_dimensionality::<Ix2>()
        .map_err(|e| Error::Other(e.to_string()))?;
    let shape = GridShape::from(view.dim());
    Ok((view.iter().copied().collect(), shape))
}

/// Flat `(rows, cols)` raster from row-major codes
pub(crate) fn flat_grid<T: Copy>(codes: &[T], shape: GridShape) -> Result<ArrayD<T>> {
    if codes.len() != shape.len() {
        return Err(Error::SizeMismatch {
            expected: shape.len(),
            actual: codes.len(),
        });
    }
    let grid = Array2::from_shape_vec(shape.dim(), codes.to_vec())
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(grid.into_dyn())
}
