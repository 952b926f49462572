//! Grid geometry: shapes, flat row-major indices and the 3x3 neighborhood

use crate::error::{Error, Result};

/// Offsets (row, col) of the eight neighbors of a cell, in row-major order:
/// ```text
///   0  1  2
///   3  .  4
///   5  6  7
/// ```
pub const NEIGHBORS: [(isize, isize); 8] = [
    (-1, -1), // NW
    (-1, 0),  // N
    (-1, 1),  // NE
    (0, -1),  // W
    (0, 1),   // E
    (1, -1),  // SW
    (1, 0),   // S
    (1, 1),   // SE
];

/// Maximum number of cells draining into a single cell.
pub const MAX_FAN_IN: usize = NEIGHBORS.len();

/// Dimensions of a raster grid.
///
/// Cells are addressed either by `(row, col)` or by their flat row-major
/// index `row * cols + col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensions as (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Flat index of (row, col)
    #[inline]
    pub fn flat(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// (row, col) of a flat index
    #[inline]
    pub fn row_col(&self, idx: usize) -> (usize, usize) {
        (idx / self.cols, idx % self.cols)
    }

    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        idx < self.len()
    }

    /// Check that a flat index lies inside the grid
    pub fn check(&self, idx: usize) -> Result<()> {
        if self.contains(idx) {
            Ok(())
        } else {
            Err(Error::IndexOutOfBounds {
                index: idx,
                size: self.len(),
            })
        }
    }

    /// Flat index of the cell at offset (dr, dc) from `idx`, or `None` if
    /// that cell lies outside the grid.
    #[inline]
    pub fn offset(&self, idx: usize, dr: isize, dc: isize) -> Option<usize> {
        let (row, col) = self.row_col(idx);
        let nr = row as isize + dr;
        let nc = col as isize + dc;
        if nr < 0 || nc < 0 || nr >= self.rows as isize || nc >= self.cols as isize {
            return None;
        }
        Some(self.flat(nr as usize, nc as usize))
    }

    /// Offset (dr, dc) leading from `idx` to `idx_ds`, if the two cells are
    /// equal or 8-connected neighbors.
    pub fn offset_between(&self, idx: usize, idx_ds: usize) -> Option<(isize, isize)> {
        let (r0, c0) = self.row_col(idx);
        let (r1, c1) = self.row_col(idx_ds);
        let dr = r1 as isize - r0 as isize;
        let dc = c1 as isize - c0 as isize;
        if dr.abs() <= 1 && dc.abs() <= 1 {
            Some((dr, dc))
        } else {
            None
        }
    }

    /// In-grid neighbors of `idx` with the offset leading to each of them
    pub fn neighbors(&self, idx: usize) -> impl Iterator<Item = (usize, (isize, isize))> + '_ {
        NEIGHBORS
            .iter()
            .filter_map(move |&(dr, dc)| self.offset(idx, dr, dc).map(|n| (n, (dr, dc))))
    }
}

impl From<(usize, usize)> for GridShape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Self { rows, cols }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_roundtrip() {
        let shape = GridShape::new(3, 4);
        assert_eq!(shape.len(), 12);
        assert_eq!(shape.flat(2, 1), 9);
        assert_eq!(shape.row_col(9), (2, 1));
    }

    #[test]
    fn test_offset_edges() {
        let shape = GridShape::new(3, 3);
        assert_eq!(shape.offset(4, -1, -1), Some(0));
        assert_eq!(shape.offset(0, -1, 0), None);
        assert_eq!(shape.offset(2, 0, 1), None, "must not wrap to the next row");
        assert_eq!(shape.offset(8, 1, 1), None);
    }

    #[test]
    fn test_offset_between() {
        let shape = GridShape::new(3, 3);
        assert_eq!(shape.offset_between(0, 4), Some((1, 1)));
        assert_eq!(shape.offset_between(4, 4), Some((0, 0)));
        assert_eq!(shape.offset_between(0, 8), None);
        // 2 and 3 are consecutive flat indices but not neighbors
        assert_eq!(shape.offset_between(2, 3), None);
    }

    #[test]
    fn test_neighbors_corner() {
        let shape = GridShape::new(3, 3);
        let n: Vec<usize> = shape.neighbors(0).map(|(i, _)| i).collect();
        assert_eq!(n, vec![1, 3, 4]);
        assert_eq!(shape.neighbors(4).count(), 8);
    }
}
