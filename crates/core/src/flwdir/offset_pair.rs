//! Relative offset pairs
//!
//! A `(2, rows, cols)` raster: layer 0 holds the column offset `dx` and
//! layer 1 the row offset `dy` of the downstream neighbor, both in `-1..=1`.
//! `(0, 0)` = pit, `(-9999, -9999)` = nodata.

use ndarray::{Array3, ArrayD, ArrayViewD, Axis, Ix3};

use super::{CodeClass, FlowDirScheme, FlowDirType};
use crate::error::{Error, Result};
use crate::grid::GridShape;

const NODATA: i32 = -9999;

/// Relative (dx, dy) offset pair scheme
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetPair;

impl OffsetPair {
    /// 3x3 grid with every outer cell draining into a central pit
    pub fn us_grid() -> Array3<i32> {
        Array3::from_shape_fn((2, 3, 3), |(layer, r, c)| match layer {
            0 => 1 - c as i32,
            _ => 1 - r as i32,
        })
    }

    /// 3x3 grid of pits
    pub fn pit_grid() -> Array3<i32> {
        Array3::zeros((2, 3, 3))
    }
}

impl FlowDirScheme for OffsetPair {
    type Elem = i32;
    type Code = (i32, i32);

    const NAME: &'static str = "dxdy";
    const FTYPE: FlowDirType = FlowDirType::Paired;

    fn pit() -> (i32, i32) {
        (0, 0)
    }

    fn nodata() -> (i32, i32) {
        (NODATA, NODATA)
    }

    fn classify((dx, dy): (i32, i32)) -> Option<CodeClass> {
        match (dx, dy) {
            (NODATA, NODATA) => Some(CodeClass::Nodata),
            (0, 0) => Some(CodeClass::Pit),
            (-1..=1, -1..=1) => Some(CodeClass::Flow(dy as isize, dx as isize)),
            _ => None,
        }
    }

    fn from_offset(dr: isize, dc: isize) -> Option<(i32, i32)> {
        if dr.abs() > 1 || dc.abs() > 1 {
            return None;
        }
        Some((dc as i32, dr as i32))
    }

    fn codes(grid: ArrayViewD<'_, i32>) -> Result<(Vec<(i32, i32)>, GridShape)> {
        Self::check_rank(&grid)?;
        let view = grid
            .into_dimensionality::<Ix3>()
            .map_err(|e| Error::Other(e.to_string()))?;
        let dx = view.index_axis(Axis(0), 0);
        let dy = view.index_axis(Axis(0), 1);
        let shape = GridShape::from(dx.dim());
        let codes = dx.iter().zip(dy.iter()).map(|(&x, &y)| (x, y)).collect();
        Ok((codes, shape))
    }

    fn grid(codes: &[(i32, i32)], shape: GridShape) -> Result<ArrayD<i32>> {
        if codes.len() != shape.len() {
            return Err(Error::SizeMismatch {
                expected: shape.len(),
                actual: codes.len(),
            });
        }
        let mut grid = Array3::from_elem((2, shape.rows, shape.cols), NODATA);
        for (idx, &(dx, dy)) in codes.iter().enumerate() {
            let (r, c) = shape.row_col(idx);
            grid[(0, r, c)] = dx;
            grid[(1, r, c)] = dy;
        }
        Ok(grid.into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::MV;
    use ndarray::{arr2, stack};

    #[test]
    fn test_offset_pair_isvalid() {
        assert!(OffsetPair::isvalid(OffsetPair::us_grid().into_dyn().view()));
        let invalid = arr2(&[[2, 4, 8], [10, 0, -1]]);
        let stacked = stack(Axis(0), &[invalid.view(), invalid.view()]).unwrap();
        assert!(!OffsetPair::isvalid(stacked.into_dyn().view()));
        // a flat grid has the wrong rank
        assert!(!OffsetPair::isvalid(invalid.into_dyn().view()));
    }

    #[test]
    fn test_offset_pair_classes() {
        assert!(OffsetPair::ispit((0, 0)));
        assert!(OffsetPair::isnodata((NODATA, NODATA)));
        assert_eq!(OffsetPair::classify((NODATA, 0)), None, "mixed nodata");
        assert_eq!(OffsetPair::classify((1, -1)), Some(CodeClass::Flow(-1, 1)));
    }

    #[test]
    fn test_offset_pair_leading_axis_error() {
        let grid = Array3::<i32>::zeros((3, 3, 3));
        let result = OffsetPair::from_flwdir(grid.into_dyn().view());
        assert!(matches!(result, Err(Error::Shape { .. })), "got {:?}", result);
    }

    #[test]
    fn test_offset_pair_invalid_code() {
        // dx = 2 at (0, 1)
        let dx = arr2(&[[1, 2, 0]]);
        let dy = arr2(&[[0, 0, 0]]);
        let grid = stack(Axis(0), &[dx.view(), dy.view()]).unwrap();
        let result = OffsetPair::from_flwdir(grid.into_dyn().view());
        assert_eq!(
            result.unwrap_err(),
            Error::InvalidCode {
                index: 1,
                code: "(2, 0)".to_string(),
            }
        );
    }

    #[test]
    fn test_offset_pair_converging_roundtrip() {
        let us = OffsetPair::us_grid();
        let net = OffsetPair::from_flwdir(us.view().into_dyn()).unwrap();
        assert_eq!(net.shape(), GridShape::new(3, 3));
        assert_eq!(net.pits(), &[4]);
        assert!(net.downstream().iter().all(|&ds| ds == 4));
        assert_eq!(net.upstream().row(4).to_vec(), vec![0, 1, 2, 3, 5, 6, 7, 8]);
        let back = OffsetPair::to_flwdir(net.valid(), net.downstream(), net.shape()).unwrap();
        assert_eq!(back, us.into_dyn());
    }

    #[test]
    fn test_offset_pair_all_pits() {
        let net = OffsetPair::from_flwdir(OffsetPair::pit_grid().into_dyn().view()).unwrap();
        assert_eq!(net.valid(), net.pits());
        assert!(net.upstream().iter().all(|&u| u == MV));
    }

    #[test]
    fn test_offset_pair_idx_to_dd() {
        let shape = GridShape::new(3, 3);
        assert_eq!(OffsetPair::idx_to_dd(0, 4, shape), Some((1, 1)));
        assert_eq!(OffsetPair::idx_to_dd(5, 4, shape), Some((-1, 0)));
        assert_eq!(OffsetPair::idx_to_dd(4, 4, shape), Some((0, 0)));
    }
}
