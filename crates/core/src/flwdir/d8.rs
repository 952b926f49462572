//! D8 bit-flag flow directions
//!
//! ```text
//!  32  64 128
//!  16   0   1
//!   8   4   2
//! ```
//! 0 = pit, 247 = nodata

use ndarray::{arr2, Array2, ArrayD, ArrayViewD};

use super::{
    code_for_offset, flat_codes, flat_grid, offset_for_code, CodeClass, FlowDirScheme, FlowDirType,
};
use crate::error::Result;
use crate::grid::GridShape;

/// Code table: (code, (row offset, col offset))
const TABLE: [(u8, (isize, isize)); 8] = [
    (1, (0, 1)),     // E
    (2, (1, 1)),     // SE
    (4, (1, 0)),     // S
    (8, (1, -1)),    // SW
    (16, (0, -1)),   // W
    (32, (-1, -1)),  // NW
    (64, (-1, 0)),   // N
    (128, (-1, 1)),  // NE
];

const PIT: u8 = 0;
const NODATA: u8 = 247;

/// D8 bit-flag scheme
#[derive(Debug, Clone, Copy, Default)]
pub struct D8;

impl D8 {
    /// 3x3 grid with every outer cell draining into a central pit
    pub fn us_grid() -> Array2<u8> {
        arr2(&[[2, 4, 8], [1, 0, 16], [128, 64, 32]])
    }

    /// 3x3 grid of pits
    pub fn pit_grid() -> Array2<u8> {
        Array2::from_elem((3, 3), PIT)
    }
}

impl FlowDirScheme for D8 {
    type Elem = u8;
    type Code = u8;

    const NAME: &'static str = "d8";
    const FTYPE: FlowDirType = FlowDirType::Flat;

    fn pit() -> u8 {
        PIT
    }

    fn nodata() -> u8 {
        NODATA
    }

    fn classify(code: u8) -> Option<CodeClass> {
        match code {
            PIT => Some(CodeClass::Pit),
            NODATA => Some(CodeClass::Nodata),
            _ => offset_for_code(&TABLE, code).map(|(dr, dc)| CodeClass::Flow(dr, dc)),
        }
    }

    fn from_offset(dr: isize, dc: isize) -> Option<u8> {
        if dr == 0 && dc == 0 {
            return Some(PIT);
        }
        code_for_offset(&TABLE, dr, dc)
    }

    fn codes(grid: ArrayViewD<'_, u8>) -> Result<(Vec<u8>, GridShape)> {
        flat_codes::<Self>(grid)
    }

    fn grid(codes: &[u8], shape: GridShape) -> Result<ArrayD<u8>> {
        flat_grid(codes, shape)
    }
}
