//! PCRaster local drain direction (LDD)
//!
//! Keypad layout:
//! ```text
//!   7  8  9
//!   4  5  6
//!   1  2  3
//! ```
//! 5 = pit, 255 = nodata

use ndarray::{arr2, Array2, ArrayD, ArrayViewD};

use super::{
    code_for_offset, flat_codes, flat_grid, offset_for_code, CodeClass, FlowDirScheme, FlowDirType,
};
use crate::error::Result;
use crate::grid::GridShape;

const TABLE: [(u8, (isize, isize)); 8] = [
    (1, (1, -1)),
    (2, (1, 0)),
    (3, (1, 1)),
    (4, (0, -1)),
    (6, (0, 1)),
    (7, (-1, -1)),
    (8, (-1, 0)),
    (9, (-1, 1)),
];

const PIT: u8 = 5;
const NODATA: u8 = 255;

/// PCRaster LDD scheme
#[derive(Debug, Clone, Copy, Default)]
pub struct Ldd;

impl Ldd {
    /// 3x3 grid with every outer cell draining into a central pit
    pub fn us_grid() -> Array2<u8> {
        arr2(&[[3, 2, 1], [6, 5, 4], [9, 8, 7]])
    }

    /// 3x3 grid of pits
    pub fn pit_grid() -> Array2<u8> {
        Array2::from_elem((3, 3), PIT)
    }
}

impl FlowDirScheme for Ldd {
    type Elem = u8;
    type Code = u8;

    const NAME: &'static str = "ldd";
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
