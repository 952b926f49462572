//! Conversion between flow direction schemes
//!
//! Every scheme has one pit code, one nodata code and a code for each of the
//! eight neighbor offsets, so converting A -> B -> A reproduces the input.

use ndarray::{ArrayD, ArrayViewD};

use super::{CodeClass, FlowDirScheme, Ldd, D8};
use crate::error::{Error, Result};

/// Convert a single code from scheme `A` to scheme `B`.
pub fn convert_code<A: FlowDirScheme, B: FlowDirScheme>(code: A::Code) -> Result<B::Code> {
    let invalid = || Error::InvalidCode {
        index: 0,
        code: format!("{:?}", code),
    };
    match A::classify(code).ok_or_else(invalid)? {
        CodeClass::Nodata => Ok(B::nodata()),
        CodeClass::Pit => Ok(B::pit()),
        CodeClass::Flow(dr, dc) => B::from_offset(dr, dc).ok_or_else(invalid),
    }
}

/// Convert a raster from scheme `A` to scheme `B`, element-wise.
///
/// Unrecognized codes are an error, reported with their flat index.
pub fn convert<A: FlowDirScheme, B: FlowDirScheme>(
    grid: ArrayViewD<'_, A::Elem>,
) -> Result<ArrayD<B::Elem>> {
    let (codes, shape) = A::codes(grid)?;
    let converted = codes
        .iter()
        .enumerate()
        .map(|(idx, &code)| {
            convert_code::<A, B>(code).map_err(|_| Error::InvalidCode {
                index: idx,
                code: format!("{:?}", code),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    B::grid(&converted, shape)
}

/// Convert a D8 raster to LDD
pub fn d8_to_ldd(grid: ArrayViewD<'_, u8>) -> Result<ArrayD<u8>> {
    convert::<D8, Ldd>(grid)
}

/// Convert an LDD raster to D8
pub fn ldd_to_d8(grid: ArrayViewD<'_, u8>) -> Result<ArrayD<u8>> {
    convert::<Ldd, D8>(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flwdir::OffsetPair;
    use ndarray::arr2;

    /// Pit, nodata and all flow codes of a scheme
    fn vocabulary<S: FlowDirScheme>() -> Vec<S::Code> {
        let mut codes = vec![S::pit(), S::nodata()];
        for dr in -1..=1 {
            for dc in -1..=1 {
                if dr != 0 || dc != 0 {
                    codes.push(S::from_offset(dr, dc).unwrap());
                }
            }
        }
        codes
    }

    fn assert_bijective<A: FlowDirScheme, B: FlowDirScheme>() {
        for code in vocabulary::<A>() {
            let there = convert_code::<A, B>(code).unwrap();
            let back = convert_code::<B, A>(there).unwrap();
            assert_eq!(back, code, "{} -> {} -> {}", A::NAME, B::NAME, A::NAME);
        }
    }

    #[test]
    fn test_conversion_bijective() {
        assert_bijective::<D8, Ldd>();
        assert_bijective::<Ldd, D8>();
        assert_bijective::<D8, OffsetPair>();
        assert_bijective::<OffsetPair, D8>();
        assert_bijective::<Ldd, OffsetPair>();
        assert_bijective::<OffsetPair, Ldd>();
    }

    #[test]
    fn test_conversion_grids() {
        let ldd = ldd_to_d8(Ldd::pit_grid().into_dyn().view()).unwrap();
        assert_eq!(d8_to_ldd(ldd.view()).unwrap(), Ldd::pit_grid().into_dyn());

        let d8 = d8_to_ldd(D8::us_grid().into_dyn().view()).unwrap();
        assert_eq!(d8, Ldd::us_grid().into_dyn());
        assert_eq!(ldd_to_d8(d8.view()).unwrap(), D8::us_grid().into_dyn());

        let pairs = convert::<D8, OffsetPair>(D8::us_grid().into_dyn().view()).unwrap();
        assert_eq!(pairs, OffsetPair::us_grid().into_dyn());
    }

    #[test]
    fn test_conversion_rejects_unknown_code() {
        let grid = arr2(&[[1u8, 3]]);
        let result = d8_to_ldd(grid.into_dyn().view());
        assert!(matches!(result, Err(Error::InvalidCode { index: 1, .. })), "got {:?}", result);
    }
}
