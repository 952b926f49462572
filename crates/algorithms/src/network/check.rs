//! Structural check of a raw flow direction raster
//!
//! Unlike [`FlowDirScheme::from_flwdir`], the check does not stop at the
//! first problem: it walks every cell downstream and reports unrecognized
//! codes, pits and cells caught in cycles.

use ndarray::ArrayViewD;
use tracing::warn;

use flowgrid_core::flwdir::FlowDirScheme;
use flowgrid_core::{GridShape, Result};

/// Outcome of [`check_flwdir`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowDirCheck {
    /// Flat indices of codes outside the scheme's vocabulary
    pub invalid: Vec<usize>,
    /// Number of pit cells
    pub n_pits: usize,
    /// Flat indices of cells on or draining into a cycle, ascending
    pub loops: Vec<usize>,
}

impl FlowDirCheck {
    pub fn has_invalid(&self) -> bool {
        !self.invalid.is_empty()
    }

    pub fn has_loops(&self) -> bool {
        !self.loops.is_empty()
    }

    /// No invalid codes and no loops
    pub fn is_ok(&self) -> bool {
        !self.has_invalid() && !self.has_loops()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnPath,
    Drains,
    Loops,
}

/// Check a raw raster of scheme `S`.
///
/// Fails only if the raster does not have the scheme's rank.
pub fn check_flwdir<S: FlowDirScheme>(grid: ArrayViewD<'_, S::Elem>) -> Result<FlowDirCheck> {
    let (codes, shape) = S::codes(grid)?;
    Ok(check_codes::<S>(&codes, shape))
}

/// Check row-major codes of scheme `S`.
pub fn check_codes<S: FlowDirScheme>(codes: &[S::Code], shape: GridShape) -> FlowDirCheck {
    let mut report = FlowDirCheck::default();
    for (idx, &code) in codes.iter().enumerate() {
        if !S::is_code_valid(code) {
            report.invalid.push(idx);
        } else if S::ispit(code) {
            report.n_pits += 1;
        }
    }

    let mut state = vec![Visit::New; codes.len()];
    let mut path = Vec::new();
    for start in 0..codes.len() {
        if state[start] != Visit::New {
            continue;
        }
        let mut idx = start;
        let outcome = loop {
            match state[idx] {
                Visit::OnPath | Visit::Loops => break Visit::Loops,
                Visit::Drains => break Visit::Drains,
                Visit::New => {}
            }
            state[idx] = Visit::OnPath;
            path.push(idx);
            match S::downstream(idx, codes, shape, None) {
                Some(idx_ds) => idx = idx_ds,
                None => break Visit::Drains,
            }
        };
        for &p in &path {
            state[p] = outcome;
        }
        path.clear();
    }

    report.loops = state
        .iter()
        .enumerate()
        .filter(|(_, &s)| s == Visit::Loops)
        .map(|(i, _)| i)
        .collect();
    if report.has_loops() {
        warn!("{} flow directions: {} cells in loops", S::NAME, report.loops.len());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgrid_core::flwdir::{Ldd, OffsetPair, D8};
    use ndarray::arr2;

    #[test]
    fn test_check_valid_grid() {
        let report = check_flwdir::<D8>(D8::us_grid().into_dyn().view()).unwrap();
        assert!(report.is_ok());
        assert_eq!(report.n_pits, 1);
    }

    #[test]
    fn test_check_loop_and_invalid() {
        // 6 4 0   cells 0 and 1 point at each other; 0 is not an LDD code
        // 5 5 5
        let grid = arr2(&[[6u8, 4, 0], [5, 5, 5]]);
        let report = check_flwdir::<Ldd>(grid.into_dyn().view()).unwrap();
        assert_eq!(report.loops, vec![0, 1]);
        assert_eq!(report.invalid, vec![2]);
        assert_eq!(report.n_pits, 3);
        assert!(!report.is_ok());
    }

    #[test]
    fn test_check_feeding_into_loop() {
        // 6 4 4: cell 2 drains into the 0 <-> 1 cycle
        let grid = arr2(&[[6u8, 4, 4]]);
        let report = check_flwdir::<Ldd>(grid.into_dyn().view()).unwrap();
        assert_eq!(report.loops, vec![0, 1, 2]);
    }

    #[test]
    fn test_check_rank_error() {
        let grid = arr2(&[[0i32, 0]]);
        assert!(check_flwdir::<OffsetPair>(grid.into_dyn().view()).is_err());
    }
}
