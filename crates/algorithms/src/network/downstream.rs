//! River-masked downstream search

use crate::maybe_rayon::*;
use flowgrid_core::{Error, Result};

/// First cell flagged in `river` downstream of each start cell.
///
/// A start cell that is already flagged returns itself. Pits end the walk
/// even when they are not flagged.
///
/// # Arguments
/// * `starts` - Local indices to start from
/// * `downstream` - Local downstream array
/// * `river` - River flag per local index
///
/// # Errors
/// `Loop` if a walk does not end within as many steps as there are cells.
pub fn downstream_river(
    starts: &[usize],
    downstream: &[usize],
    river: &[bool],
) -> Result<Vec<usize>> {
    let n = downstream.len();
    if river.len() != n {
        return Err(Error::SizeMismatch {
            expected: n,
            actual: river.len(),
        });
    }
    starts
        .into_par_iter()
        .map(|&start| {
            if start >= n {
                return Err(Error::IndexOutOfBounds { index: start, size: n });
            }
            let mut idx = start;
            for _ in 0..=n {
                if river[idx] {
                    return Ok(idx);
                }
                let idx_ds = downstream[idx];
                if idx_ds == idx {
                    return Ok(idx);
                }
                if idx_ds >= n {
                    return Err(Error::IndexOutOfBounds { index: idx_ds, size: n });
                }
                idx = idx_ds;
            }
            Err(Error::Loop { index: start })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgrid_core::flwdir::{FlowDirScheme, Ldd};
    use ndarray::arr2;

    #[test]
    fn test_downstream_river_pit_only() {
        // 3 2 1
        // 6 5 4
        // 9 8 7
        let net = Ldd::from_flwdir(Ldd::us_grid().into_dyn().view()).unwrap();
        let mut river = vec![false; net.len()];
        for &pit in net.pits() {
            river[pit] = true;
        }
        let reached = downstream_river(&[0, 1, 2], net.downstream(), &river).unwrap();
        assert_eq!(reached, vec![4, 4, 4]);
    }

    #[test]
    fn test_downstream_river_stops_at_first_flag() {
        // 6 6 6 6 5
        let grid = arr2(&[[6u8, 6, 6, 6, 5]]);
        let net = Ldd::from_flwdir(grid.into_dyn().view()).unwrap();
        let river = vec![false, false, true, false, false];
        let reached = downstream_river(&[0, 2, 3], net.downstream(), &river).unwrap();
        // 2 is flagged itself; 3 is below the river and ends at the unflagged pit
        assert_eq!(reached, vec![2, 2, 4]);
    }

    #[test]
    fn test_downstream_river_loop() {
        let ds = vec![1, 0];
        let result = downstream_river(&[0], &ds, &[false, false]);
        assert_eq!(result.unwrap_err(), Error::Loop { index: 0 });
    }
}
