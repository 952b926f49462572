//! Upstream lookups on the upstream index matrix

use ndarray::ArrayView2;

use crate::maybe_rayon::*;
use flowgrid_core::network::MV;
use flowgrid_core::{Error, Result};

fn check_row(idx: usize, upstream: &ArrayView2<'_, usize>) -> Result<()> {
    if idx >= upstream.nrows() {
        return Err(Error::IndexOutOfBounds {
            index: idx,
            size: upstream.nrows(),
        });
    }
    Ok(())
}

/// Local indices of the cells draining into `idx`.
pub fn upstream(idx: usize, upstream: ArrayView2<'_, usize>) -> Result<Vec<usize>> {
    check_row(idx, &upstream)?;
    Ok(upstream
        .row(idx)
        .iter()
        .copied()
        .filter(|&u| u != MV)
        .collect())
}

/// Local indices of the cells draining into any of `idxs`, row by row.
pub fn upstream_many(idxs: &[usize], upstream: ArrayView2<'_, usize>) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for &idx in idxs {
        check_row(idx, &upstream)?;
        out.extend(upstream.row(idx).iter().copied().filter(|&u| u != MV));
    }
    Ok(out)
}

/// Main upstream cell of each of `idxs`: the upstream neighbor with the
/// largest weight. Ties keep the first neighbor in the row; cells without
/// upstream neighbors give [`MV`].
///
/// # Arguments
/// * `idxs` - Local indices to query
/// * `upstream` - Upstream index matrix
/// * `weights` - One weight per local index (e.g. upstream area)
pub fn main_upstream<T>(
    idxs: &[usize],
    upstream: ArrayView2<'_, usize>,
    weights: &[T],
) -> Result<Vec<usize>>
where
    T: PartialOrd + Copy + Send + Sync,
{
    if weights.len() != upstream.nrows() {
        return Err(Error::SizeMismatch {
            expected: upstream.nrows(),
            actual: weights.len(),
        });
    }
    idxs.into_par_iter()
        .map(|&idx| {
            check_row(idx, &upstream)?;
            let mut best = MV;
            let mut best_weight: Option<T> = None;
            for &idx_us in upstream.row(idx) {
                if idx_us == MV {
                    continue;
                }
                let w = *weights.get(idx_us).ok_or(Error::IndexOutOfBounds {
                    index: idx_us,
                    size: weights.len(),
                })?;
                if best_weight.map_or(true, |bw| w > bw) {
                    best_weight = Some(w);
                    best = idx_us;
                }
            }
            Ok(best)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgrid_core::flwdir::{FlowDirScheme, D8};
    use flowgrid_core::FlowNetwork;

    fn converging() -> FlowNetwork {
        D8::from_flwdir(D8::us_grid().into_dyn().view()).unwrap()
    }

    #[test]
    fn test_upstream_scalar_and_vector() {
        let net = converging();
        let us = net.upstream().view();
        assert_eq!(upstream(4, us).unwrap(), vec![0, 1, 2, 3, 5, 6, 7, 8]);
        assert!(upstream(0, us).unwrap().is_empty());
        assert_eq!(upstream_many(&[0, 4], us).unwrap().len(), 8);
        assert!(upstream(9, us).is_err());
    }

    #[test]
    fn test_main_upstream_uniform_weights() {
        let net = converging();
        let idxs: Vec<usize> = (0..net.len()).collect();
        let main = main_upstream(&idxs, net.upstream().view(), &vec![1.0; net.len()]).unwrap();
        let first: Vec<usize> = net.upstream().column(0).to_vec();
        assert_eq!(main, first);
        assert_eq!(main[4], 0);
        assert_eq!(main[0], MV);
    }

    #[test]
    fn test_main_upstream_largest_weight() {
        let net = converging();
        let mut weights = vec![1u32; net.len()];
        weights[6] = 10;
        weights[7] = 10;
        let main = main_upstream(&[4], net.upstream().view(), &weights).unwrap();
        assert_eq!(main, vec![6], "first of the two heaviest");
    }

    #[test]
    fn test_main_upstream_weight_size() {
        let net = converging();
        let result = main_upstream(&[4], net.upstream().view(), &[1.0, 2.0]);
        assert_eq!(
            result.unwrap_err(),
            Error::SizeMismatch { expected: 9, actual: 2 }
        );
    }
}
