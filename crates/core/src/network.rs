//! Compressed flow network
//!
//! Valid (non-nodata) cells are renumbered by their rank in the sorted list
//! of their flat grid indices ("local" indices). The network is stored as
//! flat arrays over local indices:
//! - `valid`: flat grid index of each local index, ascending
//! - `downstream`: local index each cell drains to; pits point to themselves
//! - `upstream`: `(n, 8)` matrix of local indices draining into each cell,
//!   right-padded with [`MV`]
//! - `pits`: local indices of all pits

use ndarray::Array2;
use tracing::debug;

use crate::error::{Error, Result};
use crate::flwdir::{CodeClass, FlowDirScheme};
use crate::grid::{GridShape, MAX_FAN_IN};

/// Missing value: marks an absent index in every index array
pub const MV: usize = usize::MAX;

/// Flow network over the valid cells of a grid.
///
/// Built once and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowNetwork {
    shape: GridShape,
    valid: Vec<usize>,
    downstream: Vec<usize>,
    upstream: Array2<usize>,
    pits: Vec<usize>,
}

impl FlowNetwork {
    /// Build a network from row-major codes of scheme `S`.
    ///
    /// Fails on unrecognized codes, on flow leaving the grid and on flow
    /// into a nodata cell.
    pub fn from_codes<S: FlowDirScheme>(codes: &[S::Code], shape: GridShape) -> Result<Self> {
        if codes.len() != shape.len() {
            return Err(Error::SizeMismatch {
                expected: shape.len(),
                actual: codes.len(),
            });
        }

        let mut valid = Vec::new();
        for (idx, &code) in codes.iter().enumerate() {
            match S::classify(code) {
                Some(CodeClass::Nodata) => {}
                Some(_) => valid.push(idx),
                None => {
                    return Err(Error::InvalidCode {
                        index: idx,
                        code: format!("{:?}", code),
                    })
                }
            }
        }

        let local = local_lookup(&valid, shape.len());
        let mut downstream = Vec::with_capacity(valid.len());
        for (i, &idx) in valid.iter().enumerate() {
            let ds = match S::classify(codes[idx]) {
                Some(CodeClass::Flow(dr, dc)) => {
                    let idx_ds = shape
                        .offset(idx, dr, dc)
                        .ok_or(Error::OutOfGrid { index: idx })?;
                    let local_ds = local[idx_ds];
                    if local_ds == MV {
                        return Err(Error::NodataDownstream {
                            index: idx,
                            downstream: idx_ds,
                        });
                    }
                    local_ds
                }
                _ => i,
            };
            downstream.push(ds);
        }

        let network = Self::from_downstream(shape, valid, downstream)?;
        debug!(
            "{} network: {} valid cells, {} pits in {}x{} grid",
            S::NAME,
            network.len(),
            network.pits.len(),
            shape.rows,
            shape.cols
        );
        Ok(network)
    }

    /// Build a network from the valid cell indices and the local downstream
    /// array, deriving the upstream matrix and the pits.
    pub fn from_downstream(
        shape: GridShape,
        valid: Vec<usize>,
        downstream: Vec<usize>,
    ) -> Result<Self> {
        if valid.len() != downstream.len() {
            return Err(Error::SizeMismatch {
                expected: valid.len(),
                actual: downstream.len(),
            });
        }
        if let Some(&last) = valid.last() {
            shape.check(last)?;
        }
        if valid.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidParameter {
                name: "valid",
                value: format!("{} indices", valid.len()),
                reason: "indices must be strictly ascending".to_string(),
            });
        }
        let upstream = upstream_matrix(&downstream)?;
        let pits = downstream
            .iter()
            .enumerate()
            .filter(|&(i, &ds)| i == ds)
            .map(|(i, _)| i)
            .collect();
        Ok(Self {
            shape,
            valid,
            downstream,
            upstream,
            pits,
        })
    }

    /// Grid dimensions
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Number of valid cells
    pub fn len(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    /// Flat grid indices of the valid cells, ascending
    pub fn valid(&self) -> &[usize] {
        &self.valid
    }

    /// Local downstream index of every valid cell
    pub fn downstream(&self) -> &[usize] {
        &self.downstream
    }

    /// Upstream index matrix, `(len, 8)`
    pub fn upstream(&self) -> &Array2<usize> {
        &self.upstream
    }

    /// Local indices of the pits
    pub fn pits(&self) -> &[usize] {
        &self.pits
    }

    /// Local index of a flat grid index, `None` for nodata cells
    pub fn local(&self, idx: usize) -> Option<usize> {
        self.valid.binary_search(&idx).ok()
    }

    /// Consume the network into (valid, downstream, upstream, pits)
    pub fn into_parts(self) -> (Vec<usize>, Vec<usize>, Array2<usize>, Vec<usize>) {
        (self.valid, self.downstream, self.upstream, self.pits)
    }

    /// Scatter one value per valid cell back onto the full grid
    pub fn reshape<T: Copy>(&self, values: &[T], nodata: T) -> Result<Array2<T>> {
        reshape(values, &self.valid, self.shape, nodata)
    }
}

/// Dense flat -> local lookup, [`MV`] for cells outside `valid`
fn local_lookup(valid: &[usize], size: usize) -> Vec<usize> {
    let mut local = vec![MV; size];
    for (i, &idx) in valid.iter().enumerate() {
        local[idx] = i;
    }
    local
}

/// Upstream index matrix from a local downstream array.
///
/// Rows are filled in increasing local index order and padded with [`MV`].
pub fn upstream_matrix(downstream: &[usize]) -> Result<Array2<usize>> {
    let n = downstream.len();
    let mut upstream = Array2::from_elem((n, MAX_FAN_IN), MV);
    let mut fan_in = vec![0u8; n];
    for (i, &ds) in downstream.iter().enumerate() {
        if ds == i {
            continue;
        }
        if ds >= n {
            return Err(Error::IndexOutOfBounds { index: ds, size: n });
        }
        let k = fan_in[ds] as usize;
        if k >= MAX_FAN_IN {
            return Err(Error::InvalidParameter {
                name: "downstream",
                value: ds.to_string(),
                reason: format!("more than {} upstream cells", MAX_FAN_IN),
            });
        }
        upstream[(ds, k)] = i;
        fan_in[ds] += 1;
    }
    Ok(upstream)
}

/// Local indices of flat grid indices `query` within the ascending `valid`
/// list. Queries that are not valid cells map to [`MV`].
///
/// # Arguments
/// * `query` - Flat grid indices
/// * `valid` - Ascending flat indices of the valid cells
/// * `size` - Number of cells in the grid
pub fn internal_idx(query: &[usize], valid: &[usize], size: usize) -> Result<Vec<usize>> {
    query
        .iter()
        .map(|&idx| {
            if idx >= size {
                return Err(Error::IndexOutOfBounds { index: idx, size });
            }
            Ok(valid.binary_search(&idx).unwrap_or(MV))
        })
        .collect()
}

/// Scatter `values` (one per valid cell, in `valid` order) into a full
/// grid, filling other cells with `nodata`.
pub fn reshape<T: Copy>(
    values: &[T],
    valid: &[usize],
    shape: GridShape,
    nodata: T,
) -> Result<Array2<T>> {
    if values.len() != valid.len() {
        return Err(Error::SizeMismatch {
            expected: valid.len(),
            actual: values.len(),
        });
    }
    if let Some(&idx) = valid.iter().find(|&&idx| !shape.contains(idx)) {
        return Err(Error::IndexOutOfBounds {
            index: idx,
            size: shape.len(),
        });
    }
    let mut data = vec![nodata; shape.len()];
    for (&idx, &value) in valid.iter().zip(values) {
        data[idx] = value;
    }
    Array2::from_shape_vec(shape.dim(), data).map_err(|e| Error::Other(e.to_string()))
}
