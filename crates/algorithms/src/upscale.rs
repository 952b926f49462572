//! Effective-area upscaling of flow directions
//!
//! Derives a low-resolution flow direction grid from a high-resolution one
//! by grouping `ratio x ratio` subgrid cells into one low-res cell.
//!
//! # Algorithm
//! 1. Per low-res cell pick a representative subgrid cell: the largest
//!    upstream area inside the cell's effective area (or on a subgrid pit).
//!    The effective area is the cross-and-star shaped region
//!    `sqrt(i) + sqrt(j) <= sqrt(R)`, `i <= 0.5` or `j <= 0.5`, with `i, j`
//!    the absolute offsets from the cell center and `R = ratio / 2`.
//! 2. Follow the representative cell downstream to the last subgrid cell
//!    inside the low-res cell: the outlet.
//! 3. Follow the outlet further downstream until the path enters the
//!    effective area, stream or outlet of a neighboring low-res cell; that
//!    neighbor receives the flow.
//! 4. Paths ending in a subgrid pit of a neighbor either move the outlet onto
//!    the pit (main river) or are redirected to the neighbor whose outlet the
//!    main upstream branch of the pit meets.

use std::marker::PhantomData;

use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD};
use tracing::{debug, warn};

use crate::network::check_codes;
use flowgrid_core::flwdir::FlowDirScheme;
use flowgrid_core::network::MV;
use flowgrid_core::{Algorithm, Error, GridShape, Result};

/// Subgrid cell outside any effective area
const EA_NONE: u8 = 0;
/// Subgrid cell inside an effective area
const EA_AREA: u8 = 1;
/// Subgrid cell on the stream between representative cell and outlet
const EA_STREAM: u8 = 2;
/// Subgrid outlet cell
const EA_OUTLET: u8 = 3;

/// Parameters for effective-area upscaling
#[derive(Debug, Clone)]
pub struct UpscaleParams {
    /// Number of subgrid cells along each side of a low-res cell
    pub scale_ratio: usize,
    /// Minimum upstream area of a branch followed when redirecting pit outlets
    pub upa_min: f64,
}

impl Default for UpscaleParams {
    fn default() -> Self {
        Self {
            scale_ratio: 10,
            upa_min: 0.5,
        }
    }
}

/// Output of [`upscale`]
#[derive(Debug, Clone)]
pub struct UpscaleResult<S: FlowDirScheme> {
    /// Low-res flow directions in scheme `S`
    pub flwdir: ArrayD<S::Elem>,
    /// Flat subgrid index of each low-res outlet, [`MV`] for nodata cells
    pub outlets: Array2<usize>,
    /// Flat low-res indices whose subgrid outlet does not drain into the
    /// outlet of the chosen downstream cell
    pub unconnected: Vec<usize>,
    /// Number of low-res cells caught in loops
    pub n_loops: usize,
}

/// Effective-area upscaling as an [`Algorithm`]
#[derive(Debug, Clone)]
pub struct Upscale<S> {
    _scheme: PhantomData<S>,
}

impl<S: FlowDirScheme> Upscale<S> {
    pub fn new() -> Self {
        Self {
            _scheme: PhantomData,
        }
    }
}

impl<S: FlowDirScheme> Default for Upscale<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FlowDirScheme> Algorithm for Upscale<S> {
    type Input = (ArrayD<S::Elem>, Array2<f64>);
    type Output = UpscaleResult<S>;
    type Params = UpscaleParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Upscale"
    }

    fn description(&self) -> &'static str {
        "Upscale flow directions with the effective area method"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (flwdir, uparea) = input;
        upscale::<S>(flwdir.view(), uparea.view(), &params)
    }
}

/// Where the downstream path of an outlet ends
#[derive(Debug, Clone, Copy, PartialEq)]
enum PathEnd {
    /// Entered a marked subgrid cell of a neighboring low-res cell
    Neighbor { idx_ds: usize, subidx: usize },
    /// Left the 3x3 window; `idx_ds` is the last neighbor on the path
    Escape { idx_ds: usize, subidx: usize },
    /// Reached a subgrid pit
    Pit { subidx: usize },
    /// Left the grid or reached nodata
    Edge,
}

/// Subgrid geometry and lookups shared by all stages
struct Subgrid<'a, S: FlowDirScheme> {
    codes: &'a [S::Code],
    uparea: &'a [f64],
    shape: GridShape,
    lr_shape: GridShape,
    ratio: usize,
}

impl<'a, S: FlowDirScheme> Subgrid<'a, S> {
    /// Low-res cell containing subgrid cell `subidx`
    fn lowres_idx(&self, subidx: usize) -> usize {
        let (r, c) = self.shape.row_col(subidx);
        self.lr_shape.flat(r / self.ratio, c / self.ratio)
    }

    /// Subgrid index of local position `k` inside low-res cell `idx`
    fn subidx(&self, idx: usize, k: usize) -> usize {
        let (r, c) = self.lr_shape.row_col(idx);
        self.shape
            .flat(r * self.ratio + k / self.ratio, c * self.ratio + k % self.ratio)
    }

    /// Same cell or one of the eight neighbors in the low-res grid
    fn in_window(&self, idx0: usize, idx: usize) -> bool {
        self.lr_shape.offset_between(idx0, idx).is_some()
    }

    fn ds(&self, subidx: usize) -> Option<usize> {
        S::downstream(subidx, self.codes, self.shape, None)
    }

    fn is_pit(&self, subidx: usize) -> bool {
        S::ispit(self.codes[subidx])
    }

    /// Representative subgrid cell of `idx0` and the effective area cells
    fn representative_cell(&self, idx0: usize) -> (usize, Vec<usize>) {
        let half = self.ratio as f64 / 2.0;
        let offsets: Vec<f64> = (0..self.ratio)
            .map(|t| (t as f64 - half + 0.5).abs())
            .collect();

        let mut best = None;
        let mut best_upa = 0.0;
        let mut area = Vec::new();
        for (ki, &i) in offsets.iter().enumerate() {
            for (kj, &j) in offsets.iter().enumerate() {
                let subidx = self.subidx(idx0, ki * self.ratio + kj);
                let in_area = i.sqrt() + j.sqrt() <= half.sqrt() || i <= 0.5 || j <= 0.5;
                if !in_area && !self.is_pit(subidx) {
                    continue;
                }
                if in_area {
                    area.push(subidx);
                }
                let upa = self.uparea[subidx];
                if upa > best_upa {
                    best_upa = upa;
                    best = Some(subidx);
                }
            }
        }

        match best {
            Some(subidx) => {
                if !area.contains(&subidx) {
                    area.push(subidx);
                }
                (subidx, area)
            }
            None => (self.subidx(idx0, self.ratio * self.ratio / 2), area),
        }
    }

    /// Last subgrid cell downstream of `subidx` inside `idx0`, with the path
    /// leading there
    fn outlet(&self, idx0: usize, subidx: usize) -> (usize, Vec<usize>) {
        let mut stream = vec![subidx];
        let mut cur = subidx;
        for _ in 0..self.ratio * self.ratio {
            match self.ds(cur) {
                Some(next) if self.lowres_idx(next) == idx0 => {
                    stream.push(next);
                    cur = next;
                }
                _ => break,
            }
        }
        (cur, stream)
    }

    /// Follow outlet `subidx0` of `idx0` downstream to the first marked cell
    /// of a neighboring low-res cell
    fn trace(&self, idx0: usize, subidx0: usize, effare: &[u8]) -> PathEnd {
        let mut subidx = subidx0;
        for _ in 0..self.shape.len() {
            let Some(subidx_ds) = self.ds(subidx) else {
                return if self.is_pit(subidx) {
                    PathEnd::Pit { subidx }
                } else {
                    PathEnd::Edge
                };
            };
            let idx_ds = self.lowres_idx(subidx_ds);
            if idx_ds != idx0 {
                if !self.in_window(idx0, idx_ds) {
                    return PathEnd::Escape {
                        idx_ds: self.lowres_idx(subidx),
                        subidx,
                    };
                }
                if effare[subidx_ds] >= EA_AREA {
                    return PathEnd::Neighbor {
                        idx_ds,
                        subidx: subidx_ds,
                    };
                }
            }
            subidx = subidx_ds;
        }
        PathEnd::Edge
    }

    /// Resolve a path from outlet `subidx0` that ends in the subgrid pit
    /// `subidx_pit` of another low-res cell. Returns the low-res code and
    /// the outlet of `idx0`.
    fn fix_pit_outlet(
        &self,
        idx0: usize,
        subidx0: usize,
        subidx_pit: usize,
        effare: &[u8],
        upa_min: f64,
    ) -> Result<(S::Code, usize)> {
        let idx_pit = self.lowres_idx(subidx_pit);
        let mut code = S::idx_to_dd(idx0, idx_pit, self.lr_shape).unwrap_or_else(S::pit);

        // on the main river as long as no step doubles the upstream area
        let mut main = true;
        let mut subidx = subidx0;
        let mut upa = self.uparea[subidx];
        for _ in 0..self.shape.len() {
            let Some(subidx_ds) = self.ds(subidx) else {
                break;
            };
            let upa_ds = self.uparea[subidx_ds];
            main = upa_ds / upa < 2.0;
            subidx = subidx_ds;
            upa = upa_ds;
            if subidx_ds == subidx_pit || !main {
                break;
            }
        }

        if main {
            return Ok((S::pit(), subidx_pit));
        }

        // climb the main branch of the confluence to a neighboring outlet
        for _ in 0..self.shape.len() {
            let Some(subidx_us) =
                S::upstream_main(subidx, self.codes, self.uparea, self.shape, upa_min)?
            else {
                break;
            };
            let idx_us = self.lowres_idx(subidx_us);
            if !self.in_window(idx0, idx_us) {
                break;
            }
            if effare[subidx_us] == EA_OUTLET && idx_us != idx0 {
                if let Some(redirected) = S::idx_to_dd(idx0, idx_us, self.lr_shape) {
                    code = redirected;
                }
                break;
            }
            subidx = subidx_us;
        }
        Ok((code, subidx0))
    }

    /// True if outlet `subidx0` of `idx0` drains into the outlet of the
    /// low-res cell that `code` points to
    fn connects(&self, idx0: usize, subidx0: usize, code: S::Code, effare: &[u8]) -> bool {
        let mut subidx = subidx0;
        for _ in 0..self.shape.len() {
            match self.ds(subidx) {
                Some(next) => {
                    subidx = next;
                    if effare[subidx] == EA_OUTLET {
                        break;
                    }
                }
                None => break,
            }
        }
        let idx_ds = self.lowres_idx(subidx);
        S::idx_to_dd(idx0, idx_ds, self.lr_shape) == Some(code)
    }
}

/// Upscale a flow direction raster with the effective area method.
///
/// # Arguments
/// * `flwdir` - Subgrid flow directions in scheme `S`
/// * `uparea` - Subgrid upstream area, same `(rows, cols)` as `flwdir`
/// * `params` - Scale ratio and branch threshold
///
/// # Errors
/// `InvalidParameter` if the ratio is zero or does not divide the grid,
/// `SizeMismatch2D` if `uparea` does not match the grid.
pub fn upscale<S: FlowDirScheme>(
    flwdir: ArrayViewD<'_, S::Elem>,
    uparea: ArrayView2<'_, f64>,
    params: &UpscaleParams,
) -> Result<UpscaleResult<S>> {
    let (codes, shape) = S::codes(flwdir)?;
    let ratio = params.scale_ratio;
    if ratio == 0 || shape.rows % ratio != 0 || shape.cols % ratio != 0 {
        return Err(Error::InvalidParameter {
            name: "scale_ratio",
            value: ratio.to_string(),
            reason: format!(
                "must be positive and divide the grid shape ({}, {})",
                shape.rows, shape.cols
            ),
        });
    }
    let (ar, ac) = uparea.dim();
    if (ar, ac) != shape.dim() {
        return Err(Error::SizeMismatch2D {
            er: shape.rows,
            ec: shape.cols,
            ar,
            ac,
        });
    }
    let uparea: Vec<f64> = uparea.iter().copied().collect();
    let lr_shape = GridShape::new(shape.rows / ratio, shape.cols / ratio);
    let sub = Subgrid::<S> {
        codes: &codes,
        uparea: &uparea,
        shape,
        lr_shape,
        ratio,
    };

    let n_lr = lr_shape.len();
    let mut outlets = vec![MV; n_lr];
    let mut effare = vec![EA_NONE; shape.len()];
    for (idx0, outlet) in outlets.iter_mut().enumerate() {
        let (rep, area) = sub.representative_cell(idx0);
        let (subidx_out, stream) = sub.outlet(idx0, rep);
        let valid = |s: &&usize| !S::isnodata(codes[**s]);
        for &s in stream.iter().filter(valid) {
            effare[s] = EA_STREAM;
        }
        for &s in area.iter().filter(valid) {
            effare[s] = EA_AREA;
        }
        if !S::isnodata(codes[subidx_out]) {
            effare[subidx_out] = EA_OUTLET;
            *outlet = subidx_out;
        }
    }

    let mut lr_codes = vec![S::nodata(); n_lr];
    let mut unconnected = Vec::new();
    for idx0 in 0..n_lr {
        let subidx0 = outlets[idx0];
        if subidx0 == MV {
            continue;
        }
        let code = match sub.trace(idx0, subidx0, &effare) {
            PathEnd::Pit { subidx } if subidx != subidx0 => {
                let (code, outlet) =
                    sub.fix_pit_outlet(idx0, subidx0, subidx, &effare, params.upa_min)?;
                outlets[idx0] = outlet;
                code
            }
            PathEnd::Pit { .. } | PathEnd::Edge => S::pit(),
            PathEnd::Neighbor { idx_ds, subidx } | PathEnd::Escape { idx_ds, subidx } => {
                let code = S::idx_to_dd(idx0, idx_ds, lr_shape).unwrap_or_else(S::pit);
                if effare[subidx] <= EA_AREA
                    && !S::ispit(code)
                    && !sub.connects(idx0, subidx0, code, &effare)
                {
                    unconnected.push(idx0);
                }
                code
            }
        };
        lr_codes[idx0] = code;
    }

    let n_loops = check_codes::<S>(&lr_codes, lr_shape).loops.len();
    if n_loops > 0 {
        warn!("upscaled {} grid has {} cells in loops", S::NAME, n_loops);
    }
    debug!(
        "upscaled {}x{} to {}x{} ({} unconnected outlets)",
        shape.rows,
        shape.cols,
        lr_shape.rows,
        lr_shape.cols,
        unconnected.len()
    );

    let outlets = Array2::from_shape_vec(lr_shape.dim(), outlets)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(UpscaleResult {
        flwdir: S::grid(&lr_codes, lr_shape)?,
        outlets,
        unconnected,
        n_loops,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgrid_core::flwdir::{Ldd, D8};
    use ndarray::{arr2, Array2};

    fn params(ratio: usize) -> UpscaleParams {
        UpscaleParams {
            scale_ratio: ratio,
            ..Default::default()
        }
    }

    #[test]
    fn test_upscale_eastward_flow() {
        let flwdir = Array2::<u8>::from_elem((6, 6), 1).into_dyn();
        let uparea = Array2::from_shape_fn((6, 6), |(_, c)| (c + 1) as f64);
        let result = upscale::<D8>(flwdir.view(), uparea.view(), &params(3)).unwrap();
        assert_eq!(result.flwdir, arr2(&[[1u8, 0], [1, 0]]).into_dyn());
        assert_eq!(result.outlets, arr2(&[[8, 11], [26, 29]]));
        assert!(result.unconnected.is_empty());
        assert_eq!(result.n_loops, 0);
    }

    fn pit_fixture(pit_upa: f64) -> (ArrayD<u8>, Array2<f64>) {
        // the right half drains off the grid, the left outlet drains into a
        // subgrid pit at (0, 3) in the right half
        let flwdir = arr2(&[
            [4u8, 4, 4, 0, 4, 4],
            [1, 1, 128, 1, 1, 1],
            [64, 64, 64, 64, 64, 64],
        ]);
        let uparea = arr2(&[
            [1.0, 1.0, 1.0, pit_upa, 1.0, 1.0],
            [3.0, 6.0, 9.0, 2.0, 5.0, 50.0],
            [1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        ]);
        (flwdir.into_dyn(), uparea)
    }

    #[test]
    fn test_upscale_pit_on_main_river() {
        let (flwdir, uparea) = pit_fixture(10.0);
        let result = upscale::<D8>(flwdir.view(), uparea.view(), &params(3)).unwrap();
        assert_eq!(result.flwdir, arr2(&[[0u8, 0]]).into_dyn());
        assert_eq!(result.outlets, arr2(&[[3, 11]]), "outlet moved onto the pit");
    }

    #[test]
    fn test_upscale_pit_off_main_river() {
        let (flwdir, uparea) = pit_fixture(30.0);
        let result = upscale::<D8>(flwdir.view(), uparea.view(), &params(3)).unwrap();
        assert_eq!(result.flwdir, arr2(&[[1u8, 0]]).into_dyn());
        assert_eq!(result.outlets, arr2(&[[8, 11]]));
    }

    #[test]
    fn test_upscale_other_scheme() {
        // same eastward flow in LDD (6 = E, 5 = pit)
        let flwdir = Array2::<u8>::from_elem((6, 6), 6).into_dyn();
        let uparea = Array2::from_shape_fn((6, 6), |(_, c)| (c + 1) as f64);
        let result = upscale::<Ldd>(flwdir.view(), uparea.view(), &params(3)).unwrap();
        assert_eq!(result.flwdir, arr2(&[[6u8, 5], [6, 5]]).into_dyn());
    }

    #[test]
    fn test_upscale_nodata_cell() {
        let mut flwdir = Array2::<u8>::from_elem((3, 6), 1);
        for r in 0..3 {
            for c in 3..6 {
                flwdir[[r, c]] = 247;
            }
        }
        let uparea = Array2::<f64>::zeros((3, 6));
        let result =
            upscale::<D8>(flwdir.into_dyn().view(), uparea.view(), &params(3)).unwrap();
        assert_eq!(result.outlets[[0, 1]], MV);
        assert_eq!(result.flwdir, arr2(&[[0u8, 247]]).into_dyn());
    }

    #[test]
    fn test_upscale_invalid_ratio() {
        let flwdir = Array2::<u8>::from_elem((6, 6), 1).into_dyn();
        let uparea = Array2::<f64>::zeros((6, 6));
        for ratio in [0, 4] {
            let result = upscale::<D8>(flwdir.view(), uparea.view(), &params(ratio));
            assert!(
                matches!(result, Err(Error::InvalidParameter { name: "scale_ratio", .. })),
                "ratio {} should be rejected",
                ratio
            );
        }
    }

    #[test]
    fn test_upscale_uparea_shape() {
        let flwdir = Array2::<u8>::from_elem((6, 6), 1).into_dyn();
        let uparea = Array2::<f64>::zeros((6, 3));
        let result = upscale::<D8>(flwdir.view(), uparea.view(), &params(3));
        assert_eq!(
            result.unwrap_err(),
            Error::SizeMismatch2D { er: 6, ec: 6, ar: 6, ac: 3 }
        );
    }

    #[test]
    fn test_upscale_algorithm_trait() {
        let flwdir = Array2::<u8>::from_elem((6, 6), 1).into_dyn();
        let uparea = Array2::from_shape_fn((6, 6), |(_, c)| (c + 1) as f64);
        let result = Upscale::<D8>::new()
            .execute((flwdir, uparea), params(3))
            .unwrap();
        assert_eq!(result.outlets.dim(), (2, 2));
    }
}
