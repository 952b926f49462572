//! Level-ordered propagation over a network tree
//!
//! Cells of one level never drain into each other, so a level can be
//! updated in a single batch: every new value is computed from the state
//! left by the previous levels, then all of them are written.

use tracing::debug;

use crate::strategy::{num_cpus, ParallelStrategy, ProcessingMode};
use flowgrid_core::{Error, Result};

/// Direction in which levels are processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOrder {
    /// Pits first, for values passed from a cell to its upstream cells
    DownstreamFirst,
    /// Headwaters first, for values aggregated from upstream cells
    UpstreamFirst,
}

/// Propagate values through the levels of a network tree.
///
/// # Arguments
/// * `levels` - Local indices per level, pits first
/// * `n` - Number of cells in the network
/// * `order` - Level processing order
/// * `mode` - Sequential or parallel evaluation within a level
/// * `init` - Initial value of every cell, length `n`
/// * `f` - New value of a cell given the current state
///
/// # Errors
/// `SizeMismatch` if `init` does not hold `n` values, `IndexOutOfBounds`
/// for level entries outside the network.
pub fn propagate<T, F>(
    levels: &[Vec<usize>],
    n: usize,
    order: LevelOrder,
    mode: ProcessingMode,
    init: Vec<T>,
    f: F,
) -> Result<Vec<T>>
where
    T: Send + Sync,
    F: Fn(usize, &[T]) -> T + Sync + Send,
{
    if init.len() != n {
        return Err(Error::SizeMismatch {
            expected: n,
            actual: init.len(),
        });
    }
    if let Some(&idx) = levels.iter().flatten().find(|&&idx| idx >= n) {
        return Err(Error::IndexOutOfBounds { index: idx, size: n });
    }
    debug!(
        "propagating {} levels over {} cells ({:?}, {} threads)",
        levels.len(),
        n,
        order,
        num_cpus()
    );

    let mut state = init;
    let mut step = |level: &Vec<usize>| -> Result<()> {
        let snapshot = state.as_slice();
        let updates = mode.par_map(0..level.len(), |k| f(level[k], snapshot))?;
        for (&idx, value) in level.iter().zip(updates) {
            state[idx] = value;
        }
        Ok(())
    };
    match order {
        LevelOrder::DownstreamFirst => levels.iter().try_for_each(&mut step)?,
        LevelOrder::UpstreamFirst => levels.iter().rev().try_for_each(&mut step)?,
    }
    Ok(state)
}
