//! Pits, loops and level-ordered decomposition of a flow network
//!
//! The network tree groups cells by their distance (in hops) to the pit they
//! drain to:
//! ```text
//!   level 0: pits
//!   level k: cells draining into a cell of level k-1
//! ```
//! Every cell depends only on cells of lower levels, so levels processed in
//! increasing order are safe for pit -> headwater propagation and in
//! decreasing order for headwater -> pit aggregation. Cells on or draining
//! into a cycle never reach a pit and appear in no level.

use ndarray::ArrayView2;
use tracing::warn;

use flowgrid_core::network::{FlowNetwork, MV};

/// Local indices `i` with `downstream[i] == i`.
pub fn pit_indices(downstream: &[usize]) -> Vec<usize> {
    downstream
        .iter()
        .enumerate()
        .filter(|&(i, &ds)| i == ds)
        .map(|(i, _)| i)
        .collect()
}

/// Level decomposition of the network, starting from `pits`.
///
/// Built iteratively with an explicit frontier; each cell is placed at most
/// once. Iteration stops at the first empty level.
///
/// # Arguments
/// * `pits` - Local indices of level 0
/// * `upstream` - Upstream index matrix, padded with [`MV`]
pub fn network_tree(pits: &[usize], upstream: ArrayView2<'_, usize>) -> Vec<Vec<usize>> {
    let n = upstream.nrows();
    let mut placed = vec![false; n];
    let mut level = Vec::with_capacity(pits.len());
    for &pit in pits {
        if pit < n && !placed[pit] {
            placed[pit] = true;
            level.push(pit);
        }
    }

    let mut tree = Vec::new();
    while !level.is_empty() {
        let mut next = Vec::new();
        for &idx in &level {
            for &idx_us in upstream.row(idx) {
                if idx_us == MV || idx_us >= n || placed[idx_us] {
                    continue;
                }
                placed[idx_us] = true;
                next.push(idx_us);
            }
        }
        tree.push(level);
        level = next;
    }
    tree
}

/// Local indices that do not drain to a pit, ascending.
///
/// Empty for any acyclic network.
pub fn loop_indices(downstream: &[usize], upstream: ArrayView2<'_, usize>) -> Vec<usize> {
    let pits = pit_indices(downstream);
    let tree = network_tree(&pits, upstream);
    let mut in_tree = vec![false; downstream.len()];
    for &idx in tree.iter().flatten() {
        if idx < in_tree.len() {
            in_tree[idx] = true;
        }
    }
    let loops: Vec<usize> = in_tree
        .iter()
        .enumerate()
        .filter(|(_, &placed)| !placed)
        .map(|(i, _)| i)
        .collect();
    if !loops.is_empty() {
        warn!("{} of {} cells do not drain to a pit", loops.len(), downstream.len());
    }
    loops
}

/// Level-ordered view of a flow network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTree {
    levels: Vec<Vec<usize>>,
}

impl NetworkTree {
    /// Decompose starting from `pits`
    pub fn new(pits: &[usize], upstream: ArrayView2<'_, usize>) -> Self {
        Self {
            levels: network_tree(pits, upstream),
        }
    }

    /// Decompose a network starting from its pits
    pub fn from_network(network: &FlowNetwork) -> Self {
        Self::new(network.pits(), network.upstream().view())
    }

    /// Levels, pits first
    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    /// Number of levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of cells placed in a level
    pub fn n_cells(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Levels from the pits up to the headwaters
    pub fn iter_down_up(&self) -> impl Iterator<Item = &[usize]> {
        self.levels.iter().map(Vec::as_slice)
    }

    /// Levels from the headwaters down to the pits
    pub fn iter_up_down(&self) -> impl Iterator<Item = &[usize]> {
        self.levels.iter().rev().map(Vec::as_slice)
    }

    /// Level of each of `n` cells, [`MV`] for cells outside the tree
    pub fn level_of(&self, n: usize) -> Vec<usize> {
        let mut level_of = vec![MV; n];
        for (k, level) in self.levels.iter().enumerate() {
            for &idx in level {
                if idx < n {
                    level_of[idx] = k;
                }
            }
        }
        level_of
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgrid_core::flwdir::{FlowDirScheme, D8};
    use ndarray::arr2;

    #[test]
    fn test_tree_converging() {
        let net = D8::from_flwdir(D8::us_grid().into_dyn().view()).unwrap();
        let tree = network_tree(net.pits(), net.upstream().view());
        assert_eq!(tree.len(), 2, "center, then the ring");
        assert_eq!(tree[0], vec![4]);
        assert_eq!(tree[1], vec![0, 1, 2, 3, 5, 6, 7, 8]);
    }

    #[test]
    fn test_tree_chain() {
        // 1 1 1 0: a chain of four cells
        let grid = arr2(&[[1u8, 1, 1, 0]]);
        let net = D8::from_flwdir(grid.into_dyn().view()).unwrap();
        let tree = NetworkTree::from_network(&net);
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.n_cells(), net.len());
        let down_up: Vec<&[usize]> = tree.iter_down_up().collect();
        assert_eq!(down_up, vec![&[3][..], &[2][..], &[1][..], &[0][..]]);
        let up_down: Vec<&[usize]> = tree.iter_up_down().collect();
        assert_eq!(up_down[0], &[0]);
        assert_eq!(tree.level_of(4), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_pit_indices() {
        assert_eq!(pit_indices(&[0, 0, 3, 3]), vec![0, 3]);
        assert!(pit_indices(&[]).is_empty());
    }

    #[test]
    fn test_no_loops_in_valid_network() {
        let net = D8::from_flwdir(D8::us_grid().into_dyn().view()).unwrap();
        assert!(loop_indices(net.downstream(), net.upstream().view()).is_empty());
    }

    #[test]
    fn test_loops_when_pit_removed() {
        let net = D8::from_flwdir(D8::us_grid().into_dyn().view()).unwrap();
        let mut ds = net.downstream().to_vec();
        // the pit now drains into one of its own upstream cells
        ds[net.pits()[0]] = 0;
        let loops = loop_indices(&ds, net.upstream().view());
        assert_eq!(loops.len(), net.len());
    }

    #[test]
    fn test_partial_loop() {
        // cells 0 and 1 drain into each other, 2 -> 3 (pit)
        let ds = vec![1, 0, 3, 3];
        let us = flowgrid_core::network::upstream_matrix(&ds).unwrap();
        assert_eq!(loop_indices(&ds, us.view()), vec![0, 1]);
        let tree = NetworkTree::new(&pit_indices(&ds), us.view());
        assert_eq!(tree.level_of(4), vec![MV, MV, 1, 0]);
    }
}
