//! Traversal of compressed flow networks
//!
//! All functions here operate on local indices (positions in the valid-cell
//! list of a [`flowgrid_core::FlowNetwork`]) and the downstream array or
//! upstream matrix of that network.

mod check;
mod downstream;
mod tree;
mod upstream;

pub use check::{check_codes, check_flwdir, FlowDirCheck};
pub use downstream::downstream_river;
pub use tree::{loop_indices, network_tree, pit_indices, NetworkTree};
pub use upstream::{main_upstream, upstream, upstream_many};
