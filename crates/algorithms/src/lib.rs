//! # flowgrid Algorithms
//!
//! Algorithms over compressed flow networks.
//!
//! ## Available Algorithm Categories
//!
//! - **network**: Pits, loops, level decomposition, upstream / downstream
//!   lookups and raw-grid checks
//! - **upscale**: Effective-area upscaling of flow direction grids

mod maybe_rayon;

pub mod network;
pub mod upscale;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::network::{
        check_codes, check_flwdir, downstream_river, loop_indices, main_upstream,
        network_tree, pit_indices, upstream, upstream_many, FlowDirCheck, NetworkTree,
    };
    pub use crate::upscale::{upscale, Upscale, UpscaleParams, UpscaleResult};
    pub use flowgrid_core::prelude::*;
}
