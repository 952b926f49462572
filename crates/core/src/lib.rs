//! # flowgrid Core
//!
//! Core types for turning gridded flow directions into explicit flow networks.
//!
//! This crate provides:
//! - `FlowDirScheme`: direction-code encodings (D8, LDD, offset pairs)
//! - Conversion between encodings
//! - `FlowNetwork`: compressed index graph of the valid cells
//! - Grid geometry and reshape / internal-index utilities
//! - Algorithm trait for consistent API

pub mod error;
pub mod flwdir;
pub mod grid;
pub mod network;

pub use error::{Error, Result};
pub use flwdir::{CodeClass, FlowDirScheme, FlowDirType, Ldd, OffsetPair, D8};
pub use grid::GridShape;
pub use network::{FlowNetwork, MV};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::flwdir::{CodeClass, FlowDirScheme, FlowDirType, Ldd, OffsetPair, D8};
    pub use crate::grid::GridShape;
    pub use crate::network::{FlowNetwork, MV};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in flowgrid.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(
        &self,
        input: Self::Input,
    ) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
