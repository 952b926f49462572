//! # flowgrid Parallel
//!
//! Parallel processing strategies for flow networks.
//!
//! This crate provides:
//! - Sequential / parallel processing modes using Rayon
//! - Level-ordered propagation over a network tree, with all cells of a
//!   level updated together

#[cfg(feature = "parallel")]
pub mod levels;
#[cfg(feature = "parallel")]
pub mod strategy;

#[cfg(feature = "parallel")]
pub use levels::{propagate, LevelOrder};
#[cfg(feature = "parallel")]
pub use strategy::{ParallelStrategy, ProcessingMode};
