//! Bucket grid module orchestrator.
//!
//! Callers import grid types from here while the storage and growth rules
//! live in the private `core` module.

mod core;

pub use core::{CellSlot, GridError, MAX_EXTENT, SpatialGrid};
