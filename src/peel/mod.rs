//! Outside-in ring traversal over a [`SpatialGrid`](crate::grid::SpatialGrid).
//!
//! [`BoundaryPeel`] strips one ring of border cells at a time, taking at most
//! one item per border cell per ring, until the grid is empty.

mod core;

pub use core::{BoundaryPeel, MirrorAxis, Orientation};
