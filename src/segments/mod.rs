//! Output file segments and the block ranges they cover.

mod core;

pub use core::{SegmentMap, UNRESOLVED_START};
