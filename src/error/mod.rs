//! Crate-wide error type and result alias.

mod types;

pub use types::{ConvertError, Result};
