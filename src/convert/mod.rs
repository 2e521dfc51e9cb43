//! Program conversion: buffers block lines and drains them ring by ring at
//! every pass-through line or tool change.

mod config;
mod core;

pub use config::{ConvertConfig, ConvertSettings, ToolMerge};
pub use core::{ConversionSummary, Converter, convert_lines};
