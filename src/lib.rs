//! Drilling path optimization for laser drilling programs.
//!
//! Block instructions are bucketed into a [`SpatialGrid`] by position and
//! emitted ring by ring, outside in, with [`BoundaryPeel`]. The
//! [`Converter`] runs that over a whole program and [`CliDriver`] wraps it
//! with file handling for the `drillpath` binary.

pub mod convert;
pub mod decode;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod logging;
pub mod metrics;
pub mod peel;
pub mod program;
pub mod segments;

pub use convert::{ConversionSummary, ConvertConfig, ConvertSettings, Converter, ToolMerge, convert_lines};
pub use decode::{Block, DecodeError, NumberFormat, decode_block, decode_number};
pub use driver::{CliDriver, CliError, CliOptions, CliReport, DriverResult};
pub use error::{ConvertError, Result};
pub use geometry::{CellIndex, Point};
pub use grid::{CellSlot, GridError, MAX_EXTENT, SpatialGrid};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink, NullSink, StderrSink,
};
pub use metrics::{ConversionMetrics, MetricSnapshot};
pub use peel::{BoundaryPeel, MirrorAxis, Orientation};
pub use program::{BoardThickness, Instruction, PreconditionError, Side};
pub use segments::SegmentMap;
