//! File-level driver: resolves a program on disk, converts it in memory and
//! swaps the result in behind a verified backup.

mod cli;

pub use cli::{CliDriver, CliError, CliOptions, CliReport, DriverResult};
