//! Reorders the drilling blocks of a laser drilling program ring by ring.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use drillpath::{
    BoardThickness, CliDriver, CliOptions, ConvertConfig, ConvertSettings, FileSink, LogLevel,
    Logger, StderrSink,
};

const LOG_FILE_MAX_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "drillpath")]
#[command(about = "Optimize the drilling path of a laser drilling program")]
#[command(version)]
struct Cli {
    /// Program to convert; the extension is replaced with .prg
    path: PathBuf,

    /// Core thickness written into the header (2 or 2.3 mil)
    #[arg(short, long)]
    thickness: Option<BoardThickness>,

    /// JSON settings file (pitches, number format, tool merge, thickness)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print debug logs to stderr as JSON lines
    #[arg(short, long)]
    verbose: bool,

    /// Append JSON logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Lowest level logged (trace, debug, info, warn, error); overrides --verbose
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Write the converted program to stdout and leave the file untouched
    #[arg(long)]
    dry_run: bool,

    /// Convert even when the program fails the format checks
    #[arg(long)]
    skip_checks: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("drillpath: {message}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut settings = match &cli.config {
        Some(path) => ConvertSettings::from_json_file(path).map_err(|err| err.to_string())?,
        None => ConvertSettings::default(),
    };
    if let Some(thickness) = cli.thickness {
        settings.thickness = thickness;
    }

    let mut config = ConvertConfig::default().with_settings(settings);
    if let Some(logger) = build_logger(&cli)? {
        config = config.with_logger(logger);
    }

    let mut options = CliOptions::new(&cli.path).with_dry_run(cli.dry_run);
    options.check_preconditions = !cli.skip_checks;

    let mut stdout = io::stdout().lock();
    let report = CliDriver::new(config, options)
        .run(&mut stdout)
        .map_err(|err| err.to_string())?;

    if let Some(backup) = &report.backup {
        eprintln!(
            "drillpath: converted {} ({} side, {} blocks), original kept as {}",
            report.program.display(),
            report.side,
            report.summary.metrics.blocks_emitted,
            backup.display()
        );
    }
    Ok(())
}

fn build_logger(cli: &Cli) -> Result<Option<Logger>, String> {
    let to_stderr = cli.verbose || cli.log_level.is_some();
    let logger = match (&cli.log_file, to_stderr) {
        (Some(path), _) => {
            let sink = FileSink::new(path, LOG_FILE_MAX_BYTES).map_err(|err| err.to_string())?;
            Logger::new(sink)
        }
        (None, true) => Logger::new(StderrSink),
        (None, false) => return Ok(None),
    };
    let level = match (cli.log_level, cli.verbose) {
        (Some(level), _) => level,
        (None, true) => LogLevel::Debug,
        (None, false) => LogLevel::Info,
    };
    Ok(Some(logger.with_min_level(level)))
}
