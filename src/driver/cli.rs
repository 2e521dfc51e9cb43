use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::convert::{ConversionSummary, ConvertConfig, Converter};
use crate::error::ConvertError;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv, json_str};
use crate::program::{Side, check_preconditions, prepare};

const DRIVER_TARGET: &str = "drillpath::driver";

pub type DriverResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("program file not found: {}", .0.display())]
    ProgramNotFound(PathBuf),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error("{} line {line} is not valid UTF-8", .path.display())]
    NotUtf8 { path: PathBuf, line: usize },
    #[error("backup {} does not match the original program", .0.display())]
    BackupMismatch(PathBuf),
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct CliOptions {
    /// Program path; the extension is replaced with `.prg`.
    pub path: PathBuf,
    /// Write the converted program to the output writer instead of
    /// replacing the file.
    pub dry_run: bool,
    pub check_preconditions: bool,
}

impl CliOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dry_run: false,
            check_preconditions: true,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Outcome of one driver run.
#[derive(Debug, Clone)]
pub struct CliReport {
    pub program: PathBuf,
    /// `None` on a dry run.
    pub backup: Option<PathBuf>,
    pub side: Side,
    pub input_digest: String,
    pub output_digest: String,
    pub summary: ConversionSummary,
}

/// Converts one program file end to end.
///
/// Nothing on disk changes until the whole program has converted into
/// memory. The original is then renamed to `<stem>.bak` and checked
/// against the bytes that were read before `<stem>.tmp` takes its place.
pub struct CliDriver {
    config: ConvertConfig,
    options: CliOptions,
}

impl CliDriver {
    pub fn new(config: ConvertConfig, options: CliOptions) -> Self {
        Self { config, options }
    }

    pub fn run(self, out: &mut impl Write) -> DriverResult<CliReport> {
        let logger = self.config.logger.clone();
        let result = self.run_inner(out, logger.as_ref());
        if let Err(err) = &result {
            log(
                logger.as_ref(),
                LogLevel::Error,
                "conversion_failed",
                [json_str("error", err.to_string())],
            );
        }
        result
    }

    fn run_inner(self, out: &mut impl Write, logger: Option<&Logger>) -> DriverResult<CliReport> {
        let program = resolve_program(&self.options.path)?;
        let side = Side::from_path(&program).map_err(ConvertError::from)?;
        let original = fs::read(&program).map_err(io_error("read", &program))?;
        let input_digest = blake3::hash(&original);

        let mut lines = decode_lines(&original, &program)?;
        if self.options.check_preconditions {
            check_preconditions(&lines, side).map_err(ConvertError::from)?;
        }
        prepare(&mut lines, side, self.config.settings.thickness);

        log(
            logger,
            LogLevel::Info,
            "program_loaded",
            [
                json_str("program", program.display().to_string()),
                json_str("side", side.to_string()),
                json_kv("lines", lines.len()),
                json_str("digest", input_digest.to_hex().to_string()),
            ],
        );

        let mut converted = Vec::new();
        let summary = Converter::new(self.config, side)?.run(&lines, &mut converted)?;
        let output_digest = blake3::hash(&converted);

        let backup = if self.options.dry_run {
            out.write_all(&converted)
                .and_then(|()| out.flush())
                .map_err(io_error("write", Path::new("<output>")))?;
            None
        } else {
            Some(replace_program(&program, input_digest, &converted)?)
        };

        log(
            logger,
            LogLevel::Info,
            "program_written",
            [
                json_str("program", program.display().to_string()),
                json_kv("dry_run", backup.is_none()),
                json_kv("lines", summary.lines_written),
                json_str("digest", output_digest.to_hex().to_string()),
            ],
        );

        Ok(CliReport {
            program,
            backup,
            side,
            input_digest: input_digest.to_hex().to_string(),
            output_digest: output_digest.to_hex().to_string(),
            summary,
        })
    }
}

fn resolve_program(path: &Path) -> DriverResult<PathBuf> {
    let program = path.with_extension("prg");
    if program.is_file() {
        Ok(program)
    } else {
        Err(CliError::ProgramNotFound(program))
    }
}

/// Split a program into trimmed lines, refusing bytes that are not UTF-8.
fn decode_lines(bytes: &[u8], path: &Path) -> DriverResult<Vec<String>> {
    let text = std::str::from_utf8(bytes).map_err(|err| CliError::NotUtf8 {
        path: path.to_path_buf(),
        line: bytes[..err.valid_up_to()]
            .iter()
            .filter(|&&byte| byte == b'\n')
            .count()
            + 1,
    })?;
    Ok(text.lines().map(|line| line.trim().to_string()).collect())
}

fn replace_program(program: &Path, original: blake3::Hash, converted: &[u8]) -> DriverResult<PathBuf> {
    let tmp = program.with_extension("tmp");
    let backup = program.with_extension("bak");

    fs::write(&tmp, converted).map_err(io_error("write", &tmp))?;
    fs::rename(program, &backup).map_err(io_error("back up", program))?;

    let saved = fs::read(&backup).map_err(io_error("read", &backup))?;
    if blake3::hash(&saved) != original {
        return Err(CliError::BackupMismatch(backup));
    }

    fs::rename(&tmp, program).map_err(io_error("replace", program))?;
    Ok(backup)
}

fn io_error<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> CliError + 'a {
    move |source| CliError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

fn log(
    logger: Option<&Logger>,
    level: LogLevel,
    message: &str,
    fields: impl IntoIterator<Item = (String, Value)>,
) {
    if let Some(logger) = logger {
        let _ = logger.log_event(event_with_fields(level, DRIVER_TARGET, message, fields));
    }
}
