use std::io::{self, Write};
use std::time::Instant;

use serde_json::Value;

use crate::decode::Block;
use crate::error::Result;
use crate::grid::SpatialGrid;
use crate::logging::{LogEvent, LogLevel, event_with_fields, json_kv};
use crate::metrics::{ConversionMetrics, MetricSnapshot};
use crate::peel::Orientation;
use crate::program::{EXECUTE, Instruction, Side, segment_switch_line, tool_change_line};
use crate::segments::SegmentMap;

use super::config::ConvertConfig;

const METRICS_TARGET: &str = "drillpath::metrics";

/// Block line held in the grid until the next drain point.
#[derive(Debug, Clone)]
struct PendingBlock {
    number: u32,
    text: String,
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub side: Side,
    pub lines_written: u64,
    pub segment_starts: Vec<u32>,
    pub metrics: MetricSnapshot,
}

/// Rewrites one program so its blocks come out ring by ring.
///
/// Block lines are buffered in a [`SpatialGrid`]. Any other line, and any
/// change of tool, is a drain point: the grid is peeled in the side's
/// orientation and each block is written followed by `M300`, with an `M9NN`
/// segment switch ahead of it whenever the block belongs to a different
/// output segment than the previous one.
pub struct Converter {
    config: ConvertConfig,
    side: Side,
    orientation: Orientation,
    grid: SpatialGrid<PendingBlock>,
    segments: SegmentMap,
    current_tool: u8,
    current_segment: usize,
    metrics: ConversionMetrics,
    lines_written: u64,
}

impl Converter {
    pub fn new(config: ConvertConfig, side: Side) -> Result<Self> {
        let grid = SpatialGrid::new(config.settings.pitch_x, config.settings.pitch_y)?;
        Ok(Self {
            config,
            side,
            orientation: side.orientation(),
            grid,
            segments: SegmentMap::new(),
            current_tool: 0,
            current_segment: 0,
            metrics: ConversionMetrics::new(),
            lines_written: 0,
        })
    }

    /// Convert every line into `out`. Errors carry the offending line; the
    /// caller must discard whatever was written before the failure.
    pub fn run<I, S, W>(mut self, lines: I, out: &mut W) -> Result<ConversionSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        W: Write,
    {
        let started = Instant::now();
        self.log(
            LogLevel::Info,
            "conversion_started",
            [
                json_kv("side", self.side.to_string()),
                json_kv("pitch_x", self.config.settings.pitch_x),
                json_kv("pitch_y", self.config.settings.pitch_y),
            ],
        );

        for (index, raw) in lines.into_iter().enumerate() {
            let text = raw.as_ref().trim();
            self.metrics.record_line();
            self.step(text, out)
                .map_err(|err| err.at_line(index + 1, text))?;
        }
        self.drain(out, "end_of_program")?;
        out.flush()?;

        let snapshot = self.metrics.snapshot(started.elapsed());
        if let Some(handle) = self.config.metrics_handle() {
            if let Ok(mut shared) = handle.lock() {
                shared.merge(&self.metrics);
            }
        }
        self.emit(snapshot.to_log_event(METRICS_TARGET));

        Ok(ConversionSummary {
            side: self.side,
            lines_written: self.lines_written,
            segment_starts: self.segments.starts().to_vec(),
            metrics: snapshot,
        })
    }

    fn step<W: Write>(&mut self, text: &str, out: &mut W) -> Result<()> {
        match Instruction::classify(text, self.config.settings.number_format)? {
            Instruction::ToolChange(tool) => {
                let tool = self.config.settings.merge_tool(tool);
                if tool != self.current_tool {
                    self.drain(out, "tool_change")?;
                    self.current_tool = tool;
                    writeln!(out, "{}", tool_change_line(tool))?;
                    self.lines_written += 1;
                    self.metrics.record_tool_change();
                }
            }
            Instruction::Block(block) => self.buffer(block, text)?,
            Instruction::Execute => self.metrics.record_execute_dropped(),
            Instruction::SegmentSwitch(segment) => self.segments.record_switch(segment),
            Instruction::Other => {
                self.drain(out, "passthrough")?;
                writeln!(out, "{text}")?;
                self.lines_written += 1;
            }
        }
        Ok(())
    }

    fn buffer(&mut self, block: Block, text: &str) -> Result<()> {
        self.grid.insert(
            block.position,
            PendingBlock {
                number: block.number,
                text: text.to_string(),
            },
        )?;
        self.segments.observe_block(block.number);
        self.metrics.record_buffered_block();
        Ok(())
    }

    fn drain<W: Write>(&mut self, out: &mut W, trigger: &str) -> Result<()> {
        if self.grid.is_empty() {
            return Ok(());
        }

        let (width, height) = (self.grid.width(), self.grid.height());
        let mut peel = self.grid.peel(self.orientation);
        for block in peel.by_ref() {
            let block = block?;
            let segment = self.segments.resolve(block.number);
            if segment != self.current_segment {
                self.current_segment = segment;
                writeln!(out, "{}", segment_switch_line(segment))?;
                self.lines_written += 1;
                self.metrics.record_segment_switch();
            }
            writeln!(out, "{}", block.text)?;
            writeln!(out, "{EXECUTE}")?;
            self.lines_written += 2;
        }

        let (emitted, rings, compactions) =
            (peel.emitted(), peel.rings_completed(), peel.compactions());
        self.metrics.record_drain(emitted, rings, compactions);
        self.log(
            LogLevel::Debug,
            "drain",
            [
                json_kv("trigger", trigger),
                json_kv("blocks", emitted),
                json_kv("rings", rings),
                json_kv("grid_width", width),
                json_kv("grid_height", height),
                json_kv("segment", self.current_segment),
            ],
        );
        Ok(())
    }

    fn log(&self, level: LogLevel, message: &str, fields: impl IntoIterator<Item = (String, Value)>) {
        if self.config.logger.is_some() {
            self.emit(event_with_fields(level, &self.config.log_target, message, fields));
        }
    }

    fn emit(&self, event: LogEvent) {
        if let Some(logger) = &self.config.logger {
            let _ = logger.log_event(event);
        }
    }
}

/// Convert a whole program in memory.
pub fn convert_lines<S: AsRef<str>>(
    config: ConvertConfig,
    side: Side,
    lines: &[S],
) -> Result<(String, ConversionSummary)> {
    let mut buffer = Vec::new();
    let summary = Converter::new(config, side)?.run(lines, &mut buffer)?;
    let text = String::from_utf8(buffer)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    Ok((text, summary))
}
