use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters accumulated over one conversion run.
#[derive(Debug, Default, Clone)]
pub struct ConversionMetrics {
    lines_read: u64,
    blocks_buffered: u64,
    blocks_emitted: u64,
    drains: u64,
    rings: u64,
    compactions: u64,
    segment_switches: u64,
    tool_changes: u64,
    execute_dropped: u64,
}

impl ConversionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&mut self) {
        self.lines_read = self.lines_read.saturating_add(1);
    }

    pub fn record_buffered_block(&mut self) {
        self.blocks_buffered = self.blocks_buffered.saturating_add(1);
    }

    pub fn record_drain(&mut self, emitted: usize, rings: usize, compactions: usize) {
        self.drains = self.drains.saturating_add(1);
        self.blocks_emitted = self.blocks_emitted.saturating_add(emitted as u64);
        self.rings = self.rings.saturating_add(rings as u64);
        self.compactions = self.compactions.saturating_add(compactions as u64);
    }

    pub fn record_segment_switch(&mut self) {
        self.segment_switches = self.segment_switches.saturating_add(1);
    }

    pub fn record_tool_change(&mut self) {
        self.tool_changes = self.tool_changes.saturating_add(1);
    }

    pub fn record_execute_dropped(&mut self) {
        self.execute_dropped = self.execute_dropped.saturating_add(1);
    }

    /// Fold another run's counters into this accumulator.
    pub fn merge(&mut self, other: &ConversionMetrics) {
        self.lines_read = self.lines_read.saturating_add(other.lines_read);
        self.blocks_buffered = self.blocks_buffered.saturating_add(other.blocks_buffered);
        self.blocks_emitted = self.blocks_emitted.saturating_add(other.blocks_emitted);
        self.drains = self.drains.saturating_add(other.drains);
        self.rings = self.rings.saturating_add(other.rings);
        self.compactions = self.compactions.saturating_add(other.compactions);
        self.segment_switches = self.segment_switches.saturating_add(other.segment_switches);
        self.tool_changes = self.tool_changes.saturating_add(other.tool_changes);
        self.execute_dropped = self.execute_dropped.saturating_add(other.execute_dropped);
    }

    pub fn snapshot(&self, elapsed: Duration) -> MetricSnapshot {
        MetricSnapshot {
            elapsed_ms: elapsed.as_millis() as u64,
            lines_read: self.lines_read,
            blocks_buffered: self.blocks_buffered,
            blocks_emitted: self.blocks_emitted,
            drains: self.drains,
            rings: self.rings,
            compactions: self.compactions,
            segment_switches: self.segment_switches,
            tool_changes: self.tool_changes,
            execute_dropped: self.execute_dropped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub elapsed_ms: u64,
    pub lines_read: u64,
    pub blocks_buffered: u64,
    pub blocks_emitted: u64,
    pub drains: u64,
    pub rings: u64,
    pub compactions: u64,
    pub segment_switches: u64,
    pub tool_changes: u64,
    pub execute_dropped: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "conversion_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("elapsed_ms".to_string(), json!(self.elapsed_ms));
        map.insert("lines_read".to_string(), json!(self.lines_read));
        map.insert("blocks_buffered".to_string(), json!(self.blocks_buffered));
        map.insert("blocks_emitted".to_string(), json!(self.blocks_emitted));
        map.insert("drains".to_string(), json!(self.drains));
        map.insert("rings".to_string(), json!(self.rings));
        map.insert("compactions".to_string(), json!(self.compactions));
        map.insert("segment_switches".to_string(), json!(self.segment_switches));
        map.insert("tool_changes".to_string(), json!(self.tool_changes));
        map.insert("execute_dropped".to_string(), json!(self.execute_dropped));
        map
    }
}
