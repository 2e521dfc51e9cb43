use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::decode::NumberFormat;
use crate::error::Result;
use crate::logging::Logger;
use crate::metrics::ConversionMetrics;
use crate::program::BoardThickness;

/// Tool numbers in `first..=last` are drilled with tool `into`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMerge {
    pub first: u8,
    pub last: u8,
    pub into: u8,
}

impl ToolMerge {
    pub fn apply(&self, tool: u8) -> u8 {
        if (self.first..=self.last).contains(&tool) {
            self.into
        } else {
            tool
        }
    }
}

impl Default for ToolMerge {
    fn default() -> Self {
        Self {
            first: 3,
            last: 23,
            into: 2,
        }
    }
}

/// Settings that can be loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertSettings {
    /// Ring cell width, in machine units.
    pub pitch_x: f64,
    /// Ring cell height, in machine units.
    pub pitch_y: f64,
    pub number_format: NumberFormat,
    /// `None` keeps every tool change as written.
    pub tool_merge: Option<ToolMerge>,
    pub thickness: BoardThickness,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            pitch_x: 30.0,
            pitch_y: 30.0,
            number_format: NumberFormat::default(),
            tool_merge: Some(ToolMerge::default()),
            thickness: BoardThickness::default(),
        }
    }
}

impl ConvertSettings {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn merge_tool(&self, tool: u8) -> u8 {
        self.tool_merge.map_or(tool, |merge| merge.apply(tool))
    }
}

/// Configuration knobs for one conversion run.
#[derive(Clone, Debug)]
pub struct ConvertConfig {
    pub settings: ConvertSettings,
    /// Optional structured logger used by the converter.
    pub logger: Option<Logger>,
    /// Shared accumulator the run's counters are merged into when it ends.
    pub metrics: Option<Arc<Mutex<ConversionMetrics>>>,
    /// Target field used for log events.
    pub log_target: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            settings: ConvertSettings::default(),
            logger: None,
            metrics: None,
            log_target: "drillpath::convert".to_string(),
        }
    }
}

impl ConvertConfig {
    pub fn with_settings(mut self, settings: ConvertSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(ConversionMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<ConversionMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_machine_setup() {
        let settings = ConvertSettings::default();
        assert_eq!((settings.pitch_x, settings.pitch_y), (30.0, 30.0));
        assert_eq!(settings.number_format, NumberFormat::TrailingZero { decimals: 3 });
        assert_eq!(settings.merge_tool(3), 2);
        assert_eq!(settings.merge_tool(23), 2);
        assert_eq!(settings.merge_tool(24), 24);
        assert_eq!(settings.merge_tool(1), 1);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = ConvertSettings::from_json_str(
            r#"{ "pitch_x": 20.0, "tool_merge": null, "thickness": "2.3" }"#,
        )
        .unwrap();
        assert_eq!(settings.pitch_x, 20.0);
        assert_eq!(settings.pitch_y, 30.0);
        assert_eq!(settings.tool_merge, None);
        assert_eq!(settings.merge_tool(5), 5);
        assert_eq!(settings.thickness, BoardThickness::Mil2_3);
    }

    #[test]
    fn number_format_is_tagged() {
        let settings = ConvertSettings::from_json_str(
            r#"{ "number_format": { "zeros": "leading_zero", "integer_digits": 3 } }"#,
        )
        .unwrap();
        assert_eq!(
            settings.number_format,
            NumberFormat::LeadingZero { integer_digits: 3 }
        );
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(ConvertSettings::from_json_str("{ pitch_x: }").is_err());
    }

    #[test]
    fn metrics_handle_is_shared() {
        let mut config = ConvertConfig::default();
        assert!(config.metrics_handle().is_none());
        config.enable_metrics();
        let handle = config.metrics_handle().unwrap();
        assert!(Arc::ptr_eq(&handle, config.metrics.as_ref().unwrap()));
        config.disable_metrics();
        assert!(config.metrics_handle().is_none());
    }
}
