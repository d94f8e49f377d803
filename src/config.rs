use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::traits::ScanError;

pub const DEFAULT_RESULT_LIMIT: usize = 999;
pub const DEFAULT_OUTPUT_PATH: &str = "scan_discord.txt";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(ScanError::InvalidConfig(format!(
                "unknown report format '{}'",
                other
            ))),
        }
    }
}

/// Resolved parameters of one scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum messages retrieved per platform search (default: 999)
    pub result_limit: usize,

    /// Report destination (default: `scan_discord.txt`)
    pub output_path: PathBuf,

    /// Communities scanned at once (default: 1, sequential)
    pub concurrency: usize,

    /// Upper bound on draining a single platform search
    pub query_timeout_secs: Option<u64>,

    pub report_format: ReportFormat,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            result_limit: DEFAULT_RESULT_LIMIT,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            concurrency: 1,
            query_timeout_secs: None,
            report_format: ReportFormat::Text,
        }
    }
}

impl ScanConfig {
    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Values below one are treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_query_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.query_timeout_secs = secs;
        self
    }

    pub fn with_report_format(mut self, format: ReportFormat) -> Self {
        self.report_format = format;
        self
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_secs.map(Duration::from_secs)
    }
}
