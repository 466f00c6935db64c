use std::path::PathBuf;

use crate::models::DiffStatus;

/// Which files an audit writes into its output directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Both,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            "both" => Some(OutputFormat::Both),
            _ => None,
        }
    }

    pub fn writes_csv(&self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }

    pub fn writes_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

/// Options of one `audit` invocation. Unset tuning values fall back to
/// `CollectorSettings::from_env()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditOptions {
    pub devices: PathBuf,
    pub intent: PathBuf,
    pub out_dir: PathBuf,
    pub format: OutputFormat,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u8>,
    pub concurrency: Option<usize>,
    pub port: Option<u16>,
    pub save_observations: Option<PathBuf>,
    pub load_observations: Option<PathBuf>,
    pub dry_run: bool,
    pub device_names: Vec<String>,
    pub device_regex: Option<String>,
    pub statuses: Vec<DiffStatus>,
    pub show_progress: bool,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Audit(AuditOptions),
    Normalize { names: Vec<String> },
    Help,
    Version,
}
