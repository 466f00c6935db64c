//! JSON export functionality

use crate::models::{LinkDiff, LinkObservation};
use crate::summary::AuditSummary;
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

/// `asis_links.json`
#[derive(Debug, Serialize)]
pub struct ObservationsExport<'a> {
    pub export_date: String,
    pub total_links: usize,
    pub links: &'a [LinkObservation],
}

/// `diff_links.json`
#[derive(Debug, Serialize)]
pub struct DiffsExport<'a> {
    pub export_date: String,
    pub total_intents: usize,
    pub diffs: &'a [LinkDiff],
}

/// Export observed links to JSON
pub fn export_observations_json(observations: &[LinkObservation]) -> Result<String> {
    let export = ObservationsExport {
        export_date: Utc::now().to_rfc3339(),
        total_links: observations.len(),
        links: observations,
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Export link diffs to JSON
pub fn export_diffs_json(diffs: &[LinkDiff]) -> Result<String> {
    let export = DiffsExport {
        export_date: Utc::now().to_rfc3339(),
        total_intents: diffs.len(),
        diffs,
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Export the run summary to JSON
pub fn export_summary_json(summary: &AuditSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}
