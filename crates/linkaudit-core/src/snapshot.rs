//! Saved collection results
//!
//! A snapshot holds the raw rows and failures of one collection so a later
//! run can re-infer and re-diff without touching the network.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::collector::{CollectionFailure, CollectionOutcome};
use crate::inventory::InputError;
use crate::models::RawDiscoveryRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<RawDiscoveryRow>,
    #[serde(default)]
    pub failures: Vec<CollectionFailure>,
}

impl CollectionSnapshot {
    pub fn from_outcome(outcome: &CollectionOutcome) -> Self {
        Self {
            generated_at: Utc::now(),
            rows: outcome.rows(),
            failures: outcome.failures(),
        }
    }
}

/// Writes `snapshot` as pretty JSON, creating parent directories.
pub fn save_snapshot(path: &Path, snapshot: &CollectionSnapshot) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    crate::log_debug!(
        "Saved {} rows and {} failures to {}",
        snapshot.rows.len(),
        snapshot.failures.len(),
        path.display()
    );
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<CollectionSnapshot, InputError> {
    let file = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|e| InputError::Snapshot {
        file: file.clone(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| InputError::Snapshot {
        file,
        message: format!("invalid snapshot: {}", e),
    })
}
