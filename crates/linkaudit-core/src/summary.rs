//! Run summary and outcome tiers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::collector::{CollectionFailure, FailureKind};
use crate::models::{DiffStatus, LinkDiff, LinkObservation, UNKNOWN_VALUE};

/// Exit status when the run was cancelled (Ctrl+C)
pub const EXIT_CANCELLED: i32 = 130;

/// Exit status for unexpected errors (I/O on the output directory, ...)
pub const EXIT_UNEXPECTED: i32 = 1;

/// How the run ended, from the operator's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every device collected
    Success,
    /// One or more devices failed, the diff is still usable
    Partial,
    /// Query mechanism unavailable or malformed input
    Fatal,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::Partial => 2,
            RunOutcome::Fatal => 3,
        }
    }
}

/// Aggregate figures for one audit run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub device_count: usize,
    /// Devices with a device-level failure, sorted
    pub failed_devices: Vec<String>,
    pub failure_counts: BTreeMap<FailureKind, usize>,
    pub observation_count: usize,
    /// Observations with an unknown port on either end
    pub missing_ports: usize,
    /// Intents whose status is not `EXACT_MATCH`
    pub mismatch_links: usize,
    /// Keys of the observations counted in `missing_ports`
    pub missing_port_links: Vec<String>,
    /// `intent status` of the diffs counted in `mismatch_links`
    pub mismatched_intents: Vec<String>,
    pub status_counts: BTreeMap<DiffStatus, usize>,
}

impl AuditSummary {
    pub fn build(
        device_count: usize,
        failures: &[CollectionFailure],
        observations: &[LinkObservation],
        diffs: &[LinkDiff],
    ) -> Self {
        let mut failed_devices: Vec<String> = failures
            .iter()
            .filter(|f| f.marks_device_failed())
            .map(|f| f.device.clone())
            .collect();
        failed_devices.sort();
        failed_devices.dedup();

        let mut failure_counts = BTreeMap::new();
        for failure in failures {
            *failure_counts.entry(failure.kind).or_insert(0) += 1;
        }

        let missing_port_links: Vec<String> = observations
            .iter()
            .filter(|obs| {
                obs.remote_port_norm == UNKNOWN_VALUE || obs.local_port_norm == UNKNOWN_VALUE
            })
            .map(|obs| obs.key.to_string())
            .collect();

        let mismatched_intents: Vec<String> = diffs
            .iter()
            .filter(|d| d.status != DiffStatus::ExactMatch)
            .map(|d| format!("{} {}", d.intent, d.status))
            .collect();

        let mut status_counts: BTreeMap<DiffStatus, usize> =
            DiffStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for diff in diffs {
            *status_counts.entry(diff.status).or_insert(0) += 1;
        }

        Self {
            device_count,
            failed_devices,
            failure_counts,
            observation_count: observations.len(),
            missing_ports: missing_port_links.len(),
            mismatch_links: mismatched_intents.len(),
            missing_port_links,
            mismatched_intents,
            status_counts,
        }
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.failed_devices.is_empty() {
            RunOutcome::Success
        } else {
            RunOutcome::Partial
        }
    }

    pub fn count(&self, status: DiffStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }
}
