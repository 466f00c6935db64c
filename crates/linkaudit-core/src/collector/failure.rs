//! Collection failure taxonomy
//!
//! Every way a device query can go wrong maps onto one `FailureKind`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::RawDiscoveryRow;

/// Terminal classification of a collection problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// No answer, refused, or name did not resolve
    TargetUnreachable,
    /// Bad community / user / keys, or an unusable credential
    AuthFailed,
    /// The agent answers but does not expose LLDP-MIB
    MibMissing,
    /// Nothing on this host can issue the query at all
    QueryMechanismMissing,
    /// The query was issued and failed for another reason
    QueryFailed,
    UnknownError,
    /// Remote table present with zero rows (informational)
    TableEmpty,
    /// A row lacks mandatory fields (row-level)
    PartialRow,
    /// Cancellation was requested before the device was queried
    NotAttempted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TargetUnreachable => "TARGET_UNREACHABLE",
            FailureKind::AuthFailed => "AUTH_FAILED",
            FailureKind::MibMissing => "MIB_MISSING",
            FailureKind::QueryMechanismMissing => "QUERY_MECHANISM_MISSING",
            FailureKind::QueryFailed => "QUERY_FAILED",
            FailureKind::UnknownError => "UNKNOWN_ERROR",
            FailureKind::TableEmpty => "TABLE_EMPTY",
            FailureKind::PartialRow => "PARTIAL_ROW",
            FailureKind::NotAttempted => "NOT_ATTEMPTED",
        }
    }

    /// Only these kinds earn another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::TargetUnreachable | FailureKind::QueryFailed
        )
    }

    /// Informational kinds do not mark the device as failed.
    pub fn is_informational(&self) -> bool {
        matches!(self, FailureKind::TableEmpty | FailureKind::PartialRow)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a row-level problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowContext {
    pub row_index: String,
    pub missing_fields: Vec<String>,
}

/// A device-level or row-level collection problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFailure {
    pub device: String,
    pub kind: FailureKind,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<RowContext>,
}

impl CollectionFailure {
    pub fn new(device: impl Into<String>, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            kind,
            detail: detail.into(),
            row: None,
        }
    }

    pub fn partial_row(row: &RawDiscoveryRow, missing: &[&str]) -> Self {
        Self {
            device: row.device.clone(),
            kind: FailureKind::PartialRow,
            detail: format!("row {} is missing {}", row.row_index, missing.join(", ")),
            row: Some(RowContext {
                row_index: row.row_index.clone(),
                missing_fields: missing.iter().map(|m| m.to_string()).collect(),
            }),
        }
    }

    pub fn is_device_level(&self) -> bool {
        self.row.is_none()
    }

    /// Device-level and not informational: the device counts as failed.
    pub fn marks_device_failed(&self) -> bool {
        self.is_device_level() && !self.kind.is_informational()
    }
}

/// Everything collected from one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceReport {
    pub device: String,
    pub rows: Vec<RawDiscoveryRow>,
    pub failures: Vec<CollectionFailure>,
    /// Attempts actually made (0 when the device was never queried)
    pub attempts: u32,
}

impl DeviceReport {
    pub fn success(
        device: impl Into<String>,
        rows: Vec<RawDiscoveryRow>,
        failures: Vec<CollectionFailure>,
        attempts: u32,
    ) -> Self {
        Self {
            device: device.into(),
            rows,
            failures,
            attempts,
        }
    }

    pub fn failed(failure: CollectionFailure, attempts: u32) -> Self {
        Self {
            device: failure.device.clone(),
            rows: Vec::new(),
            failures: vec![failure],
            attempts,
        }
    }

    pub fn device_failure(&self) -> Option<&CollectionFailure> {
        self.failures.iter().find(|f| f.marks_device_failed())
    }
}
