//! Plain-text summary (`summary.txt`)

use std::fmt::Write;

use crate::models::DiffStatus;
use crate::summary::AuditSummary;

pub fn export_summary_text(summary: &AuditSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "devices: {}", summary.device_count);
    let _ = writeln!(
        out,
        "lldp_failed_devices: {}",
        summary.failed_devices.join(", ")
    );
    let _ = writeln!(out, "observed_links: {}", summary.observation_count);
    let _ = writeln!(out, "missing_ports: {}", summary.missing_ports);
    for port in &summary.missing_port_links {
        let _ = writeln!(out, "  - {}", port);
    }
    let _ = writeln!(out, "mismatch_links: {}", summary.mismatch_links);
    for link in &summary.mismatched_intents {
        let _ = writeln!(out, "  - {}", link);
    }
    let _ = writeln!(out, "status_counts:");
    for status in DiffStatus::ALL {
        let _ = writeln!(out, "  {}: {}", status, summary.count(status));
    }
    if !summary.failure_counts.is_empty() {
        let _ = writeln!(out, "collection_failures:");
        for (kind, count) in &summary.failure_counts {
            let _ = writeln!(out, "  {}: {}", kind, count);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CollectionFailure, FailureKind};

    #[test]
    fn text_summary_lists_failed_devices() {
        let failures = vec![CollectionFailure::new(
            "leaf02",
            FailureKind::AuthFailed,
            "bad community",
        )];
        let summary = AuditSummary::build(2, &failures, &[], &[]);
        let text = export_summary_text(&summary);

        assert!(text.contains("lldp_failed_devices: leaf02\n"));
        assert!(text.contains("mismatch_links: 0\n"));
        assert!(text.contains("  AUTH_FAILED: 1\n"));
    }
}
