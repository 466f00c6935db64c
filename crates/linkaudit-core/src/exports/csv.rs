//! CSV export functionality

use crate::models::{LinkDiff, LinkObservation};
use anyhow::Result;
use csv::Writer;

/// Export observed links to CSV (`asis_links.csv`)
pub fn export_observations_csv(observations: &[LinkObservation]) -> Result<String> {
    let mut writer = Writer::from_writer(vec![]);

    writer.write_record([
        "local_device",
        "local_port",
        "local_port_raw",
        "remote_device",
        "remote_device_id",
        "remote_port",
        "remote_port_raw",
        "confidence",
        "identity",
        "evidence",
    ])?;

    for obs in observations {
        writer.write_record([
            obs.local_device.as_str(),
            &obs.local_port_norm,
            &obs.local_port_raw,
            &obs.remote_device,
            &obs.remote_device_id,
            &obs.remote_port_norm,
            &obs.remote_port_raw,
            obs.confidence.as_str(),
            obs.identity.as_str(),
            &obs.evidence.join(";"),
        ])?;
    }

    let csv_data = String::from_utf8(writer.into_inner()?)?;
    Ok(csv_data)
}

/// Export link diffs to CSV (`diff_links.csv`)
pub fn export_diffs_csv(diffs: &[LinkDiff]) -> Result<String> {
    let mut writer = Writer::from_writer(vec![]);

    writer.write_record(["device_a", "port_a", "device_b", "port_b", "status", "reason"])?;

    for diff in diffs {
        writer.write_record([
            diff.intent.device_a.as_str(),
            &diff.intent.port_a_norm,
            &diff.intent.device_b,
            &diff.intent.port_b_norm,
            diff.status.as_str(),
            &diff.reason,
        ])?;
    }

    let csv_data = String::from_utf8(writer.into_inner()?)?;
    Ok(csv_data)
}
