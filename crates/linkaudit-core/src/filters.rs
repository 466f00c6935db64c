//! Output filters by device and diff status
//!
//! Filters only narrow what is rendered; summaries are always computed on
//! the complete run.

use regex::Regex;

use crate::models::{DiffStatus, LinkDiff, LinkObservation};

#[derive(Debug, Clone, Default)]
pub struct OutputFilter {
    devices: Vec<String>,
    device_regex: Option<Regex>,
    statuses: Vec<DiffStatus>,
}

impl OutputFilter {
    pub fn new(
        devices: Vec<String>,
        device_regex: Option<&str>,
        statuses: Vec<DiffStatus>,
    ) -> Result<Self, regex::Error> {
        let device_regex = device_regex.map(Regex::new).transpose()?;
        Ok(Self {
            devices,
            device_regex,
            statuses,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty() && self.device_regex.is_none() && self.statuses.is_empty()
    }

    fn has_device_filter(&self) -> bool {
        !self.devices.is_empty() || self.device_regex.is_some()
    }

    /// Either end listed by name, or either end matching the regex.
    fn matches_devices(&self, x: &str, y: &str) -> bool {
        if !self.has_device_filter() {
            return true;
        }
        if self.devices.iter().any(|d| d == x || d == y) {
            return true;
        }
        self.device_regex
            .as_ref()
            .is_some_and(|re| re.is_match(x) || re.is_match(y))
    }

    fn matches_status(&self, status: DiffStatus) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&status)
    }
}

pub fn filter_observations(
    observations: &[LinkObservation],
    filter: &OutputFilter,
) -> Vec<LinkObservation> {
    observations
        .iter()
        .filter(|obs| filter.matches_devices(&obs.local_device, &obs.remote_device))
        .cloned()
        .collect()
}

pub fn filter_diffs(diffs: &[LinkDiff], filter: &OutputFilter) -> Vec<LinkDiff> {
    diffs
        .iter()
        .filter(|diff| filter.matches_status(diff.status))
        .filter(|diff| filter.matches_devices(&diff.intent.device_a, &diff.intent.device_b))
        .cloned()
        .collect()
}
