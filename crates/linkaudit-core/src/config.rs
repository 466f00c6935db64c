//! Configuration constants for the wiring audit

use std::time::Duration;

// ====== SNMP Collection Configuration ======

/// Per-request SNMP timeout in seconds
///
/// Applies to every GETNEXT of a table walk, not to the walk as a whole, so
/// one attempt at a device can take up to this timeout times the number of
/// table entries.
pub const SNMP_TIMEOUT_SECS: u64 = 2;

/// Number of extra attempts for a device after a transient failure
pub const SNMP_RETRIES: u8 = 1;

/// Base delay before a retry; multiplied by the attempt number
pub const SNMP_RETRY_BACKOFF_MS: u64 = 250;

/// SNMP agent UDP port
pub const SNMP_PORT: u16 = 161;

/// Default number of devices queried at the same time
pub const MAX_CONCURRENT_DEVICES: usize = 4;

/// Ceiling applied to any configured concurrency, so a typo in a flag or
/// env var cannot flood the management network or exhaust local sockets.
pub const HARD_MAX_CONCURRENT_DEVICES: usize = 32;

/// Upper bound on GETNEXT steps for a single table walk
pub const MAX_WALK_ENTRIES: usize = 20_000;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse_u64(name: &str, default: u64, min: u64, max: u64) -> u64 {
    match env_var(name).and_then(|v| v.parse::<u64>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_parse_usize(name: &str, default: usize, min: usize, max: usize) -> usize {
    match env_var(name).and_then(|v| v.parse::<usize>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_parse_u16(name: &str, default: u16, min: u16, max: u16) -> u16 {
    match env_var(name).and_then(|v| v.parse::<u16>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

fn env_parse_u8(name: &str, default: u8, min: u8, max: u8) -> u8 {
    match env_var(name).and_then(|v| v.parse::<u8>().ok()) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

/// Runtime-tunable SNMP timeout.
/// Env: `LINKAUDIT_SNMP_TIMEOUT_SECS`
pub fn snmp_timeout() -> Duration {
    Duration::from_secs(env_parse_u64(
        "LINKAUDIT_SNMP_TIMEOUT_SECS",
        SNMP_TIMEOUT_SECS,
        1,
        60,
    ))
}

/// Runtime-tunable SNMP retry count.
/// Env: `LINKAUDIT_SNMP_RETRIES`
pub fn snmp_retries() -> u8 {
    env_parse_u8("LINKAUDIT_SNMP_RETRIES", SNMP_RETRIES, 0, 5)
}

/// Runtime-tunable SNMP port.
/// Env: `LINKAUDIT_SNMP_PORT`
pub fn snmp_port() -> u16 {
    env_parse_u16("LINKAUDIT_SNMP_PORT", SNMP_PORT, 1, u16::MAX)
}

/// Runtime-tunable device concurrency.
/// Env: `LINKAUDIT_MAX_CONCURRENT_DEVICES`
pub fn max_concurrent_devices() -> usize {
    env_parse_usize(
        "LINKAUDIT_MAX_CONCURRENT_DEVICES",
        MAX_CONCURRENT_DEVICES,
        1,
        HARD_MAX_CONCURRENT_DEVICES,
    )
}

/// Runtime-tunable walk length guard.
/// Env: `LINKAUDIT_MAX_WALK_ENTRIES`
pub fn max_walk_entries() -> usize {
    env_parse_usize(
        "LINKAUDIT_MAX_WALK_ENTRIES",
        MAX_WALK_ENTRIES,
        100,
        1_000_000,
    )
}

/// Settings for one collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorSettings {
    /// Bound on each SNMP request (see [`SNMP_TIMEOUT_SECS`])
    pub timeout: Duration,
    pub retries: u8,
    pub max_concurrency: usize,
    pub port: u16,
    pub max_walk_entries: usize,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(SNMP_TIMEOUT_SECS),
            retries: SNMP_RETRIES,
            max_concurrency: MAX_CONCURRENT_DEVICES,
            port: SNMP_PORT,
            max_walk_entries: MAX_WALK_ENTRIES,
        }
    }
}

impl CollectorSettings {
    pub fn from_env() -> Self {
        Self {
            timeout: snmp_timeout(),
            retries: snmp_retries(),
            max_concurrency: max_concurrent_devices(),
            port: snmp_port(),
            max_walk_entries: max_walk_entries(),
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs.max(1));
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Total attempts per device (first try plus retries).
    pub fn attempts(&self) -> u32 {
        u32::from(self.retries) + 1
    }

    /// Concurrency actually used by the worker pool.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.clamp(1, HARD_MAX_CONCURRENT_DEVICES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_concurrency_is_capped() {
        let settings = CollectorSettings::default().with_max_concurrency(10_000);
        assert_eq!(
            settings.effective_concurrency(),
            HARD_MAX_CONCURRENT_DEVICES
        );

        let settings = CollectorSettings::default().with_max_concurrency(0);
        assert_eq!(settings.effective_concurrency(), 1);
    }

    #[test]
    fn attempts_include_first_try() {
        let settings = CollectorSettings::default().with_retries(2);
        assert_eq!(settings.attempts(), 3);
    }
}
