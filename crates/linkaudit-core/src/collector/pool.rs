//! Bounded concurrent collection
//!
//! One tokio task per device, gated by a semaphore. Workers send their
//! report with the device's inventory index over an mpsc channel; the
//! aggregation loop is the only owner of the result slots. Collection
//! returns only after every task has finished.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};

use super::failure::{CollectionFailure, DeviceReport, FailureKind};
use super::lldp::build_device_report;
use super::transport::{DiscoveryTransport, MibTable, TransportError, WalkEntry};
use crate::config::{CollectorSettings, SNMP_RETRY_BACKOFF_MS};
use crate::models::{Device, RawDiscoveryRow};

/// Cooperative cancellation shared between the controller and workers.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Run-fatal collection errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectError {
    #[error("query mechanism unavailable: {0}")]
    MechanismUnavailable(String),
}

/// Progress notification emitted as each device report arrives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectProgress {
    pub device: String,
    pub completed: usize,
    pub total: usize,
    /// Device-level failure kind, if the device failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

/// Result of a whole collection run, in inventory order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionOutcome {
    pub reports: Vec<DeviceReport>,
    /// Cancellation was requested while collecting
    pub cancelled: bool,
}

impl CollectionOutcome {
    pub fn rows(&self) -> Vec<RawDiscoveryRow> {
        self.reports
            .iter()
            .flat_map(|report| report.rows.iter().cloned())
            .collect()
    }

    pub fn failures(&self) -> Vec<CollectionFailure> {
        self.reports
            .iter()
            .flat_map(|report| report.failures.iter().cloned())
            .collect()
    }
}

fn not_attempted(device: &Device) -> DeviceReport {
    DeviceReport::failed(
        CollectionFailure::new(
            &device.name,
            FailureKind::NotAttempted,
            "cancelled before the device was queried",
        ),
        0,
    )
}

async fn fetch_tables(
    transport: &dyn DiscoveryTransport,
    device: &Device,
    timeout: Duration,
) -> Result<(Vec<WalkEntry>, Vec<WalkEntry>), TransportError> {
    let loc = transport
        .walk(device, MibTable::LocPortTable, timeout)
        .await?;
    let rem = transport.walk(device, MibTable::RemTable, timeout).await?;
    Ok((loc, rem))
}

/// Collects one device with the retry policy applied.
pub async fn collect_device(
    transport: &dyn DiscoveryTransport,
    device: &Device,
    settings: &CollectorSettings,
    cancel: &CancelFlag,
) -> DeviceReport {
    if let Err(reason) = device.credential.validate() {
        crate::log_warn!("SNMP credentials invalid for {}: {}", device.name, reason);
        return DeviceReport::failed(
            CollectionFailure::new(&device.name, FailureKind::AuthFailed, reason),
            0,
        );
    }

    let max_attempts = settings.attempts();
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match fetch_tables(transport, device, settings.timeout).await {
            Ok((loc, rem)) => return build_device_report(&device.name, &loc, &rem, attempt),
            Err(e) => {
                let retry =
                    e.kind.is_transient() && attempt < max_attempts && !cancel.is_cancelled();
                if !retry {
                    crate::log_warn!(
                        "{} ({}): {} after {} attempt(s)",
                        device.name,
                        device.mgmt_ip,
                        e,
                        attempt
                    );
                    return DeviceReport::failed(
                        CollectionFailure::new(&device.name, e.kind, e.message),
                        attempt,
                    );
                }
                crate::log_debug!(
                    "{}: attempt {}/{} failed ({}), retrying",
                    device.name,
                    attempt,
                    max_attempts,
                    e.kind
                );
                tokio::time::sleep(Duration::from_millis(
                    SNMP_RETRY_BACKOFF_MS * u64::from(attempt),
                ))
                .await;
                if cancel.is_cancelled() {
                    crate::log_debug!("{}: cancelled during retry backoff", device.name);
                    return DeviceReport::failed(
                        CollectionFailure::new(&device.name, e.kind, e.message),
                        attempt,
                    );
                }
            }
        }
    }
}

/// Collects every device in `devices` with bounded concurrency.
///
/// Individual device failures are recorded in the returned reports; only a
/// missing query mechanism aborts the run.
pub async fn collect_all<F>(
    devices: &[Device],
    transport: Arc<dyn DiscoveryTransport>,
    settings: &CollectorSettings,
    cancel: &CancelFlag,
    mut on_progress: F,
) -> Result<CollectionOutcome, CollectError>
where
    F: FnMut(&CollectProgress) + Send,
{
    if let Err(e) = transport.preflight() {
        crate::log_error!("{} preflight failed: {}", transport.transport_id(), e);
        return Err(CollectError::MechanismUnavailable(e.message));
    }

    let total = devices.len();
    let concurrency = settings.effective_concurrency();
    crate::log_stderr!(
        "Collecting LLDP from {} devices ({} at a time)...",
        total,
        concurrency
    );

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let (tx, mut rx) = mpsc::channel::<(usize, DeviceReport)>(total.max(1));
    let mut slots: Vec<Option<DeviceReport>> = vec![None; total];
    let mut handles = Vec::with_capacity(total);

    for (index, device) in devices.iter().enumerate() {
        if cancel.is_cancelled() {
            slots[index] = Some(not_attempted(device));
            continue;
        }

        let semaphore = Arc::clone(&semaphore);
        let transport = Arc::clone(&transport);
        let settings = settings.clone();
        let cancel = cancel.clone();
        let device = device.clone();
        let tx = tx.clone();

        let handle = tokio::spawn(async move {
            let report = match semaphore.acquire_owned().await {
                Ok(_permit) if cancel.is_cancelled() => not_attempted(&device),
                Ok(_permit) => {
                    collect_device(transport.as_ref(), &device, &settings, &cancel).await
                }
                Err(e) => DeviceReport::failed(
                    CollectionFailure::new(
                        &device.name,
                        FailureKind::UnknownError,
                        format!("collector semaphore closed: {}", e),
                    ),
                    0,
                ),
            };
            if tx.send((index, report)).await.is_err() {
                crate::log_warn!("Result channel closed before {} reported", device.name);
            }
        });
        handles.push((index, handle));
    }
    drop(tx);

    let mut completed = 0;
    while let Some((index, report)) = rx.recv().await {
        completed += 1;
        on_progress(&CollectProgress {
            device: report.device.clone(),
            completed,
            total,
            failure: report.device_failure().map(|f| f.kind),
        });
        slots[index] = Some(report);
    }

    for (index, handle) in handles {
        if let Err(e) = handle.await {
            crate::log_error!("Collector task for {} failed: {}", devices[index].name, e);
            if slots[index].is_none() {
                slots[index] = Some(DeviceReport::failed(
                    CollectionFailure::new(
                        &devices[index].name,
                        FailureKind::UnknownError,
                        format!("collector task aborted: {}", e),
                    ),
                    0,
                ));
            }
        }
    }

    let reports: Vec<DeviceReport> = slots
        .into_iter()
        .zip(devices)
        .map(|(slot, device)| {
            slot.unwrap_or_else(|| {
                DeviceReport::failed(
                    CollectionFailure::new(
                        &device.name,
                        FailureKind::UnknownError,
                        "collector produced no report",
                    ),
                    0,
                )
            })
        })
        .collect();

    let attempted: Vec<&DeviceReport> = reports.iter().filter(|r| r.attempts > 0).collect();
    if !attempted.is_empty()
        && attempted.iter().all(|r| {
            r.device_failure()
                .is_some_and(|f| f.kind == FailureKind::QueryMechanismMissing)
        })
    {
        let detail = attempted
            .first()
            .and_then(|r| r.device_failure())
            .map(|f| f.detail.clone())
            .unwrap_or_default();
        return Err(CollectError::MechanismUnavailable(detail));
    }

    let failed = reports
        .iter()
        .filter(|r| r.device_failure().is_some())
        .count();
    crate::log_stderr!(
        "Collection complete: {} devices, {} failed",
        reports.len(),
        failed
    );

    Ok(CollectionOutcome {
        reports,
        cancelled: cancel.is_cancelled(),
    })
}
