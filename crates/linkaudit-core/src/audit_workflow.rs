//! One audit run from input files to written reports
//!
//! Load inventory and intent, collect LLDP over SNMP (or replay a saved
//! snapshot), infer links, diff them against the intent and write the
//! reports. Everything a run needs is owned by [`AuditRun`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::app::{AppContext, AppEvent};
use crate::collector::{
    CollectError, CollectProgress, CollectionFailure, DiscoveryTransport, FailureKind,
    SnmpWalkTransport, collect_all,
};
use crate::command::{AuditOptions, OutputFormat};
use crate::command_handlers::{cancelled, ensure_not_cancelled};
use crate::config::CollectorSettings;
use crate::diff::classify_links;
use crate::exports::{
    export_diffs_csv, export_diffs_json, export_observations_csv, export_observations_json,
    export_summary_json, export_summary_text,
};
use crate::filters::{OutputFilter, filter_diffs, filter_observations};
use crate::inference::infer_links;
use crate::inventory::{InputError, load_devices, load_intents};
use crate::models::{Device, LinkDiff, LinkIntent, LinkObservation, RawDiscoveryRow};
use crate::normalize::AliasMap;
use crate::snapshot::{CollectionSnapshot, load_snapshot, save_snapshot};
use crate::summary::{AuditSummary, EXIT_CANCELLED, EXIT_UNEXPECTED, RunOutcome};

/// Errors that end a run before any report is written
#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Collection(#[from] CollectError),
    #[error("invalid --device-regex: {0}")]
    InvalidFilter(#[from] regex::Error),
    #[error("Operation cancelled ({stage})")]
    Cancelled { stage: String },
}

impl AuditError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AuditError::Input(_) | AuditError::Collection(_) | AuditError::InvalidFilter(_) => {
                RunOutcome::Fatal.exit_code()
            }
            AuditError::Cancelled { .. } => EXIT_CANCELLED,
        }
    }
}

/// Process exit status for an error returned by the app layer.
pub fn exit_code_for_error(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<AuditError>()
        .map(AuditError::exit_code)
        .unwrap_or(EXIT_UNEXPECTED)
}

/// Where the LLDP rows of a run came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowSource {
    Snmp,
    Snapshot { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub source: RowSource,
    pub summary: AuditSummary,
    pub outcome: RunOutcome,
    /// Every inferred link, before output filters
    pub observations: Vec<LinkObservation>,
    /// One verdict per intended link, before output filters
    pub diffs: Vec<LinkDiff>,
    pub failures: Vec<CollectionFailure>,
    /// Report files written, in write order
    pub files: Vec<PathBuf>,
}

/// State of a single audit run.
pub struct AuditRun {
    options: AuditOptions,
    devices: Vec<Device>,
    intents: Vec<LinkIntent>,
    aliases: AliasMap,
    filter: OutputFilter,
    settings: CollectorSettings,
}

impl AuditRun {
    /// Validates filters and loads both CSV inputs.
    pub fn prepare(options: &AuditOptions) -> Result<Self, AuditError> {
        let filter = OutputFilter::new(
            options.device_names.clone(),
            options.device_regex.as_deref(),
            options.statuses.clone(),
        )?;
        let devices = load_devices(&options.devices)?;
        let intents = load_intents(&options.intent)?;
        let aliases = AliasMap::from_devices(&devices);

        Ok(Self {
            options: options.clone(),
            devices,
            intents,
            aliases,
            filter,
            settings: collector_settings(options),
        })
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn intent_count(&self) -> usize {
        self.intents.len()
    }

    pub async fn execute(self, context: &AppContext) -> Result<AuditReport> {
        // Phase 1: rows from the network or from a snapshot
        let (source, rows, failures) = match &self.options.load_observations {
            Some(path) => {
                let snapshot = load_snapshot(path).map_err(AuditError::from)?;
                crate::log_stderr!(
                    "Loaded {} LLDP rows from {} (collected {})",
                    snapshot.rows.len(),
                    path.display(),
                    snapshot.generated_at.to_rfc3339()
                );
                (
                    RowSource::Snapshot { path: path.clone() },
                    snapshot.rows,
                    snapshot.failures,
                )
            }
            None => {
                let (rows, failures) = self.collect(context).await?;
                (RowSource::Snmp, rows, failures)
            }
        };

        // Phase 2: inference and diff on a complete row set only
        ensure_not_cancelled(context, "inference")?;
        let observations = infer_links(&rows, &self.aliases);
        let diffs = classify_links(&self.intents, &observations);
        let summary = AuditSummary::build(self.devices.len(), &failures, &observations, &diffs);
        let outcome = summary.outcome();
        crate::log_stderr!(
            "Inferred {} links; {} of {} intended links differ",
            observations.len(),
            summary.mismatch_links,
            diffs.len()
        );

        // Phase 3: reports
        let files = self.write_reports(context, &observations, &diffs, &summary)?;

        Ok(AuditReport {
            source,
            summary,
            outcome,
            observations,
            diffs,
            failures,
            files,
        })
    }

    async fn collect(
        &self,
        context: &AppContext,
    ) -> Result<(Vec<RawDiscoveryRow>, Vec<CollectionFailure>)> {
        let transport: Arc<dyn DiscoveryTransport> = match context.transport() {
            Some(transport) => transport,
            None => Arc::new(SnmpWalkTransport::from_settings(&self.settings)),
        };
        let show_progress = self.options.show_progress;

        let outcome = collect_all(
            &self.devices,
            transport,
            &self.settings,
            context.cancel_flag(),
            |progress: &CollectProgress| report_progress(context, progress, show_progress),
        )
        .await
        .map_err(AuditError::from)?;

        if outcome.cancelled {
            let skipped = outcome
                .reports
                .iter()
                .filter(|r| {
                    r.device_failure()
                        .is_some_and(|f| f.kind == FailureKind::NotAttempted)
                })
                .count();
            crate::log_warn!(
                "Collection cancelled; {} devices were not queried",
                skipped
            );
            return Err(cancelled(context, "collection").into());
        }

        let snapshot = CollectionSnapshot::from_outcome(&outcome);
        if let Some(path) = &self.options.save_observations {
            save_snapshot(path, &snapshot)?;
            context.emit_event(AppEvent::Info {
                message: format!("Saved LLDP rows to {}", path.display()),
            });
        }

        Ok((snapshot.rows, snapshot.failures))
    }

    fn write_reports(
        &self,
        context: &AppContext,
        observations: &[LinkObservation],
        diffs: &[LinkDiff],
        summary: &AuditSummary,
    ) -> Result<Vec<PathBuf>> {
        let out_dir = &self.options.out_dir;
        std::fs::create_dir_all(out_dir).with_context(|| {
            format!("Failed to create output directory {}", out_dir.display())
        })?;

        let observations = filter_observations(observations, &self.filter);
        let diffs = filter_diffs(diffs, &self.filter);
        if !self.filter.is_empty() {
            crate::log_debug!(
                "Output filters kept {} links and {} diffs",
                observations.len(),
                diffs.len()
            );
        }

        let format: OutputFormat = self.options.format;
        let mut files = Vec::new();
        if format.writes_csv() {
            write_report(
                context,
                out_dir,
                "asis_links.csv",
                &export_observations_csv(&observations)?,
                &mut files,
            )?;
            write_report(
                context,
                out_dir,
                "diff_links.csv",
                &export_diffs_csv(&diffs)?,
                &mut files,
            )?;
            write_report(
                context,
                out_dir,
                "summary.txt",
                &export_summary_text(summary),
                &mut files,
            )?;
        }
        if format.writes_json() {
            write_report(
                context,
                out_dir,
                "asis_links.json",
                &export_observations_json(&observations)?,
                &mut files,
            )?;
            write_report(
                context,
                out_dir,
                "diff_links.json",
                &export_diffs_json(&diffs)?,
                &mut files,
            )?;
            write_report(
                context,
                out_dir,
                "summary.json",
                &export_summary_json(summary)?,
                &mut files,
            )?;
        }
        Ok(files)
    }
}

fn collector_settings(options: &AuditOptions) -> CollectorSettings {
    let mut settings = CollectorSettings::from_env();
    if let Some(secs) = options.timeout_secs {
        settings = settings.with_timeout_secs(secs);
    }
    if let Some(retries) = options.retries {
        settings = settings.with_retries(retries);
    }
    if let Some(concurrency) = options.concurrency {
        settings = settings.with_max_concurrency(concurrency);
    }
    if let Some(port) = options.port {
        settings = settings.with_port(port);
    }
    settings
}

fn report_progress(context: &AppContext, progress: &CollectProgress, show_progress: bool) {
    if show_progress {
        match progress.failure {
            Some(kind) => {
                crate::log_stderr!(
                    "[{}/{}] {}: {}",
                    progress.completed,
                    progress.total,
                    progress.device,
                    kind
                );
            }
            None => {
                crate::log_stderr!(
                    "[{}/{}] {}: ok",
                    progress.completed,
                    progress.total,
                    progress.device
                );
            }
        }
    }
    context.emit_event(AppEvent::DeviceProgress {
        device: progress.device.clone(),
        completed: progress.completed,
        total: progress.total,
        failure: progress.failure,
    });
}

fn write_report(
    context: &AppContext,
    out_dir: &Path,
    file_name: &str,
    contents: &str,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    let path = out_dir.join(file_name);
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    context.emit_event(AppEvent::ReportWritten {
        path: path.display().to_string(),
    });
    files.push(path);
    Ok(())
}
