use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audit_workflow::AuditReport;
use crate::cli::{usage_text, version_text};
use crate::collector::{CancelFlag, DiscoveryTransport, FailureKind};
use crate::command::AppCommand;
use crate::command_handlers::{audit_report, normalize_names};
use crate::exports::export_summary_text;
use crate::summary::RunOutcome;

pub type OutputHook = Arc<dyn Fn(&str) + Send + Sync>;
pub type EventHook = Arc<dyn Fn(&AppEvent) + Send + Sync>;

#[derive(Clone)]
pub struct AppContext {
    output_hook: OutputHook,
    event_hook: EventHook,
    cancel_flag: CancelFlag,
    transport: Option<Arc<dyn DiscoveryTransport>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppEvent {
    Info {
        message: String,
    },
    DeviceProgress {
        device: String,
        completed: usize,
        total: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure: Option<FailureKind>,
    },
    ReportWritten {
        path: String,
    },
    Cancelled {
        stage: String,
    },
}

/// One interface name and its canonical spelling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedName {
    pub raw: String,
    pub normalized: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum AppCommandResult {
    HelpText(String),
    VersionText(String),
    Normalized(Vec<NormalizedName>),
    Audit(Box<AuditReport>),
}

impl AppCommandResult {
    pub fn outcome(&self) -> RunOutcome {
        match self {
            AppCommandResult::Audit(report) => report.outcome,
            _ => RunOutcome::Success,
        }
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AppContext {
    pub fn from_env() -> Self {
        Self {
            output_hook: Arc::new(|line| println!("{}", line)),
            event_hook: Arc::new(|_| {}),
            cancel_flag: CancelFlag::new(),
            transport: None,
        }
    }

    pub fn with_output_hook(mut self, output_hook: OutputHook) -> Self {
        self.output_hook = output_hook;
        self
    }

    pub fn with_event_hook(mut self, event_hook: EventHook) -> Self {
        self.event_hook = event_hook;
        self
    }

    /// Replace the SNMP transport (used by tests and embedders).
    pub fn with_transport(mut self, transport: Arc<dyn DiscoveryTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn transport(&self) -> Option<Arc<dyn DiscoveryTransport>> {
        self.transport.clone()
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel_flag
    }

    pub fn emit_line(&self, line: &str) {
        (self.output_hook)(line);
    }

    pub fn emit_event(&self, event: AppEvent) {
        (self.event_hook)(&event);
    }

    pub fn cancel(&self) {
        self.cancel_flag.cancel();
    }

    pub fn reset_cancel(&self) {
        self.cancel_flag.reset();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.is_cancelled()
    }
}

/// Runs a parsed command and prints its result through the output hook.
///
/// Audit results map to [`RunOutcome::Partial`] when any device failed;
/// fatal and cancelled runs come back as `Err` (see
/// [`crate::exit_code_for_error`]).
pub async fn execute_command_with_context(
    command: AppCommand,
    context: &AppContext,
) -> Result<RunOutcome> {
    let result = execute_command_typed(command, context).await?;
    emit_command_result(&result, context)?;
    Ok(result.outcome())
}

/// Runs a parsed command and returns its payload without printing it.
pub async fn execute_command_typed(
    command: AppCommand,
    context: &AppContext,
) -> Result<AppCommandResult> {
    match command {
        AppCommand::Help => Ok(AppCommandResult::HelpText(usage_text())),
        AppCommand::Version => Ok(AppCommandResult::VersionText(version_text())),
        AppCommand::Normalize { names } => {
            Ok(AppCommandResult::Normalized(normalize_names(&names)))
        }
        AppCommand::Audit(options) => Ok(AppCommandResult::Audit(Box::new(
            audit_report(&options, context).await?,
        ))),
    }
}

fn emit_command_result(result: &AppCommandResult, context: &AppContext) -> Result<()> {
    match result {
        AppCommandResult::HelpText(text) => {
            context.emit_line(text);
            Ok(())
        }
        AppCommandResult::VersionText(text) => {
            context.emit_line(text);
            Ok(())
        }
        AppCommandResult::Normalized(names) => {
            for name in names {
                context.emit_line(&format!("{}\t{}", name.raw, name.normalized));
            }
            Ok(())
        }
        AppCommandResult::Audit(report) => {
            context.emit_line(export_summary_text(&report.summary).trim_end());
            for path in &report.files {
                context.emit_line(&format!("wrote {}", path.display()));
            }
            Ok(())
        }
    }
}
