use anyhow::Result;

use crate::app::{AppContext, AppEvent, NormalizedName};
use crate::audit_workflow::{AuditError, AuditReport, AuditRun};
use crate::command::AuditOptions;
use crate::normalize::normalize_interface;

pub(crate) fn normalize_names(names: &[String]) -> Vec<NormalizedName> {
    names
        .iter()
        .map(|raw| NormalizedName {
            raw: raw.clone(),
            normalized: normalize_interface(raw),
        })
        .collect()
}

pub(crate) async fn audit_report(
    options: &AuditOptions,
    context: &AppContext,
) -> Result<AuditReport> {
    ensure_not_cancelled(context, "audit")?;
    crate::log_stderr!("linkaudit v{}: LLDP wiring audit", env!("CARGO_PKG_VERSION"));

    let run = AuditRun::prepare(options)?;
    context.emit_event(AppEvent::Info {
        message: format!(
            "Loaded {} devices and {} intended links",
            run.device_count(),
            run.intent_count()
        ),
    });

    run.execute(context).await
}

pub(crate) fn ensure_not_cancelled(context: &AppContext, stage: &str) -> Result<(), AuditError> {
    if context.is_cancelled() {
        return Err(cancelled(context, stage));
    }
    Ok(())
}

pub(crate) fn cancelled(context: &AppContext, stage: &str) -> AuditError {
    context.emit_event(AppEvent::Cancelled {
        stage: stage.to_string(),
    });
    AuditError::Cancelled {
        stage: stage.to_string(),
    }
}
