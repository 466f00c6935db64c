//! linkaudit: LLDP wiring audit over SNMP
//!
//! This crate compares the cabling a network actually has with the cabling
//! it is supposed to have:
//! - LLDP-MIB collection over SNMP v1/v2c/v3 with bounded concurrency
//! - Interface name and device identity normalization
//! - Link inference with confidence levels
//! - Per-intent diff classification
//! - CSV, JSON and text reports

pub mod app;
pub mod audit_workflow;
pub mod cli;
pub mod cli_adapter;
pub mod collector;
pub mod command;
mod command_handlers;
pub mod config;
pub mod diff;
pub mod exports;
pub mod filters;
pub mod inference;
pub mod inventory;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod snapshot;
pub mod summary;

pub use app::{
    AppCommandResult, AppContext, AppEvent, EventHook, NormalizedName, OutputHook,
    execute_command_typed, execute_command_with_context,
};
pub use audit_workflow::{AuditError, AuditReport, AuditRun, RowSource, exit_code_for_error};
pub use cli::{CliCommand, parse_cli_args, requested_log_level, usage_text, version_text};
pub use cli_adapter::{run_with_context, run_with_ctrl_c};
pub use collector::{
    CancelFlag, CollectError, CollectProgress, CollectionFailure, CollectionOutcome,
    DeviceReport, DiscoveryTransport, FailureKind, MibTable, SnmpWalkTransport, TransportError,
    WalkEntry, WalkFuture, WalkValue, collect_all, collect_device,
};
pub use command::{AppCommand, AuditOptions, OutputFormat};
pub use config::*;
pub use diff::classify_links;
pub use exports::{
    export_diffs_csv, export_diffs_json, export_observations_csv, export_observations_json,
    export_summary_json, export_summary_text,
};
pub use filters::{OutputFilter, filter_diffs, filter_observations};
pub use inference::infer_links;
pub use inventory::{InputError, load_devices, load_intents, parse_devices, parse_intents};
pub use models::*;
pub use normalize::{AliasMap, normalize_interface, resolve_device_identity};
pub use snapshot::{CollectionSnapshot, load_snapshot, save_snapshot};
pub use summary::{AuditSummary, EXIT_CANCELLED, EXIT_UNEXPECTED, RunOutcome};

// Re-export logging macros for use across crate
pub use crate::logging::macros;
