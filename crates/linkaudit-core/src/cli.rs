use std::path::PathBuf;

use anyhow::Result;

use crate::command::{AppCommand, AuditOptions, OutputFormat};
use crate::config::{
    HARD_MAX_CONCURRENT_DEVICES, MAX_CONCURRENT_DEVICES, SNMP_PORT, SNMP_RETRIES,
    SNMP_TIMEOUT_SECS,
};
use crate::logging::level_directive;
use crate::models::DiffStatus;

pub type CliCommand = AppCommand;

pub fn version_text() -> String {
    format!("linkaudit {}", env!("CARGO_PKG_VERSION"))
}

pub fn usage_text() -> String {
    format!(
        "{version}
LLDP wiring audit: compares observed cabling with the intended topology

Usage:
  linkaudit audit --devices <CSV> --intent <CSV> --out-dir <DIR> [options]
  linkaudit normalize <INTERFACE>...
  linkaudit --help
  linkaudit --version

Audit options:
      --devices <CSV>             Device inventory (name, mgmt_ip, snmp_version, ...)
      --intent <CSV>              Intended links (device_a, port_a, device_b, port_b)
      --out-dir <DIR>             Directory for asis_links, diff_links and summary files
      --format <csv|json|both>    Output format (default: csv)
      --timeout <SECS>            SNMP timeout per request (default: {timeout})
      --retries <N>               Extra attempts after a transient failure (default: {retries})
      --concurrency <N>           Devices queried at once (default: {concurrency}, max: {max_concurrency})
      --port <N>                  SNMP agent port (default: {port})
      --save-observations <FILE>  Save collected LLDP rows as JSON
      --load-observations <FILE>  Use saved LLDP rows instead of querying devices
      --dry-run                   Skip SNMP entirely (requires --load-observations)
      --device <NAME>             Only report links touching NAME (repeatable)
      --device-regex <RE>         Only report links touching a device matching RE
      --status <STATUS>           Only report diffs with STATUS (repeatable, comma-separated)
      --show-progress             Log per-device collection progress
      --log-level <LEVEL>         error, warn, info, debug or trace (default: info)

General:
  -h, --help                      Show this help text
  -V, --version                   Show version

Exit status:
  0 all devices collected, 2 some devices failed, 3 invalid input or SNMP
  unavailable, 130 cancelled, 1 any other error.

Notes:
  - Running with no arguments shows this help screen.
  - Environment overrides: LINKAUDIT_SNMP_TIMEOUT_SECS, LINKAUDIT_SNMP_RETRIES,
    LINKAUDIT_MAX_CONCURRENT_DEVICES, LINKAUDIT_SNMP_PORT, LINKAUDIT_MAX_WALK_ENTRIES.
  - Log files go to LINKAUDIT_LOG_DIR when set.",
        version = version_text(),
        timeout = SNMP_TIMEOUT_SECS,
        retries = SNMP_RETRIES,
        concurrency = MAX_CONCURRENT_DEVICES,
        max_concurrency = HARD_MAX_CONCURRENT_DEVICES,
        port = SNMP_PORT,
    )
}

fn invalid_value(flag: &str, raw: &str, expected: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Invalid value for {}: '{}'. Expected {}.\n\n{}",
        flag,
        raw,
        expected,
        usage_text()
    )
}

fn parse_positive<T>(flag: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|v| *v > T::default())
        .ok_or_else(|| invalid_value(flag, raw, "a positive integer"))
}

fn parse_retries(raw: &str) -> Result<u8> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .filter(|v| *v <= 5)
        .ok_or_else(|| invalid_value("--retries", raw, "an integer between 0 and 5"))
}

fn parse_statuses(raw: &str) -> Result<Vec<DiffStatus>> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            DiffStatus::parse(part).ok_or_else(|| {
                invalid_value(
                    "--status",
                    part,
                    "one of EXACT_MATCH, PORT_MISMATCH, DEVICE_MISMATCH, PARTIAL_OBSERVED, MISSING_ASIS, UNKNOWN",
                )
            })
        })
        .collect()
}

/// Value of a flag given either inline (`--flag=value`) or as the next argument.
fn take_value<I, S>(flag: &str, inline: Option<&str>, iter: &mut I) -> Result<String>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    let value = match inline {
        Some(value) => value.to_string(),
        None => iter
            .next()
            .map(|value| value.as_ref().to_string())
            .unwrap_or_default(),
    };
    if value.trim().is_empty() {
        return Err(anyhow::anyhow!(
            "Missing value for {}.\n\n{}",
            flag,
            usage_text()
        ));
    }
    Ok(value)
}

/// Log level requested with `--log-level`, read before logging is set up.
/// Invalid or missing values yield `None`; `parse_cli_args` reports them.
pub fn requested_log_level<S: AsRef<str>>(args: &[S]) -> Option<&'static str> {
    let mut iter = args.iter().map(|arg| -> &str { arg.as_ref() });
    while let Some(arg) = iter.next() {
        if arg == "--log-level" {
            return iter.next().and_then(level_directive);
        }
        if let Some(value) = arg.strip_prefix("--log-level=") {
            return level_directive(value);
        }
    }
    None
}

pub fn parse_cli_args<I, S>(args: I) -> Result<AppCommand>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut iter = args.into_iter();
    let _program_name = iter.next();

    let mut command: Option<String> = None;
    let mut names: Vec<String> = Vec::new();
    let mut options = AuditOptions::default();
    let mut devices: Option<PathBuf> = None;
    let mut intent: Option<PathBuf> = None;
    let mut out_dir: Option<PathBuf> = None;
    let mut audit_flags = false;

    while let Some(arg) = iter.next() {
        let arg = arg.as_ref();

        if command.as_deref() == Some("normalize") && !arg.starts_with('-') {
            names.push(arg.to_string());
            continue;
        }

        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
            _ => (arg, None),
        };

        match flag {
            "-h" | "--help" => return Ok(AppCommand::Help),
            "-V" | "--version" => return Ok(AppCommand::Version),
            "audit" | "normalize" => {
                if command.as_deref().is_some_and(|existing| existing != flag) {
                    return Err(anyhow::anyhow!(
                        "Multiple commands provided. Use only one command.\n\n{}",
                        usage_text()
                    ));
                }
                command = Some(flag.to_string());
                continue;
            }
            _ => {}
        }

        audit_flags = true;
        match flag {
            "--devices" => {
                devices = Some(PathBuf::from(take_value(flag, inline, &mut iter)?));
            }
            "--intent" | "--tobe" => {
                intent = Some(PathBuf::from(take_value(flag, inline, &mut iter)?));
            }
            "--out-dir" => {
                out_dir = Some(PathBuf::from(take_value(flag, inline, &mut iter)?));
            }
            "--format" | "--output-format" => {
                let value = take_value(flag, inline, &mut iter)?;
                options.format = OutputFormat::parse(&value)
                    .ok_or_else(|| invalid_value(flag, &value, "csv, json or both"))?;
            }
            "--timeout" | "--snmp-timeout" => {
                let value = take_value(flag, inline, &mut iter)?;
                options.timeout_secs = Some(parse_positive::<u64>(flag, &value)?);
            }
            "--retries" | "--snmp-retries" => {
                let value = take_value(flag, inline, &mut iter)?;
                options.retries = Some(parse_retries(&value)?);
            }
            "--concurrency" => {
                let value = take_value(flag, inline, &mut iter)?;
                options.concurrency = Some(parse_positive::<usize>(flag, &value)?);
            }
            "--port" => {
                let value = take_value(flag, inline, &mut iter)?;
                options.port = Some(parse_positive::<u16>(flag, &value)?);
            }
            "--save-observations" => {
                options.save_observations =
                    Some(PathBuf::from(take_value(flag, inline, &mut iter)?));
            }
            "--load-observations" => {
                options.load_observations =
                    Some(PathBuf::from(take_value(flag, inline, &mut iter)?));
            }
            "--dry-run" if inline.is_none() => options.dry_run = true,
            "--show-progress" if inline.is_none() => options.show_progress = true,
            "--device" => {
                options
                    .device_names
                    .push(take_value(flag, inline, &mut iter)?);
            }
            "--device-regex" => {
                options.device_regex = Some(take_value(flag, inline, &mut iter)?);
            }
            "--status" => {
                let value = take_value(flag, inline, &mut iter)?;
                for status in parse_statuses(&value)? {
                    if !options.statuses.contains(&status) {
                        options.statuses.push(status);
                    }
                }
            }
            "--log-level" => {
                let value = take_value(flag, inline, &mut iter)?;
                let level = level_directive(&value).ok_or_else(|| {
                    invalid_value(flag, &value, "error, warn, info, debug or trace")
                })?;
                options.log_level = Some(level.to_string());
            }
            _ => {
                return Err(anyhow::anyhow!(
                    "Unknown argument: {arg}\n\n{}",
                    usage_text()
                ));
            }
        }
    }

    match command.as_deref() {
        None if !audit_flags => Ok(AppCommand::Help),
        None => Err(anyhow::anyhow!(
            "Missing command. Use one of: audit, normalize.\n\n{}",
            usage_text()
        )),
        Some("normalize") => {
            if audit_flags {
                return Err(anyhow::anyhow!(
                    "Audit options are not valid with normalize.\n\n{}",
                    usage_text()
                ));
            }
            if names.is_empty() {
                return Err(anyhow::anyhow!(
                    "normalize needs at least one interface name.\n\n{}",
                    usage_text()
                ));
            }
            Ok(AppCommand::Normalize { names })
        }
        Some(_) => {
            let mut missing = Vec::new();
            if devices.is_none() {
                missing.push("--devices");
            }
            if intent.is_none() {
                missing.push("--intent");
            }
            if out_dir.is_none() {
                missing.push("--out-dir");
            }
            if !missing.is_empty() {
                return Err(anyhow::anyhow!(
                    "audit requires {}.\n\n{}",
                    missing.join(", "),
                    usage_text()
                ));
            }
            if options.dry_run && options.load_observations.is_none() {
                return Err(anyhow::anyhow!(
                    "--dry-run requires --load-observations.\n\n{}",
                    usage_text()
                ));
            }
            if options.load_observations.is_some() && options.save_observations.is_some() {
                return Err(anyhow::anyhow!(
                    "--save-observations has nothing to save when --load-observations is used.\n\n{}",
                    usage_text()
                ));
            }
            options.devices = devices.unwrap_or_default();
            options.intent = intent.unwrap_or_default();
            options.out_dir = out_dir.unwrap_or_default();
            Ok(AppCommand::Audit(options))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audit_args<'a>(extra: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec![
            "linkaudit",
            "audit",
            "--devices",
            "devices.csv",
            "--intent",
            "intent.csv",
            "--out-dir",
            "out",
        ];
        args.extend_from_slice(extra);
        args
    }

    fn parsed_audit(extra: &[&str]) -> AuditOptions {
        match parse_cli_args(audit_args(extra)).expect("audit args should parse") {
            CliCommand::Audit(options) => options,
            other => panic!("expected audit command, got {:?}", other),
        }
    }

    #[test]
    fn parse_help_flag() {
        let parsed = parse_cli_args(["linkaudit", "--help"]).expect("help args should parse");
        assert_eq!(parsed, CliCommand::Help);
    }

    #[test]
    fn parse_version_flag() {
        let parsed = parse_cli_args(["linkaudit", "-V"]).expect("version args should parse");
        assert_eq!(parsed, CliCommand::Version);
    }

    #[test]
    fn parse_default_no_args_shows_help() {
        let parsed = parse_cli_args(["linkaudit"]).expect("default args should parse");
        assert_eq!(parsed, CliCommand::Help);
    }

    #[test]
    fn parse_audit_with_defaults() {
        let options = parsed_audit(&[]);
        assert_eq!(options.devices, PathBuf::from("devices.csv"));
        assert_eq!(options.intent, PathBuf::from("intent.csv"));
        assert_eq!(options.out_dir, PathBuf::from("out"));
        assert_eq!(options.format, OutputFormat::Csv);
        assert_eq!(options.timeout_secs, None);
        assert!(!options.dry_run);
        assert!(options.statuses.is_empty());
    }

    #[test]
    fn parse_audit_with_inline_and_separate_values() {
        let options = parsed_audit(&[
            "--format=both",
            "--timeout",
            "5",
            "--retries=0",
            "--concurrency",
            "8",
            "--port=1161",
            "--device",
            "leaf01",
            "--device=spine01",
            "--device-regex",
            "^leaf",
            "--status",
            "port-mismatch,missing_asis",
            "--status=MISSING_ASIS",
            "--show-progress",
            "--log-level=DEBUG",
        ]);
        assert_eq!(options.format, OutputFormat::Both);
        assert_eq!(options.timeout_secs, Some(5));
        assert_eq!(options.retries, Some(0));
        assert_eq!(options.concurrency, Some(8));
        assert_eq!(options.port, Some(1161));
        assert_eq!(options.device_names, vec!["leaf01", "spine01"]);
        assert_eq!(options.device_regex.as_deref(), Some("^leaf"));
        assert_eq!(
            options.statuses,
            vec![DiffStatus::PortMismatch, DiffStatus::MissingAsis]
        );
        assert!(options.show_progress);
        assert_eq!(options.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn parse_audit_accepts_legacy_flag_names() {
        let args = [
            "linkaudit",
            "audit",
            "--devices",
            "d.csv",
            "--tobe",
            "t.csv",
            "--out-dir",
            "o",
            "--output-format",
            "json",
            "--snmp-timeout",
            "3",
            "--snmp-retries",
            "2",
        ];
        let parsed = parse_cli_args(args).expect("legacy flags should parse");
        let CliCommand::Audit(options) = parsed else {
            panic!("expected audit command");
        };
        assert_eq!(options.intent, PathBuf::from("t.csv"));
        assert_eq!(options.format, OutputFormat::Json);
        assert_eq!(options.timeout_secs, Some(3));
        assert_eq!(options.retries, Some(2));
    }

    #[test]
    fn parse_dry_run_with_loaded_observations() {
        let options = parsed_audit(&["--dry-run", "--load-observations", "rows.json"]);
        assert!(options.dry_run);
        assert_eq!(options.load_observations, Some(PathBuf::from("rows.json")));
    }

    #[test]
    fn parse_dry_run_requires_loaded_observations() {
        let err = parse_cli_args(audit_args(&["--dry-run"]))
            .expect_err("dry-run without observations should fail");
        assert!(err.to_string().contains("--dry-run requires --load-observations"));
    }

    #[test]
    fn parse_rejects_save_with_load() {
        let err = parse_cli_args(audit_args(&[
            "--load-observations",
            "a.json",
            "--save-observations",
            "b.json",
        ]))
        .expect_err("save with load should fail");
        assert!(err.to_string().contains("nothing to save"));
    }

    #[test]
    fn parse_audit_reports_missing_required_flags() {
        let err = parse_cli_args(["linkaudit", "audit", "--devices", "d.csv"])
            .expect_err("audit without intent should fail");
        let message = err.to_string();
        assert!(message.contains("--intent, --out-dir"));
    }

    #[test]
    fn parse_rejects_invalid_values() {
        let err = parse_cli_args(audit_args(&["--format", "xml"])).expect_err("bad format");
        assert!(err.to_string().contains("Invalid value for --format"));

        let err = parse_cli_args(audit_args(&["--concurrency", "0"])).expect_err("zero");
        assert!(err.to_string().contains("positive integer"));

        let err = parse_cli_args(audit_args(&["--retries", "9"])).expect_err("too many");
        assert!(err.to_string().contains("between 0 and 5"));

        let err = parse_cli_args(audit_args(&["--status", "BROKEN"])).expect_err("status");
        assert!(err.to_string().contains("Invalid value for --status"));

        let err = parse_cli_args(audit_args(&["--timeout"])).expect_err("missing value");
        assert!(err.to_string().contains("Missing value for --timeout"));
    }

    #[test]
    fn parse_normalize_collects_names() {
        let parsed = parse_cli_args(["linkaudit", "normalize", "GigabitEthernet0/1", "Eth1/1"])
            .expect("normalize should parse");
        assert_eq!(
            parsed,
            CliCommand::Normalize {
                names: vec!["GigabitEthernet0/1".to_string(), "Eth1/1".to_string()]
            }
        );
    }

    #[test]
    fn parse_normalize_rejects_audit_flags_and_empty_input() {
        let err = parse_cli_args(["linkaudit", "--out-dir", "o", "normalize", "Eth1"])
            .expect_err("normalize should reject audit flags");
        assert!(err.to_string().contains("not valid with normalize"));

        let err = parse_cli_args(["linkaudit", "normalize"]).expect_err("no names");
        assert!(err.to_string().contains("at least one interface name"));
    }

    #[test]
    fn parse_unknown_argument_errors() {
        let err = parse_cli_args(["linkaudit", "audit", "--bogus"]).expect_err("unknown flag");
        assert!(err.to_string().contains("Unknown argument: --bogus"));
    }

    #[test]
    fn parse_flags_without_command_errors() {
        let err = parse_cli_args(["linkaudit", "--devices", "d.csv"])
            .expect_err("flags without command should fail");
        assert!(err.to_string().contains("Missing command"));
    }

    #[test]
    fn requested_log_level_reads_both_spellings() {
        assert_eq!(
            requested_log_level(&["linkaudit", "audit", "--log-level", "WARN"]),
            Some("warn")
        );
        assert_eq!(
            requested_log_level(&["linkaudit", "--log-level=trace"]),
            Some("trace")
        );
        assert_eq!(requested_log_level(&["linkaudit", "--log-level=loud"]), None);
        assert_eq!(requested_log_level(&["linkaudit", "audit"]), None);
    }
}
