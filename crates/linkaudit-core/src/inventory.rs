//! Device inventory and intended-topology CSV loaders
//!
//! Devices CSV: `name,mgmt_ip,snmp_version` plus optional
//! `snmp_community,snmp_user,snmp_auth,snmp_priv,aliases`.
//! Intent CSV: `device_a,port_a,device_b,port_b`.
//!
//! Credentials are only checked for shape here; a usable-looking but
//! incomplete credential (empty community, ...) is reported per device by
//! the collector instead of failing the whole run.

use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::models::{AuthProtocol, Device, LinkIntent, PrivProtocol, SnmpCredential};

const DEVICE_COLUMNS: &[&str] = &["name", "mgmt_ip", "snmp_version"];
const INTENT_COLUMNS: &[&str] = &["device_a", "port_a", "device_b", "port_b"];

/// Malformed inventory, intent or snapshot input
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
    #[error("{file}: missing required columns: {columns}")]
    MissingColumns { file: String, columns: String },
    #[error("{file}:{line}: {message}")]
    InvalidRow {
        file: String,
        line: u64,
        message: String,
    },
    #[error("{file}: {message}")]
    Snapshot { file: String, message: String },
}

#[derive(Debug, Deserialize)]
struct DeviceRecord {
    name: String,
    mgmt_ip: String,
    snmp_version: String,
    #[serde(default)]
    snmp_community: Option<String>,
    #[serde(default)]
    snmp_user: Option<String>,
    #[serde(default)]
    snmp_auth: Option<String>,
    #[serde(default)]
    snmp_priv: Option<String>,
    #[serde(default)]
    aliases: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntentRecord {
    device_a: String,
    port_a: String,
    device_b: String,
    port_b: String,
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `PROTOCOL:secret`
fn split_protocol(raw: &str) -> Option<(&str, &str)> {
    let (protocol, secret) = raw.split_once(':')?;
    let protocol = protocol.trim();
    if protocol.is_empty() || secret.is_empty() {
        return None;
    }
    Some((protocol, secret))
}

fn credential_from_record(record: &DeviceRecord) -> Result<SnmpCredential, String> {
    let community = optional(record.snmp_community.clone()).unwrap_or_default();
    match record.snmp_version.trim().to_ascii_lowercase().as_str() {
        "1" | "v1" => Ok(SnmpCredential::V1 { community }),
        "2c" | "v2c" | "2" | "v2" => Ok(SnmpCredential::V2c { community }),
        "3" | "v3" => {
            let user = optional(record.snmp_user.clone()).unwrap_or_default();
            let auth = match optional(record.snmp_auth.clone()) {
                None => None,
                Some(raw) => {
                    let (protocol, secret) = split_protocol(&raw)
                        .ok_or("snmp_auth must be PROTOCOL:secret".to_string())?;
                    let protocol = AuthProtocol::parse(protocol)
                        .ok_or(format!("unknown snmp_auth protocol '{}'", protocol))?;
                    Some((protocol, secret.to_string()))
                }
            };
            let privacy = match optional(record.snmp_priv.clone()) {
                None => None,
                Some(raw) => {
                    let (protocol, secret) = split_protocol(&raw)
                        .ok_or("snmp_priv must be PROTOCOL:secret".to_string())?;
                    let protocol = PrivProtocol::parse(protocol)
                        .ok_or(format!("unknown snmp_priv protocol '{}'", protocol))?;
                    Some((protocol, secret.to_string()))
                }
            };
            Ok(SnmpCredential::V3 {
                user,
                auth,
                privacy,
            })
        }
        other => Err(format!("unknown snmp_version '{}'", other)),
    }
}

fn check_columns(
    file: &str,
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<(), InputError> {
    let present: HashSet<&str> = headers.iter().map(str::trim).collect();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !present.contains(column))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(InputError::MissingColumns {
            file: file.to_string(),
            columns: missing.join(", "),
        })
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Parses a devices CSV. `file` is only used in error messages.
pub fn parse_devices<R: Read>(reader: R, file: &str) -> Result<Vec<Device>, InputError> {
    let csv_err = |source: csv::Error| InputError::Csv {
        file: file.to_string(),
        source,
    };
    let mut reader = csv_reader(reader);
    let headers = reader.headers().map_err(csv_err)?.clone();
    check_columns(file, &headers, DEVICE_COLUMNS)?;

    let mut devices = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line = line_of(&record);
        let invalid = |message: String| InputError::InvalidRow {
            file: file.to_string(),
            line,
            message,
        };

        let parsed: DeviceRecord = record
            .deserialize(Some(&headers))
            .map_err(|e| invalid(e.to_string()))?;

        let empty: Vec<&str> = [
            ("name", &parsed.name),
            ("mgmt_ip", &parsed.mgmt_ip),
            ("snmp_version", &parsed.snmp_version),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(column, _)| column)
        .collect();
        if !empty.is_empty() {
            return Err(invalid(format!("empty required fields: {}", empty.join(", "))));
        }

        let name = parsed.name.trim().to_string();
        if !seen.insert(name.clone()) {
            return Err(invalid(format!("duplicate device name '{}'", name)));
        }

        let credential = credential_from_record(&parsed).map_err(invalid)?;
        let aliases: Vec<String> = optional(parsed.aliases.clone())
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|alias| !alias.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        devices.push(Device::new(name, parsed.mgmt_ip.trim(), credential).with_aliases(aliases));
    }

    crate::log_debug!("Loaded {} devices from {}", devices.len(), file);
    Ok(devices)
}

/// Parses an intended-topology CSV. Ports are normalized on load.
pub fn parse_intents<R: Read>(reader: R, file: &str) -> Result<Vec<LinkIntent>, InputError> {
    let csv_err = |source: csv::Error| InputError::Csv {
        file: file.to_string(),
        source,
    };
    let mut reader = csv_reader(reader);
    let headers = reader.headers().map_err(csv_err)?.clone();
    check_columns(file, &headers, INTENT_COLUMNS)?;

    let mut intents = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line = line_of(&record);
        let invalid = |message: String| InputError::InvalidRow {
            file: file.to_string(),
            line,
            message,
        };

        let parsed: IntentRecord = record
            .deserialize(Some(&headers))
            .map_err(|e| invalid(e.to_string()))?;

        let empty: Vec<&str> = [
            ("device_a", &parsed.device_a),
            ("port_a", &parsed.port_a),
            ("device_b", &parsed.device_b),
            ("port_b", &parsed.port_b),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(column, _)| column)
        .collect();
        if !empty.is_empty() {
            return Err(invalid(format!("empty required fields: {}", empty.join(", "))));
        }

        intents.push(LinkIntent::new(
            parsed.device_a.trim(),
            parsed.port_a.trim(),
            parsed.device_b.trim(),
            parsed.port_b.trim(),
        ));
    }

    crate::log_debug!("Loaded {} intended links from {}", intents.len(), file);
    Ok(intents)
}

fn open(path: &Path) -> Result<std::fs::File, InputError> {
    std::fs::File::open(path).map_err(|e| InputError::Csv {
        file: path.display().to_string(),
        source: csv::Error::from(e),
    })
}

pub fn load_devices(path: &Path) -> Result<Vec<Device>, InputError> {
    parse_devices(open(path)?, &path.display().to_string())
}

pub fn load_intents(path: &Path) -> Result<Vec<LinkIntent>, InputError> {
    parse_intents(open(path)?, &path.display().to_string())
}
