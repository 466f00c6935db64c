//! LLDP-MIB table decoding
//!
//! Turns the varbinds of `lldpLocPortTable` and `lldpRemTable` walks into
//! [`RawDiscoveryRow`]s. Rows are emitted in the order their index was first
//! seen in the walk.

use std::collections::{BTreeMap, HashMap};
use std::net::{Ipv4Addr, Ipv6Addr};

use super::failure::{CollectionFailure, DeviceReport, FailureKind};
use super::transport::{MibTable, WalkEntry, WalkValue};
use crate::models::{LldpId, RawDiscoveryRow};

// lldpLocPortEntry columns
const LOC_PORT_ID_SUBTYPE: u64 = 2;
const LOC_PORT_ID: u64 = 3;
const LOC_PORT_DESC: u64 = 4;

// lldpRemEntry columns
const REM_CHASSIS_ID_SUBTYPE: u64 = 4;
const REM_CHASSIS_ID: u64 = 5;
const REM_PORT_ID_SUBTYPE: u64 = 6;
const REM_PORT_ID: u64 = 7;
const REM_PORT_DESC: u64 = 8;
const REM_SYS_NAME: u64 = 9;

/// LldpChassisIdSubtype macAddress(4)
pub const CHASSIS_SUBTYPE_MAC: u8 = 4;
/// LldpChassisIdSubtype networkAddress(5)
pub const CHASSIS_SUBTYPE_NETWORK: u8 = 5;
/// LldpPortIdSubtype macAddress(3)
pub const PORT_SUBTYPE_MAC: u8 = 3;
/// LldpPortIdSubtype networkAddress(4)
pub const PORT_SUBTYPE_NETWORK: u8 = 4;

/// One row of the local port table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalPort {
    pub subtype: Option<u8>,
    pub id: Option<String>,
    pub desc: Option<String>,
}

impl LocalPort {
    /// Name used for the local end of a link. MAC-typed port ids are
    /// useless for matching, so the description wins there.
    pub fn label(&self) -> Option<String> {
        if self.subtype == Some(PORT_SUBTYPE_MAC)
            && let Some(desc) = &self.desc
        {
            return Some(desc.clone());
        }
        self.id.clone().or_else(|| self.desc.clone())
    }
}

/// Splits `oid` into `(column, index)` below the table entry.
fn column_and_index(table: MibTable, oid: &[u64]) -> Option<(u64, &[u64])> {
    let root = table.root_oid();
    let rest = oid.strip_prefix(root)?;
    match rest {
        [1, column, index @ ..] if !index.is_empty() => Some((*column, index)),
        _ => None,
    }
}

fn join_index(index: &[u64]) -> String {
    index
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Parses `lldpLocPortTable` into `lldpLocPortNum -> LocalPort`.
pub fn parse_local_ports(entries: &[WalkEntry]) -> BTreeMap<u64, LocalPort> {
    let mut ports: BTreeMap<u64, LocalPort> = BTreeMap::new();
    for entry in entries {
        let Some((column, [port_num])) = column_and_index(MibTable::LocPortTable, &entry.oid)
        else {
            continue;
        };
        let port = ports.entry(*port_num).or_default();
        match column {
            LOC_PORT_ID_SUBTYPE => port.subtype = value_as_subtype(&entry.value),
            LOC_PORT_ID => port.id = non_empty(decode_text(&entry.value)),
            LOC_PORT_DESC => port.desc = non_empty(decode_text(&entry.value)),
            _ => {}
        }
    }

    // The id depends on the subtype, which may arrive in either order.
    for entry in entries {
        if let Some((LOC_PORT_ID, [port_num])) =
            column_and_index(MibTable::LocPortTable, &entry.oid)
            && let Some(port) = ports.get_mut(port_num)
            && port.subtype == Some(PORT_SUBTYPE_MAC)
        {
            port.id = non_empty(format_mac(&entry.value));
        }
    }
    ports
}

#[derive(Default)]
struct PendingRow {
    local_port_num: Option<u64>,
    chassis_subtype: Option<u8>,
    chassis: Option<WalkValue>,
    port_subtype: Option<u8>,
    port: Option<WalkValue>,
    port_desc: Option<String>,
    sys_name: Option<String>,
}

/// Parses `lldpRemTable` into rows, joined with the local port table.
pub fn parse_remote_rows(
    device: &str,
    entries: &[WalkEntry],
    local_ports: &BTreeMap<u64, LocalPort>,
) -> Vec<RawDiscoveryRow> {
    let mut order: Vec<String> = Vec::new();
    let mut pending: HashMap<String, PendingRow> = HashMap::new();

    for entry in entries {
        let Some((column, index)) = column_and_index(MibTable::RemTable, &entry.oid) else {
            continue;
        };
        let key = join_index(index);
        let row = pending.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            PendingRow {
                // timeMark.localPortNum.remIndex
                local_port_num: index.get(1).copied(),
                ..PendingRow::default()
            }
        });
        match column {
            REM_CHASSIS_ID_SUBTYPE => row.chassis_subtype = value_as_subtype(&entry.value),
            REM_CHASSIS_ID => row.chassis = Some(entry.value.clone()),
            REM_PORT_ID_SUBTYPE => row.port_subtype = value_as_subtype(&entry.value),
            REM_PORT_ID => row.port = Some(entry.value.clone()),
            REM_PORT_DESC => row.port_desc = non_empty(decode_text(&entry.value)),
            REM_SYS_NAME => row.sys_name = non_empty(decode_text(&entry.value)),
            _ => {}
        }
    }

    order
        .into_iter()
        .filter_map(|key| {
            let parts = pending.remove(&key)?;
            let mut row = RawDiscoveryRow::new(device, key);

            if let Some(local) = parts.local_port_num.and_then(|n| local_ports.get(&n)) {
                row.local_port_id = local.label();
                row.local_port_desc = local.desc.clone();
            }

            row.remote_chassis = parts.chassis.as_ref().and_then(|value| {
                let subtype = parts.chassis_subtype.unwrap_or(0);
                let decoded = match subtype {
                    CHASSIS_SUBTYPE_MAC => format_mac(value),
                    CHASSIS_SUBTYPE_NETWORK => format_network_address(value),
                    _ => decode_text(value),
                };
                non_empty(decoded).map(|v| LldpId::new(subtype, v))
            });
            row.remote_port = parts.port.as_ref().and_then(|value| {
                let subtype = parts.port_subtype.unwrap_or(0);
                let decoded = match subtype {
                    PORT_SUBTYPE_MAC => format_mac(value),
                    PORT_SUBTYPE_NETWORK => format_network_address(value),
                    _ => decode_text(value),
                };
                non_empty(decoded).map(|v| LldpId::new(subtype, v))
            });
            row.remote_port_desc = parts.port_desc;
            row.remote_sys_name = parts.sys_name;
            Some(row)
        })
        .collect()
}

/// Builds the device report from both table walks.
pub fn build_device_report(
    device: &str,
    loc_entries: &[WalkEntry],
    rem_entries: &[WalkEntry],
    attempts: u32,
) -> DeviceReport {
    let local_ports = parse_local_ports(loc_entries);
    let rows = parse_remote_rows(device, rem_entries, &local_ports);

    if local_ports.is_empty() && rows.is_empty() {
        return DeviceReport::failed(
            CollectionFailure::new(
                device,
                FailureKind::MibMissing,
                "agent returned nothing under lldpLocPortTable or lldpRemTable",
            ),
            attempts,
        );
    }

    if rows.is_empty() {
        return DeviceReport::success(
            device,
            Vec::new(),
            vec![CollectionFailure::new(
                device,
                FailureKind::TableEmpty,
                format!(
                    "lldpRemTable has no rows ({} local ports)",
                    local_ports.len()
                ),
            )],
            attempts,
        );
    }

    let failures = rows
        .iter()
        .filter_map(|row| {
            let missing = row.missing_fields();
            (!missing.is_empty()).then(|| CollectionFailure::partial_row(row, &missing))
        })
        .collect();

    DeviceReport::success(device, rows, failures, attempts)
}

fn value_as_subtype(value: &WalkValue) -> Option<u8> {
    match value {
        WalkValue::Integer(n) => u8::try_from(*n).ok(),
        WalkValue::Other(text) => text.trim().parse().ok(),
        WalkValue::OctetString(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Octet strings become UTF-8 text when printable, colon hex otherwise.
pub fn decode_text(value: &WalkValue) -> String {
    match value {
        WalkValue::OctetString(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) if is_printable(text) => text.trim_end_matches('\0').to_string(),
            _ => hex_colon(bytes),
        },
        WalkValue::Integer(n) => n.to_string(),
        WalkValue::Other(text) => text.clone(),
    }
}

fn is_printable(text: &str) -> bool {
    text.trim_end_matches('\0')
        .chars()
        .all(|c| !c.is_control() || c == '\t')
}

fn hex_colon(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// MAC-typed ids: six raw bytes, or an agent that already sent text.
pub fn format_mac(value: &WalkValue) -> String {
    match value {
        WalkValue::OctetString(bytes) if bytes.len() == 6 => hex_colon(bytes),
        other => decode_text(other).to_ascii_lowercase(),
    }
}

/// Network-address ids carry an IANA address family octet first.
pub fn format_network_address(value: &WalkValue) -> String {
    let WalkValue::OctetString(bytes) = value else {
        return decode_text(value);
    };
    match bytes.as_slice() {
        [1, a, b, c, d] => Ipv4Addr::new(*a, *b, *c, *d).to_string(),
        [2, rest @ ..] if rest.len() == 16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(rest);
            Ipv6Addr::from(octets).to_string()
        }
        _ => decode_text(value),
    }
}
