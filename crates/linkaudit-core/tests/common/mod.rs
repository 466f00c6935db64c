#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use linkaudit_core::{
    Device, DiscoveryTransport, FailureKind, MibTable, SnmpCredential, TransportError, WalkEntry,
    WalkFuture, WalkValue,
};

/// One LLDP neighbor as an agent would report it.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub local_port: String,
    pub sys_name: Option<String>,
    pub chassis_mac: [u8; 6],
    pub remote_port: Option<String>,
}

impl Neighbor {
    pub fn new(local_port: &str, sys_name: &str, remote_port: &str) -> Self {
        Self {
            local_port: local_port.to_string(),
            sys_name: Some(sys_name.to_string()),
            chassis_mac: mac_for(sys_name),
            remote_port: Some(remote_port.to_string()),
        }
    }

    pub fn chassis_only(local_port: &str, chassis_mac: [u8; 6], remote_port: &str) -> Self {
        Self {
            local_port: local_port.to_string(),
            sys_name: None,
            chassis_mac,
            remote_port: Some(remote_port.to_string()),
        }
    }
}

/// Stable fake MAC per system name.
fn mac_for(name: &str) -> [u8; 6] {
    let sum = name.bytes().fold(0u8, |acc, b| acc.wrapping_add(b));
    [0x02, 0x00, 0x00, 0x00, name.len() as u8, sum]
}

fn oid(table: MibTable, column: u64, index: &[u64]) -> Vec<u64> {
    let mut oid = table.root_oid().to_vec();
    oid.push(1);
    oid.push(column);
    oid.extend_from_slice(index);
    oid
}

fn text(value: &str) -> WalkValue {
    WalkValue::OctetString(value.as_bytes().to_vec())
}

/// Walk entries of both LLDP tables for `neighbors`, one local port each.
pub fn lldp_tables(neighbors: &[Neighbor]) -> (Vec<WalkEntry>, Vec<WalkEntry>) {
    let mut loc = Vec::new();
    let mut rem = Vec::new();
    for (i, neighbor) in neighbors.iter().enumerate() {
        let port_num = i as u64 + 1;
        let index = [0, port_num, 1];
        loc.push(WalkEntry::new(
            oid(MibTable::LocPortTable, 2, &[port_num]),
            WalkValue::Integer(5),
        ));
        loc.push(WalkEntry::new(
            oid(MibTable::LocPortTable, 3, &[port_num]),
            text(&neighbor.local_port),
        ));
        rem.push(WalkEntry::new(
            oid(MibTable::RemTable, 4, &index),
            WalkValue::Integer(4),
        ));
        rem.push(WalkEntry::new(
            oid(MibTable::RemTable, 5, &index),
            WalkValue::OctetString(neighbor.chassis_mac.to_vec()),
        ));
        if let Some(port) = &neighbor.remote_port {
            rem.push(WalkEntry::new(
                oid(MibTable::RemTable, 6, &index),
                WalkValue::Integer(5),
            ));
            rem.push(WalkEntry::new(oid(MibTable::RemTable, 7, &index), text(port)));
        }
        if let Some(name) = &neighbor.sys_name {
            rem.push(WalkEntry::new(oid(MibTable::RemTable, 9, &index), text(name)));
        }
    }
    (loc, rem)
}

/// In-memory agent set: fixed LLDP tables or a fixed error per device.
#[derive(Default)]
pub struct FakeLldpTransport {
    answers: HashMap<String, Result<(Vec<WalkEntry>, Vec<WalkEntry>), TransportError>>,
    preflight_error: Option<TransportError>,
    walks: Mutex<HashMap<String, usize>>,
}

impl FakeLldpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(mut self, name: &str, neighbors: &[Neighbor]) -> Self {
        self.answers
            .insert(name.to_string(), Ok(lldp_tables(neighbors)));
        self
    }

    pub fn failing(mut self, name: &str, kind: FailureKind, message: &str) -> Self {
        self.answers
            .insert(name.to_string(), Err(TransportError::new(kind, message)));
        self
    }

    pub fn without_mechanism(mut self, message: &str) -> Self {
        self.preflight_error = Some(TransportError::new(
            FailureKind::QueryMechanismMissing,
            message,
        ));
        self
    }

    /// Number of `lldpLocPortTable` walks issued against `name`.
    pub fn attempts(&self, name: &str) -> usize {
        self.walks
            .lock()
            .expect("walk counter lock should not be poisoned")
            .get(name)
            .copied()
            .unwrap_or(0)
    }
}

impl DiscoveryTransport for FakeLldpTransport {
    fn transport_id(&self) -> &'static str {
        "fake-lldp"
    }

    fn preflight(&self) -> Result<(), TransportError> {
        match &self.preflight_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn walk<'a>(
        &'a self,
        device: &'a Device,
        table: MibTable,
        _timeout: Duration,
    ) -> WalkFuture<'a> {
        Box::pin(async move {
            if table == MibTable::LocPortTable {
                *self
                    .walks
                    .lock()
                    .expect("walk counter lock should not be poisoned")
                    .entry(device.name.clone())
                    .or_insert(0) += 1;
            }
            match self.answers.get(&device.name) {
                Some(Ok((loc, rem))) => Ok(match table {
                    MibTable::LocPortTable => loc.clone(),
                    MibTable::RemTable => rem.clone(),
                }),
                Some(Err(e)) => Err(e.clone()),
                None => Err(TransportError::new(
                    FailureKind::TargetUnreachable,
                    "no such agent",
                )),
            }
        })
    }
}

pub fn v2c_device(name: &str) -> Device {
    Device::new(
        name,
        "192.0.2.10",
        SnmpCredential::V2c {
            community: "public".to_string(),
        },
    )
}

/// Fresh directory under the system temp dir.
pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{}_{}", prefix, timestamp));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

/// Writes `devices.csv` (v2c, community `public`) and `intent.csv` into `dir`.
pub fn write_inputs(
    dir: &std::path::Path,
    devices: &[&str],
    intents: &[[&str; 4]],
) -> (PathBuf, PathBuf) {
    let mut devices_csv = String::from("name,mgmt_ip,snmp_version,snmp_community\n");
    for (i, name) in devices.iter().enumerate() {
        devices_csv.push_str(&format!("{},192.0.2.{},2c,public\n", name, i + 1));
    }
    let mut intent_csv = String::from("device_a,port_a,device_b,port_b\n");
    for [a, pa, b, pb] in intents {
        intent_csv.push_str(&format!("{},{},{},{}\n", a, pa, b, pb));
    }

    let devices_path = dir.join("devices.csv");
    let intent_path = dir.join("intent.csv");
    std::fs::write(&devices_path, devices_csv).expect("devices.csv should be writable");
    std::fs::write(&intent_path, intent_csv).expect("intent.csv should be writable");
    (devices_path, intent_path)
}
