//! Abstract discovery transport
//!
//! The collector only needs "walk this LLDP-MIB table on this device". The
//! production implementation is [`super::snmp::SnmpWalkTransport`]; tests
//! plug in scripted transports.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use super::failure::FailureKind;
use crate::models::Device;

/// lldpLocPortTable: 1.0.8802.1.1.2.1.3.7
pub const OID_LLDP_LOC_PORT_TABLE: &[u64] = &[1, 0, 8802, 1, 1, 2, 1, 3, 7];

/// lldpRemTable: 1.0.8802.1.1.2.1.4.1
pub const OID_LLDP_REM_TABLE: &[u64] = &[1, 0, 8802, 1, 1, 2, 1, 4, 1];

/// The two LLDP-MIB tables the collector reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MibTable {
    LocPortTable,
    RemTable,
}

impl MibTable {
    pub fn root_oid(&self) -> &'static [u64] {
        match self {
            MibTable::LocPortTable => OID_LLDP_LOC_PORT_TABLE,
            MibTable::RemTable => OID_LLDP_REM_TABLE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MibTable::LocPortTable => "LLDP-MIB::lldpLocPortTable",
            MibTable::RemTable => "LLDP-MIB::lldpRemTable",
        }
    }
}

/// A decoded varbind value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkValue {
    OctetString(Vec<u8>),
    Integer(i64),
    Other(String),
}

/// One varbind returned by a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub oid: Vec<u64>,
    pub value: WalkValue,
}

impl WalkEntry {
    pub fn new(oid: Vec<u64>, value: WalkValue) -> Self {
        Self { oid, value }
    }
}

/// Classified failure of a single walk
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub type WalkFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<WalkEntry>, TransportError>> + Send + 'a>>;

/// Capability to walk one LLDP-MIB table on one device.
pub trait DiscoveryTransport: Send + Sync {
    /// Short name used in logs
    fn transport_id(&self) -> &'static str;

    /// Checks the query mechanism itself is usable on this host.
    /// A failure here is fatal for the whole run.
    fn preflight(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Walks `table` and returns every varbind under its root, in walk order.
    fn walk<'a>(&'a self, device: &'a Device, table: MibTable, timeout: Duration)
    -> WalkFuture<'a>;
}
