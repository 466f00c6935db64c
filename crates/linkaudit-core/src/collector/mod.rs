//! LLDP collection over SNMP
//!
//! - `transport`: the walk abstraction and LLDP-MIB table roots
//! - `snmp`: `snmp2`-backed transport
//! - `lldp`: table decoding into raw discovery rows
//! - `pool`: bounded concurrent collection with retries and cancellation
//! - `failure`: failure taxonomy and per-device reports

pub mod failure;
pub mod lldp;
pub mod pool;
pub mod snmp;
pub mod transport;

pub use failure::{CollectionFailure, DeviceReport, FailureKind, RowContext};
pub use lldp::build_device_report;
pub use pool::{
    CancelFlag, CollectError, CollectProgress, CollectionOutcome, collect_all, collect_device,
};
pub use snmp::SnmpWalkTransport;
pub use transport::{DiscoveryTransport, MibTable, TransportError, WalkEntry, WalkFuture, WalkValue};
