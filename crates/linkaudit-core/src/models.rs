//! Data models for the wiring audit

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalize::normalize_interface;

/// Placeholder for a value the device did not report.
pub const UNKNOWN_VALUE: &str = "unknown";

const REDACTED: &str = "******";

/// SNMPv3 authentication protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthProtocol {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl AuthProtocol {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace('-', "").as_str() {
            "MD5" => Some(Self::Md5),
            "SHA" | "SHA1" => Some(Self::Sha1),
            "SHA224" => Some(Self::Sha224),
            "SHA256" => Some(Self::Sha256),
            "SHA384" => Some(Self::Sha384),
            "SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

/// SNMPv3 privacy (encryption) protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivProtocol {
    Des,
    Aes128,
    Aes192,
    Aes256,
}

impl PrivProtocol {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace('-', "").as_str() {
            "DES" => Some(Self::Des),
            "AES" | "AES128" => Some(Self::Aes128),
            "AES192" => Some(Self::Aes192),
            "AES256" => Some(Self::Aes256),
            _ => None,
        }
    }
}

/// Access parameters for one SNMP version.
#[derive(Clone, PartialEq, Eq)]
pub enum SnmpCredential {
    V1 {
        community: String,
    },
    V2c {
        community: String,
    },
    V3 {
        user: String,
        auth: Option<(AuthProtocol, String)>,
        privacy: Option<(PrivProtocol, String)>,
    },
}

impl SnmpCredential {
    pub fn version_label(&self) -> &'static str {
        match self {
            SnmpCredential::V1 { .. } => "1",
            SnmpCredential::V2c { .. } => "2c",
            SnmpCredential::V3 { .. } => "3",
        }
    }

    /// Checks the credential is usable before any packet is sent.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            SnmpCredential::V1 { community } | SnmpCredential::V2c { community } => {
                if community.trim().is_empty() {
                    return Err(format!(
                        "SNMPv{} requires a community string",
                        self.version_label()
                    ));
                }
                Ok(())
            }
            SnmpCredential::V3 {
                user,
                auth,
                privacy,
            } => {
                if user.trim().is_empty() {
                    return Err("SNMPv3 requires a user name".to_string());
                }
                if privacy.is_some() && auth.is_none() {
                    return Err("SNMPv3 privacy requires an authentication protocol".to_string());
                }
                if auth.as_ref().is_some_and(|(_, secret)| secret.is_empty())
                    || privacy.as_ref().is_some_and(|(_, secret)| secret.is_empty())
                {
                    return Err("SNMPv3 secrets must not be empty".to_string());
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for SnmpCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpCredential::V1 { .. } => f
                .debug_struct("V1")
                .field("community", &REDACTED)
                .finish(),
            SnmpCredential::V2c { .. } => f
                .debug_struct("V2c")
                .field("community", &REDACTED)
                .finish(),
            SnmpCredential::V3 {
                user,
                auth,
                privacy,
            } => f
                .debug_struct("V3")
                .field("user", user)
                .field("auth", &auth.as_ref().map(|(proto, _)| (proto, REDACTED)))
                .field("privacy", &privacy.as_ref().map(|(proto, _)| (proto, REDACTED)))
                .finish(),
        }
    }
}

/// An inventoried network element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    pub mgmt_ip: String,
    pub credential: SnmpCredential,
    pub aliases: Vec<String>,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        mgmt_ip: impl Into<String>,
        credential: SnmpCredential,
    ) -> Self {
        Self {
            name: name.into(),
            mgmt_ip: mgmt_ip.into(),
            credential,
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }
}

/// LLDP identifier (chassis or port) with its IEEE 802.1AB subtype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LldpId {
    pub subtype: u8,
    pub value: String,
}

impl LldpId {
    pub fn new(subtype: u8, value: impl Into<String>) -> Self {
        Self {
            subtype,
            value: value.into(),
        }
    }
}

/// One unparsed entry of a device's remote-neighbor table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDiscoveryRow {
    /// Device that reported the row
    pub device: String,
    /// `timeMark.localPortNum.remIndex` as reported by the agent
    pub row_index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_port_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_port_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_chassis: Option<LldpId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<LldpId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_port_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_sys_name: Option<String>,
}

impl RawDiscoveryRow {
    pub fn new(device: impl Into<String>, row_index: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            row_index: row_index.into(),
            local_port_id: None,
            local_port_desc: None,
            remote_chassis: None,
            remote_port: None,
            remote_port_desc: None,
            remote_sys_name: None,
        }
    }

    /// Mandatory fields the row lacks, in a fixed order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.local_port_id.is_none() && self.local_port_desc.is_none() {
            missing.push("local_port");
        }
        if self.remote_chassis.is_none() && self.remote_sys_name.is_none() {
            missing.push("remote_chassis_id");
        }
        if self.remote_port.is_none() {
            missing.push("remote_port_id");
        }
        missing
    }
}

/// How much of a link was actually seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Both ends report each other
    Observed,
    /// Only one end reported the link
    Partial,
    /// One end reported a neighbor with neither a port nor a known identity
    Unknown,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Observed => "observed",
            Confidence::Partial => "partial",
            Confidence::Unknown => "unknown",
        }
    }

    /// Higher is better.
    pub fn rank(&self) -> u8 {
        match self {
            Confidence::Observed => 2,
            Confidence::Partial => 1,
            Confidence::Unknown => 0,
        }
    }
}

/// Whether a remote identity was mapped onto an inventory device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityCertainty {
    Resolved,
    Unresolved,
}

impl IdentityCertainty {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityCertainty::Resolved => "resolved",
            IdentityCertainty::Unresolved => "unresolved",
        }
    }
}

/// Undirected link identity: the two endpoints in lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    pub device_a: String,
    pub port_a: String,
    pub device_b: String,
    pub port_b: String,
}

impl LinkKey {
    pub fn new(device_x: &str, port_x: &str, device_y: &str, port_y: &str) -> Self {
        let device_x = or_unknown(device_x);
        let port_x = or_unknown(port_x);
        let device_y = or_unknown(device_y);
        let port_y = or_unknown(port_y);
        if (device_x, port_x) <= (device_y, port_y) {
            Self {
                device_a: device_x.to_string(),
                port_a: port_x.to_string(),
                device_b: device_y.to_string(),
                port_b: port_y.to_string(),
            }
        } else {
            Self {
                device_a: device_y.to_string(),
                port_a: port_y.to_string(),
                device_b: device_x.to_string(),
                port_b: port_x.to_string(),
            }
        }
    }

    pub fn has_endpoint(&self, device: &str, port: &str) -> bool {
        (self.device_a == device && self.port_a == port)
            || (self.device_b == device && self.port_b == port)
    }

    /// The opposite end of `device`/`port`, if that endpoint is part of the key.
    pub fn far_end(&self, device: &str, port: &str) -> Option<(&str, &str)> {
        if self.device_a == device && self.port_a == port {
            Some((&self.device_b, &self.port_b))
        } else if self.device_b == device && self.port_b == port {
            Some((&self.device_a, &self.port_a))
        } else {
            None
        }
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.device_a, self.port_a, self.device_b, self.port_b
        )
    }
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() { UNKNOWN_VALUE } else { value }
}

/// A deduplicated, undirected As-Is link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkObservation {
    pub key: LinkKey,
    pub local_device: String,
    pub local_port_raw: String,
    pub local_port_norm: String,
    /// Device identity used for the far end: canonical name when resolved,
    /// otherwise the raw system name or chassis id
    pub remote_device: String,
    /// Raw chassis id reported for the far end
    pub remote_device_id: String,
    /// Canonical inventory name of the far end, or `unknown`
    pub remote_device_name: String,
    pub remote_port_raw: String,
    pub remote_port_norm: String,
    pub confidence: Confidence,
    pub identity: IdentityCertainty,
    pub evidence: Vec<String>,
}

impl LinkObservation {
    pub fn has_unknown_port(&self) -> bool {
        self.local_port_norm == UNKNOWN_VALUE || self.remote_port_norm == UNKNOWN_VALUE
    }

    /// Resolved identity and both ports known.
    pub fn is_complete(&self) -> bool {
        self.identity == IdentityCertainty::Resolved && !self.has_unknown_port()
    }

    pub(crate) fn sort_key(&self) -> (&str, &str, &str, &str) {
        (
            &self.local_device,
            &self.local_port_norm,
            &self.remote_device,
            &self.remote_port_norm,
        )
    }
}

/// One declared To-Be link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkIntent {
    pub device_a: String,
    pub port_a_raw: String,
    pub port_a_norm: String,
    pub device_b: String,
    pub port_b_raw: String,
    pub port_b_norm: String,
}

impl LinkIntent {
    /// Builds an intent, normalizing both ports.
    pub fn new(
        device_a: impl Into<String>,
        port_a: impl Into<String>,
        device_b: impl Into<String>,
        port_b: impl Into<String>,
    ) -> Self {
        let port_a_raw = port_a.into();
        let port_b_raw = port_b.into();
        Self {
            device_a: device_a.into(),
            port_a_norm: normalize_interface(&port_a_raw),
            port_a_raw,
            device_b: device_b.into(),
            port_b_norm: normalize_interface(&port_b_raw),
            port_b_raw,
        }
    }

    pub fn key(&self) -> LinkKey {
        LinkKey::new(
            &self.device_a,
            &self.port_a_norm,
            &self.device_b,
            &self.port_b_norm,
        )
    }

    pub(crate) fn sort_key(&self) -> (&str, &str, &str, &str) {
        (
            &self.device_a,
            &self.port_a_norm,
            &self.device_b,
            &self.port_b_norm,
        )
    }
}

impl fmt::Display for LinkIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.device_a, self.port_a_norm, self.device_b, self.port_b_norm
        )
    }
}

/// Verdict category for one intended link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffStatus {
    ExactMatch,
    PortMismatch,
    DeviceMismatch,
    PartialObserved,
    MissingAsis,
    Unknown,
}

impl DiffStatus {
    pub const ALL: [DiffStatus; 6] = [
        DiffStatus::ExactMatch,
        DiffStatus::PortMismatch,
        DiffStatus::DeviceMismatch,
        DiffStatus::PartialObserved,
        DiffStatus::MissingAsis,
        DiffStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiffStatus::ExactMatch => "EXACT_MATCH",
            DiffStatus::PortMismatch => "PORT_MISMATCH",
            DiffStatus::DeviceMismatch => "DEVICE_MISMATCH",
            DiffStatus::PartialObserved => "PARTIAL_OBSERVED",
            DiffStatus::MissingAsis => "MISSING_ASIS",
            DiffStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL.into_iter().find(|s| s.as_str() == wanted)
    }
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one intended link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDiff {
    pub intent: LinkIntent,
    /// Observation(s) that decided the verdict; several only for `UNKNOWN`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<LinkObservation>,
    pub status: DiffStatus,
    pub reason: String,
}
