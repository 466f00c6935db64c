//! SNMP transport backed by `snmp2`
//!
//! Walks a table with repeated GETNEXT requests until the agent leaves the
//! table subtree or answers endOfMibView/noSuchObject (noSuchName on v1).
//! Any other error-status fails the walk. Each request is bounded by the
//! per-request timeout.

use snmp2::{AsyncSession, Oid, Value, v3};
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::Duration;
use tokio::time::timeout;

use super::failure::FailureKind;
use super::transport::{
    DiscoveryTransport, MibTable, TransportError, WalkEntry, WalkFuture, WalkValue,
};
use crate::config::CollectorSettings;
use crate::models::{AuthProtocol, Device, PrivProtocol, SnmpCredential};

/// Production transport: one UDP session per table walk.
#[derive(Debug, Clone)]
pub struct SnmpWalkTransport {
    port: u16,
    max_walk_entries: usize,
}

impl SnmpWalkTransport {
    pub fn new(port: u16, max_walk_entries: usize) -> Self {
        Self {
            port,
            max_walk_entries,
        }
    }

    pub fn from_settings(settings: &CollectorSettings) -> Self {
        Self::new(settings.port, settings.max_walk_entries)
    }

    async fn open_session(
        &self,
        device: &Device,
        timeout_dur: Duration,
    ) -> Result<AsyncSession, TransportError> {
        let addr = socket_address(&device.mgmt_ip, self.port);

        let opened = match &device.credential {
            SnmpCredential::V1 { community } => {
                timeout(
                    timeout_dur,
                    AsyncSession::new_v1(addr.as_str(), community.as_bytes(), 0),
                )
                .await
            }
            SnmpCredential::V2c { community } => {
                timeout(
                    timeout_dur,
                    AsyncSession::new_v2c(addr.as_str(), community.as_bytes(), 0),
                )
                .await
            }
            SnmpCredential::V3 {
                user,
                auth,
                privacy,
            } => {
                let security = v3_security(user, auth.as_ref(), privacy.as_ref());
                timeout(
                    timeout_dur,
                    AsyncSession::new_v3(addr.as_str(), 0, security),
                )
                .await
            }
        };

        let mut session = match opened {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => return Err(classify_error(&e)),
            Err(_) => return Err(elapsed(&addr, timeout_dur)),
        };

        if matches!(device.credential, SnmpCredential::V3 { .. }) {
            // Engine discovery; wrong user or keys surface here.
            match timeout(timeout_dur, session.init()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(classify_error(&e)),
                Err(_) => return Err(elapsed(&addr, timeout_dur)),
            }
        }

        Ok(session)
    }
}

impl DiscoveryTransport for SnmpWalkTransport {
    fn transport_id(&self) -> &'static str {
        "snmp"
    }

    fn preflight(&self) -> Result<(), TransportError> {
        UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .map(|_| ())
            .map_err(|e| {
                TransportError::new(
                    FailureKind::QueryMechanismMissing,
                    format!("cannot open a UDP socket for SNMP: {}", e),
                )
            })
    }

    fn walk<'a>(
        &'a self,
        device: &'a Device,
        table: MibTable,
        timeout_dur: Duration,
    ) -> WalkFuture<'a> {
        Box::pin(async move {
            let mut session = self.open_session(device, timeout_dur).await?;
            let v1 = matches!(device.credential, SnmpCredential::V1 { .. });
            walk_table(&mut session, table, timeout_dur, self.max_walk_entries, v1).await
        })
    }
}

async fn walk_table(
    session: &mut AsyncSession,
    table: MibTable,
    timeout_dur: Duration,
    max_entries: usize,
    v1: bool,
) -> Result<Vec<WalkEntry>, TransportError> {
    let root = table.root_oid();
    let mut current: Vec<u64> = root.to_vec();
    let mut entries = Vec::new();

    loop {
        if entries.len() >= max_entries {
            crate::log_warn!(
                "Walk of {} stopped after {} entries",
                table.name(),
                max_entries
            );
            break;
        }

        let oid = Oid::from(current.as_slice()).map_err(|e| {
            TransportError::new(
                FailureKind::QueryFailed,
                format!("cannot encode OID {:?}: {:?}", current, e),
            )
        })?;

        let mut response = match timeout(timeout_dur, session.getnext(&oid)).await {
            Ok(Ok(pdu)) => pdu,
            Ok(Err(e)) => return Err(classify_error(&e)),
            Err(_) => {
                return Err(TransportError::new(
                    FailureKind::TargetUnreachable,
                    format!("no response within {}s", timeout_dur.as_secs()),
                ));
            }
        };

        if check_error_status(response.error_status, v1)? == PduStatus::EndOfMib {
            break;
        }

        let Some((next_oid, value)) = response.varbinds.next() else {
            break;
        };
        if matches!(
            value,
            Value::EndOfMibView | Value::NoSuchObject | Value::NoSuchInstance
        ) {
            break;
        }

        let Some(next) = oid_components(&next_oid.to_string()) else {
            return Err(TransportError::new(
                FailureKind::QueryFailed,
                format!("agent returned an unparseable OID: {}", next_oid),
            ));
        };
        if !next.starts_with(root) || next <= current {
            break;
        }

        entries.push(WalkEntry::new(next.clone(), convert_value(&value)));
        current = next;
    }

    crate::log_debug!("{}: {} varbinds", table.name(), entries.len());
    Ok(entries)
}

fn convert_value(value: &Value<'_>) -> WalkValue {
    match value {
        Value::OctetString(bytes) => WalkValue::OctetString(bytes.to_vec()),
        Value::Integer(n) => WalkValue::Integer(*n),
        Value::Counter32(n) | Value::Unsigned32(n) | Value::Timeticks(n) => {
            WalkValue::Integer(i64::from(*n))
        }
        Value::IpAddress(octets) => WalkValue::Other(Ipv4Addr::from(*octets).to_string()),
        other => WalkValue::Other(format!("{:?}", other)),
    }
}

/// Dotted OID text to numeric components.
fn oid_components(text: &str) -> Option<Vec<u64>> {
    text.trim()
        .trim_start_matches('.')
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

fn socket_address(mgmt_ip: &str, port: u16) -> String {
    match mgmt_ip.trim().parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{}]:{}", v6, port),
        Ok(IpAddr::V4(v4)) => format!("{}:{}", v4, port),
        Err(_) => format!("{}:{}", mgmt_ip.trim(), port),
    }
}

fn v3_security(
    user: &str,
    auth: Option<&(AuthProtocol, String)>,
    privacy: Option<&(PrivProtocol, String)>,
) -> v3::Security {
    let Some((auth_protocol, auth_secret)) = auth else {
        return v3::Security::new(user.as_bytes(), b"").with_auth(v3::Auth::NoAuthNoPriv);
    };

    let security = v3::Security::new(user.as_bytes(), auth_secret.as_bytes())
        .with_auth_protocol(match auth_protocol {
            AuthProtocol::Md5 => v3::AuthProtocol::Md5,
            AuthProtocol::Sha1 => v3::AuthProtocol::Sha1,
            AuthProtocol::Sha224 => v3::AuthProtocol::Sha224,
            AuthProtocol::Sha256 => v3::AuthProtocol::Sha256,
            AuthProtocol::Sha384 => v3::AuthProtocol::Sha384,
            AuthProtocol::Sha512 => v3::AuthProtocol::Sha512,
        });

    match privacy {
        Some((priv_protocol, priv_secret)) => security.with_auth(v3::Auth::AuthPriv {
            cipher: match priv_protocol {
                PrivProtocol::Des => v3::Cipher::Des,
                PrivProtocol::Aes128 => v3::Cipher::Aes128,
                PrivProtocol::Aes192 => v3::Cipher::Aes192,
                PrivProtocol::Aes256 => v3::Cipher::Aes256,
            },
            privacy_password: priv_secret.as_bytes().to_vec(),
        }),
        None => security.with_auth(v3::Auth::AuthNoPriv),
    }
}

fn elapsed(addr: &str, timeout_dur: Duration) -> TransportError {
    TransportError::new(
        FailureKind::TargetUnreachable,
        format!("{} did not answer within {}s", addr, timeout_dur.as_secs()),
    )
}

const ERR_TOO_BIG: u32 = 1;
const ERR_NO_SUCH_NAME: u32 = 2;
const ERR_GEN_ERR: u32 = 5;
const ERR_NO_ACCESS: u32 = 6;
const ERR_AUTHORIZATION: u32 = 16;

/// How a response's error-status affects an ongoing walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PduStatus {
    Continue,
    EndOfMib,
}

/// v1 agents end a walk with noSuchName; every other nonzero status is an error.
fn check_error_status(status: u32, v1: bool) -> Result<PduStatus, TransportError> {
    match status {
        0 => Ok(PduStatus::Continue),
        ERR_NO_SUCH_NAME if v1 => Ok(PduStatus::EndOfMib),
        ERR_AUTHORIZATION => Err(TransportError::new(
            FailureKind::AuthFailed,
            "agent answered authorizationError",
        )),
        other => {
            let name = match other {
                ERR_TOO_BIG => "tooBig",
                ERR_NO_SUCH_NAME => "noSuchName",
                ERR_GEN_ERR => "genErr",
                ERR_NO_ACCESS => "noAccess",
                _ => "error",
            };
            Err(TransportError::new(
                FailureKind::QueryFailed,
                format!("agent answered {} (error-status {})", name, other),
            ))
        }
    }
}

/// Maps an `snmp2` error onto the failure taxonomy.
pub fn classify_error(error: &snmp2::Error) -> TransportError {
    use snmp2::Error;

    let kind = match error {
        Error::Send | Error::Receive => FailureKind::TargetUnreachable,
        Error::AuthFailure(_) | Error::CommunityMismatch | Error::Crypto(_) => {
            FailureKind::AuthFailed
        }
        // Engine time or boots were resynchronized; the request can be repeated.
        Error::AuthUpdated
        | Error::RequestIdMismatch
        | Error::AsnParse
        | Error::AsnInvalidLen
        | Error::AsnWrongType
        | Error::AsnUnsupportedType
        | Error::AsnEof
        | Error::AsnIntOverflow
        | Error::UnsupportedVersion
        | Error::ValueOutOfRange
        | Error::BufferOverflow => FailureKind::QueryFailed,
        Error::Mib(_) => FailureKind::UnknownError,
    };

    TransportError::new(kind, error.to_string())
}
