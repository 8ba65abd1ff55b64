use super::types::{SetValue, SnmpError, SnmpResult, SnmpValue};
use crate::config::{AuthProtocol, Credentials, DeviceConfig, PrivProtocol, V3Credentials};
use async_trait::async_trait;
use snmp2::{Oid, SyncSession};
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// One returned variable binding. `None` stands for the noSuchObject,
/// noSuchInstance and endOfMibView exceptions.
pub type VarBind = (String, Option<SnmpValue>);

/// Request/response seam between the acquisition engine and the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET for every OID in one PDU.
    async fn get(&self, oids: &[String]) -> SnmpResult<Vec<VarBind>>;

    /// GET-NEXT for a single OID. `Ok(None)` when the agent returned no varbind.
    async fn get_next(&self, oid: &str) -> SnmpResult<Option<VarBind>>;

    async fn set(&self, oid: &str, value: SetValue) -> SnmpResult<()>;
}

#[derive(Debug)]
enum SnmpRequest {
    Get {
        oids: Vec<String>,
        response_tx: oneshot::Sender<SnmpResult<Vec<VarBind>>>,
    },
    GetNext {
        oid: String,
        response_tx: oneshot::Sender<SnmpResult<Option<VarBind>>>,
    },
    Set {
        oid: String,
        value: SetValue,
        response_tx: oneshot::Sender<SnmpResult<()>>,
    },
    Shutdown,
}

#[derive(Clone)]
struct SessionSettings {
    addr: String,
    credentials: Credentials,
    timeout: Duration,
    retries: u32,
}

/// UDP transport backed by a persistent `snmp2` session.
///
/// `SyncSession` blocks, so it lives on a dedicated worker thread per device
/// and async callers talk to it over a channel. Keeping one session also keeps
/// the SNMPv3 engine-id/boots/time discovery across requests.
pub struct Snmp2Transport {
    target: String,
    request_tx: mpsc::UnboundedSender<SnmpRequest>,
}

impl Snmp2Transport {
    /// Open the session. Fails only when the transport itself cannot be built
    /// (bad address, socket error, SNMPv3 discovery failure).
    pub async fn connect(device: &DeviceConfig) -> SnmpResult<Self> {
        let addr = socket_addr(&device.host, device.port);
        let settings = SessionSettings {
            addr: addr.clone(),
            credentials: device.credentials.clone(),
            timeout: Duration::from_millis(device.timeout_ms),
            retries: device.retries,
        };

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        // 8MB stack for SNMPv3 crypto operations
        std::thread::Builder::new()
            .name(format!("snmp-{}", addr))
            .stack_size(8 * 1024 * 1024)
            .spawn(move || run_session_thread(settings, request_rx, ready_tx))
            .map_err(|e| SnmpError::RequestFailed(format!("Failed to spawn session thread: {}", e)))?;

        ready_rx.await.map_err(|_| SnmpError::SessionClosed)??;

        tracing::info!("Opened SNMP session to {}", addr);

        Ok(Self {
            target: addr,
            request_tx,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Stop the worker thread. Pending requests fail with `SessionClosed`.
    pub fn shutdown(&self) {
        let _ = self.request_tx.send(SnmpRequest::Shutdown);
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<SnmpResult<T>>) -> SnmpRequest,
    ) -> SnmpResult<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(build(response_tx))
            .map_err(|_| SnmpError::SessionClosed)?;
        response_rx.await.map_err(|_| SnmpError::SessionClosed)?
    }
}

impl Drop for Snmp2Transport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait]
impl Transport for Snmp2Transport {
    async fn get(&self, oids: &[String]) -> SnmpResult<Vec<VarBind>> {
        let oids = oids.to_vec();
        self.call(|response_tx| SnmpRequest::Get { oids, response_tx })
            .await
    }

    async fn get_next(&self, oid: &str) -> SnmpResult<Option<VarBind>> {
        let oid = oid.to_string();
        self.call(|response_tx| SnmpRequest::GetNext { oid, response_tx })
            .await
    }

    async fn set(&self, oid: &str, value: SetValue) -> SnmpResult<()> {
        let oid = oid.to_string();
        self.call(|response_tx| SnmpRequest::Set {
            oid,
            value,
            response_tx,
        })
        .await
    }
}

fn socket_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Worker thread body: owns the session and serves requests until shutdown.
fn run_session_thread(
    settings: SessionSettings,
    mut request_rx: mpsc::UnboundedReceiver<SnmpRequest>,
    ready_tx: oneshot::Sender<SnmpResult<()>>,
) {
    let mut session = match create_session(&settings) {
        Ok(session) => {
            let _ = ready_tx.send(Ok(()));
            session
        }
        Err(e) => {
            tracing::error!("Failed to create SNMP session for {}: {}", settings.addr, e);
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    while let Some(request) = request_rx.blocking_recv() {
        match request {
            SnmpRequest::Get { oids, response_tx } => {
                let _ = response_tx.send(perform_get(&mut session, &oids, settings.retries));
            }
            SnmpRequest::GetNext { oid, response_tx } => {
                let _ = response_tx.send(perform_get_next(&mut session, &oid, settings.retries));
            }
            SnmpRequest::Set {
                oid,
                value,
                response_tx,
            } => {
                let _ = response_tx.send(perform_set(&mut session, &oid, &value, settings.retries));
            }
            SnmpRequest::Shutdown => break,
        }
    }

    tracing::debug!("SNMP session thread stopped for {}", settings.addr);
}

fn create_session(settings: &SessionSettings) -> SnmpResult<SyncSession> {
    let timeout = Some(settings.timeout);
    let req_id = 1;

    match &settings.credentials {
        Credentials::V2c { community } => SyncSession::new_v2c(
            settings.addr.as_str(),
            community.expose().as_bytes(),
            timeout,
            req_id,
        )
        .map_err(|e| {
            tracing::debug!("v2c session creation failed for {}: {}", settings.addr, e);
            SnmpError::NetworkUnreachable
        }),
        Credentials::V3(v3) => create_v3_session(&settings.addr, timeout, req_id, v3),
    }
}

fn create_v3_session(
    addr: &str,
    timeout: Option<Duration>,
    req_id: i32,
    config: &V3Credentials,
) -> SnmpResult<SyncSession> {
    use snmp2::v3::{Auth, Security};

    let auth = match (config.auth_protocol, config.priv_protocol) {
        (AuthProtocol::None, _) => Auth::NoAuthNoPriv,
        (_, PrivProtocol::None) => Auth::AuthNoPriv,
        (_, privacy) => {
            let priv_pass = config.priv_passphrase.as_ref().ok_or_else(|| {
                SnmpError::RequestFailed("Privacy passphrase required for authPriv".into())
            })?;
            Auth::AuthPriv {
                cipher: cipher_for(privacy),
                privacy_password: priv_pass.expose().as_bytes().to_vec(),
            }
        }
    };

    let auth_password = config
        .auth_passphrase
        .as_ref()
        .map(|s| s.expose())
        .unwrap_or("")
        .as_bytes();
    let needs_auth = !matches!(auth, Auth::NoAuthNoPriv);

    let mut security = Security::new(config.username.as_bytes(), auth_password).with_auth(auth);
    if needs_auth {
        security = security.with_auth_protocol(match config.auth_protocol {
            AuthProtocol::Md5 => snmp2::v3::AuthProtocol::Md5,
            _ => snmp2::v3::AuthProtocol::Sha1,
        });
    }

    let mut session = SyncSession::new_v3(addr, timeout, req_id, security).map_err(|e| {
        SnmpError::RequestFailed(format!("SNMPv3 session creation failed: {:?}", e))
    })?;

    // Engine ID discovery up front so the first real request is not spent on it
    if needs_auth {
        session.init().map_err(|e| {
            SnmpError::RequestFailed(format!("Engine ID discovery failed: {:?}", e))
        })?;
    }

    Ok(session)
}

fn cipher_for(protocol: PrivProtocol) -> snmp2::v3::Cipher {
    match protocol {
        PrivProtocol::Des => snmp2::v3::Cipher::Des,
        _ => snmp2::v3::Cipher::Aes128,
    }
}

/// Run one exchange, retrying once after SNMPv3 re-discovery and up to
/// `retries` more times on timeout. `op` must return owned data.
fn exchange<T>(
    session: &mut SyncSession,
    retries: u32,
    mut op: impl FnMut(&mut SyncSession) -> Result<T, snmp2::Error>,
) -> SnmpResult<T> {
    let mut attempt = 0;
    loop {
        let result = match op(session) {
            Err(snmp2::Error::AuthUpdated) => {
                tracing::debug!("SNMPv3 engine ID discovered, retrying request");
                op(session)
            }
            other => other,
        };

        match result.map_err(map_snmp_error) {
            Err(SnmpError::Timeout) if attempt < retries => {
                attempt += 1;
                tracing::debug!("SNMP request timed out, retry {}/{}", attempt, retries);
            }
            other => return other,
        }
    }
}

fn parse_oids(oids: &[String]) -> SnmpResult<Vec<Oid<'static>>> {
    oids.iter().map(|oid| parse_wire_oid(oid)).collect()
}

fn parse_wire_oid(oid: &str) -> SnmpResult<Oid<'static>> {
    Oid::from_str(super::types::normalize_oid(oid))
        .map_err(|_| SnmpError::InvalidOid(oid.to_string()))
}

fn perform_get(session: &mut SyncSession, oids: &[String], retries: u32) -> SnmpResult<Vec<VarBind>> {
    let parsed = parse_oids(oids)?;
    let refs: Vec<&Oid> = parsed.iter().collect();

    exchange(session, retries, |s: &mut SyncSession| {
        s.get_many(&refs).map(collect_varbinds)
    })?
}

fn perform_get_next(session: &mut SyncSession, oid: &str, retries: u32) -> SnmpResult<Option<VarBind>> {
    let parsed = parse_wire_oid(oid)?;

    let varbinds = exchange(session, retries, |s: &mut SyncSession| {
        s.getnext(&parsed).map(collect_varbinds)
    })??;

    Ok(varbinds.into_iter().next())
}

fn perform_set(session: &mut SyncSession, oid: &str, value: &SetValue, retries: u32) -> SnmpResult<()> {
    let parsed = parse_wire_oid(oid)?;

    exchange(session, retries, |s: &mut SyncSession| {
        let wire_value = match value {
            SetValue::Integer(i) => snmp2::Value::Integer(*i),
            SetValue::OctetString(bytes) => snmp2::Value::OctetString(bytes.as_slice()),
        };
        s.set(&[(&parsed, wire_value)]).map(collect_varbinds)
    })??;

    Ok(())
}

/// Copy a response PDU into owned varbinds, rejecting a non-zero error-status.
fn collect_varbinds(response: snmp2::Pdu<'_>) -> SnmpResult<Vec<VarBind>> {
    if response.error_status != 0 {
        return Err(SnmpError::ErrorStatus {
            status: response.error_status as u32,
            index: response.error_index as u32,
        });
    }

    Ok(response
        .varbinds
        .map(|(name, value)| (name.to_string(), convert_value(value)))
        .collect())
}

/// Convert snmp2::Value to our SnmpValue; exceptions become `None`.
fn convert_value(value: snmp2::Value) -> Option<SnmpValue> {
    let converted = match value {
        snmp2::Value::NoSuchObject
        | snmp2::Value::NoSuchInstance
        | snmp2::Value::EndOfMibView => return None,
        snmp2::Value::Integer(i) => SnmpValue::Integer(i),
        snmp2::Value::OctetString(bytes) => String::from_utf8(bytes.to_vec())
            .map(SnmpValue::String)
            .unwrap_or_else(|_| SnmpValue::OctetString(bytes.to_vec())),
        snmp2::Value::ObjectIdentifier(oid) => SnmpValue::Oid(oid.to_string()),
        snmp2::Value::Counter32(c) => SnmpValue::Counter32(c),
        snmp2::Value::Counter64(c) => SnmpValue::Counter64(c),
        snmp2::Value::Unsigned32(g) => SnmpValue::Gauge32(g),
        snmp2::Value::Timeticks(t) => SnmpValue::TimeTicks(t),
        snmp2::Value::IpAddress(ip) => SnmpValue::IpAddress(Ipv4Addr::from(ip)),
        snmp2::Value::Null => SnmpValue::Null,
        other => SnmpValue::Unsupported(format!("{:?}", other)),
    };
    Some(converted)
}

fn map_snmp_error(err: snmp2::Error) -> SnmpError {
    match &err {
        snmp2::Error::Send => SnmpError::NetworkUnreachable,
        snmp2::Error::Receive => SnmpError::Timeout,
        snmp2::Error::CommunityMismatch => SnmpError::AuthFailure,
        snmp2::Error::AuthFailure(kind) => {
            tracing::warn!("SNMPv3 AuthFailure: {:?}", kind);
            SnmpError::AuthFailure
        }
        _ => SnmpError::RequestFailed(format!("{:?}", err)),
    }
}
