use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnmpError {
    #[error("SNMP request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid OID: {0}")]
    InvalidOid(String),
    #[error("Timeout")]
    Timeout,
    #[error("Authentication failure")]
    AuthFailure,
    #[error("Network unreachable")]
    NetworkUnreachable,
    /// The agent answered with a non-zero error-status (noSuchName, tooBig, genErr, ...)
    #[error("SNMP error status {status} at index {index}")]
    ErrorStatus { status: u32, index: u32 },
    #[error("SNMP session closed")]
    SessionClosed,
}

pub type SnmpResult<T> = Result<T, SnmpError>;

/// SNMP value returned by a GET or GET-NEXT.
///
/// The noSuchObject / noSuchInstance / endOfMibView exceptions never appear
/// here: the transport normalizes them to `None` before they reach callers.
#[derive(Debug, Clone, PartialEq)]
pub enum SnmpValue {
    Integer(i64),
    String(String),
    OctetString(Vec<u8>),
    Oid(String),
    Counter32(u32),
    Counter64(u64),
    Gauge32(u32),
    TimeTicks(u32),
    IpAddress(Ipv4Addr),
    Null,
    Unsupported(String),
}

impl SnmpValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SnmpValue::Integer(v) => Some(*v),
            SnmpValue::Counter32(v) => Some(*v as i64),
            SnmpValue::Counter64(v) => i64::try_from(*v).ok(),
            SnmpValue::Gauge32(v) => Some(*v as i64),
            SnmpValue::TimeTicks(v) => Some(*v as i64),
            // Some agents report numbers as DisplayString ("12", "12.5")
            SnmpValue::String(s) => parse_numeric_text(s).map(|f| f as i64),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SnmpValue::Counter64(v) => Some(*v),
            other => other.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SnmpValue::Counter64(v) => Some(*v as f64),
            SnmpValue::String(s) => parse_numeric_text(s),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Raw octets of a string-typed value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SnmpValue::OctetString(b) => Some(b),
            SnmpValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Printable rendering, used for names, descriptions and vendor strings.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SnmpValue::String(s) => Some(s.clone()),
            SnmpValue::OctetString(b) => Some(String::from_utf8_lossy(b).into_owned()),
            SnmpValue::Oid(o) => Some(o.clone()),
            SnmpValue::IpAddress(ip) => Some(ip.to_string()),
            SnmpValue::Integer(v) => Some(v.to_string()),
            SnmpValue::Counter32(v) | SnmpValue::Gauge32(v) | SnmpValue::TimeTicks(v) => {
                Some(v.to_string())
            }
            SnmpValue::Counter64(v) => Some(v.to_string()),
            SnmpValue::Null | SnmpValue::Unsupported(_) => None,
        }
    }
}

fn parse_numeric_text(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v as f64);
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Value written by a SET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValue {
    Integer(i64),
    OctetString(Vec<u8>),
}

/// Normalize a dotted OID string: trims whitespace and a leading '.'.
pub fn normalize_oid(oid: &str) -> &str {
    let trimmed = oid.trim();
    trimmed.strip_prefix('.').unwrap_or(trimmed)
}

/// Parse a dotted OID into its numeric arcs.
pub fn parse_oid(oid: &str) -> SnmpResult<Vec<u32>> {
    let normalized = normalize_oid(oid);
    if normalized.is_empty() {
        return Err(SnmpError::InvalidOid(oid.to_string()));
    }
    normalized
        .split('.')
        .map(|arc| {
            arc.parse::<u32>()
                .map_err(|_| SnmpError::InvalidOid(oid.to_string()))
        })
        .collect()
}

/// True when `oid` is `base` itself or lies beneath it.
pub fn oid_in_subtree(oid: &str, base: &str) -> bool {
    let oid = normalize_oid(oid);
    let base = normalize_oid(base);
    oid == base
        || (oid.len() > base.len() && oid.starts_with(base) && oid.as_bytes()[base.len()] == b'.')
}

/// Instance arcs of `oid` below `base` (`base.1.4.10.0.0.1` -> `[1, 4, 10, 0, 0, 1]`).
pub fn oid_suffix(oid: &str, base: &str) -> Option<Vec<u32>> {
    if !oid_in_subtree(oid, base) {
        return None;
    }
    let rest = &normalize_oid(oid)[normalize_oid(base).len()..];
    rest.split('.')
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u32>().ok())
        .collect()
}

/// Last arc of an OID, the table index for single-index columns.
pub fn last_arc(oid: &str) -> Option<u32> {
    normalize_oid(oid).rsplit('.').next()?.parse().ok()
}
