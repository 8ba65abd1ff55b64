use super::transport::Transport;
use super::types::{normalize_oid, oid_in_subtree, SetValue, SnmpError, SnmpValue};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;

/// OIDs per GET PDU before any bisection.
pub const GET_CHUNK_SIZE: usize = 20;

/// Why a walk stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum WalkEnd {
    /// The agent returned an OID outside the subtree, or nothing at all.
    LeftSubtree,
    /// endOfMibView or another exception value.
    EndOfView,
    /// An OID already seen in this walk came back again.
    Repeated(String),
    /// The wall-clock limit of a bounded walk elapsed.
    TimedOut,
    Error(SnmpError),
}

/// Rows collected by a walk plus the reason it ended.
#[derive(Debug, Clone)]
pub struct WalkResult {
    pub rows: Vec<(String, SnmpValue)>,
    pub end: WalkEnd,
}

impl WalkResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The transport error that cut the walk short, if any.
    pub fn error(&self) -> Option<&SnmpError> {
        match &self.end {
            WalkEnd::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_rows(self) -> Vec<(String, SnmpValue)> {
        self.rows
    }
}

/// SNMP operations the engine is built on. Transport failures never escape:
/// GET degrades to absent values, walks to truncated results, SET to `false`.
pub struct SnmpClient<T> {
    transport: T,
}

impl<T: Transport> SnmpClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn get_one(&self, oid: &str) -> Option<SnmpValue> {
        let oid = normalize_oid(oid).to_string();
        match self.transport.get(std::slice::from_ref(&oid)).await {
            Ok(varbinds) => varbinds.into_iter().next().and_then(|(_, value)| value),
            Err(e) => {
                tracing::debug!("GET {} failed: {}", oid, e);
                None
            }
        }
    }

    /// GET many OIDs in chunks of [`GET_CHUNK_SIZE`].
    ///
    /// A chunk that fails is split in half and both halves retried until the
    /// failing OIDs are isolated; a single OID that still fails is dropped.
    /// Every requested OID is a key of the result.
    pub async fn get_many(&self, oids: &[String]) -> HashMap<String, Option<SnmpValue>> {
        let requested: Vec<String> = oids.iter().map(|o| normalize_oid(o).to_string()).collect();
        let mut out: HashMap<String, Option<SnmpValue>> =
            requested.iter().map(|oid| (oid.clone(), None)).collect();

        // Reversed so chunks are popped in request order
        let mut work: Vec<&[String]> = requested.chunks(GET_CHUNK_SIZE).rev().collect();

        while let Some(chunk) = work.pop() {
            match self.transport.get(chunk).await {
                Ok(varbinds) => {
                    for (oid, value) in varbinds {
                        let key = normalize_oid(&oid);
                        if let Some(slot) = out.get_mut(key) {
                            *slot = value;
                        }
                    }
                }
                Err(e) if chunk.len() > 1 => {
                    tracing::debug!("GET of {} OIDs failed ({}), splitting", chunk.len(), e);
                    let (head, tail) = chunk.split_at(chunk.len() / 2);
                    work.push(tail);
                    work.push(head);
                }
                Err(e) => {
                    tracing::debug!("GET {} failed, dropping: {}", chunk[0], e);
                }
            }
        }

        out
    }

    /// GET-NEXT walk of the subtree under `base_oid`.
    pub async fn walk(&self, base_oid: &str) -> WalkResult {
        self.walk_inner(base_oid, None).await
    }

    /// Walk that returns whatever it has once `limit` elapses.
    pub async fn walk_bounded(&self, base_oid: &str, limit: Duration) -> WalkResult {
        self.walk_inner(base_oid, Some(Instant::now() + limit))
            .await
    }

    async fn walk_inner(&self, base_oid: &str, deadline: Option<Instant>) -> WalkResult {
        let base = normalize_oid(base_oid).to_string();
        let mut rows = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = base.clone();

        let end = loop {
            let response = match deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, self.transport.get_next(&current)).await {
                        Ok(response) => response,
                        Err(_) => break WalkEnd::TimedOut,
                    }
                }
                None => self.transport.get_next(&current).await,
            };

            let (oid, value) = match response {
                Ok(Some(varbind)) => varbind,
                Ok(None) => break WalkEnd::LeftSubtree,
                Err(e) => break WalkEnd::Error(e),
            };

            let oid = normalize_oid(&oid).to_string();
            if !oid_in_subtree(&oid, &base) {
                break WalkEnd::LeftSubtree;
            }
            let Some(value) = value else {
                break WalkEnd::EndOfView;
            };
            if !seen.insert(oid.clone()) {
                break WalkEnd::Repeated(oid);
            }

            rows.push((oid.clone(), value));
            current = oid;
        };

        match &end {
            WalkEnd::Error(e) => {
                tracing::debug!("Walk of {} stopped after {} rows: {}", base, rows.len(), e)
            }
            WalkEnd::Repeated(oid) => {
                tracing::debug!("Walk of {} stopped on repeated OID {}", base, oid)
            }
            WalkEnd::TimedOut => {
                tracing::debug!("Walk of {} timed out after {} rows", base, rows.len())
            }
            _ => {}
        }

        WalkResult { rows, end }
    }

    /// SET one value. `true` on success.
    pub async fn set(&self, oid: &str, value: SetValue) -> bool {
        let oid = normalize_oid(oid);
        match self.transport.set(oid, value).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("SET {} failed: {}", oid, e);
                false
            }
        }
    }
}
