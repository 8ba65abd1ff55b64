//! Programmable in-memory agent for exercising the engine without a network.
//!
//! Holds an ordered OID tree and answers GET, GET-NEXT and SET against it.
//! Individual OIDs can be poisoned (any GET carrying them fails with an
//! error-status), GET-NEXT answers can be forced (to build loops), and every
//! request can be delayed.

use super::transport::{Transport, VarBind};
use super::types::{parse_oid, SetValue, SnmpError, SnmpResult, SnmpValue};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockInner {
    tree: BTreeMap<Vec<u32>, (String, SnmpValue)>,
    poisoned: HashSet<String>,
    forced_next: HashMap<String, (String, SnmpValue)>,
    failing_subtrees: Vec<String>,
    reject_sets: bool,
    sets: Vec<(String, SetValue)>,
    get_requests: Vec<Vec<String>>,
    next_requests: usize,
    delay: Option<Duration>,
}

/// Mock transport; clones share state.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace one instance. Panics on an unparsable OID.
    pub fn insert(&self, oid: &str, value: SnmpValue) -> &Self {
        let arcs = parse_oid(oid).unwrap_or_else(|_| panic!("bad mock OID {}", oid));
        let key = super::types::normalize_oid(oid).to_string();
        self.lock().tree.insert(arcs, (key, value));
        self
    }

    pub fn remove(&self, oid: &str) {
        if let Ok(arcs) = parse_oid(oid) {
            self.lock().tree.remove(&arcs);
        }
    }

    /// Any GET whose PDU contains this OID fails with a genErr status.
    pub fn poison(&self, oid: &str) {
        self.lock().poisoned.insert(oid.to_string());
    }

    /// GET-NEXT from `from` answers with `(to, value)` regardless of the tree.
    pub fn force_next(&self, from: &str, to: &str, value: SnmpValue) {
        self.lock()
            .forced_next
            .insert(from.to_string(), (to.to_string(), value));
    }

    /// GET-NEXT requests at or below `base` fail with a timeout.
    pub fn fail_subtree(&self, base: &str) {
        self.lock().failing_subtrees.push(base.to_string());
    }

    pub fn reject_sets(&self, reject: bool) {
        self.lock().reject_sets = reject;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    pub fn sets(&self) -> Vec<(String, SetValue)> {
        self.lock().sets.clone()
    }

    /// OID lists of every GET PDU sent so far.
    pub fn get_requests(&self) -> Vec<Vec<String>> {
        self.lock().get_requests.clone()
    }

    pub fn next_request_count(&self) -> usize {
        self.lock().next_requests
    }

    async fn pause(&self) {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, oids: &[String]) -> SnmpResult<Vec<VarBind>> {
        self.pause().await;
        let mut inner = self.lock();
        inner.get_requests.push(oids.to_vec());

        if let Some(pos) = oids.iter().position(|oid| inner.poisoned.contains(oid)) {
            return Err(SnmpError::ErrorStatus {
                status: 5,
                index: pos as u32 + 1,
            });
        }

        let mut out = Vec::with_capacity(oids.len());
        for oid in oids {
            let arcs = parse_oid(oid)?;
            let value = inner.tree.get(&arcs).map(|(_, v)| v.clone());
            out.push((oid.clone(), value));
        }
        Ok(out)
    }

    async fn get_next(&self, oid: &str) -> SnmpResult<Option<VarBind>> {
        self.pause().await;
        let mut inner = self.lock();
        inner.next_requests += 1;

        if inner
            .failing_subtrees
            .iter()
            .any(|base| super::types::oid_in_subtree(oid, base))
        {
            return Err(SnmpError::Timeout);
        }

        if let Some((to, value)) = inner.forced_next.get(oid) {
            return Ok(Some((to.clone(), Some(value.clone()))));
        }

        let arcs = parse_oid(oid)?;
        let next = inner
            .tree
            .range((std::ops::Bound::Excluded(arcs), std::ops::Bound::Unbounded))
            .next()
            .map(|(_, (name, value))| (name.clone(), Some(value.clone())));
        Ok(next)
    }

    async fn set(&self, oid: &str, value: SetValue) -> SnmpResult<()> {
        self.pause().await;
        let mut inner = self.lock();
        if inner.reject_sets {
            return Err(SnmpError::ErrorStatus { status: 17, index: 1 });
        }
        inner.sets.push((oid.to_string(), value.clone()));

        let arcs = parse_oid(oid)?;
        let stored = match value {
            SetValue::Integer(i) => SnmpValue::Integer(i),
            SetValue::OctetString(bytes) => String::from_utf8(bytes.clone())
                .map(SnmpValue::String)
                .unwrap_or(SnmpValue::OctetString(bytes)),
        };
        let key = super::types::normalize_oid(oid).to_string();
        inner.tree.insert(arcs, (key, stored));
        Ok(())
    }
}
