mod client;
#[cfg(any(test, feature = "testing"))]
pub mod mock;
pub mod oids;
mod transport;
mod types;

pub use client::{SnmpClient, WalkEnd, WalkResult, GET_CHUNK_SIZE};
pub use transport::{Snmp2Transport, Transport, VarBind};
pub use types::{
    last_arc, normalize_oid, oid_in_subtree, oid_suffix, parse_oid, SetValue, SnmpError,
    SnmpResult, SnmpValue,
};
