use super::cache::VlanMembership;
use crate::snmp::{last_arc, oids, SnmpClient, SnmpValue, Transport};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Cap on each Q-BRIDGE PortList walk; large VLAN tables on slow agents can
/// otherwise stall discovery.
pub const PORT_LIST_WALK_LIMIT: Duration = Duration::from_secs(30);

/// Decode a Q-BRIDGE PortList: MSB-first, bit n (1-based) is bridge port n.
pub fn decode_port_list(bytes: &[u8]) -> BTreeSet<u32> {
    let mut ports = BTreeSet::new();
    for (octet, byte) in bytes.iter().enumerate() {
        for bit in 0..8u32 {
            if byte & (0x80 >> bit) != 0 {
                ports.insert(octet as u32 * 8 + bit + 1);
            }
        }
    }
    ports
}

/// Encode bridge ports as the shortest PortList covering the highest port.
pub fn encode_port_list(ports: &BTreeSet<u32>) -> Vec<u8> {
    let Some(&highest) = ports.iter().next_back() else {
        return Vec::new();
    };
    let mut bytes = vec![0u8; highest.div_ceil(8) as usize];
    for &port in ports.iter().filter(|&&p| p > 0) {
        let bit = port - 1;
        bytes[(bit / 8) as usize] |= 0x80 >> (bit % 8);
    }
    bytes
}

/// Bridge and Q-BRIDGE data gathered during a full walk, keyed by bridge port.
#[derive(Debug, Clone, Default)]
pub struct VlanTables {
    pub base_port_by_if_index: HashMap<u32, u32>,
    pub pvid_by_base_port: HashMap<u32, u32>,
    pub allowed_by_base_port: HashMap<u32, BTreeSet<u32>>,
    pub untagged_by_base_port: HashMap<u32, BTreeSet<u32>>,
}

impl VlanTables {
    pub async fn collect<T: Transport>(client: &SnmpClient<T>) -> Self {
        let mut tables = VlanTables::default();

        for (oid, value) in client.walk(oids::DOT1D_BASE_PORT_IF_INDEX).await.into_rows() {
            let (Some(base_port), Some(if_index)) = (last_arc(&oid), positive(&value)) else {
                continue;
            };
            if base_port > 0 {
                tables.base_port_by_if_index.insert(if_index, base_port);
            }
        }

        if tables.base_port_by_if_index.is_empty() {
            tracing::debug!("No BRIDGE-MIB port table, skipping VLAN discovery");
            return tables;
        }

        for (oid, value) in client.walk(oids::DOT1Q_PVID).await.into_rows() {
            if let (Some(base_port), Some(pvid)) = (last_arc(&oid), positive(&value)) {
                tables.pvid_by_base_port.insert(base_port, pvid);
            }
        }

        // Current and static tables are merged; some platforms only fill one
        let egress = [oids::DOT1Q_VLAN_CURRENT_EGRESS, oids::DOT1Q_VLAN_STATIC_EGRESS];
        let untagged = [oids::DOT1Q_VLAN_CURRENT_UNTAGGED, oids::DOT1Q_VLAN_STATIC_UNTAGGED];

        for base in egress {
            let count = collect_port_lists(client, base, &mut tables.allowed_by_base_port).await;
            tracing::debug!("{} VLAN egress lists from {}", count, base);
        }
        for base in untagged {
            let count = collect_port_lists(client, base, &mut tables.untagged_by_base_port).await;
            tracing::debug!("{} VLAN untagged lists from {}", count, base);
        }

        tables
    }

    pub fn is_bridge_port(&self, if_index: u32) -> bool {
        self.base_port_by_if_index.contains_key(&if_index)
    }

    /// VLAN view of an interface, `None` when it is not a bridge port or the
    /// agent reported nothing for it.
    pub fn membership(&self, if_index: u32) -> Option<VlanMembership> {
        let base_port = self.base_port_by_if_index.get(&if_index)?;
        let native = self.pvid_by_base_port.get(base_port).copied();
        let allowed = self
            .allowed_by_base_port
            .get(base_port)
            .cloned()
            .unwrap_or_default();
        let untagged = self
            .untagged_by_base_port
            .get(base_port)
            .cloned()
            .unwrap_or_default();

        if native.is_none() && allowed.is_empty() && untagged.is_empty() {
            return None;
        }

        let tagged: BTreeSet<u32> = if !untagged.is_empty() {
            allowed.difference(&untagged).copied().collect()
        } else if let Some(pvid) = native {
            allowed.iter().copied().filter(|&v| v != pvid).collect()
        } else {
            allowed.clone()
        };
        let trunk = allowed.len() > 1 || !tagged.is_empty();

        Some(VlanMembership {
            native,
            allowed,
            untagged,
            tagged,
            trunk,
        })
    }
}

/// Walk one PortList column (indexed by VLAN) and invert it into
/// bridge port -> VLANs. Returns the number of non-empty lists.
async fn collect_port_lists<T: Transport>(
    client: &SnmpClient<T>,
    base: &str,
    out: &mut HashMap<u32, BTreeSet<u32>>,
) -> usize {
    let result = client.walk_bounded(base, PORT_LIST_WALK_LIMIT).await;
    let mut count = 0;
    for (oid, value) in result.rows {
        let Some(vlan) = last_arc(&oid).filter(|&v| v > 0) else {
            continue;
        };
        let ports = value.as_bytes().map(decode_port_list).unwrap_or_default();
        if ports.is_empty() {
            continue;
        }
        count += 1;
        for port in ports {
            out.entry(port).or_default().insert(vlan);
        }
    }
    count
}

fn positive(value: &SnmpValue) -> Option<u32> {
    value
        .as_i64()
        .filter(|&v| v > 0)
        .and_then(|v| u32::try_from(v).ok())
}
