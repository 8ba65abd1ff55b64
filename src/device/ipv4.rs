use super::cache::{prefix_to_mask, InterfaceRecord, Ipv4Binding};
use crate::snmp::{oid_suffix, oids, SnmpClient, SnmpValue, Transport};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Address -> ifIndex and address -> mask maps for one refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ipv4Tables {
    pub ip_index: BTreeMap<Ipv4Addr, u32>,
    pub ip_mask: BTreeMap<Ipv4Addr, Ipv4Addr>,
}

impl Ipv4Tables {
    /// Gather addresses from the legacy ipAdEnt table, ipAddressIfIndex and
    /// OSPF-MIB, then fill missing masks from the route table.
    pub async fn collect<T: Transport>(client: &SnmpClient<T>) -> Self {
        let mut tables = Ipv4Tables::default();

        // (1) ipAdEntTable; the address column only tells us the table exists
        let legacy = client.walk(oids::IP_AD_ENT_ADDR).await;
        if !legacy.is_empty() {
            for (oid, value) in client.walk(oids::IP_AD_ENT_IF_INDEX).await.into_rows() {
                let Some(addr) = trailing_address(&oid).filter(|a| is_usable(*a)) else {
                    continue;
                };
                if let Some(if_index) = value.as_i64().and_then(|v| u32::try_from(v).ok()) {
                    tables.ip_index.insert(addr, if_index);
                }
            }
            for (oid, value) in client.walk(oids::IP_AD_ENT_NET_MASK).await.into_rows() {
                let Some(addr) = trailing_address(&oid).filter(|a| is_usable(*a)) else {
                    continue;
                };
                if let Some(mask) = ipv4_from_value(&value) {
                    tables.ip_mask.insert(addr, mask);
                }
            }
        }

        // (2) ipAddressIfIndex, address in the instance suffix
        for (oid, value) in client.walk(oids::IP_ADDRESS_IF_INDEX).await.into_rows() {
            let Some(arcs) = oid_suffix(&oid, oids::IP_ADDRESS_IF_INDEX) else {
                continue;
            };
            let Some(addr) = address_from_inet_suffix(&arcs).filter(|a| is_usable(*a)) else {
                continue;
            };
            if let Some(if_index) = value.as_i64().and_then(|v| u32::try_from(v).ok()) {
                tables.ip_index.insert(addr, if_index);
            }
        }

        // (3) ospfIfIpAddress, suffix a.b.c.d.<ifIndex>.<area...>
        for (oid, _) in client.walk(oids::OSPF_IF_IP_ADDRESS).await.into_rows() {
            let Some(arcs) = oid_suffix(&oid, oids::OSPF_IF_IP_ADDRESS) else {
                continue;
            };
            if let Some((addr, if_index)) = ospf_suffix(&arcs) {
                if is_usable(addr) {
                    tables.ip_index.insert(addr, if_index);
                }
            }
        }

        if tables.ip_index.is_empty() {
            return tables;
        }

        // (4) masks from the route table
        let routes: Vec<(Ipv4Addr, u8)> = client
            .walk(oids::INET_CIDR_ROUTE_PROTO)
            .await
            .into_rows()
            .into_iter()
            .filter_map(|(oid, _)| oid_suffix(&oid, oids::INET_CIDR_ROUTE_PROTO))
            .filter_map(|arcs| route_prefix_from_suffix(&arcs))
            .collect();
        tables.infer_masks(&routes);

        tables
    }

    /// Fill masks that no table reported from the longest route prefix
    /// containing the address. Default routes carry no subnet information.
    pub fn infer_masks(&mut self, routes: &[(Ipv4Addr, u8)]) {
        let mut routes: Vec<(u32, u8)> = routes
            .iter()
            .filter(|(_, len)| (1..=32).contains(len))
            .map(|(net, len)| (u32::from(*net), *len))
            .collect();
        routes.sort_by(|a, b| b.1.cmp(&a.1));

        for addr in self.ip_index.keys() {
            if self.ip_mask.contains_key(addr) {
                continue;
            }
            let ip = u32::from(*addr);
            let best = routes.iter().find(|(net, len)| {
                let mask = u32::MAX << (32 - u32::from(*len));
                ip & mask == net & mask
            });
            if let Some(mask) = best.and_then(|(_, len)| prefix_to_mask(*len)) {
                self.ip_mask.insert(*addr, mask);
            }
        }
    }

    /// Replace the IPv4 bindings of every interface from these maps.
    pub fn attach(&self, interfaces: &mut BTreeMap<u32, InterfaceRecord>) {
        for record in interfaces.values_mut() {
            record.ipv4.clear();
        }
        for (addr, if_index) in &self.ip_index {
            if let Some(record) = interfaces.get_mut(if_index) {
                record
                    .ipv4
                    .push(Ipv4Binding::new(*addr, self.ip_mask.get(addr).copied()));
            }
        }
    }
}

/// Addresses that are meaningless on switch ports are dropped.
pub fn is_usable(addr: Ipv4Addr) -> bool {
    // 240.0.0.0/4, which also covers the limited broadcast address
    let reserved = addr.octets()[0] >= 240;
    !(addr.is_loopback()
        || addr.is_unspecified()
        || addr.is_link_local()
        || addr.is_multicast()
        || reserved
        || addr.is_broadcast())
}

/// IPv4 from an IpAddress value, 4 raw octets, or dotted text.
pub fn ipv4_from_value(value: &SnmpValue) -> Option<Ipv4Addr> {
    match value {
        SnmpValue::IpAddress(addr) => Some(*addr),
        SnmpValue::OctetString(bytes) => <[u8; 4]>::try_from(bytes.as_slice())
            .ok()
            .map(Ipv4Addr::from),
        SnmpValue::String(s) => s.trim().parse().ok().or_else(|| {
            <[u8; 4]>::try_from(s.as_bytes()).ok().map(Ipv4Addr::from)
        }),
        _ => None,
    }
}

/// First `1.4.a.b.c.d` run in an InetAddress-indexed suffix.
pub fn address_from_inet_suffix(arcs: &[u32]) -> Option<Ipv4Addr> {
    arcs.windows(6)
        .find(|w| w[0] == 1 && w[1] == 4)
        .and_then(|w| octets(&w[2..6]))
}

/// Destination network and prefix length from an inetCidrRouteTable suffix.
pub fn route_prefix_from_suffix(arcs: &[u32]) -> Option<(Ipv4Addr, u8)> {
    let end = arcs.len().checked_sub(7)?;
    (0..end).find_map(|i| {
        if arcs[i] != 1 || arcs[i + 1] != 4 {
            return None;
        }
        let net = octets(&arcs[i + 2..i + 6])?;
        let len = u8::try_from(arcs[i + 6]).ok().filter(|&l| l <= 32)?;
        Some((net, len))
    })
}

fn ospf_suffix(arcs: &[u32]) -> Option<(Ipv4Addr, u32)> {
    if arcs.len() < 5 {
        return None;
    }
    Some((octets(&arcs[..4])?, arcs[4]))
}

fn trailing_address(oid: &str) -> Option<Ipv4Addr> {
    let parts: Vec<u32> = oid
        .rsplit('.')
        .take(4)
        .map(|p| p.parse().ok())
        .collect::<Option<Vec<u32>>>()?;
    let mut arcs = parts;
    arcs.reverse();
    octets(&arcs)
}

fn octets(arcs: &[u32]) -> Option<Ipv4Addr> {
    let [a, b, c, d] = arcs else {
        return None;
    };
    Some(Ipv4Addr::new(
        u8::try_from(*a).ok()?,
        u8::try_from(*b).ok()?,
        u8::try_from(*c).ok()?,
        u8::try_from(*d).ok()?,
    ))
}
