use super::cache::{AdminStatus, InterfaceRecord, OperStatus};
use super::classify::classify_port;
use super::vlan::VlanTables;
use crate::snmp::{last_arc, oids, SnmpClient, SnmpValue, Transport};
use std::collections::BTreeMap;

/// ifHighSpeed is Mbps, but some agents report bps; values at or above
/// 1,000,000 are taken as already being bps.
pub fn high_speed_to_bps(value: u64) -> Option<u64> {
    match value {
        0 => None,
        v if v >= 1_000_000 => Some(v),
        v => v.checked_mul(1_000_000),
    }
}

/// Rows of a single-index column as (ifIndex, value).
async fn column<T: Transport>(client: &SnmpClient<T>, base: &str) -> Vec<(u32, SnmpValue)> {
    client
        .walk(base)
        .await
        .into_rows()
        .into_iter()
        .filter_map(|(oid, value)| last_arc(&oid).map(|idx| (idx, value)))
        .collect()
}

/// Rebuild the interface table from scratch. Display names already chosen in
/// `previous` are kept.
pub async fn walk_interfaces<T: Transport>(
    client: &SnmpClient<T>,
    previous: &BTreeMap<u32, InterfaceRecord>,
) -> BTreeMap<u32, InterfaceRecord> {
    let mut table: BTreeMap<u32, InterfaceRecord> = BTreeMap::new();

    for (idx, _) in column(client, oids::IF_INDEX).await {
        table.insert(idx, InterfaceRecord::new(idx));
    }

    for (idx, value) in column(client, oids::IF_DESCR).await {
        entry(&mut table, idx).description = text(&value);
    }
    for (idx, value) in column(client, oids::IF_NAME).await {
        entry(&mut table, idx).name = text(&value);
    }
    for (idx, value) in column(client, oids::IF_ALIAS).await {
        entry(&mut table, idx).alias = text(&value);
    }

    for (idx, value) in column(client, oids::IF_SPEED).await {
        if let Some(bps) = value.as_u64().filter(|&v| v > 0) {
            entry(&mut table, idx).speed_bps = Some(bps);
        }
    }
    for (idx, value) in column(client, oids::IF_HIGH_SPEED).await {
        if let Some(bps) = value.as_u64().and_then(high_speed_to_bps) {
            entry(&mut table, idx).speed_bps = Some(bps);
        }
    }

    for (idx, value) in column(client, oids::IF_TYPE).await {
        if let Some(record) = table.get_mut(&idx) {
            record.if_type = value.as_i64().and_then(|v| u32::try_from(v).ok());
        }
    }

    apply_status(client, &mut table).await;

    let vlans = VlanTables::collect(client).await;

    for (idx, record) in table.iter_mut() {
        record.display_name = previous
            .get(idx)
            .map(|p| p.display_name.clone())
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| record.default_display_name());

        record.is_bridge_port = vlans.is_bridge_port(*idx);
        record.vlan = vlans.membership(*idx);
        record.port_type = classify_port(record.if_type, &record.display_name, record.is_bridge_port);
    }

    tracing::debug!("Walked {} interfaces", table.len());
    table
}

/// Re-read admin and oper status for known interfaces.
pub async fn refresh_status<T: Transport>(
    client: &SnmpClient<T>,
    table: &mut BTreeMap<u32, InterfaceRecord>,
) {
    apply_status(client, table).await;
}

async fn apply_status<T: Transport>(
    client: &SnmpClient<T>,
    table: &mut BTreeMap<u32, InterfaceRecord>,
) {
    for (idx, value) in column(client, oids::IF_ADMIN_STATUS).await {
        if let Some(record) = table.get_mut(&idx) {
            record.admin = value.as_i64().and_then(AdminStatus::from_code);
        }
    }
    for (idx, value) in column(client, oids::IF_OPER_STATUS).await {
        if let Some(record) = table.get_mut(&idx) {
            record.oper = value.as_i64().and_then(OperStatus::from_code);
        }
    }
}

fn entry(table: &mut BTreeMap<u32, InterfaceRecord>, idx: u32) -> &mut InterfaceRecord {
    table.entry(idx).or_insert_with(|| InterfaceRecord::new(idx))
}

fn text(value: &SnmpValue) -> String {
    value.as_text().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::cache::PortType;
    use crate::snmp::mock::MockTransport;

    #[test]
    fn test_high_speed_to_bps() {
        assert_eq!(high_speed_to_bps(0), None);
        assert_eq!(high_speed_to_bps(1000), Some(1_000_000_000));
        assert_eq!(high_speed_to_bps(10_000_000), Some(10_000_000));
    }

    fn seed_two_ports(mock: &MockTransport) {
        for idx in [1u32, 2, 100] {
            mock.insert(&format!("1.3.6.1.2.1.2.2.1.1.{}", idx), SnmpValue::Integer(idx as i64));
            mock.insert(&format!("1.3.6.1.2.1.2.2.1.7.{}", idx), SnmpValue::Integer(1));
            mock.insert(&format!("1.3.6.1.2.1.2.2.1.8.{}", idx), SnmpValue::Integer(1));
        }
        mock.insert("1.3.6.1.2.1.2.2.1.2.1", SnmpValue::String("GigabitEthernet1/0/1".into()));
        mock.insert("1.3.6.1.2.1.2.2.1.2.2", SnmpValue::String("GigabitEthernet1/0/2".into()));
        mock.insert("1.3.6.1.2.1.2.2.1.2.100", SnmpValue::String("Vlan1".into()));
        mock.insert("1.3.6.1.2.1.31.1.1.1.1.1", SnmpValue::String("Gi1/0/1".into()));
        mock.insert("1.3.6.1.2.1.31.1.1.1.18.1", SnmpValue::String("uplink".into()));
        mock.insert("1.3.6.1.2.1.2.2.1.3.1", SnmpValue::Integer(6));
        mock.insert("1.3.6.1.2.1.2.2.1.3.2", SnmpValue::Integer(6));
        mock.insert("1.3.6.1.2.1.2.2.1.3.100", SnmpValue::Integer(53));
        mock.insert("1.3.6.1.2.1.2.2.1.5.1", SnmpValue::Gauge32(100_000_000));
        mock.insert("1.3.6.1.2.1.31.1.1.1.15.1", SnmpValue::Gauge32(1000));
        mock.insert("1.3.6.1.2.1.2.2.1.5.2", SnmpValue::Gauge32(10_000_000));
        mock.insert("1.3.6.1.2.1.2.2.1.8.2", SnmpValue::Integer(2));
        mock.insert("1.3.6.1.2.1.17.1.4.1.2.1", SnmpValue::Integer(1));
    }

    #[tokio::test]
    async fn test_walk_interfaces_joins_columns() {
        let mock = MockTransport::new();
        seed_two_ports(&mock);
        let client = SnmpClient::new(mock);

        let table = walk_interfaces(&client, &BTreeMap::new()).await;

        assert_eq!(table.len(), 3);
        let uplink = &table[&1];
        assert_eq!(uplink.name, "Gi1/0/1");
        assert_eq!(uplink.alias, "uplink");
        assert_eq!(uplink.display_name, "Gi1/0/1");
        assert_eq!(uplink.speed_bps, Some(1_000_000_000));
        assert!(uplink.is_bridge_port);
        assert_eq!(uplink.port_type, PortType::Physical);
        assert_eq!(uplink.admin, Some(AdminStatus::Up));

        let second = &table[&2];
        assert_eq!(second.display_name, "GigabitEthernet1/0/2");
        assert_eq!(second.speed_bps, Some(10_000_000));
        assert_eq!(second.oper, Some(OperStatus::Down));
        assert_eq!(second.port_type, PortType::Physical);

        assert_eq!(table[&100].port_type, PortType::Virtual);
    }

    #[tokio::test]
    async fn test_walk_interfaces_keeps_previous_display_name() {
        let mock = MockTransport::new();
        seed_two_ports(&mock);
        let client = SnmpClient::new(mock);

        let mut previous = BTreeMap::new();
        let mut renamed = InterfaceRecord::new(1);
        renamed.display_name = "Core uplink".into();
        previous.insert(1, renamed);

        let table = walk_interfaces(&client, &previous).await;
        assert_eq!(table[&1].display_name, "Core uplink");
        assert_eq!(table[&2].display_name, "GigabitEthernet1/0/2");
    }

    #[tokio::test]
    async fn test_refresh_status_updates_known_only() {
        let mock = MockTransport::new();
        seed_two_ports(&mock);
        let client = SnmpClient::new(mock.clone());
        let mut table = walk_interfaces(&client, &BTreeMap::new()).await;

        mock.insert("1.3.6.1.2.1.2.2.1.7.1", SnmpValue::Integer(2));
        mock.insert("1.3.6.1.2.1.2.2.1.7.55", SnmpValue::Integer(1));
        refresh_status(&client, &mut table).await;

        assert_eq!(table[&1].admin, Some(AdminStatus::Down));
        assert!(!table.contains_key(&55));
    }
}
