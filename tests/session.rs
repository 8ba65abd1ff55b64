//! End-to-end session behavior against an in-memory agent.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::time::Duration;
use switch_poller::config::DeviceConfig;
use switch_poller::device::{AdminStatus, DeviceSession, OperStatus, PortType};
use switch_poller::snmp::mock::MockTransport;
use switch_poller::snmp::{oids, SetValue, SnmpValue};

fn text(s: &str) -> SnmpValue {
    SnmpValue::String(s.to_string())
}

fn set(values: &[u32]) -> BTreeSet<u32> {
    values.iter().copied().collect()
}

/// Two front-panel ports and one SVI on a Cisco CBS.
fn switch() -> MockTransport {
    let mock = MockTransport::new();
    mock.insert(oids::SYS_DESCR, text("Cisco CBS350-24P-4G"));
    mock.insert(oids::SYS_NAME, text("core-sw"));
    mock.insert(oids::SYS_UPTIME, SnmpValue::TimeTicks(8_640_000));
    mock.insert("1.3.6.1.2.1.47.1.1.1.1.13.67109120", text("CBS350-24P-4G"));
    mock.insert(oids::CBS_FIRMWARE, text("3.3.0.16"));

    for (idx, name, if_type) in [(1u32, "gi1/0/1", 6i64), (2, "gi1/0/2", 6), (100, "vlan10", 53)] {
        mock.insert(&format!("1.3.6.1.2.1.2.2.1.1.{}", idx), SnmpValue::Integer(idx as i64));
        mock.insert(&format!("1.3.6.1.2.1.2.2.1.2.{}", idx), text(&format!("{} descr", name)));
        mock.insert(&format!("1.3.6.1.2.1.2.2.1.3.{}", idx), SnmpValue::Integer(if_type));
        mock.insert(&format!("1.3.6.1.2.1.2.2.1.7.{}", idx), SnmpValue::Integer(1));
        mock.insert(&format!("1.3.6.1.2.1.2.2.1.8.{}", idx), SnmpValue::Integer(1));
        mock.insert(&format!("1.3.6.1.2.1.31.1.1.1.1.{}", idx), text(name));
    }
    mock.insert("1.3.6.1.2.1.31.1.1.1.15.1", SnmpValue::Gauge32(1_000));

    mock.insert("1.3.6.1.2.1.17.1.4.1.2.1", SnmpValue::Integer(1));
    mock.insert("1.3.6.1.2.1.17.1.4.1.2.2", SnmpValue::Integer(2));
    mock.insert("1.3.6.1.2.1.17.7.1.4.5.1.1.1", SnmpValue::Gauge32(10));
    mock.insert("1.3.6.1.2.1.17.7.1.4.5.1.1.2", SnmpValue::Gauge32(1));
    mock.insert("1.3.6.1.2.1.17.7.1.4.2.1.4.0.1", SnmpValue::OctetString(vec![0x40]));
    mock.insert("1.3.6.1.2.1.17.7.1.4.2.1.4.0.10", SnmpValue::OctetString(vec![0xC0]));
    mock.insert("1.3.6.1.2.1.17.7.1.4.2.1.4.0.20", SnmpValue::OctetString(vec![0x40]));
    mock.insert("1.3.6.1.2.1.17.7.1.4.2.1.5.0.1", SnmpValue::OctetString(vec![0x40]));
    mock.insert("1.3.6.1.2.1.17.7.1.4.2.1.5.0.10", SnmpValue::OctetString(vec![0x80]));

    let svi = Ipv4Addr::new(10, 0, 10, 1);
    mock.insert("1.3.6.1.2.1.4.20.1.1.10.0.10.1", SnmpValue::IpAddress(svi));
    mock.insert("1.3.6.1.2.1.4.20.1.2.10.0.10.1", SnmpValue::Integer(100));
    mock.insert(
        "1.3.6.1.2.1.4.20.1.3.10.0.10.1",
        SnmpValue::IpAddress(Ipv4Addr::new(255, 255, 255, 0)),
    );

    mock.insert("1.3.6.1.2.1.31.1.1.1.6.1", SnmpValue::Counter64(1_000));
    mock.insert("1.3.6.1.2.1.31.1.1.1.10.1", SnmpValue::Counter64(2_000));

    mock.insert("1.3.6.1.2.1.105.1.3.1.1.2.1", SnmpValue::Gauge32(195));
    mock.insert("1.3.6.1.2.1.105.1.3.1.1.3.1", SnmpValue::Integer(1));
    mock.insert("1.3.6.1.2.1.105.1.3.1.1.4.1", SnmpValue::Gauge32(15_500));

    mock.insert("1.3.6.1.2.1.25.3.3.1.2.196608", SnmpValue::Integer(20));
    mock.insert("1.3.6.1.2.1.25.3.3.1.2.196609", SnmpValue::Integer(40));
    mock
}

fn session(mock: &MockTransport) -> DeviceSession<MockTransport> {
    let mut config = DeviceConfig::v2c("192.0.2.1", "public");
    config.name = "core".to_string();
    DeviceSession::new(config, mock.clone())
}

#[tokio::test]
async fn test_initialize_builds_cache() {
    let mock = switch();
    let mut session = session(&mock);
    session.initialize().await;
    let cache = session.cache();

    assert_eq!(cache.sys_name.as_deref(), Some("core-sw"));
    assert_eq!(cache.uptime_display().as_deref(), Some("1 days, 00:00:00.00"));
    assert_eq!(cache.manufacturer.as_deref(), Some("Cisco"));
    assert_eq!(cache.model.as_deref(), Some("CBS350-24P-4G"));
    assert_eq!(cache.firmware.as_deref(), Some("3.3.0.16"));
    assert_eq!(cache.interfaces.len(), 3);

    let access = &cache.interfaces[&1];
    assert_eq!(access.port_type, PortType::Physical);
    assert_eq!(access.speed_bps, Some(1_000_000_000));
    let vlan = access.vlan.as_ref().expect("access port VLANs");
    assert_eq!(vlan.native, Some(10));
    assert_eq!(vlan.allowed, set(&[10]));
    assert!(vlan.tagged.is_empty());
    assert!(!vlan.trunk);

    let trunk = cache.interfaces[&2].vlan.as_ref().expect("trunk VLANs");
    assert_eq!(trunk.native, Some(1));
    assert_eq!(trunk.allowed, set(&[1, 10, 20]));
    assert_eq!(trunk.untagged, set(&[1]));
    assert_eq!(trunk.tagged, set(&[10, 20]));
    assert!(trunk.trunk);

    let svi = &cache.interfaces[&100];
    assert_eq!(svi.port_type, PortType::Virtual);
    assert!(svi.vlan.is_none());
    assert_eq!(svi.primary_ipv4().as_deref(), Some("10.0.10.1/24"));
    assert_eq!(cache.ip_index.get(&Ipv4Addr::new(10, 0, 10, 1)), Some(&100));
}

#[tokio::test]
async fn test_poll_fills_optional_features() {
    let mock = switch();
    let mut session = session(&mock);
    session.initialize().await;
    let cache = session.poll().await;

    let reading = &cache.bandwidth[&1];
    assert!(reading.high_capacity);
    assert_eq!(reading.rx_octets, Some(1_000));
    assert_eq!(reading.tx_octets, Some(2_000));
    assert_eq!(reading.rx_bps, None);

    let poe = cache.poe.as_ref().expect("PoE status");
    assert_eq!(poe.budget_total_w, Some(195.0));
    assert_eq!(poe.power_used_w, Some(15.5));
    assert_eq!(poe.power_available_w, Some(179.5));

    let env = cache.environment.as_ref().expect("environment status");
    assert_eq!(env.cpu_5s, Some(30.0));
}

#[tokio::test]
async fn test_poll_picks_up_status_changes() {
    let mock = switch();
    let mut session = session(&mock);
    session.initialize().await;

    mock.insert("1.3.6.1.2.1.2.2.1.8.2", SnmpValue::Integer(2));
    mock.insert("1.3.6.1.2.1.4.20.1.3.10.0.10.1", SnmpValue::IpAddress(Ipv4Addr::new(255, 255, 0, 0)));
    let cache = session.poll().await;

    assert_eq!(cache.interfaces[&2].oper, Some(OperStatus::Down));
    assert_eq!(cache.interfaces[&100].primary_ipv4().as_deref(), Some("10.0.10.1/16"));
}

#[tokio::test]
async fn test_disabled_features_stay_empty() {
    let mock = switch();
    let mut config = DeviceConfig::v2c("192.0.2.1", "public");
    config.bandwidth.enabled = false;
    config.poe.enabled = false;
    config.environment.enabled = false;
    let mut session = DeviceSession::new(config, mock);

    let cache = session.poll().await;
    assert!(cache.bandwidth.is_empty());
    assert!(cache.poe.is_none());
    assert!(cache.environment.is_none());
}

#[tokio::test]
async fn test_set_alias_and_admin_status() {
    let mock = switch();
    let mut session = session(&mock);
    session.initialize().await;

    assert!(session.set_alias(1, "uplink to core").await);
    assert!(session.set_admin_status(2, AdminStatus::Down).await);

    assert_eq!(session.cache().interfaces[&1].alias, "uplink to core");
    assert_eq!(session.cache().interfaces[&2].admin, Some(AdminStatus::Down));
    assert_eq!(
        mock.sets(),
        vec![
            (
                "1.3.6.1.2.1.31.1.1.1.18.1".to_string(),
                SetValue::OctetString(b"uplink to core".to_vec())
            ),
            ("1.3.6.1.2.1.2.2.1.7.2".to_string(), SetValue::Integer(2)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_gated_features_wait_for_interval() {
    let mock = switch();
    let mut session = session(&mock);
    session.initialize().await;
    session.poll().await;

    mock.insert("1.3.6.1.2.1.105.1.3.1.1.4.1", SnmpValue::Gauge32(30_000));
    mock.insert("1.3.6.1.2.1.31.1.1.1.6.1", SnmpValue::Counter64(5_000));
    let cache = session.poll().await;
    assert_eq!(cache.poe.as_ref().and_then(|p| p.power_used_w), Some(15.5));
    assert_eq!(cache.bandwidth[&1].rx_octets, Some(1_000));

    tokio::time::advance(Duration::from_secs(60)).await;
    let cache = session.poll().await;
    assert_eq!(cache.poe.as_ref().and_then(|p| p.power_used_w), Some(30.0));
    assert_eq!(cache.bandwidth[&1].rx_octets, Some(5_000));
}

#[tokio::test]
async fn test_unreachable_poe_keeps_previous_status() {
    let mock = switch();
    let mut config = DeviceConfig::v2c("192.0.2.1", "public");
    config.poe.poll_interval_secs = 0;
    let mut session = DeviceSession::new(config, mock.clone());
    session.initialize().await;
    session.poll().await;
    assert!(session.cache().poe.is_some());

    mock.fail_subtree("1.3.6.1.2.1.105");
    mock.fail_subtree("1.3.6.1.4.1.674");
    for column in [2, 3, 4] {
        mock.remove(&format!("1.3.6.1.2.1.105.1.3.1.1.{}.1", column));
    }
    let cache = session.poll().await;
    assert_eq!(cache.poe.as_ref().and_then(|p| p.budget_total_w), Some(195.0));
}

#[tokio::test]
async fn test_missed_system_gets_keep_identity() {
    let mock = switch();
    let mut session = session(&mock);
    session.initialize().await;

    mock.poison(oids::SYS_DESCR);
    mock.poison(oids::SYS_NAME);
    let cache = session.poll().await;

    assert_eq!(cache.sys_descr.as_deref(), Some("Cisco CBS350-24P-4G"));
    assert_eq!(cache.sys_name.as_deref(), Some("core-sw"));
    assert_eq!(cache.manufacturer.as_deref(), Some("Cisco"));
    assert_eq!(cache.model.as_deref(), Some("CBS350-24P-4G"));
    assert_eq!(cache.firmware.as_deref(), Some("3.3.0.16"));
}
