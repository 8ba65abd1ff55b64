use super::bandwidth::BandwidthEngine;
use super::cache::{AdminStatus, DeviceCache};
use super::environment::poll_environment;
use super::gate::IntervalGate;
use super::interfaces::{refresh_status, walk_interfaces};
use super::ipv4::Ipv4Tables;
use super::poe::poll_poe;
use super::vendor::{self, VendorInfo};
use super::Probe;
use crate::config::DeviceConfig;
use crate::snmp::{oids, SetValue, Snmp2Transport, SnmpClient, SnmpResult, Transport};
use chrono::Utc;
use tokio::time::Instant;

/// State and cache for one switch.
///
/// `initialize()` runs the full discovery walk; each `poll()` refreshes the
/// dynamic fields and runs whichever throttled sub-polls are due.
pub struct DeviceSession<T> {
    config: DeviceConfig,
    client: SnmpClient<T>,
    cache: DeviceCache,
    initialized: bool,
    model_hint: Option<String>,
    bandwidth: BandwidthEngine,
    bandwidth_gate: IntervalGate,
    poe_gate: IntervalGate,
    environment_gate: IntervalGate,
    uptime_gate: IntervalGate,
}

impl DeviceSession<Snmp2Transport> {
    /// Open the UDP session. Transport setup failures are the only fatal error.
    pub async fn connect(config: DeviceConfig) -> SnmpResult<Self> {
        let transport = Snmp2Transport::connect(&config).await?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> DeviceSession<T> {
    pub fn new(config: DeviceConfig, transport: T) -> Self {
        Self {
            bandwidth_gate: IntervalGate::from_secs(config.bandwidth.poll_interval_secs),
            poe_gate: IntervalGate::from_secs(config.poe.poll_interval_secs),
            environment_gate: IntervalGate::from_secs(config.environment.poll_interval_secs),
            uptime_gate: IntervalGate::from_secs(config.uptime_poll_interval_secs),
            config,
            client: SnmpClient::new(transport),
            cache: DeviceCache::default(),
            initialized: false,
            model_hint: None,
            bandwidth: BandwidthEngine::new(),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn cache(&self) -> &DeviceCache {
        &self.cache
    }

    pub fn client(&self) -> &SnmpClient<T> {
        &self.client
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn hostname_oid(&self) -> &str {
        self.config.custom_oids.hostname().unwrap_or(oids::SYS_NAME)
    }

    fn uptime_oid(&self) -> &str {
        self.config.custom_oids.uptime().unwrap_or(oids::SYS_UPTIME)
    }

    /// Full discovery: interface table, VLANs, IPv4, system group and vendor
    /// identification.
    pub async fn initialize(&mut self) {
        let device = self.config.label().to_string();
        tracing::info!("Initializing {}", device);

        self.cache.interfaces = walk_interfaces(&self.client, &self.cache.interfaces).await;
        self.refresh_ipv4().await;

        self.refresh_system().await;
        self.refresh_uptime(true).await;

        self.model_hint = vendor::model_hint(&self.client).await;
        self.refresh_vendor().await;

        self.initialized = true;
        tracing::info!(
            "Initialized {}: {} interfaces, {} IPv4 addresses, manufacturer={:?} model={:?} firmware={:?}",
            device,
            self.cache.interfaces.len(),
            self.cache.ip_index.len(),
            self.cache.manufacturer,
            self.cache.model,
            self.cache.firmware
        );
    }

    /// Refresh dynamic state and run the due sub-polls. Unsupported features
    /// leave their part of the cache empty; nothing here fails the poll.
    pub async fn poll(&mut self) -> &DeviceCache {
        if !self.initialized {
            tracing::warn!(
                "poll() on {} before initialize(), running discovery first",
                self.config.label()
            );
            self.initialize().await;
        }

        refresh_status(&self.client, &mut self.cache.interfaces).await;
        self.refresh_ipv4().await;
        self.refresh_system().await;
        self.refresh_uptime(false).await;
        if self.has_sys_descr() {
            self.refresh_vendor().await;
        }

        let now = Instant::now();
        self.poll_bandwidth(now).await;
        self.poll_poe(now).await;
        self.poll_environment(now).await;

        &self.cache
    }

    async fn refresh_ipv4(&mut self) {
        let tables = Ipv4Tables::collect(&self.client).await;
        tables.attach(&mut self.cache.interfaces);
        self.cache.ip_index = tables.ip_index;
        self.cache.ip_mask = tables.ip_mask;
    }

    async fn refresh_system(&mut self) {
        let (descr, name) = tokio::join!(
            self.client.get_one(oids::SYS_DESCR),
            self.client.get_one(self.hostname_oid())
        );
        // A missed GET keeps the previous value
        if let Some(descr) = descr.and_then(|v| v.as_text()) {
            self.cache.sys_descr = Some(descr.trim().to_string());
        }
        if let Some(name) = name.and_then(|v| v.as_text()) {
            self.cache.sys_name = Some(name.trim().to_string());
        }
    }

    async fn refresh_uptime(&mut self, force: bool) {
        let now = Instant::now();
        if force {
            self.uptime_gate.reset();
        }
        if !self.uptime_gate.try_open(now) {
            return;
        }
        let oid = self.uptime_oid().to_string();
        if let Some(uptime) = self.client.get_one(&oid).await.and_then(|v| v.as_u64()) {
            self.cache.sys_uptime = Some(uptime);
        }
    }

    fn has_sys_descr(&self) -> bool {
        self.cache
            .sys_descr
            .as_deref()
            .is_some_and(|d| !d.is_empty())
    }

    async fn refresh_vendor(&mut self) {
        let descr = self.cache.sys_descr.clone().unwrap_or_default();
        let VendorInfo {
            manufacturer,
            model,
            firmware,
        } = vendor::identify(
            &self.client,
            &descr,
            self.model_hint.as_deref(),
            &self.config.custom_oids,
        )
        .await;
        self.cache.manufacturer = manufacturer;
        self.cache.model = model;
        self.cache.firmware = firmware;
    }

    async fn poll_bandwidth(&mut self, now: Instant) {
        if !self.config.bandwidth.enabled {
            self.cache.bandwidth.clear();
            return;
        }
        if !self.bandwidth_gate.try_open(now) {
            tracing::debug!("Skipping bandwidth poll for {}", self.config.label());
            return;
        }
        self.cache.bandwidth = self
            .bandwidth
            .poll(
                &self.client,
                &self.cache.interfaces,
                &self.config.bandwidth,
                Utc::now(),
            )
            .await;
    }

    async fn poll_poe(&mut self, now: Instant) {
        if !self.config.poe.enabled {
            self.cache.poe = None;
            return;
        }
        if !self.poe_gate.try_open(now) {
            return;
        }
        match poll_poe(&self.client).await {
            Probe::Supported(status) => self.cache.poe = Some(status),
            Probe::Unsupported => {
                tracing::debug!("{} does not report PoE", self.config.label());
                self.cache.poe = None;
            }
            Probe::TransportError(e) => {
                tracing::warn!("PoE poll failed for {}: {}", self.config.label(), e);
            }
        }
    }

    async fn poll_environment(&mut self, now: Instant) {
        if !self.config.environment.enabled {
            self.cache.environment = None;
            return;
        }
        if !self.environment_gate.try_open(now) {
            return;
        }
        match poll_environment(&self.client).await {
            Probe::Supported(status) => self.cache.environment = Some(status),
            Probe::Unsupported => {
                tracing::debug!("{} does not report environment data", self.config.label());
                self.cache.environment = None;
            }
            Probe::TransportError(e) => {
                tracing::warn!("Environment poll failed for {}: {}", self.config.label(), e);
            }
        }
    }

    /// Write ifAlias. The cache is updated only when the agent accepts it.
    pub async fn set_alias(&mut self, if_index: u32, alias: &str) -> bool {
        let oid = format!("{}.{}", oids::IF_ALIAS, if_index);
        let ok = self
            .client
            .set(&oid, SetValue::OctetString(alias.as_bytes().to_vec()))
            .await;
        if ok {
            if let Some(record) = self.cache.interfaces.get_mut(&if_index) {
                record.alias = alias.to_string();
            }
        } else {
            tracing::warn!(
                "Failed to set alias on {} ifIndex {}",
                self.config.label(),
                if_index
            );
        }
        ok
    }

    /// Write ifAdminStatus. The cache is updated only when the agent accepts it.
    pub async fn set_admin_status(&mut self, if_index: u32, status: AdminStatus) -> bool {
        let oid = format!("{}.{}", oids::IF_ADMIN_STATUS, if_index);
        let ok = self.client.set(&oid, SetValue::Integer(status.code())).await;
        if ok {
            if let Some(record) = self.cache.interfaces.get_mut(&if_index) {
                record.admin = Some(status);
            }
        } else {
            tracing::warn!(
                "Failed to set admin status on {} ifIndex {}",
                self.config.label(),
                if_index
            );
        }
        ok
    }

    /// Whether the agent answers a sysName (or custom hostname) GET.
    pub async fn test_connection(&self) -> bool {
        self.client.get_one(self.hostname_oid()).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snmp::mock::MockTransport;
    use crate::snmp::SnmpValue;
    use std::time::Duration;

    fn session(mock: &MockTransport) -> DeviceSession<MockTransport> {
        let mut config = DeviceConfig::v2c("192.0.2.10", "public");
        config.poe.enabled = false;
        config.environment.enabled = false;
        DeviceSession::new(config, mock.clone())
    }

    fn seed(mock: &MockTransport) {
        mock.insert(oids::SYS_DESCR, SnmpValue::String("Acme Switch X1".into()));
        mock.insert(oids::SYS_NAME, SnmpValue::String("edge-1".into()));
        mock.insert(oids::SYS_UPTIME, SnmpValue::TimeTicks(123_456));
        mock.insert("1.3.6.1.2.1.2.2.1.1.1", SnmpValue::Integer(1));
        mock.insert("1.3.6.1.2.1.31.1.1.1.1.1", SnmpValue::String("ge1".into()));
        mock.insert("1.3.6.1.2.1.2.2.1.7.1", SnmpValue::Integer(1));
        mock.insert("1.3.6.1.2.1.2.2.1.8.1", SnmpValue::Integer(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_uptime_is_throttled() {
        let mock = MockTransport::new();
        seed(&mock);
        let mut session = session(&mock);
        session.initialize().await;
        assert_eq!(session.cache().sys_uptime, Some(123_456));

        mock.insert(oids::SYS_UPTIME, SnmpValue::TimeTicks(200_000));
        session.poll().await;
        assert_eq!(session.cache().sys_uptime, Some(123_456));

        tokio::time::advance(Duration::from_secs(300)).await;
        session.poll().await;
        assert_eq!(session.cache().sys_uptime, Some(200_000));
    }

    #[tokio::test]
    async fn test_poll_before_initialize_runs_discovery() {
        let mock = MockTransport::new();
        seed(&mock);
        let mut session = session(&mock);

        let cache = session.poll().await;
        assert_eq!(cache.sys_name.as_deref(), Some("edge-1"));
        assert_eq!(cache.interfaces.len(), 1);
        assert!(session.is_initialized());
    }

    #[tokio::test]
    async fn test_set_failure_leaves_cache() {
        let mock = MockTransport::new();
        seed(&mock);
        let mut session = session(&mock);
        session.initialize().await;

        mock.reject_sets(true);
        assert!(!session.set_alias(1, "printer").await);
        assert!(!session.set_admin_status(1, AdminStatus::Down).await);
        let record = &session.cache().interfaces[&1];
        assert_eq!(record.alias, "");
        assert_eq!(record.admin, Some(AdminStatus::Up));
    }

    #[tokio::test]
    async fn test_custom_hostname_oid() {
        let mock = MockTransport::new();
        seed(&mock);
        mock.insert("1.3.6.1.4.1.9.2.1.3.0", SnmpValue::String("edge-1.example".into()));
        let mut config = DeviceConfig::v2c("192.0.2.10", "public");
        config.custom_oids.hostname = Some(".1.3.6.1.4.1.9.2.1.3.0".into());
        let mut session = DeviceSession::new(config, mock);

        assert!(session.test_connection().await);
        session.initialize().await;
        assert_eq!(session.cache().sys_name.as_deref(), Some("edge-1.example"));
    }
}
