use crate::secret::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config for device '{device}': {reason}")]
    Invalid { device: String, reason: String },
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = serde_json::from_str(raw)?;
        for device in &config.devices {
            device.validate()?;
        }
        Ok(config)
    }
}

/// One switch to poll.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub credentials: Credentials,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default)]
    pub custom_oids: CustomOids,
    #[serde(default)]
    pub bandwidth: BandwidthOptions,
    #[serde(default)]
    pub poe: FeatureOptions,
    #[serde(default)]
    pub environment: FeatureOptions,
    #[serde(default = "default_uptime_interval")]
    pub uptime_poll_interval_secs: u64,
}

impl DeviceConfig {
    /// SNMPv2c device with every option at its default.
    pub fn v2c(host: impl Into<String>, community: &str) -> Self {
        Self {
            name: String::new(),
            host: host.into(),
            port: default_port(),
            credentials: Credentials::V2c {
                community: SecretString::from(community),
            },
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            custom_oids: CustomOids::default(),
            bandwidth: BandwidthOptions::default(),
            poe: FeatureOptions::default(),
            environment: FeatureOptions::default(),
            uptime_poll_interval_secs: default_uptime_interval(),
        }
    }

    /// Name used in logs: the configured name, else the host.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.host
        } else {
            &self.name
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            device: self.label().to_string(),
            reason: reason.to_string(),
        };

        if self.host.trim().is_empty() {
            return Err(invalid("host must not be empty"));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("timeout_ms must be greater than zero"));
        }

        match &self.credentials {
            Credentials::V2c { community } => {
                if community.is_empty() {
                    return Err(invalid("community must not be empty"));
                }
            }
            Credentials::V3(v3) => {
                if v3.username.trim().is_empty() {
                    return Err(invalid("SNMPv3 username must not be empty"));
                }
                let has = |p: &Option<SecretString>| p.as_ref().is_some_and(|s| !s.is_empty());
                if v3.auth_protocol != AuthProtocol::None && !has(&v3.auth_passphrase) {
                    return Err(invalid("auth_passphrase is required when auth_protocol is set"));
                }
                if v3.priv_protocol != PrivProtocol::None {
                    if v3.auth_protocol == AuthProtocol::None {
                        return Err(invalid("priv_protocol requires an auth_protocol"));
                    }
                    if !has(&v3.priv_passphrase) {
                        return Err(invalid(
                            "priv_passphrase is required when priv_protocol is set",
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "version", rename_all = "lowercase")]
pub enum Credentials {
    V2c { community: SecretString },
    V3(V3Credentials),
}

#[derive(Debug, Clone, Deserialize)]
pub struct V3Credentials {
    pub username: String,
    #[serde(default)]
    pub auth_protocol: AuthProtocol,
    #[serde(default)]
    pub auth_passphrase: Option<SecretString>,
    #[serde(default)]
    pub priv_protocol: PrivProtocol,
    #[serde(default)]
    pub priv_passphrase: Option<SecretString>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProtocol {
    #[serde(alias = "SHA")]
    Sha,
    #[serde(alias = "MD5")]
    Md5,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivProtocol {
    #[serde(alias = "AES")]
    Aes,
    #[serde(alias = "DES")]
    Des,
    #[default]
    None,
}

/// User-supplied OIDs that replace the built-in sources.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomOids {
    pub hostname: Option<String>,
    pub uptime: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware: Option<String>,
}

impl CustomOids {
    pub fn hostname(&self) -> Option<&str> {
        clean_oid(&self.hostname)
    }

    pub fn uptime(&self) -> Option<&str> {
        clean_oid(&self.uptime)
    }

    pub fn manufacturer(&self) -> Option<&str> {
        clean_oid(&self.manufacturer)
    }

    pub fn model(&self) -> Option<&str> {
        clean_oid(&self.model)
    }

    pub fn firmware(&self) -> Option<&str> {
        clean_oid(&self.firmware)
    }
}

fn clean_oid(value: &Option<String>) -> Option<&str> {
    let oid = value.as_deref()?.trim();
    let oid = oid.strip_prefix('.').unwrap_or(oid);
    (!oid.is_empty()).then_some(oid)
}

#[derive(Debug, Clone, Deserialize)]
pub struct BandwidthOptions {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bandwidth_interval")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub include: NameRules,
    #[serde(default)]
    pub exclude: NameRules,
}

impl Default for BandwidthOptions {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            poll_interval_secs: default_bandwidth_interval(),
            include: NameRules::default(),
            exclude: NameRules::default(),
        }
    }
}

impl BandwidthOptions {
    /// Whether an interface with this name is sampled. Exclude rules always
    /// win; when include rules exist a name must match one of them.
    pub fn selects(&self, name: &str) -> bool {
        if self.exclude.matches(name) {
            return false;
        }
        self.include.is_empty() || self.include.matches(name)
    }
}

/// Case-insensitive interface name rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameRules {
    #[serde(default)]
    pub starts_with: Vec<String>,
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub ends_with: Vec<String>,
}

impl NameRules {
    pub fn is_empty(&self) -> bool {
        self.starts_with.is_empty() && self.contains.is_empty() && self.ends_with.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        let any = |rules: &[String], test: &dyn Fn(&str) -> bool| {
            rules
                .iter()
                .map(|r| r.trim().to_lowercase())
                .filter(|r| !r.is_empty())
                .any(|r| test(&r))
        };
        any(&self.starts_with, &|r| name.starts_with(r))
            || any(&self.contains, &|r| name.contains(r))
            || any(&self.ends_with, &|r| name.ends_with(r))
    }
}

/// Enable flag and interval for PoE and environmental polling.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureOptions {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_feature_interval")]
    pub poll_interval_secs: u64,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            poll_interval_secs: default_feature_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    30
}

fn default_port() -> u16 {
    161
}

fn default_timeout_ms() -> u64 {
    1500
}

fn default_retries() -> u32 {
    1
}

fn default_uptime_interval() -> u64 {
    300
}

fn default_enabled() -> bool {
    true
}

fn default_bandwidth_interval() -> u64 {
    30
}

fn default_feature_interval() -> u64 {
    60
}
