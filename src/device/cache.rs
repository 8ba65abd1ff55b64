use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

/// Snapshot of one switch, owned by its session and handed out read-only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceCache {
    pub sys_descr: Option<String>,
    pub sys_name: Option<String>,
    /// sysUpTime in hundredths of a second.
    pub sys_uptime: Option<u64>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware: Option<String>,
    pub interfaces: BTreeMap<u32, InterfaceRecord>,
    pub ip_index: BTreeMap<Ipv4Addr, u32>,
    pub ip_mask: BTreeMap<Ipv4Addr, Ipv4Addr>,
    pub bandwidth: BTreeMap<u32, BandwidthReading>,
    pub poe: Option<PoeStatus>,
    pub environment: Option<EnvironmentStatus>,
}

impl DeviceCache {
    pub fn uptime_display(&self) -> Option<String> {
        self.sys_uptime.map(format_uptime)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminStatus {
    Up,
    Down,
    Testing,
}

impl AdminStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(AdminStatus::Up),
            2 => Some(AdminStatus::Down),
            3 => Some(AdminStatus::Testing),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            AdminStatus::Up => 1,
            AdminStatus::Down => 2,
            AdminStatus::Testing => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperStatus {
    Up,
    Down,
    Testing,
    Unknown,
    Dormant,
    NotPresent,
    LowerLayerDown,
}

impl OperStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(OperStatus::Up),
            2 => Some(OperStatus::Down),
            3 => Some(OperStatus::Testing),
            4 => Some(OperStatus::Unknown),
            5 => Some(OperStatus::Dormant),
            6 => Some(OperStatus::NotPresent),
            7 => Some(OperStatus::LowerLayerDown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    Physical,
    Virtual,
    #[default]
    Unknown,
}

/// VLAN view of one interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VlanMembership {
    /// PVID of the bridge port.
    pub native: Option<u32>,
    pub allowed: BTreeSet<u32>,
    pub untagged: BTreeSet<u32>,
    pub tagged: BTreeSet<u32>,
    pub trunk: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ipv4Binding {
    pub address: Ipv4Addr,
    pub mask: Option<Ipv4Addr>,
    pub prefix_len: Option<u8>,
}

impl Ipv4Binding {
    pub fn new(address: Ipv4Addr, mask: Option<Ipv4Addr>) -> Self {
        Self {
            address,
            mask,
            prefix_len: mask.and_then(mask_to_prefix),
        }
    }

    /// `a.b.c.d/len`, or the bare address when the mask is unknown.
    pub fn cidr(&self) -> String {
        match self.prefix_len {
            Some(len) => format!("{}/{}", self.address, len),
            None => self.address.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterfaceRecord {
    pub index: u32,
    pub name: String,
    pub description: String,
    pub alias: String,
    pub admin: Option<AdminStatus>,
    pub oper: Option<OperStatus>,
    pub speed_bps: Option<u64>,
    pub if_type: Option<u32>,
    pub port_type: PortType,
    pub is_bridge_port: bool,
    pub vlan: Option<VlanMembership>,
    pub ipv4: Vec<Ipv4Binding>,
    /// Chosen once and kept across refreshes.
    pub display_name: String,
}

impl InterfaceRecord {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Default label: name, else description, else `ifIndex N`.
    pub fn default_display_name(&self) -> String {
        if !self.name.trim().is_empty() {
            self.name.clone()
        } else if !self.description.trim().is_empty() {
            self.description.clone()
        } else {
            format!("ifIndex {}", self.index)
        }
    }

    /// The interface address when it carries exactly one.
    pub fn primary_ipv4(&self) -> Option<String> {
        match self.ipv4.as_slice() {
            [only] => Some(only.cidr()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandwidthReading {
    pub rx_octets: Option<u64>,
    pub tx_octets: Option<u64>,
    pub rx_bps: Option<f64>,
    pub tx_bps: Option<f64>,
    /// 64-bit ifHC counters were read.
    pub high_capacity: bool,
    pub sampled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoeHealth {
    pub code: i64,
    pub label: &'static str,
}

impl PoeHealth {
    pub fn from_code(code: i64) -> Self {
        let label = match code {
            1 => "HEALTHY",
            2 => "DISABLED",
            _ => "FAULTY",
        };
        Self { code, label }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoeStatus {
    pub budget_total_w: Option<f64>,
    pub power_used_w: Option<f64>,
    pub power_available_w: Option<f64>,
    pub health: Option<PoeHealth>,
    /// Per-port draw from the Dell N-series table, keyed by ifIndex.
    pub port_power_mw: BTreeMap<u32, f64>,
}

impl PoeStatus {
    pub fn is_empty(&self) -> bool {
        self.budget_total_w.is_none()
            && self.power_used_w.is_none()
            && self.health.is_none()
            && self.port_power_mw.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentStatus {
    pub power_mw: Option<BTreeMap<u32, f64>>,
    pub power_mw_total: Option<f64>,
    pub memory_free_kb: Option<u64>,
    pub memory_total_kb: Option<u64>,
    pub cpu_raw: Option<String>,
    pub cpu_5s: Option<f64>,
    pub cpu_60s: Option<f64>,
    pub cpu_300s: Option<f64>,
    pub fans_rpm: Option<BTreeMap<u32, i64>>,
    /// 2 = OK, 3 = failed, 1 = not present.
    pub fans_status: Option<BTreeMap<u32, i64>>,
    pub psu_status: Option<BTreeMap<u32, i64>>,
    pub temps_c: Option<BTreeMap<u32, i64>>,
    pub unit_temp_c: Option<i64>,
    pub unit_temp_state: Option<i64>,
}

impl EnvironmentStatus {
    pub fn is_empty(&self) -> bool {
        *self == EnvironmentStatus::default()
    }
}

/// Number of leading one bits in a contiguous netmask.
pub fn mask_to_prefix(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    let len = bits.leading_ones();
    // Reject non-contiguous masks such as 255.0.255.0
    (bits.checked_shl(len).unwrap_or(0) == 0).then_some(len as u8)
}

pub fn prefix_to_mask(len: u8) -> Option<Ipv4Addr> {
    match len {
        0 => Some(Ipv4Addr::new(0, 0, 0, 0)),
        1..=32 => Some(Ipv4Addr::from(u32::MAX << (32 - u32::from(len)))),
        _ => None,
    }
}

/// sysUpTime centiseconds as `D days, HH:MM:SS.cc`.
pub fn format_uptime(centis: u64) -> String {
    let cc = centis % 100;
    let total_secs = centis / 100;
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!(
        "{} days, {:02}:{:02}:{:02}.{:02}",
        days, hours, minutes, seconds, cc
    )
}
