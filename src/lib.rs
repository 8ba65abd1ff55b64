//! SNMP acquisition, caching and derivation for network switches.
//!
//! A [`device::DeviceSession`] owns one switch: it walks the interface,
//! VLAN and IPv4 tables on `initialize()` and keeps a [`device::DeviceCache`]
//! current on every `poll()`.

pub mod config;
pub mod device;
pub mod secret;
pub mod snmp;

pub use config::{AgentConfig, DeviceConfig};
pub use device::{DeviceCache, DeviceSession};
