pub mod bandwidth;
pub mod cache;
pub mod classify;
pub mod environment;
pub mod gate;
pub mod interfaces;
pub mod ipv4;
pub mod poe;
mod session;
pub mod vendor;
pub mod vlan;

pub use cache::{
    AdminStatus, BandwidthReading, DeviceCache, EnvironmentStatus, InterfaceRecord, Ipv4Binding,
    OperStatus, PoeHealth, PoeStatus, PortType, VlanMembership,
};
pub use gate::IntervalGate;
pub use session::DeviceSession;

use crate::snmp::SnmpError;

/// Outcome of an optional sub-poller.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<T> {
    Supported(T),
    /// The agent answered but does not implement the tables.
    Unsupported,
    TransportError(SnmpError),
}

impl<T> Probe<T> {
    pub fn is_supported(&self) -> bool {
        matches!(self, Probe::Supported(_))
    }

    pub fn supported(self) -> Option<T> {
        match self {
            Probe::Supported(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_supported() {
        let probe = Probe::Supported(3);
        assert!(probe.is_supported());
        assert_eq!(probe.supported(), Some(3));

        let probe: Probe<u32> = Probe::TransportError(SnmpError::Timeout);
        assert!(!probe.is_supported());
        assert_eq!(probe.supported(), None);
    }
}
