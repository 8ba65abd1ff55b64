//! Numeric OIDs used by the engine. Nothing is resolved through MIB files.

// SNMPv2-MIB system group
pub const SYS_DESCR: &str = "1.3.6.1.2.1.1.1.0";
pub const SYS_UPTIME: &str = "1.3.6.1.2.1.1.3.0";
pub const SYS_NAME: &str = "1.3.6.1.2.1.1.5.0";

// IF-MIB ifTable
pub const IF_INDEX: &str = "1.3.6.1.2.1.2.2.1.1";
pub const IF_DESCR: &str = "1.3.6.1.2.1.2.2.1.2";
pub const IF_TYPE: &str = "1.3.6.1.2.1.2.2.1.3";
pub const IF_SPEED: &str = "1.3.6.1.2.1.2.2.1.5";
pub const IF_ADMIN_STATUS: &str = "1.3.6.1.2.1.2.2.1.7";
pub const IF_OPER_STATUS: &str = "1.3.6.1.2.1.2.2.1.8";
pub const IF_IN_OCTETS: &str = "1.3.6.1.2.1.2.2.1.10";
pub const IF_OUT_OCTETS: &str = "1.3.6.1.2.1.2.2.1.16";

// IF-MIB ifXTable
pub const IF_NAME: &str = "1.3.6.1.2.1.31.1.1.1.1";
pub const IF_HC_IN_OCTETS: &str = "1.3.6.1.2.1.31.1.1.1.6";
pub const IF_HC_OUT_OCTETS: &str = "1.3.6.1.2.1.31.1.1.1.10";
pub const IF_HIGH_SPEED: &str = "1.3.6.1.2.1.31.1.1.1.15";
pub const IF_ALIAS: &str = "1.3.6.1.2.1.31.1.1.1.18";

// BRIDGE-MIB / Q-BRIDGE-MIB
pub const DOT1D_BASE_PORT_IF_INDEX: &str = "1.3.6.1.2.1.17.1.4.1.2";
pub const DOT1Q_PVID: &str = "1.3.6.1.2.1.17.7.1.4.5.1.1";
pub const DOT1Q_VLAN_CURRENT_EGRESS: &str = "1.3.6.1.2.1.17.7.1.4.2.1.4";
pub const DOT1Q_VLAN_CURRENT_UNTAGGED: &str = "1.3.6.1.2.1.17.7.1.4.2.1.5";
pub const DOT1Q_VLAN_STATIC_EGRESS: &str = "1.3.6.1.2.1.17.7.1.4.3.1.2";
pub const DOT1Q_VLAN_STATIC_UNTAGGED: &str = "1.3.6.1.2.1.17.7.1.4.3.1.4";

// IP-MIB
pub const IP_AD_ENT_ADDR: &str = "1.3.6.1.2.1.4.20.1.1";
pub const IP_AD_ENT_IF_INDEX: &str = "1.3.6.1.2.1.4.20.1.2";
pub const IP_AD_ENT_NET_MASK: &str = "1.3.6.1.2.1.4.20.1.3";
pub const IP_ADDRESS_IF_INDEX: &str = "1.3.6.1.2.1.4.34.1.3";

// OSPF-MIB
pub const OSPF_IF_IP_ADDRESS: &str = "1.3.6.1.2.1.14.8.1.1";

// IP-FORWARD-MIB inetCidrRouteProto; walked only for the route index
pub const INET_CIDR_ROUTE_PROTO: &str = "1.3.6.1.2.1.4.24.7.1.9";

// ENTITY-MIB
pub const ENT_PHYSICAL_FIRMWARE_REV: &str = "1.3.6.1.2.1.47.1.1.1.1.10";
pub const ENT_PHYSICAL_MFG_NAME: &str = "1.3.6.1.2.1.47.1.1.1.1.12";
pub const ENT_PHYSICAL_MODEL_NAME: &str = "1.3.6.1.2.1.47.1.1.1.1.13";

// ENTITY-SENSOR-MIB entPhySensorTable
pub const ENT_PHY_SENSOR_TYPE: &str = "1.3.6.1.2.1.99.1.1.1.1";
pub const ENT_PHY_SENSOR_PRECISION: &str = "1.3.6.1.2.1.99.1.1.1.2";
pub const ENT_PHY_SENSOR_SCALE: &str = "1.3.6.1.2.1.99.1.1.1.3";
pub const ENT_PHY_SENSOR_VALUE: &str = "1.3.6.1.2.1.99.1.1.1.4";
pub const ENT_PHY_SENSOR_OPER_STATUS: &str = "1.3.6.1.2.1.99.1.1.1.5";

// HOST-RESOURCES-MIB
pub const HR_PROCESSOR_LOAD: &str = "1.3.6.1.2.1.25.3.3.1.2";
pub const HR_STORAGE_TYPE: &str = "1.3.6.1.2.1.25.2.3.1.2";
pub const HR_STORAGE_ALLOCATION_UNITS: &str = "1.3.6.1.2.1.25.2.3.1.4";
pub const HR_STORAGE_SIZE: &str = "1.3.6.1.2.1.25.2.3.1.5";
pub const HR_STORAGE_USED: &str = "1.3.6.1.2.1.25.2.3.1.6";
pub const HR_STORAGE_RAM: &str = "1.3.6.1.2.1.25.2.1.2";

// POWER-ETHERNET-MIB pethMainPseTable
pub const PETH_MAIN_PSE_POWER: &str = "1.3.6.1.2.1.105.1.3.1.1.2";
pub const PETH_MAIN_PSE_OPER_STATUS: &str = "1.3.6.1.2.1.105.1.3.1.1.3";
pub const PETH_MAIN_PSE_CONSUMPTION: &str = "1.3.6.1.2.1.105.1.3.1.1.4";

// Cisco CBS350 firmware on the stack entity
pub const CBS_FIRMWARE: &str = "1.3.6.1.2.1.47.1.1.1.1.10.67109120";

// MikroTik RouterOS
pub const MIKROTIK_SOFTWARE_VERSION: &str = "1.3.6.1.4.1.14988.1.1.4.4.0";
pub const MIKROTIK_MODEL: &str = "1.3.6.1.4.1.14988.1.1.7.8.0";

// Zyxel
pub const ZYXEL_MANUFACTURER: &str = "1.3.6.1.2.1.47.1.1.1.1.12.1";
pub const ZYXEL_FIRMWARE: &str = "1.3.6.1.4.1.890.1.15.3.1.6.0";

// Huawei hwEntityTemperature
pub const HUAWEI_ENTITY_TEMPERATURE: &str = "1.3.6.1.4.1.2011.5.25.31.1.1.1.1.11";

// Dell Networking OS6 (N-series) private MIB
pub const DELL_POE_PORT_POWER: &str = "1.3.6.1.4.1.674.10895.5000.2.6132.1.1.15.1.1.1.2.1";
pub const DELL_POWER_DRAW: &str = "1.3.6.1.4.1.674.10895.5000.2.6132.1.1.43.1.9.1.4.1";
pub const DELL_MEMORY_FREE: &str = "1.3.6.1.4.1.674.10895.5000.2.6132.1.1.1.1.4.1.0";
pub const DELL_MEMORY_TOTAL: &str = "1.3.6.1.4.1.674.10895.5000.2.6132.1.1.1.1.4.2.0";
pub const DELL_CPU_UTILIZATION: &str = "1.3.6.1.4.1.674.10895.5000.2.6132.1.1.1.1.4.9.0";
pub const DELL_FAN_SPEED: &str = "1.3.6.1.4.1.674.10895.5000.2.6132.1.1.43.1.6.1.4.1";
pub const DELL_FAN_STATUS: &str = "1.3.6.1.4.1.674.10895.5000.2.6132.1.1.43.1.6.1.3.1";
pub const DELL_PSU_STATUS: &str = "1.3.6.1.4.1.674.10895.5000.2.6132.1.1.43.1.7.1.2.1";
pub const DELL_TEMPERATURE: &str = "1.3.6.1.4.1.674.10895.5000.2.6132.1.1.43.1.8.1.5.1";
pub const DELL_UNIT_TEMPERATURE: &str = "1.3.6.1.4.1.674.10895.5000.2.6132.1.1.43.1.15.1.3.1";
pub const DELL_UNIT_TEMPERATURE_STATE: &str =
    "1.3.6.1.4.1.674.10895.5000.2.6132.1.1.43.1.15.1.2.1";
