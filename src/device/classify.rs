use super::cache::PortType;

/// ifTypes that are never front-panel ports: softwareLoopback, propVirtual,
/// tunnel, l2vlan, ieee8023adLag.
const VIRTUAL_IF_TYPES: [u32; 5] = [24, 53, 131, 135, 161];

const ETHERNET_CSMACD: u32 = 6;

const VIRTUAL_NAME_TOKENS: [&str; 12] = [
    "vlan",
    "loopback",
    "mgmt",
    "management",
    "irb",
    "bdi",
    "svi",
    "bridge",
    "port-channel",
    "portchannel",
    "lag",
    "bond",
];

const ETHERNET_NAME_TOKENS: [&str; 12] = [
    "gigabit",
    "gige",
    "gi",
    "fastethernet",
    "fa",
    "ethernet",
    "eth",
    "tengig",
    "ten",
    "te",
    "ge",
    "xe",
];

/// Classify an interface as a physical port, a virtual interface, or neither.
/// First matching rule wins.
pub fn classify_port(if_type: Option<u32>, name: &str, is_bridge_port: bool) -> PortType {
    let name = name.trim().to_lowercase();

    if if_type.is_some_and(|t| VIRTUAL_IF_TYPES.contains(&t)) {
        return PortType::Virtual;
    }

    if VIRTUAL_NAME_TOKENS.iter().any(|tok| name.contains(tok))
        || name.starts_with("br")
        || name.starts_with("lo")
    {
        return PortType::Virtual;
    }

    if is_bridge_port {
        return PortType::Physical;
    }

    if if_type == Some(ETHERNET_CSMACD)
        && (name.starts_with("port") || ETHERNET_NAME_TOKENS.iter().any(|tok| name.contains(tok)))
    {
        return PortType::Physical;
    }

    PortType::Unknown
}
