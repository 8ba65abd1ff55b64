use crate::config::CustomOids;
use crate::snmp::{oids, SnmpClient, Transport};
use regex::Regex;
use std::sync::OnceLock;

/// Identity fields derived from sysDescr, vendor MIBs and custom OIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Manufacturer,
    Model,
    Firmware,
}

impl VendorInfo {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Manufacturer => &mut self.manufacturer,
            Field::Model => &mut self.model,
            Field::Firmware => &mut self.firmware,
        }
    }

    /// Replace a field with a non-blank value; blank values are ignored.
    pub fn apply(&mut self, field: Field, value: Option<String>) {
        if let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            *self.slot(field) = Some(value);
        }
    }
}

/// A vendor family: how to recognize it and what to read instead of the
/// generic parse.
pub struct VendorProfile {
    pub name: &'static str,
    /// Called with the lowercased sysDescr and model hint.
    detect: fn(&str, &str) -> bool,
    manufacturer: Option<&'static str>,
    parse: Option<fn(&str, &mut VendorInfo)>,
    overrides: &'static [(Field, &'static str)],
}

impl VendorProfile {
    pub fn matches(&self, descr: &str, model_hint: Option<&str>) -> bool {
        (self.detect)(
            &descr.to_lowercase(),
            &model_hint.unwrap_or_default().to_lowercase(),
        )
    }
}

/// Evaluated in order; every matching profile is applied.
pub static VENDOR_PROFILES: &[VendorProfile] = &[
    VendorProfile {
        name: "Cisco CBS",
        detect: |descr, hint| descr.contains("cbs") || hint.contains("cbs"),
        manufacturer: None,
        parse: None,
        overrides: &[(Field::Firmware, oids::CBS_FIRMWARE)],
    },
    VendorProfile {
        name: "MikroTik",
        detect: |descr, _| descr.contains("mikrotik") || descr.contains("routeros"),
        manufacturer: Some("MikroTik"),
        parse: None,
        overrides: &[
            (Field::Firmware, oids::MIKROTIK_SOFTWARE_VERSION),
            (Field::Model, oids::MIKROTIK_MODEL),
        ],
    },
    VendorProfile {
        name: "Zyxel",
        detect: |descr, _| descr.contains("zyxel"),
        manufacturer: None,
        parse: None,
        overrides: &[
            (Field::Manufacturer, oids::ZYXEL_MANUFACTURER),
            (Field::Firmware, oids::ZYXEL_FIRMWARE),
        ],
    },
    VendorProfile {
        name: "FreeBSD appliance",
        detect: |descr, _| descr.contains("freebsd"),
        manufacturer: None,
        parse: Some(parse_freebsd),
        overrides: &[],
    },
];

/// Generic sysDescr parse: the second comma segment is the firmware; the
/// head segment minus the model hint (or minus its last word) is the
/// manufacturer.
pub fn parse_sys_descr(descr: &str, model_hint: Option<&str>) -> VendorInfo {
    let mut info = VendorInfo {
        model: model_hint.map(str::to_string),
        ..Default::default()
    };
    let descr = descr.trim();
    if descr.is_empty() {
        return info;
    }

    let parts: Vec<&str> = descr.split(',').map(str::trim).collect();
    if let Some(firmware) = parts.get(1).filter(|p| !p.is_empty()) {
        info.firmware = Some(firmware.to_string());
    }

    let head = parts[0];
    match model_hint.filter(|hint| head.contains(*hint)) {
        Some(hint) => {
            let rest = head.replace(hint, "");
            let rest = rest.trim();
            if !rest.is_empty() {
                info.manufacturer = Some(rest.to_string());
            }
        }
        None => {
            let tokens: Vec<&str> = head.split_whitespace().collect();
            if tokens.len() > 1 {
                info.manufacturer = Some(tokens[..tokens.len() - 1].join(" "));
            }
        }
    }
    info
}

const ARCH_TOKENS: [&str; 7] = ["amd64", "i386", "arm64", "aarch64", "x86_64", "armv7", "mips"];

fn release_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^\d+(\.\d+)*-RELEASE(-p\d+)?$").ok())
        .as_ref()
}

/// pfSense / OPNsense style: `<product> <host> <version> FreeBSD <os-version> <arch>`.
fn parse_freebsd(descr: &str, info: &mut VendorInfo) {
    let mut tokens: Vec<&str> = descr.split_whitespace().collect();
    if tokens
        .last()
        .is_some_and(|t| ARCH_TOKENS.contains(&t.to_lowercase().as_str()))
    {
        tokens.pop();
    }

    if let Some(first) = tokens.first() {
        info.manufacturer = Some(first.to_string());
    }

    if let Some(pattern) = release_pattern() {
        if let Some(release) = tokens.iter().find(|t| pattern.is_match(t)) {
            info.firmware = Some(release.to_string());
        }
    }

    if let Some(pos) = tokens.iter().position(|t| t.eq_ignore_ascii_case("freebsd")) {
        info.model = Some(match tokens.get(pos + 1) {
            Some(version) => format!("FreeBSD {}", version),
            None => "FreeBSD".to_string(),
        });
    }
}

/// First non-empty entPhysicalModelName.
pub async fn model_hint<T: Transport>(client: &SnmpClient<T>) -> Option<String> {
    client
        .walk(oids::ENT_PHYSICAL_MODEL_NAME)
        .await
        .into_rows()
        .into_iter()
        .filter_map(|(_, value)| value.as_text())
        .map(|text| text.trim().to_string())
        .find(|text| !text.is_empty())
}

/// Manufacturer, model and firmware for a device: generic parse, then every
/// matching vendor profile, then the user's custom OIDs.
pub async fn identify<T: Transport>(
    client: &SnmpClient<T>,
    descr: &str,
    model_hint: Option<&str>,
    custom: &CustomOids,
) -> VendorInfo {
    let mut info = parse_sys_descr(descr, model_hint);

    for profile in VENDOR_PROFILES.iter().filter(|p| p.matches(descr, model_hint)) {
        tracing::debug!("Applying {} vendor profile", profile.name);
        if let Some(manufacturer) = profile.manufacturer {
            info.manufacturer = Some(manufacturer.to_string());
        }
        if let Some(parse) = profile.parse {
            parse(descr, &mut info);
        }
        apply_oids(client, &mut info, profile.overrides).await;
    }

    let custom_fields: Vec<(Field, &str)> = [
        (Field::Manufacturer, custom.manufacturer()),
        (Field::Model, custom.model()),
        (Field::Firmware, custom.firmware()),
    ]
    .into_iter()
    .filter_map(|(field, oid)| oid.map(|oid| (field, oid)))
    .collect();
    apply_oids(client, &mut info, &custom_fields).await;

    info
}

async fn apply_oids<T: Transport>(
    client: &SnmpClient<T>,
    info: &mut VendorInfo,
    fields: &[(Field, &str)],
) {
    if fields.is_empty() {
        return;
    }
    let request: Vec<String> = fields.iter().map(|(_, oid)| oid.to_string()).collect();
    let values = client.get_many(&request).await;
    for (field, oid) in fields {
        let value = values
            .get(*oid)
            .and_then(|v| v.as_ref())
            .and_then(|v| v.as_text());
        info.apply(*field, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snmp::mock::MockTransport;
    use crate::snmp::SnmpValue;

    #[test]
    fn test_generic_parse_with_model_hint() {
        let info = parse_sys_descr("Dell EMC Networking N1548P, 6.6.3.12, Linux 4.14.174", Some("N1548P"));
        assert_eq!(info.manufacturer.as_deref(), Some("Dell EMC Networking"));
        assert_eq!(info.model.as_deref(), Some("N1548P"));
        assert_eq!(info.firmware.as_deref(), Some("6.6.3.12"));
    }

    #[test]
    fn test_generic_parse_without_hint() {
        let info = parse_sys_descr("Netgear GS724T", None);
        assert_eq!(info.manufacturer.as_deref(), Some("Netgear"));
        assert_eq!(info.model, None);
        assert_eq!(info.firmware, None);

        let info = parse_sys_descr("Switch", None);
        assert_eq!(info, VendorInfo::default());
    }

    #[test]
    fn test_freebsd_appliance_parse() {
        let mut info = VendorInfo::default();
        parse_freebsd("pfSense fw.home.lan 2.7.2-RELEASE FreeBSD 14.0-CURRENT amd64", &mut info);
        assert_eq!(info.manufacturer.as_deref(), Some("pfSense"));
        assert_eq!(info.firmware.as_deref(), Some("2.7.2-RELEASE"));
        assert_eq!(info.model.as_deref(), Some("FreeBSD 14.0-CURRENT"));
    }

    #[test]
    fn test_profile_detection_is_case_insensitive() {
        let names: Vec<&str> = VENDOR_PROFILES
            .iter()
            .filter(|p| p.matches("RouterOS CRS326-24G-2S+", None))
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["MikroTik"]);
        assert!(VENDOR_PROFILES[0].matches("switch", Some("CBS350-24P-4G")));
    }

    #[tokio::test]
    async fn test_identify_mikrotik_overrides() {
        let mock = MockTransport::new();
        mock.insert(oids::MIKROTIK_SOFTWARE_VERSION, SnmpValue::String("7.20.6".into()));
        mock.insert(oids::MIKROTIK_MODEL, SnmpValue::String("CRS305-1G-4S+".into()));
        let client = SnmpClient::new(mock);

        let info = identify(&client, "RouterOS CRS305-1G-4S+", None, &CustomOids::default()).await;
        assert_eq!(info.manufacturer.as_deref(), Some("MikroTik"));
        assert_eq!(info.model.as_deref(), Some("CRS305-1G-4S+"));
        assert_eq!(info.firmware.as_deref(), Some("7.20.6"));
    }

    #[tokio::test]
    async fn test_identify_zyxel_keeps_parse_when_oid_blank() {
        let mock = MockTransport::new();
        mock.insert(oids::ZYXEL_MANUFACTURER, SnmpValue::String("  ".into()));
        mock.insert(oids::ZYXEL_FIRMWARE, SnmpValue::String("V4.80(ABBZ.2)".into()));
        let client = SnmpClient::new(mock);

        let info = identify(&client, "ZyXEL GS1920-24HP", Some("GS1920-24HP"), &CustomOids::default())
            .await;
        assert_eq!(info.manufacturer.as_deref(), Some("ZyXEL"));
        assert_eq!(info.firmware.as_deref(), Some("V4.80(ABBZ.2)"));
    }

    #[tokio::test]
    async fn test_custom_oids_win_last() {
        let mock = MockTransport::new();
        mock.insert(oids::CBS_FIRMWARE, SnmpValue::String("3.2.0.84".into()));
        mock.insert("1.3.6.1.4.1.9999.1.0", SnmpValue::String("4.0.0".into()));
        mock.insert("1.3.6.1.4.1.9999.2.0", SnmpValue::String("Acme".into()));
        let client = SnmpClient::new(mock);

        let custom = CustomOids {
            firmware: Some(".1.3.6.1.4.1.9999.1.0".into()),
            manufacturer: Some("1.3.6.1.4.1.9999.2.0".into()),
            model: Some("1.3.6.1.4.1.9999.3.0".into()),
            ..Default::default()
        };
        let info = identify(&client, "CBS350-24P-4G 24-Port Gigabit PoE", Some("CBS350-24P-4G"), &custom)
            .await;
        assert_eq!(info.firmware.as_deref(), Some("4.0.0"));
        assert_eq!(info.manufacturer.as_deref(), Some("Acme"));
        // Custom model OID unanswered, hint stays
        assert_eq!(info.model.as_deref(), Some("CBS350-24P-4G"));
    }
}
