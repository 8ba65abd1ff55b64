use super::cache::EnvironmentStatus;
use super::Probe;
use crate::snmp::{last_arc, normalize_oid, oids, SnmpClient, SnmpValue, Transport};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

const SENSOR_CELSIUS: i64 = 8;
const SENSOR_RPM: i64 = 10;
const SENSOR_WATTS: i64 = 6;

/// Power of ten for an entPhySensorScale code: yocto(1) .. yotta(17) in steps
/// of three, units(9) being 10^0.
pub fn sensor_scale_exponent(scale: i64) -> i32 {
    match scale {
        1..=17 => (scale as i32 - 9) * 3,
        _ => 0,
    }
}

/// `raw × 10^(scale_exponent − precision)`, missing or zero scale meaning units.
pub fn sensor_value(raw: f64, scale: Option<i64>, precision: Option<i64>) -> f64 {
    let scale = scale.filter(|&s| s != 0).unwrap_or(9);
    let precision = precision.unwrap_or(0) as i32;
    raw * 10f64.powi(sensor_scale_exponent(scale) - precision)
}

/// entPhySensorOperStatus ok(1)/unavailable(2)/nonoperational(3) onto the fan
/// status codes 2 OK, 1 not present, 3 failed.
pub fn fan_status_from_sensor(oper: Option<i64>) -> i64 {
    match oper.unwrap_or(2) {
        1 => 2,
        2 => 1,
        _ => 3,
    }
}

fn cpu_percent_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*%").ok())
        .as_ref()
}

/// 5 s / 60 s / 300 s utilization from a Dell OS6 CPU string such as
/// `"    5 Secs ( 10.5746%)   60 Secs ( 11.9951%)  300 Secs ( 12.3370%)"`.
pub fn parse_cpu_utilization(text: &str) -> Option<(f64, f64, f64)> {
    let values: Vec<f64> = cpu_percent_pattern()?
        .captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse().ok())
        .take(3)
        .collect();
    match values.as_slice() {
        [five, sixty, three_hundred] => Some((*five, *sixty, *three_hundred)),
        _ => None,
    }
}

async fn indexed<T: Transport>(client: &SnmpClient<T>, base: &str) -> BTreeMap<u32, SnmpValue> {
    client
        .walk(base)
        .await
        .into_rows()
        .into_iter()
        .filter_map(|(oid, value)| last_arc(&oid).map(|idx| (idx, value)))
        .collect()
}

async fn int_column<T: Transport>(client: &SnmpClient<T>, base: &str) -> BTreeMap<u32, i64> {
    indexed(client, base)
        .await
        .into_iter()
        .filter_map(|(idx, value)| value.as_f64().map(|v| (idx, v as i64)))
        .collect()
}

fn non_empty<K, V>(map: BTreeMap<K, V>) -> Option<BTreeMap<K, V>> {
    (!map.is_empty()).then_some(map)
}

/// Poll environmental telemetry. Vendor tables are read first; the standard
/// MIBs only fill what is still missing.
pub async fn poll_environment<T: Transport>(client: &SnmpClient<T>) -> Probe<EnvironmentStatus> {
    let mut env = EnvironmentStatus::default();

    let power_walk = client.walk(oids::DELL_POWER_DRAW).await;
    let transport_error = power_walk.error().cloned();
    let power: BTreeMap<u32, f64> = power_walk
        .into_rows()
        .into_iter()
        .filter_map(|(oid, v)| Some((last_arc(&oid)?, v.as_f64()?)))
        .collect();
    if !power.is_empty() {
        env.power_mw_total = Some(power.values().sum());
        env.power_mw = Some(power);
    }

    poll_dell_scalars(client, &mut env).await;

    env.fans_rpm = non_empty(int_column(client, oids::DELL_FAN_SPEED).await);
    env.fans_status = non_empty(int_column(client, oids::DELL_FAN_STATUS).await);
    env.psu_status = non_empty(int_column(client, oids::DELL_PSU_STATUS).await);
    env.temps_c = non_empty(int_column(client, oids::DELL_TEMPERATURE).await);

    if env.temps_c.is_none() || env.fans_rpm.is_none() || env.power_mw_total.is_none() {
        apply_entity_sensors(client, &mut env).await;
    }

    if env.temps_c.is_none() {
        let temps: BTreeMap<u32, i64> = indexed(client, oids::HUAWEI_ENTITY_TEMPERATURE)
            .await
            .into_iter()
            .filter_map(|(idx, v)| v.as_f64().map(|t| (idx, t)))
            .filter(|(_, t)| (-50.0..=200.0).contains(t))
            .map(|(idx, t)| (idx, t.round() as i64))
            .collect();
        env.temps_c = non_empty(temps);
    }

    if env.cpu_5s.is_none() && env.cpu_60s.is_none() && env.cpu_300s.is_none() {
        apply_host_cpu(client, &mut env).await;
    }

    if env.memory_total_kb.is_none() || env.memory_free_kb.is_none() {
        apply_host_memory(client, &mut env).await;
    }

    if !env.is_empty() {
        return Probe::Supported(env);
    }
    match transport_error {
        Some(e) => Probe::TransportError(e),
        None => Probe::Unsupported,
    }
}

async fn poll_dell_scalars<T: Transport>(client: &SnmpClient<T>, env: &mut EnvironmentStatus) {
    let request = [
        oids::DELL_MEMORY_FREE,
        oids::DELL_MEMORY_TOTAL,
        oids::DELL_CPU_UTILIZATION,
        oids::DELL_UNIT_TEMPERATURE,
        oids::DELL_UNIT_TEMPERATURE_STATE,
    ]
    .map(String::from);
    let values = client.get_many(&request).await;
    let get = |oid: &str| values.get(oid).and_then(|v| v.as_ref());

    env.memory_free_kb = get(oids::DELL_MEMORY_FREE).and_then(|v| v.as_u64());
    env.memory_total_kb = get(oids::DELL_MEMORY_TOTAL).and_then(|v| v.as_u64());
    env.unit_temp_c = get(oids::DELL_UNIT_TEMPERATURE).and_then(|v| v.as_i64());
    env.unit_temp_state = get(oids::DELL_UNIT_TEMPERATURE_STATE).and_then(|v| v.as_i64());

    if let Some(raw) = get(oids::DELL_CPU_UTILIZATION).and_then(|v| v.as_text()) {
        if let Some((five, sixty, three_hundred)) = parse_cpu_utilization(&raw) {
            env.cpu_5s = Some(five);
            env.cpu_60s = Some(sixty);
            env.cpu_300s = Some(three_hundred);
        }
        env.cpu_raw = Some(raw);
    }
}

/// ENTITY-SENSOR-MIB temperatures, fan speeds and power, never replacing
/// readings already taken from vendor tables.
async fn apply_entity_sensors<T: Transport>(client: &SnmpClient<T>, env: &mut EnvironmentStatus) {
    let types = int_column(client, oids::ENT_PHY_SENSOR_TYPE).await;
    if types.is_empty() {
        return;
    }
    let values = indexed(client, oids::ENT_PHY_SENSOR_VALUE).await;
    let scales = int_column(client, oids::ENT_PHY_SENSOR_SCALE).await;
    let precisions = int_column(client, oids::ENT_PHY_SENSOR_PRECISION).await;
    let opers = int_column(client, oids::ENT_PHY_SENSOR_OPER_STATUS).await;

    let mut temps = env.temps_c.take().unwrap_or_default();
    let mut fans = env.fans_rpm.take().unwrap_or_default();
    let mut fan_status = env.fans_status.take().unwrap_or_default();
    let mut watts_mw = None::<f64>;

    for (idx, sensor_type) in types {
        let Some(raw) = values.get(&idx).and_then(|v| v.as_f64()) else {
            continue;
        };
        let value = sensor_value(raw, scales.get(&idx).copied(), precisions.get(&idx).copied());

        match sensor_type {
            SENSOR_CELSIUS if (-50.0..=150.0).contains(&value) => {
                temps.entry(idx).or_insert(value.round() as i64);
            }
            SENSOR_RPM if (0.0..=50_000.0).contains(&value) => {
                fans.entry(idx).or_insert(value.round() as i64);
                fan_status
                    .entry(idx)
                    .or_insert(fan_status_from_sensor(opers.get(&idx).copied()));
            }
            SENSOR_WATTS if (0.0..=100_000.0).contains(&value) => {
                *watts_mw.get_or_insert(0.0) += value * 1000.0;
            }
            _ => {}
        }
    }

    env.temps_c = non_empty(temps);
    env.fans_rpm = non_empty(fans);
    env.fans_status = non_empty(fan_status);
    if env.power_mw_total.is_none() {
        env.power_mw_total = watts_mw;
    }
}

async fn apply_host_cpu<T: Transport>(client: &SnmpClient<T>, env: &mut EnvironmentStatus) {
    let loads: Vec<f64> = indexed(client, oids::HR_PROCESSOR_LOAD)
        .await
        .into_values()
        .filter_map(|v| v.as_f64())
        .filter(|v| (0.0..=100.0).contains(v))
        .collect();
    if loads.is_empty() {
        return;
    }
    let average = loads.iter().sum::<f64>() / loads.len() as f64;
    env.cpu_5s = Some(average);
    env.cpu_60s = Some(average);
    env.cpu_300s = Some(average);
}

async fn apply_host_memory<T: Transport>(client: &SnmpClient<T>, env: &mut EnvironmentStatus) {
    let ram: BTreeSet<u32> = indexed(client, oids::HR_STORAGE_TYPE)
        .await
        .into_iter()
        .filter(|(_, v)| {
            v.as_text()
                .is_some_and(|t| normalize_oid(&t) == oids::HR_STORAGE_RAM)
        })
        .map(|(idx, _)| idx)
        .collect();
    if ram.is_empty() {
        return;
    }

    let units = int_column(client, oids::HR_STORAGE_ALLOCATION_UNITS).await;
    let sizes = int_column(client, oids::HR_STORAGE_SIZE).await;
    let used = int_column(client, oids::HR_STORAGE_USED).await;

    let mut total_bytes: i64 = 0;
    let mut used_bytes: i64 = 0;
    for idx in &ram {
        let (Some(unit), Some(size), Some(in_use)) = (units.get(idx), sizes.get(idx), used.get(idx))
        else {
            continue;
        };
        total_bytes = total_bytes.saturating_add(unit.saturating_mul(*size));
        used_bytes = used_bytes.saturating_add(unit.saturating_mul(*in_use));
    }
    if total_bytes <= 0 {
        return;
    }

    let free_bytes = (total_bytes - used_bytes).max(0);
    env.memory_total_kb.get_or_insert((total_bytes / 1024) as u64);
    env.memory_free_kb.get_or_insert((free_bytes / 1024) as u64);
}
