use super::cache::{PoeHealth, PoeStatus};
use super::Probe;
use crate::snmp::{last_arc, oids, SnmpClient, Transport, WalkResult};

/// Worst PSE health across groups: 1 healthy < 2 disabled < 3 faulty.
/// Codes outside that set count as faulty.
pub fn worst_health(codes: &[i64]) -> Option<i64> {
    codes
        .iter()
        .map(|&c| if (1..=3).contains(&c) { c } else { 3 })
        .max()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Totals from the per-group POWER-ETHERNET-MIB columns.
pub fn summarize(budgets_w: &[f64], used_mw: &[f64], health: &[i64]) -> PoeStatus {
    let budget_total_w = (!budgets_w.is_empty()).then(|| budgets_w.iter().sum::<f64>());
    let power_used_w = (!used_mw.is_empty()).then(|| round3(used_mw.iter().sum::<f64>() / 1000.0));
    let power_available_w = match (budget_total_w, power_used_w) {
        (Some(budget), Some(used)) => Some(round3((budget - used).max(0.0))),
        _ => None,
    };

    PoeStatus {
        budget_total_w,
        power_used_w,
        power_available_w,
        health: worst_health(health).map(PoeHealth::from_code),
        port_power_mw: Default::default(),
    }
}

fn non_negative(result: &WalkResult) -> Vec<f64> {
    result
        .rows
        .iter()
        .filter_map(|(_, v)| v.as_f64())
        .filter(|v| *v >= 0.0)
        .collect()
}

/// Poll PSE budget, draw and health, plus the Dell per-port draw table.
pub async fn poll_poe<T: Transport>(client: &SnmpClient<T>) -> Probe<PoeStatus> {
    let budget_walk = client.walk(oids::PETH_MAIN_PSE_POWER).await;
    let used_walk = client.walk(oids::PETH_MAIN_PSE_CONSUMPTION).await;
    let health_walk = client.walk(oids::PETH_MAIN_PSE_OPER_STATUS).await;

    let mut budgets = non_negative(&budget_walk);
    let mut used = non_negative(&used_walk);
    let mut health: Vec<i64> = health_walk
        .rows
        .iter()
        .filter_map(|(_, v)| v.as_i64())
        .collect();

    if budgets.is_empty() && used.is_empty() && health.is_empty() {
        // Agents that only answer GET on the first group
        let scalars = [
            format!("{}.1", oids::PETH_MAIN_PSE_POWER),
            format!("{}.1", oids::PETH_MAIN_PSE_CONSUMPTION),
            format!("{}.1", oids::PETH_MAIN_PSE_OPER_STATUS),
        ];
        let values = client.get_many(&scalars).await;
        let scalar = |oid: &String| values.get(oid).and_then(|v| v.clone());
        budgets.extend(scalar(&scalars[0]).and_then(|v| v.as_f64()));
        used.extend(scalar(&scalars[1]).and_then(|v| v.as_f64()));
        health.extend(scalar(&scalars[2]).and_then(|v| v.as_i64()));
    }

    let mut status = summarize(&budgets, &used, &health);

    for (oid, value) in client.walk(oids::DELL_POE_PORT_POWER).await.into_rows() {
        if let (Some(if_index), Some(mw)) = (last_arc(&oid), value.as_f64()) {
            status.port_power_mw.insert(if_index, mw);
        }
    }

    if !status.is_empty() {
        return Probe::Supported(status);
    }
    match budget_walk.error() {
        Some(e) => Probe::TransportError(e.clone()),
        None => Probe::Unsupported,
    }
}
