use super::cache::{BandwidthReading, InterfaceRecord};
use crate::config::BandwidthOptions;
use crate::snmp::{oids, SnmpClient, Transport};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

const COUNTER32_MODULUS: i128 = 1 << 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterWidth {
    Bits32,
    Bits64,
}

/// Octet delta between two counter readings. A 32-bit counter that went
/// backwards wrapped once; a 64-bit one is reported as-is.
pub fn counter_delta(prev: u64, cur: u64, width: CounterWidth) -> i128 {
    let delta = i128::from(cur) - i128::from(prev);
    match width {
        CounterWidth::Bits32 if delta < 0 => delta + COUNTER32_MODULUS,
        _ => delta,
    }
}

/// Bits per second over `dt_secs`; `None` unless time moved forward.
pub fn rate_bps(delta: i128, dt_secs: f64) -> Option<f64> {
    (dt_secs > 0.0).then(|| delta as f64 * 8.0 / dt_secs)
}

/// The one retained counter reading per interface.
#[derive(Debug, Clone, PartialEq)]
pub struct BandwidthSample {
    pub at: DateTime<Utc>,
    pub rx_octets: Option<u64>,
    pub tx_octets: Option<u64>,
}

/// Counter history and HC support for one device.
#[derive(Debug, Default)]
pub struct BandwidthEngine {
    high_capacity: Option<bool>,
    samples: HashMap<u32, BandwidthSample>,
}

impl BandwidthEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until the 64-bit counter probe ran.
    pub fn high_capacity(&self) -> Option<bool> {
        self.high_capacity
    }

    pub fn sample(&self, if_index: u32) -> Option<&BandwidthSample> {
        self.samples.get(&if_index)
    }

    /// Turn a new reading into rates against the stored sample, then replace it.
    pub fn ingest(
        &mut self,
        if_index: u32,
        rx_octets: Option<u64>,
        tx_octets: Option<u64>,
        width: CounterWidth,
        now: DateTime<Utc>,
    ) -> BandwidthReading {
        let (rx_bps, tx_bps) = match self.samples.get(&if_index) {
            Some(prev) => {
                let dt = (now - prev.at).num_milliseconds() as f64 / 1000.0;
                let rate = |prev: Option<u64>, cur: Option<u64>| {
                    rate_bps(counter_delta(prev?, cur?, width), dt)
                };
                (rate(prev.rx_octets, rx_octets), rate(prev.tx_octets, tx_octets))
            }
            None => (None, None),
        };

        self.samples.insert(
            if_index,
            BandwidthSample {
                at: now,
                rx_octets,
                tx_octets,
            },
        );

        BandwidthReading {
            rx_octets,
            tx_octets,
            rx_bps,
            tx_bps,
            high_capacity: width == CounterWidth::Bits64,
            sampled_at: now,
        }
    }

    /// Sample the selected interfaces. Interfaces that return neither counter
    /// are left out and keep their previous sample.
    pub async fn poll<T: Transport>(
        &mut self,
        client: &SnmpClient<T>,
        interfaces: &BTreeMap<u32, InterfaceRecord>,
        options: &BandwidthOptions,
        now: DateTime<Utc>,
    ) -> BTreeMap<u32, BandwidthReading> {
        let selected: Vec<u32> = interfaces
            .values()
            .filter(|r| !r.name.trim().is_empty() && options.selects(r.name.trim()))
            .map(|r| r.index)
            .collect();

        if self.high_capacity.is_none() {
            if let Some(probe) = selected.first() {
                let value = client
                    .get_one(&format!("{}.{}", oids::IF_HC_IN_OCTETS, probe))
                    .await;
                let supported = value.and_then(|v| v.as_u64()).is_some();
                tracing::debug!("64-bit interface counters supported: {}", supported);
                self.high_capacity = Some(supported);
            }
        }

        let (width, rx_base, tx_base) = if self.high_capacity == Some(true) {
            (CounterWidth::Bits64, oids::IF_HC_IN_OCTETS, oids::IF_HC_OUT_OCTETS)
        } else {
            (CounterWidth::Bits32, oids::IF_IN_OCTETS, oids::IF_OUT_OCTETS)
        };

        let requests: Vec<String> = selected
            .iter()
            .flat_map(|idx| [format!("{}.{}", rx_base, idx), format!("{}.{}", tx_base, idx)])
            .collect();
        let values = client.get_many(&requests).await;
        let counter = |base: &str, idx: u32| {
            values
                .get(&format!("{}.{}", base, idx))
                .and_then(|v| v.as_ref())
                .and_then(|v| v.as_u64())
        };

        let mut readings = BTreeMap::new();
        for idx in selected {
            let rx = counter(rx_base, idx);
            let tx = counter(tx_base, idx);
            if rx.is_none() && tx.is_none() {
                continue;
            }
            readings.insert(idx, self.ingest(idx, rx, tx, width, now));
        }
        readings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snmp::mock::MockTransport;
    use crate::snmp::SnmpValue;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_counter32_wrap() {
        let delta = counter_delta(4_294_967_000, 200, CounterWidth::Bits32);
        assert_eq!(delta, 496);
        assert!(delta >= 0);
    }

    #[test]
    fn test_counter64_negative_not_corrected() {
        assert_eq!(counter_delta(1_000, 400, CounterWidth::Bits64), -600);
        assert_eq!(counter_delta(400, 1_000, CounterWidth::Bits64), 600);
    }

    #[test]
    fn test_rate_exact_megabit() {
        assert_eq!(rate_bps(125_000, 1.0), Some(1_000_000.0));
        assert_eq!(rate_bps(125_000, 0.0), None);
    }

    #[test]
    fn test_ingest_first_sample_has_no_rate() {
        let mut engine = BandwidthEngine::new();
        let reading = engine.ingest(1, Some(100), Some(100), CounterWidth::Bits64, t0());
        assert_eq!(reading.rx_bps, None);
        assert_eq!(reading.tx_bps, None);
        assert!(engine.sample(1).is_some());
    }

    #[test]
    fn test_ingest_second_sample_rate() {
        let mut engine = BandwidthEngine::new();
        engine.ingest(1, Some(0), Some(1_000), CounterWidth::Bits32, t0());
        let reading = engine.ingest(
            1,
            Some(125_000),
            Some(1_000),
            CounterWidth::Bits32,
            t0() + Duration::seconds(1),
        );
        assert_eq!(reading.rx_bps, Some(1_000_000.0));
        assert_eq!(reading.tx_bps, Some(0.0));
    }

    #[test]
    fn test_ingest_same_timestamp_has_no_rate() {
        let mut engine = BandwidthEngine::new();
        engine.ingest(3, Some(0), Some(0), CounterWidth::Bits32, t0());
        let reading = engine.ingest(3, Some(500), Some(500), CounterWidth::Bits32, t0());
        assert_eq!(reading.rx_bps, None);
        assert_eq!(engine.sample(3).unwrap().rx_octets, Some(500));
    }

    fn interfaces(names: &[(u32, &str)]) -> BTreeMap<u32, InterfaceRecord> {
        names
            .iter()
            .map(|(idx, name)| {
                let mut r = InterfaceRecord::new(*idx);
                r.name = name.to_string();
                (*idx, r)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_poll_uses_hc_counters_when_probe_succeeds() {
        let mock = MockTransport::new();
        mock.insert("1.3.6.1.2.1.31.1.1.1.6.1", SnmpValue::Counter64(1_000));
        mock.insert("1.3.6.1.2.1.31.1.1.1.10.1", SnmpValue::Counter64(2_000));
        let client = SnmpClient::new(mock.clone());
        let table = interfaces(&[(1, "Gi1/0/1"), (2, "")]);
        let mut engine = BandwidthEngine::new();

        let first = engine
            .poll(&client, &table, &BandwidthOptions::default(), t0())
            .await;
        assert_eq!(engine.high_capacity(), Some(true));
        assert_eq!(first.len(), 1);
        assert!(first[&1].high_capacity);
        assert_eq!(first[&1].rx_bps, None);

        mock.insert("1.3.6.1.2.1.31.1.1.1.6.1", SnmpValue::Counter64(126_000));
        let second = engine
            .poll(
                &client,
                &table,
                &BandwidthOptions::default(),
                t0() + Duration::seconds(1),
            )
            .await;
        assert_eq!(second[&1].rx_bps, Some(1_000_000.0));
        assert_eq!(second[&1].tx_bps, Some(0.0));
    }

    #[tokio::test]
    async fn test_poll_falls_back_to_32_bit_and_filters() {
        let mock = MockTransport::new();
        mock.insert("1.3.6.1.2.1.2.2.1.10.1", SnmpValue::Counter32(10));
        mock.insert("1.3.6.1.2.1.2.2.1.16.1", SnmpValue::Counter32(20));
        mock.insert("1.3.6.1.2.1.2.2.1.10.2", SnmpValue::Counter32(10));
        let client = SnmpClient::new(mock);
        let table = interfaces(&[(1, "ge-0/0/1"), (2, "vlan.10")]);
        let mut options = BandwidthOptions::default();
        options.exclude.starts_with = vec!["vlan".into()];
        let mut engine = BandwidthEngine::new();

        let readings = engine.poll(&client, &table, &options, t0()).await;

        assert_eq!(engine.high_capacity(), Some(false));
        assert_eq!(readings.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert!(!readings[&1].high_capacity);
        assert_eq!(readings[&1].tx_octets, Some(20));
    }

    #[tokio::test]
    async fn test_hc_probe_sent_once_per_engine() {
        let mock = MockTransport::new();
        mock.insert("1.3.6.1.2.1.31.1.1.1.6.1", SnmpValue::Counter64(1_000));
        mock.insert("1.3.6.1.2.1.31.1.1.1.10.1", SnmpValue::Counter64(2_000));
        let client = SnmpClient::new(mock.clone());
        let table = interfaces(&[(1, "Gi1/0/1")]);
        let mut engine = BandwidthEngine::new();

        engine
            .poll(&client, &table, &BandwidthOptions::default(), t0())
            .await;
        engine
            .poll(
                &client,
                &table,
                &BandwidthOptions::default(),
                t0() + Duration::seconds(30),
            )
            .await;

        let requests = mock.get_requests();
        let single_oid_gets = requests.iter().filter(|r| r.len() == 1).count();
        assert_eq!(single_oid_gets, 1);
        assert_eq!(requests.len(), 3);
        assert_eq!(engine.high_capacity(), Some(true));
    }

    #[tokio::test]
    async fn test_poll_32_bit_counter_wrap() {
        let mock = MockTransport::new();
        mock.insert("1.3.6.1.2.1.2.2.1.10.1", SnmpValue::Counter32(4_294_967_000));
        mock.insert("1.3.6.1.2.1.2.2.1.16.1", SnmpValue::Counter32(0));
        let client = SnmpClient::new(mock.clone());
        let table = interfaces(&[(1, "port1")]);
        let mut engine = BandwidthEngine::new();

        engine
            .poll(&client, &table, &BandwidthOptions::default(), t0())
            .await;
        assert_eq!(engine.high_capacity(), Some(false));

        mock.insert("1.3.6.1.2.1.2.2.1.10.1", SnmpValue::Counter32(200));
        let readings = engine
            .poll(
                &client,
                &table,
                &BandwidthOptions::default(),
                t0() + Duration::seconds(1),
            )
            .await;

        assert_eq!(readings[&1].rx_octets, Some(200));
        assert_eq!(readings[&1].rx_bps, Some(3_968.0));
        assert_eq!(readings[&1].tx_bps, Some(0.0));
    }
}
