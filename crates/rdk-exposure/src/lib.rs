//! rdk-exposure
//!
//! Exposure tracker: aggregates per-instrument and per-cluster notional
//! exposure from the live position set and checks both against configured
//! caps. The report is a fresh snapshot computed each cycle from current
//! positions — no incremental state, so the tracker's view can never drift
//! from the broker's actual book.
//!
//! Pure deterministic logic. Aggregation uses i128 with a clamped narrowing
//! back to i64 micros; iteration order is BTreeMap order throughout.

use rdk_config::{EngineConfig, ExposureBasis};
use rdk_schemas::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A per-instrument cap breach.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentBreach {
    pub instrument: String,
    pub exposure_micros: i64,
    pub cap_micros: i64,
}

/// A per-cluster cap breach. Detected independently of instrument caps: every
/// member can be inside its own cap while the cluster sum breaches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterBreach {
    pub cluster_id: String,
    pub exposure_micros: i64,
    pub cap_micros: i64,
}

/// Snapshot exposure report for one cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureReport {
    /// Gross (absolute) exposure per instrument.
    pub per_instrument_micros: BTreeMap<String, i64>,
    /// Gross exposure per cluster.
    pub per_cluster_gross_micros: BTreeMap<String, i64>,
    /// Signed net exposure per cluster (+long); hedge intents are sized
    /// against this.
    pub per_cluster_net_micros: BTreeMap<String, i64>,
    /// Signed net exposure per member instrument within each cluster. Lets
    /// the damage-control controller pick a hedge instrument without
    /// re-reading the book.
    pub per_cluster_member_net_micros: BTreeMap<String, BTreeMap<String, i64>>,
    pub instrument_breaches: Vec<InstrumentBreach>,
    pub cluster_breaches: Vec<ClusterBreach>,
}

impl ExposureReport {
    pub fn has_breach(&self) -> bool {
        !self.instrument_breaches.is_empty() || !self.cluster_breaches.is_empty()
    }

    pub fn breached_clusters(&self) -> Vec<String> {
        self.cluster_breaches
            .iter()
            .map(|b| b.cluster_id.clone())
            .collect()
    }
}

fn i128_to_i64_clamp(x: i128) -> i64 {
    if x > i64::MAX as i128 {
        i64::MAX
    } else if x < i64::MIN as i128 {
        i64::MIN
    } else {
        x as i64
    }
}

/// Notional scaled to the configured exposure basis.
fn basis_notional_micros(cfg: &EngineConfig, instrument: &str, notional_micros: i64) -> i128 {
    match cfg.exposure_basis {
        ExposureBasis::Notional => notional_micros as i128,
        ExposureBasis::RiskAdjusted => {
            // Validation guarantees a positive weight for every capped
            // instrument; unweighted instruments fall back to 1.0.
            let w = cfg
                .volatility_weights
                .get(instrument)
                .copied()
                .unwrap_or(1.0);
            (notional_micros as f64 * w) as i128
        }
    }
}

/// Aggregate the current position set against the configured caps.
///
/// Cluster membership comes from config; positions on unmapped instruments
/// fall back to their broker-side `cluster_id` tag. Instrument-cap and
/// cluster-cap checks run independently.
pub fn evaluate(positions: &[Position], cfg: &EngineConfig) -> ExposureReport {
    let mut per_instrument: BTreeMap<String, i128> = BTreeMap::new();
    let mut cluster_gross: BTreeMap<String, i128> = BTreeMap::new();
    let mut cluster_net: BTreeMap<String, i128> = BTreeMap::new();
    let mut cluster_member_net: BTreeMap<String, BTreeMap<String, i128>> = BTreeMap::new();

    for pos in positions {
        let gross = basis_notional_micros(cfg, &pos.instrument, pos.notional_micros.abs());
        let net = gross * i128::from(pos.direction.sign());

        *per_instrument.entry(pos.instrument.clone()).or_insert(0) += gross;

        let cluster = cfg
            .cluster_of(&pos.instrument)
            .map(str::to_string)
            .or_else(|| pos.cluster_id.clone());
        if let Some(cluster_id) = cluster {
            *cluster_gross.entry(cluster_id.clone()).or_insert(0) += gross;
            *cluster_net.entry(cluster_id.clone()).or_insert(0) += net;
            *cluster_member_net
                .entry(cluster_id)
                .or_default()
                .entry(pos.instrument.clone())
                .or_insert(0) += net;
        }
    }

    let per_instrument_micros: BTreeMap<String, i64> = per_instrument
        .iter()
        .map(|(k, v)| (k.clone(), i128_to_i64_clamp(*v)))
        .collect();
    let per_cluster_gross_micros: BTreeMap<String, i64> = cluster_gross
        .iter()
        .map(|(k, v)| (k.clone(), i128_to_i64_clamp(*v)))
        .collect();
    let per_cluster_net_micros: BTreeMap<String, i64> = cluster_net
        .iter()
        .map(|(k, v)| (k.clone(), i128_to_i64_clamp(*v)))
        .collect();
    let per_cluster_member_net_micros: BTreeMap<String, BTreeMap<String, i64>> =
        cluster_member_net
            .iter()
            .map(|(k, members)| {
                (
                    k.clone(),
                    members
                        .iter()
                        .map(|(m, v)| (m.clone(), i128_to_i64_clamp(*v)))
                        .collect(),
                )
            })
            .collect();

    let mut instrument_breaches = Vec::new();
    for (instrument, exposure) in &per_instrument_micros {
        if let Some(cap) = cfg.instrument_caps_micros.get(instrument) {
            if *exposure > *cap {
                instrument_breaches.push(InstrumentBreach {
                    instrument: instrument.clone(),
                    exposure_micros: *exposure,
                    cap_micros: *cap,
                });
            }
        }
    }

    let mut cluster_breaches = Vec::new();
    for (cluster_id, exposure) in &per_cluster_gross_micros {
        if let Some(cap) = cfg.cluster_cap_micros(cluster_id) {
            if *exposure > cap {
                cluster_breaches.push(ClusterBreach {
                    cluster_id: cluster_id.clone(),
                    exposure_micros: *exposure,
                    cap_micros: cap,
                });
            }
        }
    }

    ExposureReport {
        per_instrument_micros,
        per_cluster_gross_micros,
        per_cluster_net_micros,
        per_cluster_member_net_micros,
        instrument_breaches,
        cluster_breaches,
    }
}
