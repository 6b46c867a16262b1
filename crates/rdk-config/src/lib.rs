//! rdk-config
//!
//! Static engine configuration: drawdown thresholds, exposure caps, cluster
//! membership, signal knobs. Loaded once at session start, validated
//! fail-fast, immutable afterwards. A canonical sha256 hash of the effective
//! config is recorded in the audit log so a review can pin down exactly which
//! limits were live.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Basis on which exposure caps are evaluated.
///
/// `RiskAdjusted` scales each position's notional by its configured
/// volatility weight before aggregation; `Notional` uses raw size.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureBasis {
    Notional,
    RiskAdjusted,
}

/// One correlated-instrument cluster with its combined cap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub cluster_id: String,
    pub members: Vec<String>,
    pub cap_micros: i64,
}

/// The full engine configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Drawdown fraction at which the engine enters Warning.
    pub soft_threshold: f64,
    /// Drawdown fraction at which damage control triggers.
    pub hard_threshold: f64,

    pub exposure_basis: ExposureBasis,

    /// Per-instrument gross exposure caps (micros).
    #[serde(default)]
    pub instrument_caps_micros: BTreeMap<String, i64>,

    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,

    /// Required only when `exposure_basis` is `risk_adjusted`: per-instrument
    /// volatility scaling weight (> 0).
    #[serde(default)]
    pub volatility_weights: BTreeMap<String, f64>,

    /// Sentiment magnitude beyond which it vetoes a directional bias.
    #[serde(default = "default_contradiction_threshold")]
    pub sentiment_contradiction_threshold: f64,

    /// Scheduled-event lookahead window for the event-clearance gate.
    #[serde(default = "default_event_lookahead_hours")]
    pub event_lookahead_hours: u32,
}

fn default_contradiction_threshold() -> f64 {
    0.6
}

fn default_event_lookahead_hours() -> u32 {
    24
}

impl EngineConfig {
    /// Conservative defaults: 5% soft / 10% hard, notional basis, no caps.
    pub fn sane_defaults() -> Self {
        Self {
            soft_threshold: 0.05,
            hard_threshold: 0.10,
            exposure_basis: ExposureBasis::Notional,
            instrument_caps_micros: BTreeMap::new(),
            clusters: Vec::new(),
            volatility_weights: BTreeMap::new(),
            sentiment_contradiction_threshold: default_contradiction_threshold(),
            event_lookahead_hours: default_event_lookahead_hours(),
        }
    }

    /// Load and validate from a YAML or JSON file (by extension).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(raw).context("invalid config yaml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(raw).context("invalid config json")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fail-fast structural validation. Called by every load path; a config
    /// that does not pass never reaches the engine.
    pub fn validate(&self) -> Result<()> {
        if !(self.soft_threshold > 0.0
            && self.soft_threshold < self.hard_threshold
            && self.hard_threshold < 1.0)
        {
            bail!(
                "CONFIG_INVALID_THRESHOLDS require 0 < soft < hard < 1, got soft={} hard={}",
                self.soft_threshold,
                self.hard_threshold
            );
        }

        if !(0.0..=1.0).contains(&self.sentiment_contradiction_threshold) {
            bail!(
                "CONFIG_INVALID_SENTIMENT_THRESHOLD must be in [0,1], got {}",
                self.sentiment_contradiction_threshold
            );
        }

        for (instrument, cap) in &self.instrument_caps_micros {
            if *cap <= 0 {
                bail!(
                    "CONFIG_INVALID_CAP instrument={} cap_micros={} (must be > 0)",
                    instrument,
                    cap
                );
            }
        }

        let mut seen_clusters: BTreeMap<&str, ()> = BTreeMap::new();
        for cluster in &self.clusters {
            if cluster.cluster_id.is_empty() {
                bail!("CONFIG_INVALID_CLUSTER empty cluster_id");
            }
            if seen_clusters.insert(cluster.cluster_id.as_str(), ()).is_some() {
                bail!(
                    "CONFIG_INVALID_CLUSTER duplicate cluster_id={}",
                    cluster.cluster_id
                );
            }
            if cluster.members.is_empty() {
                bail!(
                    "CONFIG_INVALID_CLUSTER cluster_id={} has no members",
                    cluster.cluster_id
                );
            }
            let mut seen_members: BTreeMap<&str, ()> = BTreeMap::new();
            for m in &cluster.members {
                if seen_members.insert(m.as_str(), ()).is_some() {
                    bail!(
                        "CONFIG_INVALID_CLUSTER cluster_id={} duplicate member={}",
                        cluster.cluster_id,
                        m
                    );
                }
            }
            if cluster.cap_micros <= 0 {
                bail!(
                    "CONFIG_INVALID_CLUSTER cluster_id={} cap_micros={} (must be > 0)",
                    cluster.cluster_id,
                    cluster.cap_micros
                );
            }
        }

        if self.exposure_basis == ExposureBasis::RiskAdjusted {
            for instrument in self.instrument_caps_micros.keys() {
                match self.volatility_weights.get(instrument) {
                    Some(w) if *w > 0.0 => {}
                    Some(w) => bail!(
                        "CONFIG_INVALID_VOL_WEIGHT instrument={} weight={} (must be > 0)",
                        instrument,
                        w
                    ),
                    None => bail!(
                        "CONFIG_MISSING_VOL_WEIGHT instrument={} required for risk_adjusted basis",
                        instrument
                    ),
                }
            }
        }

        Ok(())
    }

    /// Cluster id for an instrument under the configured membership, if any.
    pub fn cluster_of(&self, instrument: &str) -> Option<&str> {
        self.clusters
            .iter()
            .find(|c| c.members.iter().any(|m| m == instrument))
            .map(|c| c.cluster_id.as_str())
    }

    pub fn cluster_cap_micros(&self, cluster_id: &str) -> Option<i64> {
        self.clusters
            .iter()
            .find(|c| c.cluster_id == cluster_id)
            .map(|c| c.cap_micros)
    }

    /// sha256 over canonical (recursively key-sorted, compact) JSON.
    /// Stable across map key order in the source document.
    pub fn config_hash(&self) -> Result<String> {
        let raw = serde_json::to_value(self).context("serialize config failed")?;
        let canonical =
            serde_json::to_string(&sort_keys(&raw)).context("canonical json serialize failed")?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
soft_threshold: 0.05
hard_threshold: 0.10
exposure_basis: notional
instrument_caps_micros:
  EURUSD: 50000000000
clusters:
  - cluster_id: usd-majors
    members: [EURUSD, GBPUSD]
    cap_micros: 80000000000
"#
    }

    #[test]
    fn loads_minimal_yaml() {
        let cfg = EngineConfig::from_yaml_str(minimal_yaml()).unwrap();
        assert_eq!(cfg.soft_threshold, 0.05);
        assert_eq!(cfg.cluster_of("GBPUSD"), Some("usd-majors"));
        assert_eq!(cfg.cluster_cap_micros("usd-majors"), Some(80_000_000_000));
        // defaults applied
        assert_eq!(cfg.sentiment_contradiction_threshold, 0.6);
        assert_eq!(cfg.event_lookahead_hours, 24);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut cfg = EngineConfig::sane_defaults();
        cfg.soft_threshold = 0.10;
        cfg.hard_threshold = 0.05;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("CONFIG_INVALID_THRESHOLDS"), "{err}");
    }

    #[test]
    fn rejects_hard_threshold_of_one() {
        let mut cfg = EngineConfig::sane_defaults();
        cfg.hard_threshold = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_soft_equal_hard() {
        let mut cfg = EngineConfig::sane_defaults();
        cfg.soft_threshold = 0.10;
        cfg.hard_threshold = 0.10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_cluster_id() {
        let mut cfg = EngineConfig::sane_defaults();
        cfg.clusters = vec![
            ClusterConfig {
                cluster_id: "c1".into(),
                members: vec!["A".into()],
                cap_micros: 1,
            },
            ClusterConfig {
                cluster_id: "c1".into(),
                members: vec!["B".into()],
                cap_micros: 1,
            },
        ];
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("duplicate cluster_id"), "{err}");
    }

    #[test]
    fn risk_adjusted_basis_requires_weights_for_capped_instruments() {
        let mut cfg = EngineConfig::sane_defaults();
        cfg.exposure_basis = ExposureBasis::RiskAdjusted;
        cfg.instrument_caps_micros.insert("EURUSD".into(), 1_000);
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("CONFIG_MISSING_VOL_WEIGHT"), "{err}");

        cfg.volatility_weights.insert("EURUSD".into(), 1.2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_hash_stable_across_key_order() {
        let a = EngineConfig::from_yaml_str(minimal_yaml()).unwrap();
        // Same document, instrument caps listed in a different order.
        let b = EngineConfig::from_yaml_str(
            r#"
hard_threshold: 0.10
soft_threshold: 0.05
exposure_basis: notional
clusters:
  - cluster_id: usd-majors
    members: [EURUSD, GBPUSD]
    cap_micros: 80000000000
instrument_caps_micros:
  EURUSD: 50000000000
"#,
        )
        .unwrap();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());
    }
}
