//! rdk-schemas
//!
//! Shared domain types for the risk & signal engine.
//! Pure data: no IO, no clocks, no engine logic. Every record that can reach
//! the audit log or a dashboard derives Serialize/Deserialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// 1e-6 fixed-point scale for all balance/notional values.
pub const MICROS_SCALE: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// Market primitives
// ---------------------------------------------------------------------------

/// Position direction. Long notional is positive in net aggregations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// The side that neutralizes this one.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// Sign applied to notional when netting (+1 long, -1 short).
    pub fn sign(self) -> i64 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// The four evaluation timeframes, highest first.
///
/// Ordering matters: `Monthly` dominates tie-breaks in timeframe alignment,
/// and `ALL` iterates highest → lowest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    Monthly,
    Weekly,
    Daily,
    FourHour,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::Monthly,
        Timeframe::Weekly,
        Timeframe::Daily,
        Timeframe::FourHour,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Monthly => "1M",
            Timeframe::Weekly => "1W",
            Timeframe::Daily => "1D",
            Timeframe::FourHour => "4H",
        }
    }
}

/// Trend classification on a single timeframe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// An open position as reported by the broker collaborator.
///
/// Re-read fresh each cycle; never mutated by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: String,
    /// Absolute notional size in micros (always ≥ 0; direction carries sign).
    pub notional_micros: i64,
    pub direction: Direction,
    /// Broker-side cluster tag. The engine prefers configured cluster
    /// membership and uses this only for unmapped instruments.
    pub cluster_id: Option<String>,
}

impl Position {
    pub fn new<S: Into<String>>(instrument: S, notional_micros: i64, direction: Direction) -> Self {
        Self {
            instrument: instrument.into(),
            notional_micros,
            direction,
            cluster_id: None,
        }
    }

    pub fn with_cluster<S: Into<String>>(mut self, cluster_id: S) -> Self {
        self.cluster_id = Some(cluster_id.into());
        self
    }

    /// Signed notional (+long, -short).
    pub fn signed_notional_micros(&self) -> i64 {
        self.direction.sign().saturating_mul(self.notional_micros)
    }
}

/// One observed equity sample. Immutable once recorded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub ts_utc: DateTime<Utc>,
    pub balance_micros: i64,
}

// ---------------------------------------------------------------------------
// Signal records
// ---------------------------------------------------------------------------

/// Composite 0–10 signal-quality score.
///
/// `total` is the sum of the five sub-scores, each clamped to its own maximum
/// (3 + 3 + 2 + 1 + 1 = 10) before summation, so the bound holds by
/// construction. Recomputed whole every cycle; never partially updated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceScore {
    pub instrument: String,
    pub timeframe_alignment: f64,
    pub momentum: f64,
    pub sentiment: f64,
    pub liquidity: f64,
    pub event_clearance: f64,
    pub total: f64,
    pub ts_utc: DateTime<Utc>,
}

/// Directional market lean.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for BiasDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiasDirection::Bullish => write!(f, "BULLISH"),
            BiasDirection::Bearish => write!(f, "BEARISH"),
            BiasDirection::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Directional bias with confidence in [0, 1]. Stateless between cycles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketBias {
    pub instrument: String,
    pub direction: BiasDirection,
    pub confidence: f64,
    pub ts_utc: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Risk state & damage-control protocol
// ---------------------------------------------------------------------------

/// Engine risk regime. Owned exclusively by the damage-control controller;
/// transitions are the only legal mutation path.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskState {
    Normal,
    Warning,
    DamageControl,
}

impl RiskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskState::Normal => "NORMAL",
            RiskState::Warning => "WARNING",
            RiskState::DamageControl => "DAMAGE_CONTROL",
        }
    }
}

impl fmt::Display for RiskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A hedge order intent: what hedge is needed, not how it is placed.
///
/// Sized to neutralize a cluster's net exposure; order placement mechanics
/// belong to the external execution collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HedgeIntent {
    pub cluster_id: String,
    /// Representative instrument to hedge through (largest position in the
    /// cluster at assessment time).
    pub instrument: String,
    pub side: Direction,
    pub notional_micros: i64,
}

/// One step of the damage-control protocol, recorded in execution order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ProtocolStep {
    /// Trigger values captured at the edge.
    Detect {
        drawdown: f64,
        peak_equity_micros: i64,
        balance_micros: i64,
        breached_clusters: Vec<String>,
    },
    /// Per-cluster net exposure snapshot at assessment time.
    Assess {
        cluster_net_micros: BTreeMap<String, i64>,
    },
    /// Hedge intents handed to the execution collaborator.
    Hedge { intents: Vec<HedgeIntent> },
    /// Hedge placement rejected; retried next cycle.
    HedgeFailed { reason: String },
    /// Entries-paused flag set engine-wide.
    Pause,
    /// Action list sealed to the audit collaborator.
    ActionsSealed,
}

/// A protocol step with its wall-clock timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedStep {
    pub ts_utc: DateTime<Utc>,
    pub step: ProtocolStep,
}

/// One damage-control episode: opened on the trigger edge, appended to while
/// open, sealed (`closed_at` set) only by explicit reviewer action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamageControlEpisode {
    pub episode_id: Uuid,
    pub opened_at: DateTime<Utc>,
    pub trigger_drawdown: f64,
    pub trigger_clusters: Vec<String>,
    pub steps: Vec<RecordedStep>,
    pub closed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

impl DamageControlEpisode {
    pub fn open(
        opened_at: DateTime<Utc>,
        trigger_drawdown: f64,
        trigger_clusters: Vec<String>,
    ) -> Self {
        Self {
            episode_id: Uuid::new_v4(),
            opened_at,
            trigger_drawdown,
            trigger_clusters,
            steps: Vec::new(),
            closed_at: None,
            review_notes: None,
        }
    }

    /// Append a step. Steps are never reordered or removed.
    pub fn record(&mut self, ts_utc: DateTime<Utc>, step: ProtocolStep) {
        self.steps.push(RecordedStep { ts_utc, step });
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}
