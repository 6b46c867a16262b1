use chrono::{DateTime, Utc};
use rdk_schemas::{Timeframe, TrendDirection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized sentiment inputs from the external positioning/sentiment
/// collaborator. Both components are in [-1, 1]; values outside are clamped
/// at the point of use.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    /// Institutional positioning lean (+1 fully long, -1 fully short).
    pub positioning: f64,
    /// Retail sentiment lean, read contrarian.
    pub retail: f64,
}

/// Everything the scorer and bias engine need for one instrument, already
/// resolved by the caller. The engine never fetches data itself.
///
/// Optional fields model data that can be missing at the feed level. A
/// missing required field fails scoring with `IncompleteScore` rather than
/// silently scoring zero — zero is a legitimate score, absence is not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    pub instrument: String,
    pub captured_at_utc: DateTime<Utc>,

    /// Trend classification per timeframe. All four are required for scoring.
    pub trends: BTreeMap<Timeframe, TrendDirection>,

    pub ma_short_micros: Option<i64>,
    pub ma_long_micros: Option<i64>,
    /// RSI-style oscillator in [0, 100].
    pub oscillator: Option<f64>,

    pub sentiment: Option<SentimentReading>,

    pub liquidity_ok: Option<bool>,
    /// True when a major scheduled event falls inside the configured
    /// lookahead window.
    pub event_within_lookahead: Option<bool>,
}

impl InstrumentSnapshot {
    /// Empty snapshot; fill in with the builder methods below.
    pub fn new<S: Into<String>>(instrument: S, captured_at_utc: DateTime<Utc>) -> Self {
        Self {
            instrument: instrument.into(),
            captured_at_utc,
            trends: BTreeMap::new(),
            ma_short_micros: None,
            ma_long_micros: None,
            oscillator: None,
            sentiment: None,
            liquidity_ok: None,
            event_within_lookahead: None,
        }
    }

    pub fn with_trend(mut self, tf: Timeframe, dir: TrendDirection) -> Self {
        self.trends.insert(tf, dir);
        self
    }

    /// Set the same trend on all four timeframes.
    pub fn with_uniform_trend(mut self, dir: TrendDirection) -> Self {
        for tf in Timeframe::ALL {
            self.trends.insert(tf, dir);
        }
        self
    }

    pub fn with_mas(mut self, short_micros: i64, long_micros: i64) -> Self {
        self.ma_short_micros = Some(short_micros);
        self.ma_long_micros = Some(long_micros);
        self
    }

    pub fn with_oscillator(mut self, value: f64) -> Self {
        self.oscillator = Some(value);
        self
    }

    pub fn with_sentiment(mut self, positioning: f64, retail: f64) -> Self {
        self.sentiment = Some(SentimentReading { positioning, retail });
        self
    }

    pub fn with_liquidity(mut self, ok: bool) -> Self {
        self.liquidity_ok = Some(ok);
        self
    }

    pub fn with_event_within_lookahead(mut self, within: bool) -> Self {
        self.event_within_lookahead = Some(within);
        self
    }
}

/// Signal-layer errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalError {
    /// A required market input is absent. The instrument's cycle is skipped;
    /// other instruments proceed.
    IncompleteScore {
        instrument: String,
        missing: &'static str,
    },
}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalError::IncompleteScore {
                instrument,
                missing,
            } => write!(f, "INCOMPLETE_SCORE instrument={instrument} missing={missing}"),
        }
    }
}

impl std::error::Error for SignalError {}
