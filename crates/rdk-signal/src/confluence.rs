//! Confluence scoring: five independent sub-scores, each clamped to its own
//! maximum before summation. A misbehaving sub-score can never borrow budget
//! from another, so the total is in [0, 10] by construction.

use crate::types::{InstrumentSnapshot, SentimentReading, SignalError};
use rdk_schemas::{ConfluenceScore, Timeframe, TrendDirection};
use std::collections::BTreeMap;

pub const MAX_TIMEFRAME_ALIGNMENT: f64 = 3.0;
pub const MAX_MOMENTUM: f64 = 3.0;
pub const MAX_SENTIMENT: f64 = 2.0;
pub const MAX_LIQUIDITY: f64 = 1.0;
pub const MAX_EVENT_CLEARANCE: f64 = 1.0;

/// Oscillator band treated as non-extreme (room to run).
const OSC_LOW: f64 = 30.0;
const OSC_HIGH: f64 = 70.0;

/// Outcome of the multi-timeframe trend vote, reused by the bias engine so
/// trend direction is computed exactly once per snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignmentVerdict {
    /// Winning direction, if any direction got at least two votes.
    pub direction: Option<TrendDirection>,
    /// Number of timeframes voting for the winning direction (0 when none).
    pub aligned: u8,
    pub per_timeframe: BTreeMap<Timeframe, TrendDirection>,
}

/// Vote over the four timeframes. Flat timeframes abstain.
///
/// - all four agree → full score
/// - partial agreement → 3.0 × aligned/4
/// - fewer than two votes for any direction → zero
/// - a 2–2 split resolves to the monthly timeframe's side
pub fn timeframe_alignment(
    trends: &BTreeMap<Timeframe, TrendDirection>,
) -> (f64, AlignmentVerdict) {
    let mut up: u8 = 0;
    let mut down: u8 = 0;
    for tf in Timeframe::ALL {
        match trends.get(&tf) {
            Some(TrendDirection::Up) => up += 1,
            Some(TrendDirection::Down) => down += 1,
            _ => {}
        }
    }

    let monthly = trends.get(&Timeframe::Monthly).copied();

    let (winner, aligned) = if up > down {
        (Some(TrendDirection::Up), up)
    } else if down > up {
        (Some(TrendDirection::Down), down)
    } else {
        // Tie (including 2–2): the highest timeframe dominates.
        match monthly {
            Some(TrendDirection::Up) => (Some(TrendDirection::Up), up),
            Some(TrendDirection::Down) => (Some(TrendDirection::Down), down),
            _ => (None, 0),
        }
    };

    // One lone vote is noise, not agreement.
    let (winner, aligned) = if aligned < 2 { (None, 0) } else { (winner, aligned) };

    let score = (MAX_TIMEFRAME_ALIGNMENT * f64::from(aligned) / 4.0)
        .clamp(0.0, MAX_TIMEFRAME_ALIGNMENT);

    (
        score,
        AlignmentVerdict {
            direction: winner,
            aligned,
            per_timeframe: trends.clone(),
        },
    )
}

/// Momentum from moving-average ordering plus an oscillator extremity check.
/// Reproducible from price series alone.
pub fn momentum_score(ma_short_micros: i64, ma_long_micros: i64, oscillator: f64) -> f64 {
    let mut score: f64 = 0.0;
    // Strict ordering either way counts; equality means no momentum signal.
    if ma_short_micros != ma_long_micros {
        score += 2.0;
    }
    if oscillator > OSC_LOW && oscillator < OSC_HIGH {
        score += 1.0;
    }
    score.clamp(0.0, MAX_MOMENTUM)
}

/// Combined sentiment lean in [-1, 1]: institutional positioning with, retail
/// read contrarian. Exposed signed for the bias engine's contradiction check.
pub fn sentiment_value(reading: &SentimentReading) -> f64 {
    let positioning = reading.positioning.clamp(-1.0, 1.0);
    let retail = reading.retail.clamp(-1.0, 1.0);
    ((positioning - retail) / 2.0).clamp(-1.0, 1.0)
}

/// Sentiment sub-score: magnitude of the combined lean, scaled to its budget.
pub fn sentiment_score(reading: &SentimentReading) -> f64 {
    (MAX_SENTIMENT * sentiment_value(reading).abs()).clamp(0.0, MAX_SENTIMENT)
}

fn require<T>(
    value: Option<T>,
    instrument: &str,
    missing: &'static str,
) -> Result<T, SignalError> {
    value.ok_or_else(|| SignalError::IncompleteScore {
        instrument: instrument.to_string(),
        missing,
    })
}

fn require_trend(
    snapshot: &InstrumentSnapshot,
    tf: Timeframe,
) -> Result<TrendDirection, SignalError> {
    let missing = match tf {
        Timeframe::Monthly => "trend_monthly",
        Timeframe::Weekly => "trend_weekly",
        Timeframe::Daily => "trend_daily",
        Timeframe::FourHour => "trend_four_hour",
    };
    require(
        snapshot.trends.get(&tf).copied(),
        &snapshot.instrument,
        missing,
    )
}

/// Score one instrument. Pure function of the snapshot; deterministic for
/// identical inputs. Fails with `IncompleteScore` when any required input is
/// absent — never substitutes zero for missing data.
pub fn score(
    snapshot: &InstrumentSnapshot,
) -> Result<(ConfluenceScore, AlignmentVerdict), SignalError> {
    for tf in Timeframe::ALL {
        require_trend(snapshot, tf)?;
    }
    let ma_short = require(snapshot.ma_short_micros, &snapshot.instrument, "ma_short")?;
    let ma_long = require(snapshot.ma_long_micros, &snapshot.instrument, "ma_long")?;
    let oscillator = require(snapshot.oscillator, &snapshot.instrument, "oscillator")?;
    let sentiment = require(snapshot.sentiment, &snapshot.instrument, "sentiment")?;
    let liquidity_ok = require(snapshot.liquidity_ok, &snapshot.instrument, "liquidity")?;
    let event_within = require(
        snapshot.event_within_lookahead,
        &snapshot.instrument,
        "event_calendar",
    )?;

    let (alignment, verdict) = timeframe_alignment(&snapshot.trends);
    let momentum = momentum_score(ma_short, ma_long, oscillator);
    let sentiment = sentiment_score(&sentiment);
    let liquidity = if liquidity_ok { MAX_LIQUIDITY } else { 0.0 };
    let event_clearance = if event_within { 0.0 } else { MAX_EVENT_CLEARANCE };

    let total = alignment + momentum + sentiment + liquidity + event_clearance;

    Ok((
        ConfluenceScore {
            instrument: snapshot.instrument.clone(),
            timeframe_alignment: alignment,
            momentum,
            sentiment,
            liquidity,
            event_clearance,
            total,
            ts_utc: snapshot.captured_at_utc,
        },
        verdict,
    ))
}
