//! Bias formation: directional lean with confidence, derived from the
//! scorer's alignment verdict plus sentiment. Stateless between evaluations —
//! no memory of prior bias beyond what the trend inputs already encode.

use crate::confluence::{sentiment_value, AlignmentVerdict};
use crate::types::{InstrumentSnapshot, SignalError};
use rdk_schemas::{BiasDirection, MarketBias, Timeframe, TrendDirection};

/// Weighting of timeframe agreement vs sentiment alignment in confidence.
const ALIGNMENT_WEIGHT: f64 = 0.7;
const SENTIMENT_WEIGHT: f64 = 0.3;

/// Form a directional bias for one instrument.
///
/// `verdict` comes from `confluence::score` for the same snapshot — trend
/// direction is never recomputed here. Rule: Bullish iff monthly and weekly
/// both trend up and sentiment does not strongly contradict (below
/// `-contradiction_threshold`); symmetric for Bearish; otherwise Neutral.
pub fn form_bias(
    snapshot: &InstrumentSnapshot,
    verdict: &AlignmentVerdict,
    contradiction_threshold: f64,
) -> Result<MarketBias, SignalError> {
    let missing = |field: &'static str| SignalError::IncompleteScore {
        instrument: snapshot.instrument.clone(),
        missing: field,
    };

    let monthly = verdict
        .per_timeframe
        .get(&Timeframe::Monthly)
        .copied()
        .ok_or_else(|| missing("trend_monthly"))?;
    let weekly = verdict
        .per_timeframe
        .get(&Timeframe::Weekly)
        .copied()
        .ok_or_else(|| missing("trend_weekly"))?;
    let reading = snapshot.sentiment.ok_or_else(|| missing("sentiment"))?;

    let sentiment = sentiment_value(&reading);

    let mut up_votes = 0u8;
    let mut down_votes = 0u8;
    for tf in Timeframe::ALL {
        match verdict.per_timeframe.get(&tf) {
            Some(TrendDirection::Up) => up_votes += 1,
            Some(TrendDirection::Down) => down_votes += 1,
            _ => {}
        }
    }

    let bullish_support = (ALIGNMENT_WEIGHT * f64::from(up_votes) / 4.0
        + SENTIMENT_WEIGHT * sentiment.max(0.0))
    .clamp(0.0, 1.0);
    let bearish_support = (ALIGNMENT_WEIGHT * f64::from(down_votes) / 4.0
        + SENTIMENT_WEIGHT * (-sentiment).max(0.0))
    .clamp(0.0, 1.0);

    let bullish = monthly == TrendDirection::Up
        && weekly == TrendDirection::Up
        && sentiment >= -contradiction_threshold;
    let bearish = monthly == TrendDirection::Down
        && weekly == TrendDirection::Down
        && sentiment <= contradiction_threshold;

    let (direction, confidence) = if bullish {
        (BiasDirection::Bullish, bullish_support)
    } else if bearish {
        (BiasDirection::Bearish, bearish_support)
    } else {
        (
            BiasDirection::Neutral,
            (1.0 - bullish_support.max(bearish_support)).clamp(0.0, 1.0),
        )
    };

    Ok(MarketBias {
        instrument: snapshot.instrument.clone(),
        direction,
        confidence,
        ts_utc: snapshot.captured_at_utc,
    })
}
