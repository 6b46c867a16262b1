//! rdk-signal
//!
//! Confluence scorer + bias engine.
//!
//! - Five clamped sub-scores (3/3/2/1/1) summing to a 0–10 confluence total
//! - Multi-timeframe alignment with monthly tie-break
//! - Directional bias with confidence, reusing the scorer's alignment verdict
//!
//! Deterministic, pure logic. No IO, no clocks, no hidden state: identical
//! snapshots always produce identical scores, so every evaluation is
//! replayable against historical snapshots.

mod bias;
mod confluence;
mod types;

pub use bias::form_bias;
pub use confluence::{
    momentum_score, score, sentiment_score, sentiment_value, timeframe_alignment,
    AlignmentVerdict, MAX_EVENT_CLEARANCE, MAX_LIQUIDITY, MAX_MOMENTUM, MAX_SENTIMENT,
    MAX_TIMEFRAME_ALIGNMENT,
};
pub use types::{InstrumentSnapshot, SentimentReading, SignalError};
