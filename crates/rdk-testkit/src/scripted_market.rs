use anyhow::Result;
use chrono::{DateTime, Utc};
use rdk_runtime::MarketView;
use rdk_schemas::TrendDirection;
use rdk_signal::InstrumentSnapshot;
use std::collections::BTreeMap;

/// Market double serving pre-scripted snapshots by instrument. Asking for an
/// unscripted instrument fails the fetch, which the engine treats as a skip.
#[derive(Clone, Debug, Default)]
pub struct ScriptedMarket {
    snapshots: BTreeMap<String, InstrumentSnapshot>,
}

impl ScriptedMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&mut self, snapshot: InstrumentSnapshot) {
        self.snapshots.insert(snapshot.instrument.clone(), snapshot);
    }

    pub fn with(mut self, snapshot: InstrumentSnapshot) -> Self {
        self.script(snapshot);
        self
    }
}

impl MarketView for ScriptedMarket {
    fn instrument_snapshot(&mut self, instrument: &str) -> Result<InstrumentSnapshot> {
        self.snapshots
            .get(instrument)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no snapshot scripted for {instrument}"))
    }
}

/// A snapshot with every scoring input present: uniform trend, golden-cross
/// MAs for an Up trend (inverted for Down), mid-range oscillator, mildly
/// supportive sentiment, liquid, no event inside the lookahead.
pub fn complete_snapshot(
    instrument: &str,
    trend: TrendDirection,
    at_utc: DateTime<Utc>,
) -> InstrumentSnapshot {
    let (ma_short, ma_long, positioning) = match trend {
        TrendDirection::Down => (1_090_000, 1_100_000, -0.5),
        _ => (1_110_000, 1_100_000, 0.5),
    };
    InstrumentSnapshot::new(instrument, at_utc)
        .with_uniform_trend(trend)
        .with_mas(ma_short, ma_long)
        .with_oscillator(50.0)
        .with_sentiment(positioning, -0.1)
        .with_liquidity(true)
        .with_event_within_lookahead(false)
}
