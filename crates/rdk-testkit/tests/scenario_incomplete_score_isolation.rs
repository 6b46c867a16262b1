//! One instrument with a broken feed must not take the cycle down: scoring
//! failures and fetch failures each skip only their own instrument, and the
//! drawdown/exposure side of the cycle runs regardless.

use chrono::{TimeZone, Utc};
use rdk_config::EngineConfig;
use rdk_runtime::RiskEngine;
use rdk_schemas::{RiskState, TrendDirection, MICROS_SCALE};
use rdk_signal::InstrumentSnapshot;
use rdk_testkit::{complete_snapshot, FlakyHedger, ScriptedMarket, StaticBroker};
use uuid::Uuid;

#[test]
fn broken_feeds_skip_their_instrument_only() {
    let ts = Utc.with_ymd_and_hms(2026, 5, 5, 8, 0, 0).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut engine = RiskEngine::new(
        EngineConfig::sane_defaults(),
        vec![
            "EURUSD".into(),
            "GBPUSD".into(),
            "USDJPY".into(),
            "XAUUSD".into(),
        ],
        dir.path().join("audit.jsonl"),
        Uuid::new_v4(),
    )
    .unwrap();

    // GBPUSD is missing its oscillator; XAUUSD is not scripted at all.
    let gbpusd_partial = {
        let mut snap = complete_snapshot("GBPUSD", TrendDirection::Up, ts);
        snap.oscillator = None;
        snap
    };
    let mut market = ScriptedMarket::new()
        .with(complete_snapshot("EURUSD", TrendDirection::Up, ts))
        .with(gbpusd_partial)
        .with(complete_snapshot("USDJPY", TrendDirection::Down, ts));

    let mut broker = StaticBroker::new(50_000 * MICROS_SCALE);
    let mut hedger = FlakyHedger::accepting();

    let report = engine
        .run_cycle(&mut broker, &mut market, &mut hedger, ts)
        .unwrap();

    let mut scored: Vec<&str> = report.signals.iter().map(|s| s.instrument.as_str()).collect();
    scored.sort_unstable();
    assert_eq!(scored, vec!["EURUSD", "USDJPY"]);

    assert_eq!(report.skipped.len(), 2);
    let skipped_gbp = report
        .skipped
        .iter()
        .find(|(i, _)| i == "GBPUSD")
        .expect("GBPUSD skipped");
    assert!(
        skipped_gbp.1.contains("INCOMPLETE_SCORE") && skipped_gbp.1.contains("oscillator"),
        "{}",
        skipped_gbp.1
    );
    assert!(report.skipped.iter().any(|(i, _)| i == "XAUUSD"));

    // The risk side of the cycle was unaffected.
    assert_eq!(report.assessment.risk_state, RiskState::Normal);
    assert_eq!(
        report.assessment.balance_micros,
        50_000 * MICROS_SCALE
    );

    // A second cycle with the feed repaired scores all four.
    let ts2 = Utc.with_ymd_and_hms(2026, 5, 5, 8, 5, 0).unwrap();
    market.script(complete_snapshot("GBPUSD", TrendDirection::Up, ts2));
    market.script(complete_snapshot("XAUUSD", TrendDirection::Up, ts2));
    let report = engine
        .run_cycle(&mut broker, &mut market, &mut hedger, ts2)
        .unwrap();
    assert_eq!(report.signals.len(), 4);
    assert!(report.skipped.is_empty());
}

#[test]
fn identical_snapshots_score_identically() {
    // Determinism across engines: same inputs, same totals and biases.
    let ts = Utc.with_ymd_and_hms(2026, 5, 5, 9, 0, 0).unwrap();
    let snap: InstrumentSnapshot = complete_snapshot("EURUSD", TrendDirection::Up, ts);

    let (score_a, verdict_a) = rdk_signal::score(&snap).unwrap();
    let (score_b, verdict_b) = rdk_signal::score(&snap).unwrap();
    assert_eq!(score_a, score_b);
    assert_eq!(
        rdk_signal::form_bias(&snap, &verdict_a, 0.6).unwrap(),
        rdk_signal::form_bias(&snap, &verdict_b, 0.6).unwrap()
    );
}
