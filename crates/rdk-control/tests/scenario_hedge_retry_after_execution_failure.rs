//! Execution failure during the hedge step must not abort the protocol:
//! entries still pause on the trigger cycle, and only the failed tail
//! (hedge, then seal) is retried on subsequent cycles.

use chrono::{DateTime, TimeZone, Utc};
use rdk_config::{ClusterConfig, EngineConfig};
use rdk_control::{
    DamageControlController, EpisodeSink, ExecutionFailure, HedgeExecutor, SinkError,
};
use rdk_drawdown::DrawdownAssessment;
use rdk_schemas::{DamageControlEpisode, Direction, HedgeIntent, Position, RiskState, MICROS_SCALE};

struct FlakyHedger {
    failures_left: u32,
    placed: Vec<Vec<HedgeIntent>>,
}

impl HedgeExecutor for FlakyHedger {
    fn place_hedges(&mut self, intents: &[HedgeIntent]) -> Result<(), ExecutionFailure> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(ExecutionFailure::new("venue closed"));
        }
        self.placed.push(intents.to_vec());
        Ok(())
    }
}

struct MemorySink {
    sealed: Vec<DamageControlEpisode>,
}

impl EpisodeSink for MemorySink {
    fn record_actions(&mut self, episode: &DamageControlEpisode) -> Result<(), SinkError> {
        self.sealed.push(episode.clone());
        Ok(())
    }
}

fn ts(min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 15, min, 0).unwrap()
}

fn assessment(i: u32) -> DrawdownAssessment {
    DrawdownAssessment {
        risk_state: RiskState::DamageControl,
        drawdown: 0.11,
        peak_equity_micros: 200_000 * MICROS_SCALE,
        balance_micros: 178_000 * MICROS_SCALE,
        at_utc: ts(i),
    }
}

#[test]
fn hedge_is_retried_until_accepted_then_episode_seals() {
    let mut cfg = EngineConfig::sane_defaults();
    cfg.clusters = vec![ClusterConfig {
        cluster_id: "energies".into(),
        members: vec!["WTI".into(), "BRENT".into()],
        cap_micros: 80_000 * MICROS_SCALE,
    }];
    let positions = vec![
        Position::new("WTI", 45_000 * MICROS_SCALE, Direction::Short),
        Position::new("BRENT", 15_000 * MICROS_SCALE, Direction::Short),
    ];
    let report = rdk_exposure::evaluate(&positions, &cfg);

    let mut controller = DamageControlController::new(cfg.hard_threshold);
    let mut hedger = FlakyHedger {
        failures_left: 2,
        placed: Vec::new(),
    };
    let mut sink = MemorySink { sealed: Vec::new() };

    // Trigger cycle: hedge rejected, pause happens anyway, no seal yet.
    let out = controller.step(&assessment(1), &report, &mut hedger, &mut sink, ts(1));
    assert!(out.protocol_fired);
    assert!(out.hedge_error.is_some());
    assert!(controller.entries_paused());
    assert!(sink.sealed.is_empty());

    // Second failure, then acceptance.
    let out = controller.step(&assessment(2), &report, &mut hedger, &mut sink, ts(2));
    assert!(!out.protocol_fired);
    assert!(out.hedge_error.is_some());

    let out = controller.step(&assessment(3), &report, &mut hedger, &mut sink, ts(3));
    assert!(out.hedge_error.is_none());
    assert!(out.seal_error.is_none());
    assert_eq!(hedger.placed.len(), 1);
    assert_eq!(sink.sealed.len(), 1);

    // The accepted hedge neutralizes the 60k net short through WTI.
    let placed = &hedger.placed[0];
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].instrument, "WTI");
    assert_eq!(placed[0].side, Direction::Long);
    assert_eq!(placed[0].notional_micros, 60_000 * MICROS_SCALE);

    // Once sealed, further cycles are steady-state.
    let before = controller.open_episode().unwrap().steps.len();
    controller.step(&assessment(4), &report, &mut hedger, &mut sink, ts(4));
    assert_eq!(controller.open_episode().unwrap().steps.len(), before);
    assert_eq!(sink.sealed.len(), 1);
}
