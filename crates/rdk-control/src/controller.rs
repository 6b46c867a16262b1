use crate::traits::{ControlError, EpisodeSink, ExecutionFailure, HedgeExecutor, SinkError};
use chrono::{DateTime, Utc};
use rdk_drawdown::DrawdownAssessment;
use rdk_exposure::ExposureReport;
use rdk_schemas::{
    DamageControlEpisode, Direction, HedgeIntent, ProtocolStep, RiskState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lock-free admission handle for order-entry callers. Cheap to clone and
/// safe to read concurrently with a cycle in progress; the flag flip is
/// visible no later than the cycle that set it completes.
#[derive(Clone, Debug)]
pub struct AdmissionGate {
    paused: Arc<AtomicBool>,
}

impl AdmissionGate {
    pub fn entries_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Hard rejection while paused — callers must treat this as a refusal,
    /// not a warning.
    pub fn check_entry(&self, _instrument: &str) -> Result<(), ControlError> {
        if self.entries_paused() {
            return Err(ControlError::EntriesPaused);
        }
        Ok(())
    }
}

/// Result of one controller step.
#[derive(Clone, Debug)]
pub struct CycleOutcome {
    pub state: RiskState,
    /// True only on the edge cycle that opened the episode.
    pub protocol_fired: bool,
    /// Hedge intents emitted or retried this cycle.
    pub hedges_emitted: Vec<HedgeIntent>,
    pub hedge_error: Option<ExecutionFailure>,
    pub seal_error: Option<SinkError>,
}

impl CycleOutcome {
    fn quiet(state: RiskState) -> Self {
        Self {
            state,
            protocol_fired: false,
            hedges_emitted: Vec::new(),
            hedge_error: None,
            seal_error: None,
        }
    }
}

/// The damage-control state machine.
pub struct DamageControlController {
    hard_threshold: f64,
    state: RiskState,
    entries_paused: Arc<AtomicBool>,
    episode: Option<DamageControlEpisode>,
    /// Hedges emitted but not yet accepted by the execution collaborator.
    pending_hedges: Vec<HedgeIntent>,
    /// Set once the open episode's action list reached the audit sink.
    actions_sealed: bool,
}

impl DamageControlController {
    pub fn new(hard_threshold: f64) -> Self {
        debug_assert!(hard_threshold > 0.0 && hard_threshold < 1.0);
        Self {
            hard_threshold,
            state: RiskState::Normal,
            entries_paused: Arc::new(AtomicBool::new(false)),
            episode: None,
            pending_hedges: Vec::new(),
            actions_sealed: false,
        }
    }

    pub fn state(&self) -> RiskState {
        self.state
    }

    pub fn open_episode(&self) -> Option<&DamageControlEpisode> {
        self.episode.as_ref()
    }

    pub fn entries_paused(&self) -> bool {
        self.entries_paused.load(Ordering::SeqCst)
    }

    /// Handle for concurrent admission readers.
    pub fn admission_gate(&self) -> AdmissionGate {
        AdmissionGate {
            paused: Arc::clone(&self.entries_paused),
        }
    }

    /// Hard rejection while paused; see `AdmissionGate::check_entry`.
    pub fn check_entry(&self, instrument: &str) -> Result<(), ControlError> {
        self.admission_gate().check_entry(instrument)
    }

    /// Drive one cycle. Called exactly once per risk cycle by the cycle
    /// driver, after drawdown observation and exposure evaluation.
    pub fn step(
        &mut self,
        assessment: &DrawdownAssessment,
        report: &ExposureReport,
        hedger: &mut dyn HedgeExecutor,
        sink: &mut dyn EpisodeSink,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        if let Some(episode) = self.episode.take() {
            // Already inside an episode: drawdown recovery does not exit;
            // only explicit review does. Retry whatever failed.
            return self.resume_open_episode(episode, hedger, sink, now);
        }

        // An exposure breach during Warning escalates; during Normal it is
        // reported but does not trigger (the book is not yet under stress).
        let escalate = assessment.risk_state == RiskState::DamageControl
            || (assessment.risk_state == RiskState::Warning && report.has_breach());

        if !escalate {
            self.state = assessment.risk_state;
            return CycleOutcome::quiet(self.state);
        }

        self.run_protocol(assessment, report, hedger, sink, now)
    }

    /// The five-step protocol, run exactly once per edge. Every step is
    /// recorded in the episode in order, even when a later step fails.
    fn run_protocol(
        &mut self,
        assessment: &DrawdownAssessment,
        report: &ExposureReport,
        hedger: &mut dyn HedgeExecutor,
        sink: &mut dyn EpisodeSink,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        self.state = RiskState::DamageControl;
        self.actions_sealed = false;

        // 1. Detect — capture trigger values.
        let mut episode =
            DamageControlEpisode::open(now, assessment.drawdown, report.breached_clusters());
        episode.record(
            now,
            ProtocolStep::Detect {
                drawdown: assessment.drawdown,
                peak_equity_micros: assessment.peak_equity_micros,
                balance_micros: assessment.balance_micros,
                breached_clusters: report.breached_clusters(),
            },
        );

        // 2. Assess — snapshot per-cluster net exposure.
        episode.record(
            now,
            ProtocolStep::Assess {
                cluster_net_micros: report.per_cluster_net_micros.clone(),
            },
        );

        // 3. Hedge — compute and emit intents.
        let intents = compute_hedge_intents(report);
        let mut hedge_error = None;
        if intents.is_empty() {
            // Nothing to neutralize (flat book); nothing pending.
        } else {
            match hedger.place_hedges(&intents) {
                Ok(()) => {
                    episode.record(now, ProtocolStep::Hedge { intents: intents.clone() });
                }
                Err(e) => {
                    episode.record(now, ProtocolStep::Hedge { intents: intents.clone() });
                    episode.record(
                        now,
                        ProtocolStep::HedgeFailed {
                            reason: e.reason.clone(),
                        },
                    );
                    self.pending_hedges = intents.clone();
                    hedge_error = Some(e);
                }
            }
        }

        // 4. Pause — flag set regardless of hedge outcome.
        self.entries_paused.store(true, Ordering::SeqCst);
        episode.record(now, ProtocolStep::Pause);

        // 5. Seal the action list — deferred while a hedge is unresolved so
        // the sealed list reflects what actually happened.
        let mut seal_error = None;
        if self.pending_hedges.is_empty() {
            seal_error = self.try_seal(&mut episode, sink, now);
        }

        self.episode = Some(episode);

        CycleOutcome {
            state: RiskState::DamageControl,
            protocol_fired: true,
            hedges_emitted: intents,
            hedge_error,
            seal_error,
        }
    }

    /// Retry the failed tail of the protocol: hedge placement, then sealing.
    /// Never re-runs Detect/Assess, never duplicates the pause.
    fn resume_open_episode(
        &mut self,
        mut episode: DamageControlEpisode,
        hedger: &mut dyn HedgeExecutor,
        sink: &mut dyn EpisodeSink,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        let mut retried = Vec::new();
        let mut hedge_error = None;

        if !self.pending_hedges.is_empty() {
            retried = self.pending_hedges.clone();
            match hedger.place_hedges(&retried) {
                Ok(()) => {
                    episode.record(now, ProtocolStep::Hedge { intents: retried.clone() });
                    self.pending_hedges.clear();
                }
                Err(e) => {
                    episode.record(
                        now,
                        ProtocolStep::HedgeFailed {
                            reason: e.reason.clone(),
                        },
                    );
                    hedge_error = Some(e);
                }
            }
        }

        let mut seal_error = None;
        if self.pending_hedges.is_empty() && !self.actions_sealed {
            seal_error = self.try_seal(&mut episode, sink, now);
        }

        self.episode = Some(episode);

        CycleOutcome {
            state: RiskState::DamageControl,
            protocol_fired: false,
            hedges_emitted: retried,
            hedge_error,
            seal_error,
        }
    }

    fn try_seal(
        &mut self,
        episode: &mut DamageControlEpisode,
        sink: &mut dyn EpisodeSink,
        now: DateTime<Utc>,
    ) -> Option<SinkError> {
        match sink.record_actions(episode) {
            Ok(()) => {
                episode.record(now, ProtocolStep::ActionsSealed);
                self.actions_sealed = true;
                None
            }
            Err(e) => Some(e),
        }
    }

    /// Explicit reviewer action: close the open episode and return to Normal.
    /// Refused while drawdown is still at or above the hard threshold.
    pub fn close_episode(
        &mut self,
        review_notes: impl Into<String>,
        current_drawdown: f64,
        now: DateTime<Utc>,
    ) -> Result<DamageControlEpisode, ControlError> {
        let Some(mut episode) = self.episode.take() else {
            return Err(ControlError::NoOpenEpisode);
        };
        if current_drawdown >= self.hard_threshold {
            self.episode = Some(episode);
            return Err(ControlError::PrematureClose {
                drawdown: current_drawdown,
                hard_threshold: self.hard_threshold,
            });
        }

        episode.closed_at = Some(now);
        episode.review_notes = Some(review_notes.into());

        self.entries_paused.store(false, Ordering::SeqCst);
        self.state = RiskState::Normal;
        self.pending_hedges.clear();
        self.actions_sealed = false;

        Ok(episode)
    }
}

/// Hedge intents that neutralize net cluster exposure, placed through each
/// cluster's largest member position. Breached clusters when the trigger was
/// an exposure breach; every exposed cluster when drawdown alone triggered.
fn compute_hedge_intents(report: &ExposureReport) -> Vec<HedgeIntent> {
    let breached = report.breached_clusters();
    let targets: Vec<&str> = if breached.is_empty() {
        report
            .per_cluster_net_micros
            .iter()
            .filter(|(_, net)| **net != 0)
            .map(|(id, _)| id.as_str())
            .collect()
    } else {
        breached.iter().map(String::as_str).collect()
    };

    let mut intents = Vec::new();
    for cluster_id in targets {
        let net = report
            .per_cluster_net_micros
            .get(cluster_id)
            .copied()
            .unwrap_or(0);
        if net == 0 {
            continue;
        }

        let instrument = report
            .per_cluster_member_net_micros
            .get(cluster_id)
            .and_then(|members| {
                members
                    .iter()
                    .max_by_key(|(_, v)| v.unsigned_abs())
                    .map(|(m, _)| m.clone())
            });
        let Some(instrument) = instrument else {
            continue;
        };

        intents.push(HedgeIntent {
            cluster_id: cluster_id.to_string(),
            instrument,
            side: if net > 0 {
                Direction::Short
            } else {
                Direction::Long
            },
            notional_micros: net.abs(),
        });
    }
    intents
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rdk_config::{ClusterConfig, EngineConfig};
    use rdk_schemas::{Position, MICROS_SCALE};

    // Minimal local doubles; full-featured ones live in rdk-testkit.
    struct OkHedger {
        placed: Vec<Vec<HedgeIntent>>,
    }

    impl OkHedger {
        fn new() -> Self {
            Self { placed: Vec::new() }
        }
    }

    impl HedgeExecutor for OkHedger {
        fn place_hedges(&mut self, intents: &[HedgeIntent]) -> Result<(), ExecutionFailure> {
            self.placed.push(intents.to_vec());
            Ok(())
        }
    }

    struct FailingHedger {
        failures_left: u32,
        attempts: u32,
    }

    impl HedgeExecutor for FailingHedger {
        fn place_hedges(&mut self, _intents: &[HedgeIntent]) -> Result<(), ExecutionFailure> {
            self.attempts += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(ExecutionFailure::new("broker rejected"));
            }
            Ok(())
        }
    }

    struct OkSink {
        sealed: Vec<DamageControlEpisode>,
    }

    impl OkSink {
        fn new() -> Self {
            Self { sealed: Vec::new() }
        }
    }

    impl EpisodeSink for OkSink {
        fn record_actions(&mut self, episode: &DamageControlEpisode) -> Result<(), SinkError> {
            self.sealed.push(episode.clone());
            Ok(())
        }
    }

    struct FailingSink {
        failures_left: u32,
        sealed: usize,
    }

    impl EpisodeSink for FailingSink {
        fn record_actions(&mut self, _episode: &DamageControlEpisode) -> Result<(), SinkError> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(SinkError::new("audit log unavailable"));
            }
            self.sealed += 1;
            Ok(())
        }
    }

    fn ts(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, 10, min, 0).unwrap()
    }

    fn assessment(state: RiskState, drawdown: f64) -> DrawdownAssessment {
        DrawdownAssessment {
            risk_state: state,
            drawdown,
            peak_equity_micros: 100_000 * MICROS_SCALE,
            balance_micros: ((1.0 - drawdown) * 100_000.0) as i64 * MICROS_SCALE,
            at_utc: ts(0),
        }
    }

    fn cfg_with_cluster() -> EngineConfig {
        let mut cfg = EngineConfig::sane_defaults();
        cfg.clusters = vec![ClusterConfig {
            cluster_id: "usd-majors".into(),
            members: vec!["EURUSD".into(), "GBPUSD".into()],
            cap_micros: 40_000 * MICROS_SCALE,
        }];
        cfg
    }

    fn exposed_report() -> ExposureReport {
        let positions = vec![
            Position::new("EURUSD", 30_000 * MICROS_SCALE, Direction::Long),
            Position::new("GBPUSD", 10_000 * MICROS_SCALE, Direction::Long),
        ];
        rdk_exposure::evaluate(&positions, &cfg_with_cluster())
    }

    fn breached_report() -> ExposureReport {
        let positions = vec![
            Position::new("EURUSD", 30_000 * MICROS_SCALE, Direction::Long),
            Position::new("GBPUSD", 30_000 * MICROS_SCALE, Direction::Long),
        ];
        rdk_exposure::evaluate(&positions, &cfg_with_cluster())
    }

    fn step_names(ep: &DamageControlEpisode) -> Vec<&'static str> {
        ep.steps
            .iter()
            .map(|s| match s.step {
                ProtocolStep::Detect { .. } => "detect",
                ProtocolStep::Assess { .. } => "assess",
                ProtocolStep::Hedge { .. } => "hedge",
                ProtocolStep::HedgeFailed { .. } => "hedge_failed",
                ProtocolStep::Pause => "pause",
                ProtocolStep::ActionsSealed => "sealed",
            })
            .collect()
    }

    #[test]
    fn normal_and_warning_are_quiet() {
        let mut c = DamageControlController::new(0.10);
        let mut h = OkHedger::new();
        let mut s = OkSink::new();

        let out = c.step(
            &assessment(RiskState::Normal, 0.01),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(1),
        );
        assert_eq!(out.state, RiskState::Normal);
        assert!(!out.protocol_fired);

        let out = c.step(
            &assessment(RiskState::Warning, 0.06),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(2),
        );
        assert_eq!(out.state, RiskState::Warning);
        assert!(!out.protocol_fired);
        assert!(!c.entries_paused());
        assert!(h.placed.is_empty());
    }

    #[test]
    fn hard_drawdown_edge_runs_full_protocol_in_order() {
        let mut c = DamageControlController::new(0.10);
        let mut h = OkHedger::new();
        let mut s = OkSink::new();

        let out = c.step(
            &assessment(RiskState::DamageControl, 0.11),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(1),
        );

        assert!(out.protocol_fired);
        assert_eq!(out.state, RiskState::DamageControl);
        assert!(c.entries_paused());
        assert_eq!(h.placed.len(), 1);
        assert_eq!(s.sealed.len(), 1);

        let ep = c.open_episode().unwrap();
        assert_eq!(
            step_names(ep),
            vec!["detect", "assess", "hedge", "pause", "sealed"]
        );
        // Hedge neutralizes the 40k net long through the largest member.
        assert_eq!(out.hedges_emitted.len(), 1);
        assert_eq!(out.hedges_emitted[0].instrument, "EURUSD");
        assert_eq!(out.hedges_emitted[0].side, Direction::Short);
        assert_eq!(out.hedges_emitted[0].notional_micros, 40_000 * MICROS_SCALE);
    }

    #[test]
    fn warning_with_exposure_breach_escalates() {
        let mut c = DamageControlController::new(0.10);
        let mut h = OkHedger::new();
        let mut s = OkSink::new();

        let out = c.step(
            &assessment(RiskState::Warning, 0.07),
            &breached_report(),
            &mut h,
            &mut s,
            ts(1),
        );
        assert!(out.protocol_fired);
        assert_eq!(c.state(), RiskState::DamageControl);
        let ep = c.open_episode().unwrap();
        assert_eq!(ep.trigger_clusters, vec!["usd-majors".to_string()]);
    }

    #[test]
    fn normal_with_breach_does_not_escalate() {
        let mut c = DamageControlController::new(0.10);
        let mut h = OkHedger::new();
        let mut s = OkSink::new();

        let out = c.step(
            &assessment(RiskState::Normal, 0.01),
            &breached_report(),
            &mut h,
            &mut s,
            ts(1),
        );
        assert!(!out.protocol_fired);
        assert_eq!(out.state, RiskState::Normal);
    }

    #[test]
    fn protocol_fires_exactly_once_across_many_breach_cycles() {
        let mut c = DamageControlController::new(0.10);
        let mut h = OkHedger::new();
        let mut s = OkSink::new();

        for i in 1..=5 {
            let out = c.step(
                &assessment(RiskState::DamageControl, 0.12),
                &exposed_report(),
                &mut h,
                &mut s,
                ts(i),
            );
            assert_eq!(out.protocol_fired, i == 1, "cycle {i}");
        }
        // One hedge placement, one seal, steps not duplicated.
        assert_eq!(h.placed.len(), 1);
        assert_eq!(s.sealed.len(), 1);
        let ep = c.open_episode().unwrap();
        assert_eq!(
            step_names(ep),
            vec!["detect", "assess", "hedge", "pause", "sealed"]
        );
    }

    #[test]
    fn hedge_failure_pauses_anyway_and_retries_only_the_hedge() {
        let mut c = DamageControlController::new(0.10);
        let mut h = FailingHedger {
            failures_left: 2,
            attempts: 0,
        };
        let mut s = OkSink::new();

        let out = c.step(
            &assessment(RiskState::DamageControl, 0.12),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(1),
        );
        assert!(out.protocol_fired);
        assert!(out.hedge_error.is_some());
        // Pause still happened; seal deferred while the hedge is unresolved.
        assert!(c.entries_paused());
        assert_eq!(s.sealed.len(), 0);

        // Cycle 2: retry fails again.
        let out = c.step(
            &assessment(RiskState::DamageControl, 0.12),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(2),
        );
        assert!(!out.protocol_fired);
        assert!(out.hedge_error.is_some());

        // Cycle 3: retry succeeds; action list seals.
        let out = c.step(
            &assessment(RiskState::DamageControl, 0.12),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(3),
        );
        assert!(out.hedge_error.is_none());
        assert_eq!(h.attempts, 3);
        assert_eq!(s.sealed.len(), 1);

        let ep = c.open_episode().unwrap();
        assert_eq!(
            step_names(ep),
            vec![
                "detect",
                "assess",
                "hedge",
                "hedge_failed",
                "pause",
                "hedge_failed",
                "hedge",
                "sealed"
            ]
        );
        // Detect/Assess ran once; pause recorded once.
        assert_eq!(step_names(ep).iter().filter(|n| **n == "detect").count(), 1);
        assert_eq!(step_names(ep).iter().filter(|n| **n == "pause").count(), 1);
    }

    #[test]
    fn sink_failure_leaves_episode_unsealed_and_retries() {
        let mut c = DamageControlController::new(0.10);
        let mut h = OkHedger::new();
        let mut s = FailingSink {
            failures_left: 1,
            sealed: 0,
        };

        let out = c.step(
            &assessment(RiskState::DamageControl, 0.12),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(1),
        );
        assert!(out.seal_error.is_some());
        assert_eq!(s.sealed, 0);

        let out = c.step(
            &assessment(RiskState::DamageControl, 0.12),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(2),
        );
        assert!(out.seal_error.is_none());
        assert_eq!(s.sealed, 1);
        // Hedge not re-placed on the seal retry.
        assert_eq!(h.placed.len(), 1);
    }

    #[test]
    fn recovery_does_not_exit_damage_control() {
        let mut c = DamageControlController::new(0.10);
        let mut h = OkHedger::new();
        let mut s = OkSink::new();

        c.step(
            &assessment(RiskState::DamageControl, 0.11),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(1),
        );
        // Balance recovered: monitor now says Normal, controller stays put.
        let out = c.step(
            &assessment(RiskState::Normal, 0.01),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(2),
        );
        assert_eq!(out.state, RiskState::DamageControl);
        assert!(c.entries_paused());
    }

    #[test]
    fn admission_rejected_while_paused_until_reviewed_close() {
        let mut c = DamageControlController::new(0.10);
        let mut h = OkHedger::new();
        let mut s = OkSink::new();
        let gate = c.admission_gate();

        assert!(gate.check_entry("EURUSD").is_ok());

        c.step(
            &assessment(RiskState::DamageControl, 0.11),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(1),
        );
        assert_eq!(gate.check_entry("EURUSD"), Err(ControlError::EntriesPaused));
        assert_eq!(c.check_entry("USDJPY"), Err(ControlError::EntriesPaused));

        c.close_episode("reviewed: flows normalized", 0.01, ts(5)).unwrap();
        assert!(gate.check_entry("EURUSD").is_ok());
        assert_eq!(c.state(), RiskState::Normal);
    }

    #[test]
    fn premature_close_always_fails_while_in_breach() {
        let mut c = DamageControlController::new(0.10);
        let mut h = OkHedger::new();
        let mut s = OkSink::new();

        c.step(
            &assessment(RiskState::DamageControl, 0.12),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(1),
        );

        for _ in 0..3 {
            let err = c.close_episode("too early", 0.12, ts(2)).unwrap_err();
            assert!(matches!(err, ControlError::PrematureClose { .. }));
            assert!(c.open_episode().is_some());
            assert!(c.entries_paused());
        }

        // Exactly at the threshold still counts as in breach.
        assert!(c.close_episode("still at hard", 0.10, ts(3)).is_err());
        assert!(c.close_episode("recovered", 0.09, ts(4)).is_ok());
    }

    #[test]
    fn close_without_open_episode_is_an_error() {
        let mut c = DamageControlController::new(0.10);
        assert_eq!(
            c.close_episode("nothing open", 0.0, ts(1)).unwrap_err(),
            ControlError::NoOpenEpisode
        );
    }

    #[test]
    fn closed_episode_carries_review_notes_and_close_time() {
        let mut c = DamageControlController::new(0.10);
        let mut h = OkHedger::new();
        let mut s = OkSink::new();

        c.step(
            &assessment(RiskState::DamageControl, 0.11),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(1),
        );
        let ep = c.close_episode("ok to resume", 0.02, ts(9)).unwrap();
        assert_eq!(ep.closed_at, Some(ts(9)));
        assert_eq!(ep.review_notes.as_deref(), Some("ok to resume"));
        assert!(ep.is_closed());
        // Re-entry is possible after closure.
        let out = c.step(
            &assessment(RiskState::DamageControl, 0.15),
            &exposed_report(),
            &mut h,
            &mut s,
            ts(10),
        );
        assert!(out.protocol_fired);
    }

    #[test]
    fn flat_book_protocol_skips_hedge_but_still_pauses_and_seals() {
        let mut c = DamageControlController::new(0.10);
        let mut h = OkHedger::new();
        let mut s = OkSink::new();

        let empty = rdk_exposure::evaluate(&[], &cfg_with_cluster());
        let out = c.step(
            &assessment(RiskState::DamageControl, 0.11),
            &empty,
            &mut h,
            &mut s,
            ts(1),
        );
        assert!(out.protocol_fired);
        assert!(out.hedges_emitted.is_empty());
        assert!(h.placed.is_empty());
        assert!(c.entries_paused());
        assert_eq!(s.sealed.len(), 1);
        assert_eq!(
            step_names(c.open_episode().unwrap()),
            vec!["detect", "assess", "pause", "sealed"]
        );
    }
}
