use crate::traits::{BrokerView, MarketView};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rdk_audit::{AuditKind, AuditLog, JsonlEpisodeSink};
use rdk_config::EngineConfig;
use rdk_control::{AdmissionGate, ControlError, DamageControlController, HedgeExecutor};
use rdk_drawdown::{DrawdownAssessment, DrawdownMonitor, DrawdownThresholds};
use rdk_exposure::ExposureReport;
use rdk_schemas::{
    ConfluenceScore, DamageControlEpisode, EquityPoint, HedgeIntent, MarketBias, RiskState,
};
use rdk_signal::{InstrumentSnapshot, SignalError};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Score + bias for one instrument in one cycle.
#[derive(Clone, Debug, serde::Serialize)]
pub struct InstrumentSignal {
    pub instrument: String,
    pub score: ConfluenceScore,
    pub bias: MarketBias,
}

/// Everything one cycle produced.
#[derive(Clone, Debug)]
pub struct CycleReport {
    pub at_utc: DateTime<Utc>,
    pub assessment: DrawdownAssessment,
    pub exposure: ExposureReport,
    pub signals: Vec<InstrumentSignal>,
    /// Instruments skipped this cycle, with the reason.
    pub skipped: Vec<(String, String)>,
    pub protocol_fired: bool,
    pub hedges_emitted: Vec<HedgeIntent>,
    pub entries_paused: bool,
}

/// Point-in-time engine state for operators and dashboards.
#[derive(Clone, Debug)]
pub struct EngineStatus {
    pub risk_state: RiskState,
    pub drawdown: f64,
    pub peak_equity_micros: i64,
    pub entries_paused: bool,
    pub open_episode_id: Option<Uuid>,
    pub halted: bool,
    pub config_hash: String,
}

/// The assembled engine. Single writer: exactly one caller drives
/// `run_cycle` and `close_episode`; concurrent admission checks go through
/// the lock-free [`AdmissionGate`].
pub struct RiskEngine {
    config: EngineConfig,
    config_hash: String,
    watchlist: Vec<String>,
    monitor: DrawdownMonitor,
    controller: DamageControlController,
    audit: JsonlEpisodeSink,
}

impl RiskEngine {
    /// Build an engine from a validated config. The audit log at `audit_path`
    /// is resumed if it exists; a session-start record pins the config hash.
    pub fn new(
        config: EngineConfig,
        watchlist: Vec<String>,
        audit_path: impl AsRef<Path>,
        session_id: Uuid,
    ) -> Result<Self> {
        config.validate()?;
        let config_hash = config.config_hash()?;

        let thresholds = DrawdownThresholds::new(config.soft_threshold, config.hard_threshold)
            .map_err(|e| anyhow::anyhow!(e))?;
        let monitor = DrawdownMonitor::new(thresholds);
        let controller = DamageControlController::new(config.hard_threshold);

        let mut log = AuditLog::resume(audit_path, session_id)?;
        log.append(
            Utc::now(),
            AuditKind::SessionStart {
                config_hash: config_hash.clone(),
            },
        )
        .context("write session-start audit record")?;

        Ok(Self {
            config,
            config_hash,
            watchlist,
            monitor,
            controller,
            audit: JsonlEpisodeSink::new(log),
        })
    }

    /// Restart path: rebuild the peak from the persisted equity log before
    /// the first cycle, so a restart mid-drawdown cannot launder the peak.
    pub fn restore_equity_history(&mut self, points: &[EquityPoint]) -> Result<()> {
        self.monitor = DrawdownMonitor::from_history(self.monitor.thresholds(), points)
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// Lock-free admission handle for order-entry callers.
    pub fn admission_gate(&self) -> AdmissionGate {
        self.controller.admission_gate()
    }

    /// Admission check on the driver thread.
    pub fn check_entry(&self, instrument: &str) -> Result<(), ControlError> {
        self.controller.check_entry(instrument)
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            risk_state: self.controller.state(),
            drawdown: self.monitor.current_drawdown(),
            peak_equity_micros: self.monitor.peak_equity_micros(),
            entries_paused: self.controller.entries_paused(),
            open_episode_id: self.controller.open_episode().map(|e| e.episode_id),
            halted: self.monitor.is_halted(),
            config_hash: self.config_hash.clone(),
        }
    }

    /// Run one full risk cycle at `now`.
    ///
    /// Aborts (previous state retained) when the broker cannot be read or the
    /// equity observation is rejected by the monitor. Per-instrument signal
    /// failures and audit write failures never abort the cycle.
    pub fn run_cycle(
        &mut self,
        broker: &mut dyn BrokerView,
        market: &mut dyn MarketView,
        hedger: &mut dyn HedgeExecutor,
        now: DateTime<Utc>,
    ) -> Result<CycleReport> {
        let positions = broker.positions().context("fetch positions")?;
        let balance_micros = broker
            .account_balance_micros()
            .context("fetch account balance")?;

        // Snapshot fetch is collaborator IO and stays serial; scoring is pure
        // and fans out below.
        let mut snapshots: Vec<InstrumentSnapshot> = Vec::new();
        let mut skipped: Vec<(String, String)> = Vec::new();
        for instrument in &self.watchlist {
            match market.instrument_snapshot(instrument) {
                Ok(snap) => snapshots.push(snap),
                Err(e) => {
                    warn!(instrument = instrument.as_str(), error = %e, "snapshot unavailable, skipping instrument");
                    skipped.push((instrument.clone(), e.to_string()));
                }
            }
        }

        let threshold = self.config.sentiment_contradiction_threshold;
        let scored: Vec<Result<InstrumentSignal, SignalError>> = snapshots
            .par_iter()
            .map(|snap| {
                let (score, verdict) = rdk_signal::score(snap)?;
                let bias = rdk_signal::form_bias(snap, &verdict, threshold)?;
                Ok(InstrumentSignal {
                    instrument: snap.instrument.clone(),
                    score,
                    bias,
                })
            })
            .collect();

        let mut signals = Vec::new();
        for result in scored {
            match result {
                Ok(sig) => signals.push(sig),
                Err(e) => {
                    let SignalError::IncompleteScore { ref instrument, .. } = e;
                    warn!(instrument = instrument.as_str(), error = %e, "instrument skipped this cycle");
                    skipped.push((instrument.clone(), e.to_string()));
                }
            }
        }

        let exposure = rdk_exposure::evaluate(&positions, &self.config);

        let assessment = self
            .monitor
            .observe(balance_micros, now)
            .map_err(|e| anyhow::anyhow!(e))
            .context("equity observation rejected, cycle aborted")?;

        let outcome = self
            .controller
            .step(&assessment, &exposure, hedger, &mut self.audit, now);
        if let Some(e) = &outcome.hedge_error {
            warn!(error = %e, "hedge placement failed, will retry next cycle");
        }
        if let Some(e) = &outcome.seal_error {
            warn!(error = %e, "episode seal failed, will retry next cycle");
        }

        self.append_cycle_audit(&signals, &assessment, &exposure, now);

        info!(
            risk_state = %outcome.state,
            drawdown = assessment.drawdown,
            scored = signals.len(),
            skipped = skipped.len(),
            breaches = exposure.cluster_breaches.len() + exposure.instrument_breaches.len(),
            protocol_fired = outcome.protocol_fired,
            "cycle complete"
        );

        Ok(CycleReport {
            at_utc: now,
            assessment,
            exposure,
            signals,
            skipped,
            protocol_fired: outcome.protocol_fired,
            hedges_emitted: outcome.hedges_emitted,
            entries_paused: self.controller.entries_paused(),
        })
    }

    /// Reviewer action: close the open damage-control episode. Refused while
    /// drawdown is still at or above the hard threshold. On success the peak
    /// rebases to the current balance, starting a fresh drawdown episode.
    pub fn close_episode(
        &mut self,
        review_notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<DamageControlEpisode> {
        let episode = self
            .controller
            .close_episode(review_notes, self.monitor.current_drawdown(), now)
            .map_err(|e| anyhow::anyhow!(e))?;

        if let Some(balance) = self.monitor.last_balance_micros() {
            self.monitor
                .rebase_peak(balance)
                .map_err(|e| anyhow::anyhow!(e))?;
        }

        let notes = episode.review_notes.clone().unwrap_or_default();
        if let Err(e) = self.audit.log_mut().append(
            now,
            AuditKind::EpisodeClosed {
                episode_id: episode.episode_id,
                review_notes: notes,
            },
        ) {
            warn!(error = %e, "audit write failed for episode close");
        }

        info!(episode_id = %episode.episode_id, "damage-control episode closed by review");
        Ok(episode)
    }

    fn append_cycle_audit(
        &mut self,
        signals: &[InstrumentSignal],
        assessment: &DrawdownAssessment,
        exposure: &ExposureReport,
        now: DateTime<Utc>,
    ) {
        let log = self.audit.log_mut();
        for sig in signals {
            if let Err(e) = log.append(
                now,
                AuditKind::Confluence {
                    instrument: sig.instrument.clone(),
                    score: sig.score.clone(),
                },
            ) {
                warn!(error = %e, "audit write failed for confluence record");
            }
            if let Err(e) = log.append(
                now,
                AuditKind::Bias {
                    instrument: sig.instrument.clone(),
                    bias: sig.bias.clone(),
                },
            ) {
                warn!(error = %e, "audit write failed for bias record");
            }
        }
        if let Err(e) = log.append(
            now,
            AuditKind::CycleSummary {
                risk_state: self.controller.state(),
                drawdown: assessment.drawdown,
                breached_clusters: exposure.breached_clusters(),
                entries_paused: self.controller.entries_paused(),
            },
        ) {
            warn!(error = %e, "audit write failed for cycle summary");
        }
    }
}
