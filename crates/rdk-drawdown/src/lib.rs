//! rdk-drawdown
//!
//! Drawdown monitor:
//! - equity log (append-only, monotonic timestamps) as the sole source of
//!   truth for peak computation
//! - monotonic peak ratchet (a transient dip never lowers the peak)
//! - drawdown fraction clamped to [0, 1], classified against soft/hard
//!   thresholds, level-triggered on every observation
//! - fail-closed on equity-state corruption: the monitor halts and stays
//!   halted until an operator resets it from known-good history
//!
//! Deterministic, pure logic. No IO, no clocks, no broker calls.

use chrono::{DateTime, Utc};
use rdk_schemas::{EquityPoint, RiskState};
use serde::{Deserialize, Serialize};

/// Drawdown classification thresholds (fractions of peak equity).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawdownThresholds {
    /// Warning begins here.
    pub soft: f64,
    /// Damage control triggers here (inclusive).
    pub hard: f64,
}

impl DrawdownThresholds {
    /// 5% soft / 10% hard.
    pub fn sane_defaults() -> Self {
        Self {
            soft: 0.05,
            hard: 0.10,
        }
    }

    pub fn new(soft: f64, hard: f64) -> Result<Self, DrawdownError> {
        if !(soft > 0.0 && soft < hard && hard < 1.0) {
            return Err(DrawdownError::InvalidThresholds { soft, hard });
        }
        Ok(Self { soft, hard })
    }
}

/// Drawdown-monitor errors.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawdownError {
    InvalidThresholds {
        soft: f64,
        hard: f64,
    },
    /// Peak or balance is zero/negative — fatal to the cycle; previous state
    /// retained and the monitor halts. Never silently auto-corrected: moving
    /// the peak would mask a real drawdown.
    InvalidEquityState {
        balance_micros: i64,
        peak_equity_micros: i64,
    },
    /// Observation timestamp precedes the last recorded equity point.
    NonMonotonicTimestamp {
        prev: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// A prior corruption halted the monitor; reset from known-good history.
    Halted,
}

impl std::fmt::Display for DrawdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawdownError::InvalidThresholds { soft, hard } => {
                write!(f, "INVALID_THRESHOLDS soft={soft} hard={hard}")
            }
            DrawdownError::InvalidEquityState {
                balance_micros,
                peak_equity_micros,
            } => write!(
                f,
                "INVALID_EQUITY_STATE balance_micros={balance_micros} peak_equity_micros={peak_equity_micros}"
            ),
            DrawdownError::NonMonotonicTimestamp { prev, at } => {
                write!(f, "NON_MONOTONIC_TIMESTAMP prev={prev} at={at}")
            }
            DrawdownError::Halted => write!(f, "DRAWDOWN_MONITOR_HALTED"),
        }
    }
}

impl std::error::Error for DrawdownError {}

/// One drawdown observation result.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAssessment {
    pub risk_state: RiskState,
    /// Fractional loss from peak, in [0, 1].
    pub drawdown: f64,
    pub peak_equity_micros: i64,
    pub balance_micros: i64,
    pub at_utc: DateTime<Utc>,
}

/// Tracks running peak equity and classifies the current drawdown.
///
/// Cross-cycle mutable state: single-writer discipline — only the cycle
/// driver calls `observe`, `rebase_peak`, or `reset_from_history`.
#[derive(Clone, Debug)]
pub struct DrawdownMonitor {
    thresholds: DrawdownThresholds,
    history: Vec<EquityPoint>,
    peak_equity_micros: i64,
    last_drawdown: f64,
    halted: bool,
}

impl DrawdownMonitor {
    pub fn new(thresholds: DrawdownThresholds) -> Self {
        Self {
            thresholds,
            history: Vec::new(),
            peak_equity_micros: 0,
            last_drawdown: 0.0,
            halted: false,
        }
    }

    /// Rebuild after a restart from the full equity log. The peak comes from
    /// the complete history, never from a cached scalar.
    pub fn from_history(
        thresholds: DrawdownThresholds,
        points: &[EquityPoint],
    ) -> Result<Self, DrawdownError> {
        let mut monitor = Self::new(thresholds);
        monitor.replay(points)?;
        Ok(monitor)
    }

    /// Record one balance observation and classify the resulting drawdown.
    ///
    /// Level-triggered: every call re-evaluates from the current drawdown.
    /// Edge detection is the damage-control controller's job.
    pub fn observe(
        &mut self,
        balance_micros: i64,
        at_utc: DateTime<Utc>,
    ) -> Result<DrawdownAssessment, DrawdownError> {
        if self.halted {
            return Err(DrawdownError::Halted);
        }

        if let Some(last) = self.history.last() {
            if at_utc < last.ts_utc {
                return Err(DrawdownError::NonMonotonicTimestamp {
                    prev: last.ts_utc,
                    at: at_utc,
                });
            }
        }

        if balance_micros <= 0 {
            self.halted = true;
            return Err(DrawdownError::InvalidEquityState {
                balance_micros,
                peak_equity_micros: self.peak_equity_micros,
            });
        }

        self.history.push(EquityPoint {
            ts_utc: at_utc,
            balance_micros,
        });

        // Monotonic ratchet.
        if balance_micros > self.peak_equity_micros {
            self.peak_equity_micros = balance_micros;
        }

        // Unreachable once a positive balance has been recorded; fail closed
        // rather than divide into infinity.
        if self.peak_equity_micros <= 0 {
            self.halted = true;
            return Err(DrawdownError::InvalidEquityState {
                balance_micros,
                peak_equity_micros: self.peak_equity_micros,
            });
        }

        let drawdown = ((self.peak_equity_micros - balance_micros) as f64
            / self.peak_equity_micros as f64)
            .clamp(0.0, 1.0);
        self.last_drawdown = drawdown;

        Ok(DrawdownAssessment {
            risk_state: self.classify(drawdown),
            drawdown,
            peak_equity_micros: self.peak_equity_micros,
            balance_micros,
            at_utc,
        })
    }

    fn classify(&self, drawdown: f64) -> RiskState {
        if drawdown < self.thresholds.soft {
            RiskState::Normal
        } else if drawdown < self.thresholds.hard {
            RiskState::Warning
        } else {
            RiskState::DamageControl
        }
    }

    /// Start a new drawdown episode at the given balance. Called only when a
    /// damage-control episode is closed by explicit review — the one legal
    /// peak reset path.
    pub fn rebase_peak(&mut self, balance_micros: i64) -> Result<(), DrawdownError> {
        if balance_micros <= 0 {
            return Err(DrawdownError::InvalidEquityState {
                balance_micros,
                peak_equity_micros: self.peak_equity_micros,
            });
        }
        self.peak_equity_micros = balance_micros;
        self.last_drawdown = 0.0;
        Ok(())
    }

    /// Operator recovery after equity-state corruption: replace the log with
    /// known-good points, recompute the peak, clear the halt.
    pub fn reset_from_history(&mut self, points: &[EquityPoint]) -> Result<(), DrawdownError> {
        let mut fresh = Self::new(self.thresholds);
        fresh.replay(points)?;
        *self = fresh;
        Ok(())
    }

    fn replay(&mut self, points: &[EquityPoint]) -> Result<(), DrawdownError> {
        for p in points {
            self.observe(p.balance_micros, p.ts_utc)?;
        }
        Ok(())
    }

    pub fn current_drawdown(&self) -> f64 {
        self.last_drawdown
    }

    pub fn peak_equity_micros(&self) -> i64 {
        self.peak_equity_micros
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn history(&self) -> &[EquityPoint] {
        &self.history
    }

    pub fn thresholds(&self) -> DrawdownThresholds {
        self.thresholds
    }

    pub fn last_balance_micros(&self) -> Option<i64> {
        self.history.last().map(|p| p.balance_micros)
    }
}
