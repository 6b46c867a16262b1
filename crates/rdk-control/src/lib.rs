//! rdk-control
//!
//! Damage-control controller:
//! - owns `RiskState` and the open `DamageControlEpisode` (the only legal
//!   mutation paths)
//! - detects the edge into DamageControl and runs the protocol exactly once
//!   per edge: Detect → Assess → Hedge → Pause → seal
//! - at-least-once per trigger edge, idempotent on retry: a failed hedge or
//!   seal is retried on later cycles without re-running Detect/Assess or
//!   duplicating the pause
//! - exit is never automatic: `close_episode` models the human review and
//!   refuses while drawdown is still at or above the hard threshold
//!
//! Cross-cycle mutable state lives here and in the drawdown monitor only.
//! Single-writer discipline: one cycle driver calls `step`/`close_episode`.
//! Admission callers read the pause flag through `AdmissionGate` — lock-free,
//! concurrent with a cycle in progress.

mod controller;
mod traits;

pub use controller::{AdmissionGate, CycleOutcome, DamageControlController};
pub use traits::{ControlError, EpisodeSink, ExecutionFailure, HedgeExecutor, SinkError};
