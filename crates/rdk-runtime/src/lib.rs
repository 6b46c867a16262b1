//! rdk-runtime
//!
//! The cycle driver. Owns all cross-cycle mutable state (drawdown monitor,
//! damage-control controller, audit log) and runs the single-writer risk
//! cycle:
//!
//!   fetch positions/balance/snapshots → score + bias (parallel, per
//!   instrument) → exposure aggregation → drawdown observation →
//!   controller step → audit.
//!
//! External collaborators come in behind the `BrokerView`, `MarketView`
//! and `HedgeExecutor` seams; the engine never talks to a venue directly.
//!
//! Failure posture per collaborator:
//! - a snapshot or scoring failure skips that instrument only
//! - a broker fetch failure or equity-state corruption aborts the cycle,
//!   previous risk state retained
//! - an audit write failure is logged and reported, never fatal

mod engine;
mod traits;

pub use engine::{CycleReport, EngineStatus, InstrumentSignal, RiskEngine};
pub use traits::{BrokerView, MarketView};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` controls the filter;
/// defaults to info. Safe to call more than once (later calls are no-ops).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
