//! rdk-testkit
//!
//! Deterministic test doubles for the engine's collaborator seams, plus the
//! cross-crate scenario tests under `tests/`. Everything here is scripted:
//! no clocks, no network, no randomness beyond session ids.

mod flaky;
mod paper_broker;
mod scripted_market;

pub use flaky::{FlakyHedger, MemorySink};
pub use paper_broker::StaticBroker;
pub use scripted_market::{complete_snapshot, ScriptedMarket};
