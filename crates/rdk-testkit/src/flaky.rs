use rdk_control::{EpisodeSink, ExecutionFailure, HedgeExecutor, SinkError};
use rdk_schemas::{DamageControlEpisode, HedgeIntent};

/// Hedge executor that rejects the first `failures` placements, then accepts
/// everything, recording each accepted batch.
#[derive(Debug, Default)]
pub struct FlakyHedger {
    failures_left: u32,
    pub attempts: u32,
    pub placed: Vec<Vec<HedgeIntent>>,
}

impl FlakyHedger {
    pub fn failing(failures: u32) -> Self {
        Self {
            failures_left: failures,
            attempts: 0,
            placed: Vec::new(),
        }
    }

    pub fn accepting() -> Self {
        Self::failing(0)
    }
}

impl HedgeExecutor for FlakyHedger {
    fn place_hedges(&mut self, intents: &[HedgeIntent]) -> Result<(), ExecutionFailure> {
        self.attempts += 1;
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(ExecutionFailure::new("scripted rejection"));
        }
        self.placed.push(intents.to_vec());
        Ok(())
    }
}

/// In-memory episode sink that fails the first `failures` writes.
#[derive(Debug, Default)]
pub struct MemorySink {
    failures_left: u32,
    pub sealed: Vec<DamageControlEpisode>,
}

impl MemorySink {
    pub fn failing(failures: u32) -> Self {
        Self {
            failures_left: failures,
            sealed: Vec::new(),
        }
    }

    pub fn accepting() -> Self {
        Self::failing(0)
    }
}

impl EpisodeSink for MemorySink {
    fn record_actions(&mut self, episode: &DamageControlEpisode) -> Result<(), SinkError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(SinkError::new("scripted sink outage"));
        }
        self.sealed.push(episode.clone());
        Ok(())
    }
}
