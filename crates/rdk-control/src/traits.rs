use rdk_schemas::{DamageControlEpisode, HedgeIntent};

/// Hedge placement rejected by the execution collaborator. The controller
/// stays in DamageControl and retries on the next cycle; the already-recorded
/// Detect/Assess/Pause steps are never rolled back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionFailure {
    pub reason: String,
}

impl ExecutionFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EXECUTION_FAILURE {}", self.reason)
    }
}

impl std::error::Error for ExecutionFailure {}

/// Audit-sink write failure. Non-fatal-but-reported: the episode's action
/// list stays unsealed and sealing is retried on a later cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkError {
    pub reason: String,
}

impl SinkError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SINK_WRITE_FAILED {}", self.reason)
    }
}

impl std::error::Error for SinkError {}

/// External execution collaborator: places the hedge orders the controller
/// computed. This component decides *what* hedge is needed, never how the
/// order is worked.
pub trait HedgeExecutor {
    fn place_hedges(&mut self, intents: &[HedgeIntent]) -> Result<(), ExecutionFailure>;
}

/// External append-only audit collaborator for episode action lists.
pub trait EpisodeSink {
    fn record_actions(&mut self, episode: &DamageControlEpisode) -> Result<(), SinkError>;
}

/// Controller-facing error taxonomy.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlError {
    /// Hard rejection for new-entry admission while damage control is active.
    EntriesPaused,
    /// Reviewer attempted to close the episode while drawdown is still at or
    /// above the hard threshold. The episode stays open.
    PrematureClose {
        drawdown: f64,
        hard_threshold: f64,
    },
    /// `close_episode` with nothing open.
    NoOpenEpisode,
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlError::EntriesPaused => {
                write!(f, "ENTRIES_PAUSED new entries are rejected until episode review")
            }
            ControlError::PrematureClose {
                drawdown,
                hard_threshold,
            } => write!(
                f,
                "PREMATURE_CLOSE drawdown={drawdown} still >= hard_threshold={hard_threshold}"
            ),
            ControlError::NoOpenEpisode => write!(f, "NO_OPEN_EPISODE"),
        }
    }
}

impl std::error::Error for ControlError {}
