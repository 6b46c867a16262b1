//! rdk-audit
//!
//! Append-only JSONL audit log for risk decisions. One record per line,
//! canonical (recursively key-sorted, compact) JSON, sha256 hash chain:
//! each record carries hash_prev + hash_self so tampering with any line
//! breaks verification from that line onward.
//!
//! Record ids are derived deterministically from chain state + sequence +
//! payload (uuid v5, no RNG), so replaying the same session produces the
//! same ids.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use rdk_control::{EpisodeSink, SinkError};
use rdk_schemas::{ConfluenceScore, DamageControlEpisode, MarketBias, RiskState};

/// What a record documents. Tagged so the log stays greppable by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditKind {
    /// Effective configuration at session start, pinned by hash.
    SessionStart { config_hash: String },
    Confluence {
        instrument: String,
        score: ConfluenceScore,
    },
    Bias {
        instrument: String,
        bias: MarketBias,
    },
    /// The sealed action list of a damage-control episode.
    EpisodeActions { episode: DamageControlEpisode },
    EpisodeClosed {
        episode_id: Uuid,
        review_notes: String,
    },
    CycleSummary {
        risk_state: RiskState,
        drawdown: f64,
        breached_clusters: Vec<String>,
        entries_paused: bool,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditRecord {
    pub record_id: Uuid,
    pub session_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: AuditKind,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// Append-only audit log writer. Single writer per file.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    session_id: Uuid,
    last_hash: Option<String>,
    seq: u64,
}

impl AuditLog {
    /// Creates the log writer and ensures parent dirs exist. Starts a fresh
    /// chain; use [`AuditLog::resume`] to continue an existing file.
    pub fn new(path: impl AsRef<Path>, session_id: Uuid) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
        }
        Ok(Self {
            path,
            session_id,
            last_hash: None,
            seq: 0,
        })
    }

    /// Reopen an existing log and restore chain state (last hash + sequence)
    /// from its content, verifying the chain on the way. A missing file is
    /// treated as a fresh log.
    pub fn resume(path: impl AsRef<Path>, session_id: Uuid) -> Result<Self> {
        let mut log = Self::new(&path, session_id)?;
        if !log.path.exists() {
            return Ok(log);
        }
        let content = fs::read_to_string(&log.path)
            .with_context(|| format!("read audit log {:?}", log.path))?;
        match verify_chain_str(&content)? {
            VerifyResult::Valid { lines } => {
                log.seq = lines as u64;
                log.last_hash = last_hash_of(&content)?;
                Ok(log)
            }
            VerifyResult::Broken { line, reason } => anyhow::bail!(
                "AUDIT_CHAIN_BROKEN cannot resume {:?}: line {} {}",
                log.path,
                line,
                reason
            ),
        }
    }

    pub fn last_hash(&self) -> Option<String> {
        self.last_hash.clone()
    }

    /// Number of records appended so far.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Append one record and advance the chain.
    pub fn append(&mut self, ts_utc: DateTime<Utc>, kind: AuditKind) -> Result<AuditRecord> {
        let payload = serde_json::to_value(&kind).context("serialize audit kind failed")?;
        let record_id = derive_record_id(self.last_hash.as_deref(), &payload, self.seq)?;

        let mut record = AuditRecord {
            record_id,
            session_id: self.session_id,
            ts_utc,
            kind,
            hash_prev: self.last_hash.clone(),
            hash_self: None,
        };

        let self_hash = compute_record_hash(&record)?;
        record.hash_self = Some(self_hash.clone());

        let line = canonical_json_line(&record)?;
        append_line(&self.path, &line)?;

        self.last_hash = Some(self_hash);
        self.seq += 1;

        Ok(record)
    }
}

/// Audit-backed implementation of the episode sink: sealing an episode means
/// its full action list made it into the hash chain.
pub struct JsonlEpisodeSink {
    log: AuditLog,
}

impl JsonlEpisodeSink {
    pub fn new(log: AuditLog) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &AuditLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut AuditLog {
        &mut self.log
    }
}

impl EpisodeSink for JsonlEpisodeSink {
    fn record_actions(&mut self, episode: &DamageControlEpisode) -> Result<(), SinkError> {
        self.log
            .append(
                Utc::now(),
                AuditKind::EpisodeActions {
                    episode: episode.clone(),
                },
            )
            .map(|_| ())
            .map_err(|e| SinkError::new(e.to_string()))
    }
}

// ─── Chain primitives ────────────────────────────────────────────────────────

/// Deterministic record id: uuid v5 over chain state + sequence + canonical
/// payload. Same session content, same ids.
fn derive_record_id(last_hash: Option<&str>, payload: &Value, seq: u64) -> Result<Uuid> {
    let canonical_payload =
        serde_json::to_string(&sort_keys(payload)).context("canonical payload failed")?;
    let mut name = Vec::new();
    name.extend_from_slice(last_hash.unwrap_or("genesis").as_bytes());
    name.extend_from_slice(&seq.to_be_bytes());
    name.extend_from_slice(canonical_payload.as_bytes());
    Ok(Uuid::new_v5(&Uuid::NAMESPACE_OID, &name))
}

/// Record hash is computed over canonical JSON of the record WITHOUT
/// hash_self (to avoid self-reference).
pub fn compute_record_hash(record: &AuditRecord) -> Result<String> {
    let mut clone = record.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit log {:?}", path))?;
    f.write_all(line.as_bytes())
        .context("write audit line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

/// Canonicalize by sorting keys recursively and emitting compact JSON.
/// One record == one JSON line.
fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize audit record failed")?;
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

fn last_hash_of(content: &str) -> Result<Option<String>> {
    let last = content.lines().rev().find(|l| !l.trim().is_empty());
    match last {
        None => Ok(None),
        Some(line) => {
            let record: AuditRecord =
                serde_json::from_str(line.trim()).context("parse last audit record")?;
            Ok(record.hash_self)
        }
    }
}

// ─── Verification ────────────────────────────────────────────────────────────

/// Result of hash chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    Broken { line: usize, reason: String },
}

/// Verify the hash chain integrity of an audit log file.
pub fn verify_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read audit log {:?}", path.as_ref()))?;
    verify_chain_str(&content)
}

/// Same logic as [`verify_chain`] but over in-memory JSONL content.
pub fn verify_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: AuditRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("parse audit record at line {}", i + 1))?;

        line_count += 1;

        if record.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, record.hash_prev
                ),
            });
        }

        match record.hash_self {
            Some(ref claimed) => {
                let recomputed = compute_record_hash(&record)?;
                if *claimed != recomputed {
                    return Ok(VerifyResult::Broken {
                        line: i + 1,
                        reason: format!(
                            "hash_self mismatch: claimed {}, recomputed {}",
                            claimed, recomputed
                        ),
                    });
                }
            }
            None => {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: "missing hash_self".to_string(),
                });
            }
        }

        prev_hash = record.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}
