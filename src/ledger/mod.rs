//! Append-only evidence ledger with file-based persistence.
//!
//! Records are stored as newline-delimited JSON (JSONL) for simplicity
//! and easy grepping downstream. Each append is a single one-line write,
//! so independent processes interleave at line granularity without an
//! explicit lock. The read path tolerates malformed lines: a reader may
//! observe a partial trailing line while another process is appending.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::domain::EvidenceRecord;

/// Environment override for the ledger path (test isolation)
pub const LOG_PATH_ENV: &str = "TERRALOG_LOG_PATH";

/// Default ledger path, relative to the working directory
pub const DEFAULT_LOG_PATH: &str = "logs/evidence_log.jsonl";

/// Fallback query size when a filter matches nothing
pub const DEFAULT_FALLBACK_LIMIT: usize = 20;

/// Resolve the ledger path from the current environment.
///
/// Returns the `TERRALOG_LOG_PATH` override when set, else the default
/// path relative to the working directory.
pub fn resolve_log_path() -> PathBuf {
    match std::env::var(LOG_PATH_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_LOG_PATH),
    }
}

/// Hex-encoded SHA-256 of the UTF-8 encoding of `text`.
///
/// Used to fingerprint prompt/output text without persisting it. Always
/// 64 lowercase hex characters.
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// File-based evidence ledger using JSONL format.
///
/// The path is threaded in explicitly so tests can inject isolated
/// locations without mutating shared process state; `from_env` applies
/// the environment override for CLI use.
pub struct EvidenceLedger {
    /// Path to the evidence_log.jsonl file
    path: PathBuf,
}

impl EvidenceLedger {
    /// Open a ledger at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open a ledger at the environment-resolved path
    pub fn from_env() -> Self {
        Self::new(resolve_log_path())
    }

    /// Get the ledger file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single JSON line.
    ///
    /// Creates parent directories on demand (idempotent). Filesystem
    /// errors propagate to the caller; there is no retry and no partial
    /// write at this level. No handle is retained across calls.
    pub async fn append(&self, record: &EvidenceRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create ledger directory: {}", parent.display())
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open ledger: {}", self.path.display()))?;

        let json = serde_json::to_string(record).context("Failed to serialize evidence record")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write evidence record")?;
        file.flush().await.context("Failed to flush evidence record")?;

        Ok(())
    }

    /// Read all parseable records in append order.
    ///
    /// Empty and malformed lines are skipped, never fatal: one bad line
    /// must not break reporting over the rest of the ledger.
    pub async fn read_all(&self) -> Result<Vec<EvidenceRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open ledger: {}", self.path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut records = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EvidenceRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => debug!("skipping malformed ledger line: {}", e),
            }
        }

        Ok(records)
    }

    /// Records whose candidate_id matches exactly, in append order
    pub async fn find_candidate(&self, candidate_id: &str) -> Result<Vec<EvidenceRecord>> {
        let records = self.read_all().await?;
        Ok(records
            .into_iter()
            .filter(|r| r.candidate_id == candidate_id)
            .collect())
    }

    /// Select records for reporting.
    ///
    /// Keeps records matching the exact `candidate_id`, or whose
    /// candidate_id/notes contain `needle` case-insensitively. When
    /// nothing matches, falls back to the last `fallback_limit` records.
    pub async fn select(
        &self,
        candidate_id: Option<&str>,
        needle: Option<&str>,
        fallback_limit: usize,
    ) -> Result<Vec<EvidenceRecord>> {
        let records = self.read_all().await?;
        Ok(select_records(records, candidate_id, needle, fallback_limit))
    }
}

/// Pure selection logic over already-parsed records
pub fn select_records(
    records: Vec<EvidenceRecord>,
    candidate_id: Option<&str>,
    needle: Option<&str>,
    fallback_limit: usize,
) -> Vec<EvidenceRecord> {
    let chosen: Vec<EvidenceRecord> = records
        .iter()
        .filter(|r| matches_record(r, candidate_id, needle))
        .cloned()
        .collect();

    if !chosen.is_empty() {
        return chosen;
    }

    let skip = records.len().saturating_sub(fallback_limit);
    records.into_iter().skip(skip).collect()
}

fn matches_record(
    record: &EvidenceRecord,
    candidate_id: Option<&str>,
    needle: Option<&str>,
) -> bool {
    if let Some(cid) = candidate_id {
        if record.candidate_id == cid {
            return true;
        }
    }
    if let Some(needle) = needle {
        let needle = needle.to_lowercase();
        if record.candidate_id.to_lowercase().contains(&needle) {
            return true;
        }
        if let Some(notes) = &record.notes {
            if notes.to_lowercase().contains(&needle) {
                return true;
            }
        }
    }
    false
}
