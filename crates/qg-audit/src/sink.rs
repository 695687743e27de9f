//! Audit sinks: the append boundary plus file and in-memory implementations.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// AuditError
// ---------------------------------------------------------------------------

/// An audit entry could not be persisted.
///
/// Audit completeness dominates: callers propagate this instead of
/// swallowing it, and a pipeline that cannot audit does not trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    Io(String),
    Serialize(String),
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditError::Io(msg) => write!(f, "audit io error: {msg}"),
            AuditError::Serialize(msg) => write!(f, "audit serialize error: {msg}"),
        }
    }
}

impl std::error::Error for AuditError {}

// ---------------------------------------------------------------------------
// AuditSink
// ---------------------------------------------------------------------------

/// Write-only audit boundary. One call, one immutable event.
///
/// The sink stamps the top-level `timestamp` so callers cannot forget it.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: Value) -> Result<(), AuditError>;
}

/// Stamp `timestamp` (ISO-8601 UTC) into an entry, preserving caller fields.
fn stamped(mut entry: Value) -> Value {
    if let Value::Object(ref mut map) = entry {
        map.entry("timestamp".to_string()).or_insert_with(|| {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
        });
    }
    entry
}

// ---------------------------------------------------------------------------
// Canonical JSON + hash chain
// ---------------------------------------------------------------------------

/// Canonicalize by sorting keys recursively and emitting compact JSON.
/// One event == one JSON line.
fn canonical_json_line(v: &Value) -> Result<String, AuditError> {
    serde_json::to_string(&sort_keys(v)).map_err(|e| AuditError::Serialize(e.to_string()))
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

/// Event hash over the canonical form WITHOUT `hash_self` (to avoid
/// self-reference).
fn compute_event_hash(entry: &Value) -> Result<String, AuditError> {
    let mut clone = entry.clone();
    if let Value::Object(ref mut map) = clone {
        map.remove("hash_self");
    }
    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// JsonlAuditSink
// ---------------------------------------------------------------------------

struct ChainState {
    last_hash: Option<String>,
}

/// Append-only JSONL file sink with an optional SHA-256 hash chain.
pub struct JsonlAuditSink {
    path: PathBuf,
    hash_chain: bool,
    state: Mutex<ChainState>,
}

impl JsonlAuditSink {
    /// Create the sink, ensuring parent directories exist.
    pub fn new(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AuditError::Io(format!("create_dir_all {parent:?}: {e}")))?;
        }
        Ok(Self {
            path,
            hash_chain,
            state: Mutex::new(ChainState { last_hash: None }),
        })
    }

    /// Restore the chain head after reading an existing log on restart.
    pub async fn set_last_hash(&self, last_hash: Option<String>) {
        self.state.lock().await.last_hash = last_hash;
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append(&self, entry: Value) -> Result<(), AuditError> {
        let mut entry = stamped(entry);
        let mut state = self.state.lock().await;

        if self.hash_chain {
            if let Value::Object(ref mut map) = entry {
                map.insert(
                    "hash_prev".to_string(),
                    state.last_hash.clone().map(Value::String).unwrap_or(Value::Null),
                );
            }
            let self_hash = compute_event_hash(&entry)?;
            if let Value::Object(ref mut map) = entry {
                map.insert("hash_self".to_string(), Value::String(self_hash.clone()));
            }
            state.last_hash = Some(self_hash);
        }

        let line = canonical_json_line(&entry)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AuditError::Io(format!("open {:?}: {e}", self.path)))?;
        f.write_all(line.as_bytes())
            .and_then(|_| f.write_all(b"\n"))
            .map_err(|e| AuditError::Io(format!("write {:?}: {e}", self.path)))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Chain verification
// ---------------------------------------------------------------------------

/// Result of hash chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// The entire chain is valid.
    Valid { lines: usize },
    /// The chain is broken at the given 1-based line.
    Broken { line: usize, reason: String },
}

/// Verify the hash chain of JSONL content.
pub fn verify_chain(content: &str) -> Result<VerifyResult, AuditError> {
    let mut prev_hash: Option<String> = None;
    let mut count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry: Value = serde_json::from_str(trimmed)
            .map_err(|e| AuditError::Serialize(format!("line {}: {e}", i + 1)))?;
        count += 1;

        let hash_prev = entry.get("hash_prev").and_then(|v| v.as_str()).map(String::from);
        if hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!("hash_prev mismatch: expected {prev_hash:?}, got {hash_prev:?}"),
            });
        }

        if let Some(claimed) = entry.get("hash_self").and_then(|v| v.as_str()) {
            let recomputed = compute_event_hash(&entry)?;
            if claimed != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!("hash_self mismatch: claimed {claimed}, recomputed {recomputed}"),
                });
            }
        }

        prev_hash = entry.get("hash_self").and_then(|v| v.as_str()).map(String::from);
    }

    Ok(VerifyResult::Valid { lines: count })
}

/// Verify the hash chain of an audit log file.
pub fn verify_chain_file(path: impl AsRef<Path>) -> Result<VerifyResult, AuditError> {
    let content = fs::read_to_string(path.as_ref())
        .map_err(|e| AuditError::Io(format!("read {:?}: {e}", path.as_ref())))?;
    verify_chain(&content)
}

// ---------------------------------------------------------------------------
// MemoryAuditSink
// ---------------------------------------------------------------------------

/// In-memory sink retaining entries for tests and recent-event read-back.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<Value>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries appended so far, in order.
    pub async fn entries(&self) -> Vec<Value> {
        self.entries.lock().await.clone()
    }

    /// The most recent entries, optionally filtered by `strategy_id`.
    pub async fn recent(&self, strategy_id: Option<&str>, limit: usize) -> Vec<Value> {
        let entries = self.entries.lock().await;
        let mut matched: Vec<Value> = entries
            .iter()
            .filter(|e| match strategy_id {
                Some(id) => e.get("strategy_id").and_then(|v| v.as_str()) == Some(id),
                None => true,
            })
            .rev()
            .take(limit)
            .cloned()
            .collect();
        matched.reverse();
        matched
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: Value) -> Result<(), AuditError> {
        self.entries.lock().await.push(stamped(entry));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_sink_stamps_timestamps() {
        let sink = MemoryAuditSink::new();
        sink.append(json!({"event": "X"})).await.unwrap();
        let entries = sink.entries().await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0]["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn recent_filters_by_strategy_and_limits() {
        let sink = MemoryAuditSink::new();
        for i in 0..5 {
            sink.append(json!({"strategy_id": "s1", "n": i})).await.unwrap();
        }
        sink.append(json!({"strategy_id": "s2", "n": 99})).await.unwrap();

        let recent = sink.recent(Some("s1"), 3).await;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.last().unwrap()["n"], 4);
        assert!(sink.recent(Some("s2"), 10).await.len() == 1);
    }

    #[tokio::test]
    async fn jsonl_sink_writes_sorted_compact_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("trade.jsonl");
        let sink = JsonlAuditSink::new(&path, false).unwrap();

        sink.append(json!({"zeta": 1, "alpha": 2})).await.unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let line = content.lines().next().unwrap();
        let alpha = line.find("\"alpha\"").unwrap();
        let zeta = line.find("\"zeta\"").unwrap();
        assert!(alpha < zeta, "keys must be sorted: {line}");
    }

    #[tokio::test]
    async fn hash_chain_links_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chained.jsonl");
        let sink = JsonlAuditSink::new(&path, true).unwrap();

        sink.append(json!({"event": "A"})).await.unwrap();
        sink.append(json!({"event": "B"})).await.unwrap();
        sink.append(json!({"event": "C"})).await.unwrap();

        let result = verify_chain_file(&path).unwrap();
        assert_eq!(result, VerifyResult::Valid { lines: 3 });
    }

    #[tokio::test]
    async fn tampered_line_breaks_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chained.jsonl");
        let sink = JsonlAuditSink::new(&path, true).unwrap();

        sink.append(json!({"event": "A", "qty": 10})).await.unwrap();
        sink.append(json!({"event": "B", "qty": 20})).await.unwrap();

        let tampered = fs::read_to_string(&path).unwrap().replace("\"qty\":10", "\"qty\":99");
        fs::write(&path, tampered).unwrap();

        match verify_chain_file(&path).unwrap() {
            VerifyResult::Broken { line, .. } => assert_eq!(line, 1),
            other => panic!("expected broken chain, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unchained_sink_emits_no_hash_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.jsonl");
        let sink = JsonlAuditSink::new(&path, false).unwrap();
        sink.append(json!({"event": "A"})).await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("hash_prev"));
        assert!(!content.contains("hash_self"));
    }

    #[tokio::test]
    async fn caller_supplied_timestamp_is_preserved() {
        let sink = MemoryAuditSink::new();
        sink.append(json!({"event": "X", "timestamp": "2026-01-01T00:00:00Z"}))
            .await
            .unwrap();
        assert_eq!(
            sink.entries().await[0]["timestamp"],
            "2026-01-01T00:00:00Z"
        );
    }
}
