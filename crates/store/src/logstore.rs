//! JSONL log store keyed by `(tenant, node)`.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::warn;

use credmesh_crypto::sha256_trunc_hex;

use crate::StoreError;

/// Status document file name within a node directory.
pub const NODE_STATUS_FILE: &str = "node_status.json";

/// Hex width of the hashed directory slugs.
const SLUG_LEN: usize = 16;

/// The five append-only logs every node owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogName {
    Envelopes,
    Validations,
    Aggregates,
    SealChainMirror,
    Replication,
}

impl LogName {
    /// All logs, in replication order.
    pub const ALL: [LogName; 5] = [
        LogName::Envelopes,
        LogName::Validations,
        LogName::Aggregates,
        LogName::SealChainMirror,
        LogName::Replication,
    ];

    /// On-disk file name.
    pub fn file_name(&self) -> &'static str {
        match self {
            LogName::Envelopes => "envelopes.jsonl",
            LogName::Validations => "validations.jsonl",
            LogName::Aggregates => "aggregates.jsonl",
            LogName::SealChainMirror => "seal_chain_mirror.jsonl",
            LogName::Replication => "replication.jsonl",
        }
    }

    /// Wire key used in push/pull bodies.
    pub fn key(&self) -> &'static str {
        match self {
            LogName::Envelopes => "envelopes",
            LogName::Validations => "validations",
            LogName::Aggregates => "aggregates",
            LogName::SealChainMirror => "seal_chain_mirror",
            LogName::Replication => "replication",
        }
    }

    /// Parse a wire key back to a log name.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|log| log.key() == key)
    }
}

/// Filesystem-backed append-only log store.
///
/// Appends to the same log file are serialized by a per-file writer
/// lock; readers take no lock and may observe a partial trailing line,
/// which the line parser skips.
pub struct LogStore {
    base_dir: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl LogStore {
    /// Open a store rooted at `base_dir` (created lazily on first write).
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Validate an untrusted identifier and return its directory slug.
    ///
    /// Accepts `[A-Za-z0-9_.-]{1,64}`; the slug is a truncated SHA-256
    /// so hostile identifiers can never select a path.
    fn slug(field: &'static str, id: &str) -> Result<String, StoreError> {
        let valid = !id.is_empty()
            && id.len() <= 64
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
        if !valid {
            return Err(StoreError::InvalidId {
                field,
                value: id.to_string(),
            });
        }
        Ok(sha256_trunc_hex(id.as_bytes(), SLUG_LEN))
    }

    /// Directory holding one tenant's node stores.
    pub fn tenant_dir(&self, tenant_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.base_dir.join(Self::slug("tenant_id", tenant_id)?))
    }

    /// Directory holding one node's logs and status document.
    pub fn node_dir(&self, tenant_id: &str, node_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self
            .tenant_dir(tenant_id)?
            .join(Self::slug("node_id", node_id)?))
    }

    fn log_path(&self, tenant_id: &str, node_id: &str, log: LogName) -> Result<PathBuf, StoreError> {
        Ok(self.node_dir(tenant_id, node_id)?.join(log.file_name()))
    }

    fn file_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock map poisoned");
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    /// Append one record to a log, stamping a `timestamp` if absent.
    pub fn append(
        &self,
        tenant_id: &str,
        node_id: &str,
        log: LogName,
        record: &Value,
    ) -> Result<(), StoreError> {
        let path = self.log_path(tenant_id, node_id, log)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut record = record.clone();
        if let Some(map) = record.as_object_mut() {
            map.entry("timestamp")
                .or_insert_with(|| Value::String(now_iso()));
        }
        let line = serde_json::to_string(&record)?;

        let lock = self.file_lock(&path);
        let _guard = lock.lock().expect("log writer lock poisoned");
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Append a batch, returning the number written.
    pub fn append_all(
        &self,
        tenant_id: &str,
        node_id: &str,
        log: LogName,
        records: &[Value],
    ) -> Result<usize, StoreError> {
        for record in records {
            self.append(tenant_id, node_id, log, record)?;
        }
        Ok(records.len())
    }

    /// Load all records from a log. Missing log means empty.
    pub fn load_all(
        &self,
        tenant_id: &str,
        node_id: &str,
        log: LogName,
    ) -> Result<Vec<Value>, StoreError> {
        let path = self.log_path(tenant_id, node_id, log)?;
        read_jsonl(&path)
    }

    /// Load records with `timestamp >= since` (lexicographic on the
    /// fixed ISO format).
    pub fn load_since(
        &self,
        tenant_id: &str,
        node_id: &str,
        log: LogName,
        since: &str,
    ) -> Result<Vec<Value>, StoreError> {
        let records = self.load_all(tenant_id, node_id, log)?;
        if since.is_empty() {
            return Ok(records);
        }
        Ok(records
            .into_iter()
            .filter(|r| timestamp_of(r) >= since)
            .collect())
    }

    /// Load the last `n` records from a log.
    pub fn load_last_n(
        &self,
        tenant_id: &str,
        node_id: &str,
        log: LogName,
        n: usize,
    ) -> Result<Vec<Value>, StoreError> {
        let mut records = self.load_all(tenant_id, node_id, log)?;
        let skip = records.len().saturating_sub(n);
        Ok(records.split_off(skip))
    }

    /// Write the node's status document atomically (temp file + rename).
    pub fn write_status(
        &self,
        tenant_id: &str,
        node_id: &str,
        status: &Value,
    ) -> Result<(), StoreError> {
        let dir = self.node_dir(tenant_id, node_id)?;
        fs::create_dir_all(&dir)?;
        let path = dir.join(NODE_STATUS_FILE);
        let tmp = dir.join(format!("{NODE_STATUS_FILE}.tmp"));

        let lock = self.file_lock(&path);
        let _guard = lock.lock().expect("status writer lock poisoned");
        let mut file = File::create(&tmp)?;
        file.write_all(serde_json::to_string_pretty(status)?.as_bytes())?;
        file.write_all(b"\n")?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Read the node's status document. `None` if never written.
    pub fn read_status(
        &self,
        tenant_id: &str,
        node_id: &str,
    ) -> Result<Option<Value>, StoreError> {
        let path = self.node_dir(tenant_id, node_id)?.join(NODE_STATUS_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw).ok())
    }

    /// List node directories under a tenant (slug-named).
    pub fn list_node_dirs(&self, tenant_id: &str) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.tenant_dir(tenant_id)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut dirs: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();
        Ok(dirs)
    }

    /// Read a status document directly from a node directory path.
    pub fn read_status_in_dir(dir: &Path) -> Option<Value> {
        let raw = fs::read_to_string(dir.join(NODE_STATUS_FILE)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Read a log directly from a node directory path.
    pub fn read_log_in_dir(dir: &Path, log: LogName) -> Vec<Value> {
        read_jsonl(&dir.join(log.file_name())).unwrap_or_default()
    }
}

/// Deduplicate records by an id field, keeping the last occurrence.
///
/// Preserves first-seen order so replicated logs keep a stable shape.
pub fn dedupe_by_id(records: Vec<Value>, id_field: &str) -> Vec<Value> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, Value> = HashMap::new();
    for record in records {
        let Some(id) = record.get(id_field).and_then(Value::as_str) else {
            continue;
        };
        if !latest.contains_key(id) {
            order.push(id.to_string());
        }
        latest.insert(id.to_string(), record);
    }
    order
        .into_iter()
        .filter_map(|id| latest.remove(&id))
        .collect()
}

fn timestamp_of(record: &Value) -> &str {
    record
        .get("timestamp")
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn read_jsonl(path: &Path) -> Result<Vec<Value>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str(trimmed) {
            Ok(value) => records.push(value),
            // Partial tail from a concurrent append; skip it.
            Err(err) => warn!(path = %path.display(), %err, "skipping unparseable log line"),
        }
    }
    Ok(records)
}

fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
