//! Best-effort log of completed calculations.
//!
//! Stores are append-only. Callers treat a failed `save` as something to
//! report, never as a reason to withhold a result.

use crate::solvers::Method;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One successful calculation as it is written to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRecord {
    pub method: Method,
    /// `f(x)`, or `g(x)` for one-point iteration.
    pub equation: String,
    /// The request body exactly as received.
    pub input_params: serde_json::Value,
    pub calculated_root: f64,
    pub execution_time_ms: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[cfg(not(target_arch = "wasm32"))]
pub fn timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(target_arch = "wasm32")]
pub fn timestamp_ms() -> u64 {
    js_sys::Date::now() as u64
}

pub trait CalculationStore: Send + Sync {
    fn save(&self, record: &CalculationRecord) -> Result<()>;
}

/// Appends one JSON object per line to a file, creating it if needed.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalculationStore for JsonLinesStore {
    fn save(&self, record: &CalculationRecord) -> Result<()> {
        let mut line =
            serde_json::to_string(record).context("Failed to serialize calculation record")?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Calculation log lock was poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open calculation log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to append to calculation log {}", self.path.display()))?;
        Ok(())
    }
}

/// Records a [`MemoryStore`] keeps unless told otherwise.
pub const DEFAULT_MEMORY_LIMIT: usize = 1000;

/// Keeps the most recent records in process memory, dropping the oldest
/// once `limit` is reached.
#[derive(Debug)]
pub struct MemoryStore {
    records: Mutex<VecDeque<CalculationRecord>>,
    limit: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MEMORY_LIMIT)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A limit of zero is treated as one.
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(limit.min(DEFAULT_MEMORY_LIMIT))),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Snapshot of everything saved so far, oldest first.
    pub fn records(&self) -> Vec<CalculationRecord> {
        self.records
            .lock()
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl CalculationStore for MemoryStore {
    fn save(&self, record: &CalculationRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("Memory store lock was poisoned"))?;
        while records.len() >= self.limit {
            records.pop_front();
        }
        records.push_back(record.clone());
        Ok(())
    }
}
