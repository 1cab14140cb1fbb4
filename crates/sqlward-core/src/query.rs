//! Query execution records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of gatekeeping a caller-supplied query text.
///
/// Immutable once produced and consumed exactly once by the executor.
/// `rewritten_text` is the exact text to execute when `allowed` is true;
/// when the verdict is a rejection it carries the untouched original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryVerdict {
    pub allowed: bool,
    pub rewritten_text: String,
    /// Set whenever `allowed` is false, naming the specific rule violated.
    pub reason: Option<String>,
    /// Advisory only: the original text contained `--` or `/*`. Logged for
    /// audit purposes, never affects the verdict.
    pub contains_comments: bool,
}

/// One executed result set.
///
/// Column order is exactly as returned by the engine and must not be
/// re-sorted. Each row maps column name to a dynamically-typed scalar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, Value>>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

/// One row of an estimated execution plan, keyed by the plan column names
/// the engine reports.
pub type PlanRow = serde_json::Map<String, Value>;

/// Best-effort execution statistics.
///
/// Only `elapsed_time_ms` is measured directly; the remaining fields are
/// zero when the engine's statistics channel cannot be captured, and zero
/// means "not available", not "measured as zero".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub logical_reads: u64,
    pub physical_reads: u64,
    pub cpu_time_ms: u64,
    pub elapsed_time_ms: u64,
}
