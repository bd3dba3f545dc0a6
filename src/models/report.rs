use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single vulnerability report.
///
/// Only `id` is interpreted. Every other field is carried through untouched so
/// the mirrored files keep whatever the database published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Entries fetched for one module, in the order the database returned them.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub module: String,
    pub entries: Vec<Entry>,
    /// Set when the fetch unit hit a recoverable failure.
    pub degraded: bool,
}

impl Batch {
    pub fn new(module: impl Into<String>, entries: Vec<Entry>) -> Self {
        Batch {
            module: module.into(),
            entries,
            degraded: false,
        }
    }

    /// Empty batch standing in for a module whose fetch failed.
    pub fn degraded(module: impl Into<String>) -> Self {
        Batch {
            module: module.into(),
            entries: Vec::new(),
            degraded: true,
        }
    }
}
