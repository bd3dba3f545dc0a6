use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Module path to last-modified time, as published at `<base>/index.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    modules: BTreeMap<String, DateTime<Utc>>,
}

impl Index {
    /// Parses the raw index body. Timestamps must be RFC 3339.
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DateTime<Utc>)> {
        self.modules.iter().map(|(m, t)| (m.as_str(), t))
    }
}
