//! Deduplicating writer.
//!
//! The single consumer of fetched batches. It owns the set of identifiers
//! already written during this run, so no locking is involved: batches are
//! handled one at a time in arrival order and the first copy of an id wins.

use crate::error::MirrorError;
use crate::models::report::{Batch, Entry};
use crate::storage::Store;
use smol::channel::Receiver;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters collected while draining the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub modules: usize,
    pub degraded_modules: usize,
    pub entries_received: usize,
    pub entries_written: usize,
    /// Entries dropped because their id was already written this run
    pub duplicates: usize,
    /// Unique entries that could not be serialized or saved
    pub entries_failed: usize,
}

pub struct DedupWriter {
    store: Arc<Store>,
    seen: HashSet<String>,
    summary: RunSummary,
}

impl DedupWriter {
    pub fn new(store: Arc<Store>) -> Self {
        DedupWriter {
            store,
            seen: HashSet::new(),
            summary: RunSummary::default(),
        }
    }

    /// Blocks on `receiver` until every sender is gone and the queue is empty.
    pub fn drain(mut self, receiver: Receiver<Batch>) -> RunSummary {
        while let Ok(batch) = receiver.recv_blocking() {
            self.write_batch(batch);
        }

        info!(
            "Wrote {} unique entries from {} modules",
            self.summary.entries_written, self.summary.modules
        );
        self.summary
    }

    pub fn write_batch(&mut self, batch: Batch) {
        self.summary.modules += 1;
        if batch.degraded {
            self.summary.degraded_modules += 1;
        }
        self.summary.entries_received += batch.entries.len();

        for entry in &batch.entries {
            if self.seen.contains(&entry.id) {
                debug!("Skipping duplicate '{}' from '{}'", entry.id, batch.module);
                self.summary.duplicates += 1;
                continue;
            }
            // Marked before writing so a failing entry is not retried for
            // later copies either.
            self.seen.insert(entry.id.clone());

            match self.write_entry(entry) {
                Ok(()) => self.summary.entries_written += 1,
                Err(e) => {
                    warn!("Failed to save '{}': {}", entry.id, e);
                    self.summary.entries_failed += 1;
                }
            }
        }
    }

    fn write_entry(&self, entry: &Entry) -> Result<(), MirrorError> {
        let contents =
            serde_json::to_vec_pretty(entry).map_err(|source| MirrorError::Serialize {
                what: format!("entry '{}'", entry.id),
                source,
            })?;
        self.store.write_entry(&entry.id, &contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn entry(id: &str, source: &str) -> Entry {
        serde_json::from_value(json!({ "id": id, "database_specific": { "source": source } }))
            .unwrap()
    }

    #[test]
    fn first_copy_of_an_id_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::create(tmp.path()).unwrap());
        let mut writer = DedupWriter::new(Arc::clone(&store));

        writer.write_batch(Batch::new("mod/a", vec![entry("GO-1", "mod/a")]));
        writer.write_batch(Batch::new(
            "mod/b",
            vec![entry("GO-1", "mod/b"), entry("GO-2", "mod/b")],
        ));

        let first: Entry =
            serde_json::from_slice(&fs::read(store.entry_path("GO-1").unwrap()).unwrap())
                .unwrap();
        assert_eq!(first, entry("GO-1", "mod/a"));
        assert!(store.entry_path("GO-2").unwrap().exists());

        let summary = &writer.summary;
        assert_eq!(summary.entries_received, 3);
        assert_eq!(summary.entries_written, 2);
        assert_eq!(summary.duplicates, 1);
    }

    #[test]
    fn bad_ids_are_skipped_without_stopping() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::create(tmp.path()).unwrap());
        let mut writer = DedupWriter::new(Arc::clone(&store));

        let mut batch = Batch::new(
            "mod/a",
            vec![entry("../../evil", "mod/a"), entry("GO-3", "mod/a")],
        );
        batch.degraded = true;
        writer.write_batch(batch);

        let summary = &writer.summary;
        assert_eq!(summary.degraded_modules, 1);
        assert_eq!(summary.entries_failed, 1);
        assert_eq!(summary.entries_written, 1);
        assert_eq!(fs::read_dir(store.id_dir()).unwrap().count(), 1);
    }

    #[test]
    fn drain_stops_when_senders_are_gone() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::create(tmp.path()).unwrap());
        let (sender, receiver) = smol::channel::bounded(1);

        let producers: Vec<_> = (0..4)
            .map(|i| {
                let sender = sender.clone();
                std::thread::spawn(move || {
                    let batch = Batch::new(format!("mod/{i}"), vec![entry("GO-SHARED", "any")]);
                    sender.send_blocking(batch).unwrap();
                })
            })
            .collect();
        drop(sender);

        let summary = DedupWriter::new(Arc::clone(&store)).drain(receiver);
        for p in producers {
            p.join().unwrap();
        }

        assert_eq!(summary.modules, 4);
        assert_eq!(summary.entries_written, 1);
        assert_eq!(summary.duplicates, 3);
        assert_eq!(fs::read_dir(store.id_dir()).unwrap().count(), 1);
    }
}
