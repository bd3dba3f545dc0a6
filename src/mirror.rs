use crate::error::{MirrorError, Result};
use crate::models::index::Index;
use crate::models::report::{Batch, Entry};
use crate::modpath::escape_module_path;
use crate::network::VulnSource;
use crate::storage::Store;
use crate::writer::{DedupWriter, RunSummary};
use async_lock::Semaphore;
use chrono::{DateTime, Utc};
use futures_lite::FutureExt;
use smol::Timer;
use std::{num::NonZeroUsize, sync::Arc, thread, time::Duration};
use tracing::{debug, info, warn};

/// Per-module fetch timeout used when none is configured
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the queue between fetch units and the writer
pub const DEFAULT_CHANNEL_CAPACITY: NonZeroUsize = NonZeroUsize::new(100).unwrap();

#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub fetch_timeout: Duration,
    pub channel_capacity: NonZeroUsize,
    /// Cap on concurrently running fetch units. `None` spawns them all at once.
    pub max_concurrent: Option<NonZeroUsize>,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        MirrorOptions {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_concurrent: None,
        }
    }
}

/// Downloads the index, stores the raw body and parses it.
///
/// The raw body is written before parsing so a malformed index can still be
/// inspected on disk.
pub fn fetch_index(source: &dyn VulnSource, store: &Store) -> Result<Index> {
    let body = source.index_body()?;
    let path = store.write_index(&body)?;
    debug!("Saved raw index to '{}'", path.display());

    Ok(Index::from_json(&body)?)
}

/// Fetches and stores the reports of a single module.
///
/// Never fails: every error is logged and turned into an empty, degraded
/// batch. A failed write of the module file still forwards the entries.
pub async fn fetch_reports(
    source: Arc<dyn VulnSource>,
    store: Arc<Store>,
    module: String,
    updated_at: DateTime<Utc>,
    timeout: Duration,
) -> Batch {
    // The database's modification time is not used to skip unchanged modules.
    debug!("Fetching '{}' (last modified {})", module, updated_at);

    let escaped = match escape_module_path(&module) {
        Ok(p) => p,
        Err(e) => {
            warn!("Skipping module '{}': {}", module, e);
            return Batch::degraded(module);
        }
    };

    let entries = match fetch_with_timeout(source, &module, &escaped, timeout).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to get reports for '{}': {}", module, e);
            return Batch::degraded(module);
        }
    };

    let contents = match serde_json::to_vec_pretty(&entries) {
        Ok(c) => c,
        Err(source) => {
            let e = MirrorError::Serialize {
                what: format!("reports of '{module}'"),
                source,
            };
            warn!("{}", e);
            return Batch::degraded(module);
        }
    };

    let mut batch = Batch::new(module, entries);
    match smol::unblock(move || store.write_module(&escaped, &contents)).await {
        Ok(path) => debug!(
            "Saved {} reports for '{}' to '{}'",
            batch.entries.len(),
            batch.module,
            path.display()
        ),
        Err(e) => {
            warn!("Failed to save reports for '{}': {}", batch.module, e);
            batch.degraded = true;
        }
    }

    batch
}

/// Runs the blocking remote call on its own thread, so every module's request
/// is in flight at once, and bounds it by `timeout`.
///
/// The deadline starts once the worker thread is running, not when the unit is
/// first polled.
async fn fetch_with_timeout(
    source: Arc<dyn VulnSource>,
    module: &str,
    escaped: &str,
    timeout: Duration,
) -> Result<Vec<Entry>> {
    let (started_tx, started_rx) = smol::channel::bounded::<()>(1);
    let (result_tx, result_rx) = smol::channel::bounded(1);

    let worker = {
        let module = module.to_string();
        let escaped = escaped.to_string();
        move || {
            let _ = started_tx.send_blocking(());
            let res = source.module_reports(&module, &escaped, timeout);
            // The receiver is gone when the deadline already fired.
            let _ = result_tx.send_blocking(res);
        }
    };
    thread::Builder::new()
        .name("fetch-unit".to_string())
        .spawn(worker)
        .map_err(|source| MirrorError::Spawn {
            module: module.to_string(),
            source,
        })?;

    let call = async {
        result_rx
            .recv()
            .await
            .unwrap_or_else(|_| {
                Err(MirrorError::WorkerExited {
                    module: module.to_string(),
                })
            })
    };
    let deadline = async {
        let _ = started_rx.recv().await;
        Timer::after(timeout).await;
        Err(MirrorError::Timeout {
            module: module.to_string(),
            after: timeout,
        })
    };

    call.or(deadline).await
}

/// Mirrors every module in `index`.
///
/// One fetch unit is spawned per module. Batches flow through a bounded
/// channel into a single [`DedupWriter`], which owns the seen-set. Returns once
/// every unit has finished and the writer has drained the channel.
pub async fn mirror_modules(
    source: Arc<dyn VulnSource>,
    store: Arc<Store>,
    index: &Index,
    options: &MirrorOptions,
) -> RunSummary {
    let (sender, receiver) = smol::channel::bounded::<Batch>(options.channel_capacity.get());

    let writer = DedupWriter::new(Arc::clone(&store));
    let consumer = smol::unblock(move || writer.drain(receiver));

    let semaphore = options
        .max_concurrent
        .map(|n| Arc::new(Semaphore::new(n.get())));

    info!("Fetching reports for {} modules", index.len());

    let mut tasks = Vec::with_capacity(index.len());

    for (module, updated_at) in index.iter() {
        let source = Arc::clone(&source);
        let store = Arc::clone(&store);
        let sender = sender.clone();
        let semaphore = semaphore.clone();
        let module = module.to_string();
        let updated_at = *updated_at;
        let timeout = options.fetch_timeout;

        let task = smol::spawn(async move {
            let _permit = match &semaphore {
                Some(s) => Some(s.acquire_arc().await),
                None => None,
            };

            let batch = fetch_reports(source, store, module, updated_at, timeout).await;
            if let Err(e) = sender.send(batch).await {
                warn!("Dropping reports for '{}': writer has stopped", e.0.module);
            }
        });

        tasks.push(task);
    }

    // Wait for all tasks to complete
    for task in tasks {
        task.await;
    }

    // Closing the channel lets the writer finish draining
    drop(sender);
    consumer.await
}
