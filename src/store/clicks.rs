//! Detached click tracking.
//!
//! Redirect handlers must never wait on the slug table, so clicks land
//! in a lock-free buffer and a background task folds them into the
//! table on an interval. One conditional write per flush regardless of
//! how many redirects happened. A failed flush re-merges its counts
//! into the buffer and tries again next interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

use super::SlugStore;

pub struct ClickManager {
    store: Arc<SlugStore>,
    buffer: DashMap<String, u64>,
    flush_interval: Duration,
    flushing: AtomicBool,
}

impl ClickManager {
    pub fn new(store: Arc<SlugStore>, flush_interval: Duration) -> Self {
        Self {
            store,
            buffer: DashMap::new(),
            flush_interval,
            flushing: AtomicBool::new(false),
        }
    }

    /// Buffers one click; synchronous and lock-free.
    pub fn increment(&self, slug: &str) {
        *self.buffer.entry(slug.to_string()).or_insert(0) += 1;
    }

    /// Runs the periodic flush loop; spawn this once at startup.
    pub async fn run(self: Arc<Self>) {
        loop {
            sleep(self.flush_interval).await;
            self.flush().await;
        }
    }

    pub async fn flush(&self) {
        if self.flushing.swap(true, Ordering::SeqCst) {
            debug!("click flush already in progress, skipping");
            return;
        }

        // Drain entry by entry; clicks arriving mid-flush land in fresh
        // entries instead of being wiped by a blanket clear.
        let keys: Vec<String> = self.buffer.iter().map(|entry| entry.key().clone()).collect();
        let updates: Vec<(String, u64)> = keys
            .into_iter()
            .filter_map(|key| self.buffer.remove(&key))
            .collect();

        if updates.is_empty() {
            self.flushing.store(false, Ordering::SeqCst);
            return;
        }

        if let Err(e) = self.store.apply_clicks(&updates).await {
            warn!("click flush failed, re-buffering {} slugs: {}", updates.len(), e);
            for (slug, count) in updates {
                *self.buffer.entry(slug).or_insert(0) += count;
            }
        } else {
            debug!("flushed clicks for {} slugs", updates.len());
        }

        self.flushing.store(false, Ordering::SeqCst);
    }

    /// Number of buffered, not yet flushed clicks. Test hook.
    pub fn pending(&self) -> u64 {
        self.buffer.iter().map(|entry| *entry.value()).sum()
    }
}
