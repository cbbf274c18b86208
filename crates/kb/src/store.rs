use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use parking_lot::RwLock;
use tracing::debug;

use qna_core::Entry;

use crate::source::EntrySource;

struct CacheSlot {
    entries: Arc<Vec<Entry>>,
    fetched_at: Instant,
}

/// TTL cache over an [`EntrySource`] with an explicit lifecycle: populated
/// lazily on first use, refreshed once older than `ttl`, and invalidated on
/// demand.
///
/// `entries` hands out an immutable point-in-time snapshot, so concurrent
/// resolutions need no further coordination. A fetch failure propagates; it
/// is never silently treated as an empty knowledge base.
pub struct EntryStore {
    source: EntrySource,
    ttl: Duration,
    cache: RwLock<Option<CacheSlot>>,
}

impl EntryStore {
    pub fn new(source: EntrySource, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Current snapshot, refreshing from the source when stale.
    pub async fn entries(&self) -> Result<Arc<Vec<Entry>>> {
        if let Some(slot) = self.cache.read().as_ref() {
            if slot.fetched_at.elapsed() < self.ttl {
                return Ok(slot.entries.clone());
            }
        }
        // The lock is not held across the fetch; concurrent refreshes race
        // benignly and the last writer wins.
        let entries = Arc::new(self.source.fetch().await?);
        debug!(count = entries.len(), "refreshed knowledge base snapshot");
        *self.cache.write() = Some(CacheSlot {
            entries: entries.clone(),
            fetched_at: Instant::now(),
        });
        Ok(entries)
    }

    /// Drop the cached snapshot so the next read refetches.
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }
}
