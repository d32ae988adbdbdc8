//! # Destination Cache
//!
//! Concurrent name → handle cache with init-once semantics per key. Resolving a
//! destination usually costs a remote lookup (queue URL, queue ARN) or a local
//! client construction; both are performed at most once per key for the
//! lifetime of the backend.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::debug;

/// Per-backend cache of resolved destination handles
///
/// Concurrent first lookups of the same key run the loader exactly once; the
/// other callers wait for that result. A failed load is not cached, so the next
/// call retries.
#[derive(Debug)]
pub struct DestinationCache<H> {
    name: &'static str,
    cells: DashMap<String, Arc<OnceCell<H>>>,
}

impl<H> DestinationCache<H>
where
    H: Clone + Send + Sync,
{
    /// `name` labels log events, e.g. `"queue_url"`
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cells: DashMap::new(),
        }
    }

    /// Cached handle for `key`, running `loader` if nothing is cached yet
    pub async fn get_or_try_init<F, Fut, E>(&self, key: &str, loader: F) -> Result<H, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<H, E>>,
    {
        // Clone the cell out so the shard lock is not held across the await
        let cell = self
            .cells
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        if let Some(handle) = cell.get() {
            debug!(cache = self.name, key, "Destination cache hit");
            return Ok(handle.clone());
        }

        let handle = cell.get_or_try_init(loader).await?;
        Ok(handle.clone())
    }

    /// Cached handle for `key` without loading
    pub fn get(&self, key: &str) -> Option<H> {
        self.cells
            .get(key)
            .and_then(|cell| cell.get().cloned())
    }

    /// Every resolved handle
    pub fn handles(&self) -> Vec<H> {
        self.cells
            .iter()
            .filter_map(|entry| entry.value().get().cloned())
            .collect()
    }

    /// Number of resolved keys
    pub fn len(&self) -> usize {
        self.cells
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cells.clear();
    }
}
