//! # Result Persistence
//!
//! Storage boundary for [`TaskResult`] records. Every save is checked against
//! the previously stored record with
//! [`TaskResult::check_frozen_against`], so `id`, `enqueued_at`, `args` and
//! `kwargs` cannot drift once persisted. Lifecycle fields may change freely.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DispatchError, DispatchResult};
use crate::models::TaskResult;

/// A persisted record plus bookkeeping timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub result: TaskResult,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait TaskResultStore: Send + Sync {
    /// Insert or update the record keyed by its id
    ///
    /// Fails with `InvalidTask` when the record has no id, and with
    /// `FrozenField` when it changes a frozen field of the stored record.
    async fn save(&self, result: &TaskResult) -> DispatchResult<()>;

    async fn get(&self, id: &str) -> DispatchResult<Option<StoredResult>>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    results: DashMap<String, StoredResult>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[async_trait]
impl TaskResultStore for InMemoryResultStore {
    async fn save(&self, result: &TaskResult) -> DispatchResult<()> {
        let id = result
            .id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DispatchError::invalid_task("cannot persist a result without an id"))?;
        let now = Utc::now();

        match self.results.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                result.check_frozen_against(&entry.get().result)?;
                let stored = entry.get_mut();
                stored.result = result.clone();
                stored.updated_at = now;
                debug!(id, status = %result.status(), "Updated stored task result");
            }
            Entry::Vacant(entry) => {
                entry.insert(StoredResult {
                    result: result.clone(),
                    created_at: now,
                    updated_at: now,
                });
                debug!(id, status = %result.status(), "Stored new task result");
            }
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> DispatchResult<Option<StoredResult>> {
        Ok(self.results.get(id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FrozenField, TaskResultStatus};
    use serde_json::{json, Map};

    fn enqueued(id: &str) -> TaskResult {
        TaskResult::ready("send_email", vec![json!(1)], Map::new(), "sqs")
            .enqueued(Some(id.to_string()), Utc::now())
    }

    #[tokio::test]
    async fn test_first_save_and_lifecycle_update() {
        let store = InMemoryResultStore::new();
        let mut result = enqueued("m1");
        store.save(&result).await.unwrap();

        result.mark_started(Utc::now());
        result.push_worker_id("worker-1");
        store.save(&result).await.unwrap();

        let stored = store.get("m1").await.unwrap().unwrap();
        assert_eq!(stored.result.status(), TaskResultStatus::Running);
        assert_eq!(stored.result.worker_ids(), ["worker-1".to_string()]);
        assert!(stored.updated_at >= stored.created_at);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_frozen_field_change_rejected_at_storage_boundary() {
        let store = InMemoryResultStore::new();
        store.save(&enqueued("m1")).await.unwrap();

        let drifted = TaskResult::ready("send_email", vec![json!(2)], Map::new(), "sqs")
            .enqueued(Some("m1".to_string()), Utc::now());
        let err = store.save(&drifted).await.unwrap_err();

        match err {
            DispatchError::FrozenField(err) => {
                assert!(matches!(err.field, FrozenField::EnqueuedAt | FrozenField::Args))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_result_without_id_cannot_be_saved() {
        let store = InMemoryResultStore::new();
        let result = TaskResult::ready("send_email", vec![], Map::new(), "lambda");
        assert!(store.save(&result).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_missing_id_lookup() {
        let store = InMemoryResultStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }
}
