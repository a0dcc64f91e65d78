use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    Result, TableDocument, TableNumber, TableStoreError, Version,
    store::{SaveOptions, TableStore},
};

/// Wraps a store so every call gives up after a fixed duration.
///
/// An expired call surfaces as `TableStoreError::Timeout`. The inner future
/// is dropped, so an in-memory save that never started its write leaves the
/// document untouched.
#[derive(Clone)]
pub struct TimeoutTableStore<S> {
    inner: S,
    limit: Duration,
}

impl<S: TableStore> TimeoutTableStore<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                metrics::counter!("table_store_timeouts_total", "operation" => operation)
                    .increment(1);
                tracing::warn!(
                    operation,
                    limit_ms = self.limit.as_millis() as u64,
                    "table store call timed out"
                );
                Err(TableStoreError::Timeout {
                    operation,
                    after: self.limit,
                })
            }
        }
    }
}

#[async_trait]
impl<S: TableStore> TableStore for TimeoutTableStore<S> {
    async fn insert(&self, document: TableDocument) -> Result<Version> {
        self.bounded("insert", self.inner.insert(document)).await
    }

    async fn get(&self, number: TableNumber) -> Result<Option<TableDocument>> {
        self.bounded("get", self.inner.get(number)).await
    }

    async fn save(&self, document: TableDocument, options: SaveOptions) -> Result<Version> {
        self.bounded("save", self.inner.save(document, options)).await
    }

    async fn list(&self) -> Result<Vec<TableDocument>> {
        self.bounded("list", self.inner.list()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryTableStore;

    #[tokio::test(start_paused = true)]
    async fn slow_save_times_out_and_leaves_document_unchanged() {
        let memory = InMemoryTableStore::new();
        memory
            .insert(TableDocument::new(
                TableNumber::new(1),
                serde_json::json!({"busy": false}),
            ))
            .await
            .unwrap();
        memory.set_save_delay(Some(Duration::from_secs(10)));

        let store = TimeoutTableStore::new(memory.clone(), Duration::from_millis(100));
        let mut doc = store.get(TableNumber::new(1)).await.unwrap().unwrap();
        doc.state["busy"] = serde_json::json!(true);

        let result = store.save(doc, SaveOptions::new()).await;
        assert!(matches!(
            result,
            Err(TableStoreError::Timeout { operation: "save", .. })
        ));

        let stored = memory.get(TableNumber::new(1)).await.unwrap().unwrap();
        assert_eq!(stored.version, Version::first());
        assert_eq!(stored.state["busy"], false);
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let store = TimeoutTableStore::new(InMemoryTableStore::new(), Duration::from_secs(1));
        let version = store
            .insert(TableDocument::new(TableNumber::new(2), serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(version, Version::first());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
