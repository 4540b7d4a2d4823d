use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info_span, Instrument};

use super::MenuItemStore;
use crate::models::{MenuItem, MenuItemPatch, NewMenuItem, RepositoryResult};
use crate::observability::Metrics;

/// Store decorator recording latency and outcome of every store call
pub struct MeteredMenuItemStore {
    inner: Arc<dyn MenuItemStore>,
    metrics: Arc<Metrics>,
    table: String,
}

impl MeteredMenuItemStore {
    pub fn new(inner: Arc<dyn MenuItemStore>, metrics: Arc<Metrics>, table: impl Into<String>) -> Self {
        Self {
            inner,
            metrics,
            table: table.into(),
        }
    }

    async fn observe<T, F>(&self, operation: &str, future: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>> + Send,
        T: Send,
    {
        let span = info_span!("store_operation", operation = %operation, table = %self.table);
        let start_time = Instant::now();

        let result = future.instrument(span).await;
        let duration_seconds = start_time.elapsed().as_secs_f64();

        self.metrics.record_database_operation(
            operation,
            &self.table,
            result.is_ok(),
            duration_seconds,
        );

        if let Err(ref e) = result {
            error!(
                operation = %operation,
                table = %self.table,
                error = %e,
                duration_ms = (duration_seconds * 1000.0) as u64,
                "Store operation failed"
            );
        }

        result
    }
}

#[async_trait]
impl MenuItemStore for MeteredMenuItemStore {
    async fn insert(&self, item: NewMenuItem) -> RepositoryResult<MenuItem> {
        self.observe("insert", self.inner.insert(item)).await
    }

    async fn find_all(&self) -> RepositoryResult<Vec<MenuItem>> {
        self.observe("find_all", self.inner.find_all()).await
    }

    async fn find_by_id_and_update(
        &self,
        id: &str,
        patch: MenuItemPatch,
    ) -> RepositoryResult<Option<MenuItem>> {
        self.observe(
            "find_by_id_and_update",
            self.inner.find_by_id_and_update(id, patch),
        )
        .await
    }

    async fn find_by_id_and_delete(&self, id: &str) -> RepositoryResult<Option<MenuItem>> {
        self.observe("find_by_id_and_delete", self.inner.find_by_id_and_delete(id))
            .await
    }
}
