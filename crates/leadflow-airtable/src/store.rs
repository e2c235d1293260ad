//! Record store abstraction consumed by the scoring agents.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{AirtableClient, Query, Record, RecordPatch, Result};

/// Read and write access to a record store.
///
/// Agents depend on this trait instead of the concrete client so they can be
/// exercised against an in-memory store. Implementations own their retry and
/// pagination behaviour; callers only see the aggregated result.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Lists every record matching the query.
    async fn list_records(&self, query: &Query, cancel: &CancellationToken)
    -> Result<Vec<Record>>;

    /// Applies the patches in input order and returns the updated records.
    async fn batch_update(
        &self,
        table: &str,
        patches: &[RecordPatch],
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>>;
}

#[async_trait]
impl RecordStore for AirtableClient {
    async fn list_records(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>> {
        AirtableClient::list_records(self, query, cancel).await
    }

    async fn batch_update(
        &self,
        table: &str,
        patches: &[RecordPatch],
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>> {
        AirtableClient::batch_update(self, table, patches, cancel).await
    }
}
