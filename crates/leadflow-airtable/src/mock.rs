//! Test doubles for the transport and the record store.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! leadflow-airtable = { workspace = true, features = ["test-utils"] }
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::batch::{MAX_BATCH_SIZE, apply_in_chunks};
use crate::transport::{Outcome, Transport, TransportRequest};
use crate::{Error, Operation, Query, Record, RecordPatch, RecordStore, Result, TransientCause};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct MockTransportState {
    script: VecDeque<Outcome>,
    requests: Vec<TransportRequest>,
}

/// Transport replaying a scripted sequence of outcomes.
///
/// Each call pops the next outcome and records the request. Once the script
/// is exhausted every call yields a network failure. Clones share the script
/// and the request log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    /// Creates a transport replaying `outcomes` in order.
    pub fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockTransportState {
                script: outcomes.into_iter().collect(),
                requests: Vec::new(),
            })),
        }
    }

    /// Appends an outcome to the script.
    pub fn push(&self, outcome: Outcome) {
        lock(&self.state).script.push_back(outcome);
    }

    /// Returns the number of requests sent so far.
    pub fn calls(&self) -> usize {
        lock(&self.state).requests.len()
    }

    /// Returns every request sent so far, in order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        lock(&self.state).requests.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &TransportRequest) -> Outcome {
        let mut state = lock(&self.state);
        state.requests.push(request.clone());
        state
            .script
            .pop_front()
            .unwrap_or_else(|| Outcome::NetworkFailure {
                cause: "mock transport script exhausted".to_owned(),
            })
    }
}

type ErrorFactory = Arc<dyn Fn() -> Error + Send + Sync>;

#[derive(Default)]
struct MemoryStoreState {
    tables: BTreeMap<String, Vec<Record>>,
    queries: Vec<Query>,
    updates: Vec<Vec<RecordPatch>>,
}

/// In-memory [`RecordStore`].
///
/// Listing returns the table in insertion order and honours `max_records`;
/// filter formulas, views and sorts are ignored. Batch updates are chunked
/// like the real client so partial failures can be injected per chunk.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryStoreState>>,
    batch_size: usize,
    fail_batch_from: Option<usize>,
    list_error: Option<ErrorFactory>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store with the default batch size.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryStoreState::default())),
            batch_size: MAX_BATCH_SIZE,
            fail_batch_from: None,
            list_error: None,
        }
    }

    /// Sets the number of patches applied per chunk.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Makes every batch chunk from `chunk_index` onward fail with an
    /// exhausted 503.
    #[must_use]
    pub fn with_failing_chunks_from(mut self, chunk_index: usize) -> Self {
        self.fail_batch_from = Some(chunk_index);
        self
    }

    /// Makes every listing fail with the error built by `error`.
    #[must_use]
    pub fn with_list_error(mut self, error: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        self.list_error = Some(Arc::new(error));
        self
    }

    /// Appends a record to a table.
    pub fn insert(&self, table: &str, record: Record) {
        lock(&self.state)
            .tables
            .entry(table.to_owned())
            .or_default()
            .push(record);
    }

    /// Returns the current records of a table.
    pub fn records(&self, table: &str) -> Vec<Record> {
        lock(&self.state)
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns a record by id.
    pub fn record(&self, table: &str, id: &str) -> Option<Record> {
        lock(&self.state)
            .tables
            .get(table)
            .and_then(|records| records.iter().find(|r| r.id == id).cloned())
    }

    /// Returns every query received so far.
    pub fn queries(&self) -> Vec<Query> {
        lock(&self.state).queries.clone()
    }

    /// Returns every applied chunk of patches, in order.
    pub fn updates(&self) -> Vec<Vec<RecordPatch>> {
        lock(&self.state).updates.clone()
    }

    fn apply_chunk(&self, table: &str, chunk: &[RecordPatch]) -> Result<Vec<Record>> {
        let mut state = lock(&self.state);
        let records = state.tables.entry(table.to_owned()).or_default();

        if let Some(missing) = chunk
            .iter()
            .find(|patch| !records.iter().any(|r| r.id == patch.id))
        {
            return Err(Error::ClientRequest {
                operation: Operation::BatchUpdate,
                resource: table.to_owned(),
                attempts: 1,
                status: 404,
                message: format!("record {} not found", missing.id),
            });
        }

        let mut updated = Vec::with_capacity(chunk.len());
        for patch in chunk {
            if let Some(record) = records.iter_mut().find(|r| r.id == patch.id) {
                for (name, value) in &patch.fields {
                    record.fields.insert(name.clone(), value.clone());
                }
                updated.push(record.clone());
            }
        }
        state.updates.push(chunk.to_vec());

        Ok(updated)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_records(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                operation: Operation::List,
                resource: query.table().to_owned(),
                attempts: 0,
            });
        }
        if let Some(error) = &self.list_error {
            return Err(error());
        }

        let mut state = lock(&self.state);
        state.queries.push(query.clone());

        let mut records = state.tables.get(query.table()).cloned().unwrap_or_default();
        if let Some(max) = query.max_records() {
            records.truncate(max as usize);
        }
        Ok(records)
    }

    async fn batch_update(
        &self,
        table: &str,
        patches: &[RecordPatch],
        _cancel: &CancellationToken,
    ) -> Result<Vec<Record>> {
        apply_in_chunks(
            Operation::BatchUpdate,
            table,
            patches,
            self.batch_size,
            |patch| Some(patch.id.as_str()),
            |index, chunk| {
                let result = match self.fail_batch_from {
                    Some(from) if index >= from => Err(Error::TransientFailureExhausted {
                        operation: Operation::BatchUpdate,
                        resource: table.to_owned(),
                        attempts: 5,
                        last_cause: TransientCause::Status(503),
                    }),
                    _ => self.apply_chunk(table, chunk),
                };
                async move { result }
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_applies_patches() {
        let store = MemoryStore::new();
        store.insert("Properties", Record::new("rec1").with_field("Address", "1 Main St"));

        let updated = store
            .batch_update(
                "Properties",
                &[RecordPatch::new("rec1").with_field("Motivation Score", 80)],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        let record = store.record("Properties", "rec1").unwrap();
        assert_eq!(record.field("Motivation Score").and_then(|v| v.as_f64()), Some(80.0));
        assert_eq!(record.field("Address").and_then(|v| v.as_str()), Some("1 Main St"));
    }

    #[tokio::test]
    async fn test_memory_store_injected_chunk_failure() {
        let store = MemoryStore::new().with_failing_chunks_from(1);
        let patches: Vec<_> = (0..15)
            .map(|i| {
                let id = format!("rec{i}");
                store.insert("Properties", Record::new(&id));
                RecordPatch::new(id).with_field("Motivation Score", 10)
            })
            .collect();

        let error = store
            .batch_update("Properties", &patches, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            Error::PartialBatchFailure { ref confirmed, ref unapplied_ids, .. }
                if confirmed.len() == 10 && unapplied_ids.len() == 5
        ));
        assert_eq!(store.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_transport_records_requests() {
        let transport = MockTransport::new([Outcome::RateLimited { retry_after: None }]);
        let request = TransportRequest::get("Properties");

        assert_eq!(
            transport.send(&request).await,
            Outcome::RateLimited { retry_after: None }
        );
        assert!(matches!(
            transport.send(&request).await,
            Outcome::NetworkFailure { .. }
        ));
        assert_eq!(transport.calls(), 2);
        assert_eq!(transport.requests()[0], request);
    }
}
