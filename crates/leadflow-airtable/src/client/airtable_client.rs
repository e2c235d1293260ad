//! Airtable client implementation.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::AirtableConfig;
use crate::batch::apply_in_chunks;
use crate::pagination::{ListPage, collect_pages};
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, Transport, TransportRequest};
use crate::{Fields, Operation, Query, Record, RecordPatch, Result, TRACING_TARGET_CLIENT};

/// Body of batch write responses.
#[derive(Debug, Deserialize)]
struct RecordsEnvelope {
    records: Vec<Record>,
}

/// Airtable REST client.
///
/// Every operation goes through the retry loop; list requests are paginated
/// and batch writes are chunked. Cloning is cheap and clones share the
/// connection pool.
///
/// # Examples
///
/// ```ignore
/// use leadflow_airtable::{AirtableClient, AirtableConfig, Query};
/// use tokio_util::sync::CancellationToken;
///
/// let client = AirtableClient::new(AirtableConfig::new("pat_xxx", "appXXX"))?;
/// let query = Query::new("Properties").with_filter("{Motivation Score} >= 70");
/// let records = client.list_records(&query, &CancellationToken::new()).await?;
/// ```
#[derive(Clone)]
pub struct AirtableClient {
    inner: Arc<AirtableClientInner>,
}

struct AirtableClientInner {
    transport: Arc<dyn Transport>,
    config: AirtableConfig,
    policy: RetryPolicy,
}

impl AirtableClient {
    /// Creates a client backed by `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: AirtableConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            base_url = %transport.base_url(),
            max_attempts = config.max_attempts,
            batch_size = config.batch_size,
            "Created Airtable client"
        );

        Ok(Self::with_transport(config, transport))
    }

    /// Creates a client issuing requests through a custom transport.
    pub fn with_transport(config: AirtableConfig, transport: impl Transport + 'static) -> Self {
        let policy = config.retry_policy();
        Self {
            inner: Arc::new(AirtableClientInner {
                transport: Arc::new(transport),
                config,
                policy,
            }),
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &AirtableConfig {
        &self.inner.config
    }

    /// Returns the retry policy applied to every request.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.policy
    }

    /// Lists every record matching the query, following the page cursor
    /// until the server stops returning one.
    pub async fn list_records(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>> {
        let table = query.table();
        let page_size = self.inner.config.page_size;

        let records = collect_pages(table, |offset| {
            let request = TransportRequest::get(table)
                .with_params(query.params(page_size, offset.as_deref()));
            async move {
                self.inner
                    .policy
                    .execute_as::<ListPage>(
                        self.inner.transport.as_ref(),
                        Operation::List,
                        &request,
                        cancel,
                    )
                    .await
            }
        })
        .await?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            table,
            count = records.len(),
            "Listed records"
        );

        Ok(records)
    }

    /// Reads a single record.
    pub async fn get_record(
        &self,
        table: &str,
        record_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Record> {
        let request = TransportRequest::get(table).with_record_id(record_id);
        self.execute(Operation::Get, &request, cancel).await
    }

    /// Creates a single record.
    ///
    /// Creates are retried like every other request; a create whose response
    /// was lost may be applied twice.
    pub async fn create_record(
        &self,
        table: &str,
        fields: Fields,
        cancel: &CancellationToken,
    ) -> Result<Record> {
        let body = self.write_body(json!({ "fields": fields }));
        let request = TransportRequest::post(table, body);
        let record: Record = self.execute(Operation::Create, &request, cancel).await?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            table,
            record_id = %record.id,
            "Created record"
        );

        Ok(record)
    }

    /// Overwrites the fields listed in the patch.
    pub async fn update_record(
        &self,
        table: &str,
        patch: RecordPatch,
        cancel: &CancellationToken,
    ) -> Result<Record> {
        let body = self.write_body(json!({ "fields": patch.fields }));
        let request = TransportRequest::patch(table, body).with_record_id(&patch.id);
        let record: Record = self.execute(Operation::Update, &request, cancel).await?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            table,
            record_id = %record.id,
            "Updated record"
        );

        Ok(record)
    }

    /// Updates many records, `batch_size` per request, in input order.
    ///
    /// # Errors
    ///
    /// A failed chunk yields [`crate::Error::PartialBatchFailure`] with the
    /// records confirmed by earlier chunks.
    pub async fn batch_update(
        &self,
        table: &str,
        patches: &[RecordPatch],
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>> {
        let records = apply_in_chunks(
            Operation::BatchUpdate,
            table,
            patches,
            self.inner.config.batch_size,
            |patch| Some(patch.id.as_str()),
            |_, chunk| {
                let body = self.write_body(json!({ "records": chunk }));
                let request = TransportRequest::patch(table, body);
                async move {
                    self.execute::<RecordsEnvelope>(Operation::BatchUpdate, &request, cancel)
                        .await
                        .map(|envelope| envelope.records)
                }
            },
        )
        .await?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            table,
            count = records.len(),
            "Batch updated records"
        );

        Ok(records)
    }

    /// Creates many records, `batch_size` per request, in input order.
    pub async fn batch_create(
        &self,
        table: &str,
        entries: &[Fields],
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>> {
        let records = apply_in_chunks(
            Operation::BatchCreate,
            table,
            entries,
            self.inner.config.batch_size,
            |_| None,
            |_, chunk| {
                let records: Vec<Value> = chunk
                    .iter()
                    .map(|fields| json!({ "fields": fields }))
                    .collect();
                let body = self.write_body(json!({ "records": records }));
                let request = TransportRequest::post(table, body);
                async move {
                    self.execute::<RecordsEnvelope>(Operation::BatchCreate, &request, cancel)
                        .await
                        .map(|envelope| envelope.records)
                }
            },
        )
        .await?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            table,
            count = records.len(),
            "Batch created records"
        );

        Ok(records)
    }

    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        operation: Operation,
        request: &TransportRequest,
        cancel: &CancellationToken,
    ) -> Result<T> {
        self.inner
            .policy
            .execute_as(self.inner.transport.as_ref(), operation, request, cancel)
            .await
    }

    /// Adds `"typecast": true` to a write body when enabled.
    fn write_body(&self, mut body: Value) -> Value {
        if self.inner.config.typecast
            && let Value::Object(map) = &mut body
        {
            map.insert("typecast".to_owned(), Value::Bool(true));
        }
        body
    }
}

impl fmt::Debug for AirtableClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirtableClient")
            .field("config", &self.inner.config)
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}
