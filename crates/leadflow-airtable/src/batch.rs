//! Chunked batch writes.

use std::future::Future;

use crate::{Error, Operation, Record, Result, TRACING_TARGET_CLIENT};

/// Largest number of records the server accepts in one write request.
pub const MAX_BATCH_SIZE: usize = 10;

/// Sends `entries` as consecutive chunks of at most `chunk_size`, in order,
/// and concatenates the returned records.
///
/// Chunks are dispatched sequentially. When a chunk fails, no later chunk is
/// sent and the failure is reported as [`Error::PartialBatchFailure`] carrying
/// the records confirmed by earlier chunks.
pub(crate) async fn apply_in_chunks<T, I, F, Fut>(
    operation: Operation,
    table: &str,
    entries: &[T],
    chunk_size: usize,
    entry_id: I,
    mut send_chunk: F,
) -> Result<Vec<Record>>
where
    I: Fn(&T) -> Option<&str>,
    F: FnMut(usize, &[T]) -> Fut,
    Fut: Future<Output = Result<Vec<Record>>>,
{
    let chunk_size = chunk_size.clamp(1, MAX_BATCH_SIZE);
    let mut confirmed = Vec::with_capacity(entries.len());

    for (chunk_index, chunk) in entries.chunks(chunk_size).enumerate() {
        let start = chunk_index * chunk_size;
        let end = start + chunk.len();

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            operation = %operation,
            table,
            chunk_index,
            chunk_len = chunk.len(),
            "Sending batch chunk"
        );

        match send_chunk(chunk_index, chunk).await {
            Ok(records) => confirmed.extend(records),
            Err(err) => {
                let unapplied_ids: Vec<String> = entries[start..]
                    .iter()
                    .filter_map(|entry| entry_id(entry).map(str::to_owned))
                    .collect();

                tracing::error!(
                    target: TRACING_TARGET_CLIENT,
                    operation = %operation,
                    table,
                    chunk_index,
                    confirmed = confirmed.len(),
                    unapplied = entries.len() - start,
                    error = %err,
                    "Batch chunk failed"
                );

                return Err(Error::PartialBatchFailure {
                    operation,
                    table: table.to_owned(),
                    chunk_index,
                    attempted: start..end,
                    total: entries.len(),
                    confirmed,
                    unapplied_ids,
                    source: Box::new(err),
                });
            }
        }
    }

    Ok(confirmed)
}
