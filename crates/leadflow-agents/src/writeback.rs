//! Persisting agent results through one batch update.

use leadflow_airtable::{Error as StoreError, RecordPatch, RecordStore};
use tokio_util::sync::CancellationToken;

use crate::summary::{RecordOutcome, RecordStatus};
use crate::TRACING_TARGET_AGENT;

/// Writes `patches` and downgrades the outcomes of records that were not
/// applied.
///
/// On a partial failure, records confirmed by earlier chunks stay successful
/// and every record from the failed chunk onward is marked as an error. Any
/// other failure marks every patched record as an error.
pub(crate) async fn write_back(
    store: &dyn RecordStore,
    agent: &str,
    table: &str,
    patches: &[RecordPatch],
    outcomes: &mut [RecordOutcome],
    cancel: &CancellationToken,
) {
    if patches.is_empty() {
        return;
    }

    let error = match store.batch_update(table, patches, cancel).await {
        Ok(records) => {
            tracing::debug!(
                target: TRACING_TARGET_AGENT,
                agent,
                table,
                updated = records.len(),
                "Persisted agent results"
            );
            return;
        }
        Err(error) => error,
    };

    tracing::error!(
        target: TRACING_TARGET_AGENT,
        agent,
        table,
        error = %error,
        "Failed to persist agent results"
    );

    let (failed_ids, message): (Vec<&str>, String) = match &error {
        StoreError::PartialBatchFailure {
            unapplied_ids,
            source,
            ..
        } => (
            unapplied_ids.iter().map(String::as_str).collect(),
            source.to_string(),
        ),
        other => (
            patches.iter().map(|patch| patch.id.as_str()).collect(),
            other.to_string(),
        ),
    };

    for outcome in outcomes
        .iter_mut()
        .filter(|o| o.status == RecordStatus::Success)
    {
        if failed_ids.contains(&outcome.record_id.as_str()) {
            outcome.fail(message.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use leadflow_airtable::Record;
    use leadflow_airtable::mock::MemoryStore;

    use super::*;

    fn setup(n: usize, store: &MemoryStore) -> (Vec<RecordPatch>, Vec<RecordOutcome>) {
        (0..n)
            .map(|i| {
                let id = format!("rec{i:02}");
                store.insert("Properties", Record::new(&id));
                (
                    RecordPatch::new(&id).with_field("Motivation Score", 50),
                    RecordOutcome::success(&id).with_score(50),
                )
            })
            .unzip()
    }

    #[tokio::test]
    async fn test_partial_failure_marks_unapplied_records() {
        let store = MemoryStore::new().with_failing_chunks_from(1);
        let (patches, mut outcomes) = setup(23, &store);
        outcomes.push(RecordOutcome::error("recModel", "model unavailable"));

        write_back(
            &store,
            "score",
            "Properties",
            &patches,
            &mut outcomes,
            &CancellationToken::new(),
        )
        .await;

        let failed: Vec<_> = outcomes
            .iter()
            .filter(|o| o.status == RecordStatus::Error)
            .map(|o| o.record_id.as_str())
            .collect();
        assert_eq!(failed.len(), 14);
        assert_eq!(failed[0], "rec10");
        assert!(outcomes[..10].iter().all(|o| o.status == RecordStatus::Success));
        assert_eq!(outcomes[10].score, Some(50));
    }

    #[tokio::test]
    async fn test_success_leaves_outcomes() {
        let store = MemoryStore::new();
        let (patches, mut outcomes) = setup(3, &store);

        write_back(
            &store,
            "score",
            "Properties",
            &patches,
            &mut outcomes,
            &CancellationToken::new(),
        )
        .await;

        assert!(outcomes.iter().all(|o| o.status == RecordStatus::Success));
        assert_eq!(store.updates().len(), 1);
    }
}
