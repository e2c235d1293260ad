//! Offset-cursor pagination over list responses.

use std::future::Future;

use serde::Deserialize;

use crate::{Error, Record, Result, TRACING_TARGET_CLIENT};

/// One page of a list response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct ListPage {
    #[serde(default)]
    pub records: Vec<Record>,
    /// Cursor for the next page; absent on the last page.
    #[serde(default)]
    pub offset: Option<String>,
}

/// Fetches pages until the server stops returning a cursor.
///
/// Records are accumulated in server order without deduplication. A failure
/// on the first page is returned as is; a failure on a later page discards
/// the accumulated records and yields [`Error::PaginationAborted`].
pub(crate) async fn collect_pages<F, Fut>(table: &str, mut fetch_page: F) -> Result<Vec<Record>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<ListPage>>,
{
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages_completed = 0usize;

    loop {
        let page = match fetch_page(cursor.take()).await {
            Ok(page) => page,
            Err(err) if pages_completed == 0 => return Err(err),
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_CLIENT,
                    table,
                    pages_completed,
                    records_discarded = records.len(),
                    error = %err,
                    "Listing aborted"
                );
                return Err(Error::PaginationAborted {
                    table: table.to_owned(),
                    pages_completed,
                    records_discarded: records.len(),
                    source: Box::new(err),
                });
            }
        };

        pages_completed += 1;
        records.extend(page.records);

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            table,
            page = pages_completed,
            total = records.len(),
            "Fetched page"
        );

        match page.offset {
            Some(offset) if !offset.is_empty() => cursor = Some(offset),
            _ => break,
        }
    }

    Ok(records)
}
