#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the main library
pub const TRACING_TARGET: &str = "leadflow_airtable";

/// Tracing target for record operations
pub const TRACING_TARGET_CLIENT: &str = "leadflow_airtable::client";

/// Tracing target for the retry loop
pub const TRACING_TARGET_RETRY: &str = "leadflow_airtable::retry";

/// Tracing target for single HTTP round trips
pub const TRACING_TARGET_TRANSPORT: &str = "leadflow_airtable::transport";

mod batch;
mod client;
mod error;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;
mod pagination;
#[doc(hidden)]
pub mod prelude;
mod query;
mod record;
mod retry;
mod store;
pub mod transport;

pub use crate::client::{AirtableClient, AirtableConfig, DEFAULT_API_URL};
pub use crate::error::{Error, Operation, Result, TransientCause};
pub use crate::query::{Query, Sort, SortDirection};
pub use crate::record::{FieldValue, Fields, Record, RecordPatch};
pub use crate::retry::RetryPolicy;
pub use crate::store::RecordStore;
