//! Prelude module for leadflow-airtable.
//!
//! This module re-exports the most commonly used types and traits from the
//! leadflow-airtable library. Import this module to get quick access to the
//! record operations and their inputs.

pub use crate::client::{AirtableClient, AirtableConfig};
pub use crate::error::{Error, Operation, Result};
pub use crate::query::{Query, SortDirection};
pub use crate::record::{FieldValue, Fields, Record, RecordPatch};
pub use crate::store::RecordStore;
