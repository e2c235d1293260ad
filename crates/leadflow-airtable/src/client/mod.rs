//! Record operations built on the retry loop.

mod airtable_client;
mod config;

pub use airtable_client::AirtableClient;
pub use config::{AirtableConfig, DEFAULT_API_URL};
