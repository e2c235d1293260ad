#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the main library
pub const TRACING_TARGET: &str = "leadflow_ollama";

/// Tracing target for client operations
pub const TRACING_TARGET_CLIENT: &str = "leadflow_ollama::client";

mod client;
mod error;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;
mod model;
#[doc(hidden)]
pub mod prelude;

pub use crate::client::{OllamaClient, OllamaConfig};
pub use crate::error::{Error, Result};
pub use crate::model::LanguageModel;
