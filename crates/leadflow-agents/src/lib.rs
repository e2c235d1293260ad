#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the main library
pub const TRACING_TARGET: &str = "leadflow_agents";

/// Tracing target for agent runs
pub const TRACING_TARGET_AGENT: &str = "leadflow_agents::agent";

pub mod calculator;
mod error;
mod listing;
mod offer;
#[doc(hidden)]
pub mod prelude;
mod runner;
mod schema;
mod score;
mod summary;
mod writeback;

pub use crate::error::{Error, Result};
pub use crate::offer::{OfferAgent, OfferAgentConfig, cash_offer};
pub use crate::runner::{AgentKind, AgentRunner};
pub use crate::schema::PropertySchema;
pub use crate::score::{ScoreAgent, ScoreAgentConfig, parse_score};
pub use crate::summary::{AgentSummary, RecordOutcome, RecordStatus};
