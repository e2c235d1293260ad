//! Prelude module for leadflow-agents.

pub use crate::calculator::{CashOfferInput, MultifamilyInput, Weights};
pub use crate::error::{Error, Result};
pub use crate::runner::{AgentKind, AgentRunner};
pub use crate::schema::PropertySchema;
pub use crate::summary::AgentSummary;
