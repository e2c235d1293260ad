//! Application state and its configuration.

mod config;
mod state;

pub use self::config::ServiceConfig;
pub use self::state::ServiceState;
