//! Request extractors with JSON error responses.

mod json;

pub use self::json::Json;
