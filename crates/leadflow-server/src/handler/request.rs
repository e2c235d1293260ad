//! Request bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::handler::{ErrorKind, Result};

/// Optional body of the run agent routes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunAgentRequest {
    /// Maximum number of records to process; a number or a numeric string.
    #[serde(default)]
    pub limit: Option<Value>,
}

impl RunAgentRequest {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(Value::from(limit)),
        }
    }

    /// Returns the validated limit.
    pub fn limit(&self) -> Result<Option<usize>> {
        let limit = match &self.limit {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(number)) => number.as_u64(),
            Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
            Some(_) => None,
        };
        limit
            .and_then(|limit| usize::try_from(limit).ok())
            .map(Some)
            .ok_or_else(|| ErrorKind::BadRequest.with_message("limit must be an integer"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(body: Value) -> Result<Option<usize>> {
        serde_json::from_value::<RunAgentRequest>(body).unwrap().limit()
    }

    #[test]
    fn test_limit_parsing() {
        assert_eq!(parse(json!({})).unwrap(), None);
        assert_eq!(parse(json!({"limit": null})).unwrap(), None);
        assert_eq!(parse(json!({"limit": 5})).unwrap(), Some(5));
        assert_eq!(parse(json!({"limit": " 12 "})).unwrap(), Some(12));
        assert!(parse(json!({"limit": "ten"})).is_err());
        assert!(parse(json!({"limit": -1})).is_err());
        assert!(parse(json!({"limit": [1]})).is_err());
    }
}
