//! Ollama client implementation.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::OllamaConfig;
use crate::{Error, LanguageModel, Result, TRACING_TARGET_CLIENT};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

/// Ollama client for non-streaming text generation.
///
/// Each call is a single request bounded by the configured timeout; there are
/// no retries.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    inner: Arc<OllamaClientInner>,
}

#[derive(Debug)]
struct OllamaClientInner {
    http_client: HttpClient,
    generate_url: Url,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a new Ollama client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        config.validate()?;
        let generate_url = config.generate_url()?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            base_url = %config.base_url,
            model = %config.model,
            "Creating Ollama client"
        );

        let http_client = ClientBuilder::new()
            .timeout(config.timeout())
            .user_agent(format!("leadflow-ollama/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(OllamaClientInner {
                http_client,
                generate_url,
                config,
            }),
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &OllamaConfig {
        &self.inner.config
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.inner.config.model,
            prompt,
            stream: false,
        };

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            model = %self.inner.config.model,
            prompt_len = prompt.len(),
            "Sending generate request"
        );

        let response = self
            .inner
            .http_client
            .post(self.inner.generate_url.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let result = parse_generate_response(status, &body);
        match &result {
            Ok(text) => tracing::debug!(
                target: TRACING_TARGET_CLIENT,
                response_len = text.len(),
                "Generate request completed"
            ),
            Err(err) => tracing::error!(
                target: TRACING_TARGET_CLIENT,
                status = status.as_u16(),
                error = %err,
                "Generate request failed"
            ),
        }
        result
    }

    fn model_name(&self) -> &str {
        &self.inner.config.model
    }
}

/// Extracts the generated text from a generate response.
fn parse_generate_response(status: StatusCode, body: &str) -> Result<String> {
    let parsed = serde_json::from_str::<GenerateResponse>(body);

    if !status.is_success() {
        let message = match parsed {
            Ok(GenerateResponse {
                error: Some(error), ..
            }) => error_text(&error),
            _ => body.trim().to_string(),
        };
        return Err(Error::api_error(status.as_u16(), message));
    }

    let parsed = parsed.map_err(|e| Error::InvalidResponse(e.to_string()))?;
    match parsed {
        GenerateResponse {
            response: Some(text),
            ..
        } if !text.is_empty() => Ok(text),
        GenerateResponse {
            error: Some(error), ..
        } => Err(Error::api_error(status.as_u16(), error_text(&error))),
        GenerateResponse { response, .. } => Ok(response.unwrap_or_default()),
    }
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let body = r#"{"model": "mistral:7b", "response": " 85", "done": true}"#;
        assert_eq!(parse_generate_response(StatusCode::OK, body).unwrap(), " 85");
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"error": "model 'mistral:7b' not found"}"#;
        let error = parse_generate_response(StatusCode::OK, body).unwrap_err();
        assert!(matches!(error, Error::Api { status: 200, .. }));

        let error = parse_generate_response(StatusCode::NOT_FOUND, body).unwrap_err();
        match error {
            Error::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "model 'mistral:7b' not found");
            }
            other => panic!("Expected API error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_invalid_body() {
        let error = parse_generate_response(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(error, Error::InvalidResponse(_)));

        let error =
            parse_generate_response(StatusCode::INTERNAL_SERVER_ERROR, "boom").unwrap_err();
        assert!(matches!(error, Error::Api { status: 500, ref message } if message == "boom"));
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            model: "mistral:7b",
            prompt: "hello",
            stream: false,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"model": "mistral:7b", "prompt": "hello", "stream": false})
        );
    }

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new(OllamaConfig::default()).unwrap();
        assert_eq!(client.model_name(), "mistral:7b");
        assert!(OllamaClient::new(OllamaConfig::default().with_model("")).is_err());
    }
}
