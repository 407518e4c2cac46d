//! HTTP client for a local Ollama server.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::OllamaError;

use super::types::{ChatRequest, ChatResponse, ModelInfo, TagsResponse};

/// Default API root of a local Ollama install.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/api";

/// Environment variable read by the CLI to override the base URL.
pub const BASE_URL_ENV_VAR: &str = "DIFFSAGE_OLLAMA_URL";

/// Default timeout for a single request (2 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Environment variable to override the default timeout.
const TIMEOUT_ENV_VAR: &str = "DIFFSAGE_OLLAMA_TIMEOUT";

/// Get the configured request timeout.
///
/// Reads from DIFFSAGE_OLLAMA_TIMEOUT if set, otherwise uses 120 seconds.
/// Logs a warning if the variable is set but not a whole number of seconds.
pub fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

/// Normalize an optional base URL, falling back to [`DEFAULT_BASE_URL`].
pub fn resolve_base_url(explicit: Option<&str>) -> String {
    let url = match explicit.map(str::trim) {
        Some(u) if !u.is_empty() => u,
        _ => DEFAULT_BASE_URL,
    };
    url.trim_end_matches('/').to_string()
}

/// Trait for talking to a model server.
///
/// This abstraction allows mocking the server in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelServer: Send + Sync {
    /// List locally installed models.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, OllamaError>;

    /// Send a non-streaming chat request and return the reply content.
    async fn chat(&self, request: &ChatRequest) -> Result<String, OllamaError>;
}

/// reqwest-backed [`ModelServer`].
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Client for `base_url` using the configured timeout.
    pub fn new(base_url: &str) -> Result<Self, OllamaError> {
        Self::with_timeout(base_url, get_timeout())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, OllamaError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(OllamaError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: resolve_base_url(Some(base_url)),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn transport_error(&self, err: reqwest::Error) -> OllamaError {
        if err.is_timeout() {
            OllamaError::Timeout(self.timeout.as_secs())
        } else {
            OllamaError::Connection {
                url: self.base_url.clone(),
                reason: err.to_string(),
            }
        }
    }

    /// Read the body of a response, turning non-200 statuses into errors.
    async fn read_ok_body(&self, response: reqwest::Response) -> Result<String, OllamaError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if status != StatusCode::OK {
            return Err(OllamaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl ModelServer for OllamaClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, OllamaError> {
        let url = self.endpoint("tags");
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let body = self.read_ok_body(response).await?;

        let tags: TagsResponse = serde_json::from_str(&body)
            .map_err(|e| OllamaError::MalformedResponse(e.to_string()))?;
        Ok(tags.models)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, OllamaError> {
        let url = self.endpoint("chat");
        debug!("POST {} (model {})", url, request.model);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let body = self.read_ok_body(response).await?;

        let reply: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| OllamaError::MalformedResponse(e.to_string()))?;
        Ok(reply.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_timeout_default() {
        temp_env::with_var_unset(TIMEOUT_ENV_VAR, || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    fn test_get_timeout_from_env() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("15"), || {
            assert_eq!(get_timeout(), Duration::from_secs(15));
        });
    }

    #[test]
    fn test_get_timeout_invalid_env_uses_default() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("soon"), || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    fn test_get_timeout_empty_env_uses_default() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some(""), || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    fn test_resolve_base_url() {
        assert_eq!(resolve_base_url(None), DEFAULT_BASE_URL);
        assert_eq!(resolve_base_url(Some("   ")), DEFAULT_BASE_URL);
        assert_eq!(
            resolve_base_url(Some("http://gpu-box:11434/api/")),
            "http://gpu-box:11434/api"
        );
    }

    #[test]
    fn test_endpoint_joins_path() {
        let client = OllamaClient::with_timeout("http://localhost:1/api/", Duration::from_secs(1))
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:1/api");
        assert_eq!(client.endpoint("chat"), "http://localhost:1/api/chat");
    }
}
