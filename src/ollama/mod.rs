//! Ollama model-server access.

pub mod client;
pub mod types;

pub use client::{BASE_URL_ENV_VAR, DEFAULT_BASE_URL, ModelServer, OllamaClient, resolve_base_url};
pub use types::{ChatMessage, ChatRequest, ModelInfo, Role};
