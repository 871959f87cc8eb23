//! Server configuration loaded from environment variables.
//!
//! Address and upstream base URLs have sensible defaults so the server can
//! start with zero configuration for local development; the API keys have
//! no defaults and the endpoints that need them fail cleanly when a key is
//! missing.

use std::net::SocketAddr;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8787`
    pub http_addr: SocketAddr,

    /// OpenAI-compatible API base URL.
    /// Env: `OPENAI_BASE_URL`
    /// Default: `https://api.openai.com/v1`
    pub openai_base_url: String,

    /// OpenAI API key.
    /// Env: `OPENAI_API_KEY`
    pub openai_api_key: Option<String>,

    /// Base URL of the vector index holding character knowledge.
    /// Env: `VECTOR_INDEX_URL`
    pub vector_index_url: Option<String>,

    /// API key for the vector index.
    /// Env: `VECTOR_API_KEY`
    pub vector_api_key: Option<String>,

    /// Text-to-speech API base URL.
    /// Env: `SPEECH_BASE_URL`
    /// Default: `https://api.fish.audio`
    pub speech_base_url: String,

    /// Text-to-speech API key.
    /// Env: `SPEECH_API_KEY`
    pub speech_api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8787).into(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: None,
            vector_index_url: None,
            vector_api_key: None,
            speech_base_url: "https://api.fish.audio".to_string(),
            speech_api_key: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            config.openai_base_url = normalize_base_url(url);
        }
        config.openai_api_key = non_empty_var("OPENAI_API_KEY");

        config.vector_index_url =
            non_empty_var("VECTOR_INDEX_URL").map(normalize_base_url);
        config.vector_api_key = non_empty_var("VECTOR_API_KEY");

        if let Ok(url) = std::env::var("SPEECH_BASE_URL") {
            config.speech_base_url = normalize_base_url(url);
        }
        config.speech_api_key = non_empty_var("SPEECH_API_KEY");

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8787).into());
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url(" https://example.com/v1/ ".to_string()),
            "https://example.com/v1"
        );
    }
}
