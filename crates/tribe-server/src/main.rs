//! # tribe-server
//!
//! Function backend for the Tribe chat application.
//!
//! This binary provides:
//! - **Retrieval-augmented reply generation**: embeds the user's message,
//!   queries the character knowledge index, and asks the chat model to
//!   answer in persona with the retrieved passages inlined
//! - **Text-to-speech synthesis** in each character's reference voice,
//!   returned as a base64 data URL
//! - **REST API** (axum) for health checks, the character roster, and the
//!   two function endpoints

mod api;
mod config;
mod error;
mod generate;
mod speech;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tribe_server=debug")),
        )
        .init();

    info!("Starting Tribe function server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        addr = %config.http_addr,
        generation_enabled = config.openai_api_key.is_some(),
        retrieval_enabled = config.vector_index_url.is_some(),
        speech_enabled = config.speech_api_key.is_some(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Build application state
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;
    let app_state = AppState {
        http: reqwest::Client::new(),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
