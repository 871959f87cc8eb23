use std::sync::Arc;

use axum::{
    extract::State,
    http::Method,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use tribe_shared::characters;

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/characters", get(list_characters))
        .route("/functions/generateChatResponse", post(generate_chat_response))
        .route("/functions/generateSpeech", post(generate_speech))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    message: String,
    character_id: String,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeechRequest {
    text: String,
    character_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechResponse {
    audio_url: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_characters() -> Json<&'static [characters::Character]> {
    Json(characters::CHARACTERS)
}

async fn generate_chat_response(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ServerError::BadRequest("message is empty".into()));
    }
    let character = characters::find(&req.character_id)
        .ok_or_else(|| ServerError::UnknownCharacter(req.character_id.clone()))?;

    let response =
        crate::generate::chat_response(&state.http, &state.config, character, message).await?;

    info!(character = character.id, "chat response generated");
    Ok(Json(ChatResponse { response }))
}

async fn generate_speech(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> Result<Json<SpeechResponse>, ServerError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ServerError::BadRequest("text is empty".into()));
    }

    let audio_url =
        crate::speech::synthesize(&state.http, &state.config, &req.character_id, text).await?;

    info!(character = %req.character_id, "speech generated");
    Ok(Json(SpeechResponse { audio_url }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
