//! Text-to-speech synthesis.
//!
//! Each character maps to a fixed hosted reference voice; the upstream
//! returns raw MP3 bytes which are handed back to clients as a
//! `data:audio/mp3;base64,...` URL so no audio file storage is needed.

use base64::Engine;
use serde_json::json;
use tribe_shared::characters;

use crate::config::ServerConfig;
use crate::error::ServerError;

/// Synthesise `text` in a character's voice.  Returns a data URL.
pub async fn synthesize(
    http: &reqwest::Client,
    config: &ServerConfig,
    character_id: &str,
    text: &str,
) -> Result<String, ServerError> {
    // The voice mapping doubles as the character existence check; an
    // unmapped id never reaches the upstream.
    let voice_id = characters::voice_for(character_id)
        .ok_or_else(|| ServerError::UnknownCharacter(character_id.to_string()))?;

    let api_key = config
        .speech_api_key
        .as_deref()
        .ok_or(ServerError::NotConfigured("SPEECH_API_KEY"))?;

    let body = json!({
        "text": text,
        "reference_id": voice_id,
        "format": "mp3",
        "speed": 1.0,
        "pitch": 1.0,
    });

    let response = http
        .post(format!("{}/v1/tts", config.speech_base_url))
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?
        .error_for_status()
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    let audio = response
        .bytes()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?;
    if audio.is_empty() {
        return Err(ServerError::Upstream("speech response was empty".into()));
    }

    tracing::debug!(character = character_id, bytes = audio.len(), "speech synthesized");
    Ok(to_data_url(&audio))
}

fn to_data_url(audio: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(audio);
    format!("data:audio/mp3;base64,{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_character_short_circuits() {
        let http = reqwest::Client::new();
        let config = ServerConfig {
            // Unroutable: reaching the network would yield Upstream.
            speech_base_url: "http://127.0.0.1:1".to_string(),
            speech_api_key: Some("key".to_string()),
            ..ServerConfig::default()
        };

        let result = synthesize(&http, &config, "nobody", "hello").await;
        assert!(matches!(result, Err(ServerError::UnknownCharacter(_))));
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let http = reqwest::Client::new();
        let config = ServerConfig::default();

        let result = synthesize(&http, &config, "joker", "hello").await;
        assert!(matches!(result, Err(ServerError::NotConfigured(_))));
    }

    #[test]
    fn data_url_shape() {
        let url = to_data_url(&[0xffu8, 0xf3, 0x40]);
        assert!(url.starts_with("data:audio/mp3;base64,"));
    }
}
