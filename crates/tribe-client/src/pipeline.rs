//! The AI response pipeline seam.
//!
//! [`ChatClient`] only ever talks to the trait; production wires in
//! [`HttpPipeline`], which calls the Tribe function endpoints, and tests
//! substitute an in-process stub.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tribe_shared::characters::{self, Character};

use crate::error::ChatError;

/// Produces character replies and speech audio.
#[async_trait]
pub trait ResponsePipeline: Send + Sync {
    /// Generate the character's reply to one user message.
    async fn generate_response(
        &self,
        character: &Character,
        message: &str,
    ) -> Result<String, ChatError>;

    /// Synthesise `text` in the character's voice; returns a
    /// `data:audio/mp3;base64,...` URL.
    async fn generate_speech(&self, text: &str, character_id: &str)
        -> Result<String, ChatError>;
}

/// Pipeline backed by the Tribe server's function endpoints.
pub struct HttpPipeline {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    message: &'a str,
    character_id: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechRequest<'a> {
    text: &'a str,
    character_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeechResponse {
    audio_url: String,
}

impl HttpPipeline {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8787`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ResponsePipeline for HttpPipeline {
    async fn generate_response(
        &self,
        character: &Character,
        message: &str,
    ) -> Result<String, ChatError> {
        let url = format!("{}/functions/generateChatResponse", self.base_url);
        let body = ChatRequest {
            message,
            character_id: character.id,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?
            .error_for_status()
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;
        Ok(payload.response)
    }

    async fn generate_speech(
        &self,
        text: &str,
        character_id: &str,
    ) -> Result<String, ChatError> {
        // No voice mapping means no request worth making.
        if characters::voice_for(character_id).is_none() {
            return Err(ChatError::UnknownCharacter(character_id.to_string()));
        }

        let url = format!("{}/functions/generateSpeech", self.base_url);
        let body = SpeechRequest { text, character_id };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?
            .error_for_status()
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        let payload: SpeechResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;
        Ok(payload.audio_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_voice_fails_before_any_request() {
        // Unroutable base URL: reaching the network would error with
        // Generation, not UnknownCharacter.
        let pipeline = HttpPipeline::new("http://127.0.0.1:1");
        let result = pipeline.generate_speech("hello", "nobody").await;
        assert!(matches!(result, Err(ChatError::UnknownCharacter(_))));
    }

    #[test]
    fn base_url_is_normalised() {
        let pipeline = HttpPipeline::new("http://localhost:8787/");
        assert_eq!(pipeline.base_url, "http://localhost:8787");
    }
}
