//! AI character selection and speech.
//!
//! Each user gets a private chat stream per character, keyed by a
//! deterministic chat id derived from the user and character ids.  The
//! character itself appears as a synthetic user that is never persisted.

use tribe_shared::{characters, ActiveScope};

use crate::directory;
use crate::error::{ChatError, Result};
use crate::state::ChatClient;

impl ChatClient {
    /// The static character roster.
    pub fn characters(&self) -> &'static [characters::Character] {
        characters::CHARACTERS
    }

    /// Select a character chat as the active scope, or clear the
    /// selection with `None`.
    pub fn set_current_character(&self, character_id: Option<&str>) -> Result<()> {
        let character_id = match character_id {
            Some(id) => id,
            None => return self.apply_scope(ActiveScope::None),
        };

        let character = characters::find(character_id)
            .ok_or_else(|| ChatError::UnknownCharacter(character_id.to_string()))?;
        if self.current_user().is_none() {
            return Err(ChatError::Authentication);
        }

        // The persona renders like any other author.
        self.inner
            .lock_state()
            .directory
            .insert(directory::synthetic_profile(character));

        tracing::debug!(character = character.id, "character selected");
        self.apply_scope(ActiveScope::Character(character.id.to_string()))
    }

    /// The configuration of the currently selected character, if any.
    pub fn current_character(&self) -> Option<&'static characters::Character> {
        match self.current_scope() {
            ActiveScope::Character(id) => characters::find(&id),
            _ => None,
        }
    }

    /// Synthesise speech for a piece of text in the active character's
    /// voice.  Returns a `data:audio/mp3;base64,...` URL.
    pub async fn speak(&self, text: &str) -> Result<String> {
        let character = self
            .current_character()
            .ok_or(ChatError::NoActiveConversation)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Validation("nothing to speak".into()));
        }
        self.inner.pipeline.generate_speech(text, character.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{sign_in, test_client};

    #[tokio::test]
    async fn selection_requires_session_and_known_id() {
        let (_dir, client) = test_client();

        assert!(matches!(
            client.set_current_character(Some("nobody")),
            Err(ChatError::UnknownCharacter(_))
        ));
        assert!(matches!(
            client.set_current_character(Some("joker")),
            Err(ChatError::Authentication)
        ));

        sign_in(&client, "u-1");
        client.set_current_character(Some("joker")).unwrap();
        assert_eq!(client.current_character().unwrap().id, "joker");
    }

    #[tokio::test]
    async fn clearing_resets_scope() {
        let (_dir, client) = test_client();
        sign_in(&client, "u-1");
        client.set_current_character(Some("spongebob")).unwrap();

        client.set_current_character(None).unwrap();
        assert!(client.current_scope().is_none());
        assert!(client.current_character().is_none());
    }

    #[tokio::test]
    async fn character_chats_are_per_user() {
        let (_dir, client) = test_client();
        sign_in(&client, "u-1");
        client.set_current_character(Some("elon_musk")).unwrap();
        client
            .send_message("hello from u-1", Vec::new(), None, None)
            .await
            .unwrap();

        // Wait for both the user message and the generated reply.
        for _ in 0..100 {
            if client.messages().len() >= 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        sign_in(&client, "u-2");
        client.set_current_character(Some("elon_musk")).unwrap();
        assert!(client.messages().is_empty());
    }

    #[tokio::test]
    async fn speak_goes_through_the_pipeline() {
        let (_dir, client) = test_client();
        sign_in(&client, "u-1");

        assert!(matches!(
            client.speak("hi").await,
            Err(ChatError::NoActiveConversation)
        ));

        client.set_current_character(Some("donald_trump")).unwrap();
        let url = client.speak("tremendous").await.unwrap();
        assert!(url.starts_with("data:audio/mp3;base64,"));

        assert!(matches!(
            client.speak("   ").await,
            Err(ChatError::Validation(_))
        ));
    }
}
