//! The message stream.
//!
//! A state machine over four mutually exclusive subscription states: a
//! channel scope, a direct-message scope, a character-chat scope, or no
//! scope at all.  Every transition tears down the previous subscription
//! and clears the in-memory list before establishing the next one, so a
//! stream never shows another scope's messages.

use std::sync::Arc;

use tribe_shared::{
    characters, character_chat_id, is_synthetic_user, synthetic_user_id, ActiveScope, Attachment,
};
use tribe_store::{Message, MessageScope, UserProfile};
use uuid::Uuid;

use crate::directory;
use crate::error::{ChatError, Result};
use crate::events::{self, ClientEvent, NotificationLevel};
use crate::state::ChatClient;
use crate::subscription::{self, StoreChange};

impl ChatClient {
    /// Switch the active conversation target.
    ///
    /// Teardown happens before resubscription: the old task is aborted
    /// and the list cleared, then the new subscription (if any) is
    /// created and primed with an initial snapshot.
    pub(crate) fn apply_scope(&self, scope: ActiveScope) -> Result<()> {
        let stream_scope = match &scope {
            ActiveScope::Channel(id) => Some(MessageScope::Channel(*id)),
            ActiveScope::DirectMessage(id) => Some(MessageScope::Conversation(*id)),
            ActiveScope::Character(character_id) => {
                let user = self.current_user().ok_or(ChatError::Authentication)?;
                Some(MessageScope::Chat(character_chat_id(
                    &user.uid,
                    character_id,
                )))
            }
            ActiveScope::None => None,
        };

        let mut state = self.inner.lock_state();
        state.subscription = None;
        state.messages.clear();
        state.scope = scope.clone();
        state.stream_scope = stream_scope.clone();
        if let Some(ref message_scope) = stream_scope {
            state.subscription = Some(subscription::subscribe(&self.inner, message_scope.clone()));
        }
        drop(state);

        tracing::debug!(?scope, "scope changed");
        events::emit(&self.inner.events, ClientEvent::ScopeChanged(scope));

        if let Some(message_scope) = stream_scope {
            subscription::refresh_snapshot(&self.inner, &message_scope);
        }
        Ok(())
    }

    /// Current in-memory snapshot, sorted ascending by creation time.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock_state().messages.clone()
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Send a message into the active scope.
    ///
    /// `override_sender` lets a synthetic persona profile appear as the
    /// author without a real session.  In a character scope, sending a
    /// human message also kicks off a detached task that generates the
    /// persona's reply; its failure is reported as a notification, never
    /// an error on this call.
    pub async fn send_message(
        &self,
        content: &str,
        attachments: Vec<Attachment>,
        parent_message_id: Option<Uuid>,
        override_sender: Option<UserProfile>,
    ) -> Result<Message> {
        let (scope, stream_scope, current_user) = {
            let state = self.inner.lock_state();
            (
                state.scope.clone(),
                state.stream_scope.clone(),
                state.current_user.clone(),
            )
        };

        let message_scope = stream_scope.ok_or(ChatError::NoActiveConversation)?;

        let author = match &override_sender {
            Some(profile) => profile.clone(),
            None => current_user.clone().ok_or(ChatError::Authentication)?,
        };
        if let Some(profile) = override_sender {
            self.inner.lock_state().directory.insert(profile);
        }

        let message =
            self.write_message(content, attachments, parent_message_id, &author.uid, &message_scope)?;

        // Character scope: a human message triggers the persona reply.
        if let ActiveScope::Character(character_id) = &scope {
            if !is_synthetic_user(&author.uid) {
                self.spawn_character_reply(character_id, content, message_scope);
            }
        }

        Ok(message)
    }

    /// Write one message row and publish the change.
    pub(crate) fn write_message(
        &self,
        content: &str,
        attachments: Vec<Attachment>,
        parent_message_id: Option<Uuid>,
        author_uid: &str,
        message_scope: &MessageScope,
    ) -> Result<Message> {
        let mut message = Message::new(
            content.to_string(),
            author_uid.to_string(),
            message_scope.clone(),
        );
        message.attachments = attachments;

        let db = self.inner.lock_db();
        if let Some(parent_id) = parent_message_id {
            // The thread key is the top-level ancestor's id: copy the
            // parent's key, or start a thread at the parent itself.
            let parent = db.get_message(parent_id)?;
            message.parent_message_id = Some(parent_id);
            message.thread_id = Some(parent.thread_id.unwrap_or(parent.id));
        }
        db.insert_message(&message)?;
        drop(db);

        tracing::debug!(id = %message.id, scope = ?message_scope, "message sent");
        self.inner
            .notify(StoreChange::Messages(message_scope.clone()));
        Ok(message)
    }

    /// Fire-and-forget persona reply.  The write is scoped by the ids
    /// captured here, so a slow reply landing after the user navigated
    /// away is written to the original chat harmlessly.
    fn spawn_character_reply(
        &self,
        character_id: &str,
        user_text: &str,
        message_scope: MessageScope,
    ) {
        let character = match characters::find(character_id) {
            Some(c) => c,
            None => {
                tracing::warn!(character_id, "no configuration for active character");
                return;
            }
        };

        let client = self.clone();
        let pipeline = Arc::clone(&self.inner.pipeline);
        let user_text = user_text.to_string();

        tokio::spawn(async move {
            match pipeline.generate_response(character, &user_text).await {
                Ok(reply) => {
                    let persona_uid = synthetic_user_id(character.id);
                    {
                        let mut state = client.inner.lock_state();
                        if !state.directory.contains(&persona_uid) {
                            state.directory.insert(directory::synthetic_profile(character));
                        }
                    }
                    if let Err(e) =
                        client.write_message(&reply, Vec::new(), None, &persona_uid, &message_scope)
                    {
                        tracing::error!(error = %e, "failed to store character reply");
                    }
                }
                Err(e) => {
                    tracing::warn!(character = character.id, error = %e, "reply generation failed");
                    events::emit(
                        &client.inner.events,
                        ClientEvent::Notification {
                            level: NotificationLevel::Error,
                            message: format!("{} could not reply right now", character.name),
                        },
                    );
                }
            }
        });
    }

    // ------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------

    /// All replies in a thread, in stream order.  A pure filter over the
    /// in-memory snapshot, not a separate subscription.
    pub fn thread_messages(&self, thread_id: Uuid) -> Vec<Message> {
        self.inner
            .lock_state()
            .messages
            .iter()
            .filter(|m| m.thread_id == Some(thread_id))
            .cloned()
            .collect()
    }

    /// Number of replies sharing a thread key.
    pub fn thread_replies_count(&self, thread_id: Uuid) -> usize {
        self.inner
            .lock_state()
            .messages
            .iter()
            .filter(|m| m.thread_id == Some(thread_id))
            .count()
    }

    // ------------------------------------------------------------------
    // Reactions
    // ------------------------------------------------------------------

    /// Add the signed-in user to the reacting set under `emoji`.
    /// Idempotent.
    pub fn add_reaction(&self, message_id: Uuid, emoji: &str) -> Result<()> {
        let user = self.current_user().ok_or(ChatError::Authentication)?;

        let scope = {
            let db = self.inner.lock_db();
            let message = db.get_message(message_id)?;
            db.add_reaction(message_id, &user.uid, emoji)?;
            message.scope
        };

        self.inner.notify(StoreChange::Messages(scope));
        Ok(())
    }

    /// Remove the signed-in user from the reacting set under `emoji`.
    /// Idempotent.
    pub fn remove_reaction(&self, message_id: Uuid, emoji: &str) -> Result<()> {
        let user = self.current_user().ok_or(ChatError::Authentication)?;

        let scope = {
            let db = self.inner.lock_db();
            let message = db.get_message(message_id)?;
            db.remove_reaction(message_id, &user.uid, emoji)?;
            message.scope
        };

        self.inner.notify(StoreChange::Messages(scope));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Editing and search
    // ------------------------------------------------------------------

    /// Replace a message's content.  Only the author may edit.
    pub fn edit_message(&self, message_id: Uuid, content: &str) -> Result<Message> {
        let user = self.current_user().ok_or(ChatError::Authentication)?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ChatError::Validation("message content is empty".into()));
        }

        let (updated, scope) = {
            let db = self.inner.lock_db();
            let existing = db.get_message(message_id)?;
            if existing.user_id != user.uid {
                return Err(ChatError::Authorization(
                    "only the author can edit a message".into(),
                ));
            }
            let updated = db.update_message_content(message_id, trimmed)?;
            let scope = updated.scope.clone();
            (updated, scope)
        };

        self.inner.notify(StoreChange::Messages(scope));
        Ok(updated)
    }

    /// Case-insensitive content search over the current snapshot, newest
    /// first, capped at 100 results.
    pub fn search_messages(&self, query: &str) -> Vec<Message> {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<Message> = self
            .inner
            .lock_state()
            .messages
            .iter()
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .cloned()
            .collect();

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        results.truncate(100);
        results
    }
}
