//! Direct-message registry operations.
//!
//! Conversation identity is the unordered participant pair; selecting a
//! partner finds or creates the single conversation for that pair.  Rapid
//! repeat selections of the same partner are debounced so a double-click
//! does not spawn duplicate lookups.

use std::time::{Duration, Instant};

use chrono::Utc;
use tribe_shared::ActiveScope;
use tribe_store::{Conversation, LastMessage, Message};
use uuid::Uuid;

use crate::error::{ChatError, Result};
use crate::events::{self, ClientEvent};
use crate::state::ChatClient;
use crate::subscription::StoreChange;

/// Repeat selections of the same partner inside this window coalesce into
/// the first one.
const DM_SELECT_DEBOUNCE: Duration = Duration::from_millis(300);

impl ChatClient {
    /// The signed-in user's conversations, most recently active first.
    pub fn list_direct_messages(&self) -> Result<Vec<Conversation>> {
        let user = self.current_user().ok_or(ChatError::Authentication)?;
        let db = self.inner.lock_db();
        Ok(db.list_conversations_for_user(&user.uid)?)
    }

    /// Open (or start) the conversation with `other_uid` and make it the
    /// active scope.  An empty partner id clears the selection.
    pub fn select_direct_message(&self, other_uid: &str) -> Result<Option<Conversation>> {
        let user = self.current_user().ok_or(ChatError::Authentication)?;
        let other_uid = other_uid.trim();
        if other_uid.is_empty() {
            self.apply_scope(ActiveScope::None)?;
            return Ok(None);
        }
        if other_uid == user.uid {
            return Err(ChatError::Validation(
                "cannot open a conversation with yourself".into(),
            ));
        }

        // Same-target debounce: a second click inside the window returns
        // the already-active conversation without re-querying.
        let now = Instant::now();
        {
            let mut state = self.inner.lock_state();
            let coalesce = matches!(
                &state.last_dm_select,
                Some((target, at)) if target == other_uid && now.duration_since(*at) < DM_SELECT_DEBOUNCE
            );
            state.last_dm_select = Some((other_uid.to_string(), now));
            if coalesce {
                if let ActiveScope::DirectMessage(id) = &state.scope {
                    let id = *id;
                    drop(state);
                    let db = self.inner.lock_db();
                    return Ok(Some(db.get_conversation(id)?));
                }
            }
        }

        let (conversation, created) = {
            let db = self.inner.lock_db();
            match db.find_conversation_by_participants(&user.uid, other_uid)? {
                Some(existing) => (existing, false),
                None => {
                    let now_ts = Utc::now();
                    let (first, second) = Conversation::sorted_pair(&user.uid, other_uid);
                    let fresh = Conversation {
                        id: Conversation::deterministic_id(&user.uid, other_uid),
                        participants: [first, second],
                        created_at: now_ts,
                        updated_at: now_ts,
                        last_message: None,
                    };
                    db.create_conversation(&fresh)?;
                    // A racing creator may have won the insert; the row
                    // under the deterministic id is authoritative.
                    (db.get_conversation(fresh.id)?, true)
                }
            }
        };

        // Make the partner's profile available for rendering.
        self.user_profile(other_uid)?;

        if created {
            tracing::info!(id = %conversation.id, "conversation started");
            self.inner.notify(StoreChange::Conversations);
            events::emit(&self.inner.events, ClientEvent::ConversationsUpdated);
        }

        self.apply_scope(ActiveScope::DirectMessage(conversation.id))?;
        Ok(Some(conversation))
    }

    /// Send a message into the active direct-message conversation and
    /// refresh its last-message preview.
    pub async fn send_direct_message(
        &self,
        content: &str,
        attachments: Vec<tribe_shared::Attachment>,
        parent_message_id: Option<Uuid>,
    ) -> Result<Message> {
        let conversation_id = match self.current_scope() {
            ActiveScope::DirectMessage(id) => id,
            _ => return Err(ChatError::NoActiveConversation),
        };

        let message = self
            .send_message(content, attachments, parent_message_id, None)
            .await?;

        {
            let db = self.inner.lock_db();
            db.set_conversation_last_message(
                conversation_id,
                &LastMessage {
                    content: message.content.clone(),
                    sender_id: message.user_id.clone(),
                    sent_at: message.created_at,
                },
            )?;
        }

        self.inner.notify(StoreChange::Conversations);
        events::emit(&self.inner.events, ClientEvent::ConversationsUpdated);
        Ok(message)
    }

    /// Delete a conversation along with its messages and reactions.  Only
    /// a participant may delete.
    pub fn delete_direct_message(&self, id: Uuid) -> Result<()> {
        let user = self.current_user().ok_or(ChatError::Authentication)?;

        {
            let mut db = self.inner.lock_db();
            let conversation = db.get_conversation(id)?;
            if !conversation.involves(&user.uid) {
                return Err(ChatError::Authorization(
                    "only a participant can delete a conversation".into(),
                ));
            }
            db.delete_conversation_cascade(id)?;
        }

        tracing::info!(id = %id, "conversation deleted");
        self.inner.notify(StoreChange::Conversations);
        events::emit(&self.inner.events, ClientEvent::ConversationsUpdated);

        if self.current_scope() == ActiveScope::DirectMessage(id) {
            self.apply_scope(ActiveScope::None)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{sign_in, test_client};

    #[tokio::test]
    async fn select_finds_or_creates_one_conversation() {
        let (_dir, client) = test_client();
        sign_in(&client, "bob");
        sign_in(&client, "alice");

        let opened = client.select_direct_message("bob").unwrap().expect("open");
        assert!(opened.involves("alice") && opened.involves("bob"));
        assert_eq!(
            client.current_scope(),
            ActiveScope::DirectMessage(opened.id)
        );

        // The other side derives the same conversation.
        sign_in(&client, "bob");
        let mirrored = client.select_direct_message("alice").unwrap().expect("open");
        assert_eq!(opened.id, mirrored.id);
        assert_eq!(client.list_direct_messages().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn self_conversation_is_rejected() {
        let (_dir, client) = test_client();
        sign_in(&client, "alice");
        assert!(matches!(
            client.select_direct_message("alice"),
            Err(ChatError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn empty_partner_clears_selection() {
        let (_dir, client) = test_client();
        sign_in(&client, "alice");
        client.select_direct_message("bob").unwrap();
        assert!(!client.current_scope().is_none());

        assert!(client.select_direct_message("  ").unwrap().is_none());
        assert!(client.current_scope().is_none());
    }

    #[tokio::test]
    async fn repeat_select_coalesces() {
        let (_dir, client) = test_client();
        sign_in(&client, "alice");

        let first = client.select_direct_message("bob").unwrap().expect("open");
        let second = client.select_direct_message("bob").unwrap().expect("open");
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn send_updates_last_message_preview() {
        let (_dir, client) = test_client();
        sign_in(&client, "alice");
        client.select_direct_message("bob").unwrap();

        client
            .send_direct_message("hey bob", Vec::new(), None)
            .await
            .unwrap();

        let conversations = client.list_direct_messages().unwrap();
        let preview = conversations[0].last_message.as_ref().expect("preview");
        assert_eq!(preview.content, "hey bob");
        assert_eq!(preview.sender_id, "alice");
    }

    #[tokio::test]
    async fn send_outside_dm_scope_is_rejected() {
        let (_dir, client) = test_client();
        sign_in(&client, "alice");
        client.create_channel("general", None).await.unwrap();

        assert!(matches!(
            client.send_direct_message("hi", Vec::new(), None).await,
            Err(ChatError::NoActiveConversation)
        ));
    }

    #[tokio::test]
    async fn delete_removes_history_and_reselect_starts_fresh() {
        let (_dir, client) = test_client();
        sign_in(&client, "alice");
        let convo = client.select_direct_message("bob").unwrap().expect("open");

        for i in 0..5 {
            client
                .send_direct_message(&format!("dm {i}"), Vec::new(), None)
                .await
                .unwrap();
        }

        client.delete_direct_message(convo.id).unwrap();
        assert!(client.current_scope().is_none());
        {
            let db = client.inner.lock_db();
            assert!(db
                .messages_for_scope(&tribe_store::MessageScope::Conversation(convo.id))
                .unwrap()
                .is_empty());
        }

        // The pair id is deterministic, so re-selecting derives the same
        // conversation id over a fresh, empty row.
        let fresh = client.select_direct_message("bob").unwrap().expect("reopen");
        assert_eq!(fresh.id, convo.id);
        assert!(fresh.last_message.is_none());
        assert!(client.messages().is_empty());
    }

    #[tokio::test]
    async fn only_participants_delete() {
        let (_dir, client) = test_client();
        sign_in(&client, "alice");
        let convo = client.select_direct_message("bob").unwrap().expect("open");

        sign_in(&client, "mallory");
        assert!(matches!(
            client.delete_direct_message(convo.id),
            Err(ChatError::Authorization(_))
        ));

        sign_in(&client, "alice");
        client.delete_direct_message(convo.id).unwrap();
        assert!(client.list_direct_messages().unwrap().is_empty());
    }
}
