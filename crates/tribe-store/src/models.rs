//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a presentation layer.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tribe_shared::{Attachment, PresenceState};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

/// A user profile document, created lazily on first sign-in.
///
/// Synthetic AI-persona "users" (ids prefixed `ai-`) are never persisted as
/// rows; they only exist in the client's in-memory directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Stable user id from the authentication provider.
    pub uid: String,
    pub display_name: String,
    pub email: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Coarse role, defaulting to `member`.
    pub role: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A public conversation channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Uid of the creating user; only the creator may delete the channel.
    pub created_by: String,
}

// ---------------------------------------------------------------------------
// Direct-message conversation
// ---------------------------------------------------------------------------

/// Preview of the most recent message in a conversation, denormalised onto
/// the conversation row for sidebar rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub content: String,
    pub sender_id: String,
    pub sent_at: DateTime<Utc>,
}

/// A one-to-one conversation.  Identity is the unordered participant pair;
/// `participants` is always stored sorted so the pair has one canonical
/// representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub participants: [String; 2],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message: Option<LastMessage>,
}

impl Conversation {
    /// Canonical (sorted) participant pair.
    pub fn sorted_pair(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    /// Deterministic conversation id for a participant pair.
    ///
    /// UUIDv5 over the sorted pair: both sides of a DM (and both tabs of a
    /// racing user) derive the same id, which closes the find-or-create
    /// race at the schema level together with the unique pair index.
    pub fn deterministic_id(a: &str, b: &str) -> Uuid {
        let (first, second) = Self::sorted_pair(a, b);
        Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!("tribe-dm:{first}:{second}").as_bytes(),
        )
    }

    pub fn involves(&self, uid: &str) -> bool {
        self.participants.iter().any(|p| p == uid)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// The stream a message belongs to.  Exactly one scoping field is set per
/// message row; the enum makes that invariant explicit in memory while a
/// CHECK constraint enforces it at rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum MessageScope {
    /// Belongs to a channel.
    Channel(Uuid),
    /// Belongs to a direct-message conversation.
    Conversation(Uuid),
    /// Belongs to an AI character chat (`ai-chat-<uid>-<character>`).
    Chat(String),
}

/// A single chat message.
///
/// Immutable once created except for `reactions`, `updated_at`, and
/// `is_edited`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    /// Author uid; may be a synthetic `ai-` id for generated replies.
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Emoji -> set of reacting user ids.
    pub reactions: BTreeMap<String, BTreeSet<String>>,
    pub is_edited: bool,
    pub attachments: Vec<Attachment>,
    /// Thread grouping key: the top-level parent's id, shared by every
    /// reply in the thread so lookup is a single equality filter.
    pub thread_id: Option<Uuid>,
    pub parent_message_id: Option<Uuid>,
    pub scope: MessageScope,
}

impl Message {
    /// Construct a fresh top-level message with empty reactions.
    pub fn new(content: String, user_id: String, scope: MessageScope) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content,
            user_id,
            created_at: now,
            updated_at: now,
            reactions: BTreeMap::new(),
            is_edited: false,
            attachments: Vec::new(),
            thread_id: None,
            parent_message_id: None,
            scope,
        }
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Ephemeral presence record for a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub uid: String,
    pub state: PresenceState,
    pub last_seen: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_id_is_symmetric() {
        let ab = Conversation::deterministic_id("alice", "bob");
        let ba = Conversation::deterministic_id("bob", "alice");
        assert_eq!(ab, ba);
    }

    #[test]
    fn deterministic_id_distinguishes_pairs() {
        let ab = Conversation::deterministic_id("alice", "bob");
        let ac = Conversation::deterministic_id("alice", "carol");
        assert_ne!(ab, ac);
    }

    #[test]
    fn sorted_pair_orders_lexicographically() {
        assert_eq!(
            Conversation::sorted_pair("zoe", "amy"),
            ("amy".to_string(), "zoe".to_string())
        );
    }
}
