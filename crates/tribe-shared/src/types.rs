use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix that marks a user id as a synthetic (non-authenticated) persona
/// author.  Synthetic profiles only ever live in the in-memory directory.
pub const SYNTHETIC_USER_PREFIX: &str = "ai-";

/// Prefix of the per-user, per-persona chat id that scopes character
/// conversations.  Also the id prefix of legacy channel rows that the
/// one-off cleanup repair removes.
pub const AI_CHAT_PREFIX: &str = "ai-chat-";

/// Build the synthetic author id for a persona, e.g. `ai-donald_trump`.
pub fn synthetic_user_id(character_id: &str) -> String {
    format!("{SYNTHETIC_USER_PREFIX}{character_id}")
}

/// True if the id denotes a synthetic persona user rather than a real
/// authenticated profile.
pub fn is_synthetic_user(user_id: &str) -> bool {
    user_id.starts_with(SYNTHETIC_USER_PREFIX)
}

/// Build the chat id that scopes a character conversation to one human
/// user and one persona, e.g. `ai-chat-u1-joker`.
pub fn character_chat_id(user_id: &str, character_id: &str) -> String {
    format!("{AI_CHAT_PREFIX}{user_id}-{character_id}")
}

// ---------------------------------------------------------------------------
// Active scope
// ---------------------------------------------------------------------------

/// The single active conversation target.
///
/// Exactly one of channel, direct-message, or character chat can be active
/// at any instant; every selection operation replaces the whole value, so
/// illegal simultaneous selections are unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum ActiveScope {
    /// A channel, by channel UUID.
    Channel(Uuid),
    /// A direct-message conversation, by conversation UUID.
    DirectMessage(Uuid),
    /// An AI persona chat, by character id (e.g. `donald_trump`).
    Character(String),
    /// Nothing selected.
    #[default]
    None,
}

impl ActiveScope {
    pub fn is_none(&self) -> bool {
        matches!(self, ActiveScope::None)
    }
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// File attachment metadata carried on a message.  The file itself lives in
/// external object storage; only the reference is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Download URL of the stored file.
    pub url: String,
    /// MIME type (e.g. `image/png`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Original file name.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Ephemeral presence state for a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PresenceState {
    Online,
    Idle,
    Offline,
}

impl PresenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceState::Online => "online",
            PresenceState::Idle => "idle",
            PresenceState::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(PresenceState::Online),
            "idle" => Some(PresenceState::Idle),
            "offline" => Some(PresenceState::Offline),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_ids() {
        assert_eq!(synthetic_user_id("joker"), "ai-joker");
        assert!(is_synthetic_user("ai-joker"));
        assert!(!is_synthetic_user("u-1234"));
    }

    #[test]
    fn chat_id_format() {
        assert_eq!(character_chat_id("u1", "spongebob"), "ai-chat-u1-spongebob");
        assert!(character_chat_id("u1", "spongebob").starts_with(AI_CHAT_PREFIX));
    }

    #[test]
    fn default_scope_is_none() {
        assert!(ActiveScope::default().is_none());
        assert!(!ActiveScope::Character("joker".into()).is_none());
    }

    #[test]
    fn presence_round_trip() {
        for state in [PresenceState::Online, PresenceState::Idle, PresenceState::Offline] {
            assert_eq!(PresenceState::parse(state.as_str()), Some(state));
        }
        assert_eq!(PresenceState::parse("dnd"), None);
    }
}
