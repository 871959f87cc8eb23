//! CRUD operations for [`Message`] records.
//!
//! Reactions live in their own table; readers assemble the per-message
//! emoji map after loading the rows.

use chrono::{DateTime, Utc};
use rusqlite::params;
use tribe_shared::Attachment;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Message, MessageScope};

impl Database {
    /// Insert a new message.  The scoping column is derived from the
    /// message's [`MessageScope`]; the schema CHECK rejects rows with more
    /// or fewer than one scope set.
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        let (channel_id, conversation_id, chat_id) = scope_columns(&message.scope);
        let attachments = serde_json::to_string(&message.attachments)?;

        self.conn().execute(
            "INSERT INTO messages
                 (id, content, user_id, created_at, updated_at, is_edited,
                  attachments, thread_id, parent_message_id,
                  channel_id, conversation_id, chat_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                message.id.to_string(),
                message.content,
                message.user_id,
                message.created_at.to_rfc3339(),
                message.updated_at.to_rfc3339(),
                message.is_edited as i64,
                attachments,
                message.thread_id.map(|t| t.to_string()),
                message.parent_message_id.map(|p| p.to_string()),
                channel_id,
                conversation_id,
                chat_id,
            ],
        )?;
        Ok(())
    }

    /// Fetch a single message by UUID, with its reaction map.
    pub fn get_message(&self, id: Uuid) -> Result<Message> {
        let mut message = self
            .conn()
            .query_row(
                &format!("{SELECT_MESSAGE} WHERE id = ?1"),
                params![id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;

        message.reactions = self.reactions_for_message(message.id)?;
        Ok(message)
    }

    /// Load the full snapshot of messages in one scope, ordered ascending
    /// by creation time, with reaction maps attached.
    ///
    /// Streams are delivered as whole-snapshot replacements; the ascending
    /// order here plus local re-sorting in the client keeps the visual
    /// order monotonic even when updates cross in flight.
    pub fn messages_for_scope(&self, scope: &MessageScope) -> Result<Vec<Message>> {
        let (column, key) = match scope {
            MessageScope::Channel(id) => ("channel_id", id.to_string()),
            MessageScope::Conversation(id) => ("conversation_id", id.to_string()),
            MessageScope::Chat(id) => ("chat_id", id.clone()),
        };

        let mut stmt = self.conn().prepare(&format!(
            "{SELECT_MESSAGE} WHERE {column} = ?1 ORDER BY created_at ASC"
        ))?;

        let rows = stmt.query_map(params![key], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }

        for message in &mut messages {
            message.reactions = self.reactions_for_message(message.id)?;
        }
        Ok(messages)
    }

    /// Replace a message's content, marking it edited.  Returns the
    /// updated row.
    pub fn update_message_content(&self, id: Uuid, content: &str) -> Result<Message> {
        let now = Utc::now();
        let affected = self.conn().execute(
            "UPDATE messages
             SET content = ?2, is_edited = 1, updated_at = ?3
             WHERE id = ?1",
            params![id.to_string(), content, now.to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_message(id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SELECT_MESSAGE: &str = "SELECT id, content, user_id, created_at, updated_at, is_edited,
            attachments, thread_id, parent_message_id,
            channel_id, conversation_id, chat_id
     FROM messages";

fn scope_columns(scope: &MessageScope) -> (Option<String>, Option<String>, Option<String>) {
    match scope {
        MessageScope::Channel(id) => (Some(id.to_string()), None, None),
        MessageScope::Conversation(id) => (None, Some(id.to_string()), None),
        MessageScope::Chat(id) => (None, None, Some(id.clone())),
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let content: String = row.get(1)?;
    let user_id: String = row.get(2)?;
    let created_str: String = row.get(3)?;
    let updated_str: String = row.get(4)?;
    let is_edited: bool = row.get(5)?;
    let attachments_json: String = row.get(6)?;
    let thread_str: Option<String> = row.get(7)?;
    let parent_str: Option<String> = row.get(8)?;
    let channel_str: Option<String> = row.get(9)?;
    let conversation_str: Option<String> = row.get(10)?;
    let chat_id: Option<String> = row.get(11)?;

    let id = parse_uuid(&id_str, 0)?;
    let created_at = parse_ts(&created_str, 3)?;
    let updated_at = parse_ts(&updated_str, 4)?;

    let attachments: Vec<Attachment> = serde_json::from_str(&attachments_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let thread_id = thread_str.as_deref().map(|s| parse_uuid(s, 7)).transpose()?;
    let parent_message_id = parent_str.as_deref().map(|s| parse_uuid(s, 8)).transpose()?;

    let scope = match (channel_str, conversation_str, chat_id) {
        (Some(c), None, None) => MessageScope::Channel(parse_uuid(&c, 9)?),
        (None, Some(c), None) => MessageScope::Conversation(parse_uuid(&c, 10)?),
        (None, None, Some(c)) => MessageScope::Chat(c),
        // Unreachable under the schema CHECK constraint.
        _ => {
            return Err(rusqlite::Error::IntegralValueOutOfRange(9, 0));
        }
    };

    Ok(Message {
        id,
        content,
        user_id,
        created_at,
        updated_at,
        reactions: Default::default(),
        is_edited,
        attachments,
        thread_id,
        parent_message_id,
        scope,
    })
}

fn parse_uuid(s: &str, col: usize) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_ts(s: &str, col: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn insert_and_get_round_trip() {
        let (_dir, db) = open_test_db();
        let channel_id = Uuid::new_v4();
        let mut msg = Message::new(
            "Hello".to_string(),
            "u-1".to_string(),
            MessageScope::Channel(channel_id),
        );
        msg.attachments.push(Attachment {
            url: "https://files.example/cat.png".to_string(),
            kind: "image/png".to_string(),
            name: "cat.png".to_string(),
        });

        db.insert_message(&msg).unwrap();
        let loaded = db.get_message(msg.id).unwrap();

        assert_eq!(loaded.content, "Hello");
        assert_eq!(loaded.scope, MessageScope::Channel(channel_id));
        assert_eq!(loaded.attachments.len(), 1);
        assert!(loaded.reactions.is_empty());
        assert!(!loaded.is_edited);
    }

    #[test]
    fn scope_snapshots_are_isolated_and_ordered() {
        let (_dir, db) = open_test_db();
        let channel = Uuid::new_v4();
        let conversation = Uuid::new_v4();

        let mut early = Message::new(
            "first".to_string(),
            "u-1".to_string(),
            MessageScope::Channel(channel),
        );
        early.created_at = Utc::now() - chrono::Duration::seconds(30);
        let late = Message::new(
            "second".to_string(),
            "u-1".to_string(),
            MessageScope::Channel(channel),
        );
        let elsewhere = Message::new(
            "other stream".to_string(),
            "u-2".to_string(),
            MessageScope::Conversation(conversation),
        );

        // Insert out of order on purpose.
        db.insert_message(&late).unwrap();
        db.insert_message(&early).unwrap();
        db.insert_message(&elsewhere).unwrap();

        let snapshot = db
            .messages_for_scope(&MessageScope::Channel(channel))
            .unwrap();
        let contents: Vec<&str> = snapshot.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn chat_scope_round_trip() {
        let (_dir, db) = open_test_db();
        let chat_id = "ai-chat-u1-joker".to_string();
        let msg = Message::new(
            "why so serious".to_string(),
            "u-1".to_string(),
            MessageScope::Chat(chat_id.clone()),
        );
        db.insert_message(&msg).unwrap();

        let snapshot = db.messages_for_scope(&MessageScope::Chat(chat_id)).unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn edit_marks_edited_and_bumps_updated_at() {
        let (_dir, db) = open_test_db();
        let msg = Message::new(
            "typo".to_string(),
            "u-1".to_string(),
            MessageScope::Channel(Uuid::new_v4()),
        );
        db.insert_message(&msg).unwrap();

        let edited = db.update_message_content(msg.id, "fixed").unwrap();
        assert_eq!(edited.content, "fixed");
        assert!(edited.is_edited);
        assert!(edited.updated_at >= msg.updated_at);
        assert_eq!(edited.created_at, msg.created_at);
    }

    #[test]
    fn edit_missing_message_is_not_found() {
        let (_dir, db) = open_test_db();
        assert!(matches!(
            db.update_message_content(Uuid::new_v4(), "x"),
            Err(StoreError::NotFound)
        ));
    }
}
