//! CRUD operations for direct-message [`Conversation`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Conversation, LastMessage};

impl Database {
    /// Insert a conversation row.
    ///
    /// `INSERT OR IGNORE` together with the unique pair index means two
    /// racing creators converge on one row; callers re-read by id after
    /// inserting.
    pub fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO conversations
                 (id, participant_a, participant_b, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                conversation.id.to_string(),
                conversation.participants[0],
                conversation.participants[1],
                conversation.created_at.to_rfc3339(),
                conversation.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single conversation by UUID.
    pub fn get_conversation(&self, id: Uuid) -> Result<Conversation> {
        self.conn()
            .query_row(
                "SELECT id, participant_a, participant_b, created_at, updated_at,
                        last_message_content, last_message_sender, last_message_at
                 FROM conversations
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_conversation,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Find the conversation for an unordered participant pair, if any.
    pub fn find_conversation_by_participants(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Option<Conversation>> {
        let (first, second) = Conversation::sorted_pair(a, b);

        let result = self.conn().query_row(
            "SELECT id, participant_a, participant_b, created_at, updated_at,
                    last_message_content, last_message_sender, last_message_at
             FROM conversations
             WHERE participant_a = ?1 AND participant_b = ?2",
            params![first, second],
            row_to_conversation,
        );

        match result {
            Ok(conversation) => Ok(Some(conversation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// List every conversation the user participates in, most recently
    /// updated first.
    pub fn list_conversations_for_user(&self, uid: &str) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, participant_a, participant_b, created_at, updated_at,
                    last_message_content, last_message_sender, last_message_at
             FROM conversations
             WHERE participant_a = ?1 OR participant_b = ?1
             ORDER BY updated_at DESC",
        )?;

        let rows = stmt.query_map(params![uid], row_to_conversation)?;

        let mut conversations = Vec::new();
        for row in rows {
            conversations.push(row?);
        }
        Ok(conversations)
    }

    /// Update the denormalised last-message preview and `updated_at`.
    pub fn set_conversation_last_message(
        &self,
        id: Uuid,
        last_message: &LastMessage,
    ) -> Result<()> {
        self.conn().execute(
            "UPDATE conversations
             SET last_message_content = ?2,
                 last_message_sender = ?3,
                 last_message_at = ?4,
                 updated_at = ?4
             WHERE id = ?1",
            params![
                id.to_string(),
                last_message.content,
                last_message.sender_id,
                last_message.sent_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete a conversation together with all of its messages and their
    /// reactions, as a single transaction.  Returns `true` if the
    /// conversation row existed.
    pub fn delete_conversation_cascade(&mut self, id: Uuid) -> Result<bool> {
        let tx = self.conn_mut().transaction()?;
        let id_str = id.to_string();

        tx.execute(
            "DELETE FROM reactions WHERE message_id IN
                 (SELECT id FROM messages WHERE conversation_id = ?1)",
            params![id_str],
        )?;
        tx.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            params![id_str],
        )?;
        let affected = tx.execute("DELETE FROM conversations WHERE id = ?1", params![id_str])?;

        tx.commit()?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let id_str: String = row.get(0)?;
    let participant_a: String = row.get(1)?;
    let participant_b: String = row.get(2)?;
    let created_str: String = row.get(3)?;
    let updated_str: String = row.get(4)?;
    let last_content: Option<String> = row.get(5)?;
    let last_sender: Option<String> = row.get(6)?;
    let last_at: Option<String> = row.get(7)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at = parse_ts(&created_str, 3)?;
    let updated_at = parse_ts(&updated_str, 4)?;

    let last_message = match (last_content, last_sender, last_at) {
        (Some(content), Some(sender_id), Some(at)) => Some(LastMessage {
            content,
            sender_id,
            sent_at: parse_ts(&at, 7)?,
        }),
        _ => None,
    };

    Ok(Conversation {
        id,
        participants: [participant_a, participant_b],
        created_at,
        updated_at,
        last_message,
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
    use crate::models::{Message, MessageScope};

    fn open_test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn conversation_between(a: &str, b: &str) -> Conversation {
        let (first, second) = Conversation::sorted_pair(a, b);
        let now = Utc::now();
        Conversation {
            id: Conversation::deterministic_id(a, b),
            participants: [first, second],
            created_at: now,
            updated_at: now,
            last_message: None,
        }
    }

    #[test]
    fn find_by_participants_is_order_independent() {
        let (_dir, db) = open_test_db();
        db.create_conversation(&conversation_between("alice", "bob"))
            .unwrap();

        let found = db
            .find_conversation_by_participants("bob", "alice")
            .unwrap()
            .expect("should find conversation");
        assert!(found.involves("alice"));
        assert!(found.involves("bob"));
    }

    #[test]
    fn duplicate_create_converges_on_one_row() {
        let (_dir, db) = open_test_db();
        let c = conversation_between("alice", "bob");
        db.create_conversation(&c).unwrap();
        db.create_conversation(&c).unwrap();

        let all = db.list_conversations_for_user("alice").unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn last_message_round_trip() {
        let (_dir, db) = open_test_db();
        let c = conversation_between("alice", "bob");
        db.create_conversation(&c).unwrap();

        let preview = LastMessage {
            content: "see you there".to_string(),
            sender_id: "alice".to_string(),
            sent_at: Utc::now(),
        };
        db.set_conversation_last_message(c.id, &preview).unwrap();

        let loaded = db.get_conversation(c.id).unwrap();
        let last = loaded.last_message.expect("preview should be set");
        assert_eq!(last.content, "see you there");
        assert_eq!(last.sender_id, "alice");
        assert_eq!(loaded.updated_at, last.sent_at);
    }

    #[test]
    fn cascade_delete_removes_messages_and_reactions() {
        let (_dir, mut db) = open_test_db();
        let c = conversation_between("alice", "bob");
        db.create_conversation(&c).unwrap();

        let mut last_id = None;
        for i in 0..5 {
            let msg = Message::new(
                format!("dm {i}"),
                "alice".to_string(),
                MessageScope::Conversation(c.id),
            );
            db.insert_message(&msg).unwrap();
            last_id = Some(msg.id);
        }
        db.add_reaction(last_id.unwrap(), "bob", "\u{1F44D}").unwrap();

        assert!(db.delete_conversation_cascade(c.id).unwrap());
        assert!(matches!(db.get_conversation(c.id), Err(StoreError::NotFound)));
        assert!(db
            .messages_for_scope(&MessageScope::Conversation(c.id))
            .unwrap()
            .is_empty());
        assert!(db.reactions_for_message(last_id.unwrap()).unwrap().is_empty());
    }

    #[test]
    fn list_only_includes_own_conversations() {
        let (_dir, db) = open_test_db();
        db.create_conversation(&conversation_between("alice", "bob"))
            .unwrap();
        db.create_conversation(&conversation_between("carol", "dave"))
            .unwrap();

        assert_eq!(db.list_conversations_for_user("alice").unwrap().len(), 1);
        assert_eq!(db.list_conversations_for_user("eve").unwrap().len(), 0);
    }
}
