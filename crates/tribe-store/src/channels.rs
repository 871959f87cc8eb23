//! CRUD operations for [`Channel`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Channel;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new channel.
    pub fn create_channel(&self, channel: &Channel) -> Result<()> {
        self.conn().execute(
            "INSERT INTO channels (id, name, description, created_at, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                channel.id.to_string(),
                channel.name,
                channel.description,
                channel.created_at.to_rfc3339(),
                channel.created_by,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single channel by UUID.
    pub fn get_channel(&self, id: Uuid) -> Result<Channel> {
        self.conn()
            .query_row(
                "SELECT id, name, description, created_at, created_by
                 FROM channels
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_channel,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Find a channel by name, case-insensitively.
    ///
    /// Used for the best-effort duplicate check on creation: name
    /// uniqueness is expected but not enforced atomically.
    pub fn find_channel_by_name(&self, name: &str) -> Result<Option<Channel>> {
        let result = self.conn().query_row(
            "SELECT id, name, description, created_at, created_by
             FROM channels
             WHERE lower(name) = lower(?1)
               AND id NOT LIKE 'ai-chat-%'
             ORDER BY created_at ASC
             LIMIT 1",
            params![name],
            row_to_channel,
        );

        match result {
            Ok(channel) => Ok(Some(channel)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// List all channels, ordered by creation date ascending.
    ///
    /// Legacy synthetic rows (`ai-chat-` id prefix) are excluded; the
    /// one-off cleanup repair removes them for good.
    pub fn list_channels(&self) -> Result<Vec<Channel>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, description, created_at, created_by
             FROM channels
             WHERE id NOT LIKE 'ai-chat-%'
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map([], row_to_channel)?;

        let mut channels = Vec::new();
        for row in rows {
            channels.push(row?);
        }
        Ok(channels)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a channel together with all of its messages and their
    /// reactions, as a single transaction.  Returns `true` if the channel
    /// row existed.
    pub fn delete_channel_cascade(&mut self, id: Uuid) -> Result<bool> {
        let tx = self.conn_mut().transaction()?;
        let id_str = id.to_string();

        tx.execute(
            "DELETE FROM reactions WHERE message_id IN
                 (SELECT id FROM messages WHERE channel_id = ?1)",
            params![id_str],
        )?;
        tx.execute("DELETE FROM messages WHERE channel_id = ?1", params![id_str])?;
        let affected = tx.execute("DELETE FROM channels WHERE id = ?1", params![id_str])?;

        tx.commit()?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Channel`].
fn row_to_channel(row: &rusqlite::Row<'_>) -> rusqlite::Result<Channel> {
    let id_str: String = row.get(0)?;
    let name: String = row.get(1)?;
    let description: String = row.get(2)?;
    let created_str: String = row.get(3)?;
    let created_by: String = row.get(4)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Channel {
        id,
        name,
        description,
        created_at,
        created_by,
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

    fn sample_channel(name: &str) -> Channel {
        Channel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            created_at: Utc::now(),
            created_by: "u-creator".to_string(),
        }
    }

    #[test]
    fn create_and_get() {
        let (_dir, db) = open_test_db();
        let channel = sample_channel("general");
        db.create_channel(&channel).unwrap();

        let loaded = db.get_channel(channel.id).unwrap();
        assert_eq!(loaded.name, "general");
        assert_eq!(loaded.created_by, "u-creator");
    }

    #[test]
    fn find_by_name_is_case_insensitive() {
        let (_dir, db) = open_test_db();
        db.create_channel(&sample_channel("General")).unwrap();

        assert!(db.find_channel_by_name("general").unwrap().is_some());
        assert!(db.find_channel_by_name("GENERAL").unwrap().is_some());
        assert!(db.find_channel_by_name("random").unwrap().is_none());
    }

    #[test]
    fn list_orders_by_creation_ascending() {
        let (_dir, db) = open_test_db();
        let mut first = sample_channel("first");
        first.created_at = Utc::now() - chrono::Duration::seconds(10);
        let second = sample_channel("second");
        db.create_channel(&second).unwrap();
        db.create_channel(&first).unwrap();

        let names: Vec<String> = db
            .list_channels()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn cascade_delete_removes_messages_and_reactions() {
        let (_dir, mut db) = open_test_db();
        let channel = sample_channel("doomed");
        db.create_channel(&channel).unwrap();

        let msg = Message::new(
            "hello".to_string(),
            "u-1".to_string(),
            MessageScope::Channel(channel.id),
        );
        db.insert_message(&msg).unwrap();
        db.add_reaction(msg.id, "u-2", "\u{1F44D}").unwrap();

        assert!(db.delete_channel_cascade(channel.id).unwrap());
        assert!(matches!(db.get_channel(channel.id), Err(StoreError::NotFound)));
        assert!(db
            .messages_for_scope(&MessageScope::Channel(channel.id))
            .unwrap()
            .is_empty());
        assert!(db.reactions_for_message(msg.id).unwrap().is_empty());
    }

    #[test]
    fn delete_missing_channel_returns_false() {
        let (_dir, mut db) = open_test_db();
        assert!(!db.delete_channel_cascade(Uuid::new_v4()).unwrap());
    }
}
