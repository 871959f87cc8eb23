//! One-off administrative data repairs.
//!
//! These run out-of-band, not as part of the running application.  Each is
//! idempotent raw SQL over legacy rows, so running a repair twice (or on a
//! healthy database) is harmless.  They intentionally bypass the typed
//! models: legacy rows may not parse as the current domain types.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::Channel;
use tribe_shared::AI_CHAT_PREFIX;

/// Name of the channel every user lands in by default.
pub const GENERAL_CHANNEL_NAME: &str = "General";

impl Database {
    /// Delete legacy synthetic channel rows (`ai-chat-` id prefix) that an
    /// earlier version created by mistake.  Character chats are message
    /// scopes, not channels.  Returns the number of rows removed.
    pub fn cleanup_ai_channels(&self) -> Result<usize> {
        let pattern = format!("{AI_CHAT_PREFIX}%");
        let removed = self.conn().execute(
            "DELETE FROM channels WHERE id LIKE ?1",
            params![pattern],
        )?;

        if removed > 0 {
            tracing::info!(removed, "cleaned up legacy synthetic channels");
        }
        Ok(removed)
    }

    /// Backfill missing timestamps on legacy message rows.
    ///
    /// Rows with an empty `created_at` inherit `updated_at` (and vice
    /// versa); rows missing both get the current time.  Returns the number
    /// of rows touched.
    pub fn backfill_message_timestamps(&self) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let mut touched = 0;

        touched += self.conn().execute(
            "UPDATE messages SET created_at = updated_at
             WHERE created_at = '' AND updated_at <> ''",
            [],
        )?;
        touched += self.conn().execute(
            "UPDATE messages SET updated_at = created_at
             WHERE updated_at = '' AND created_at <> ''",
            [],
        )?;
        touched += self.conn().execute(
            "UPDATE messages SET created_at = ?1, updated_at = ?1
             WHERE created_at = '' AND updated_at = ''",
            params![now],
        )?;

        if touched > 0 {
            tracing::info!(touched, "backfilled message timestamps");
        }
        Ok(touched)
    }

    /// Normalize channel rows: guarantee the default `General` channel
    /// exists and fill empty descriptions.  Returns the General channel.
    pub fn ensure_general_channel(&self, system_uid: &str) -> Result<Channel> {
        if let Some(existing) = self.find_channel_by_name(GENERAL_CHANNEL_NAME)? {
            return Ok(existing);
        }

        let channel = Channel {
            id: Uuid::new_v4(),
            name: GENERAL_CHANNEL_NAME.to_string(),
            description: "Open discussion for everyone".to_string(),
            created_at: Utc::now(),
            created_by: system_uid.to_string(),
        };
        self.create_channel(&channel)?;
        tracing::info!(id = %channel.id, "created default General channel");
        Ok(channel)
    }

    /// Set the default role on user rows lacking one.  Returns the number
    /// of rows touched.
    pub fn set_default_roles(&self) -> Result<usize> {
        let touched = self.conn().execute(
            "UPDATE users SET role = 'member' WHERE role IS NULL OR role = ''",
            [],
        )?;

        if touched > 0 {
            tracing::info!(touched, "applied default role to legacy users");
        }
        Ok(touched)
    }
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
    fn cleanup_removes_only_synthetic_rows() {
        let (_dir, db) = open_test_db();
        let now = Utc::now().to_rfc3339();

        // Legacy synthetic row inserted raw: it has a string id, not a UUID.
        db.conn()
            .execute(
                "INSERT INTO channels (id, name, description, created_at, created_by)
                 VALUES ('ai-chat-u1-joker', 'Joker', '', ?1, 'u-1')",
                params![now],
            )
            .unwrap();
        let keep = Channel {
            id: Uuid::new_v4(),
            name: "random".to_string(),
            description: String::new(),
            created_at: Utc::now(),
            created_by: "u-1".to_string(),
        };
        db.create_channel(&keep).unwrap();

        assert_eq!(db.cleanup_ai_channels().unwrap(), 1);
        assert_eq!(db.cleanup_ai_channels().unwrap(), 0);
        assert_eq!(db.list_channels().unwrap().len(), 1);
    }

    #[test]
    fn backfill_fills_empty_timestamps() {
        let (_dir, db) = open_test_db();
        let now = Utc::now().to_rfc3339();

        db.conn()
            .execute(
                "INSERT INTO messages
                     (id, content, user_id, created_at, updated_at, channel_id)
                 VALUES ('legacy-1', 'old', 'u-1', '', ?1, 'c-1'),
                        ('legacy-2', 'older', 'u-1', '', '', 'c-1')",
                params![now],
            )
            .unwrap();

        assert_eq!(db.backfill_message_timestamps().unwrap(), 2);
        assert_eq!(db.backfill_message_timestamps().unwrap(), 0);

        let empty: i64 = db
            .conn()
            .query_row(
                "SELECT count(*) FROM messages WHERE created_at = '' OR updated_at = ''",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(empty, 0);
    }

    #[test]
    fn ensure_general_is_idempotent() {
        let (_dir, db) = open_test_db();
        let first = db.ensure_general_channel("system").unwrap();
        let second = db.ensure_general_channel("system").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(db.list_channels().unwrap().len(), 1);
    }

    #[test]
    fn default_roles_applied_to_legacy_users() {
        let (_dir, db) = open_test_db();
        let now = Utc::now().to_rfc3339();

        db.conn()
            .execute(
                "INSERT INTO users (uid, display_name, role, created_at)
                 VALUES ('u-legacy', 'Old Timer', '', ?1)",
                params![now],
            )
            .unwrap();

        assert_eq!(db.set_default_roles().unwrap(), 1);
        assert_eq!(db.get_user("u-legacy").unwrap().role, "member");
    }
}
