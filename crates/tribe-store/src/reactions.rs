//! Reaction storage.
//!
//! One row per (message, emoji, user).  `INSERT OR IGNORE` makes adding a
//! reaction idempotent and exact-key deletes make removal idempotent, so
//! two users toggling the same emoji concurrently cannot lose each other's
//! updates.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Add `user_id` to the reacting set under `emoji`.  Returns `true`
    /// if the row was newly inserted, `false` if it already existed.
    pub fn add_reaction(&self, message_id: Uuid, user_id: &str, emoji: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO reactions (message_id, emoji, user_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                message_id.to_string(),
                emoji,
                user_id,
                Utc::now().to_rfc3339(),
            ],
        )?;

        if affected > 0 {
            self.touch_message(message_id)?;
        }
        Ok(affected > 0)
    }

    /// Remove `user_id` from the reacting set under `emoji`.  Returns
    /// `true` if a row was deleted.
    pub fn remove_reaction(&self, message_id: Uuid, user_id: &str, emoji: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM reactions
             WHERE message_id = ?1 AND emoji = ?2 AND user_id = ?3",
            params![message_id.to_string(), emoji, user_id],
        )?;

        if affected > 0 {
            self.touch_message(message_id)?;
        }
        Ok(affected > 0)
    }

    /// Assemble the emoji -> reacting-user-set map for one message.
    pub fn reactions_for_message(
        &self,
        message_id: Uuid,
    ) -> Result<BTreeMap<String, BTreeSet<String>>> {
        let mut stmt = self.conn().prepare(
            "SELECT emoji, user_id FROM reactions WHERE message_id = ?1",
        )?;

        let rows = stmt.query_map(params![message_id.to_string()], |row| {
            let emoji: String = row.get(0)?;
            let user_id: String = row.get(1)?;
            Ok((emoji, user_id))
        })?;

        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in rows {
            let (emoji, user_id) = row?;
            map.entry(emoji).or_default().insert(user_id);
        }
        Ok(map)
    }

    /// Bump a message's `updated_at` after a reaction mutation.
    fn touch_message(&self, message_id: Uuid) -> Result<()> {
        self.conn().execute(
            "UPDATE messages SET updated_at = ?2 WHERE id = ?1",
            params![message_id.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
