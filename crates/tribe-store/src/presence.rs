//! Ephemeral presence records.
//!
//! Presence is a simple keyed overwrite (`status/{uid}` in the original
//! layout); no heartbeat protocol is implemented here.

use chrono::{DateTime, Utc};
use rusqlite::params;
use tribe_shared::PresenceState;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Presence;

impl Database {
    /// Overwrite the presence record for a user.
    pub fn set_presence(&self, uid: &str, state: PresenceState) -> Result<()> {
        self.conn().execute(
            "INSERT INTO presence (uid, state, last_seen)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(uid) DO UPDATE SET
                 state = excluded.state,
                 last_seen = excluded.last_seen",
            params![uid, state.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Fetch the presence record for a user, if any was ever written.
    pub fn get_presence(&self, uid: &str) -> Result<Option<Presence>> {
        let result = self.conn().query_row(
            "SELECT uid, state, last_seen FROM presence WHERE uid = ?1",
            params![uid],
            |row| {
                let uid: String = row.get(0)?;
                let state_str: String = row.get(1)?;
                let seen_str: String = row.get(2)?;
                Ok((uid, state_str, seen_str))
            },
        );

        let (uid, state_str, seen_str) = match result {
            Ok(tuple) => tuple,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(StoreError::Sqlite(e)),
        };

        let state = PresenceState::parse(&state_str).unwrap_or_else(|| {
            tracing::warn!(uid = %uid, state = %state_str, "unknown presence state, treating as offline");
            PresenceState::Offline
        });
        let last_seen: DateTime<Utc> = DateTime::parse_from_rfc3339(&seen_str)
            .map(|dt| dt.with_timezone(&Utc))?;

        Ok(Some(Presence {
            uid,
            state,
            last_seen,
        }))
    }
}
