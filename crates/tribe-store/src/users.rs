//! CRUD operations for [`UserProfile`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::UserProfile;

impl Database {
    /// Insert a profile, or refresh the mutable fields if it already
    /// exists.  Called lazily on first sign-in.
    pub fn upsert_user(&self, user: &UserProfile) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (uid, display_name, email, photo_url, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(uid) DO UPDATE SET
                 display_name = excluded.display_name,
                 email = excluded.email,
                 photo_url = excluded.photo_url",
            params![
                user.uid,
                user.display_name,
                user.email,
                user.photo_url,
                user.role,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single profile by uid.
    pub fn get_user(&self, uid: &str) -> Result<UserProfile> {
        self.conn()
            .query_row(
                "SELECT uid, display_name, email, photo_url, role, created_at
                 FROM users WHERE uid = ?1",
                params![uid],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List every known profile, ordered by display name.
    pub fn list_users(&self) -> Result<Vec<UserProfile>> {
        let mut stmt = self.conn().prepare(
            "SELECT uid, display_name, email, photo_url, role, created_at
             FROM users ORDER BY display_name ASC",
        )?;

        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Update a user's role.
    pub fn set_user_role(&self, uid: &str, role: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE users SET role = ?2 WHERE uid = ?1",
            params![uid, role],
        )?;
        Ok(())
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    let uid: String = row.get(0)?;
    let display_name: String = row.get(1)?;
    let email: Option<String> = row.get(2)?;
    let photo_url: Option<String> = row.get(3)?;
    let role: String = row.get(4)?;
    let created_str: String = row.get(5)?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(UserProfile {
        uid,
        display_name,
        email,
        photo_url,
        role,
        created_at,
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

    fn profile(uid: &str, name: &str) -> UserProfile {
        UserProfile {
            uid: uid.to_string(),
            display_name: name.to_string(),
            email: Some(format!("{uid}@example.com")),
            photo_url: None,
            role: "member".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_refreshes_mutable_fields_only() {
        let (_dir, db) = open_test_db();
        let original = profile("u-1", "Alice");
        db.upsert_user(&original).unwrap();

        let mut renamed = profile("u-1", "Alice Cooper");
        renamed.role = "admin".to_string();
        db.upsert_user(&renamed).unwrap();

        let loaded = db.get_user("u-1").unwrap();
        assert_eq!(loaded.display_name, "Alice Cooper");
        // Role is not refreshed on conflict; it is managed separately.
        assert_eq!(loaded.role, "member");
    }

    #[test]
    fn set_role() {
        let (_dir, db) = open_test_db();
        db.upsert_user(&profile("u-1", "Alice")).unwrap();
        db.set_user_role("u-1", "admin").unwrap();
        assert_eq!(db.get_user("u-1").unwrap().role, "admin");
    }

    #[test]
    fn missing_user_is_not_found() {
        let (_dir, db) = open_test_db();
        assert!(matches!(db.get_user("ghost"), Err(StoreError::NotFound)));
    }
}
