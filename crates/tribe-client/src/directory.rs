//! User directory cache.
//!
//! An in-memory uid -> profile map, lazily populated from the store when a
//! message or conversation references an unknown author.  Synthetic
//! persona profiles (`ai-` prefixed uids) are fabricated from the static
//! character configuration and never persisted.

use std::collections::HashMap;

use chrono::Utc;
use tribe_shared::{characters, is_synthetic_user, synthetic_user_id, SYNTHETIC_USER_PREFIX};
use tribe_store::{Database, UserProfile};

use crate::error::Result;
use crate::state::ChatClient;

#[derive(Default)]
pub struct UserDirectory {
    users: HashMap<String, UserProfile>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached profile lookup.
    pub fn get(&self, uid: &str) -> Option<&UserProfile> {
        self.users.get(uid)
    }

    pub fn insert(&mut self, profile: UserProfile) {
        self.users.insert(profile.uid.clone(), profile);
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.users.contains_key(uid)
    }

    /// Ensure a profile is cached, fetching from the store on miss.
    ///
    /// Synthetic persona uids are resolved from the static character
    /// table rather than the database.  Unknown uids stay uncached and
    /// resolve to `None`.
    pub fn populate(&mut self, db: &Database, uid: &str) -> Option<&UserProfile> {
        if !self.users.contains_key(uid) {
            if let Some(profile) = resolve_profile(db, uid) {
                self.users.insert(uid.to_string(), profile);
            }
        }
        self.users.get(uid)
    }
}

fn resolve_profile(db: &Database, uid: &str) -> Option<UserProfile> {
    if is_synthetic_user(uid) {
        let character_id = &uid[SYNTHETIC_USER_PREFIX.len()..];
        return characters::find(character_id).map(synthetic_profile);
    }

    match db.get_user(uid) {
        Ok(profile) => Some(profile),
        Err(tribe_store::StoreError::NotFound) => None,
        Err(e) => {
            tracing::warn!(uid = %uid, error = %e, "failed to fetch profile");
            None
        }
    }
}

/// Build the in-memory profile for a persona.
pub fn synthetic_profile(character: &characters::Character) -> UserProfile {
    UserProfile {
        uid: synthetic_user_id(character.id),
        display_name: character.name.to_string(),
        email: None,
        photo_url: Some(character.avatar_url.to_string()),
        role: "character".to_string(),
        created_at: Utc::now(),
    }
}

impl ChatClient {
    /// Resolve a profile through the cache, hitting the store (or the
    /// static character table) on a miss.
    pub fn user_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        {
            let state = self.inner.lock_state();
            if let Some(profile) = state.directory.get(uid) {
                return Ok(Some(profile.clone()));
            }
        }

        // Miss: fetch outside the state lock, then cache.
        let fetched = {
            let db = self.inner.lock_db();
            resolve_profile(&db, uid)
        };

        if let Some(profile) = fetched.clone() {
            self.inner.lock_state().directory.insert(profile);
        }
        Ok(fetched)
    }
}
