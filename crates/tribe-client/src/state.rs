//! Central application state.
//!
//! [`ChatClient`] is shared by cloning; all clones point at the same inner
//! state.  The message list and user cache are only mutated under the
//! state lock, and database access goes through its own lock, so no
//! additional synchronisation is needed.  Lock discipline: never acquire
//! the database lock while holding the state lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::broadcast;
use tribe_shared::{ActiveScope, PresenceState};
use tribe_store::{Database, Message, MessageScope, UserProfile};

use crate::directory::UserDirectory;
use crate::error::Result;
use crate::events::{self, ClientEvent};
use crate::pipeline::ResponsePipeline;
use crate::subscription::{StoreChange, Subscription};

const EVENT_CAPACITY: usize = 64;

/// Chat client handle.  Cheap to clone; every clone shares state.
#[derive(Clone)]
pub struct ChatClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) db: Mutex<Database>,
    pub(crate) state: Mutex<ClientState>,
    pub(crate) events: broadcast::Sender<ClientEvent>,
    pub(crate) changes: broadcast::Sender<StoreChange>,
    pub(crate) pipeline: Arc<dyn ResponsePipeline>,
}

/// Mutable client state guarded by one lock.
pub(crate) struct ClientState {
    /// The signed-in user, if any.
    pub(crate) current_user: Option<UserProfile>,
    /// The single active conversation target.
    pub(crate) scope: ActiveScope,
    /// Message scope the stream is currently subscribed to.  Stale
    /// snapshot deliveries are dropped when this no longer matches.
    pub(crate) stream_scope: Option<MessageScope>,
    /// In-memory snapshot of the subscribed stream, sorted ascending by
    /// creation time.
    pub(crate) messages: Vec<Message>,
    /// Lazily populated uid -> profile cache.
    pub(crate) directory: UserDirectory,
    /// Live subscription task; dropping it tears the task down.
    pub(crate) subscription: Option<Subscription>,
    /// Last direct-message selection target, for debounce coalescing.
    pub(crate) last_dm_select: Option<(String, Instant)>,
}

impl ChatClient {
    /// Create a client over an open database.
    pub fn new(db: Database, pipeline: Arc<dyn ResponsePipeline>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (changes, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(ClientInner {
                db: Mutex::new(db),
                state: Mutex::new(ClientState {
                    current_user: None,
                    scope: ActiveScope::None,
                    stream_scope: None,
                    messages: Vec::new(),
                    directory: UserDirectory::new(),
                    subscription: None,
                    last_dm_select: None,
                }),
                events,
                changes,
                pipeline,
            }),
        }
    }

    /// Subscribe to client events (new receivers see only future events).
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    /// The currently signed-in user, if any.
    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.lock_state().current_user.clone()
    }

    /// The active conversation target.
    pub fn current_scope(&self) -> ActiveScope {
        self.inner.lock_state().scope.clone()
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Sign a user in, creating their profile row lazily on first
    /// sign-in, and mark them online.
    pub fn sign_in(
        &self,
        uid: &str,
        display_name: &str,
        email: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<UserProfile> {
        let profile = {
            let db = self.inner.lock_db();
            match db.get_user(uid) {
                Ok(existing) => existing,
                Err(tribe_store::StoreError::NotFound) => {
                    let fresh = UserProfile {
                        uid: uid.to_string(),
                        display_name: display_name.to_string(),
                        email: email.map(str::to_string),
                        photo_url: photo_url.map(str::to_string),
                        role: "member".to_string(),
                        created_at: Utc::now(),
                    };
                    db.upsert_user(&fresh)?;
                    tracing::info!(uid = %uid, "created profile on first sign-in");
                    fresh
                }
                Err(e) => return Err(e.into()),
            }
        };

        {
            let db = self.inner.lock_db();
            db.set_presence(uid, PresenceState::Online)?;
        }

        let mut state = self.inner.lock_state();
        state.directory.insert(profile.clone());
        state.current_user = Some(profile.clone());
        drop(state);

        tracing::info!(uid = %uid, "signed in");
        Ok(profile)
    }

    /// Sign the current user out: mark them offline and clear the active
    /// selection and stream.
    pub fn sign_out(&self) -> Result<()> {
        let uid = match self.current_user() {
            Some(user) => user.uid,
            None => return Ok(()),
        };

        {
            let db = self.inner.lock_db();
            db.set_presence(&uid, PresenceState::Offline)?;
        }

        let mut state = self.inner.lock_state();
        state.current_user = None;
        state.scope = ActiveScope::None;
        state.stream_scope = None;
        state.subscription = None;
        state.messages.clear();
        drop(state);

        events::emit(&self.inner.events, ClientEvent::ScopeChanged(ActiveScope::None));
        tracing::info!(uid = %uid, "signed out");
        Ok(())
    }

    /// Update the signed-in user's presence state.
    pub fn set_presence(&self, state: PresenceState) -> Result<()> {
        let user = self.current_user().ok_or(crate::ChatError::Authentication)?;
        let db = self.inner.lock_db();
        db.set_presence(&user.uid, state)?;
        Ok(())
    }
}

impl ClientInner {
    /// Lock the database, recovering from a poisoned lock: the store has
    /// no invariant a panicked writer could have broken mid-flight that a
    /// transaction has not already rolled back.
    pub(crate) fn lock_db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the client state, recovering from a poisoned lock.
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::test_client;

    #[tokio::test]
    async fn sign_in_creates_profile_once() {
        let (_dir, client) = test_client();

        let first = client.sign_in("u-1", "Alice", None, None).unwrap();
        let again = client
            .sign_in("u-1", "Renamed Later", None, None)
            .unwrap();

        // Second sign-in loads the existing row instead of re-creating it.
        assert_eq!(first.created_at, again.created_at);
        assert_eq!(again.display_name, "Alice");
        assert!(client.current_user().is_some());
    }

    #[tokio::test]
    async fn sign_out_clears_selection() {
        let (_dir, client) = test_client();
        client.sign_in("u-1", "Alice", None, None).unwrap();
        client.create_channel("general", None).await.unwrap();
        assert!(!client.current_scope().is_none());

        client.sign_out().unwrap();
        assert!(client.current_scope().is_none());
        assert!(client.current_user().is_none());
        assert!(client.messages().is_empty());
    }

    #[tokio::test]
    async fn presence_requires_sign_in() {
        let (_dir, client) = test_client();
        assert!(matches!(
            client.set_presence(PresenceState::Idle),
            Err(crate::ChatError::Authentication)
        ));
    }
}
