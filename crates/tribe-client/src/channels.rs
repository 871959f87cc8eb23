//! Channel registry operations.

use chrono::Utc;
use tribe_shared::ActiveScope;
use tribe_store::{Channel, GENERAL_CHANNEL_NAME};
use uuid::Uuid;

use crate::error::{ChatError, Result};
use crate::events::{self, ClientEvent};
use crate::state::ChatClient;
use crate::subscription::StoreChange;

impl ChatClient {
    /// All channels, ordered by creation date.
    pub fn list_channels(&self) -> Result<Vec<Channel>> {
        let db = self.inner.lock_db();
        Ok(db.list_channels()?)
    }

    /// Create a channel and select it.
    ///
    /// Names are deduplicated case-insensitively: creating "General" when
    /// "general" exists selects the existing channel instead of creating
    /// a second one.
    pub async fn create_channel(&self, name: &str, description: Option<&str>) -> Result<Channel> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::Validation("channel name is empty".into()));
        }
        let user = self.current_user().ok_or(ChatError::Authentication)?;

        let channel = {
            let db = self.inner.lock_db();
            if let Some(existing) = db.find_channel_by_name(name)? {
                tracing::debug!(name, id = %existing.id, "channel name already taken, selecting it");
                drop(db);
                self.apply_scope(ActiveScope::Channel(existing.id))?;
                return Ok(existing);
            }

            let channel = Channel {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: description.unwrap_or_default().trim().to_string(),
                created_at: Utc::now(),
                created_by: user.uid.clone(),
            };
            db.create_channel(&channel)?;
            channel
        };

        tracing::info!(id = %channel.id, name = %channel.name, "channel created");
        self.inner.notify(StoreChange::Channels);
        events::emit(&self.inner.events, ClientEvent::ChannelsUpdated);

        self.apply_scope(ActiveScope::Channel(channel.id))?;
        Ok(channel)
    }

    /// Select a channel as the active scope.  `None` or an id that no
    /// longer exists (a concurrent delete) clears the selection instead
    /// of failing.
    pub fn select_channel(&self, id: Option<Uuid>) -> Result<()> {
        if let Some(id) = id {
            let exists = {
                let db = self.inner.lock_db();
                match db.get_channel(id) {
                    Ok(_) => true,
                    Err(tribe_store::StoreError::NotFound) => false,
                    Err(e) => return Err(e.into()),
                }
            };
            if exists {
                return self.apply_scope(ActiveScope::Channel(id));
            }
            tracing::debug!(id = %id, "selected channel no longer exists, clearing");
        }
        self.apply_scope(ActiveScope::None)
    }

    /// Delete a channel along with its messages and reactions.  Only the
    /// creator may delete.
    pub fn delete_channel(&self, id: Uuid) -> Result<()> {
        let user = self.current_user().ok_or(ChatError::Authentication)?;

        {
            let mut db = self.inner.lock_db();
            let channel = db.get_channel(id)?;
            if channel.created_by != user.uid {
                return Err(ChatError::Authorization(
                    "only the creator can delete a channel".into(),
                ));
            }
            db.delete_channel_cascade(id)?;
        }

        tracing::info!(id = %id, "channel deleted");
        self.inner.notify(StoreChange::Channels);
        events::emit(&self.inner.events, ClientEvent::ChannelsUpdated);

        if self.current_scope() == ActiveScope::Channel(id) {
            self.apply_scope(ActiveScope::None)?;
            self.ensure_default_selection()?;
        }
        Ok(())
    }

    /// If nothing is selected, fall back to the General channel (or the
    /// oldest channel when no General exists).  No-op when a scope is
    /// already active or no channels exist.
    pub fn ensure_default_selection(&self) -> Result<()> {
        if !self.current_scope().is_none() {
            return Ok(());
        }

        let fallback = {
            let db = self.inner.lock_db();
            match db.find_channel_by_name(GENERAL_CHANNEL_NAME)? {
                Some(general) => Some(general),
                None => db.list_channels()?.into_iter().next(),
            }
        };

        if let Some(channel) = fallback {
            tracing::debug!(id = %channel.id, name = %channel.name, "defaulting selection");
            self.apply_scope(ActiveScope::Channel(channel.id))?;
        }
        Ok(())
    }
}
