//! Scope subscriptions.
//!
//! Each active scope gets one background task that listens for store
//! change notifications and replaces the in-memory message snapshot.
//! Updates are delivered as whole-snapshot replacements and re-sorted
//! locally by timestamp, so out-of-order delivery cannot regress the
//! visual order.  Dropping the [`Subscription`] handle aborts the task;
//! scope switches drop the old handle before creating the new one.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tribe_store::MessageScope;

use crate::events::{self, ClientEvent};
use crate::state::ClientInner;

/// A change in one of the store's collections, fanned out to whichever
/// subscription cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreChange {
    Channels,
    Conversations,
    Messages(MessageScope),
}

/// Handle to a live scope subscription.  Tears the task down on drop.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn the listener task for one message scope.
pub(crate) fn subscribe(inner: &Arc<ClientInner>, scope: MessageScope) -> Subscription {
    let mut rx = inner.changes.subscribe();
    let inner = Arc::clone(inner);

    let handle = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(StoreChange::Messages(changed)) if changed == scope => {
                    refresh_snapshot(&inner, &scope);
                }
                Ok(_) => {}
                // Missed notifications collapse into one refresh; the
                // snapshot is whole-list so nothing is lost.
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    refresh_snapshot(&inner, &scope);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    Subscription { handle }
}

/// Reload the snapshot for `scope` and install it, unless the stream has
/// moved on to a different scope in the meantime (a stale delivery after
/// a switch is dropped, not applied).
pub(crate) fn refresh_snapshot(inner: &ClientInner, scope: &MessageScope) {
    let db = inner.lock_db();

    let mut snapshot = match db.messages_for_scope(scope) {
        Ok(messages) => messages,
        Err(e) => {
            tracing::error!(error = %e, "failed to load message snapshot");
            return;
        }
    };
    snapshot.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let mut state = inner.lock_state();
    if state.stream_scope.as_ref() != Some(scope) {
        return;
    }

    // Fetch any authors the directory has not seen yet.
    for message in &snapshot {
        state.directory.populate(&db, &message.user_id);
    }

    let count = snapshot.len();
    state.messages = snapshot;
    drop(state);
    drop(db);

    events::emit(&inner.events, ClientEvent::MessagesUpdated { count });
}

impl ClientInner {
    /// Publish a store change to whichever subscription cares.
    pub(crate) fn notify(&self, change: StoreChange) {
        let _ = self.changes.send(change);
    }
}
