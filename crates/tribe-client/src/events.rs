//! Client event fan-out.
//!
//! UI layers subscribe to a broadcast receiver and re-render on events;
//! the core never calls into the UI directly.

use tokio::sync::broadcast;
use tribe_shared::ActiveScope;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Events emitted by [`crate::ChatClient`].
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The channel list changed.
    ChannelsUpdated,
    /// The conversation list (or a last-message preview) changed.
    ConversationsUpdated,
    /// The in-memory message snapshot was replaced.
    MessagesUpdated { count: usize },
    /// The active conversation target changed.
    ScopeChanged(ActiveScope),
    /// A non-fatal problem the user should see as a transient toast.
    Notification {
        level: NotificationLevel,
        message: String,
    },
}

/// Emit an event, ignoring the case where no receiver is subscribed.
pub(crate) fn emit(tx: &broadcast::Sender<ClientEvent>, event: ClientEvent) {
    let _ = tx.send(event);
}
