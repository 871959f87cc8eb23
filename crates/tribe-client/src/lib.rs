//! # tribe-client
//!
//! The conversation-state core of the Tribe chat application.
//!
//! [`ChatClient`] is an explicit application-state object: it owns the
//! database handle, the active-scope selection, the in-memory message
//! snapshot, and the user directory cache, and exposes the channel
//! registry, direct-message registry, character selection, and message
//! stream operations on top of them.  Realtime behavior is modelled as a
//! subscription per active scope: selecting a new conversation target
//! tears down the previous subscription task before establishing the next
//! one, and every snapshot is re-sorted by creation time before it
//! replaces the list.
//!
//! AI character replies are produced by a [`pipeline::ResponsePipeline`]
//! implementation; the production one calls the Tribe function endpoints
//! over HTTP.

pub mod channels;
pub mod character;
pub mod direct_messages;
pub mod directory;
pub mod events;
pub mod pipeline;
pub mod state;
pub mod stream;
pub mod subscription;

mod error;

pub use error::{ChatError, Result};
pub use events::ClientEvent;
pub use state::ChatClient;
