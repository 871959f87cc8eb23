//! # tribe-store
//!
//! Local persistence for the Tribe application, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model: channels, direct-message conversations, messages, reactions,
//! user profiles, and ephemeral presence records.  Schema migrations run
//! on open; one-off data-shape repairs live in [`admin`].

pub mod admin;
pub mod channels;
pub mod conversations;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod presence;
pub mod reactions;
pub mod users;

mod error;

pub use admin::GENERAL_CHANNEL_NAME;
pub use database::Database;
pub use error::StoreError;
pub use models::*;
