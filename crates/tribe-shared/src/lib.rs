//! # tribe-shared
//!
//! Domain types shared by every Tribe crate: the active-scope tagged union,
//! attachments, presence states, and the static AI character (persona)
//! configuration with its voice lookup table.

pub mod characters;
pub mod types;

pub use characters::{Character, CHARACTERS};
pub use types::*;
