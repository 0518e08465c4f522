//! Chat operations, grouped by concern.
//!
//! Each sub-module adds methods to [`crate::state::ChatClient`]. Writes
//! validate locally first, check permissions against the current room
//! document, commit, and then publish a [`crate::events::Change`] so live
//! subscriptions re-query.

pub mod contacts;
pub mod messaging;
pub mod profile;
pub mod read_state;
pub mod rooms;
pub mod settings;
