//! # roomsync-store
//!
//! Local document store for the roomsync chat model, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model. Per-member room state (unread counters, mute and pin flags) lives in
//! one row per member so that every counter can be updated with a single
//! field-level statement instead of a read-modify-write of the whole room.

pub mod blobs;
pub mod contacts;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod rooms;
pub mod settings;
pub mod users;

mod codec;
mod error;

pub use codec::now;
pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
