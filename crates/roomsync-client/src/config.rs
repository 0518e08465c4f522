//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the client can start with zero
//! configuration for local development.

use std::path::PathBuf;

use roomsync_shared::constants::{DEFAULT_CHANGE_FEED_CAPACITY, DEFAULT_SUBSCRIPTION_BUFFER};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// SQLite database file.
    /// Env: `ROOMSYNC_DB_PATH`
    /// Default: `None`, meaning the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Directory where avatar blobs are written.
    /// Env: `ROOMSYNC_BLOB_DIR`
    /// Default: `./blobs`
    pub blob_dir: PathBuf,

    /// Snapshots buffered per live subscription before the producer waits.
    /// Env: `ROOMSYNC_SUBSCRIPTION_BUFFER`
    /// Default: `16`
    pub subscription_buffer: usize,

    /// Capacity of the change feed; slow subscribers beyond this re-query.
    /// Env: `ROOMSYNC_CHANGE_FEED_CAPACITY`
    /// Default: `256`
    pub change_feed_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            blob_dir: PathBuf::from("./blobs"),
            subscription_buffer: DEFAULT_SUBSCRIPTION_BUFFER,
            change_feed_capacity: DEFAULT_CHANGE_FEED_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("ROOMSYNC_DB_PATH").filter(|p| !p.is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(dir) = lookup("ROOMSYNC_BLOB_DIR").filter(|d| !d.is_empty()) {
            config.blob_dir = PathBuf::from(dir);
        }

        if let Some(val) = lookup("ROOMSYNC_SUBSCRIPTION_BUFFER") {
            match parse_positive(&val) {
                Some(n) => config.subscription_buffer = n,
                None => tracing::warn!(
                    value = %val,
                    "Invalid ROOMSYNC_SUBSCRIPTION_BUFFER, using default"
                ),
            }
        }

        if let Some(val) = lookup("ROOMSYNC_CHANGE_FEED_CAPACITY") {
            match parse_positive(&val) {
                Some(n) => config.change_feed_capacity = n,
                None => tracing::warn!(
                    value = %val,
                    "Invalid ROOMSYNC_CHANGE_FEED_CAPACITY, using default"
                ),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

fn parse_positive(val: &str) -> Option<usize> {
    val.trim().parse::<usize>().ok().filter(|n| *n > 0)
}
