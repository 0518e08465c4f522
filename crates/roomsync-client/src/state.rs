//! Client state shared by every operation.
//!
//! [`ChatClient`] is a cheap-to-clone handle: the database sits behind
//! `Arc<Mutex<>>` and the change feed is a broadcast sender. The lock is
//! only ever taken inside synchronous sections, never across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard};

use roomsync_shared::SyncError;
use roomsync_store::Database;
use tokio::sync::broadcast;

use crate::config::ClientConfig;
use crate::events::{Change, ChangeFeed};
use crate::subscription::Subscription;

#[derive(Clone)]
pub struct ChatClient {
    db: Arc<Mutex<Database>>,
    changes: ChangeFeed,
    config: Arc<ClientConfig>,
}

impl ChatClient {
    /// Open the database named by `config` (or the platform default) and
    /// build a client around it.
    pub fn open(config: ClientConfig) -> Result<Self, SyncError> {
        let db = match &config.db_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| SyncError::Transient(format!("create db dir: {e}")))?;
                }
                Database::open_at(path)?
            }
            None => Database::new()?,
        };
        Ok(Self::with_database(db, config))
    }

    /// Client over a private in-memory database.
    pub fn in_memory(config: ClientConfig) -> Result<Self, SyncError> {
        Ok(Self::with_database(Database::open_in_memory()?, config))
    }

    pub fn with_database(db: Database, config: ClientConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            changes: ChangeFeed::new(config.change_feed_capacity),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn lock_db(&self) -> Result<MutexGuard<'_, Database>, SyncError> {
        lock(&self.db)
    }

    pub(crate) fn emit(&self, change: Change) {
        self.changes.emit(change);
    }

    /// Build a live subscription whose query runs against this client's
    /// database.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, since the feed runs on a
    /// spawned task.
    pub(crate) fn subscribe<T, Q, R>(&self, label: String, relevant: R, query: Q) -> Subscription<T>
    where
        T: PartialEq + Clone + Send + 'static,
        Q: Fn(&Database) -> Result<T, SyncError> + Send + 'static,
        R: Fn(&Change) -> bool + Send + 'static,
    {
        let changes: broadcast::Receiver<Change> = self.changes.subscribe();
        let db = Arc::clone(&self.db);
        Subscription::spawn(
            label,
            changes,
            self.config.subscription_buffer,
            relevant,
            move || {
                let guard = lock(&db)?;
                query(&*guard)
            },
        )
    }
}

fn lock(db: &Mutex<Database>) -> Result<MutexGuard<'_, Database>, SyncError> {
    db.lock()
        .map_err(|e| SyncError::Transient(format!("Lock poisoned: {e}")))
}
