//! In-process change feed.
//!
//! Every committed mutation publishes a [`Change`] naming the document set it
//! touched. Live subscriptions listen on the feed and re-query the store when
//! a relevant change arrives; the event itself carries no data.

use roomsync_shared::{RoomId, UserId};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A room document or its member rows changed (including creation and
    /// deletion).
    Room(RoomId),
    /// A room's message feed changed.
    Messages(RoomId),
    /// An owner's contact list changed.
    Contacts(UserId),
    /// A profile in the global user directory changed.
    Users,
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Change>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.tx.subscribe()
    }

    pub fn emit(&self, change: Change) {
        tracing::trace!(?change, "emitting change");
        // No receivers simply means nobody is watching.
        let _ = self.tx.send(change);
    }
}
