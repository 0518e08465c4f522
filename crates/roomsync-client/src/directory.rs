//! Room directory ordering and filtering, plus the user-directory cache.

use std::cmp::Reverse;
use std::collections::HashMap;

use roomsync_shared::{RoomKind, SyncError, UserId};
use roomsync_store::{Profile, Room};

use crate::subscription::SnapshotResult;

/// Order rooms for `viewer`: pinned first, then most recently updated, then
/// by id so equal timestamps have a stable order.
pub fn sort_rooms(rooms: &mut [Room], viewer: &UserId) {
    rooms.sort_by(|a, b| {
        (Reverse(a.is_pinned(viewer)), Reverse(a.updated_at), &a.id)
            .cmp(&(Reverse(b.is_pinned(viewer)), Reverse(b.updated_at), &b.id))
    });
}

/// Name shown for `room` to `viewer`.
///
/// Direct rooms are named after the other participant, falling back to the
/// raw user id when the profile is not cached.
pub fn display_name(room: &Room, viewer: &UserId, users: &UserDirectory) -> String {
    match room.kind {
        RoomKind::Direct => match room.peer_of(viewer) {
            Some(peer) => users
                .name_of(peer)
                .map(str::to_string)
                .unwrap_or_else(|| peer.to_string()),
            None => room.name.clone(),
        },
        RoomKind::Group | RoomKind::Channel => room.name.clone(),
    }
}

/// Case-insensitive substring match on display name and last-message
/// preview. A blank query keeps every room.
pub fn filter_rooms<'a>(
    rooms: &'a [Room],
    viewer: &UserId,
    query: &str,
    users: &UserDirectory,
) -> Vec<&'a Room> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rooms.iter().collect();
    }
    rooms
        .iter()
        .filter(|room| {
            display_name(room, viewer, users).to_lowercase().contains(&needle)
                || room
                    .last_message
                    .as_deref()
                    .is_some_and(|m| m.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Process-scoped read-through cache of the global user directory.
///
/// Fed by a `watch_users` subscription and rebuilt wholesale on every
/// snapshot; never mutated piecemeal.
#[derive(Debug, Default, Clone)]
pub struct UserDirectory {
    by_id: HashMap<UserId, Profile>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(&mut self, profiles: Vec<Profile>) {
        self.by_id = profiles.into_iter().map(|p| (p.uid.clone(), p)).collect();
    }

    pub fn name_of(&self, uid: &UserId) -> Option<&str> {
        self.by_id.get(uid).map(|p| p.name.as_str())
    }

    /// Drop every cached profile, e.g. when the view that owns the cache
    /// goes away.
    pub fn clear(&mut self) {
        self.by_id.clear();
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// What a room list view should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryState {
    /// No snapshot yet.
    Loading,
    Ready { version: u64, rooms: Vec<Room> },
    /// The subscription failed; the last list is not shown as if current.
    Failed(SyncError),
    /// The subscription ended without error (cancelled or shut down).
    Closed,
}

/// A viewer's room list driven by a directory subscription.
#[derive(Debug, Clone)]
pub struct RoomDirectory {
    viewer: UserId,
    state: DirectoryState,
}

impl RoomDirectory {
    pub fn new(viewer: UserId) -> Self {
        Self {
            viewer,
            state: DirectoryState::Loading,
        }
    }

    /// Fold the next item pulled from the subscription into the view state.
    pub fn apply(&mut self, item: Option<SnapshotResult<Vec<Room>>>) {
        self.state = match item {
            Some(Ok(snapshot)) => {
                let mut rooms = snapshot.items;
                sort_rooms(&mut rooms, &self.viewer);
                DirectoryState::Ready {
                    version: snapshot.version,
                    rooms,
                }
            }
            Some(Err(e)) => DirectoryState::Failed(e),
            None => match std::mem::replace(&mut self.state, DirectoryState::Closed) {
                failed @ DirectoryState::Failed(_) => failed,
                _ => DirectoryState::Closed,
            },
        };
    }

    pub fn state(&self) -> &DirectoryState {
        &self.state
    }

    /// Rooms matching `query`, or the error that stopped the feed.
    pub fn visible<'a>(
        &'a self,
        query: &str,
        users: &UserDirectory,
    ) -> Result<Vec<&'a Room>, &'a SyncError> {
        match &self.state {
            DirectoryState::Ready { rooms, .. } => Ok(filter_rooms(rooms, &self.viewer, query, users)),
            DirectoryState::Failed(e) => Err(e),
            DirectoryState::Loading | DirectoryState::Closed => Ok(Vec::new()),
        }
    }

    /// Total unread messages across the viewer's unmuted rooms.
    pub fn total_unread(&self) -> u32 {
        match &self.state {
            DirectoryState::Ready { rooms, .. } => rooms
                .iter()
                .filter(|r| !r.is_muted(&self.viewer))
                .map(|r| r.unread_for(&self.viewer))
                .sum(),
            _ => 0,
        }
    }
}
