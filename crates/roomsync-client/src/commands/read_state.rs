//! Per-member read state: unread reset, mute and pin.
//!
//! Each operation writes a single column of the caller's own member row, so
//! other members' counters and the room preview are never disturbed.

use roomsync_shared::{RoomId, SyncError, UserId};
use roomsync_store::Database;
use tracing::{debug, info};

use super::rooms::room_not_found;
use crate::events::Change;
use crate::state::ChatClient;

#[derive(Debug, Clone, Copy)]
enum MemberFlag {
    Muted,
    Pinned,
}

impl ChatClient {
    /// Reset `uid`'s unread counter in the room to zero. Idempotent.
    pub async fn mark_read(&self, room_id: &RoomId, uid: &UserId) -> Result<(), SyncError> {
        {
            let db = self.lock_db()?;
            let updated = db.reset_unread(room_id, uid)?;
            ensure_member(&db, room_id, updated)?;
        }

        debug!(room = %room_id, user = %uid, "marked read");
        self.emit(Change::Room(room_id.clone()));
        Ok(())
    }

    pub async fn set_muted(&self, room_id: &RoomId, uid: &UserId, on: bool) -> Result<(), SyncError> {
        self.set_member_flag(room_id, uid, MemberFlag::Muted, on)
    }

    pub async fn set_pinned(&self, room_id: &RoomId, uid: &UserId, on: bool) -> Result<(), SyncError> {
        self.set_member_flag(room_id, uid, MemberFlag::Pinned, on)
    }

    fn set_member_flag(
        &self,
        room_id: &RoomId,
        uid: &UserId,
        flag: MemberFlag,
        on: bool,
    ) -> Result<(), SyncError> {
        {
            let db = self.lock_db()?;
            let updated = match flag {
                MemberFlag::Muted => db.set_member_muted(room_id, uid, on)?,
                MemberFlag::Pinned => db.set_member_pinned(room_id, uid, on)?,
            };
            ensure_member(&db, room_id, updated)?;
        }

        info!(room = %room_id, user = %uid, ?flag, on, "member flag updated");
        self.emit(Change::Room(room_id.clone()));
        Ok(())
    }
}

/// Turn a zero-row member update into the right error: the room is gone, or
/// the user is not in it.
fn ensure_member(db: &Database, room_id: &RoomId, updated: bool) -> Result<(), SyncError> {
    if updated {
        return Ok(());
    }
    if db.find_room(room_id)?.is_none() {
        return Err(room_not_found(room_id));
    }
    Err(SyncError::permission("not a member of this room"))
}
