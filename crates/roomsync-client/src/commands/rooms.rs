//! Room lifecycle and the live room directory.

use std::collections::BTreeSet;

use roomsync_store::now;
use roomsync_shared::constants::MIN_NAME_LEN;
use roomsync_shared::{RoomId, RoomKind, SyncError, UserId, ValidationError};
use roomsync_store::Room;
use tracing::{info, warn};

use crate::directory::sort_rooms;
use crate::events::Change;
use crate::state::ChatClient;
use crate::subscription::Subscription;

pub(crate) fn room_not_found(id: &RoomId) -> SyncError {
    SyncError::not_found(format!("room {id}"))
}

impl ChatClient {
    /// Create a room owned by `creator`.
    ///
    /// Members are deduplicated and always include the creator, who becomes
    /// owner and sole admin. A direct room takes exactly one other member and
    /// gets the deterministic pair id; creating it again returns the
    /// existing room.
    pub async fn create_room(
        &self,
        creator: &UserId,
        kind: RoomKind,
        name: &str,
        members: &[UserId],
    ) -> Result<RoomId, SyncError> {
        let mut member_set: BTreeSet<UserId> = members.iter().cloned().collect();
        member_set.insert(creator.clone());

        let (id, name) = match kind {
            RoomKind::Direct => {
                let others: Vec<_> = member_set.iter().filter(|m| *m != creator).collect();
                let [peer] = others.as_slice() else {
                    return Err(ValidationError::InvalidMembers(format!(
                        "direct room needs exactly one other member, got {}",
                        others.len()
                    ))
                    .into());
                };
                (RoomId::direct(creator, peer), name.trim().to_string())
            }
            RoomKind::Group | RoomKind::Channel => {
                let name = name.trim();
                if name.chars().count() < MIN_NAME_LEN {
                    return Err(ValidationError::NameTooShort { min: MIN_NAME_LEN }.into());
                }
                (RoomId::new(), name.to_string())
            }
        };

        let at = now();
        let room = Room {
            id: id.clone(),
            kind,
            name,
            owner: creator.clone(),
            members: member_set,
            admins: [creator.clone()].into_iter().collect(),
            last_message: None,
            last_sender: None,
            last_message_at: None,
            unread: Default::default(),
            muted: Default::default(),
            pinned: Default::default(),
            created_at: at,
            updated_at: at,
        };

        {
            let db = self.lock_db()?;
            if kind == RoomKind::Direct && db.find_room(&id)?.is_some() {
                info!(room = %id, "direct room already exists");
                return Ok(id);
            }
            db.insert_room(&room)?;
        }

        info!(room = %id, %kind, members = room.members.len(), "room created");
        self.emit(Change::Room(id.clone()));
        Ok(id)
    }

    pub async fn get_room(&self, room_id: &RoomId) -> Result<Room, SyncError> {
        let db = self.lock_db()?;
        db.find_room(room_id)?.ok_or_else(|| room_not_found(room_id))
    }

    /// Add members to a room. Only admins may do this; members already in
    /// the room are ignored. Returns how many were added.
    ///
    /// A direct room always holds exactly its two participants and rejects
    /// new members.
    pub async fn add_members(
        &self,
        room_id: &RoomId,
        requester: &UserId,
        members: &[UserId],
    ) -> Result<usize, SyncError> {
        let added = {
            let db = self.lock_db()?;
            let room = db.find_room(room_id)?.ok_or_else(|| room_not_found(room_id))?;
            if room.kind == RoomKind::Direct {
                return Err(ValidationError::InvalidMembers(
                    "a direct room cannot take more members".into(),
                )
                .into());
            }
            if !room.is_admin(requester) {
                return Err(SyncError::permission("only admins can add members"));
            }
            db.add_room_members(room_id, members, now())?
        };

        info!(room = %room_id, added, "members added");
        if added > 0 {
            self.emit(Change::Room(room_id.clone()));
        }
        Ok(added)
    }

    /// Remove `member` from a room.
    ///
    /// Any member may remove themself; admins may remove others. The owner
    /// can never be removed, and nobody leaves a direct room. Messages the
    /// member sent stay in the feed.
    pub async fn remove_member(
        &self,
        room_id: &RoomId,
        requester: &UserId,
        member: &UserId,
    ) -> Result<bool, SyncError> {
        let removed = {
            let db = self.lock_db()?;
            let room = db.find_room(room_id)?.ok_or_else(|| room_not_found(room_id))?;
            if room.kind == RoomKind::Direct {
                return Err(ValidationError::InvalidMembers(
                    "members cannot leave a direct room".into(),
                )
                .into());
            }
            if member == &room.owner {
                return Err(SyncError::permission("the owner cannot be removed"));
            }
            if requester != member && !room.is_admin(requester) {
                return Err(SyncError::permission("only admins can remove other members"));
            }
            // A removed admin loses the flag along with the member row.
            db.remove_room_member(room_id, member)?
        };

        if removed {
            info!(room = %room_id, member = %member, "member removed");
            self.emit(Change::Room(room_id.clone()));
        } else {
            warn!(room = %room_id, member = %member, "remove_member: not a member");
        }
        Ok(removed)
    }

    /// Delete a room and everything in it. Owner only; deleting a room that
    /// is already gone is a logged no-op.
    pub async fn delete_room(&self, room_id: &RoomId, requester: &UserId) -> Result<bool, SyncError> {
        let deleted = {
            let db = self.lock_db()?;
            let Some(room) = db.find_room(room_id)? else {
                warn!(room = %room_id, "delete_room: room not found");
                return Ok(false);
            };
            if &room.owner != requester {
                return Err(SyncError::permission("only the owner can delete a room"));
            }
            db.delete_room(room_id)?
        };

        info!(room = %room_id, "room deleted");
        self.emit(Change::Room(room_id.clone()));
        self.emit(Change::Messages(room_id.clone()));
        Ok(deleted)
    }

    /// Live, ordered list of the rooms `uid` belongs to.
    ///
    /// Must be called from within a Tokio runtime; the feed is driven by a
    /// spawned task.
    pub fn get_rooms_for_user(&self, uid: &UserId) -> Subscription<Vec<Room>> {
        let viewer = uid.clone();
        self.subscribe(
            format!("rooms:{uid}"),
            |change| matches!(change, Change::Room(_)),
            move |db| {
                let mut rooms = db.list_rooms_for_user(&viewer)?;
                sort_rooms(&mut rooms, &viewer);
                Ok(rooms)
            },
        )
    }
}
