//! CRUD operations for [`Room`] records and their per-member state.
//!
//! Per-member counters and flags are written with single-column `UPDATE`
//! statements (`unread = unread + 1`, `muted = ?`) so concurrent writers
//! touching different members never overwrite each other.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rusqlite::params;
use roomsync_shared::{RoomId, RoomKind, UserId};

use crate::codec::{parse_opt_ts, parse_ts, ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Room;

const ROOM_COLUMNS: &str = "r.id, r.kind, r.name, r.owner, r.last_message, r.last_sender,
     r.last_message_at, r.created_at, r.updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a room together with one member row per member.
    ///
    /// Admin flags are taken from `room.admins`; counters start at zero.
    pub fn insert_room(&self, room: &Room) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO rooms (id, kind, name, owner, last_message, last_sender,
                                last_message_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                room.id.as_str(),
                room.kind.as_str(),
                room.name,
                room.owner.as_str(),
                room.last_message,
                room.last_sender.as_ref().map(UserId::as_str),
                room.last_message_at.as_ref().map(ts),
                ts(&room.created_at),
                ts(&room.updated_at),
            ],
        )
        .map_err(StoreError::from_insert)?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO room_members (room_id, user_id, is_admin, joined_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for member in &room.members {
                stmt.execute(params![
                    room.id.as_str(),
                    member.as_str(),
                    room.admins.contains(member),
                    ts(&room.created_at),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Add members to an existing room. Existing members are left untouched.
    ///
    /// Returns the number of members actually added.
    pub fn add_room_members(
        &self,
        room_id: &RoomId,
        members: &[UserId],
        joined_at: DateTime<Utc>,
    ) -> Result<usize> {
        let tx = self.conn().unchecked_transaction()?;
        let mut added = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO room_members (room_id, user_id, is_admin, joined_at)
                 VALUES (?1, ?2, 0, ?3)",
            )?;
            for member in members {
                added += stmt.execute(params![room_id.as_str(), member.as_str(), ts(&joined_at)])?;
            }
        }
        if added > 0 {
            tx.execute(
                "UPDATE rooms SET updated_at = ?2 WHERE id = ?1",
                params![room_id.as_str(), ts(&joined_at)],
            )?;
        }
        tx.commit()?;
        Ok(added)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single room, including its member maps.
    pub fn get_room(&self, id: &RoomId) -> Result<Room> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.id = ?1");
        let mut room = self
            .conn()
            .query_row(&sql, params![id.as_str()], row_to_room)
            .map_err(StoreError::from_query)?;
        self.load_members(&mut room)?;
        Ok(room)
    }

    /// Fetch a room if it exists.
    pub fn find_room(&self, id: &RoomId) -> Result<Option<Room>> {
        match self.get_room(id) {
            Ok(room) => Ok(Some(room)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Rooms `uid` belongs to, pinned rooms first, then most recently
    /// updated first.
    pub fn list_rooms_for_user(&self, uid: &UserId) -> Result<Vec<Room>> {
        let sql = format!(
            "SELECT {ROOM_COLUMNS}
             FROM rooms r
             JOIN room_members m ON m.room_id = r.id
             WHERE m.user_id = ?1
             ORDER BY m.pinned DESC, r.updated_at DESC, r.id ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![uid.as_str()], row_to_room)?;

        let mut rooms = Vec::new();
        for row in rows {
            let mut room = row?;
            self.load_members(&mut room)?;
            rooms.push(room);
        }
        Ok(rooms)
    }

    fn load_members(&self, room: &mut Room) -> Result<()> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, is_admin, unread, muted, pinned
             FROM room_members
             WHERE room_id = ?1",
        )?;
        let rows = stmt.query_map(params![room.id.as_str()], |row| {
            Ok((
                UserId(row.get(0)?),
                row.get::<_, bool>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;

        let mut members = BTreeSet::new();
        let mut admins = BTreeSet::new();
        let mut unread = BTreeMap::new();
        let mut muted = BTreeMap::new();
        let mut pinned = BTreeMap::new();
        for row in rows {
            let (uid, is_admin, count, is_muted, is_pinned) = row?;
            if is_admin {
                admins.insert(uid.clone());
            }
            if is_muted {
                muted.insert(uid.clone(), true);
            }
            if is_pinned {
                pinned.insert(uid.clone(), true);
            }
            unread.insert(uid.clone(), count);
            members.insert(uid);
        }

        room.members = members;
        room.admins = admins;
        room.unread = unread;
        room.muted = muted;
        room.pinned = pinned;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Record a freshly sent message on the room document.
    ///
    /// Sets the last-message preview and bumps `unread` by one for every
    /// current member except `sender`, whose counter is reset to zero. The
    /// member set is whatever the rows say at commit time.
    ///
    /// Returns `false` (and changes nothing) when the room no longer exists.
    pub fn apply_message_meta(
        &self,
        room_id: &RoomId,
        sender: &UserId,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE rooms
             SET last_message = ?2, last_sender = ?3, last_message_at = ?4, updated_at = ?4
             WHERE id = ?1",
            params![room_id.as_str(), text, sender.as_str(), ts(&at)],
        )?;
        if updated == 0 {
            return Ok(false);
        }

        tx.execute(
            "UPDATE room_members SET unread = unread + 1
             WHERE room_id = ?1 AND user_id <> ?2",
            params![room_id.as_str(), sender.as_str()],
        )?;
        tx.execute(
            "UPDATE room_members SET unread = 0
             WHERE room_id = ?1 AND user_id = ?2",
            params![room_id.as_str(), sender.as_str()],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Reset one member's unread counter. Returns `false` if `uid` is not a
    /// member of the room.
    pub fn reset_unread(&self, room_id: &RoomId, uid: &UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE room_members SET unread = 0 WHERE room_id = ?1 AND user_id = ?2",
            params![room_id.as_str(), uid.as_str()],
        )?;
        Ok(affected > 0)
    }

    pub fn set_member_muted(&self, room_id: &RoomId, uid: &UserId, on: bool) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE room_members SET muted = ?3 WHERE room_id = ?1 AND user_id = ?2",
            params![room_id.as_str(), uid.as_str(), on],
        )?;
        Ok(affected > 0)
    }

    pub fn set_member_pinned(&self, room_id: &RoomId, uid: &UserId, on: bool) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE room_members SET pinned = ?3 WHERE room_id = ?1 AND user_id = ?2",
            params![room_id.as_str(), uid.as_str(), on],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    pub fn remove_room_member(&self, room_id: &RoomId, uid: &UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM room_members WHERE room_id = ?1 AND user_id = ?2",
            params![room_id.as_str(), uid.as_str()],
        )?;
        Ok(affected > 0)
    }

    // ON DELETE CASCADE: member rows + messages go with it
    pub fn delete_room(&self, id: &RoomId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM rooms WHERE id = ?1", params![id.as_str()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Room`] with empty member maps.
fn row_to_room(row: &rusqlite::Row<'_>) -> rusqlite::Result<Room> {
    let id: String = row.get(0)?;
    let kind_str: String = row.get(1)?;
    let name: String = row.get(2)?;
    let owner: String = row.get(3)?;
    let last_message: Option<String> = row.get(4)?;
    let last_sender: Option<String> = row.get(5)?;
    let last_message_at: Option<String> = row.get(6)?;
    let created_str: String = row.get(7)?;
    let updated_str: String = row.get(8)?;

    let kind = RoomKind::parse(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown room kind {kind_str:?}").into(),
        )
    })?;

    Ok(Room {
        id: RoomId(id),
        kind,
        name,
        owner: UserId(owner),
        members: BTreeSet::new(),
        admins: BTreeSet::new(),
        last_message,
        last_sender: last_sender.map(UserId),
        last_message_at: parse_opt_ts(6, last_message_at)?,
        unread: BTreeMap::new(),
        muted: BTreeMap::new(),
        pinned: BTreeMap::new(),
        created_at: parse_ts(7, &created_str)?,
        updated_at: parse_ts(8, &updated_str)?,
    })
}
