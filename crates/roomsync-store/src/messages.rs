use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use roomsync_shared::{MessageId, RoomId, UserId};

use crate::codec::{parse_opt_ts, parse_ts, parse_uuid, truncate, ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Message;

const MESSAGE_COLUMNS: &str =
    "seq, id, room_id, sender_id, text, created_at, is_deleted, edited_at";

impl Database {
    /// Append a message to a room's feed.
    ///
    /// `created_at` is clamped to the newest timestamp already in the room so
    /// the feed stays monotonic even if the local clock steps backwards;
    /// `seq` breaks ties between equal timestamps. `now` is cut to stored
    /// precision, so the returned message equals the one read back.
    pub fn append_message(
        &self,
        room_id: &RoomId,
        sender: &UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Message> {
        let now = truncate(now);
        let tx = self.conn().unchecked_transaction()?;

        let newest: Option<String> = tx.query_row(
            "SELECT MAX(created_at) FROM messages WHERE room_id = ?1",
            params![room_id.as_str()],
            |row| row.get(0),
        )?;
        let created_at = match parse_opt_ts(0, newest)? {
            Some(newest) if newest > now => newest,
            _ => now,
        };

        let id = MessageId::new();
        tx.execute(
            "INSERT INTO messages (id, room_id, sender_id, text, created_at, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                id.0.to_string(),
                room_id.as_str(),
                sender.as_str(),
                text,
                ts(&created_at),
            ],
        )
        .map_err(StoreError::from_insert)?;
        let seq = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Message {
            id,
            room_id: room_id.clone(),
            sender_id: sender.clone(),
            text: text.to_string(),
            created_at,
            seq,
            is_deleted: false,
            edited_at: None,
        })
    }

    /// All messages of a room, oldest first, soft-deleted ones included.
    pub fn list_messages(&self, room_id: &RoomId) -> Result<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages
             WHERE room_id = ?1
             ORDER BY created_at ASC, seq ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![room_id.as_str()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn get_message(&self, room_id: &RoomId, id: MessageId) -> Result<Message> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1 AND room_id = ?2");
        self.conn()
            .query_row(&sql, params![id.0.to_string(), room_id.as_str()], row_to_message)
            .map_err(StoreError::from_query)
    }

    pub fn find_message(&self, room_id: &RoomId, id: MessageId) -> Result<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1 AND room_id = ?2");
        Ok(self
            .conn()
            .query_row(&sql, params![id.0.to_string(), room_id.as_str()], row_to_message)
            .optional()?)
    }

    /// Replace the text with `placeholder` and flag the message as deleted.
    ///
    /// Returns `false` if the message does not exist or is already deleted;
    /// deleted rows are never written again.
    pub fn soft_delete_message(
        &self,
        room_id: &RoomId,
        id: MessageId,
        placeholder: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE messages SET text = ?3, is_deleted = 1, edited_at = ?4
             WHERE id = ?1 AND room_id = ?2 AND is_deleted = 0",
            params![id.0.to_string(), room_id.as_str(), placeholder, ts(&at)],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let seq: i64 = row.get(0)?;
    let id_str: String = row.get(1)?;
    let room_id: String = row.get(2)?;
    let sender_id: String = row.get(3)?;
    let text: String = row.get(4)?;
    let created_str: String = row.get(5)?;
    let is_deleted: bool = row.get(6)?;
    let edited_at: Option<String> = row.get(7)?;

    Ok(Message {
        id: MessageId(parse_uuid(1, &id_str)?),
        room_id: RoomId(room_id),
        sender_id: UserId(sender_id),
        text,
        created_at: parse_ts(5, &created_str)?,
        seq,
        is_deleted,
        edited_at: parse_opt_ts(7, edited_at)?,
    })
}
