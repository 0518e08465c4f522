//! Message feed: sending, soft deletion and the live per-room feed.

use roomsync_store::now;
use roomsync_shared::constants::DELETED_PLACEHOLDER;
use roomsync_shared::{MessageId, RoomId, SyncError, UserId, ValidationError};
use roomsync_store::Message;
use tracing::{error, info, warn};

use super::rooms::room_not_found;
use crate::events::Change;
use crate::state::ChatClient;
use crate::subscription::Subscription;

impl ChatClient {
    /// Append a message and update the room's preview and unread counters.
    ///
    /// Text is trimmed first; blank text is rejected without touching the
    /// store. Channels only accept messages from admins.
    ///
    /// The append and the meta update are separate commits. If the room
    /// disappears in between, or the meta update fails, the message stays
    /// and the room meta is left as it was.
    pub async fn send_message(
        &self,
        room_id: &RoomId,
        sender: &UserId,
        text: &str,
    ) -> Result<Message, SyncError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let (message, meta) = {
            let db = self.lock_db()?;
            let room = db.find_room(room_id)?.ok_or_else(|| room_not_found(room_id))?;
            if !room.is_member(sender) {
                return Err(SyncError::permission("sender is not a member of this room"));
            }
            if !room.can_post(sender) {
                return Err(SyncError::permission("only admins can post in a channel"));
            }

            let message = db.append_message(room_id, sender, text, now())?;
            let meta = db.apply_message_meta(room_id, sender, text, message.created_at);
            (message, meta)
        };

        info!(room = %room_id, msg_id = %message.id, sender = %sender, "message sent");
        self.emit(Change::Messages(room_id.clone()));

        match meta {
            Ok(true) => self.emit(Change::Room(room_id.clone())),
            Ok(false) => warn!(room = %room_id, msg_id = %message.id, "room vanished before meta update"),
            Err(e) => error!(room = %room_id, msg_id = %message.id, error = %e, "room meta update failed"),
        }

        Ok(message)
    }

    /// Replace a message's text with the deleted placeholder.
    ///
    /// Only the original sender may do this. Deleting an already deleted
    /// message returns it unchanged. Room meta and unread counters are not
    /// touched.
    pub async fn soft_delete_message(
        &self,
        room_id: &RoomId,
        message_id: MessageId,
        requester: &UserId,
    ) -> Result<Message, SyncError> {
        let (message, changed) = {
            let db = self.lock_db()?;
            let Some(message) = db.find_message(room_id, message_id)? else {
                warn!(room = %room_id, msg_id = %message_id, "soft delete: message not found");
                return Err(SyncError::not_found(format!("message {message_id}")));
            };
            if &message.sender_id != requester {
                return Err(SyncError::permission("only the sender can delete a message"));
            }
            if message.is_deleted {
                return Ok(message);
            }

            let changed =
                db.soft_delete_message(room_id, message_id, DELETED_PLACEHOLDER, now())?;
            (db.get_message(room_id, message_id)?, changed)
        };

        if changed {
            info!(room = %room_id, msg_id = %message_id, "message deleted");
            self.emit(Change::Messages(room_id.clone()));
        }
        Ok(message)
    }

    /// Live feed of a room's messages, oldest first, deleted ones included.
    ///
    /// Ends with a `NotFound` error if the room does not exist or is deleted
    /// while subscribed.
    ///
    /// Must be called from within a Tokio runtime; the feed is driven by a
    /// spawned task.
    pub fn get_messages(&self, room_id: &RoomId) -> Subscription<Vec<Message>> {
        let watched = room_id.clone();
        let room = room_id.clone();
        self.subscribe(
            format!("messages:{room_id}"),
            move |change| matches!(change, Change::Messages(id) if *id == watched),
            move |db| {
                if db.find_room(&room)?.is_none() {
                    return Err(room_not_found(&room));
                }
                Ok(db.list_messages(&room)?)
            },
        )
    }
}
