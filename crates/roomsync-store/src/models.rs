//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a UI layer. Decoding is lenient: optional fields missing from
//! a document default-fill, unknown fields are ignored.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use roomsync_shared::{ContactId, MessageId, RoomId, RoomKind, UserId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A registered user as seen through the global user directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub uid: UserId,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a user may change on their own profile. `None` leaves the stored
/// value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationSettings {
    pub enabled: bool,
    pub sound: bool,
    pub show_preview: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
            show_preview: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivacySettings {
    pub show_last_seen: bool,
    pub read_receipts: bool,
    pub phone_visible: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            show_last_seen: true,
            read_receipts: true,
            phone_visible: false,
        }
    }
}

/// Per-user preference document, created with defaults on first login.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub notifications: NotificationSettings,
    pub privacy: PrivacySettings,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A conversation container with its aggregated, per-member metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    pub name: String,
    /// Immutable after creation.
    pub owner: UserId,
    pub members: BTreeSet<UserId>,
    #[serde(default)]
    pub admins: BTreeSet<UserId>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_sender: Option<UserId>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    /// Unseen message count per member. Every member has an entry.
    #[serde(default)]
    pub unread: BTreeMap<UserId, u32>,
    /// Only members with the flag set appear; absence means `false`.
    #[serde(default)]
    pub muted: BTreeMap<UserId, bool>,
    /// Only members with the flag set appear; absence means `false`.
    #[serde(default)]
    pub pinned: BTreeMap<UserId, bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn is_member(&self, uid: &UserId) -> bool {
        self.members.contains(uid)
    }

    pub fn is_admin(&self, uid: &UserId) -> bool {
        self.admins.contains(uid)
    }

    pub fn unread_for(&self, uid: &UserId) -> u32 {
        self.unread.get(uid).copied().unwrap_or(0)
    }

    pub fn is_muted(&self, uid: &UserId) -> bool {
        self.muted.get(uid).copied().unwrap_or(false)
    }

    pub fn is_pinned(&self, uid: &UserId) -> bool {
        self.pinned.get(uid).copied().unwrap_or(false)
    }

    /// Whether `uid` may append to this room's feed.
    ///
    /// Channels only accept posts from admins; other kinds accept any member.
    pub fn can_post(&self, uid: &UserId) -> bool {
        match self.kind {
            RoomKind::Channel => self.is_admin(uid),
            RoomKind::Direct | RoomKind::Group => self.is_member(uid),
        }
    }

    /// For direct rooms, the member that is not `viewer`.
    pub fn peer_of(&self, viewer: &UserId) -> Option<&UserId> {
        if self.kind != RoomKind::Direct {
            return None;
        }
        self.members.iter().find(|m| *m != viewer)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub text: String,
    /// Monotonic within a room.
    pub created_at: DateTime<Utc>,
    /// Store-assigned insertion sequence; breaks `created_at` ties.
    pub seq: i64,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// An entry in a user's private address book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub owner_id: UserId,
    pub name: String,
    /// Phone as the owner typed it.
    pub phone: String,
    pub phone_normalized: String,
    /// Registered account whose phone matches, if any.
    #[serde(default)]
    pub linked_uid: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Blob (object storage metadata)
// ---------------------------------------------------------------------------

/// Metadata for a content-addressed file in the blob directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// BLAKE3 content hash (hex string).
    pub blake3_hash: String,
    pub owner_id: UserId,
    pub file_size: i64,
    /// Absolute path on disk where the file is stored.
    pub local_path: String,
    pub created_at: DateTime<Utc>,
}

impl Blob {
    /// Stable retrieval URL for this blob.
    pub fn url(&self) -> String {
        format!("file://{}", self.local_path)
    }
}
