/// Application name
pub const APP_NAME: &str = "roomsync";

/// Text that replaces the body of a soft-deleted message
pub const DELETED_PLACEHOLDER: &str = "This message was deleted";

/// Minimum length of a room, profile or contact name after trimming
pub const MIN_NAME_LEN: usize = 2;

/// Minimum number of digits in a normalized phone number
pub const MIN_PHONE_DIGITS: usize = 7;

/// Separator used when deriving a direct room id from two user ids
pub const DIRECT_ROOM_SEPARATOR: char = '_';

/// Default capacity of the in-process change feed
pub const DEFAULT_CHANGE_FEED_CAPACITY: usize = 256;

/// Default number of snapshots buffered per live subscription
pub const DEFAULT_SUBSCRIPTION_BUFFER: usize = 16;
