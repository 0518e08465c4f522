pub mod constants;
pub mod error;
pub mod phone;
pub mod types;

pub use error::{SyncError, ValidationError};
pub use types::{ContactId, MessageId, RoomId, RoomKind, UserId};
