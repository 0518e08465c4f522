use thiserror::Error;

/// Errors surfaced by every chat operation.
///
/// Validation errors are raised before the store is touched. Permission and
/// not-found errors are produced at the operation boundary and never leave a
/// partial mutation behind. Only [`SyncError::Transient`] is worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Transient(String),
}

impl SyncError {
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether a user-initiated re-submission may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message text is empty")]
    EmptyMessage,

    #[error("Name must be at least {min} characters")]
    NameTooShort { min: usize },

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("A contact with phone {0} already exists")]
    DuplicatePhone(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid member list: {0}")]
    InvalidMembers(String),
}
