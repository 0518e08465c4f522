//! User profiles, the global user directory feed and avatars.

use roomsync_store::now;
use roomsync_shared::constants::MIN_NAME_LEN;
use roomsync_shared::{SyncError, UserId, ValidationError};
use roomsync_store::{Profile, ProfilePatch, StoreError};
use tracing::info;

use crate::events::Change;
use crate::state::ChatClient;
use crate::subscription::Subscription;

fn user_not_found(uid: &UserId) -> SyncError {
    SyncError::not_found(format!("user {uid}"))
}

fn checked_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(ValidationError::NameTooShort { min: MIN_NAME_LEN });
    }
    Ok(name.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ChatClient {
    /// Create the profile for a freshly registered user, along with their
    /// default settings document.
    pub async fn register_user(
        &self,
        uid: &UserId,
        name: &str,
        phone: Option<String>,
        email: Option<String>,
    ) -> Result<Profile, SyncError> {
        let at = now();
        let profile = Profile {
            uid: uid.clone(),
            name: checked_name(name)?,
            phone: non_blank(phone),
            email: non_blank(email),
            avatar_url: None,
            created_at: at,
            updated_at: at,
        };

        {
            let db = self.lock_db()?;
            match db.insert_user(&profile) {
                Ok(()) => {}
                Err(StoreError::Constraint(_)) => {
                    return Err(ValidationError::AlreadyExists(format!("user {uid}")).into());
                }
                Err(e) => return Err(e.into()),
            }
            db.ensure_settings(uid)?;
        }

        info!(user = %uid, "user registered");
        self.emit(Change::Users);
        Ok(profile)
    }

    pub async fn get_profile(&self, uid: &UserId) -> Result<Profile, SyncError> {
        match self.lock_db()?.get_user(uid) {
            Ok(profile) => Ok(profile),
            Err(StoreError::NotFound) => Err(user_not_found(uid)),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `patch` to `uid`'s profile. Only the user themself may do this.
    pub async fn update_profile(
        &self,
        requester: &UserId,
        uid: &UserId,
        patch: ProfilePatch,
    ) -> Result<Profile, SyncError> {
        if requester != uid {
            return Err(SyncError::permission("profiles can only be edited by their owner"));
        }

        let profile = {
            let db = self.lock_db()?;
            let mut profile = match db.get_user(uid) {
                Ok(profile) => profile,
                Err(StoreError::NotFound) => return Err(user_not_found(uid)),
                Err(e) => return Err(e.into()),
            };

            if let Some(name) = patch.name {
                profile.name = checked_name(&name)?;
            }
            if patch.phone.is_some() {
                profile.phone = non_blank(patch.phone);
            }
            if patch.email.is_some() {
                profile.email = non_blank(patch.email);
            }
            profile.updated_at = now();

            if !db.update_user(&profile)? {
                return Err(user_not_found(uid));
            }
            profile
        };

        info!(user = %uid, "profile updated");
        self.emit(Change::Users);
        Ok(profile)
    }

    /// Store `bytes` as `uid`'s avatar and return its retrieval URL.
    pub async fn upload_avatar(&self, uid: &UserId, bytes: &[u8]) -> Result<String, SyncError> {
        let url = {
            let db = self.lock_db()?;
            let blob = db.put_blob(&self.config().blob_dir, uid, bytes)?;
            let url = blob.url();
            if !db.set_user_avatar(uid, &url, now())? {
                return Err(user_not_found(uid));
            }
            url
        };

        info!(user = %uid, size = bytes.len(), "avatar updated");
        self.emit(Change::Users);
        Ok(url)
    }

    /// Live list of every registered profile, for feeding a
    /// [`crate::directory::UserDirectory`].
    ///
    /// Must be called from within a Tokio runtime; the feed is driven by a
    /// spawned task.
    pub fn watch_users(&self) -> Subscription<Vec<Profile>> {
        self.subscribe(
            "users".to_string(),
            |change| matches!(change, Change::Users),
            |db| Ok(db.list_users()?),
        )
    }
}
