use roomsync_shared::{SyncError, UserId};
use roomsync_store::Settings;
use tracing::info;

use crate::state::ChatClient;

impl ChatClient {
    /// Return `uid`'s settings, creating the default document on first use.
    pub async fn ensure_settings(&self, uid: &UserId) -> Result<Settings, SyncError> {
        let (settings, created) = self.lock_db()?.ensure_settings(uid)?;
        if created {
            info!(user = %uid, "created default settings");
        }
        Ok(settings)
    }

    pub async fn update_settings(&self, uid: &UserId, settings: &Settings) -> Result<(), SyncError> {
        self.lock_db()?.put_settings(uid, settings)?;
        info!(user = %uid, theme = ?settings.theme, "settings updated");
        Ok(())
    }
}
