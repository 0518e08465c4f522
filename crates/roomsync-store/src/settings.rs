//! Per-user [`Settings`] documents, stored as JSON.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use roomsync_shared::UserId;

use crate::codec::ts;
use crate::database::Database;
use crate::error::Result;
use crate::models::Settings;

impl Database {
    pub fn get_settings(&self, uid: &UserId) -> Result<Option<Settings>> {
        let json: Option<String> = self
            .conn()
            .query_row(
                "SELECT json FROM settings WHERE uid = ?1",
                params![uid.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }

    pub fn put_settings(&self, uid: &UserId, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.conn().execute(
            "INSERT INTO settings (uid, json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(uid) DO UPDATE SET json = excluded.json, updated_at = excluded.updated_at",
            params![uid.as_str(), json, ts(&Utc::now())],
        )?;
        Ok(())
    }

    /// Return the stored settings, creating the default document first if
    /// none exists. Returns `(settings, created)`.
    pub fn ensure_settings(&self, uid: &UserId) -> Result<(Settings, bool)> {
        let defaults = Settings::default();
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO settings (uid, json, updated_at) VALUES (?1, ?2, ?3)",
            params![uid.as_str(), serde_json::to_string(&defaults)?, ts(&Utc::now())],
        )?;
        if inserted > 0 {
            return Ok((defaults, true));
        }
        Ok((self.get_settings(uid)?.unwrap_or_default(), false))
    }
}
