//! CRUD operations for [`Profile`] records (the global user directory).

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use roomsync_shared::{phone, UserId};

use crate::codec::{parse_ts, ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Profile;

const PROFILE_COLUMNS: &str = "uid, name, phone, email, avatar_url, created_at, updated_at";

impl Database {
    pub fn insert_user(&self, profile: &Profile) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (uid, name, phone, phone_normalized, email, avatar_url,
                                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    profile.uid.as_str(),
                    profile.name,
                    profile.phone,
                    profile.phone.as_deref().map(phone::normalize),
                    profile.email,
                    profile.avatar_url,
                    ts(&profile.created_at),
                    ts(&profile.updated_at),
                ],
            )
            .map_err(StoreError::from_insert)?;
        Ok(())
    }

    pub fn get_user(&self, uid: &UserId) -> Result<Profile> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM users WHERE uid = ?1");
        self.conn()
            .query_row(&sql, params![uid.as_str()], row_to_profile)
            .map_err(StoreError::from_query)
    }

    /// All registered users, by name.
    pub fn list_users(&self) -> Result<Vec<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM users ORDER BY name ASC, uid ASC");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], row_to_profile)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Registered user whose phone normalizes to `normalized`, if any.
    pub fn find_user_by_phone(&self, normalized: &str) -> Result<Option<UserId>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT uid FROM users WHERE phone_normalized = ?1 ORDER BY created_at ASC LIMIT 1",
                params![normalized],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(UserId))
    }

    /// Overwrite the mutable profile fields. Returns `false` if the user does
    /// not exist.
    pub fn update_user(&self, profile: &Profile) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users
             SET name = ?2, phone = ?3, phone_normalized = ?4, email = ?5, avatar_url = ?6,
                 updated_at = ?7
             WHERE uid = ?1",
            params![
                profile.uid.as_str(),
                profile.name,
                profile.phone,
                profile.phone.as_deref().map(phone::normalize),
                profile.email,
                profile.avatar_url,
                ts(&profile.updated_at),
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn set_user_avatar(&self, uid: &UserId, url: &str, at: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET avatar_url = ?2, updated_at = ?3 WHERE uid = ?1",
            params![uid.as_str(), url, ts(&at)],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let uid: String = row.get(0)?;
    let created_str: String = row.get(5)?;
    let updated_str: String = row.get(6)?;

    Ok(Profile {
        uid: UserId(uid),
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        avatar_url: row.get(4)?,
        created_at: parse_ts(5, &created_str)?,
        updated_at: parse_ts(6, &updated_str)?,
    })
}
