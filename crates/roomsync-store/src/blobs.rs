//! Content-addressed blob storage for avatars.
//!
//! Files are written to a caller-chosen directory under their BLAKE3 hash,
//! so uploading identical bytes twice yields the same URL.

use std::path::Path;

use rusqlite::{params, OptionalExtension};
use roomsync_shared::UserId;

use crate::codec::{now, parse_ts, ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Blob;

impl Database {
    /// Write `bytes` into `dir` and record its metadata.
    pub fn put_blob(&self, dir: &Path, owner: &UserId, bytes: &[u8]) -> Result<Blob> {
        let hash = blake3::hash(bytes).to_hex().to_string();

        if let Some(existing) = self.get_blob(&hash)? {
            return Ok(existing);
        }

        std::fs::create_dir_all(dir)?;
        let path = dir.join(&hash);
        std::fs::write(&path, bytes)?;
        let local_path = std::fs::canonicalize(&path)?.to_string_lossy().into_owned();

        let blob = Blob {
            blake3_hash: hash,
            owner_id: owner.clone(),
            file_size: bytes.len() as i64,
            local_path,
            created_at: now(),
        };

        let inserted = self.conn().execute(
            "INSERT INTO blobs (blake3_hash, owner_id, file_size, local_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                blob.blake3_hash,
                blob.owner_id.as_str(),
                blob.file_size,
                blob.local_path,
                ts(&blob.created_at),
            ],
        );
        if let Err(e) = inserted {
            // No row points at the file, so nothing would ever clean it up.
            if let Err(rm) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %rm, "failed to remove orphan blob");
            }
            return Err(StoreError::from_insert(e));
        }

        tracing::debug!(hash = %blob.blake3_hash, size = blob.file_size, "stored blob");
        Ok(blob)
    }

    pub fn get_blob(&self, hash: &str) -> Result<Option<Blob>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT blake3_hash, owner_id, file_size, local_path, created_at
                 FROM blobs WHERE blake3_hash = ?1",
                params![hash],
                row_to_blob,
            )
            .optional()?)
    }
}

fn row_to_blob(row: &rusqlite::Row<'_>) -> rusqlite::Result<Blob> {
    let owner_id: String = row.get(1)?;
    let created_str: String = row.get(4)?;

    Ok(Blob {
        blake3_hash: row.get(0)?,
        owner_id: UserId(owner_id),
        file_size: row.get(2)?,
        local_path: row.get(3)?,
        created_at: parse_ts(4, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_share_one_blob() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let owner = UserId::from("a");

        let first = db.put_blob(dir.path(), &owner, b"avatar-bytes").unwrap();
        let second = db.put_blob(dir.path(), &owner, b"avatar-bytes").unwrap();

        assert_eq!(first.url(), second.url());
        assert!(first.url().starts_with("file://"));
        assert_eq!(std::fs::read(&first.local_path).unwrap(), b"avatar-bytes");
    }

    #[test]
    fn failed_insert_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_blobs BEFORE INSERT ON blobs
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        assert!(db.put_blob(dir.path(), &UserId::from("a"), b"avatar-bytes").is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
