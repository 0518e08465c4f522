//! CRUD operations for [`Contact`] records.

use rusqlite::{params, OptionalExtension};
use roomsync_shared::{ContactId, UserId};

use crate::codec::{parse_ts, parse_uuid, ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Contact;

const CONTACT_COLUMNS: &str =
    "id, owner_id, name, phone, phone_normalized, linked_uid, created_at";

impl Database {
    /// Insert a contact. A second contact with the same normalized phone for
    /// the same owner fails with [`StoreError::Constraint`].
    pub fn insert_contact(&self, contact: &Contact) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO contacts (id, owner_id, name, phone, phone_normalized, linked_uid,
                                       created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    contact.id.0.to_string(),
                    contact.owner_id.as_str(),
                    contact.name,
                    contact.phone,
                    contact.phone_normalized,
                    contact.linked_uid.as_ref().map(UserId::as_str),
                    ts(&contact.created_at),
                ],
            )
            .map_err(StoreError::from_insert)?;
        Ok(())
    }

    /// An owner's contacts, newest first.
    pub fn list_contacts(&self, owner: &UserId) -> Result<Vec<Contact>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS}
             FROM contacts
             WHERE owner_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![owner.as_str()], row_to_contact)?;

        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row?);
        }
        Ok(contacts)
    }

    pub fn find_contact_by_phone(&self, owner: &UserId, normalized: &str) -> Result<Option<Contact>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE owner_id = ?1 AND phone_normalized = ?2"
        );
        Ok(self
            .conn()
            .query_row(&sql, params![owner.as_str(), normalized], row_to_contact)
            .optional()?)
    }

    /// Delete one of `owner`'s contacts. Returns `true` if a row was deleted.
    pub fn delete_contact(&self, owner: &UserId, id: ContactId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM contacts WHERE id = ?1 AND owner_id = ?2",
            params![id.0.to_string(), owner.as_str()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    let id_str: String = row.get(0)?;
    let owner_id: String = row.get(1)?;
    let linked_uid: Option<String> = row.get(5)?;
    let created_str: String = row.get(6)?;

    Ok(Contact {
        id: ContactId(parse_uuid(0, &id_str)?),
        owner_id: UserId(owner_id),
        name: row.get(2)?,
        phone: row.get(3)?,
        phone_normalized: row.get(4)?,
        linked_uid: linked_uid.map(UserId),
        created_at: parse_ts(6, &created_str)?,
    })
}
