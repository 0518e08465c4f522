//! Private address book layered over the user directory.

use roomsync_store::now;
use roomsync_shared::constants::MIN_NAME_LEN;
use roomsync_shared::{phone, ContactId, SyncError, UserId, ValidationError};
use roomsync_store::{Contact, StoreError};
use tracing::{info, warn};

use crate::events::Change;
use crate::state::ChatClient;
use crate::subscription::Subscription;

impl ChatClient {
    /// Add a contact to `owner`'s address book.
    ///
    /// The phone is normalized before the duplicate check, so `"999 999
    /// 9999"` and `"9999999999"` collide. Without an explicit `uid`, the
    /// contact is linked to a registered user with the same number, if any.
    pub async fn add_contact(
        &self,
        owner: &UserId,
        name: &str,
        phone_raw: &str,
        uid: Option<UserId>,
    ) -> Result<Contact, SyncError> {
        let name = name.trim();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(ValidationError::NameTooShort { min: MIN_NAME_LEN }.into());
        }
        let normalized = phone::normalize_checked(phone_raw)?;

        let contact = {
            let db = self.lock_db()?;
            if db.find_contact_by_phone(owner, &normalized)?.is_some() {
                return Err(ValidationError::DuplicatePhone(normalized).into());
            }

            let linked_uid = match uid {
                Some(uid) => Some(uid),
                None => db.find_user_by_phone(&normalized)?,
            };

            let contact = Contact {
                id: ContactId::new(),
                owner_id: owner.clone(),
                name: name.to_string(),
                phone: phone_raw.trim().to_string(),
                phone_normalized: normalized.clone(),
                linked_uid,
                created_at: now(),
            };

            match db.insert_contact(&contact) {
                Ok(()) => contact,
                Err(StoreError::Constraint(_)) => {
                    return Err(ValidationError::DuplicatePhone(normalized).into());
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(owner = %owner, contact = %contact.id, linked = contact.linked_uid.is_some(), "contact added");
        self.emit(Change::Contacts(owner.clone()));
        Ok(contact)
    }

    /// Remove a contact. Removing one that does not exist is a logged no-op.
    pub async fn delete_contact(&self, owner: &UserId, contact_id: ContactId) -> Result<bool, SyncError> {
        let deleted = self.lock_db()?.delete_contact(owner, contact_id)?;

        if deleted {
            info!(owner = %owner, contact = %contact_id, "contact deleted");
            self.emit(Change::Contacts(owner.clone()));
        } else {
            warn!(owner = %owner, contact = %contact_id, "delete_contact: contact not found");
        }
        Ok(deleted)
    }

    /// Live list of `owner`'s contacts, newest first.
    ///
    /// Must be called from within a Tokio runtime; the feed is driven by a
    /// spawned task.
    pub fn get_contacts(&self, owner: &UserId) -> Subscription<Vec<Contact>> {
        let watched = owner.clone();
        let owner = owner.clone();
        self.subscribe(
            format!("contacts:{owner}"),
            move |change| matches!(change, Change::Contacts(o) if *o == watched),
            move |db| Ok(db.list_contacts(&owner)?),
        )
    }
}

/// Case-insensitive match on name or phone. A query written like a phone
/// number is also matched against the normalized phone, so `"999 9"` finds
/// `"9999999999"`; a query with letters only matches as plain text.
pub fn filter_contacts<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return contacts.iter().collect();
    }
    let digits = if phone::is_phone_pattern(&needle) {
        phone::normalize(&needle)
    } else {
        String::new()
    };
    contacts
        .iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&needle)
                || c.phone.to_lowercase().contains(&needle)
                || (!digits.is_empty() && c.phone_normalized.contains(digits.trim_start_matches('+')))
        })
        .collect()
}
