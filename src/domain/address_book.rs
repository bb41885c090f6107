//! The per-account address book.
//!
//! An [`AddressBook`] keeps addresses in insertion order and maintains the
//! default-address invariant: an empty book has no default, a non-empty
//! book has exactly one. Every mutation that moves the default goes
//! through [`reconcile_default`], which rebuilds the flags from a single
//! target id instead of flipping them one by one.
//!
//! The one sanctioned exception is clearing the flag on the current
//! default through [`AddressBook::update`] under
//! [`ClearDefaultPolicy::Permissive`], which leaves a non-empty book with
//! no default. [`AddressBook::default_address`] falls back to the first
//! entry in that state, and the next `add`, `remove` or
//! [`AddressBook::normalize`] promotes the first entry again.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Address, AddressId, AddressRules, AddressUpdate, NewAddress, ValidationError};

/// Errors returned by address book operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressBookError {
    #[error("invalid address: {0}")]
    Validation(#[from] ValidationError),

    #[error("address not found: {0}")]
    NotFound(AddressId),

    #[error("address book is empty")]
    Empty,

    #[error("default address invariant violated: {0}")]
    InvariantViolation(String),

    #[error("duplicate address id: {0}")]
    DuplicateId(AddressId),
}

impl AddressBookError {
    /// Returns true for errors caused by a missing address.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Empty)
    }
}

/// Result type for address book operations.
pub type Result<T> = std::result::Result<T, AddressBookError>;

/// What `update` does when a caller clears the flag on the current default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearDefaultPolicy {
    /// Apply the change as given, leaving the book without a default.
    #[default]
    Permissive,
    /// Refuse the update with an invariant violation.
    Reject,
    /// Move the default to the first other address.
    Promote,
}

/// Returns `addresses` with exactly the entry `target` flagged as default.
///
/// Entries whose flag changes get `updated_at = at`. If `target` is not in
/// the sequence every flag ends up cleared.
pub fn reconcile_default(
    addresses: Vec<Address>,
    target: &AddressId,
    at: DateTime<Utc>,
) -> Vec<Address> {
    addresses
        .into_iter()
        .map(|mut address| {
            let should_be_default = address.id == *target;
            if address.is_default != should_be_default {
                address.is_default = should_be_default;
                address.updated_at = at;
            }
            address
        })
        .collect()
}

/// Ordered collection of one account's addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Address>", into = "Vec<Address>")]
pub struct AddressBook {
    order: Vec<AddressId>,
    entries: HashMap<AddressId, Address>,
}

impl AddressBook {
    /// Creates an empty address book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a book from its persisted, ordered representation.
    ///
    /// Duplicate ids are rejected. Several defaults collapse onto the first
    /// flagged entry. A non-empty list without a default is kept as-is.
    pub fn from_addresses(addresses: Vec<Address>) -> Result<Self> {
        let mut book = Self::default();
        for address in addresses {
            if book.entries.contains_key(&address.id) {
                return Err(AddressBookError::DuplicateId(address.id));
            }
            book.push(address);
        }

        let defaults = book.default_count();
        if defaults > 1 {
            tracing::warn!(defaults, "Collapsing multiple default addresses");
            if let Some(first) = book.first_default_id() {
                book.promote(&first, Utc::now());
            }
        }

        Ok(book)
    }

    /// Returns the number of addresses.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the book holds no addresses.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates over the addresses in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Address> + '_ {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Looks up an address by id.
    pub fn get(&self, id: &AddressId) -> Option<&Address> {
        self.entries.get(id)
    }

    /// Returns true if the book holds an address with this id.
    pub fn contains(&self, id: &AddressId) -> bool {
        self.entries.contains_key(id)
    }

    /// Counts the addresses flagged as default.
    pub fn default_count(&self) -> usize {
        self.entries.values().filter(|a| a.is_default).count()
    }

    /// Returns the addresses in order as an owned list.
    pub fn to_vec(&self) -> Vec<Address> {
        self.iter().cloned().collect()
    }

    /// Consumes the book, returning the addresses in order.
    pub fn into_vec(self) -> Vec<Address> {
        let mut entries = self.entries;
        self.order
            .into_iter()
            .filter_map(|id| entries.remove(&id))
            .collect()
    }

    /// Validates and appends a new address.
    ///
    /// The first address of a book always becomes the default, as does any
    /// address added with `is_default` set; in both cases every other flag
    /// is cleared. A book left without a default promotes its first entry.
    pub fn add(&mut self, rules: &AddressRules, input: NewAddress) -> Result<&Address> {
        let now = Utc::now();
        let make_default = self.is_empty() || input.is_default;

        let mut address = rules.build(input, now)?;
        while self.entries.contains_key(&address.id) {
            address.id = AddressId::generate();
        }
        address.is_default = false;

        let id = address.id.clone();
        self.push(address);
        if make_default {
            self.promote(&id, now);
        } else {
            self.restore_default(now);
        }

        Ok(&self.entries[&id])
    }

    /// Applies a partial update to an existing address.
    ///
    /// `is_default: Some(true)` makes the target the sole default.
    /// `Some(false)` on the current default is resolved by `policy`.
    /// On error the book is left unchanged.
    pub fn update(
        &mut self,
        rules: &AddressRules,
        id: &AddressId,
        update: &AddressUpdate,
        policy: ClearDefaultPolicy,
    ) -> Result<&Address> {
        let current = self
            .entries
            .get(id)
            .ok_or_else(|| AddressBookError::NotFound(id.clone()))?;
        let was_default = current.is_default;

        let now = Utc::now();
        let mut next = rules.apply(current, update, now)?;

        match update.is_default {
            Some(true) => {
                self.entries.insert(id.clone(), next);
                self.promote(id, now);
            }
            Some(false) if was_default => match policy {
                ClearDefaultPolicy::Permissive => {
                    next.is_default = false;
                    self.entries.insert(id.clone(), next);
                }
                ClearDefaultPolicy::Reject => {
                    return Err(AddressBookError::InvariantViolation(format!(
                        "cannot clear default flag on {id} without choosing another default"
                    )));
                }
                ClearDefaultPolicy::Promote => {
                    self.entries.insert(id.clone(), next);
                    let successor = self
                        .order
                        .iter()
                        .find(|o| *o != id)
                        .unwrap_or(id)
                        .clone();
                    self.promote(&successor, now);
                }
            },
            Some(false) | None => {
                self.entries.insert(id.clone(), next);
            }
        }

        Ok(&self.entries[id])
    }

    /// Removes an address, returning it.
    ///
    /// When no default remains afterwards, the first remaining address
    /// takes over.
    pub fn remove(&mut self, id: &AddressId) -> Result<Address> {
        let removed = self
            .entries
            .remove(id)
            .ok_or_else(|| AddressBookError::NotFound(id.clone()))?;
        self.order.retain(|o| o != id);
        self.restore_default(Utc::now());

        Ok(removed)
    }

    /// Makes the given address the sole default.
    ///
    /// Returns `false` without touching anything when it already is.
    pub fn set_default(&mut self, id: &AddressId) -> Result<bool> {
        let target = self
            .entries
            .get(id)
            .ok_or_else(|| AddressBookError::NotFound(id.clone()))?;
        if target.is_default {
            return Ok(false);
        }

        self.promote(id, Utc::now());
        Ok(true)
    }

    /// Returns the default address, or the first address if none is flagged.
    pub fn default_address(&self) -> Result<&Address> {
        self.iter()
            .find(|a| a.is_default)
            .or_else(|| self.iter().next())
            .ok_or(AddressBookError::Empty)
    }

    /// Restores the default invariant.
    ///
    /// A book without a default promotes its first entry; a book with
    /// several keeps only the first flagged one. Returns whether anything
    /// changed.
    pub fn normalize(&mut self) -> bool {
        if self.is_empty() || self.default_count() == 1 {
            return false;
        }

        let target = match self.first_default_id() {
            Some(id) => id,
            None => self.order[0].clone(),
        };
        self.promote(&target, Utc::now());
        true
    }

    /// Checks that the book has exactly one default, or none when empty.
    pub fn check_invariant(&self) -> Result<()> {
        let defaults = self.default_count();
        let expected = usize::from(!self.is_empty());
        if defaults != expected {
            return Err(AddressBookError::InvariantViolation(format!(
                "expected {expected} default address(es), found {defaults}"
            )));
        }
        Ok(())
    }

    fn push(&mut self, address: Address) {
        self.order.push(address.id.clone());
        self.entries.insert(address.id.clone(), address);
    }

    fn restore_default(&mut self, at: DateTime<Utc>) {
        if self.default_count() == 0 {
            if let Some(first) = self.order.first().cloned() {
                self.promote(&first, at);
            }
        }
    }

    fn first_default_id(&self) -> Option<AddressId> {
        self.iter().find(|a| a.is_default).map(|a| a.id.clone())
    }

    fn promote(&mut self, target: &AddressId, at: DateTime<Utc>) {
        let addresses = std::mem::take(self).into_vec();
        for address in reconcile_default(addresses, target, at) {
            self.push(address);
        }
    }
}

impl TryFrom<Vec<Address>> for AddressBook {
    type Error = AddressBookError;

    fn try_from(addresses: Vec<Address>) -> Result<Self> {
        Self::from_addresses(addresses)
    }
}

impl From<AddressBook> for Vec<Address> {
    fn from(book: AddressBook) -> Self {
        book.into_vec()
    }
}
