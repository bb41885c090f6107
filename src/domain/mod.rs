//! Domain layer types for the marketplace account core.
//!
//! This module contains the account entity and the address book it owns,
//! together with the validation rules for postal addresses.

mod account;
mod address;
mod address_book;
mod types;

pub use account::{
    Account, AccountStatus, NotificationPreferences, PersonName, Preferences, Role,
};
pub use address::{
    Address, AddressLabel, AddressRules, AddressUpdate, NewAddress, ValidationError,
    DEFAULT_COUNTRY, DEFAULT_POSTAL_CODE_PATTERN,
};
pub use address_book::{reconcile_default, AddressBook, AddressBookError, ClearDefaultPolicy};
pub use types::{AccountId, AddressId};
