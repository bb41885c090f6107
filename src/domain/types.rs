//! Core identifier types for domain entities.
//!
//! These newtype wrappers keep account and address identifiers apart at
//! the type level. Both are opaque strings once issued.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a marketplace account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    /// Issues a fresh, random account identifier.
    pub fn generate() -> Self {
        Self(format!("acct-{}", uuid::Uuid::new_v4()))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Unique identifier for an address inside an account's address book.
///
/// Identity is assigned once when the address is added and never derived
/// from the address's position in the book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressId(pub String);

impl AddressId {
    /// Issues a fresh, random address identifier.
    pub fn generate() -> Self {
        Self(format!("addr-{}", uuid::Uuid::new_v4()))
    }
}

impl fmt::Display for AddressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AddressId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AddressId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
