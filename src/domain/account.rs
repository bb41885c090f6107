//! Account domain types.
//!
//! Represents marketplace accounts (customers, creators, printers and
//! admins). Each account owns exactly one [`AddressBook`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, AddressBook};

/// A marketplace account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for this account.
    pub id: AccountId,
    /// Legal name of the account holder.
    pub name: PersonName,
    /// Login email, stored lowercased.
    pub email: String,
    /// Contact phone number.
    pub phone: String,
    /// Role within the marketplace.
    pub role: Role,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// Notification and locale preferences.
    pub preferences: Preferences,
    /// Postal addresses, in the order they were added.
    pub addresses: AddressBook,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates an active account with default preferences and no addresses.
    pub fn new(name: PersonName, email: impl Into<String>, phone: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::generate(),
            name,
            email: email.into(),
            phone: phone.into(),
            role: Role::default(),
            status: AccountStatus::default(),
            preferences: Preferences::default(),
            addresses: AddressBook::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns "first last".
    pub fn full_name(&self) -> String {
        self.name.full()
    }

    /// Returns true if the account may transact.
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// First and last name of an account holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first_name: String,
    pub last_name: String,
}

impl PersonName {
    /// Creates a name from its two parts.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Returns "first last".
    pub fn full(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Role of an account within the marketplace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Buying customer.
    #[default]
    User,
    /// Marketplace administrator.
    Admin,
    /// Artist publishing artwork.
    Creator,
    /// Print vendor fulfilling orders.
    Printer,
}

impl Role {
    /// Returns the stored name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Creator => "creator",
            Self::Printer => "printer",
        }
    }

    /// Parses a stored role name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "creator" => Some(Self::Creator),
            "printer" => Some(Self::Printer),
            _ => None,
        }
    }
}

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl AccountStatus {
    /// Returns the stored name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// Per-account preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub notifications: NotificationPreferences,
    /// UI language code.
    pub language: String,
    /// ISO 4217 currency code used for prices.
    pub currency: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications: NotificationPreferences::default(),
            language: "en".to_string(),
            currency: "INR".to_string(),
        }
    }
}

/// Which channels an account accepts notifications on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPreferences {
    pub email: bool,
    pub sms: bool,
    pub marketing: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            sms: true,
            marketing: false,
        }
    }
}
