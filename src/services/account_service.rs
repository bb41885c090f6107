//! Account service for managing marketplace accounts.
//!
//! Provides a service layer for account operations including:
//! - Account creation with email and phone uniqueness
//! - Profile updates and status changes
//! - Account deletion together with its address book

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::domain::{
    Account, AccountId, AccountStatus, PersonName, Preferences, Role, ValidationError,
};

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Account not found.
    #[error("account not found: {0}")]
    NotFound(String),

    /// Another account already uses this email or phone.
    #[error("account already exists: {0}")]
    AlreadyExists(String),

    /// A field failed validation.
    #[error("invalid account: {0}")]
    Invalid(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for account operations.
pub type AccountResult<T> = Result<T, AccountError>;

/// Storage abstraction for account operations.
#[async_trait]
pub trait AccountStorage: Send + Sync {
    /// Gets an account by ID.
    async fn get_account(&self, id: &AccountId) -> AccountResult<Option<Account>>;

    /// Gets an account by email.
    async fn get_by_email(&self, email: &str) -> AccountResult<Option<Account>>;

    /// Gets an account by phone number.
    async fn get_by_phone(&self, phone: &str) -> AccountResult<Option<Account>>;

    /// Gets all accounts.
    async fn get_all_accounts(&self) -> AccountResult<Vec<Account>>;

    /// Inserts a new account together with its addresses.
    async fn insert_account(&self, account: &Account) -> AccountResult<()>;

    /// Returns true if an account uses this email.
    async fn email_exists(&self, email: &str) -> AccountResult<bool>;

    /// Returns true if an account uses this phone number.
    async fn phone_exists(&self, phone: &str) -> AccountResult<bool>;

    /// Updates an account's profile. Returns false if it does not exist.
    async fn update_account(&self, account: &Account) -> AccountResult<bool>;

    /// Sets an account's status. Returns false if it does not exist.
    async fn set_status(&self, id: &AccountId, status: AccountStatus) -> AccountResult<bool>;

    /// Deletes an account. Returns false if it does not exist.
    async fn delete_account(&self, id: &AccountId) -> AccountResult<bool>;

    /// Counts total accounts.
    async fn count_accounts(&self) -> AccountResult<u32>;
}

/// Request to create a new account.
#[derive(Debug, Clone)]
pub struct CreateAccountRequest {
    pub first_name: String,
    pub last_name: String,
    /// Email address; normalized to lowercase.
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub preferences: Preferences,
}

impl CreateAccountRequest {
    /// Creates a request for a regular user.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            phone: phone.into(),
            role: Role::default(),
            preferences: Preferences::default(),
        }
    }

    /// Sets the role.
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Sets the preferences.
    pub fn preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }
}

/// Profile changes to apply to an account.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub preferences: Option<Preferences>,
}

impl ProfileUpdate {
    /// Creates a new empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the first name.
    pub fn first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    /// Sets the last name.
    pub fn last_name(mut self, name: impl Into<String>) -> Self {
        self.last_name = Some(name.into());
        self
    }

    /// Sets the phone number.
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the preferences.
    pub fn preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Returns true if this update has no changes.
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.preferences.is_none()
    }
}

/// Account statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountStats {
    pub total_accounts: u32,
    pub active_accounts: u32,
    pub creators: u32,
    pub printers: u32,
    /// Accounts with at least one address.
    pub with_addresses: u32,
}

/// Service for managing accounts.
pub struct AccountService<S: AccountStorage> {
    storage: S,
}

impl<S: AccountStorage> AccountService<S> {
    /// Creates a new account service.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Creates a new account.
    pub async fn create_account(&self, request: CreateAccountRequest) -> AccountResult<Account> {
        let first_name = required("first_name", &request.first_name)?;
        let last_name = required("last_name", &request.last_name)?;
        let email = normalize_email(&request.email)?;
        let phone = required("phone", &request.phone)?;

        if self.storage.email_exists(&email).await? {
            tracing::warn!(%email, "Account email already registered");
            return Err(AccountError::AlreadyExists(email));
        }
        if self.storage.phone_exists(&phone).await? {
            tracing::warn!(%phone, "Account phone already registered");
            return Err(AccountError::AlreadyExists(phone));
        }

        let mut account = Account::new(PersonName::new(first_name, last_name), email, phone);
        account.role = request.role;
        account.preferences = request.preferences;

        self.storage.insert_account(&account).await?;
        tracing::info!(account_id = %account.id, role = account.role.as_str(), "Account created");

        Ok(account)
    }

    /// Gets an account by ID.
    pub async fn get_account(&self, id: &AccountId) -> AccountResult<Account> {
        self.storage
            .get_account(id)
            .await?
            .ok_or_else(|| AccountError::NotFound(id.to_string()))
    }

    /// Gets an account by email, compared case-insensitively.
    pub async fn get_by_email(&self, email: &str) -> AccountResult<Account> {
        let email = email.trim().to_lowercase();
        self.storage
            .get_by_email(&email)
            .await?
            .ok_or_else(|| AccountError::NotFound(email.clone()))
    }

    /// Lists all accounts.
    pub async fn list_accounts(&self) -> AccountResult<Vec<Account>> {
        self.storage.get_all_accounts().await
    }

    /// Applies profile changes to an account.
    pub async fn update_profile(
        &self,
        id: &AccountId,
        update: ProfileUpdate,
    ) -> AccountResult<Account> {
        if update.is_empty() {
            return self.get_account(id).await;
        }

        let mut account = self.get_account(id).await?;

        if let Some(first_name) = update.first_name {
            account.name.first_name = required("first_name", &first_name)?;
        }
        if let Some(last_name) = update.last_name {
            account.name.last_name = required("last_name", &last_name)?;
        }
        if let Some(phone) = update.phone {
            let phone = required("phone", &phone)?;
            if phone != account.phone {
                if let Some(other) = self.storage.get_by_phone(&phone).await? {
                    if other.id != account.id {
                        return Err(AccountError::AlreadyExists(phone));
                    }
                }
                account.phone = phone;
            }
        }
        if let Some(preferences) = update.preferences {
            account.preferences = preferences;
        }

        self.save(&account).await?;
        tracing::info!(account_id = %account.id, "Profile updated");
        Ok(account)
    }

    /// Changes an account's lifecycle status.
    pub async fn set_status(
        &self,
        id: &AccountId,
        status: AccountStatus,
    ) -> AccountResult<Account> {
        if !self.storage.set_status(id, status).await? {
            return Err(AccountError::NotFound(id.to_string()));
        }
        tracing::info!(account_id = %id, status = status.as_str(), "Account status changed");
        self.get_account(id).await
    }

    /// Deletes an account and its address book.
    pub async fn delete_account(&self, id: &AccountId) -> AccountResult<()> {
        if !self.storage.delete_account(id).await? {
            return Err(AccountError::NotFound(id.to_string()));
        }
        tracing::info!(account_id = %id, "Account deleted");
        Ok(())
    }

    /// Gets account statistics.
    pub async fn get_stats(&self) -> AccountResult<AccountStats> {
        let accounts = self.storage.get_all_accounts().await?;

        let mut stats = AccountStats {
            total_accounts: accounts.len() as u32,
            ..Default::default()
        };

        for account in accounts {
            if account.is_active() {
                stats.active_accounts += 1;
            }
            match account.role {
                Role::Creator => stats.creators += 1,
                Role::Printer => stats.printers += 1,
                Role::User | Role::Admin => {}
            }
            if !account.addresses.is_empty() {
                stats.with_addresses += 1;
            }
        }

        Ok(stats)
    }

    /// Counts total accounts.
    pub async fn count(&self) -> AccountResult<u32> {
        self.storage.count_accounts().await
    }

    async fn save(&self, account: &Account) -> AccountResult<()> {
        if self.storage.update_account(account).await? {
            Ok(())
        } else {
            Err(AccountError::NotFound(account.id.to_string()))
        }
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\w+([.+-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,})+$").expect("valid email pattern")
    })
}

/// Trims, lowercases and checks an email address.
fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::MissingField("email"));
    }
    if !email_pattern().is_match(&email) {
        return Err(ValidationError::InvalidEmail(email));
    }
    Ok(email)
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value.to_string())
}
