//! Address service for managing an account's address book.
//!
//! Every operation is one read-modify-write cycle: load the stored book
//! and its version, apply the change through [`AddressBook`], then save
//! with the version that was read. A save that finds the version moved
//! fails with [`AddressError::Conflict`] and the caller retries.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AddressSettings;
use crate::domain::{
    AccountId, Address, AddressBook, AddressBookError, AddressId, AddressRules, AddressUpdate,
    ClearDefaultPolicy, NewAddress,
};

/// Errors that can occur during address operations.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The address book refused the operation.
    #[error(transparent)]
    Book(#[from] AddressBookError),

    /// The owning account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// Another writer saved the book after it was loaded.
    #[error("address book of {0} was modified concurrently")]
    Conflict(AccountId),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl AddressError {
    /// Returns true when the account or address does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Book(e) => e.is_not_found(),
            Self::AccountNotFound(_) => true,
            _ => false,
        }
    }
}

/// Result type for address operations.
pub type AddressResult<T> = Result<T, AddressError>;

/// A persisted address list together with its version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredAddresses {
    /// Incremented on every successful save.
    pub version: u64,
    /// Addresses in book order.
    pub addresses: Vec<Address>,
}

/// Storage abstraction for address books.
#[async_trait]
pub trait AddressStorage: Send + Sync {
    /// Loads an account's addresses; `None` if the account does not exist.
    async fn load_addresses(&self, account_id: &AccountId)
        -> AddressResult<Option<StoredAddresses>>;

    /// Replaces an account's addresses if the stored version is still
    /// `expected_version`, returning the new version. Fails with
    /// [`AddressError::Conflict`] otherwise.
    async fn save_addresses(
        &self,
        account_id: &AccountId,
        expected_version: u64,
        addresses: Vec<Address>,
    ) -> AddressResult<u64>;

    /// Lists all account IDs that own an address book.
    async fn list_account_ids(&self) -> AddressResult<Vec<AccountId>>;
}

/// Outcome of a repair sweep over all accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Number of books inspected.
    pub scanned: usize,
    /// Number of books rewritten.
    pub repaired: usize,
    /// Number of books skipped because another writer got there first.
    pub conflicts: usize,
}

/// Service for managing address books.
pub struct AddressService<S: AddressStorage> {
    storage: S,
    rules: AddressRules,
    policy: ClearDefaultPolicy,
}

impl<S: AddressStorage> AddressService<S> {
    /// Creates a new address service.
    pub fn new(storage: S, rules: AddressRules, policy: ClearDefaultPolicy) -> Self {
        Self {
            storage,
            rules,
            policy,
        }
    }

    /// Creates a service configured from the address settings.
    pub fn from_settings(storage: S, settings: &AddressSettings) -> AddressResult<Self> {
        let rules = AddressRules::from_settings(settings).map_err(AddressBookError::from)?;
        Ok(Self::new(storage, rules, settings.clear_default_policy))
    }

    /// Returns the validation rules in use.
    pub fn rules(&self) -> &AddressRules {
        &self.rules
    }

    /// Returns the policy applied when the default flag is cleared.
    pub fn policy(&self) -> ClearDefaultPolicy {
        self.policy
    }

    /// Lists an account's addresses in order.
    pub async fn list_addresses(&self, account_id: &AccountId) -> AddressResult<Vec<Address>> {
        let (_, book) = self.load(account_id).await?;
        Ok(book.into_vec())
    }

    /// Gets a single address.
    pub async fn get_address(
        &self,
        account_id: &AccountId,
        address_id: &AddressId,
    ) -> AddressResult<Address> {
        let (_, book) = self.load(account_id).await?;
        book.get(address_id).cloned().ok_or_else(|| {
            self.reject("get", account_id, AddressBookError::NotFound(address_id.clone()))
        })
    }

    /// Adds an address and returns the updated list.
    pub async fn add_address(
        &self,
        account_id: &AccountId,
        input: NewAddress,
    ) -> AddressResult<Vec<Address>> {
        let (version, mut book) = self.load(account_id).await?;

        let added = book
            .add(&self.rules, input)
            .map_err(|e| self.reject("add", account_id, e))?;
        let address_id = added.id.clone();
        let is_default = added.is_default;

        self.persist(account_id, version, &book).await?;
        tracing::info!(%account_id, %address_id, is_default, "Address added");
        Ok(book.into_vec())
    }

    /// Updates an address and returns the updated list.
    pub async fn update_address(
        &self,
        account_id: &AccountId,
        address_id: &AddressId,
        update: AddressUpdate,
    ) -> AddressResult<Vec<Address>> {
        let (version, mut book) = self.load(account_id).await?;

        book.update(&self.rules, address_id, &update, self.policy)
            .map_err(|e| self.reject("update", account_id, e))?;

        self.persist(account_id, version, &book).await?;
        if book.default_count() == 0 {
            tracing::warn!(%account_id, %address_id, "Address book left without a default");
        }
        tracing::info!(%account_id, %address_id, "Address updated");
        Ok(book.into_vec())
    }

    /// Removes an address and returns the updated list.
    pub async fn remove_address(
        &self,
        account_id: &AccountId,
        address_id: &AddressId,
    ) -> AddressResult<Vec<Address>> {
        let (version, mut book) = self.load(account_id).await?;

        let removed = book
            .remove(address_id)
            .map_err(|e| self.reject("remove", account_id, e))?;

        self.persist(account_id, version, &book).await?;
        tracing::info!(
            %account_id,
            %address_id,
            was_default = removed.is_default,
            "Address removed"
        );
        Ok(book.into_vec())
    }

    /// Makes an address the default and returns the updated list.
    ///
    /// Nothing is written when the address already is the default.
    pub async fn set_default_address(
        &self,
        account_id: &AccountId,
        address_id: &AddressId,
    ) -> AddressResult<Vec<Address>> {
        let (version, mut book) = self.load(account_id).await?;

        let changed = book
            .set_default(address_id)
            .map_err(|e| self.reject("set_default", account_id, e))?;

        if changed {
            self.persist(account_id, version, &book).await?;
            tracing::info!(%account_id, %address_id, "Default address set");
        } else {
            tracing::info!(%account_id, %address_id, "Default address is already set");
        }
        Ok(book.into_vec())
    }

    /// Gets the default address (or the first address if none is flagged).
    pub async fn get_default_address(&self, account_id: &AccountId) -> AddressResult<Address> {
        let (_, book) = self.load(account_id).await?;
        book.default_address()
            .cloned()
            .map_err(|e| self.reject("get_default", account_id, e))
    }

    /// Restores the default invariant of a stored book.
    ///
    /// Returns true if the book had to be rewritten.
    pub async fn repair(&self, account_id: &AccountId) -> AddressResult<bool> {
        let stored = self.fetch(account_id).await?;
        let mut book = AddressBook::from_addresses(stored.addresses.clone())
            .map_err(|e| self.reject("repair", account_id, e))?;
        book.normalize();

        if book.to_vec() == stored.addresses {
            return Ok(false);
        }

        self.persist(account_id, stored.version, &book).await?;
        tracing::info!(%account_id, addresses = book.len(), "Address book repaired");
        Ok(true)
    }

    /// Repairs every stored book.
    ///
    /// Books that another writer saved in the meantime are counted as
    /// conflicts and left alone; any other error stops the sweep.
    pub async fn repair_all(&self) -> AddressResult<RepairReport> {
        let mut report = RepairReport::default();

        for account_id in self.storage.list_account_ids().await? {
            report.scanned += 1;
            match self.repair(&account_id).await {
                Ok(true) => report.repaired += 1,
                Ok(false) => {}
                Err(AddressError::Conflict(_)) => report.conflicts += 1,
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            scanned = report.scanned,
            repaired = report.repaired,
            conflicts = report.conflicts,
            "Address repair finished"
        );
        Ok(report)
    }

    async fn fetch(&self, account_id: &AccountId) -> AddressResult<StoredAddresses> {
        match self.storage.load_addresses(account_id).await? {
            Some(stored) => Ok(stored),
            None => {
                tracing::warn!(%account_id, "Account not found");
                Err(AddressError::AccountNotFound(account_id.clone()))
            }
        }
    }

    async fn load(&self, account_id: &AccountId) -> AddressResult<(u64, AddressBook)> {
        let stored = self.fetch(account_id).await?;
        let book = AddressBook::from_addresses(stored.addresses)
            .map_err(|e| self.reject("load", account_id, e))?;
        Ok((stored.version, book))
    }

    async fn persist(
        &self,
        account_id: &AccountId,
        version: u64,
        book: &AddressBook,
    ) -> AddressResult<()> {
        match self
            .storage
            .save_addresses(account_id, version, book.to_vec())
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(%account_id, version, error = %e, "Failed to save address book");
                Err(e)
            }
        }
    }

    fn reject(
        &self,
        operation: &'static str,
        account_id: &AccountId,
        error: AddressBookError,
    ) -> AddressError {
        tracing::warn!(%account_id, operation, error = %error, "Address operation rejected");
        AddressError::Book(error)
    }
}
