//! Database storage.
//!
//! This module provides the storage layer for atelier, including:
//!
//! - SQLite database for accounts and their address books
//! - Async-safe database operations via tokio::task::spawn_blocking
//! - Implementations of the service storage traits

mod database;
pub mod queries;
mod schema;

pub use database::{Database, DatabaseError, Result};

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Account, AccountId, AccountStatus, Address};
use crate::services::{
    AccountError, AccountResult, AccountStorage, AddressError, AddressResult, AddressStorage,
    StoredAddresses,
};

/// Storage layer backed by SQLite.
///
/// This is the main entry point for storage operations. Cloning shares
/// the underlying connection.
#[derive(Debug, Clone)]
pub struct StorageLayer {
    db: Database,
}

impl StorageLayer {
    /// Creates a new storage layer with the given database path.
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::open(db_path).await?;
        Ok(Self { db })
    }

    /// Creates a storage layer with an in-memory database for testing.
    pub async fn in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self { db })
    }

    /// Returns a reference to the database.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Wraps the storage layer in an Arc for shared ownership.
    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl From<DatabaseError> for AccountError {
    fn from(e: DatabaseError) -> Self {
        AccountError::Storage(e.to_string())
    }
}

impl From<DatabaseError> for AddressError {
    fn from(e: DatabaseError) -> Self {
        AddressError::Storage(e.to_string())
    }
}

#[async_trait]
impl AccountStorage for StorageLayer {
    async fn get_account(&self, id: &AccountId) -> AccountResult<Option<Account>> {
        Ok(queries::accounts::get_by_id(&self.db, id).await?)
    }

    async fn get_by_email(&self, email: &str) -> AccountResult<Option<Account>> {
        Ok(queries::accounts::get_by_email(&self.db, email).await?)
    }

    async fn get_by_phone(&self, phone: &str) -> AccountResult<Option<Account>> {
        Ok(queries::accounts::get_by_phone(&self.db, phone).await?)
    }

    async fn get_all_accounts(&self) -> AccountResult<Vec<Account>> {
        Ok(queries::accounts::get_all(&self.db).await?)
    }

    async fn insert_account(&self, account: &Account) -> AccountResult<()> {
        queries::accounts::insert(&self.db, account)
            .await
            .map_err(|e| duplicate_or_storage(e, account))
    }

    async fn email_exists(&self, email: &str) -> AccountResult<bool> {
        Ok(queries::accounts::exists_by_email(&self.db, email).await?)
    }

    async fn phone_exists(&self, phone: &str) -> AccountResult<bool> {
        Ok(queries::accounts::exists_by_phone(&self.db, phone).await?)
    }

    async fn update_account(&self, account: &Account) -> AccountResult<bool> {
        queries::accounts::update_profile(&self.db, account)
            .await
            .map_err(|e| duplicate_or_storage(e, account))
    }

    async fn set_status(&self, id: &AccountId, status: AccountStatus) -> AccountResult<bool> {
        Ok(queries::accounts::set_status(&self.db, id, status).await?)
    }

    async fn delete_account(&self, id: &AccountId) -> AccountResult<bool> {
        Ok(queries::accounts::delete(&self.db, id).await?)
    }

    async fn count_accounts(&self) -> AccountResult<u32> {
        Ok(queries::accounts::count(&self.db).await?)
    }
}

/// Maps a UNIQUE violation on an account write to `AlreadyExists`.
///
/// Covers writers that raced past the service's own uniqueness check.
fn duplicate_or_storage(error: DatabaseError, account: &Account) -> AccountError {
    let column = error.unique_violation().map(str::to_owned);
    match column.as_deref() {
        Some("accounts.phone") => AccountError::AlreadyExists(account.phone.clone()),
        Some("accounts.email") => AccountError::AlreadyExists(account.email.clone()),
        _ => error.into(),
    }
}

#[async_trait]
impl AddressStorage for StorageLayer {
    async fn load_addresses(
        &self,
        account_id: &AccountId,
    ) -> AddressResult<Option<StoredAddresses>> {
        Ok(queries::addresses::load(&self.db, account_id).await?)
    }

    async fn save_addresses(
        &self,
        account_id: &AccountId,
        expected_version: u64,
        addresses: Vec<Address>,
    ) -> AddressResult<u64> {
        queries::addresses::save(&self.db, account_id, expected_version, addresses)
            .await?
            .ok_or_else(|| AddressError::Conflict(account_id.clone()))
    }

    async fn list_account_ids(&self) -> AddressResult<Vec<AccountId>> {
        Ok(queries::accounts::list_ids(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AddressRules, NewAddress, PersonName};

    #[tokio::test]
    async fn storage_layer_in_memory() {
        let storage = StorageLayer::in_memory().await.unwrap();

        let count: i64 = storage
            .db()
            .with_conn(|conn| {
                let count =
                    conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
                Ok(count)
            })
            .await
            .unwrap();

        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn storage_layer_into_arc() {
        let storage = StorageLayer::in_memory().await.unwrap();
        let arc_storage = storage.into_arc();

        assert_eq!(arc_storage.count_accounts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stale_save_maps_to_conflict() {
        let storage = StorageLayer::in_memory().await.unwrap();
        let account = Account::new(PersonName::new("Asha", "Rao"), "asha@example.com", "1");
        storage.insert_account(&account).await.unwrap();

        let mut book = account.addresses.clone();
        book.add(
            &AddressRules::default(),
            NewAddress::new("1 Main", "Bengaluru", "Karnataka", "560001"),
        )
        .unwrap();

        let version = storage
            .save_addresses(&account.id, 0, book.to_vec())
            .await
            .unwrap();
        assert_eq!(version, 1);

        let err = storage
            .save_addresses(&account.id, 0, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AddressError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_insert_maps_to_already_exists() {
        let storage = StorageLayer::in_memory().await.unwrap();
        let first = Account::new(PersonName::new("Asha", "Rao"), "asha@example.com", "1");
        storage.insert_account(&first).await.unwrap();

        let same_email = Account::new(PersonName::new("Ravi", "Iyer"), "asha@example.com", "2");
        let err = storage.insert_account(&same_email).await.unwrap_err();
        assert!(matches!(err, AccountError::AlreadyExists(e) if e == "asha@example.com"));

        let same_phone = Account::new(PersonName::new("Ravi", "Iyer"), "ravi@example.com", "1");
        let err = storage.insert_account(&same_phone).await.unwrap_err();
        assert!(matches!(err, AccountError::AlreadyExists(p) if p == "1"));

        assert_eq!(storage.count_accounts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn phone_clash_on_update_maps_to_already_exists() {
        let storage = StorageLayer::in_memory().await.unwrap();
        let first = Account::new(PersonName::new("Asha", "Rao"), "asha@example.com", "1");
        let mut second = Account::new(PersonName::new("Ravi", "Iyer"), "ravi@example.com", "2");
        storage.insert_account(&first).await.unwrap();
        storage.insert_account(&second).await.unwrap();

        second.phone = "1".to_string();
        let err = storage.update_account(&second).await.unwrap_err();

        assert!(matches!(err, AccountError::AlreadyExists(p) if p == "1"));
    }

    #[tokio::test]
    async fn set_status_and_existence_checks() {
        let storage = StorageLayer::in_memory().await.unwrap();
        let account = Account::new(PersonName::new("Asha", "Rao"), "asha@example.com", "1");
        assert!(!storage.email_exists("asha@example.com").await.unwrap());
        storage.insert_account(&account).await.unwrap();

        assert!(storage.email_exists("asha@example.com").await.unwrap());
        assert!(storage.phone_exists("1").await.unwrap());
        assert!(storage
            .set_status(&account.id, AccountStatus::Suspended)
            .await
            .unwrap());
        assert!(!storage
            .set_status(&AccountId::from("acct-missing"), AccountStatus::Active)
            .await
            .unwrap());

        let stored = storage.get_account(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AccountStatus::Suspended);
    }
}
