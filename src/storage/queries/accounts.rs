//! Account CRUD operations.
//!
//! Provides database operations for account entities. Reads return the
//! account together with its address book.

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::addresses;
use super::parse_timestamp;
use crate::domain::{
    Account, AccountId, AccountStatus, AddressBook, PersonName, Preferences, Role,
};
use crate::storage::database::{Database, DatabaseError, Result};

const ACCOUNT_COLUMNS: &str = "id, first_name, last_name, email, phone, role, status, \
                               preferences, created_at, updated_at";

/// Inserts a new account and its addresses.
pub async fn insert(db: &Database, account: &Account) -> Result<()> {
    let account = account.clone();

    db.transaction(move |tx| {
        let preferences = serde_json::to_string(&account.preferences)?;

        tx.execute(
            r#"
            INSERT INTO accounts (
                id, first_name, last_name, email, phone, role, status,
                preferences, address_version, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10
            )
            "#,
            params![
                account.id.0,
                account.name.first_name,
                account.name.last_name,
                account.email,
                account.phone,
                account.role.as_str(),
                account.status.as_str(),
                preferences,
                account.created_at.to_rfc3339(),
                account.updated_at.to_rfc3339(),
            ],
        )?;

        addresses::replace_rows(tx, &account.id, &account.addresses.to_vec())?;
        Ok(())
    })
    .await
}

/// Retrieves an account by its ID.
pub async fn get_by_id(db: &Database, account_id: &AccountId) -> Result<Option<Account>> {
    let account_id = account_id.clone();
    db.with_conn(move |conn| fetch_one(conn, "id", &account_id.0))
        .await
}

/// Retrieves an account by email address.
pub async fn get_by_email(db: &Database, email: &str) -> Result<Option<Account>> {
    let email = email.to_string();
    db.with_conn(move |conn| fetch_one(conn, "email", &email))
        .await
}

/// Retrieves an account by phone number.
pub async fn get_by_phone(db: &Database, phone: &str) -> Result<Option<Account>> {
    let phone = phone.to_string();
    db.with_conn(move |conn| fetch_one(conn, "phone", &phone))
        .await
}

/// Retrieves all accounts ordered by email.
pub async fn get_all(db: &Database) -> Result<Vec<Account>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY email"
        ))?;
        let rows = stmt.query_map([], row_to_account)?;
        let accounts: std::result::Result<Vec<_>, _> = rows.collect();

        accounts?
            .into_iter()
            .map(|account| with_addresses(conn, account))
            .collect()
    })
    .await
}

/// Lists every account ID.
pub async fn list_ids(db: &Database) -> Result<Vec<AccountId>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT id FROM accounts ORDER BY created_at")?;
        let rows = stmt.query_map([], |row| Ok(AccountId(row.get(0)?)))?;
        let ids: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(ids?)
    })
    .await
}

/// Updates the profile columns of an account. Addresses are not touched.
///
/// Returns false when no such account exists.
pub async fn update_profile(db: &Database, account: &Account) -> Result<bool> {
    let account = account.clone();

    db.with_conn(move |conn| {
        let preferences = serde_json::to_string(&account.preferences)?;
        let updated = conn.execute(
            r#"
            UPDATE accounts SET
                first_name = ?1, last_name = ?2, email = ?3, phone = ?4,
                role = ?5, status = ?6, preferences = ?7, updated_at = ?8
            WHERE id = ?9
            "#,
            params![
                account.name.first_name,
                account.name.last_name,
                account.email,
                account.phone,
                account.role.as_str(),
                account.status.as_str(),
                preferences,
                Utc::now().to_rfc3339(),
                account.id.0,
            ],
        )?;
        Ok(updated > 0)
    })
    .await
}

/// Sets an account's status. Returns false when no such account exists.
pub async fn set_status(
    db: &Database,
    account_id: &AccountId,
    status: AccountStatus,
) -> Result<bool> {
    let account_id = account_id.clone();

    db.with_conn(move |conn| {
        let updated = conn.execute(
            "UPDATE accounts SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), account_id.0],
        )?;
        Ok(updated > 0)
    })
    .await
}

/// Deletes an account; its addresses go with it.
///
/// Returns false when no such account exists.
pub async fn delete(db: &Database, account_id: &AccountId) -> Result<bool> {
    let account_id = account_id.clone();

    db.transaction(move |tx| {
        tx.execute(
            "DELETE FROM addresses WHERE account_id = ?1",
            [&account_id.0],
        )?;
        let deleted = tx.execute("DELETE FROM accounts WHERE id = ?1", [&account_id.0])?;
        Ok(deleted > 0)
    })
    .await
}

/// Counts total accounts.
pub async fn count(db: &Database) -> Result<u32> {
    db.with_conn(|conn| {
        let count: u32 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        Ok(count)
    })
    .await
}

/// Checks if an account with the given email exists.
pub async fn exists_by_email(db: &Database, email: &str) -> Result<bool> {
    let email = email.to_string();

    db.with_conn(move |conn| {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1)",
            [&email],
            |row| row.get(0),
        )?;
        Ok(exists)
    })
    .await
}

/// Checks if an account with the given phone number exists.
pub async fn exists_by_phone(db: &Database, phone: &str) -> Result<bool> {
    let phone = phone.to_string();

    db.with_conn(move |conn| {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE phone = ?1)",
            [&phone],
            |row| row.get(0),
        )?;
        Ok(exists)
    })
    .await
}

/// Fetches a single account where `column` equals `value`.
///
/// `column` is always one of a fixed set of literals, never caller input.
fn fetch_one(conn: &Connection, column: &str, value: &str) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {column} = ?1"),
            [value],
            row_to_account,
        )
        .optional()?;

    account.map(|a| with_addresses(conn, a)).transpose()
}

fn with_addresses(conn: &Connection, mut account: Account) -> Result<Account> {
    let rows = addresses::load_rows(conn, &account.id)?;
    account.addresses = AddressBook::from_addresses(rows)
        .map_err(|e| DatabaseError::Corrupt(format!("account {}: {e}", account.id)))?;
    Ok(account)
}

fn row_to_account(row: &Row<'_>) -> std::result::Result<Account, rusqlite::Error> {
    let role: String = row.get(5)?;
    let status: String = row.get(6)?;
    let preferences: String = row.get(7)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    let role = Role::parse(&role).ok_or_else(|| invalid_text(5, format!("unknown role {role}")))?;
    let status = AccountStatus::parse(&status)
        .ok_or_else(|| invalid_text(6, format!("unknown status {status}")))?;
    let preferences: Preferences = serde_json::from_str(&preferences)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(Account {
        id: AccountId(row.get(0)?),
        name: PersonName {
            first_name: row.get(1)?,
            last_name: row.get(2)?,
        },
        email: row.get(3)?,
        phone: row.get(4)?,
        role,
        status,
        preferences,
        addresses: AddressBook::new(),
        created_at: parse_timestamp(8, &created_at)?,
        updated_at: parse_timestamp(9, &updated_at)?,
    })
}

fn invalid_text(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AddressRules, NewAddress};
    use pretty_assertions::assert_eq;

    fn make_test_account() -> Account {
        Account::new(
            PersonName::new("Asha", "Rao"),
            "asha@example.com",
            "9876543210",
        )
    }

    fn make_printer_account() -> Account {
        let mut account = Account::new(
            PersonName::new("Ravi", "Kumar"),
            "prints@example.com",
            "9123456780",
        );
        account.role = Role::Printer;
        account
            .addresses
            .add(
                &AddressRules::default(),
                NewAddress::new("7 Press Rd", "Chennai", "Tamil Nadu", "600001"),
            )
            .unwrap();
        account
    }

    #[tokio::test]
    async fn insert_and_get_account() {
        let db = Database::open_in_memory().await.unwrap();
        let account = make_test_account();

        insert(&db, &account).await.unwrap();

        let retrieved = get_by_id(&db, &account.id).await.unwrap().unwrap();
        assert_eq!(retrieved, account);
    }

    #[tokio::test]
    async fn insert_persists_addresses() {
        let db = Database::open_in_memory().await.unwrap();
        let account = make_printer_account();

        insert(&db, &account).await.unwrap();

        let retrieved = get_by_id(&db, &account.id).await.unwrap().unwrap();
        assert_eq!(retrieved.role, Role::Printer);
        assert_eq!(retrieved.addresses, account.addresses);
        assert_eq!(retrieved.addresses.default_count(), 1);
    }

    #[tokio::test]
    async fn get_by_email_and_phone() {
        let db = Database::open_in_memory().await.unwrap();
        let account = make_test_account();
        insert(&db, &account).await.unwrap();

        let by_email = get_by_email(&db, "asha@example.com").await.unwrap();
        assert_eq!(by_email.map(|a| a.id), Some(account.id.clone()));

        let by_phone = get_by_phone(&db, "9876543210").await.unwrap();
        assert_eq!(by_phone.map(|a| a.id), Some(account.id));
    }

    #[tokio::test]
    async fn get_nonexistent_account_returns_none() {
        let db = Database::open_in_memory().await.unwrap();

        let result = get_by_id(&db, &AccountId::from("nonexistent"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        insert(&db, &make_test_account()).await.unwrap();

        let mut clash = make_printer_account();
        clash.email = "asha@example.com".to_string();

        assert!(insert(&db, &clash).await.is_err());
        assert_eq!(count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_all_accounts() {
        let db = Database::open_in_memory().await.unwrap();

        insert(&db, &make_test_account()).await.unwrap();
        insert(&db, &make_printer_account()).await.unwrap();

        let accounts = get_all(&db).await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1].addresses.len(), 1);
        assert_eq!(list_ids(&db).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_profile_columns() {
        let db = Database::open_in_memory().await.unwrap();
        let mut account = make_test_account();
        insert(&db, &account).await.unwrap();

        account.name.last_name = "Iyer".to_string();
        account.preferences.language = "kn".to_string();
        assert!(update_profile(&db, &account).await.unwrap());

        let retrieved = get_by_id(&db, &account.id).await.unwrap().unwrap();
        assert_eq!(retrieved.name.last_name, "Iyer");
        assert_eq!(retrieved.preferences.language, "kn");
    }

    #[tokio::test]
    async fn update_missing_account_returns_false() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(!update_profile(&db, &make_test_account()).await.unwrap());
    }

    #[tokio::test]
    async fn update_status() {
        let db = Database::open_in_memory().await.unwrap();
        let account = make_test_account();
        insert(&db, &account).await.unwrap();

        set_status(&db, &account.id, AccountStatus::Suspended)
            .await
            .unwrap();

        let retrieved = get_by_id(&db, &account.id).await.unwrap().unwrap();
        assert_eq!(retrieved.status, AccountStatus::Suspended);
    }

    #[tokio::test]
    async fn delete_account_removes_addresses() {
        let db = Database::open_in_memory().await.unwrap();
        let account = make_printer_account();
        insert(&db, &account).await.unwrap();

        assert!(delete(&db, &account.id).await.unwrap());
        assert!(get_by_id(&db, &account.id).await.unwrap().is_none());
        let orphans: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM addresses", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(!delete(&db, &account.id).await.unwrap());
    }

    #[tokio::test]
    async fn check_exists() {
        let db = Database::open_in_memory().await.unwrap();
        let account = make_test_account();

        assert!(!exists_by_email(&db, "asha@example.com").await.unwrap());

        insert(&db, &account).await.unwrap();

        assert!(exists_by_email(&db, "asha@example.com").await.unwrap());
        assert!(exists_by_phone(&db, "9876543210").await.unwrap());
        assert!(!exists_by_phone(&db, "0000000000").await.unwrap());
    }
}
