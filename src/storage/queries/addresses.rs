//! Address book persistence.
//!
//! A book is stored as ordered rows in `addresses`; its version lives on
//! the owning `accounts` row. Writes replace the whole list in one
//! transaction after a compare-and-set on the version.

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::parse_timestamp;
use crate::domain::{AccountId, Address, AddressId, AddressLabel};
use crate::services::StoredAddresses;
use crate::storage::database::{Database, Result};

/// Loads an account's addresses with the current version.
///
/// Returns `None` when the account does not exist.
pub async fn load(db: &Database, account_id: &AccountId) -> Result<Option<StoredAddresses>> {
    let account_id = account_id.clone();

    db.with_conn(move |conn| {
        let version: Option<i64> = conn
            .query_row(
                "SELECT address_version FROM accounts WHERE id = ?1",
                [&account_id.0],
                |row| row.get(0),
            )
            .optional()?;

        let Some(version) = version else {
            return Ok(None);
        };

        let addresses = load_rows(conn, &account_id)?;
        Ok(Some(StoredAddresses {
            version: version as u64,
            addresses,
        }))
    })
    .await
}

/// Replaces an account's addresses if the stored version still matches.
///
/// Returns the new version, or `None` when the version moved on or the
/// account no longer exists.
pub async fn save(
    db: &Database,
    account_id: &AccountId,
    expected_version: u64,
    addresses: Vec<Address>,
) -> Result<Option<u64>> {
    let account_id = account_id.clone();

    db.transaction(move |tx| {
        let now = Utc::now().to_rfc3339();
        let updated = tx.execute(
            "UPDATE accounts
             SET address_version = address_version + 1, updated_at = ?1
             WHERE id = ?2 AND address_version = ?3",
            params![now, account_id.0, expected_version as i64],
        )?;
        if updated == 0 {
            return Ok(None);
        }

        replace_rows(tx, &account_id, &addresses)?;
        Ok(Some(expected_version + 1))
    })
    .await
}

/// Reads an account's addresses in book order.
pub(crate) fn load_rows(
    conn: &Connection,
    account_id: &AccountId,
) -> rusqlite::Result<Vec<Address>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT
            id, label, street, apartment, city, state, zip, country,
            landmark, is_default, created_at, updated_at
        FROM addresses
        WHERE account_id = ?1
        ORDER BY position
        "#,
    )?;

    let rows = stmt.query_map([&account_id.0], row_to_address)?;
    rows.collect()
}

/// Overwrites an account's address rows with `addresses`, in order.
pub(crate) fn replace_rows(
    conn: &Connection,
    account_id: &AccountId,
    addresses: &[Address],
) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM addresses WHERE account_id = ?1",
        [&account_id.0],
    )?;

    let mut stmt = conn.prepare(
        r#"
        INSERT INTO addresses (
            account_id, id, position, label, street, apartment, city, state,
            zip, country, landmark, is_default, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14
        )
        "#,
    )?;

    for (position, address) in addresses.iter().enumerate() {
        stmt.execute(params![
            account_id.0,
            address.id.0,
            position as i64,
            address.label.as_str(),
            address.street,
            address.apartment,
            address.city,
            address.state,
            address.zip,
            address.country,
            address.landmark,
            address.is_default as i32,
            address.created_at.to_rfc3339(),
            address.updated_at.to_rfc3339(),
        ])?;
    }

    Ok(())
}

fn row_to_address(row: &Row<'_>) -> std::result::Result<Address, rusqlite::Error> {
    let label: String = row.get(1)?;
    let label: AddressLabel = label
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(Address {
        id: AddressId(row.get(0)?),
        label,
        street: row.get(2)?,
        apartment: row.get(3)?,
        city: row.get(4)?,
        state: row.get(5)?,
        zip: row.get(6)?,
        country: row.get(7)?,
        landmark: row.get(8)?,
        is_default: row.get::<_, i32>(9)? != 0,
        created_at: parse_timestamp(10, &created_at)?,
        updated_at: parse_timestamp(11, &updated_at)?,
    })
}
