//! SQL schema definitions as const strings.
//!
//! Contains the complete SQLite schema for accounts and their address books.

/// SQL to create the accounts table.
///
/// `address_version` is bumped on every address book write and guards
/// concurrent read-modify-write cycles.
pub const CREATE_ACCOUNTS: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    phone TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL DEFAULT 'user',
    status TEXT NOT NULL DEFAULT 'active',
    preferences TEXT NOT NULL,
    address_version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create account indexes.
pub const CREATE_ACCOUNT_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_accounts_role ON accounts(role);
CREATE INDEX IF NOT EXISTS idx_accounts_status ON accounts(status)
"#;

/// SQL to create the addresses table.
pub const CREATE_ADDRESSES: &str = r#"
CREATE TABLE IF NOT EXISTS addresses (
    account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    id TEXT NOT NULL,
    position INTEGER NOT NULL,
    label TEXT NOT NULL DEFAULT 'home',
    street TEXT NOT NULL,
    apartment TEXT,
    city TEXT NOT NULL,
    state TEXT NOT NULL,
    zip TEXT NOT NULL,
    country TEXT NOT NULL,
    landmark TEXT,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (account_id, id)
)
"#;

/// SQL to create address indexes.
///
/// The partial unique index caps every account at one default address.
pub const CREATE_ADDRESS_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_addresses_position ON addresses(account_id, position);
CREATE UNIQUE INDEX IF NOT EXISTS idx_addresses_one_default ON addresses(account_id) WHERE is_default = 1
"#;

/// Returns all migration statements in order.
pub fn all_migrations() -> Vec<&'static str> {
    vec![
        CREATE_ACCOUNTS,
        CREATE_ACCOUNT_INDEXES,
        CREATE_ADDRESSES,
        CREATE_ADDRESS_INDEXES,
    ]
}
