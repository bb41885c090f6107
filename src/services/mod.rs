//! Business services layer.
//!
//! Services orchestrate domain operations against storage:
//!
//! ```text
//!   Binary / callers
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//!  Storage (SQLite)
//! ```
//!
//! # Services Overview
//!
//! - [`AccountService`]: Account creation, profile updates and deletion
//! - [`AddressService`]: Address book operations with optimistic versioning

mod account_service;
mod address_service;

pub use account_service::{
    AccountError, AccountResult, AccountService, AccountStats, AccountStorage,
    CreateAccountRequest, ProfileUpdate,
};
pub use address_service::{
    AddressError, AddressResult, AddressService, AddressStorage, RepairReport, StoredAddresses,
};
