//! atelier - Account and address book management for a print marketplace
//!
//! This crate provides the domain model for accounts and their address
//! books, the services that mutate them, and SQLite storage. The address
//! book keeps at most one default address at all times.

pub mod config;
pub mod domain;
pub mod services;
pub mod storage;
