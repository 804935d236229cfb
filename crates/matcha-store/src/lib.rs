//! # matcha-store
//!
//! Persisted client state for the Matcha client.
//!
//! The only state that survives a restart is the bearer token and the
//! minimal user identity. Both live in a small key-value table in a local
//! SQLite database. Every write is announced on a broadcast channel so
//! that all client instances sharing the store can reconcile when another
//! one logs in or out.

pub mod database;
pub mod kv;
pub mod migrations;
pub mod session;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use kv::{KeyValueStore, MemoryStore, SqliteStore, StorageEvent};
pub use session::SessionStorage;
