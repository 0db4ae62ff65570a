//! SQLite backend for the silverwatch monitoring store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The change feed is a journal table
//! filled by triggers on the status table.

mod encode;
mod feed;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use feed::SqliteFeed;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
