//! # RotaBot Store
//!
//! `HistoryStore` backends:
//! - [`sqlite`] — durable SQLite-backed store, the production default.
//! - [`memory`] — in-memory store with fault injection, for tests.
//!
//! Both expose the same access pattern the resolver relies on: a full
//! scan of the history collection (no secondary index) and an append.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;
