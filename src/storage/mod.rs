//! Storage Layer - SQLite-backed content index
//!
//! System of record is SQLite with tables:
//! - index(path, size, mtime, hash)
//! - chunk(file_hash, chunk_hash, bak_n, offset, size)

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, IndexDb, IndexDbTx};
