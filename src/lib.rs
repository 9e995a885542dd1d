//! # Bakindex - backup content index tooling
//!
//! Owns the SQLite schema of the `index`/`chunk` table pair written by a
//! deduplicating backup tool, and exports it as plain CSV reports.
//!
//! Bakindex provides:
//! - Idempotent schema creation for the `index` and `chunk` tables
//! - A typed database handle with transactional inserts and typed selects
//! - The `diff`/`index` CSV exporter used by the `bakindex` binary

pub mod entry;
pub mod storage;
pub mod export;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use entry::{ChunkInfo, ChunkRecord, FileNanoTime, FileSplits, Hash, IndexEntry, PathBytes, SplitInfo};
pub use storage::IndexDb;
pub use export::{ExportReport, ExportSummary, Exporter};
pub use config::ExportConfig;

/// Result type alias for Bakindex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Bakindex operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),
}
