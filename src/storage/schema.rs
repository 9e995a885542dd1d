//! Database schema definitions

/// SQL to create the index table
///
/// One row per indexed file; `path` is unique.
pub const CREATE_INDEX_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `index` (
    path BLOB NOT NULL UNIQUE,
    size INTEGER NOT NULL,
    mtime INTEGER NOT NULL,
    hash BLOB NOT NULL
)
"#;

/// SQL to create the chunk table
/// One row per chunk; a file's chunks share `file_hash` and are ordered by (bak_n, offset)
pub const CREATE_CHUNK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS chunk (
    file_hash BLOB NOT NULL,
    chunk_hash BLOB NOT NULL,
    bak_n INTEGER NOT NULL,
    "offset" INTEGER NOT NULL,
    size INTEGER NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_index_hash ON `index`(hash)",
    "CREATE INDEX IF NOT EXISTS idx_chunk_file_hash ON chunk(file_hash)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_INDEX_TABLE, CREATE_CHUNK_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
