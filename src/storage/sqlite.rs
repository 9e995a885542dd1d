//! SQLite storage implementation

use std::path::Path;
use rusqlite::{Connection, OpenFlags, Transaction, params};
use crate::Result;
use crate::entry::{ChunkRecord, FileSplits, Hash, IndexEntry, PathBytes, FileNanoTime, SplitInfo};
use super::schema;

/// SQLite-backed content index
pub struct IndexDb {
    conn: Connection,
}

impl IndexDb {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Open an existing database without write access.
    ///
    /// The file is never created and the schema is not applied; queries
    /// against missing tables fail when they are prepared.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        tracing::debug!("Opened {} read-only", path.display());
        Ok(Self { conn })
    }

    /// Create both tables and their indexes if absent. Existing rows are untouched.
    pub fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Underlying connection, for ad-hoc read queries
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction for bulk inserts
    pub fn transaction(&mut self) -> Result<IndexDbTx<'_>> {
        Ok(IndexDbTx(self.conn.transaction()?))
    }

    // ========== Index Operations ==========

    /// All rows of the index table, in scan order
    pub fn select_index_all(&self) -> Result<Vec<IndexEntry>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT path, size, mtime, hash FROM `index`")?;

        let entries = stmt
            .query_map([], |row| {
                let path: PathBytes = row.get(0)?;
                Ok(IndexEntry {
                    path: path.into_path_buf(),
                    size: row.get(1)?,
                    mtime: FileNanoTime(row.get(2)?),
                    hash: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Count index rows
    pub fn count_index_rows(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM `index`", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Chunk Operations ==========

    /// All rows of the chunk table, in scan order
    pub fn select_chunk_all(&self) -> Result<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare_cached(
            r#"SELECT file_hash, chunk_hash, bak_n, "offset", size FROM chunk"#,
        )?;

        let chunks = stmt
            .query_map([], Self::row_to_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(chunks)
    }

    /// Chunks of one file, in decomposition order
    pub fn select_chunks_of(&self, file_hash: &Hash) -> Result<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare_cached(
            r#"SELECT file_hash, chunk_hash, bak_n, "offset", size FROM chunk
               WHERE file_hash = ?1 ORDER BY bak_n, "offset""#,
        )?;

        let chunks = stmt
            .query_map([file_hash], Self::row_to_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(chunks)
    }

    /// Every chunked file with its chunk digests joined into a comma-separated list.
    ///
    /// Files are ordered by digest; chunks by (bak_n, offset).
    pub fn select_file_splits(&self) -> Result<Vec<FileSplits>> {
        let mut stmt = self.conn.prepare_cached(
            r#"SELECT file_hash, chunk_hash FROM chunk ORDER BY file_hash, bak_n, "offset""#,
        )?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get::<_, Hash>(0)?, row.get::<_, Hash>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut splits = Vec::new();
        let mut current: Option<(Hash, Vec<Hash>)> = None;
        for (file_hash, chunk_hash) in pairs {
            match current.as_mut() {
                Some((h, chunks)) if *h == file_hash => chunks.push(chunk_hash),
                _ => {
                    if let Some((h, chunks)) = current.take() {
                        splits.push(FileSplits::from_chunks(h, &chunks));
                    }
                    current = Some((file_hash, vec![chunk_hash]));
                }
            }
        }
        if let Some((h, chunks)) = current {
            splits.push(FileSplits::from_chunks(h, &chunks));
        }

        Ok(splits)
    }

    /// Count chunk rows
    pub fn count_chunk_rows(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM chunk", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            index_rows: self.count_index_rows()?,
            chunk_rows: self.count_chunk_rows()?,
        })
    }

    fn row_to_chunk(row: &rusqlite::Row) -> rusqlite::Result<ChunkRecord> {
        Ok(ChunkRecord {
            file_hash: row.get(0)?,
            chunk_hash: row.get(1)?,
            bak_n: row.get(2)?,
            offset: row.get(3)?,
            size: row.get(4)?,
        })
    }
}

/// Write transaction over an `IndexDb`. Rolled back on drop unless committed.
pub struct IndexDbTx<'a>(Transaction<'a>);

impl IndexDbTx<'_> {
    /// Insert an index row. Fails on a duplicate path.
    pub fn insert_index_entry(&self, entry: &IndexEntry) -> Result<()> {
        let mut stmt = self
            .0
            .prepare_cached("INSERT INTO `index` (path, size, mtime, hash) VALUES (?1, ?2, ?3, ?4)")?;
        stmt.execute(params![
            PathBytes::from_path(&entry.path),
            entry.size,
            entry.mtime.0,
            entry.hash,
        ])?;
        Ok(())
    }

    /// Insert a chunk row
    pub fn insert_chunk_record(&self, record: &ChunkRecord) -> Result<()> {
        let mut stmt = self.0.prepare_cached(
            r#"INSERT INTO chunk (file_hash, chunk_hash, bak_n, "offset", size) VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )?;
        stmt.execute(params![
            record.file_hash,
            record.chunk_hash,
            record.bak_n,
            record.offset,
            record.size,
        ])?;
        Ok(())
    }

    /// Insert one chunk row per chunk of every file
    pub fn insert_split_info(&self, splits: &[SplitInfo]) -> Result<()> {
        for split in splits {
            for record in split.records() {
                self.insert_chunk_record(&record)?;
            }
        }
        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        self.0.commit()?;
        Ok(())
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStats {
    pub index_rows: usize,
    pub chunk_rows: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Index rows: {}", self.index_rows)?;
        writeln!(f, "  Chunk rows: {}", self.chunk_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(path: &str, size: u64, content: &[u8]) -> IndexEntry {
        IndexEntry::new(path, size, FileNanoTime(1_700_000_000_000_000_000), Hash::of(content))
    }

    fn chunk(file: &[u8], data: &[u8], bak_n: u32, offset: u64) -> ChunkRecord {
        ChunkRecord {
            file_hash: Hash::of(file),
            chunk_hash: Hash::of(data),
            bak_n,
            offset,
            size: data.len() as u64,
        }
    }

    #[test]
    fn test_index_crud() {
        let mut db = IndexDb::open_in_memory().unwrap();

        let tx = db.transaction().unwrap();
        tx.insert_index_entry(&sample_entry("a.txt", 10, b"a")).unwrap();
        tx.insert_index_entry(&sample_entry("b.txt", 20, b"b")).unwrap();
        tx.commit().unwrap();

        let mut entries = db.select_index_all().unwrap();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(entries, vec![sample_entry("a.txt", 10, b"a"), sample_entry("b.txt", 20, b"b")]);
        assert_eq!(db.count_index_rows().unwrap(), 2);
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let mut db = IndexDb::open_in_memory().unwrap();
        let tx = db.transaction().unwrap();
        tx.insert_index_entry(&sample_entry("a.txt", 10, b"a")).unwrap();
        assert!(tx.insert_index_entry(&sample_entry("a.txt", 11, b"other")).is_err());
    }

    #[test]
    fn test_uncommitted_transaction_rolls_back() {
        let mut db = IndexDb::open_in_memory().unwrap();
        {
            let tx = db.transaction().unwrap();
            tx.insert_index_entry(&sample_entry("a.txt", 10, b"a")).unwrap();
        }
        assert_eq!(db.count_index_rows().unwrap(), 0);
    }

    #[test]
    fn test_schema_initialization_is_idempotent() {
        let mut db = IndexDb::open_in_memory().unwrap();
        let tx = db.transaction().unwrap();
        tx.insert_index_entry(&sample_entry("a.txt", 10, b"a")).unwrap();
        tx.insert_chunk_record(&chunk(b"a", b"a", 0, 0)).unwrap();
        tx.commit().unwrap();

        db.initialize_schema().unwrap();
        db.initialize_schema().unwrap();

        assert_eq!(db.stats().unwrap(), DbStats { index_rows: 1, chunk_rows: 1 });
    }

    #[test]
    fn test_reopen_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        {
            let mut db = IndexDb::open(&path).unwrap();
            let tx = db.transaction().unwrap();
            tx.insert_index_entry(&sample_entry("a.txt", 10, b"a")).unwrap();
            tx.commit().unwrap();
        }
        let db = IndexDb::open(&path).unwrap();
        assert_eq!(db.count_index_rows().unwrap(), 1);
    }

    #[test]
    fn test_read_only_open() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.db");
        assert!(IndexDb::open_read_only(&missing).is_err());
        assert!(!missing.exists());

        let path = dir.path().join("index.db");
        drop(IndexDb::open(&path).unwrap());
        let db = IndexDb::open_read_only(&path).unwrap();
        assert_eq!(db.count_index_rows().unwrap(), 0);
        assert!(db.connection().execute("DELETE FROM chunk", []).is_err());
    }

    #[test]
    fn test_split_info_insert_and_order() {
        let mut db = IndexDb::open_in_memory().unwrap();
        let file_hash = Hash::of(b"big");
        let split = SplitInfo {
            file_hash,
            chunks: vec![
                crate::ChunkInfo { hash: Hash::of(b"c0"), bak_n: 0, offset: 96, size: 32 },
                crate::ChunkInfo { hash: Hash::of(b"c1"), bak_n: 1, offset: 0, size: 32 },
                crate::ChunkInfo { hash: Hash::of(b"c2"), bak_n: 1, offset: 32, size: 8 },
            ],
        };
        let tx = db.transaction().unwrap();
        // Insert out of order to make sure reads sort
        tx.insert_chunk_record(&split.records().nth(2).unwrap()).unwrap();
        tx.insert_chunk_record(&split.records().next().unwrap()).unwrap();
        tx.insert_chunk_record(&split.records().nth(1).unwrap()).unwrap();
        tx.insert_chunk_record(&chunk(b"small", b"s0", 0, 0)).unwrap();
        tx.commit().unwrap();

        let chunks = db.select_chunks_of(&file_hash).unwrap();
        let hashes: Vec<Hash> = chunks.iter().map(|c| c.chunk_hash).collect();
        assert_eq!(hashes, vec![Hash::of(b"c0"), Hash::of(b"c1"), Hash::of(b"c2")]);
        assert_eq!(db.select_chunk_all().unwrap().len(), 4);

        let splits = db.select_file_splits().unwrap();
        assert_eq!(splits.len(), 2);
        let big = splits.iter().find(|s| s.file_hash == file_hash).unwrap();
        assert_eq!(big.chunk_hashes().unwrap(), hashes);
    }

    #[test]
    fn test_insert_split_info() {
        let mut db = IndexDb::open_in_memory().unwrap();
        let splits = vec![
            SplitInfo {
                file_hash: Hash::of(b"x"),
                chunks: vec![crate::ChunkInfo { hash: Hash::of(b"x0"), bak_n: 0, offset: 0, size: 1 }],
            },
            SplitInfo { file_hash: Hash::of(b"y"), chunks: Vec::new() },
        ];
        let tx = db.transaction().unwrap();
        tx.insert_split_info(&splits).unwrap();
        tx.commit().unwrap();
        assert_eq!(db.count_chunk_rows().unwrap(), 1);
    }
}
