//! Index entry types - rows of the `index` and `chunk` tables
//!
//! - `IndexEntry`: one indexed file (path, size, mtime, whole-file digest)
//! - `ChunkRecord`: one chunk of a file, located inside a numbered backup container
//! - `SplitInfo`: all chunks of one file, as the backup side produces them
//! - `FileSplits`: comma-separated chunk digests of one file

use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Half of a 32-byte BLAKE3 digest is stored.
pub const HASH_SIZE: usize = 16;

/// Content digest of a file or of a single chunk.
#[derive(Default, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Hash(pub [u8; HASH_SIZE]);

impl Hash {
    /// Digest of `data`, truncated to `HASH_SIZE` bytes
    pub fn of(data: &[u8]) -> Self {
        blake3::hash(data).into()
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl From<blake3::Hash> for Hash {
    fn from(value: blake3::Hash) -> Self {
        let mut half = Hash::default();
        half.0.copy_from_slice(&value.as_bytes()[..HASH_SIZE]);
        half
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl FromStr for Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut hash = Hash::default();
        hex::decode_to_slice(s, &mut hash.0)
            .map_err(|e| Error::InvalidHash(format!("{}: {}", s, e)))?;
        Ok(hash)
    }
}

impl ToSql for Hash {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Blob(&self.0)))
    }
}

impl FromSql for Hash {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        <[u8; HASH_SIZE]>::column_result(value).map(Hash)
    }
}

/// Raw bytes of a `Path`.
///
/// On Unix a path is naturally a byte string. Elsewhere it goes through UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBytes(pub Vec<u8>);

impl PathBytes {
    pub fn from_path(path: &Path) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStrExt;
            Self(path.as_os_str().as_bytes().to_vec())
        }
        #[cfg(not(unix))]
        {
            Self(path.to_string_lossy().into_owned().into_bytes())
        }
    }

    pub fn into_path_buf(self) -> PathBuf {
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStringExt;
            std::ffi::OsString::from_vec(self.0).into()
        }
        #[cfg(not(unix))]
        {
            String::from_utf8_lossy(&self.0).into_owned().into()
        }
    }
}

impl ToSql for PathBytes {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Blob(&self.0)))
    }
}

impl FromSql for PathBytes {
    // Other tools may have written the path as TEXT
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Blob(b) | ValueRef::Text(b) => Ok(PathBytes(b.to_vec())),
            _ => Err(rusqlite::types::FromSqlError::InvalidType),
        }
    }
}

/// File modification time in nanoseconds since the Unix epoch.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug, Default)]
pub struct FileNanoTime(pub u64);

impl From<SystemTime> for FileNanoTime {
    fn from(value: SystemTime) -> Self {
        let nanos = value
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// A row of the `index` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Path of the file, relative to the backup source
    pub path: PathBuf,
    /// Size in bytes at indexing time
    pub size: u64,
    pub mtime: FileNanoTime,
    /// Whole-file content digest
    pub hash: Hash,
}

impl IndexEntry {
    pub fn new(path: impl Into<PathBuf>, size: u64, mtime: FileNanoTime, hash: Hash) -> Self {
        Self {
            path: path.into(),
            size,
            mtime,
            hash,
        }
    }
}

/// A row of the `chunk` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    /// Digest of the whole file this chunk belongs to
    pub file_hash: Hash,
    /// Digest of this chunk's bytes
    pub chunk_hash: Hash,
    /// Number of the backup container holding the chunk data
    pub bak_n: u32,
    /// Byte offset inside that container
    pub offset: u64,
    pub size: u64,
}

/// Location of one chunk inside the backup containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    pub hash: Hash,
    pub bak_n: u32,
    pub offset: u64,
    pub size: u64,
}

/// Ordered chunk decomposition of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitInfo {
    pub file_hash: Hash,
    pub chunks: Vec<ChunkInfo>,
}

impl SplitInfo {
    /// One `chunk` row per chunk, in decomposition order
    pub fn records(&self) -> impl Iterator<Item = ChunkRecord> + '_ {
        self.chunks.iter().map(|c| ChunkRecord {
            file_hash: self.file_hash,
            chunk_hash: c.hash,
            bak_n: c.bak_n,
            offset: c.offset,
            size: c.size,
        })
    }
}

/// A file digest paired with its chunk digests as a comma-separated hex list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSplits {
    pub file_hash: Hash,
    pub splits: String,
}

impl FileSplits {
    pub fn from_chunks<'a>(file_hash: Hash, chunks: impl IntoIterator<Item = &'a Hash>) -> Self {
        let splits = chunks
            .into_iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self { file_hash, splits }
    }

    /// Parse the chunk digests back out of `splits`
    pub fn chunk_hashes(&self) -> Result<Vec<Hash>> {
        if self.splits.is_empty() {
            return Ok(Vec::new());
        }
        self.splits.split(',').map(Hash::from_str).collect()
    }
}
