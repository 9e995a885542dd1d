//! CSV reports over an index database
//!
//! Two reports, each `path,size` per line with no header:
//! - `diff`: index entries whose content digest has at least one chunk row
//! - `index`: every index entry
//!
//! Row order is whatever SQLite scans; callers must not rely on it.

pub mod csv;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use crate::config::ExportConfig;
use crate::storage::IndexDb;
use crate::Result;
use self::csv::{CsvWriter, render_value};

/// Index entries that have at least one chunk, each listed once
pub const DIFF_QUERY: &str = r#"
SELECT path, size FROM `index`
WHERE EXISTS (SELECT 1 FROM chunk WHERE chunk.file_hash = `index`.hash)
"#;

/// Every index entry
pub const INDEX_QUERY: &str = "SELECT path, size FROM `index`";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Diff,
    Index,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Diff => "diff",
            ReportKind::Index => "index",
        }
    }

    pub fn query(&self) -> &'static str {
        match self {
            ReportKind::Diff => DIFF_QUERY,
            ReportKind::Index => INDEX_QUERY,
        }
    }

    /// Destination of this report under `config`
    pub fn path_in(&self, config: &ExportConfig) -> PathBuf {
        match self {
            ReportKind::Diff => config.diff_path(),
            ReportKind::Index => config.index_path(),
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One written report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub kind: ReportKind,
    pub path: PathBuf,
    pub rows: usize,
}

/// Both reports of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub diff: ExportReport,
    pub index: ExportReport,
}

impl ExportSummary {
    pub fn reports(&self) -> [&ExportReport; 2] {
        [&self.diff, &self.index]
    }
}

/// Runs the report queries against an open database
pub struct Exporter<'a> {
    db: &'a IndexDb,
    config: &'a ExportConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(db: &'a IndexDb, config: &'a ExportConfig) -> Self {
        Self { db, config }
    }

    /// Write the diff report, then the index report.
    ///
    /// Stops at the first failure; a failing index report leaves a fresh diff
    /// report behind.
    pub fn run(&self) -> Result<ExportSummary> {
        let diff = self.export(ReportKind::Diff)?;
        let index = self.export(ReportKind::Index)?;
        Ok(ExportSummary { diff, index })
    }

    pub fn export(&self, kind: ReportKind) -> Result<ExportReport> {
        let path = kind.path_in(self.config);
        let rows = self.export_query(kind.query(), &path)?;
        tracing::info!("Wrote {} rows to {} report {}", rows, kind, path.display());
        Ok(ExportReport { kind, path, rows })
    }

    /// Run `sql` and write every result row as CSV to `dest`, replacing it.
    ///
    /// The statement is prepared before `dest` is opened, so a query against
    /// a missing table leaves `dest` untouched.
    pub fn export_query(&self, sql: &str, dest: &Path) -> Result<usize> {
        tracing::debug!("Preparing query for {}: {}", dest.display(), sql.trim());
        let mut stmt = self.db.connection().prepare(sql)?;
        let columns = stmt.column_count();

        let mut writer = CsvWriter::new(BufWriter::new(File::create(dest)?));
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for i in 0..columns {
                writer.write_field(&render_value(row.get_ref(i)?))?;
            }
            writer.end_record()?;
        }

        let count = writer.records();
        writer.into_inner()?;
        Ok(count)
    }
}

/// Open `db_path` read-only and write both reports
pub fn export_database(db_path: &Path, config: &ExportConfig) -> Result<ExportSummary> {
    let db = IndexDb::open_read_only(db_path)?;
    Exporter::new(&db, config).run()
}
