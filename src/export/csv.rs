//! Minimal CSV record writer
//!
//! Matches the sqlite3 shell's `.mode csv` output closely enough for the
//! reports: no header, `,` separator, `\n` terminator, quoting only where a
//! field would otherwise be ambiguous.

use std::borrow::Cow;
use std::io::{self, Write};
use rusqlite::types::ValueRef;

pub const SEPARATOR: u8 = b',';
pub const TERMINATOR: u8 = b'\n';

/// Whether a field needs to be wrapped in double quotes
pub fn needs_quoting(field: &[u8]) -> bool {
    field
        .iter()
        .any(|&b| b == SEPARATOR || b == b'"' || b == b'\r' || b == b'\n')
}

/// Render a column value the way sqlite3 prints it in csv mode
pub fn render_value(value: ValueRef<'_>) -> Cow<'_, [u8]> {
    match value {
        ValueRef::Null => Cow::Borrowed(&[]),
        ValueRef::Integer(i) => Cow::Owned(i.to_string().into_bytes()),
        ValueRef::Real(f) => Cow::Owned(f.to_string().into_bytes()),
        ValueRef::Text(t) => Cow::Borrowed(t),
        ValueRef::Blob(b) => Cow::Borrowed(b),
    }
}

pub struct CsvWriter<W: Write> {
    inner: W,
    at_record_start: bool,
    records: usize,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            at_record_start: true,
            records: 0,
        }
    }

    /// Append one field to the current record
    pub fn write_field(&mut self, field: &[u8]) -> io::Result<()> {
        if !self.at_record_start {
            self.inner.write_all(&[SEPARATOR])?;
        }
        self.at_record_start = false;

        if !needs_quoting(field) {
            return self.inner.write_all(field);
        }

        self.inner.write_all(b"\"")?;
        for (i, part) in field.split(|&b| b == b'"').enumerate() {
            if i > 0 {
                self.inner.write_all(b"\"\"")?;
            }
            self.inner.write_all(part)?;
        }
        self.inner.write_all(b"\"")
    }

    /// Terminate the current record
    pub fn end_record(&mut self) -> io::Result<()> {
        self.inner.write_all(&[TERMINATOR])?;
        self.at_record_start = true;
        self.records += 1;
        Ok(())
    }

    pub fn write_record<'f>(&mut self, fields: impl IntoIterator<Item = &'f [u8]>) -> io::Result<()> {
        for field in fields {
            self.write_field(field)?;
        }
        self.end_record()
    }

    /// Number of records terminated so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
