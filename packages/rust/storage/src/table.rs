//! Whole-file CSV reads and rewrites.

use std::path::Path;

use seopipe_shared::{Result, SeoPipeError};

/// An in-memory copy of one CSV file: the header row plus every non-blank
/// data row, exactly as many cells as each physical line carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn with_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// A header row exists and at least one of its cells is non-blank.
    pub fn has_header(&self) -> bool {
        self.headers.iter().any(|h| !h.trim().is_empty())
    }

    /// Index of a column by name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Names from `required` that the header does not carry.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| self.column(name).is_none())
            .collect()
    }
}

/// Read `path` into a [`Table`]. Header cells are trimmed; rows made only of
/// blank cells are dropped.
pub(crate) fn read_table(path: &Path) -> Result<Table> {
    let bytes = std::fs::read(path).map_err(|e| SeoPipeError::io(path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let mut records = reader.records();

    let headers = match records.next() {
        Some(record) => record
            .map_err(|e| csv_error(path, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| csv_error(path, e))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}

/// Replace the contents of `path` with `table`, creating parent directories.
pub(crate) fn write_table(path: &Path, table: &Table) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SeoPipeError::io(parent, e))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer
        .write_record(&table.headers)
        .map_err(|e| csv_error(path, e))?;
    for row in &table.rows {
        writer.write_record(row).map_err(|e| csv_error(path, e))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| SeoPipeError::Storage(format!("{}: {e}", path.display())))?;

    std::fs::write(path, bytes).map_err(|e| SeoPipeError::io(path, e))
}

fn csv_error(path: &Path, e: csv::Error) -> SeoPipeError {
    SeoPipeError::Storage(format!("{}: {e}", path.display()))
}
