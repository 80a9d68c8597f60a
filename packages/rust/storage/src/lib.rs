//! CSV-backed state for the pipelines.
//!
//! Every operation reads the whole file, works on it in memory, and rewrites
//! it in one go. The public functions never return errors: an I/O or CSV
//! problem is logged and reported as "no effect" (an empty list, `false`, or
//! [`UpsertOutcome::Failed`]) so a batch can move on to its next unit of work.
//!
//! [`CsvStore`] wraps these generic operations with the file names, columns,
//! and record types of each pipeline file.

mod store;
mod table;

use std::path::Path;

use seopipe_shared::{Fields, Result, SeoPipeError};
use tracing::{debug, error, info, instrument, warn};

use table::{Table, read_table, write_table};

pub use store::CsvStore;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Which flag values make a row eligible for processing.
///
/// Comparison trims the cell and ignores ASCII case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagFilter {
    /// Only rows explicitly flagged `No`.
    No,
    /// Rows flagged `No` or left blank.
    NoOrBlank,
    /// Only rows flagged `Yes`.
    Yes,
}

impl FlagFilter {
    pub fn matches(self, flag: &str) -> bool {
        let flag = flag.trim();
        match self {
            Self::No => flag.eq_ignore_ascii_case("no"),
            Self::NoOrBlank => flag.is_empty() || flag.eq_ignore_ascii_case("no"),
            Self::Yes => flag.eq_ignore_ascii_case("yes"),
        }
    }
}

/// What [`upsert_by_key`] did to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// One or more rows with the key were overwritten.
    Updated,
    /// No row matched; a new row was appended.
    Appended,
    /// The file did not exist and was created with this row.
    Created,
    /// Nothing was written.
    Failed,
}

impl UpsertOutcome {
    pub fn is_written(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

fn key_matches(cell: &str, key: &str) -> bool {
    cell.trim() == key.trim()
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Create `path` containing only `headers` if it does not exist yet.
///
/// Returns `true` when the file was created.
pub fn ensure_with_headers(path: &Path, headers: &[&str]) -> bool {
    if path.exists() {
        return false;
    }

    match write_table(path, &Table::with_headers(headers)) {
        Ok(()) => {
            info!(path = %path.display(), "created CSV file with headers");
            true
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to create CSV file");
            false
        }
    }
}

/// Rows whose `key_col` is non-blank and whose `flag_col` passes `filter`,
/// in file order. The key value of each returned row is trimmed.
///
/// A missing file is recreated with `canonical` headers.
#[instrument(skip_all, fields(path = %path.display(), key_col = key_col, flag_col = flag_col))]
pub fn read_eligible(
    path: &Path,
    canonical: &[&str],
    key_col: &str,
    flag_col: &str,
    filter: FlagFilter,
) -> Vec<Fields> {
    match try_read_eligible(path, key_col, flag_col, filter) {
        Ok(rows) => {
            debug!(eligible = rows.len(), "read eligible rows");
            rows
        }
        Err(e) if e.is_not_found() => {
            warn!("file not found, initializing it");
            ensure_with_headers(path, canonical);
            Vec::new()
        }
        Err(e) => {
            error!(error = %e, "failed to read eligible rows");
            Vec::new()
        }
    }
}

fn try_read_eligible(
    path: &Path,
    key_col: &str,
    flag_col: &str,
    filter: FlagFilter,
) -> Result<Vec<Fields>> {
    let table = read_table(path)?;

    let missing = table.missing(&[key_col, flag_col]);
    if !missing.is_empty() {
        return Err(SeoPipeError::validation(format!(
            "{} is missing required columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let mut eligible = Vec::new();
    for row in &table.rows {
        let mut fields = Fields::from_row(&table.headers, row);

        let key = fields.get_or_empty(key_col).trim().to_string();
        if key.is_empty() {
            continue;
        }
        if !filter.matches(fields.get_or_empty(flag_col)) {
            continue;
        }

        fields.set(key_col, key);
        eligible.push(fields);
    }

    Ok(eligible)
}

/// Update every row whose `key_col` equals the key in `new_fields`, or append
/// one row if none does.
///
/// Matching rows are rebuilt to the header's width: each column takes the
/// value from `new_fields` when present, else its old value, else blank. A
/// blank or absent header row is replaced by `canonical` and the rows under
/// it are discarded. A missing file is created with `canonical` headers.
#[instrument(skip_all, fields(path = %path.display(), key_col = key_col))]
pub fn upsert_by_key(
    path: &Path,
    canonical: &[&str],
    key_col: &str,
    new_fields: &Fields,
) -> UpsertOutcome {
    let Some(key) = new_fields.get(key_col) else {
        error!("record has no value for the key column, nothing written");
        return UpsertOutcome::Failed;
    };

    match try_upsert(path, canonical, key_col, key, new_fields) {
        Ok(outcome) => {
            info!(key = %key, ?outcome, "upserted row");
            outcome
        }
        Err(e) => {
            error!(key = %key, error = %e, "failed to upsert row");
            UpsertOutcome::Failed
        }
    }
}

fn try_upsert(
    path: &Path,
    canonical: &[&str],
    key_col: &str,
    key: &str,
    new_fields: &Fields,
) -> Result<UpsertOutcome> {
    let mut table = match read_table(path) {
        Ok(table) => table,
        Err(e) if e.is_not_found() => {
            let mut table = Table::with_headers(canonical);
            table.rows.push(new_fields.project(canonical));
            write_table(path, &table)?;
            return Ok(UpsertOutcome::Created);
        }
        Err(e) => return Err(e),
    };

    if !table.has_header() {
        warn!("file has no valid header, rewriting it with canonical headers");
        table = Table::with_headers(canonical);
    }

    let key_idx = table.column(key_col);
    if key_idx.is_none() {
        warn!("key column not in header, row will be appended");
    }

    let mut updated = false;
    if let Some(key_idx) = key_idx {
        for row in &mut table.rows {
            if !row.get(key_idx).is_some_and(|cell| key_matches(cell, key)) {
                continue;
            }

            *row = table
                .headers
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    new_fields
                        .get(name)
                        .or_else(|| row.get(i).map(String::as_str))
                        .unwrap_or("")
                        .to_string()
                })
                .collect();
            updated = true;
        }
    }

    let outcome = if updated {
        UpsertOutcome::Updated
    } else {
        table.rows.push(new_fields.project(&table.headers));
        UpsertOutcome::Appended
    };

    write_table(path, &table)?;
    Ok(outcome)
}

/// Set `flag_col` to `value` on every row whose `key_col` equals `key`.
///
/// No other cell is touched. Blank rows are stripped on rewrite. A matching
/// row too short to have a flag cell is left unmarked. Returns whether any
/// row was marked.
#[instrument(skip_all, fields(path = %path.display(), key = %key))]
pub fn mark_flag(path: &Path, key_col: &str, flag_col: &str, key: &str, value: &str) -> bool {
    match try_mark_flag(path, key_col, flag_col, key, value) {
        Ok(marked) => marked,
        Err(e) => {
            error!(error = %e, "failed to mark row");
            false
        }
    }
}

fn try_mark_flag(
    path: &Path,
    key_col: &str,
    flag_col: &str,
    key: &str,
    value: &str,
) -> Result<bool> {
    let mut table = read_table(path)?;

    if !table.has_header() {
        warn!("file has no valid header, leaving it untouched");
        return Ok(false);
    }

    let (Some(key_idx), Some(flag_idx)) = (table.column(key_col), table.column(flag_col)) else {
        warn!(
            missing = ?table.missing(&[key_col, flag_col]),
            "required columns not in header, nothing marked"
        );
        write_table(path, &table)?;
        return Ok(false);
    };

    let mut found = false;
    let mut marked = false;
    for row in &mut table.rows {
        if !row.get(key_idx).is_some_and(|cell| key_matches(cell, key)) {
            continue;
        }
        found = true;

        match row.get_mut(flag_idx) {
            Some(cell) => {
                *cell = value.to_string();
                marked = true;
            }
            None => warn!(
                cells = row.len(),
                flag_index = flag_idx,
                "matching row is too short to hold the flag, left unmarked"
            ),
        }
    }

    if !found {
        warn!("no row with this key, nothing marked");
    }

    write_table(path, &table)?;

    if marked {
        info!(flag = flag_col, value = %value, "row marked");
    }
    Ok(marked)
}

/// Overwrite the columns in `new_fields` on every row whose `key_col` equals
/// `key`. Never appends.
///
/// All of `required` must be in the header. Matching short rows are padded to
/// the header's width first. Returns `false` and leaves the file untouched
/// when no row has the key.
#[instrument(skip_all, fields(path = %path.display(), key = %key))]
pub fn update_by_key(
    path: &Path,
    required: &[&str],
    key_col: &str,
    key: &str,
    new_fields: &Fields,
) -> bool {
    match try_update_by_key(path, required, key_col, key, new_fields) {
        Ok(updated) => updated,
        Err(e) => {
            error!(error = %e, "failed to update row");
            false
        }
    }
}

fn try_update_by_key(
    path: &Path,
    required: &[&str],
    key_col: &str,
    key: &str,
    new_fields: &Fields,
) -> Result<bool> {
    let mut table = read_table(path)?;

    let missing = table.missing(required);
    if !missing.is_empty() {
        return Err(SeoPipeError::validation(format!(
            "{} is missing required columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let key_idx = table
        .column(key_col)
        .ok_or_else(|| SeoPipeError::validation(format!("no '{key_col}' column")))?;

    let width = table.headers.len();
    let targets: Vec<(usize, &str)> = new_fields
        .iter()
        .filter_map(|(name, value)| table.column(name).map(|idx| (idx, value)))
        .collect();

    let mut updated = false;
    for row in &mut table.rows {
        if !row.get(key_idx).is_some_and(|cell| key_matches(cell, key)) {
            continue;
        }
        if row.len() < width {
            row.resize(width, String::new());
        }
        for &(idx, value) in &targets {
            row[idx] = value.to_string();
        }
        updated = true;
    }

    if !updated {
        warn!("no row with this key, file left unchanged");
        return Ok(false);
    }

    write_table(path, &table)?;
    info!("row updated");
    Ok(true)
}

/// Append `records` projected onto the file's header (absent columns become
/// blank). Existing rows are kept as they are.
///
/// A missing file, or one without a valid header, is written fresh with
/// `canonical` headers. Returns the number of rows appended.
#[instrument(skip_all, fields(path = %path.display(), records = records.len()))]
pub fn append_many(path: &Path, canonical: &[&str], records: &[Fields]) -> usize {
    if records.is_empty() {
        debug!("nothing to append");
        return 0;
    }

    match try_append_many(path, canonical, records) {
        Ok(appended) => {
            info!(appended, "rows appended");
            appended
        }
        Err(e) => {
            error!(error = %e, "failed to append rows");
            0
        }
    }
}

fn try_append_many(path: &Path, canonical: &[&str], records: &[Fields]) -> Result<usize> {
    let mut table = match read_table(path) {
        Ok(table) => table,
        Err(e) if e.is_not_found() => Table::default(),
        Err(e) => return Err(e),
    };

    if !table.has_header() {
        warn!("file has no valid header, writing canonical headers");
        table = Table::with_headers(canonical);
    }

    for record in records {
        table.rows.push(record.project(&table.headers));
    }

    write_table(path, &table)?;
    Ok(records.len())
}

/// Every cell of `column`, in file order. Rows too short to reach the column
/// are skipped.
#[instrument(skip_all, fields(path = %path.display(), column = column))]
pub fn read_column(path: &Path, column: &str) -> Vec<String> {
    let table = match read_table(path) {
        Ok(table) => table,
        Err(e) if e.is_not_found() => {
            warn!("file not found");
            return Vec::new();
        }
        Err(e) => {
            error!(error = %e, "failed to read column");
            return Vec::new();
        }
    };

    let Some(idx) = table.column(column) else {
        warn!("column not in header");
        return Vec::new();
    };

    table
        .rows
        .iter()
        .filter_map(|row| row.get(idx).cloned())
        .collect()
}
