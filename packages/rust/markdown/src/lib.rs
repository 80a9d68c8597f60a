//! Markdown pipe-table parsing for model responses.
//!
//! Models are asked to answer with a markdown table. These functions pull the
//! structured rows back out of whatever text came back, tolerating prose or
//! code fences around the table. Nothing here returns an error: an unusable
//! response yields `None` or an empty list and a `warn!`, and the caller skips
//! that unit of work.

mod cells;

use tracing::{debug, instrument, warn};

use seopipe_shared::{AnalysisFields, ClusterRow, CsvRecord, Fields, columns};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The header and the single data row of a one-row table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Header cells, trimmed.
    pub headers: Vec<String>,
    /// Data cells, trimmed.
    pub cells: Vec<String>,
}

/// Columns the keyword planner asks for, in table order.
pub const CLUSTER_TABLE_COLUMNS: &[&str] = &[
    columns::CLUSTER,
    columns::INTENT,
    columns::KEYWORDS,
    columns::PRIMARY_KEYWORD,
];

// ---------------------------------------------------------------------------
// Single-row tables
// ---------------------------------------------------------------------------

/// Find the header and the first data row of a pipe table.
///
/// The header is the first `|...|` line without `---`; the data row is the
/// first later line that starts with `|` and is not a separator. Any further
/// rows are ignored.
pub fn parse_single_row(raw: &str) -> Option<TableRow> {
    if raw.trim().is_empty() {
        warn!("empty response received, nothing to parse");
        return None;
    }

    let lines = cells::content_lines(raw);

    let Some(header_idx) = lines.iter().position(|l| cells::is_header_row(l)) else {
        warn!(content = %raw, "could not find a table header row");
        return None;
    };

    let data = lines[header_idx + 1..]
        .iter()
        .find(|l| l.starts_with('|') && !cells::is_separator_row(l));

    let Some(data) = data else {
        warn!(content = %raw, "could not find a data row after the table header");
        return None;
    };

    Some(TableRow {
        headers: cells::split_cells(lines[header_idx]),
        cells: cells::split_cells(data),
    })
}

/// Parse the analyzer's `| Topic | Keywords | Summary |` answer.
///
/// Cells are taken by position. `<br>` markers in the summary become newlines.
#[instrument(skip_all)]
pub fn parse_analysis_table(raw: &str) -> Option<AnalysisFields> {
    let row = parse_single_row(raw)?;

    if row.cells.len() < 3 {
        warn!(
            found = row.cells.len(),
            row = ?row.cells,
            "expected at least 3 data columns"
        );
        return None;
    }

    let fields = AnalysisFields {
        topic: row.cells[0].clone(),
        keywords: row.cells[1].clone(),
        summary: cells::normalize_line_breaks(&row.cells[2]),
    };

    for (name, value) in [
        (columns::TOPIC, &fields.topic),
        (columns::KEYWORDS, &fields.keywords),
        (columns::SUMMARY, &fields.summary),
    ] {
        if value.is_empty() {
            warn!(column = name, row = ?row.cells, "parsed cell is empty");
        }
    }

    Some(fields)
}

// ---------------------------------------------------------------------------
// Multi-row tables
// ---------------------------------------------------------------------------

/// Parse every data row of a table into [`Fields`] keyed by `columns`.
///
/// The separator must directly follow the header. Rows whose cell count
/// differs from `columns.len()` are skipped with a warning.
pub fn parse_rows(raw: &str, columns: &[&str]) -> Vec<Fields> {
    if raw.trim().is_empty() {
        warn!("empty response received, nothing to parse");
        return Vec::new();
    }

    let lines = cells::content_lines(raw);

    let header_idx = lines.iter().position(|l| cells::is_header_row(l));
    let separator_ok = header_idx
        .and_then(|idx| lines.get(idx + 1))
        .is_some_and(|l| cells::is_pipe_row(l) && l.contains("---"));

    let (Some(header_idx), true) = (header_idx, separator_ok) else {
        warn!(content = %raw, "could not find a table header followed by a separator");
        return Vec::new();
    };

    let mut records = Vec::new();

    for line in &lines[header_idx + 2..] {
        if !cells::is_pipe_row(line) {
            continue;
        }

        let row = cells::split_cells(line);
        if row.len() != columns.len() {
            warn!(
                expected = columns.len(),
                found = row.len(),
                row = %line,
                "skipping malformed table row"
            );
            continue;
        }

        records.push(columns.iter().copied().zip(row).collect::<Fields>());
    }

    if records.is_empty() {
        warn!(content = %raw, "no data rows extracted from table");
    } else {
        debug!(rows = records.len(), "table rows parsed");
    }

    records
}

/// Parse the keyword planner's cluster table.
///
/// Each record gets an empty `Completed` flag so it is picked up by the
/// blog writer.
pub fn parse_cluster_table(raw: &str) -> Vec<ClusterRow> {
    parse_rows(raw, CLUSTER_TABLE_COLUMNS)
        .into_iter()
        .map(|fields| {
            let mut cluster = ClusterRow::from_fields(&fields);
            cluster.completed = String::new();
            cluster
        })
        .collect()
}
