//! Line classification and cell extraction for pipe tables.

use std::sync::LazyLock;

use regex::Regex;

/// Trimmed, non-blank lines of a model response.
pub(crate) fn content_lines(raw: &str) -> Vec<&str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// `| a | b |`: starts and ends with a pipe.
pub(crate) fn is_pipe_row(line: &str) -> bool {
    line.len() >= 2 && line.starts_with('|') && line.ends_with('|')
}

/// A header candidate: a pipe row that is not a `---` separator.
pub(crate) fn is_header_row(line: &str) -> bool {
    is_pipe_row(line) && !line.contains("---")
}

/// A separator row made of pipes, dashes, colons and whitespace only.
pub(crate) fn is_separator_row(line: &str) -> bool {
    static SEPARATOR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[|\s:-]+$").expect("valid regex"));

    SEPARATOR_RE.is_match(line)
}

/// Split a pipe row into trimmed cells, dropping the empty fragments the
/// outer pipes leave behind.
pub(crate) fn split_cells(line: &str) -> Vec<String> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// Turn the `<br>` markers models use inside a single cell into newlines.
pub(crate) fn normalize_line_breaks(cell: &str) -> String {
    static BR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<br\s*/?>").expect("valid regex"));

    BR_RE.replace_all(cell, "\n").into_owned()
}
