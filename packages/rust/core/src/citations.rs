//! Inline citation rewriting for research answers.

/// Replace each `[n]` marker with ` - source: <url>`, where `<url>` is the
/// n-th (1-based) entry of `citations`. Markers without a matching URL are
/// left as they are.
pub fn rewrite_citation_markers(text: &str, citations: &[String]) -> String {
    citations
        .iter()
        .enumerate()
        .fold(text.to_string(), |acc, (i, url)| {
            acc.replace(&format!("[{}]", i + 1), &format!(" - source: {url}"))
        })
}
