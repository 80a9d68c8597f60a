//! Record types for the CSV state files.
//!
//! Every file is a table whose header row decides the column set. Rows are
//! carried around as [`Fields`] (ordered column/value pairs) and converted to
//! typed records through [`CsvRecord`]; columns a record type does not know
//! about land in its `extra` bucket instead of being dropped.

/// Column names shared by the CSV files.
pub mod columns {
    pub const URL: &str = "URL";
    pub const ANALYSED: &str = "Analysed";
    pub const TOPIC: &str = "Topic";
    pub const KEYWORDS: &str = "Keywords";
    pub const SUMMARY: &str = "Summary";
    pub const CLUSTER: &str = "Cluster";
    pub const INTENT: &str = "Intent";
    pub const PRIMARY_KEYWORD: &str = "Primary Keyword";
    pub const COMPLETED: &str = "Completed";
}

/// Value written into a flag column once a unit of work is done.
pub const FLAG_YES: &str = "Yes";

/// `Competitor URLs.csv`.
pub const URL_QUEUE_HEADERS: &[&str] = &[columns::URL, columns::ANALYSED];

/// `Competitor Analysis.csv`.
pub const ANALYSIS_HEADERS: &[&str] = &[
    columns::TOPIC,
    columns::KEYWORDS,
    columns::SUMMARY,
    columns::URL,
];

/// `Posted.csv`.
pub const POSTED_HEADERS: &[&str] = &[
    columns::TOPIC,
    columns::KEYWORDS,
    columns::SUMMARY,
    columns::URL,
    columns::ANALYSED,
];

/// `Clusters.csv`.
pub const CLUSTER_HEADERS: &[&str] = &[
    columns::CLUSTER,
    columns::INTENT,
    columns::KEYWORDS,
    columns::PRIMARY_KEYWORD,
    columns::COMPLETED,
];

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// An ordered set of named values, one CSV row seen through its header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip a header with a physical row. Missing trailing cells stay absent;
    /// cells beyond the header are ignored.
    pub fn from_row(headers: &[String], row: &[String]) -> Self {
        Self(
            headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.clone(), v.clone()))
                .collect(),
        )
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Value of `name`, if the column is present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `name`, or `""` when absent.
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Replace the value of `name`, appending the column if it is new.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }

    /// Lay the values out in `headers` order, blanks for absent columns.
    pub fn project<S: AsRef<str>>(&self, headers: &[S]) -> Vec<String> {
        headers
            .iter()
            .map(|h| self.get_or_empty(h.as_ref()).to_string())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Columns not listed in `known`, in their original order.
    fn extras(&self, known: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(n, _)| !known.contains(&n.as_str()))
                .cloned()
                .collect(),
        )
    }

    fn extend(&mut self, other: &Fields) {
        for (n, v) in other.iter() {
            self.set(n, v);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.set(k, v);
        }
        fields
    }
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// A record type stored in one of the CSV files.
pub trait CsvRecord: Sized {
    /// Canonical header, used when a file has to be (re)created.
    const HEADERS: &'static [&'static str];

    fn from_fields(fields: &Fields) -> Self;

    fn to_fields(&self) -> Fields;
}

/// A row of `Competitor URLs.csv`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlQueueRow {
    pub url: String,
    pub analysed: String,
    pub extra: Fields,
}

impl CsvRecord for UrlQueueRow {
    const HEADERS: &'static [&'static str] = URL_QUEUE_HEADERS;

    fn from_fields(fields: &Fields) -> Self {
        Self {
            url: fields.get_or_empty(columns::URL).to_string(),
            analysed: fields.get_or_empty(columns::ANALYSED).to_string(),
            extra: fields.extras(Self::HEADERS),
        }
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new()
            .with(columns::URL, &self.url)
            .with(columns::ANALYSED, &self.analysed);
        fields.extend(&self.extra);
        fields
    }
}

/// The three values the analyzer extracts from a competitor post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisFields {
    pub topic: String,
    pub keywords: String,
    pub summary: String,
}

impl AnalysisFields {
    pub fn to_fields(&self) -> Fields {
        Fields::new()
            .with(columns::TOPIC, &self.topic)
            .with(columns::KEYWORDS, &self.keywords)
            .with(columns::SUMMARY, &self.summary)
    }
}

/// A row of `Competitor Analysis.csv`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisRow {
    pub topic: String,
    pub keywords: String,
    pub summary: String,
    pub url: String,
    pub extra: Fields,
}

impl AnalysisRow {
    pub fn new(analysis: AnalysisFields, url: impl Into<String>) -> Self {
        Self {
            topic: analysis.topic,
            keywords: analysis.keywords,
            summary: analysis.summary,
            url: url.into(),
            extra: Fields::new(),
        }
    }
}

impl CsvRecord for AnalysisRow {
    const HEADERS: &'static [&'static str] = ANALYSIS_HEADERS;

    fn from_fields(fields: &Fields) -> Self {
        Self {
            topic: fields.get_or_empty(columns::TOPIC).to_string(),
            keywords: fields.get_or_empty(columns::KEYWORDS).to_string(),
            summary: fields.get_or_empty(columns::SUMMARY).to_string(),
            url: fields.get_or_empty(columns::URL).to_string(),
            extra: fields.extras(Self::HEADERS),
        }
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new()
            .with(columns::TOPIC, &self.topic)
            .with(columns::KEYWORDS, &self.keywords)
            .with(columns::SUMMARY, &self.summary)
            .with(columns::URL, &self.url);
        fields.extend(&self.extra);
        fields
    }
}

/// A row of `Posted.csv`: the client's own published posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostedRow {
    pub topic: String,
    pub keywords: String,
    pub summary: String,
    pub url: String,
    pub analysed: String,
    pub extra: Fields,
}

impl CsvRecord for PostedRow {
    const HEADERS: &'static [&'static str] = POSTED_HEADERS;

    fn from_fields(fields: &Fields) -> Self {
        Self {
            topic: fields.get_or_empty(columns::TOPIC).to_string(),
            keywords: fields.get_or_empty(columns::KEYWORDS).to_string(),
            summary: fields.get_or_empty(columns::SUMMARY).to_string(),
            url: fields.get_or_empty(columns::URL).to_string(),
            analysed: fields.get_or_empty(columns::ANALYSED).to_string(),
            extra: fields.extras(Self::HEADERS),
        }
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new()
            .with(columns::TOPIC, &self.topic)
            .with(columns::KEYWORDS, &self.keywords)
            .with(columns::SUMMARY, &self.summary)
            .with(columns::URL, &self.url)
            .with(columns::ANALYSED, &self.analysed);
        fields.extend(&self.extra);
        fields
    }
}

/// A row of `Clusters.csv`: one planned blog post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterRow {
    pub cluster: String,
    pub intent: String,
    /// Comma-joined keyword list.
    pub keywords: String,
    pub primary_keyword: String,
    pub completed: String,
    pub extra: Fields,
}

impl CsvRecord for ClusterRow {
    const HEADERS: &'static [&'static str] = CLUSTER_HEADERS;

    fn from_fields(fields: &Fields) -> Self {
        Self {
            cluster: fields.get_or_empty(columns::CLUSTER).to_string(),
            intent: fields.get_or_empty(columns::INTENT).to_string(),
            keywords: fields.get_or_empty(columns::KEYWORDS).to_string(),
            primary_keyword: fields.get_or_empty(columns::PRIMARY_KEYWORD).to_string(),
            completed: fields.get_or_empty(columns::COMPLETED).to_string(),
            extra: fields.extras(Self::HEADERS),
        }
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new()
            .with(columns::CLUSTER, &self.cluster)
            .with(columns::INTENT, &self.intent)
            .with(columns::KEYWORDS, &self.keywords)
            .with(columns::PRIMARY_KEYWORD, &self.primary_keyword)
            .with(columns::COMPLETED, &self.completed);
        fields.extend(&self.extra);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fields_from_short_row_leaves_columns_absent() {
        let headers = strings(&["URL", "Analysed"]);
        let fields = Fields::from_row(&headers, &strings(&["http://a.com"]));
        assert_eq!(fields.get("URL"), Some("http://a.com"));
        assert_eq!(fields.get("Analysed"), None);
        assert_eq!(fields.get_or_empty("Analysed"), "");
    }

    #[test]
    fn fields_set_replaces_in_place() {
        let mut fields = Fields::new().with("A", "1").with("B", "2");
        fields.set("A", "3");
        fields.set("C", "4");
        let pairs: Vec<_> = fields.iter().collect();
        assert_eq!(pairs, vec![("A", "3"), ("B", "2"), ("C", "4")]);
    }

    #[test]
    fn project_fills_blanks() {
        let fields = Fields::new().with("Topic", "T").with("URL", "u");
        assert_eq!(
            fields.project(ANALYSIS_HEADERS),
            strings(&["T", "", "", "u"])
        );
    }

    #[test]
    fn cluster_row_keeps_unknown_columns() {
        let headers = strings(&["Cluster", "Owner", "Primary Keyword", "Completed"]);
        let row = strings(&["Whitening", "sam", "teeth whitening", "No"]);
        let cluster = ClusterRow::from_fields(&Fields::from_row(&headers, &row));

        assert_eq!(cluster.cluster, "Whitening");
        assert_eq!(cluster.primary_keyword, "teeth whitening");
        assert_eq!(cluster.intent, "");
        assert_eq!(cluster.extra.get("Owner"), Some("sam"));

        let back = cluster.to_fields();
        assert_eq!(back.get("Owner"), Some("sam"));
        assert_eq!(back.get("Completed"), Some("No"));
    }

    #[test]
    fn analysis_row_from_parsed_fields() {
        let parsed = AnalysisFields {
            topic: "Wisdom teeth".into(),
            keywords: "wisdom teeth removal, jaw pain".into(),
            summary: "- one\n- two".into(),
        };
        let row = AnalysisRow::new(parsed, "https://c.example/post");
        let fields = row.to_fields();
        assert_eq!(
            fields.project(AnalysisRow::HEADERS),
            strings(&[
                "Wisdom teeth",
                "wisdom teeth removal, jaw pain",
                "- one\n- two",
                "https://c.example/post"
            ])
        );
    }
}
