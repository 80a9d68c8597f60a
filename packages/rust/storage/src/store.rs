//! Typed access to the four pipeline CSV files.

use std::path::Path;

use tracing::debug;

use seopipe_shared::{
    ANALYSIS_HEADERS, AnalysisFields, AnalysisRow, CLUSTER_HEADERS, ClusterRow, CsvRecord,
    FLAG_YES, Fields, POSTED_HEADERS, PipelinePaths, PostedRow, URL_QUEUE_HEADERS, UrlQueueRow,
    columns,
};

use crate::{
    FlagFilter, UpsertOutcome, append_many, ensure_with_headers, mark_flag, read_column,
    read_eligible, update_by_key, upsert_by_key,
};

/// The pipeline's CSV state, addressed through [`PipelinePaths`].
#[derive(Debug, Clone)]
pub struct CsvStore {
    paths: PipelinePaths,
}

impl CsvStore {
    pub fn new(paths: PipelinePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &PipelinePaths {
        &self.paths
    }

    // -----------------------------------------------------------------------
    // Analysis
    // -----------------------------------------------------------------------

    /// Create the competitor queue, analysis and posted files if absent.
    pub fn init_analysis_files(&self) {
        ensure_with_headers(&self.paths.competitor_urls, URL_QUEUE_HEADERS);
        ensure_with_headers(&self.paths.analysis, ANALYSIS_HEADERS);
        ensure_with_headers(&self.paths.posted, POSTED_HEADERS);
    }

    /// Competitor URLs explicitly flagged `No`.
    pub fn pending_competitor_urls(&self) -> Vec<UrlQueueRow> {
        typed(read_eligible(
            &self.paths.competitor_urls,
            URL_QUEUE_HEADERS,
            columns::URL,
            columns::ANALYSED,
            FlagFilter::No,
        ))
    }

    /// The client's own posts flagged `No` or not flagged at all.
    pub fn pending_posted_urls(&self) -> Vec<PostedRow> {
        typed(read_eligible(
            &self.paths.posted,
            POSTED_HEADERS,
            columns::URL,
            columns::ANALYSED,
            FlagFilter::NoOrBlank,
        ))
    }

    /// Insert or refresh the analysis row for `row.url`.
    pub fn record_analysis(&self, row: &AnalysisRow) -> UpsertOutcome {
        upsert_by_key(
            &self.paths.analysis,
            ANALYSIS_HEADERS,
            columns::URL,
            &row.to_fields(),
        )
    }

    pub fn mark_competitor_analysed(&self, url: &str) -> bool {
        mark_flag(
            &self.paths.competitor_urls,
            columns::URL,
            columns::ANALYSED,
            url,
            FLAG_YES,
        )
    }

    /// Write the analysis into the existing posted row for `url` and flag it
    /// analysed. Posted rows are never created here.
    pub fn update_posted(&self, url: &str, analysis: &AnalysisFields) -> bool {
        let fields = analysis.to_fields().with(columns::ANALYSED, FLAG_YES);
        update_by_key(&self.paths.posted, POSTED_HEADERS, columns::URL, url, &fields)
    }

    /// Every competitor keyword, split on commas and trimmed, in file order.
    pub fn competitor_keywords(&self) -> Vec<String> {
        read_column(&self.paths.analysis, columns::KEYWORDS)
            .iter()
            .flat_map(|cell| cell.split(','))
            .map(str::trim)
            .filter(|kw| !kw.is_empty())
            .map(str::to_string)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Clusters
    // -----------------------------------------------------------------------

    pub fn init_clusters(&self) -> bool {
        ensure_with_headers(&self.paths.clusters, CLUSTER_HEADERS)
    }

    pub fn clusters_file_exists(&self) -> bool {
        self.paths.clusters.exists()
    }

    pub fn append_clusters(&self, clusters: &[ClusterRow]) -> usize {
        let records: Vec<Fields> = clusters.iter().map(ClusterRow::to_fields).collect();
        append_many(&self.paths.clusters, CLUSTER_HEADERS, &records)
    }

    /// First cluster, in file order, whose `Completed` flag is `No` or blank.
    pub fn next_pending_cluster(&self) -> Option<ClusterRow> {
        read_eligible(
            &self.paths.clusters,
            CLUSTER_HEADERS,
            columns::PRIMARY_KEYWORD,
            columns::COMPLETED,
            FlagFilter::NoOrBlank,
        )
        .first()
        .map(ClusterRow::from_fields)
    }

    pub fn mark_cluster_completed(&self, primary_keyword: &str) -> bool {
        mark_flag(
            &self.paths.clusters,
            columns::PRIMARY_KEYWORD,
            columns::COMPLETED,
            primary_keyword,
            FLAG_YES,
        )
    }

    // -----------------------------------------------------------------------
    // Published posts
    // -----------------------------------------------------------------------

    /// Posted rows already flagged `Yes`, used as internal link targets.
    /// A missing posted file means no targets; it is not created.
    pub fn published_posts(&self) -> Vec<PostedRow> {
        if !self.paths.posted.exists() {
            debug!(path = %self.paths.posted.display(), "no posted file, no internal link targets");
            return Vec::new();
        }
        typed(read_eligible(
            &self.paths.posted,
            POSTED_HEADERS,
            columns::URL,
            columns::ANALYSED,
            FlagFilter::Yes,
        ))
    }

    pub fn output_dir(&self) -> &Path {
        &self.paths.output_dir
    }
}

fn typed<R: CsvRecord>(rows: Vec<Fields>) -> Vec<R> {
    rows.iter().map(R::from_fields).collect()
}
