//! Competitor and own-post analysis batch.
//!
//! Each queued URL is one unit of work: ask the analyzer model for a
//! `Topic | Keywords | Summary` table, parse it, and record the result. A
//! failed call or an unparsable answer skips that URL only; it stays queued
//! and is retried on the next run.

use std::time::Duration;

use tracing::{info, instrument, warn};

use seopipe_markdown::parse_analysis_table;
use seopipe_shared::{AnalysisFields, AnalysisRow, AppConfig, ClientConfig};
use seopipe_storage::CsvStore;

use crate::completion::{Completion, CompletionClient, CompletionRequest};
use crate::progress::ProgressReporter;
use crate::prompts;

/// Configuration for [`run_analysis`].
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// Model used for every analysis call.
    pub model: String,
    /// The business whose competitors are analysed.
    pub client: ClientConfig,
    /// Pause between two consecutive model calls. Zero disables it.
    pub inter_call_delay: Duration,
}

impl From<&AppConfig> for AnalyzeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.models.analyzer.clone(),
            client: config.client.clone(),
            inter_call_delay: Duration::from_millis(config.pipeline.inter_call_delay_ms),
        }
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub competitors_pending: usize,
    pub competitors_analysed: usize,
    pub posted_pending: usize,
    pub posted_analysed: usize,
}

impl AnalysisSummary {
    pub fn skipped(&self) -> usize {
        (self.competitors_pending - self.competitors_analysed)
            + (self.posted_pending - self.posted_analysed)
    }
}

/// Analyse every pending competitor URL, then every pending own post.
#[instrument(skip_all, fields(model = %config.model))]
pub async fn run_analysis<C: CompletionClient>(
    llm: &C,
    store: &CsvStore,
    config: &AnalyzeConfig,
    progress: &dyn ProgressReporter,
) -> AnalysisSummary {
    store.init_analysis_files();

    let competitors = store.pending_competitor_urls();
    let posted = store.pending_posted_urls();

    let mut summary = AnalysisSummary {
        competitors_pending: competitors.len(),
        posted_pending: posted.len(),
        ..AnalysisSummary::default()
    };

    info!(
        competitors = competitors.len(),
        posted = posted.len(),
        "starting analysis"
    );

    if competitors.is_empty() && posted.is_empty() {
        info!("no URLs to analyse");
        progress.done("Nothing to analyse");
        return summary;
    }

    let mut analyst = Analyst {
        llm,
        config,
        calls: 0,
    };

    if !competitors.is_empty() {
        progress.phase("Analysing competitor posts");
        for (i, row) in competitors.iter().enumerate() {
            progress.item(&row.url, i + 1, competitors.len());

            let Some(analysis) = analyst.analyze(&row.url).await else {
                continue;
            };

            if !store.record_analysis(&AnalysisRow::new(analysis, &row.url)).is_written() {
                warn!(url = %row.url, "analysis not saved, URL stays queued");
                continue;
            }
            if !store.mark_competitor_analysed(&row.url) {
                warn!(url = %row.url, "analysis saved but queue flag not updated");
            }
            summary.competitors_analysed += 1;
            info!(url = %row.url, "competitor post analysed");
        }
    }

    if !posted.is_empty() {
        progress.phase("Analysing published posts");
        for (i, row) in posted.iter().enumerate() {
            progress.item(&row.url, i + 1, posted.len());

            let Some(analysis) = analyst.analyze(&row.url).await else {
                continue;
            };

            if store.update_posted(&row.url, &analysis) {
                summary.posted_analysed += 1;
                info!(url = %row.url, "published post analysed");
            } else {
                warn!(url = %row.url, "published post row not updated");
            }
        }
    }

    info!(
        competitors_analysed = summary.competitors_analysed,
        posted_analysed = summary.posted_analysed,
        skipped = summary.skipped(),
        "analysis finished"
    );
    progress.done(&format!(
        "Analysed {} competitor and {} published posts ({} skipped)",
        summary.competitors_analysed,
        summary.posted_analysed,
        summary.skipped()
    ));

    summary
}

struct Analyst<'a, C> {
    llm: &'a C,
    config: &'a AnalyzeConfig,
    calls: usize,
}

impl<C: CompletionClient> Analyst<'_, C> {
    /// One model call plus parse. `None` means the URL is skipped.
    async fn analyze(&mut self, url: &str) -> Option<AnalysisFields> {
        if self.calls > 0 && !self.config.inter_call_delay.is_zero() {
            tokio::time::sleep(self.config.inter_call_delay).await;
        }
        self.calls += 1;

        let request = CompletionRequest::new(&self.config.model, prompts::analysis_request(url))
            .with_system(prompts::analysis_instruction(&self.config.client));

        match self.llm.complete(&request).await {
            Completion::Ok(answer) => {
                let parsed = parse_analysis_table(&answer.text);
                if parsed.is_none() {
                    warn!(url = %url, raw = %answer.text, "could not parse analysis, skipping URL");
                }
                parsed
            }
            Completion::Failed(reason) => {
                warn!(url = %url, reason = %reason, "analysis call failed, skipping URL");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::progress::SilentProgress;
    use crate::testing::{ScriptedClient, analysis_table, cleanup, failed, ok, temp_store, write};

    use super::*;

    fn config() -> AnalyzeConfig {
        AnalyzeConfig::from(&AppConfig::default())
    }

    #[tokio::test]
    async fn analyses_competitors_then_posted() {
        let store = temp_store();
        let paths = store.paths().clone();
        write(
            &paths.competitor_urls,
            "URL,Analysed\nhttps://c.example/a,No\nhttps://c.example/b,Yes\n",
        );
        write(
            &paths.posted,
            "Topic,Keywords,Summary,URL,Analysed\n,,,https://mine.example/1,\n",
        );

        let llm = ScriptedClient::new([
            ok(&analysis_table("Competitor topic", "implants, veneers")),
            ok(&analysis_table("Own topic", "whitening")),
        ]);

        let summary = run_analysis(&llm, &store, &config(), &SilentProgress).await;
        assert_eq!(
            summary,
            AnalysisSummary {
                competitors_pending: 1,
                competitors_analysed: 1,
                posted_pending: 1,
                posted_analysed: 1,
            }
        );

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].prompt.contains("https://c.example/a"));
        assert!(requests[1].prompt.contains("https://mine.example/1"));
        assert_eq!(requests[0].model, AppConfig::default().models.analyzer);
        assert!(requests[0].system.is_some());

        assert!(store.pending_competitor_urls().is_empty());
        assert!(store.pending_posted_urls().is_empty());
        assert_eq!(store.competitor_keywords(), vec!["implants", "veneers"]);

        let published = store.published_posts();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "Own topic");
        assert_eq!(published[0].summary, "- a\n- b");
        cleanup(&store);
    }

    #[tokio::test]
    async fn failed_unit_is_skipped_and_batch_continues() {
        let store = temp_store();
        write(
            &store.paths().competitor_urls,
            "URL,Analysed\nhttps://c.example/1,No\nhttps://c.example/2,No\nhttps://c.example/3,No\n",
        );

        let llm = ScriptedClient::new([
            failed("timeout"),
            ok("Sorry, I could not open that page."),
            ok(&analysis_table("Third", "braces")),
        ]);

        let summary = run_analysis(&llm, &store, &config(), &SilentProgress).await;
        assert_eq!(summary.competitors_pending, 3);
        assert_eq!(summary.competitors_analysed, 1);
        assert_eq!(summary.skipped(), 2);

        let still_pending: Vec<String> = store
            .pending_competitor_urls()
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(still_pending, vec!["https://c.example/1", "https://c.example/2"]);
        cleanup(&store);
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let store = temp_store();
        write(
            &store.paths().competitor_urls,
            "URL,Analysed\nhttps://c.example/a,No\n",
        );

        let llm = ScriptedClient::new([ok(&analysis_table("T", "k"))]);
        run_analysis(&llm, &store, &config(), &SilentProgress).await;

        let again = ScriptedClient::new([]);
        let summary = run_analysis(&again, &store, &config(), &SilentProgress).await;
        assert_eq!(summary, AnalysisSummary::default());
        assert!(again.requests().is_empty());
        cleanup(&store);
    }

    #[tokio::test]
    async fn missing_files_are_initialized() {
        let store = temp_store();
        let llm = ScriptedClient::new([]);

        let summary = run_analysis(&llm, &store, &config(), &SilentProgress).await;
        assert_eq!(summary, AnalysisSummary::default());
        assert!(store.paths().competitor_urls.exists());
        assert!(store.paths().analysis.exists());
        assert!(store.paths().posted.exists());
        cleanup(&store);
    }
}
