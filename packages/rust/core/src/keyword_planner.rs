//! Two-stage keyword cluster planning.
//!
//! Stage one brainstorms pillar posts and clusters for the client; stage two
//! refines that plan with the competitors' most frequent keywords and returns
//! it as a cluster table, which is appended to the clusters file.

use std::collections::HashMap;

use tracing::{info, instrument, warn};

use seopipe_markdown::parse_cluster_table;
use seopipe_shared::{AppConfig, ClientConfig, Result};
use seopipe_storage::CsvStore;

use crate::completion::{CompletionClient, CompletionRequest};
use crate::progress::ProgressReporter;
use crate::prompts;

/// Configuration for [`plan_keywords`].
#[derive(Debug, Clone)]
pub struct PlanConfig {
    pub model: String,
    pub client: ClientConfig,
    /// How many competitor keywords are fed into the refine stage.
    pub top_keywords: usize,
}

impl From<&AppConfig> for PlanConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.models.keyword_planner.clone(),
            client: config.client.clone(),
            top_keywords: config.pipeline.top_competitor_keywords,
        }
    }
}

/// Result of a planning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOutcome {
    /// Competitor keywords passed to the refine stage.
    pub competitor_keywords: Vec<String>,
    /// Cluster rows appended to the clusters file.
    pub clusters_added: usize,
}

/// The `n` most frequent keywords, most frequent first. Ties keep the order
/// in which the keywords first appeared.
pub fn top_keywords(keywords: &[String], n: usize) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, keyword) in keywords.iter().enumerate() {
        counts.entry(keyword.as_str()).or_insert((0, idx)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(keyword, (count, first))| (keyword, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(n)
        .map(|(keyword, _, _)| keyword.to_string())
        .collect()
}

/// Run both planning stages and append the parsed clusters.
///
/// A failed model call aborts the run with a stage error. A final answer with
/// no usable table is only logged; the clusters file is left untouched.
#[instrument(skip_all, fields(model = %config.model, client = %config.client.name))]
pub async fn plan_keywords<C: CompletionClient>(
    llm: &C,
    store: &CsvStore,
    config: &PlanConfig,
    progress: &dyn ProgressReporter,
) -> Result<PlanOutcome> {
    store.init_clusters();

    let competitor_keywords = top_keywords(&store.competitor_keywords(), config.top_keywords);
    if competitor_keywords.is_empty() {
        warn!("no competitor keywords found, planning without them");
    } else {
        info!(keywords = ?competitor_keywords, "top competitor keywords");
    }

    progress.phase("Brainstorming pillar posts and clusters");
    let initial_plan = llm
        .complete(&CompletionRequest::new(
            &config.model,
            prompts::pillar_plan(&config.client),
        ))
        .await
        .into_stage_result("pillar plan")?;
    info!(len = initial_plan.text.len(), "initial plan received");

    progress.phase("Refining clusters into a table");
    let table = llm
        .complete(&CompletionRequest::new(
            &config.model,
            prompts::refine_into_table(&initial_plan.text, &competitor_keywords),
        ))
        .await
        .into_stage_result("cluster table")?;

    progress.phase("Saving clusters");
    let clusters = parse_cluster_table(&table.text);
    let clusters_added = if clusters.is_empty() {
        warn!(raw = %table.text, "no clusters parsed from the model output, clusters file not updated");
        0
    } else {
        store.append_clusters(&clusters)
    };

    info!(clusters_added, "keyword planning finished");
    progress.done(&format!("Added {clusters_added} clusters"));

    Ok(PlanOutcome {
        competitor_keywords,
        clusters_added,
    })
}
