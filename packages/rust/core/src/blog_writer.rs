//! Six-stage blog post generation for the next pending cluster.
//!
//! preliminary plan → research → detailed plan → draft → internal links →
//! HTML. Each stage feeds the next, so any failure except the internal-link
//! stage aborts the run and leaves the cluster pending.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, instrument, warn};

use seopipe_shared::{AppConfig, ClusterRow, ModelsConfig, PostedRow, Result, SeoPipeError};
use seopipe_storage::CsvStore;

use crate::citations::rewrite_citation_markers;
use crate::completion::{Completion, CompletionClient, CompletionRequest};
use crate::progress::ProgressReporter;
use crate::prompts;

/// Configuration for [`write_next_post`].
#[derive(Debug, Clone)]
pub struct WriteConfig {
    pub models: ModelsConfig,
}

impl From<&AppConfig> for WriteConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            models: config.models.clone(),
        }
    }
}

/// A generated post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPost {
    pub cluster: String,
    pub primary_keyword: String,
    /// Where the HTML was saved.
    pub path: PathBuf,
    /// Whether the cluster row was flagged completed.
    pub marked_completed: bool,
}

/// File name for a post: spaces become `_`, everything outside
/// `[A-Za-z0-9_-]` is dropped, and `.html` is appended.
pub fn sanitize_filename(primary_keyword: &str) -> String {
    static UNSAFE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_\-]+").expect("valid regex"));

    let spaced = primary_keyword.replace(' ', "_");
    let stem = UNSAFE_RE.replace_all(&spaced, "");
    if stem.is_empty() {
        "untitled_blog_post.html".to_string()
    } else {
        format!("{stem}.html")
    }
}

/// Prompt text describing the published posts available as link targets.
pub fn format_internal_links(posts: &[PostedRow]) -> String {
    let entries: Vec<String> = posts
        .iter()
        .filter(|post| !post.url.trim().is_empty())
        .map(|post| {
            format!(
                "- URL: {}\n  Topic: {}\n  Keywords: {}\n  Summary: {}\n",
                post.url.trim(),
                post.topic,
                post.keywords,
                post.summary.replace('\n', " ")
            )
        })
        .collect();

    if entries.is_empty() {
        "No published posts are available for internal linking.".to_string()
    } else {
        entries.join("\n")
    }
}

/// Create the output directory, falling back to the data directory when it
/// cannot be created.
fn prepare_output_dir(store: &CsvStore) -> PathBuf {
    let output_dir = store.output_dir();
    match std::fs::create_dir_all(output_dir) {
        Ok(()) => output_dir.to_path_buf(),
        Err(e) => {
            let fallback = store.paths().data_dir.clone();
            warn!(
                dir = %output_dir.display(),
                fallback = %fallback.display(),
                error = %e,
                "could not create output directory, saving into the data directory"
            );
            fallback
        }
    }
}

/// Generate and save the post for the first pending cluster.
///
/// Returns `Ok(None)` when no cluster is pending. The cluster is flagged
/// completed only after its HTML has been written.
#[instrument(skip_all)]
pub async fn write_next_post<C: CompletionClient>(
    llm: &C,
    store: &CsvStore,
    config: &WriteConfig,
    progress: &dyn ProgressReporter,
) -> Result<Option<WrittenPost>> {
    let output_dir = prepare_output_dir(store);

    if !store.clusters_file_exists() {
        return Err(SeoPipeError::validation(format!(
            "clusters file not found at {}; run `seopipe plan` first",
            store.paths().clusters.display()
        )));
    }

    let Some(cluster) = store.next_pending_cluster() else {
        info!("no pending clusters");
        progress.done("No pending clusters");
        return Ok(None);
    };

    info!(
        cluster = %cluster.cluster,
        primary_keyword = %cluster.primary_keyword,
        "writing post for cluster"
    );

    let html = run_stages(llm, store, config, &cluster, progress).await?;

    progress.phase("Saving HTML");
    let path = output_dir.join(sanitize_filename(&cluster.primary_keyword));
    save_html(&path, &html)?;
    info!(path = %path.display(), "post saved");

    let marked_completed = store.mark_cluster_completed(&cluster.primary_keyword);
    if !marked_completed {
        warn!(primary_keyword = %cluster.primary_keyword, "post saved but cluster not flagged completed");
    }

    progress.done(&format!("Saved {}", path.display()));

    Ok(Some(WrittenPost {
        cluster: cluster.cluster,
        primary_keyword: cluster.primary_keyword,
        path,
        marked_completed,
    }))
}

async fn run_stages<C: CompletionClient>(
    llm: &C,
    store: &CsvStore,
    config: &WriteConfig,
    cluster: &ClusterRow,
    progress: &dyn ProgressReporter,
) -> Result<String> {
    let models = &config.models;

    progress.phase("Preliminary plan");
    let preliminary = llm
        .complete(&CompletionRequest::new(
            &models.preliminary_plan,
            prompts::preliminary_plan(cluster),
        ))
        .await
        .into_stage_result("preliminary plan")?
        .text;

    progress.phase("Research");
    let research_request = CompletionRequest::new(
        &models.research,
        prompts::research_query(&preliminary, &cluster.primary_keyword),
    )
    .with_system(prompts::RESEARCH_INSTRUCTION);
    let research = llm
        .complete(&research_request)
        .await
        .into_stage_result("research")?;
    info!(citations = research.citations.len(), "research received");
    let research = rewrite_citation_markers(&research.text, &research.citations);

    progress.phase("Detailed plan");
    let detailed = llm
        .complete(&CompletionRequest::new(
            &models.detailed_plan,
            prompts::detailed_plan(cluster, &preliminary, &research),
        ))
        .await
        .into_stage_result("detailed plan")?
        .text;

    progress.phase("Draft");
    let draft = llm
        .complete(&CompletionRequest::new(
            &models.writer,
            prompts::write_post(&detailed, &research, &cluster.primary_keyword),
        ))
        .await
        .into_stage_result("draft")?
        .text;

    progress.phase("Internal links");
    let published = format_internal_links(&store.published_posts());
    let linked = match llm
        .complete(&CompletionRequest::new(
            &models.internal_links,
            prompts::internal_links(&draft, &published),
        ))
        .await
    {
        Completion::Ok(answer) => answer.text,
        Completion::Failed(reason) => {
            warn!(reason = %reason, "internal linking failed, converting the draft without links");
            draft
        }
    };

    progress.phase("HTML conversion");
    let html = llm
        .complete(&CompletionRequest::new(
            &models.html,
            prompts::html_conversion(&linked),
        ))
        .await
        .into_stage_result("html conversion")?
        .text;

    Ok(html)
}

fn save_html(path: &Path, html: &str) -> Result<()> {
    std::fs::write(path, html).map_err(|e| SeoPipeError::io(path, e))
}

#[cfg(test)]
mod tests {
    use crate::completion::Answer;
    use crate::progress::SilentProgress;
    use crate::testing::{ScriptedClient, cleanup, failed, ok, temp_store, write};

    use super::*;

    const CLUSTERS: &str = "Cluster,Intent,Keywords,Primary Keyword,Completed\n\
                            Done,i,k,old keyword,Yes\n\
                            Implants,Replace teeth,\"implants, cost\",dental implants (2025)!,No\n\
                            Whitening,Brighter smile,whitening,teeth whitening,\n";

    fn config() -> WriteConfig {
        WriteConfig::from(&AppConfig::default())
    }

    fn research_answer() -> Completion {
        Completion::Ok(Answer {
            text: "Implants last decades[1]. Costs vary[2].".into(),
            citations: vec!["https://a.example".into(), "https://b.example".into()],
        })
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("teeth whitening"), "teeth_whitening.html");
        assert_eq!(
            sanitize_filename("dental implants (2025)!"),
            "dental_implants_2025.html"
        );
        assert_eq!(sanitize_filename("kid-friendly dentist"), "kid-friendly_dentist.html");
        assert_eq!(sanitize_filename("???"), "untitled_blog_post.html");
        assert_eq!(sanitize_filename(""), "untitled_blog_post.html");
    }

    #[test]
    fn internal_links_text() {
        let posts = vec![
            PostedRow {
                topic: "Flossing".into(),
                keywords: "floss".into(),
                summary: "- one\n- two".into(),
                url: "https://mine.example/floss".into(),
                analysed: "Yes".into(),
                ..Default::default()
            },
            PostedRow::default(),
        ];
        assert_eq!(
            format_internal_links(&posts),
            "- URL: https://mine.example/floss\n  Topic: Flossing\n  Keywords: floss\n  Summary: - one - two\n"
        );
        assert!(format_internal_links(&[]).starts_with("No published posts"));
    }

    #[tokio::test]
    async fn writes_post_and_marks_cluster() {
        let store = temp_store();
        write(&store.paths().clusters, CLUSTERS);
        write(
            &store.paths().posted,
            "Topic,Keywords,Summary,URL,Analysed\nFlossing,floss,s,https://mine.example/floss,Yes\n",
        );

        let llm = ScriptedClient::new([
            ok("- \"Why\" implants\n- Costs"),
            research_answer(),
            ok("DETAILED"),
            ok("DRAFT"),
            ok("DRAFT WITH LINKS"),
            ok("<div>post</div>"),
        ]);

        let post = write_next_post(&llm, &store, &config(), &SilentProgress)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(post.primary_keyword, "dental implants (2025)!");
        assert!(post.marked_completed);
        assert_eq!(
            post.path,
            store.paths().output_dir.join("dental_implants_2025.html")
        );
        assert_eq!(std::fs::read_to_string(&post.path).unwrap(), "<div>post</div>");

        let requests = llm.requests();
        assert_eq!(requests.len(), 6);
        let models = AppConfig::default().models;
        assert_eq!(requests[0].model, models.preliminary_plan);
        assert_eq!(requests[1].model, models.research);
        assert_eq!(requests[1].prompt, "-  Why  implants - Costs");
        assert_eq!(requests[1].system.as_deref(), Some(prompts::RESEARCH_INSTRUCTION));
        assert!(requests[2].prompt.contains(
            "Implants last decades - source: https://a.example. Costs vary - source: https://b.example."
        ));
        assert_eq!(requests[3].model, models.writer);
        assert!(requests[4].prompt.contains("https://mine.example/floss"));
        assert!(requests[5].prompt.contains("DRAFT WITH LINKS"));
        assert_eq!(requests[5].model, models.html);

        assert_eq!(
            store.next_pending_cluster().unwrap().primary_keyword,
            "teeth whitening"
        );
        cleanup(&store);
    }

    #[tokio::test]
    async fn internal_link_failure_falls_back_to_draft() {
        let store = temp_store();
        write(&store.paths().clusters, CLUSTERS);

        let llm = ScriptedClient::new([
            ok("plan"),
            research_answer(),
            ok("DETAILED"),
            ok("THE DRAFT"),
            failed("provider error"),
            ok("<p>html</p>"),
        ]);

        let post = write_next_post(&llm, &store, &config(), &SilentProgress)
            .await
            .unwrap()
            .unwrap();
        assert!(post.marked_completed);
        assert!(llm.requests()[5].prompt.contains("THE DRAFT"));
        assert!(llm.requests()[4].prompt.contains("No published posts"));
        assert!(!store.paths().posted.exists());
        cleanup(&store);
    }

    #[tokio::test]
    async fn stage_failure_aborts_and_leaves_cluster_pending() {
        let store = temp_store();
        write(&store.paths().clusters, CLUSTERS);

        let llm = ScriptedClient::new([ok("plan"), failed("timeout")]);

        let err = write_next_post(&llm, &store, &config(), &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "stage 'research' failed: timeout");
        assert_eq!(llm.requests().len(), 2);
        assert_eq!(
            store.next_pending_cluster().unwrap().primary_keyword,
            "dental implants (2025)!"
        );
        assert!(
            std::fs::read_dir(&store.paths().output_dir)
                .unwrap()
                .next()
                .is_none()
        );
        cleanup(&store);
    }

    #[tokio::test]
    async fn missing_clusters_file_aborts() {
        let store = temp_store();
        let llm = ScriptedClient::new([]);

        let err = write_next_post(&llm, &store, &config(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SeoPipeError::Validation { .. }));
        assert!(llm.requests().is_empty());
        cleanup(&store);
    }

    #[tokio::test]
    async fn nothing_pending_is_none() {
        let store = temp_store();
        write(
            &store.paths().clusters,
            "Cluster,Intent,Keywords,Primary Keyword,Completed\nA,i,k,a,Yes\n",
        );
        let llm = ScriptedClient::new([]);

        let post = write_next_post(&llm, &store, &config(), &SilentProgress)
            .await
            .unwrap();
        assert!(post.is_none());
        cleanup(&store);
    }
}
