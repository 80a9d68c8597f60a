//! Application configuration for seopipe.
//!
//! User config lives at `~/.seopipe/seopipe.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SeoPipeError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "seopipe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".seopipe";

// ---------------------------------------------------------------------------
// Config structs (matching seopipe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// CSV and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Model used by each pipeline stage.
    #[serde(default)]
    pub models: ModelsConfig,

    /// The client the content is produced for.
    #[serde(default)]
    pub client: ClientConfig,

    /// Batch behaviour.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[paths]` section. Relative file names resolve against `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the CSV files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_competitor_urls_file")]
    pub competitor_urls_file: String,

    #[serde(default = "default_analysis_file")]
    pub analysis_file: String,

    #[serde(default = "default_posted_file")]
    pub posted_file: String,

    #[serde(default = "default_clusters_file")]
    pub clusters_file: String,

    /// Directory for generated HTML posts.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            competitor_urls_file: default_competitor_urls_file(),
            analysis_file: default_analysis_file(),
            posted_file: default_posted_file(),
            clusters_file: default_clusters_file(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_data_dir() -> String {
    ".".into()
}
fn default_competitor_urls_file() -> String {
    "Competitor URLs.csv".into()
}
fn default_analysis_file() -> String {
    "Competitor Analysis.csv".into()
}
fn default_posted_file() -> String {
    "Posted.csv".into()
}
fn default_clusters_file() -> String {
    "Clusters.csv".into()
}
fn default_output_dir() -> String {
    "generated_blog_posts".into()
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API root; `chat/completions` is appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout. An expired request counts as a failed stage.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl OpenRouterConfig {
    /// Resolve the chat completions endpoint from `base_url`.
    pub fn chat_completions_url(&self) -> Result<Url> {
        let mut base = self.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base = Url::parse(&base).map_err(|e| {
            SeoPipeError::config(format!("invalid openrouter.base_url '{}': {e}", self.base_url))
        })?;
        base.join("chat/completions")
            .map_err(|e| SeoPipeError::config(format!("invalid completions endpoint: {e}")))
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_request_timeout() -> u64 {
    300
}

/// `[models]` section: one OpenRouter model ID per stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_analyzer_model")]
    pub analyzer: String,
    #[serde(default = "default_thinking_model")]
    pub keyword_planner: String,
    #[serde(default = "default_thinking_model")]
    pub preliminary_plan: String,
    #[serde(default = "default_research_model")]
    pub research: String,
    #[serde(default = "default_thinking_model")]
    pub detailed_plan: String,
    #[serde(default = "default_writer_model")]
    pub writer: String,
    #[serde(default = "default_thinking_model")]
    pub internal_links: String,
    #[serde(default = "default_html_model")]
    pub html: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            analyzer: default_analyzer_model(),
            keyword_planner: default_thinking_model(),
            preliminary_plan: default_thinking_model(),
            research: default_research_model(),
            detailed_plan: default_thinking_model(),
            writer: default_writer_model(),
            internal_links: default_thinking_model(),
            html: default_html_model(),
        }
    }
}

fn default_analyzer_model() -> String {
    "openai/gpt-4o-mini-search-preview".into()
}
fn default_thinking_model() -> String {
    "google/gemini-2.5-flash-preview:thinking".into()
}
fn default_research_model() -> String {
    "perplexity/llama-3.1-sonar-large-128k-online".into()
}
fn default_writer_model() -> String {
    "anthropic/claude-3.7-sonnet".into()
}
fn default_html_model() -> String {
    "openai/gpt-4o".into()
}

/// `[client]` section, interpolated into the prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Business name, e.g. "San Diego Dental Studio".
    #[serde(default = "default_client_name")]
    pub name: String,

    /// Industry used when describing competitors, e.g. "Dental".
    #[serde(default = "default_client_industry")]
    pub industry: String,

    /// Lines of business, comma-separated.
    #[serde(default = "default_client_services")]
    pub services: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            industry: default_client_industry(),
            services: default_client_services(),
        }
    }
}

fn default_client_name() -> String {
    "San Diego Dental Studio".into()
}
fn default_client_industry() -> String {
    "Dental".into()
}
fn default_client_services() -> String {
    "preventive care, dental restorations and cosmetic dentistry".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fixed pause between queued analysis calls. 0 disables it.
    #[serde(default)]
    pub inter_call_delay_ms: u64,

    /// How many competitor keywords feed the keyword planner.
    #[serde(default = "default_top_keywords")]
    pub top_competitor_keywords: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inter_call_delay_ms: 0,
            top_competitor_keywords: default_top_keywords(),
        }
    }
}

fn default_top_keywords() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Resolved paths (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Absolute-or-relative file locations, resolved once at startup and handed
/// to every component that touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub data_dir: PathBuf,
    pub competitor_urls: PathBuf,
    pub analysis: PathBuf,
    pub posted: PathBuf,
    pub clusters: PathBuf,
    pub output_dir: PathBuf,
}

impl PipelinePaths {
    /// Resolve every file against `data_dir`, or against `paths.data_dir`
    /// when no override is given.
    pub fn resolve(paths: &PathsConfig, data_dir_override: Option<&Path>) -> Self {
        let data_dir = data_dir_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&paths.data_dir));

        Self {
            competitor_urls: data_dir.join(&paths.competitor_urls_file),
            analysis: data_dir.join(&paths.analysis_file),
            posted: data_dir.join(&paths.posted_file),
            clusters: data_dir.join(&paths.clusters_file),
            output_dir: data_dir.join(&paths.output_dir),
            data_dir,
        }
    }

    /// All files rooted in a single directory with default names.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::resolve(&PathsConfig::default(), Some(data_dir.as_ref()))
    }
}

impl From<&AppConfig> for PipelinePaths {
    fn from(config: &AppConfig) -> Self {
        Self::resolve(&config.paths, None)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.seopipe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SeoPipeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.seopipe/seopipe.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SeoPipeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SeoPipeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SeoPipeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SeoPipeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SeoPipeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the OpenRouter API key from the env var named in config.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(SeoPipeError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable \
             (a .env file in the working directory is also read)."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("clusters_file"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("anthropic/claude-3.7-sonnet"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.paths.posted_file, "Posted.csv");
        assert_eq!(parsed.pipeline.top_competitor_keywords, 5);
        assert_eq!(parsed.pipeline.inter_call_delay_ms, 0);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[paths]
data_dir = "/srv/seo"

[models]
writer = "openai/gpt-4o"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.paths.data_dir, "/srv/seo");
        assert_eq!(config.paths.clusters_file, "Clusters.csv");
        assert_eq!(config.models.writer, "openai/gpt-4o");
        assert_eq!(config.models.research, "perplexity/llama-3.1-sonar-large-128k-online");
        assert_eq!(config.client.name, "San Diego Dental Studio");
    }

    #[test]
    fn paths_resolve_against_data_dir() {
        let config = AppConfig::default();
        let paths = PipelinePaths::resolve(&config.paths, Some(Path::new("/tmp/seo")));
        assert_eq!(paths.competitor_urls, PathBuf::from("/tmp/seo/Competitor URLs.csv"));
        assert_eq!(paths.analysis, PathBuf::from("/tmp/seo/Competitor Analysis.csv"));
        assert_eq!(paths.posted, PathBuf::from("/tmp/seo/Posted.csv"));
        assert_eq!(paths.clusters, PathBuf::from("/tmp/seo/Clusters.csv"));
        assert_eq!(paths.output_dir, PathBuf::from("/tmp/seo/generated_blog_posts"));

        let from_config = PipelinePaths::from(&config);
        assert_eq!(from_config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn completions_url_joins_base() {
        let mut cfg = OpenRouterConfig::default();
        assert_eq!(
            cfg.chat_completions_url().unwrap().as_str(),
            "https://openrouter.ai/api/v1/chat/completions"
        );

        cfg.base_url = "http://127.0.0.1:9999/".into();
        assert_eq!(
            cfg.chat_completions_url().unwrap().as_str(),
            "http://127.0.0.1:9999/chat/completions"
        );

        cfg.base_url = "not a url".into();
        assert!(cfg.chat_completions_url().is_err());
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openrouter.api_key_env = "SEOPIPE_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
