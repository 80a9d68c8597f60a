//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use seopipe_core::{
    AnalyzeConfig, OpenRouterClient, PlanConfig, ProgressReporter, WriteConfig, plan_keywords,
    run_analysis, write_next_post,
};
use seopipe_shared::{
    AppConfig, PipelinePaths, init_config, load_config, load_config_from, validate_api_key,
};
use seopipe_storage::CsvStore;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// seopipe: research competitors, plan keyword clusters, write blog posts.
#[derive(Parser)]
#[command(
    name = "seopipe",
    version,
    about = "Analyse competitor posts, plan keyword clusters and write SEO blog posts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.seopipe/seopipe.toml.
    #[arg(long, global = true, env = "SEOPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the CSV files (overrides `paths.data_dir`).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Analyse pending competitor URLs and published posts.
    Analyze,

    /// Build keyword clusters from the competitor analysis.
    Plan,

    /// Write the blog post for the next pending cluster.
    Write,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "seopipe=info",
        1 => "seopipe=debug",
        _ => "seopipe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_ref()),
        },
        Command::Analyze => {
            let ctx = Context::load(&cli)?;
            cmd_analyze(&ctx).await
        }
        Command::Plan => {
            let ctx = Context::load(&cli)?;
            cmd_plan(&ctx).await
        }
        Command::Write => {
            let ctx = Context::load(&cli)?;
            cmd_write(&ctx).await
        }
    }
}

/// Everything a pipeline command needs, resolved once at startup.
struct Context {
    config: AppConfig,
    store: CsvStore,
    llm: OpenRouterClient,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self> {
        let config = resolve_config(cli.config.as_ref())?;
        let api_key = validate_api_key(&config)?;
        let llm = OpenRouterClient::new(&config.openrouter, api_key)?;

        let paths = PipelinePaths::resolve(&config.paths, cli.data_dir.as_deref());
        info!(data_dir = %paths.data_dir.display(), "using data directory");

        Ok(Self {
            store: CsvStore::new(paths),
            config,
            llm,
        })
    }
}

fn resolve_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_analyze(ctx: &Context) -> Result<()> {
    let config = AnalyzeConfig::from(&ctx.config);
    let reporter = CliProgress::new();
    let summary = run_analysis(&ctx.llm, &ctx.store, &config, &reporter).await;

    println!();
    println!("  Analysis finished");
    println!(
        "  Competitors: {}/{} analysed",
        summary.competitors_analysed, summary.competitors_pending
    );
    println!(
        "  Published:   {}/{} analysed",
        summary.posted_analysed, summary.posted_pending
    );
    if summary.skipped() > 0 {
        println!(
            "  Skipped:     {} (still queued, see the log)",
            summary.skipped()
        );
    }
    println!();
    Ok(())
}

async fn cmd_plan(ctx: &Context) -> Result<()> {
    let config = PlanConfig::from(&ctx.config);
    let reporter = CliProgress::new();
    let outcome = plan_keywords(&ctx.llm, &ctx.store, &config, &reporter)
        .await
        .inspect_err(|_| reporter.abandon())?;

    println!();
    println!("  Keyword planning finished");
    println!(
        "  Competitor keywords: {}",
        outcome.competitor_keywords.len()
    );
    println!("  Clusters added:      {}", outcome.clusters_added);
    println!(
        "  Clusters file:       {}",
        ctx.store.paths().clusters.display()
    );
    println!();
    Ok(())
}

async fn cmd_write(ctx: &Context) -> Result<()> {
    let config = WriteConfig::from(&ctx.config);
    let reporter = CliProgress::new();
    let written = write_next_post(&ctx.llm, &ctx.store, &config, &reporter)
        .await
        .inspect_err(|_| reporter.abandon())?;

    println!();
    match written {
        Some(post) => {
            println!("  Blog post written");
            println!("  Cluster:         {}", post.cluster);
            println!("  Primary keyword: {}", post.primary_keyword);
            println!("  File:            {}", post.path.display());
            if !post.marked_completed {
                println!("  Warning:         cluster could not be flagged as completed");
            }
        }
        None => println!("  No pending clusters. Run `seopipe plan` to add more."),
    }
    println!();
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&PathBuf>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str =
        toml::to_string_pretty(&config).map_err(|e| eyre!("failed to render config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.abandon_with_message("failed");
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, label: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {label}"));
    }

    fn done(&self, _summary: &str) {
        self.spinner.finish_and_clear();
    }
}
