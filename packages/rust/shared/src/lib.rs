//! Shared types, error model, and configuration for seopipe.
//!
//! This crate is the foundation depended on by all other seopipe crates.
//! It provides:
//! - [`SeoPipeError`]: the unified error type
//! - CSV record types ([`Fields`], [`UrlQueueRow`], [`AnalysisRow`], [`PostedRow`], [`ClusterRow`])
//! - Configuration ([`AppConfig`], [`PipelinePaths`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ClientConfig, ModelsConfig, OpenRouterConfig, PathsConfig, PipelineConfig,
    PipelinePaths, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_api_key,
};
pub use error::{Result, SeoPipeError};
pub use types::{
    ANALYSIS_HEADERS, AnalysisFields, AnalysisRow, CLUSTER_HEADERS, ClusterRow, CsvRecord,
    FLAG_YES, Fields, POSTED_HEADERS, PostedRow, URL_QUEUE_HEADERS, UrlQueueRow, columns,
};
