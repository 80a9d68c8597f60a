//! Pipeline orchestration for seopipe.
//!
//! Three batch pipelines drive a completion model over the CSV store:
//! - [`analyzer::run_analysis`]: summarise competitor and own posts
//! - [`keyword_planner::plan_keywords`]: turn the analysis into keyword clusters
//! - [`blog_writer::write_next_post`]: write the post for the next pending cluster
//!
//! Model access goes through the [`CompletionClient`] trait, implemented for
//! OpenRouter by [`OpenRouterClient`].

pub mod analyzer;
pub mod blog_writer;
pub mod citations;
pub mod completion;
pub mod keyword_planner;
pub mod progress;
pub mod prompts;

#[cfg(test)]
mod testing;

pub use analyzer::{AnalysisSummary, AnalyzeConfig, run_analysis};
pub use blog_writer::{WriteConfig, WrittenPost, write_next_post};
pub use completion::{Answer, Completion, CompletionClient, CompletionRequest, OpenRouterClient};
pub use keyword_planner::{PlanConfig, PlanOutcome, plan_keywords};
pub use progress::{ProgressReporter, SilentProgress};
