//! Progress reporting hooks for the pipelines.

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage or phase.
    fn phase(&self, name: &str);
    /// Called before each unit of a batch (one URL, one cluster).
    fn item(&self, label: &str, current: usize, total: usize);
    /// Called once the pipeline has finished, with a one-line summary.
    fn done(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _label: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &str) {}
}
