//! Test doubles shared by the pipeline tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use seopipe_shared::PipelinePaths;
use seopipe_storage::CsvStore;

use crate::completion::{Answer, Completion, CompletionClient, CompletionRequest};

/// Replays a fixed list of completions and records every request.
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Completion>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(replies: impl IntoIterator<Item = Completion>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Completion {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Completion::Failed("no scripted reply left".into()))
    }
}

pub(crate) fn ok(text: &str) -> Completion {
    Completion::Ok(Answer::text(text))
}

pub(crate) fn failed(reason: &str) -> Completion {
    Completion::Failed(reason.into())
}

/// A [`CsvStore`] rooted in a fresh temp directory.
pub(crate) fn temp_store() -> CsvStore {
    let dir = std::env::temp_dir().join(format!("seopipe-core-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    CsvStore::new(PipelinePaths::in_dir(dir))
}

pub(crate) fn cleanup(store: &CsvStore) {
    let _ = std::fs::remove_dir_all(&store.paths().data_dir);
}

pub(crate) fn write(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
}

pub(crate) fn analysis_table(topic: &str, keywords: &str) -> String {
    format!("| Topic | Keywords | Summary |\n|---|---|---|\n| {topic} | {keywords} | - a<br>- b |")
}
