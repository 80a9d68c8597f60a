//! LLM completion collaborator.
//!
//! Every pipeline stage talks to the model through [`CompletionClient`]. A
//! call never returns an error: it resolves to [`Completion::Ok`] with
//! non-empty text, or to [`Completion::Failed`] with a reason, and the stage
//! decides what a failure means for its unit of work.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use seopipe_shared::{OpenRouterConfig, Result, SeoPipeError};

const USER_AGENT: &str = concat!("seopipe/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Collaborator contract
// ---------------------------------------------------------------------------

/// One single-turn request to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Model id as understood by the provider (e.g. `openai/gpt-4o`).
    pub model: String,
    /// Optional system instruction sent ahead of the prompt.
    pub system: Option<String>,
    /// The user prompt.
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A successful answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    /// Source URLs, in the order the `[n]` markers in `text` refer to them.
    pub citations: Vec<String>,
}

impl Answer {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }
}

/// Outcome of a completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Ok(Answer),
    Failed(String),
}

impl Completion {
    /// Turn a failure into a [`SeoPipeError::Stage`] for linear pipelines.
    pub fn into_stage_result(self, stage: &str) -> Result<Answer> {
        match self {
            Self::Ok(answer) => Ok(answer),
            Self::Failed(reason) => Err(SeoPipeError::stage(stage, reason)),
        }
    }
}

/// Something that can answer a [`CompletionRequest`].
pub trait CompletionClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> impl Future<Output = Completion> + Send;
}

// ---------------------------------------------------------------------------
// OpenRouter
// ---------------------------------------------------------------------------

/// [`CompletionClient`] backed by the OpenRouter chat completions API.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(config: &OpenRouterConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SeoPipeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.chat_completions_url()?,
            api_key: api_key.into(),
        })
    }

    async fn send(&self, request: &CompletionRequest) -> std::result::Result<ChatResponse, String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &request.model,
            messages,
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("request timed out: {e}")
                } else {
                    format!("request failed: {e}")
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("failed to read response body: {e}"))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ChatResponse>(&text)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(format!("HTTP {status}: {detail}"));
        }

        serde_json::from_str(&text).map_err(|e| format!("invalid response body: {e}"))
    }
}

impl CompletionClient for OpenRouterClient {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete(&self, request: &CompletionRequest) -> Completion {
        debug!(prompt_len = request.prompt.len(), "sending completion request");

        let completion = match self.send(request).await {
            Ok(response) => response.into_completion(),
            Err(reason) => Completion::Failed(reason),
        };

        match &completion {
            Completion::Ok(answer) => debug!(
                text_len = answer.text.len(),
                citations = answer.citations.len(),
                "completion received"
            ),
            Completion::Failed(reason) => warn!(reason = %reason, "completion failed"),
        }

        completion
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Option<Vec<String>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    annotations: Vec<Annotation>,
}

#[derive(Debug, Deserialize)]
struct Annotation {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    url_citation: Option<UrlCitation>,
}

#[derive(Debug, Deserialize)]
struct UrlCitation {
    url: String,
}

impl ChatResponse {
    fn into_completion(self) -> Completion {
        if let Some(error) = self.error {
            return Completion::Failed(format!("provider error: {}", error.message));
        }

        let Some(choice) = self.choices.into_iter().next() else {
            return Completion::Failed("response contained no choices".into());
        };

        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            return Completion::Failed("model returned empty content".into());
        }

        let citations = match self.citations {
            Some(urls) if !urls.is_empty() => urls,
            _ => choice
                .message
                .annotations
                .into_iter()
                .filter(|a| a.kind == "url_citation")
                .filter_map(|a| a.url_citation.map(|c| c.url))
                .collect(),
        };

        Completion::Ok(Answer { text, citations })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> OpenRouterClient {
        let config = OpenRouterConfig {
            base_url: format!("{}/api/v1", server.uri()),
            request_timeout_secs: 5,
            ..OpenRouterConfig::default()
        };
        OpenRouterClient::new(&config, "test-key").unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("openai/gpt-4o", "Analyze https://c.example/post")
            .with_system("You are an SEO analyst.")
    }

    async fn respond_with(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn sends_messages_with_bearer_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "openai/gpt-4o",
                "messages": [
                    { "role": "system", "content": "You are an SEO analyst." },
                    { "role": "user", "content": "Analyze https://c.example/post" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "| Topic |" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = client_for(&server).complete(&request()).await;
        assert_eq!(completion, Completion::Ok(Answer::text("| Topic |")));
    }

    #[tokio::test]
    async fn top_level_citations_win() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "citations": ["https://a.example", "https://b.example"],
                "choices": [{ "message": {
                    "content": "Fact [1]. Other [2].",
                    "annotations": [
                        { "type": "url_citation", "url_citation": { "url": "https://ignored.example" } }
                    ]
                } }]
            })),
        )
        .await;

        let Completion::Ok(answer) = client_for(&server).complete(&request()).await else {
            panic!("expected answer");
        };
        assert_eq!(answer.citations, vec!["https://a.example", "https://b.example"]);
    }

    #[tokio::test]
    async fn annotation_citations_are_fallback() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "citations": [],
                "choices": [{ "message": {
                    "content": "Fact [1].",
                    "annotations": [
                        { "type": "file", "file": {} },
                        { "type": "url_citation", "url_citation": { "url": "https://a.example", "title": "A" } }
                    ]
                } }]
            })),
        )
        .await;

        let Completion::Ok(answer) = client_for(&server).complete(&request()).await else {
            panic!("expected answer");
        };
        assert_eq!(answer.citations, vec!["https://a.example"]);
    }

    #[tokio::test]
    async fn error_object_is_failure() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "error": { "message": "model overloaded", "code": 503 }
            })),
        )
        .await;

        let completion = client_for(&server).complete(&request()).await;
        assert!(matches!(completion, Completion::Failed(r) if r.contains("model overloaded")));
    }

    #[tokio::test]
    async fn empty_content_is_failure() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "   " } }]
            })),
        )
        .await;

        let completion = client_for(&server).complete(&request()).await;
        assert!(matches!(completion, Completion::Failed(r) if r.contains("empty")));
    }

    #[tokio::test]
    async fn http_error_is_failure() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "No auth credentials found", "code": 401 }
            })),
        )
        .await;

        let completion = client_for(&server).complete(&request()).await;
        match completion {
            Completion::Failed(reason) => {
                assert!(reason.contains("401"));
                assert!(reason.contains("No auth credentials found"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_failure() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(200).set_body_string("<html>")).await;

        let completion = client_for(&server).complete(&request()).await;
        assert!(matches!(completion, Completion::Failed(r) if r.contains("invalid response body")));
    }

    #[test]
    fn failed_completion_becomes_stage_error() {
        let err = Completion::Failed("timeout".into())
            .into_stage_result("research")
            .unwrap_err();
        assert_eq!(err.to_string(), "stage 'research' failed: timeout");
    }
}
