//! Two-stage summarization for oversized input.
//!
//! For very long material, one cheap low-temperature compression call
//! replaces feeding the entire document into the expensive main generation
//! call. The summary becomes the new working text. Failure here is never
//! fatal — the pipeline degrades to truncating the original text instead.

use crate::{ChatRequest, Message, ModelClient};
use tracing::{info, warn};

/// The compression instruction for the preliminary call. Asks for a dense
/// intermediate summary rather than a readable abstract: the output is
/// consumed by the main generation call, not by a person.
const SUMMARIZE_PROMPT: &str = "\
You are compressing long study material into a dense intermediate summary that a \
second model call will turn into complete study materials.

Rules:
- Preserve every major topic, definition, formula, and worked example.
- Preserve technical terms, symbols, and numeric values verbatim.
- Keep the original ordering of topics.
- Do not editorialize, introduce, or conclude — output only the condensed material.
- Density over readability: every sentence must carry information.";

/// Configuration for the preliminary compression call.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Model for the compression call (cheaper than the main model).
    /// Falls back to the main model when unset.
    pub model: Option<String>,
    /// Maximum tokens for the summary completion.
    pub max_summary_tokens: u32,
    /// Temperature for the compression call. Low — compression wants
    /// faithfulness, not creativity.
    pub temperature: f32,
    /// Target size of the summary in characters, stated in the request.
    pub target_chars: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_summary_tokens: 2048,
            temperature: 0.2,
            target_chars: 4000,
        }
    }
}

impl SummarizerConfig {
    /// The model to use for the compression call.
    pub fn summary_model<'a>(&'a self, main_model: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(main_model)
    }
}

/// The preliminary compression stage.
pub struct TwoStageSummarizer<'a> {
    client: &'a dyn ModelClient,
    config: &'a SummarizerConfig,
}

impl<'a> TwoStageSummarizer<'a> {
    pub fn new(client: &'a dyn ModelClient, config: &'a SummarizerConfig) -> Self {
        Self { client, config }
    }

    /// Compress `text` into an intermediate summary.
    ///
    /// Returns `None` on any failure — transport error or an empty
    /// completion — leaving the caller to fall back to truncation. The
    /// degradation is logged, never surfaced as an error.
    pub async fn summarize(&self, text: &str, main_model: &str) -> Option<String> {
        let user = format!(
            "Condense the following material to roughly {} characters.\n\n{text}",
            self.config.target_chars
        );
        let request = ChatRequest {
            model: Some(self.config.summary_model(main_model).to_string()),
            messages: vec![Message::system(SUMMARIZE_PROMPT), Message::user(user)],
            max_tokens: self.config.max_summary_tokens,
            temperature: self.config.temperature,
            response_format: None,
        };

        match self.client.complete(request).await {
            Ok(completion) => {
                let summary = completion.content.unwrap_or_default();
                let summary = summary.trim();
                if summary.is_empty() {
                    warn!("summarization returned empty output; degrading to truncation");
                    None
                } else {
                    info!(
                        "two-stage summarization: {} chars condensed to {}",
                        text.chars().count(),
                        summary.chars().count()
                    );
                    Some(summary.to_string())
                }
            }
            Err(e) => {
                warn!("summarization call failed ({e}); degrading to truncation");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatCompletion, CompletionFuture};
    use std::sync::Mutex;

    /// Stub model that returns a fixed result and records requests.
    struct StubModel {
        response: Result<Option<String>, String>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl StubModel {
        fn returning(content: &str) -> Self {
            Self {
                response: Ok(Some(content.to_string())),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl ModelClient for StubModel {
        fn complete(&self, request: ChatRequest) -> CompletionFuture<'_> {
            let response = self.response.clone();
            self.requests.lock().unwrap().push(request);
            Box::pin(async move {
                response.map(|content| ChatCompletion {
                    content,
                    usage: None,
                    finish_reason: Some("stop".into()),
                })
            })
        }
    }

    #[tokio::test]
    async fn returns_trimmed_summary() {
        let stub = StubModel::returning("  a dense summary  ");
        let config = SummarizerConfig::default();
        let result = TwoStageSummarizer::new(&stub, &config)
            .summarize("long text", "main-model")
            .await;
        assert_eq!(result.as_deref(), Some("a dense summary"));
    }

    #[tokio::test]
    async fn empty_completion_degrades_to_none() {
        let stub = StubModel::returning("   ");
        let config = SummarizerConfig::default();
        let result = TwoStageSummarizer::new(&stub, &config)
            .summarize("long text", "main-model")
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_none() {
        let stub = StubModel {
            response: Err("HTTP 503".into()),
            requests: Mutex::new(Vec::new()),
        };
        let config = SummarizerConfig::default();
        let result = TwoStageSummarizer::new(&stub, &config)
            .summarize("long text", "main-model")
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn uses_override_model_and_low_temperature() {
        let stub = StubModel::returning("summary");
        let config = SummarizerConfig {
            model: Some("cheap-model".into()),
            ..SummarizerConfig::default()
        };
        TwoStageSummarizer::new(&stub, &config)
            .summarize("long text", "main-model")
            .await;

        let requests = stub.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model.as_deref(), Some("cheap-model"));
        assert!(requests[0].temperature <= 0.3);
        assert!(requests[0].messages[1].content.contains("long text"));
    }
}
