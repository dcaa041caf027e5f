//! Learning-asset generation pipeline for study material.
//!
//! `cram-rs` ingests arbitrary study material — document text, lecture audio
//! transcripts, video transcripts — and produces a validated, schema-conformant
//! [`LearningAsset`](asset::LearningAsset): a title, note sections, a quiz, a
//! deck of flashcards, and a short chat-context summary. The central type is
//! the [`Pipeline`](pipeline::Pipeline), which wires every stage together
//! behind a single [`generate()`](pipeline::Pipeline::generate) call.
//!
//! # Getting started
//!
//! ```ignore
//! use cram_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GenerateError> {
//!     let api_key = std::env::var("OPENROUTER_KEY").unwrap();
//!     let client = OpenRouterClient::new(api_key)
//!         .map_err(GenerateError::Transport)?;
//!     let store = MemoryAssetStore::new();
//!     let config = PipelineConfig::new("openai/gpt-4o-mini");
//!
//!     let pipeline = Pipeline::new(&client, &store, config);
//!     let outcome = pipeline
//!         .generate("Newton's second law states F = ma ...", &GenerationContext::document())
//!         .await?;
//!
//!     println!("{} ({} notes)", outcome.asset.title, outcome.asset.notes.len());
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! If you're looking for how to...
//!
//! - **Run the pipeline:** see [`Pipeline`](pipeline::Pipeline) and
//!   [`PipelineConfig`](config::PipelineConfig). The pipeline borrows a
//!   [`ModelClient`] and an [`AssetStore`](store::AssetStore) so tests can
//!   substitute both.
//! - **Understand the output:** see [`LearningAsset`](asset::LearningAsset),
//!   [`NoteSection`](asset::NoteSection), [`QuizItem`](asset::QuizItem), and
//!   [`Flashcard`](asset::Flashcard).
//! - **Skip duplicate generations:** see [`Fingerprint`](fingerprint::Fingerprint)
//!   and the [`AssetStore`](store::AssetStore) trait — identical normalized text
//!   is generated once and served from the store afterwards.
//! - **Tune length handling:** see [`LengthThresholds`](strategy::LengthThresholds)
//!   and [`Strategy`](strategy::Strategy) for the pass-through / expand /
//!   truncate / two-stage-summarize decision.
//! - **Harden against malformed model output:** see [`repair`] for lenient
//!   JSON syntax repair and [`engine`] for the repair → parse → validate
//!   funnel with its single bounded retry.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pipeline`] | Public entry point: normalize → dedup → strategy → generate → map |
//! | [`engine`] | Generation state machine with the defensive parsing funnel |
//! | [`asset`] | The learning-asset domain model |
//! | [`normalize`] | Whitespace and markup normalization |
//! | [`fingerprint`] | Content-addressed dedup keys |
//! | [`store`] | Asset store trait and in-memory implementation |
//! | [`strategy`] | Length-adaptive strategy selection |
//! | [`summarize`] | Two-stage compression for oversized input |
//! | [`prompt`] | Content-type-aware prompt assembly |
//! | [`repair`] | Lenient JSON syntax repair |
//! | [`schema`] | Raw output types and schema validation |
//! | [`mapper`] | Validated output → domain entities |
//!
//! # Design principles
//!
//! 1. **Model output is untrusted.** The completion text is the least
//!    reliable input in the system — routinely malformed in small, fixable
//!    ways and occasionally in large, unfixable ones. It passes through a
//!    three-stage funnel (syntax repair → parse → schema validation) with
//!    exactly one retry, represented as an explicit state machine rather
//!    than nested error handling.
//!
//! 2. **Identical material is billed once.** The dedup store short-circuits
//!    the whole pipeline on a fingerprint hit; no model call is made.
//!
//! 3. **Degradation is always declared.** Truncation and summarization
//!    inject an explicit note into the prompt so neither the model nor the
//!    eventual reader is misled about missing material.
//!
//! 4. **Either a complete asset exists or generation failed.** There is no
//!    partially populated output; every returned asset satisfies the schema
//!    invariants.

pub mod asset;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod mapper;
pub mod normalize;
pub mod pipeline;
pub mod prelude;
pub mod prompt;
pub mod repair;
pub mod schema;
pub mod store;
pub mod strategy;
pub mod summarize;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// Re-export schemars for downstream crates.
pub use schemars;

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for the main generation call.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. This is the bridge between strong Rust types and
/// the `serde_json::Value` that the [`jsonschema`] validator consumes.
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Only the fields this pipeline uses —
/// unused optional fields are omitted from serialization.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}
fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

/// JSON output format type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ResponseFormatType {
    #[serde(rename = "json_object")]
    JsonObject,
}

/// JSON output mode.
#[derive(Serialize, Debug)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub fmt_type: ResponseFormatType,
}

impl ResponseFormat {
    /// Request object-shaped output from the model.
    pub fn json_object() -> Self {
        Self {
            fmt_type: ResponseFormatType::JsonObject,
        }
    }
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from a completion call.
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── ModelClient trait ──────────────────────────────────────────────

/// Boxed future returned by [`ModelClient::complete`].
///
/// Type alias to keep trait signatures and implementations readable.
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<ChatCompletion, String>> + Send + 'a>>;

/// The model completion seam.
///
/// The pipeline talks to the language model exclusively through this trait,
/// so tests can substitute a stub that returns canned completions and counts
/// calls. The error string is a transport-level failure (network, auth,
/// quota) — it is surfaced to the caller immediately and never retried
/// inside the pipeline.
///
/// Uses a boxed future so that the trait is dyn-compatible (object-safe).
pub trait ModelClient: Send + Sync {
    /// Issue one chat completion request.
    fn complete(&self, request: ChatRequest) -> CompletionFuture<'_>;
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    referer: String,
    title: String,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and default headers.
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        Self::with_headers(api_key, "https://github.com/cram-rs", "cram-rs")
    }

    /// Create a new client with custom Referer and X-Title headers.
    pub fn with_headers(
        api_key: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("cram-rs/0.2")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            referer: referer.into(),
            title: title.into(),
        })
    }

    /// Send a chat completion request.
    async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, String> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model.as_deref().unwrap_or("(none)"),
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("OpenRouter API HTTP {status}: {text}"));
        }

        let parsed: RawChatResponse =
            serde_json::from_str(&text).map_err(|e| format!("failed to parse response: {e}"))?;

        if let Some(err) = parsed.error {
            return Err(format!("OpenRouter API error: {}", err.message));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        let choice = parsed.choices.and_then(|c| c.into_iter().next());

        match choice {
            Some(c) => {
                debug!(
                    "LLM output: {} chars text",
                    c.message.content.as_ref().map_or(0, |s| s.len())
                );
                Ok(ChatCompletion {
                    content: c.message.content,
                    usage: parsed.usage,
                    finish_reason: c.finish_reason,
                })
            }
            None => {
                debug!("LLM output: empty (no choices)");
                Ok(ChatCompletion {
                    content: None,
                    usage: parsed.usage,
                    finish_reason: None,
                })
            }
        }
    }
}

impl ModelClient for OpenRouterClient {
    fn complete(&self, request: ChatRequest) -> CompletionFuture<'_> {
        Box::pin(async move { self.chat(&request).await })
    }
}
