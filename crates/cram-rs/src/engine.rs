//! Generation engine: the defensive funnel around the model call.
//!
//! Model output is the least trustworthy input in the system — not
//! adversarial, but routinely malformed in small fixable ways and
//! occasionally in large unfixable ones. The engine runs each completion
//! through repair → parse → validate, retrying the whole funnel exactly
//! once with a stricter instruction, then failing with the last-seen stage.
//! Unbounded retries are a rejected design: two model calls is the ceiling.
//!
//! The funnel is an explicit state machine rather than nested error
//! handling, so the retry and terminal transitions are auditable:
//!
//! ```text
//! Requesting → Repairing → Parsing → Validating → Done
//!        ↑          └──────────┴──────────┘
//!        └── Retrying (once) ──┘
//!                  └── Failed (second failure)
//! ```
//!
//! Transport failures are not part of the funnel: they surface immediately
//! from `Requesting` on either attempt, because retrying an expensive model
//! call on a network error without backoff risks cost amplification, and
//! backoff policy belongs to the caller.

use crate::config::PipelineConfig;
use crate::error::{AttemptError, GenerateError};
use crate::prompt::Prompt;
use crate::schema::{self, RawAsset};
use crate::{ChatRequest, Message, ModelClient, ResponseFormat, repair};
use tracing::{debug, info, warn};

/// Stricter instruction appended on the retry attempt.
const STRICT_RETRY_INSTRUCTION: &str = "\
Your previous response was not valid. Return only complete, syntactically valid \
JSON — no code fences, no surrounding text. Verify every required field is present \
and every correctIndex points at an existing option before responding.";

/// States of the generation funnel. Payloads carry each stage's input.
#[derive(Debug)]
enum State {
    /// Issue the model call for the current attempt.
    Requesting,
    /// Raw completion text awaiting syntax repair.
    Repairing(String),
    /// Repaired text awaiting parsing into a generic value.
    Parsing(String),
    /// Parsed value awaiting schema and semantic validation.
    Validating(serde_json::Value),
    /// A stage failed; retry once or escalate.
    Retrying(AttemptError),
    /// Terminal: validated output.
    Done(RawAsset),
    /// Terminal: both attempts failed.
    Failed(AttemptError),
}

/// Runs the main generation call and the defensive parsing funnel.
pub struct GenerationEngine<'a> {
    client: &'a dyn ModelClient,
    config: &'a PipelineConfig,
}

impl<'a> GenerationEngine<'a> {
    pub fn new(client: &'a dyn ModelClient, config: &'a PipelineConfig) -> Self {
        Self { client, config }
    }

    /// Run the funnel to completion for the given prompt.
    pub async fn run(&self, prompt: &Prompt) -> Result<RawAsset, GenerateError> {
        let mut attempt: u32 = 0;
        let mut state = State::Requesting;
        loop {
            state = match state {
                State::Requesting => {
                    let completion = self.request(prompt, attempt > 0).await?;
                    State::Repairing(completion)
                }
                State::Repairing(raw) => match repair::repair(&raw) {
                    Ok(json_text) => State::Parsing(json_text),
                    Err(err) => State::Retrying(err),
                },
                State::Parsing(json_text) => match serde_json::from_str::<serde_json::Value>(
                    &json_text,
                ) {
                    Ok(value) if value.is_object() => State::Validating(value),
                    Ok(value) => State::Retrying(AttemptError::Parse(format!(
                        "completion is not a JSON object (got {})",
                        json_type_name(&value)
                    ))),
                    Err(e) => State::Retrying(AttemptError::Parse(e.to_string())),
                },
                State::Validating(value) => match schema::validate(&value) {
                    Ok(asset) => State::Done(asset),
                    Err(err) => State::Retrying(err),
                },
                State::Retrying(err) => {
                    if attempt == 0 {
                        warn!("generation attempt failed at {} ({}); retrying once", err.stage(), err.message());
                        attempt = 1;
                        State::Requesting
                    } else {
                        State::Failed(err)
                    }
                }
                State::Done(asset) => {
                    info!("generation validated: \"{}\"", asset.title);
                    return Ok(asset);
                }
                State::Failed(err) => {
                    warn!("generation failed after retry at {}: {}", err.stage(), err.message());
                    return Err(err.into());
                }
            };
        }
    }

    /// Issue one completion call. Empty content flows into the funnel as an
    /// empty string (repair rejects it); transport errors surface directly.
    async fn request(&self, prompt: &Prompt, strict: bool) -> Result<String, GenerateError> {
        let mut messages = vec![Message::system(prompt.system.clone())];
        if strict {
            messages.push(Message::system(STRICT_RETRY_INSTRUCTION));
        }
        messages.push(Message::user(prompt.user.clone()));

        let request = ChatRequest {
            model: Some(self.config.model.clone()),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: Some(ResponseFormat::json_object()),
        };

        debug!(
            "generation request: model={}, strict={strict}",
            self.config.model
        );
        let completion = self
            .client
            .complete(request)
            .await
            .map_err(GenerateError::Transport)?;
        Ok(completion.content.unwrap_or_default())
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::GenerationContext;
    use crate::error::FailureStage;
    use crate::prompt::build_prompt;
    use crate::{ChatCompletion, CompletionFuture};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stub model returning scripted responses in order; repeats the last
    /// one when the script runs out. Counts calls.
    struct ScriptedModel {
        script: Vec<Result<String, String>>,
        calls: AtomicUsize,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedModel {
        fn new(script: Vec<Result<String, String>>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn always(response: &str) -> Self {
            Self::new(vec![Ok(response.to_string())])
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ModelClient for ScriptedModel {
        fn complete(&self, request: ChatRequest) -> CompletionFuture<'_> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            let response = self
                .script
                .get(n)
                .or_else(|| self.script.last())
                .cloned()
                .expect("script must not be empty");
            Box::pin(async move {
                response.map(|content| ChatCompletion {
                    content: Some(content),
                    usage: None,
                    finish_reason: Some("stop".into()),
                })
            })
        }
    }

    fn valid_response() -> String {
        crate::schema::tests::valid_asset_value().to_string()
    }

    fn engine_parts() -> PipelineConfig {
        PipelineConfig::new("test-model")
    }

    fn test_prompt() -> Prompt {
        build_prompt("F = ma", &GenerationContext::document(), None)
    }

    #[tokio::test]
    async fn well_formed_response_succeeds_first_attempt() {
        let model = ScriptedModel::always(&valid_response());
        let config = engine_parts();
        let asset = GenerationEngine::new(&model, &config)
            .run(&test_prompt())
            .await
            .unwrap();
        assert_eq!(asset.title, "Newton's Laws");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn trailing_comma_is_repaired_without_retry() {
        // Inject a trailing comma before the closing brace.
        let mut with_comma = valid_response();
        with_comma.pop();
        with_comma.push_str(",}");
        let model = ScriptedModel::always(&with_comma);
        let config = engine_parts();
        let asset = GenerationEngine::new(&model, &config)
            .run(&test_prompt())
            .await
            .unwrap();
        assert_eq!(asset.notes.len(), 1);
        assert_eq!(model.calls(), 1, "repairable output must not burn the retry");
    }

    #[tokio::test]
    async fn fenced_response_is_repaired_without_retry() {
        let fenced = format!("```json\n{}\n```", valid_response());
        let model = ScriptedModel::always(&fenced);
        let config = engine_parts();
        assert!(
            GenerationEngine::new(&model, &config)
                .run(&test_prompt())
                .await
                .is_ok()
        );
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn garbage_fails_after_exactly_two_calls() {
        let model = ScriptedModel::always("I cannot help with that.");
        let config = engine_parts();
        let err = GenerationEngine::new(&model, &config)
            .run(&test_prompt())
            .await
            .unwrap_err();
        assert_eq!(model.calls(), 2, "exactly one retry, never a third call");
        match err {
            GenerateError::Generation { stage, .. } => assert_eq!(stage, FailureStage::Repair),
            GenerateError::Transport(_) => panic!("wrong variant"),
        }
    }

    #[tokio::test]
    async fn invalid_then_valid_succeeds_on_retry() {
        let model = ScriptedModel::new(vec![
            Ok("not json at all".to_string()),
            Ok(valid_response()),
        ]);
        let config = engine_parts();
        let asset = GenerationEngine::new(&model, &config)
            .run(&test_prompt())
            .await
            .unwrap();
        assert_eq!(asset.title, "Newton's Laws");
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn retry_adds_strict_instruction() {
        let model = ScriptedModel::new(vec![
            Ok("garbage".to_string()),
            Ok(valid_response()),
        ]);
        let config = engine_parts();
        GenerationEngine::new(&model, &config)
            .run(&test_prompt())
            .await
            .unwrap();

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let first_has_strict = requests[0]
            .messages
            .iter()
            .any(|m| m.content.contains("syntactically valid JSON"));
        let second_has_strict = requests[1]
            .messages
            .iter()
            .any(|m| m.content.contains("syntactically valid JSON"));
        assert!(!first_has_strict);
        assert!(second_has_strict);
    }

    #[tokio::test]
    async fn validation_failure_twice_reports_validation_stage() {
        let mut invalid = crate::schema::tests::valid_asset_value();
        invalid["quizzes"][0]["correctIndex"] = serde_json::json!(99);
        let model = ScriptedModel::always(&invalid.to_string());
        let config = engine_parts();
        let err = GenerationEngine::new(&model, &config)
            .run(&test_prompt())
            .await
            .unwrap_err();
        assert_eq!(model.calls(), 2);
        match err {
            GenerateError::Generation { stage, ref message } => {
                assert_eq!(stage, FailureStage::Validation);
                assert!(message.contains("out of range"));
            }
            GenerateError::Transport(_) => panic!("wrong variant"),
        }
    }

    #[tokio::test]
    async fn transport_failure_surfaces_immediately_without_retry() {
        let model = ScriptedModel::new(vec![Err("OpenRouter API HTTP 503: down".to_string())]);
        let config = engine_parts();
        let err = GenerationEngine::new(&model, &config)
            .run(&test_prompt())
            .await
            .unwrap_err();
        assert_eq!(model.calls(), 1, "transport errors are never retried in-core");
        assert!(matches!(err, GenerateError::Transport(_)));
    }

    #[tokio::test]
    async fn transport_failure_on_retry_attempt_also_surfaces() {
        let model = ScriptedModel::new(vec![
            Ok("garbage".to_string()),
            Err("request failed: connection reset".to_string()),
        ]);
        let config = engine_parts();
        let err = GenerationEngine::new(&model, &config)
            .run(&test_prompt())
            .await
            .unwrap_err();
        assert_eq!(model.calls(), 2);
        assert!(matches!(err, GenerateError::Transport(_)));
    }

    #[tokio::test]
    async fn array_completion_fails_at_repair_stage() {
        // An array has no '{' to anchor repair on.
        let model = ScriptedModel::always("[1, 2, 3]");
        let config = engine_parts();
        let err = GenerationEngine::new(&model, &config)
            .run(&test_prompt())
            .await
            .unwrap_err();
        match err {
            GenerateError::Generation { stage, .. } => assert_eq!(stage, FailureStage::Repair),
            GenerateError::Transport(_) => panic!("wrong variant"),
        }
    }

    #[tokio::test]
    async fn unparsable_object_fails_at_parse_stage() {
        // Balanced braces but broken interior syntax: repair leaves it
        // alone and the parse stage rejects it.
        let model = ScriptedModel::always(r#"{"title": }"#);
        let config = engine_parts();
        let err = GenerationEngine::new(&model, &config)
            .run(&test_prompt())
            .await
            .unwrap_err();
        match err {
            GenerateError::Generation { stage, .. } => assert_eq!(stage, FailureStage::Parse),
            GenerateError::Transport(_) => panic!("wrong variant"),
        }
    }

    #[tokio::test]
    async fn requests_json_object_output() {
        let model = ScriptedModel::always(&valid_response());
        let config = engine_parts();
        GenerationEngine::new(&model, &config)
            .run(&test_prompt())
            .await
            .unwrap();
        let requests = model.requests.lock().unwrap();
        assert!(requests[0].response_format.is_some());
        assert_eq!(requests[0].temperature, config.temperature);
    }
}
