//! Raw model-output types and the validation stage.
//!
//! The model returns a camelCase JSON object (the shape shown literally in
//! the prompt's schema example). The raw types here are its deserialization
//! target: required fields are plain, everything the model may omit is
//! `Option`. [`validate`] is the engine's final funnel stage — a structural
//! check against the schemars-derived JSON Schema, then the semantic checks
//! the schema can't express (non-empty arrays, `correctIndex` in range,
//! minimum summary length).
//!
//! The [`mapper`](crate::mapper) later normalizes these raw types into the
//! domain model's always-present-but-possibly-empty shape.

use crate::error::AttemptError;
use crate::json_schema_for;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::OnceLock;

/// Option-count bounds for a quiz item.
pub const MIN_QUIZ_OPTIONS: usize = 2;
pub const MAX_QUIZ_OPTIONS: usize = 6;

/// Minimum length of the chat summary, in characters.
pub const MIN_SUMMARY_CHARS: usize = 10;

#[derive(Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawTableRow {
    pub label: String,
    pub value: String,
}

#[derive(Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawNote {
    pub id: Option<String>,
    pub heading: String,
    pub content: String,
    pub bullets: Option<Vec<String>>,
    pub example: Option<String>,
    pub derivation: Option<String>,
    pub explanation: Option<String>,
    pub applications: Option<Vec<String>>,
    pub common_mistakes: Option<Vec<String>>,
    pub summary_table: Option<Vec<RawTableRow>>,
}

#[derive(Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawQuiz {
    pub id: Option<String>,
    pub question: String,
    pub options: Vec<String>,
    /// Signed on purpose: a model returning `-1` must fail range validation,
    /// not deserialization.
    pub correct_index: i64,
    pub explanation: String,
    pub difficulty: Option<String>,
}

#[derive(Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawFlashcard {
    pub id: Option<String>,
    pub front: String,
    pub back: String,
    pub tag: Option<String>,
}

/// The validated generic result handed to the result mapper.
#[derive(Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawAsset {
    pub title: String,
    pub notes: Vec<RawNote>,
    pub quizzes: Vec<RawQuiz>,
    pub flashcards: Vec<RawFlashcard>,
    pub summary_for_chat: String,
}

fn asset_validator() -> Option<&'static jsonschema::Validator> {
    static VALIDATOR: OnceLock<Option<jsonschema::Validator>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| jsonschema::validator_for(&json_schema_for::<RawAsset>()).ok())
        .as_ref()
}

/// Check a parsed value against the asset schema and semantic invariants.
///
/// Returns the typed raw asset on success, or a `Validation` attempt
/// failure naming every violated constraint.
pub fn validate(value: &serde_json::Value) -> Result<RawAsset, AttemptError> {
    // Structural pass: shape, required fields, field types.
    if let Some(validator) = asset_validator() {
        let errors: Vec<String> = validator
            .iter_errors(value)
            .map(|e| format!("{}: {e}", e.instance_path()))
            .collect();
        if !errors.is_empty() {
            return Err(AttemptError::Validation(errors.join("; ")));
        }
    }

    let asset: RawAsset = serde_json::from_value(value.clone())
        .map_err(|e| AttemptError::Validation(format!("unexpected shape: {e}")))?;

    // Semantic pass: the constraints the schema can't express.
    let mut violations: Vec<String> = Vec::new();
    if asset.notes.is_empty() {
        violations.push("notes is empty".to_string());
    }
    if asset.quizzes.is_empty() {
        violations.push("quizzes is empty".to_string());
    }
    if asset.flashcards.is_empty() {
        violations.push("flashcards is empty".to_string());
    }
    for (i, quiz) in asset.quizzes.iter().enumerate() {
        let count = quiz.options.len();
        if !(MIN_QUIZ_OPTIONS..=MAX_QUIZ_OPTIONS).contains(&count) {
            violations.push(format!(
                "quizzes[{i}] has {count} options (expected {MIN_QUIZ_OPTIONS}-{MAX_QUIZ_OPTIONS})"
            ));
        }
        if quiz.correct_index < 0 || quiz.correct_index >= count as i64 {
            violations.push(format!(
                "quizzes[{i}] correctIndex {} out of range 0..{count}",
                quiz.correct_index
            ));
        }
    }
    if asset.summary_for_chat.chars().count() < MIN_SUMMARY_CHARS {
        violations.push(format!(
            "summaryForChat shorter than {MIN_SUMMARY_CHARS} characters"
        ));
    }

    if violations.is_empty() {
        Ok(asset)
    } else {
        Err(AttemptError::Validation(violations.join("; ")))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::FailureStage;
    use serde_json::json;

    pub(crate) fn valid_asset_value() -> serde_json::Value {
        json!({
            "title": "Newton's Laws",
            "notes": [{
                "heading": "Second Law",
                "content": "Net force equals mass times acceleration.",
                "bullets": ["F = ma"]
            }],
            "quizzes": [{
                "question": "F = ?",
                "options": ["ma", "mv", "mgh"],
                "correctIndex": 0,
                "explanation": "Newton's second law."
            }],
            "flashcards": [{
                "front": "Second law",
                "back": "F = ma"
            }],
            "summaryForChat": "Covers Newton's laws of motion."
        })
    }

    #[test]
    fn valid_asset_validates() {
        let asset = validate(&valid_asset_value()).unwrap();
        assert_eq!(asset.title, "Newton's Laws");
        assert_eq!(asset.notes.len(), 1);
        assert_eq!(asset.quizzes[0].correct_index, 0);
        assert!(asset.notes[0].example.is_none());
    }

    #[test]
    fn missing_required_field_fails() {
        let mut value = valid_asset_value();
        value.as_object_mut().unwrap().remove("title");
        let err = validate(&value).unwrap_err();
        assert_eq!(err.stage(), FailureStage::Validation);
    }

    #[test]
    fn empty_mandatory_array_fails() {
        let mut value = valid_asset_value();
        value["quizzes"] = json!([]);
        let err = validate(&value).unwrap_err();
        assert!(err.to_string().contains("quizzes is empty"));
    }

    #[test]
    fn correct_index_out_of_range_fails() {
        let mut value = valid_asset_value();
        value["quizzes"][0]["correctIndex"] = json!(3);
        let err = validate(&value).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        value["quizzes"][0]["correctIndex"] = json!(-1);
        assert!(validate(&value).is_err());
    }

    #[test]
    fn too_few_quiz_options_fails() {
        let mut value = valid_asset_value();
        value["quizzes"][0]["options"] = json!(["only one"]);
        value["quizzes"][0]["correctIndex"] = json!(0);
        let err = validate(&value).unwrap_err();
        assert!(err.to_string().contains("options"));
    }

    #[test]
    fn undersized_summary_fails() {
        let mut value = valid_asset_value();
        value["summaryForChat"] = json!("too short");
        let err = validate(&value).unwrap_err();
        assert!(err.to_string().contains("summaryForChat"));
    }

    #[test]
    fn wrong_type_fails_structurally() {
        let mut value = valid_asset_value();
        value["notes"] = json!("not an array");
        let err = validate(&value).unwrap_err();
        assert_eq!(err.stage(), FailureStage::Validation);
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let mut value = valid_asset_value();
        value["vendorExtension"] = json!({"anything": true});
        assert!(validate(&value).is_ok());
    }

    #[test]
    fn multiple_violations_are_all_reported() {
        let mut value = valid_asset_value();
        value["flashcards"] = json!([]);
        value["summaryForChat"] = json!("short");
        let message = validate(&value).unwrap_err().to_string();
        assert!(message.contains("flashcards is empty"));
        assert!(message.contains("summaryForChat"));
    }
}
