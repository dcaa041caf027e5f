//! The learning-asset domain model.
//!
//! A [`LearningAsset`] is the single durable artifact this crate produces:
//! a title, ordered note sections, a quiz, a flashcard deck, and a short
//! summary for seeding follow-up chat. Assets are created only by the
//! [`mapper`](crate::mapper) — never partially constructed — and are
//! immutable after creation; the dedup store returns the same asset for a
//! recurring fingerprint rather than regenerating it.
//!
//! Every array field a consumer might iterate is always present (possibly
//! empty) rather than nullable. The mapper normalizes absent optional
//! arrays from the raw model output into empty vecs so downstream code
//! never branches on presence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Generation context ─────────────────────────────────────────────

/// Where the source text came from. Drives the content-type framing in the
/// prompt (a lecture transcript is prompted differently than a document).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Document,
    Audio,
    Video,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Document => write!(f, "document"),
            ContentType::Audio => write!(f, "audio"),
            ContentType::Video => write!(f, "video"),
        }
    }
}

/// Free-form metadata about the source, supplied by the upstream content
/// producer. All fields optional; present fields are surfaced to the model
/// as context lines in the prompt.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SourceMetadata {
    pub filename: Option<String>,
    pub duration_seconds: Option<f64>,
    pub platform: Option<String>,
    pub url: Option<String>,
}

/// Read-only input to the prompt builder. Never mutated by the pipeline.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GenerationContext {
    pub content_type: ContentType,
    pub metadata: SourceMetadata,
}

impl GenerationContext {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            metadata: SourceMetadata::default(),
        }
    }

    pub fn document() -> Self {
        Self::new(ContentType::Document)
    }

    pub fn audio() -> Self {
        Self::new(ContentType::Audio)
    }

    pub fn video() -> Self {
        Self::new(ContentType::Video)
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.metadata.filename = Some(filename.into());
        self
    }

    pub fn with_duration_seconds(mut self, seconds: f64) -> Self {
        self.metadata.duration_seconds = Some(seconds);
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.metadata.platform = Some(platform.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.metadata.url = Some(url.into());
        self
    }
}

// ── Asset entities ─────────────────────────────────────────────────

/// One row in a note section's summary table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TableRow {
    pub label: String,
    pub value: String,
}

/// A single section of generated study notes.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NoteSection {
    pub id: String,
    pub heading: String,
    pub content: String,
    /// Always present, possibly empty.
    pub bullets: Vec<String>,
    pub example: Option<String>,
    pub derivation: Option<String>,
    pub explanation: Option<String>,
    /// Always present, possibly empty.
    pub applications: Vec<String>,
    /// Always present, possibly empty.
    pub common_mistakes: Vec<String>,
    /// Always present, possibly empty.
    pub summary_table: Vec<TableRow>,
}

/// A single multiple-choice quiz item.
///
/// Invariant for every asset this crate produces:
/// `2 <= options.len() <= 6` and `correct_index < options.len()`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QuizItem {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
    pub difficulty: Option<String>,
}

/// A single flashcard.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Flashcard {
    pub id: String,
    pub front: String,
    pub back: String,
    pub tag: Option<String>,
}

/// The complete generated artifact.
///
/// Invariants: `notes`, `quizzes`, and `flashcards` are non-empty and
/// `summary_for_chat` is at least 10 characters. The engine rejects any
/// model output violating these before an asset is ever constructed.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LearningAsset {
    pub id: String,
    pub title: String,
    pub notes: Vec<NoteSection>,
    pub quizzes: Vec<QuizItem>,
    pub flashcards: Vec<Flashcard>,
    pub summary_for_chat: String,
    /// Content type of the source this asset was generated from.
    pub source: ContentType,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_builders_set_metadata() {
        let ctx = GenerationContext::audio()
            .with_filename("lecture-03.mp3")
            .with_duration_seconds(2710.0);
        assert_eq!(ctx.content_type, ContentType::Audio);
        assert_eq!(ctx.metadata.filename.as_deref(), Some("lecture-03.mp3"));
        assert_eq!(ctx.metadata.duration_seconds, Some(2710.0));
        assert!(ctx.metadata.url.is_none());
    }

    #[test]
    fn content_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ContentType::Video).unwrap(),
            serde_json::json!("video")
        );
        assert_eq!(ContentType::Document.to_string(), "document");
    }
}
