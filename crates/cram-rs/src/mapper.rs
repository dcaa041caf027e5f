//! Result mapper: validated raw output → domain entities.
//!
//! Pure transformation, no network or storage access. Required fields are
//! copied verbatim; every optional array becomes an empty vec when absent
//! so downstream consumers treat them as always-present-but-possibly-empty
//! rather than nullable; missing ids are filled in.

use crate::asset::{
    Flashcard, GenerationContext, LearningAsset, NoteSection, QuizItem, TableRow,
};
use crate::schema::{RawAsset, RawFlashcard, RawNote, RawQuiz, RawTableRow};
use chrono::Utc;
use uuid::Uuid;

fn id_or_new(id: Option<String>) -> String {
    id.filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn map_note(raw: RawNote) -> NoteSection {
    NoteSection {
        id: id_or_new(raw.id),
        heading: raw.heading,
        content: raw.content,
        bullets: raw.bullets.unwrap_or_default(),
        example: raw.example,
        derivation: raw.derivation,
        explanation: raw.explanation,
        applications: raw.applications.unwrap_or_default(),
        common_mistakes: raw.common_mistakes.unwrap_or_default(),
        summary_table: raw
            .summary_table
            .unwrap_or_default()
            .into_iter()
            .map(|RawTableRow { label, value }| TableRow { label, value })
            .collect(),
    }
}

fn map_quiz(raw: RawQuiz) -> QuizItem {
    QuizItem {
        id: id_or_new(raw.id),
        question: raw.question,
        options: raw.options,
        // Validation guarantees the index is in range for the options.
        correct_index: usize::try_from(raw.correct_index).unwrap_or_default(),
        explanation: raw.explanation,
        difficulty: raw.difficulty,
    }
}

fn map_flashcard(raw: RawFlashcard) -> Flashcard {
    Flashcard {
        id: id_or_new(raw.id),
        front: raw.front,
        back: raw.back,
        tag: raw.tag,
    }
}

/// Build the durable asset from validated raw output.
pub fn map(raw: RawAsset, context: &GenerationContext) -> LearningAsset {
    LearningAsset {
        id: Uuid::new_v4().to_string(),
        title: raw.title,
        notes: raw.notes.into_iter().map(map_note).collect(),
        quizzes: raw.quizzes.into_iter().map(map_quiz).collect(),
        flashcards: raw.flashcards.into_iter().map(map_flashcard).collect(),
        summary_for_chat: raw.summary_for_chat,
        source: context.content_type,
        created_at: Utc::now(),
    }
}
