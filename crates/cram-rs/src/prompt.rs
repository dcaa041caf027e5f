//! Content-type-aware prompt assembly.
//!
//! [`build_prompt`] produces the instruction block for the main generation
//! call: content-type framing, source metadata, the working text, the
//! strategy disclaimer (if any degradation was applied), fixed structural
//! requirements, and a literal example of the exact output shape.
//!
//! The schema example and structural counts are fixed constants, not
//! derived from input — prompt structure is stable across calls; only the
//! embedded text and strategy note vary.

use crate::asset::{ContentType, GenerationContext};

/// Minimum note sections requested from the model.
pub const MIN_NOTE_SECTIONS: usize = 3;
/// Minimum quiz items requested from the model.
pub const MIN_QUIZ_ITEMS: usize = 4;
/// Minimum flashcards requested from the model.
pub const MIN_FLASHCARDS: usize = 6;

/// Literal example of the exact output shape the model must return.
/// Embedded verbatim in every prompt.
const SCHEMA_EXAMPLE: &str = r#"{
  "title": "Newton's Laws of Motion",
  "notes": [
    {
      "heading": "The Second Law",
      "content": "Net force equals mass times acceleration: $F = ma$.",
      "bullets": ["Force is a vector", "Units: newtons (N)"],
      "example": "A 2 kg mass accelerating at 3 m/s² experiences $F = 6$ N.",
      "derivation": null,
      "explanation": "Acceleration is proportional to net force and inversely proportional to mass.",
      "applications": ["Rocket propulsion", "Vehicle braking distance"],
      "commonMistakes": ["Confusing mass with weight"],
      "summaryTable": [
        {"label": "Quantity", "value": "Force (N)"}
      ]
    }
  ],
  "quizzes": [
    {
      "question": "What does $F = ma$ relate?",
      "options": ["Force, mass, acceleration", "Force, momentum, time", "Energy, mass, velocity", "Work, force, distance"],
      "correctIndex": 0,
      "explanation": "The second law relates net force to mass and acceleration.",
      "difficulty": "easy"
    }
  ],
  "flashcards": [
    {
      "front": "Newton's second law",
      "back": "$F = ma$ — net force equals mass times acceleration.",
      "tag": "laws"
    }
  ],
  "summaryForChat": "Covers Newton's three laws with emphasis on F = ma and worked examples."
}"#;

/// A built prompt: a fixed system instruction and a per-request user block.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Content-type-specific framing for the user block.
fn framing(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Document => "The source material below is text extracted from a document.",
        ContentType::Audio => {
            "The source material below is a transcript of lecture audio. Transcription \
             artifacts (filler words, mis-heard terms, missing punctuation) may be present; \
             infer the intended meaning."
        }
        ContentType::Video => {
            "The source material below is the transcript of a video. Spoken-language \
             artifacts and references to on-screen visuals may be present; describe \
             referenced visuals from context where possible."
        }
    }
}

/// The fixed generation instruction. Identical for every request.
fn system_instruction() -> String {
    format!(
        "You are an expert tutor turning source material into complete study materials.\n\
         \n\
         ## Structural requirements\n\
         \n\
         - At least {MIN_NOTE_SECTIONS} note sections, each with a heading, substantial \
         content, and bullets where the material supports them.\n\
         - At least {MIN_QUIZ_ITEMS} multiple-choice quiz items. Each has 2 to 6 options, \
         a correctIndex pointing at the right option, and an explanation of why it is right.\n\
         - At least {MIN_FLASHCARDS} flashcards with a concise front and a precise back.\n\
         - A summaryForChat of one to three sentences describing what the material covers.\n\
         \n\
         ## Formatting conventions\n\
         \n\
         - Mark key terms in note content with **bold**.\n\
         - Write inline math as $...$ and display math as $$...$$.\n\
         - Keep headings short and descriptive; no numbering.\n\
         \n\
         ## Output format\n\
         \n\
         Return a single JSON object exactly matching this shape:\n\
         \n\
         {SCHEMA_EXAMPLE}\n\
         \n\
         Optional fields (example, derivation, explanation, difficulty, tag) may be null. \
         Optional arrays (bullets, applications, commonMistakes, summaryTable) may be \
         omitted or empty. Return only the JSON object — no prose, no code fences."
    )
}

/// Assemble the prompt for the main generation call.
///
/// `strategy_note` is the degradation disclaimer from
/// [`Strategy::note`](crate::strategy::Strategy::note), appended after the
/// working text so the model knows which transformation, if any, was
/// applied to the source.
pub fn build_prompt(
    text: &str,
    context: &GenerationContext,
    strategy_note: Option<&str>,
) -> Prompt {
    let mut user = String::with_capacity(text.len() + 512);
    user.push_str(framing(context.content_type));
    user.push('\n');

    let meta = &context.metadata;
    if let Some(ref filename) = meta.filename {
        user.push_str(&format!("Source file: {filename}\n"));
    }
    if let Some(seconds) = meta.duration_seconds {
        user.push_str(&format!("Duration: {seconds:.0} seconds\n"));
    }
    if let Some(ref platform) = meta.platform {
        user.push_str(&format!("Platform: {platform}\n"));
    }
    if let Some(ref url) = meta.url {
        user.push_str(&format!("URL: {url}\n"));
    }

    user.push_str("\n=== SOURCE MATERIAL ===\n");
    user.push_str(text);

    if let Some(note) = strategy_note {
        user.push_str("\n\n");
        user.push_str(note);
    }

    Prompt {
        system: system_instruction(),
        user,
    }
}
