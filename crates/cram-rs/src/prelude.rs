//! Convenience re-exports for the common case.
//!
//! ```ignore
//! use cram_rs::prelude::*;
//! ```

pub use crate::asset::{
    ContentType, Flashcard, GenerationContext, LearningAsset, NoteSection, QuizItem,
    SourceMetadata, TableRow,
};
pub use crate::config::{PipelineConfig, Toggle};
pub use crate::error::{FailureStage, GenerateError};
pub use crate::fingerprint::Fingerprint;
pub use crate::pipeline::{GenerateOutcome, Pipeline};
pub use crate::store::{AssetStore, MemoryAssetStore};
pub use crate::strategy::{LengthThresholds, Strategy};
pub use crate::summarize::SummarizerConfig;
pub use crate::{ChatCompletion, ChatRequest, Message, ModelClient, OpenRouterClient};
