//! Error taxonomy for the generation pipeline.
//!
//! Transport failures surface immediately — retrying an expensive model call
//! on a network error without backoff risks cost amplification, and backoff
//! policy belongs to the caller. Repair, parse, and validation failures are
//! recovered locally exactly once (the engine's single retry); a second
//! occurrence escalates to [`GenerateError::Generation`] carrying the
//! originating stage.

use thiserror::Error;

/// The funnel stage that produced a generation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Completion text could not be coerced into JSON even after lenient repair.
    Repair,
    /// Repaired text did not parse into a JSON object.
    Parse,
    /// Parsed value failed schema or semantic checks.
    Validation,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Repair => write!(f, "repair"),
            FailureStage::Parse => write!(f, "parse"),
            FailureStage::Validation => write!(f, "validation"),
        }
    }
}

/// A failure of a single generation attempt, internal to the engine.
///
/// Carries the failing stage so that the terminal error can report where
/// the retried attempt gave up.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("repair: {0}")]
    Repair(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

impl AttemptError {
    /// The stage this attempt failed at.
    pub fn stage(&self) -> FailureStage {
        match self {
            AttemptError::Repair(_) => FailureStage::Repair,
            AttemptError::Parse(_) => FailureStage::Parse,
            AttemptError::Validation(_) => FailureStage::Validation,
        }
    }

    /// The failure message without the stage prefix.
    pub fn message(&self) -> &str {
        match self {
            AttemptError::Repair(m) | AttemptError::Parse(m) | AttemptError::Validation(m) => m,
        }
    }
}

/// The typed failure raised by [`Pipeline::generate`](crate::pipeline::Pipeline::generate).
///
/// A caller never receives a partially populated asset — either generation
/// succeeds with a complete, schema-valid [`LearningAsset`](crate::asset::LearningAsset)
/// or one of these variants is raised.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The model service call itself could not complete (network/auth/quota).
    /// Never retried inside the pipeline.
    #[error("model transport failure: {0}")]
    Transport(String),

    /// The defensive funnel failed on both the initial attempt and the single
    /// retry. Carries the last-seen failing stage and message.
    #[error("generation failed during {stage}: {message}")]
    Generation {
        stage: FailureStage,
        message: String,
    },
}

impl From<AttemptError> for GenerateError {
    fn from(err: AttemptError) -> Self {
        GenerateError::Generation {
            stage: err.stage(),
            message: err.message().to_string(),
        }
    }
}
