//! Configuration for the [`Pipeline`](crate::pipeline::Pipeline).
//!
//! One immutable struct passed at construction time — no ambient globals —
//! so tests can substitute models, temperatures, and length thresholds
//! without touching process state.
//!
//! ```ignore
//! let config = PipelineConfig::new("openai/gpt-4o-mini")
//!     .with_temperature(0.5)
//!     .with_max_tokens(8192)
//!     .with_thresholds(LengthThresholds {
//!         expand_below: 200,
//!         context_limit: 8_000,
//!         summarize_above: 16_000,
//!     });
//! ```

use crate::DEFAULT_MODEL;
use crate::strategy::LengthThresholds;
use crate::summarize::SummarizerConfig;

/// Generic enabled/disabled wrapper for optional pipeline stages.
///
/// When `enabled` is `false`, the stage is skipped regardless of the inner
/// config values.
#[derive(Debug, Clone)]
pub struct Toggle<T: Default> {
    /// Whether this stage is active.
    pub enabled: bool,
    /// Stage-specific configuration.
    pub config: T,
}

impl<T: Default> Toggle<T> {
    /// Create a disabled instance with default inner config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            config: T::default(),
        }
    }
}

impl<T: Default> Default for Toggle<T> {
    fn default() -> Self {
        Self {
            enabled: true,
            config: T::default(),
        }
    }
}

/// Immutable pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model for the main generation call.
    pub model: String,
    /// Temperature for the main generation call. A low-mid value: some
    /// creative elaboration is wanted for flashcards and quiz phrasing, but
    /// wild structural variance is not. Deterministic-zero is deliberately
    /// not the default.
    pub temperature: f32,
    /// Maximum tokens for the main generation completion.
    pub max_tokens: u32,
    /// Length bands for strategy selection.
    pub thresholds: LengthThresholds,
    /// The two-stage summarizer. When disabled, very long input degrades to
    /// truncation instead.
    pub summarizer: Toggle<SummarizerConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.6,
            max_tokens: 8192,
            thresholds: LengthThresholds::default(),
            summarizer: Toggle::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a config for the given model with defaults everywhere else.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_thresholds(mut self, thresholds: LengthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_summarizer(mut self, config: SummarizerConfig) -> Self {
        self.summarizer = Toggle {
            enabled: true,
            config,
        };
        self
    }

    pub fn without_summarizer(mut self) -> Self {
        self.summarizer = Toggle::disabled();
        self
    }
}
