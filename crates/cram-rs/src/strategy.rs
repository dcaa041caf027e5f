//! Length-adaptive strategy selection.
//!
//! The model has a finite, costly context window. [`LengthThresholds`]
//! picks the cheapest transformation that still preserves enough signal for
//! high-quality output, and every degradation is declared — truncated text
//! carries an annotation, and each strategy contributes a note the prompt
//! builder injects so the model knows what it is (and isn't) seeing.
//!
//! The thresholds are tunable configuration, not derived invariants.

/// How the working text is fitted into the model's context budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Text fits comfortably; used verbatim.
    PassThrough,
    /// Text is sparse; the model is told to expand it into full-depth
    /// materials rather than summarize further.
    ExpandThin,
    /// Text slightly exceeds the context budget; cut to the budget with an
    /// explicit truncation annotation.
    Truncate,
    /// Text far exceeds the budget; compressed by a preliminary model call
    /// before the main generation call.
    TwoStageSummarize,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::PassThrough => write!(f, "pass-through"),
            Strategy::ExpandThin => write!(f, "expand-thin"),
            Strategy::Truncate => write!(f, "truncate"),
            Strategy::TwoStageSummarize => write!(f, "two-stage-summarize"),
        }
    }
}

impl Strategy {
    /// The disclaimer injected into the prompt for this strategy, if any.
    pub fn note(&self) -> Option<&'static str> {
        match self {
            Strategy::PassThrough => None,
            Strategy::ExpandThin => Some(
                "Note: the source material is brief. Expand it into full-depth study \
                 materials — give every concept background, context, and worked examples \
                 rather than summarizing it further.",
            ),
            Strategy::Truncate => Some(
                "Note: the source material exceeded the processing window and was truncated; \
                 the tail of the document is missing. Generate materials only from what is \
                 present and do not invent content for the missing portion.",
            ),
            Strategy::TwoStageSummarize => Some(
                "Note: the source material was very long and has been condensed into the \
                 comprehensive summary above. Every major topic, definition, formula, and \
                 example was preserved during condensation.",
            ),
        }
    }
}

/// Character-count boundaries between strategies, in disjoint bands.
#[derive(Debug, Clone)]
pub struct LengthThresholds {
    /// Below this, material is considered thin and gets `ExpandThin`.
    pub expand_below: usize,
    /// Upper context budget in characters. Text up to this length passes
    /// through verbatim; truncation cuts to this length.
    pub context_limit: usize,
    /// Above this, text is routed through the two-stage summarizer.
    pub summarize_above: usize,
}

impl Default for LengthThresholds {
    fn default() -> Self {
        Self {
            expand_below: 500,
            context_limit: 12_000,
            summarize_above: 20_000,
        }
    }
}

impl LengthThresholds {
    /// Choose a strategy for normalized text. Lengths are measured in
    /// characters, not bytes.
    pub fn select(&self, text: &str) -> Strategy {
        let chars = text.chars().count();
        if chars < self.expand_below {
            Strategy::ExpandThin
        } else if chars <= self.context_limit {
            Strategy::PassThrough
        } else if chars > self.summarize_above {
            Strategy::TwoStageSummarize
        } else {
            Strategy::Truncate
        }
    }

    /// Cut text to the context limit at a character boundary, appending an
    /// explicit truncation annotation so the model and the eventual reader
    /// both know information was dropped.
    pub fn truncate_with_annotation(&self, text: &str) -> String {
        let total = text.chars().count();
        if total <= self.context_limit {
            return text.to_string();
        }
        let kept: String = text.chars().take(self.context_limit).collect();
        format!(
            "{kept}\n\n[truncated: showing the first {} of {} characters]",
            self.context_limit, total
        )
    }
}
