//! The public entry point: raw text in, validated learning asset out.
//!
//! [`Pipeline::generate`] runs the stages strictly in sequence — normalize,
//! fingerprint, dedup lookup (hit short-circuits everything), strategy
//! selection, optional two-stage summarization, prompt assembly, the
//! generation funnel, mapping, and the store write. The two possible model
//! calls are always sequenced, never concurrent: the main call depends on
//! the summarizer's output.
//!
//! Independent requests may run concurrently; the asset store is the only
//! shared state.
//!
//! # Lifetimes
//!
//! `Pipeline<'a>` borrows the model client and the asset store to avoid
//! unnecessary heap allocation; both must outlive the `generate()` call.

use crate::asset::{GenerationContext, LearningAsset};
use crate::config::PipelineConfig;
use crate::engine::GenerationEngine;
use crate::error::GenerateError;
use crate::fingerprint::Fingerprint;
use crate::mapper;
use crate::normalize::normalize;
use crate::prompt::build_prompt;
use crate::store::AssetStore;
use crate::strategy::Strategy;
use crate::summarize::TwoStageSummarizer;
use crate::ModelClient;
use tracing::info;

/// The result of one `generate()` call.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub asset: LearningAsset,
    pub fingerprint: Fingerprint,
    /// Whether the asset came from the dedup store instead of a fresh
    /// generation.
    pub cached: bool,
    /// The strategy that was (or would be) applied to this material.
    pub strategy: Strategy,
}

/// The learning-asset generation pipeline.
pub struct Pipeline<'a> {
    client: &'a dyn ModelClient,
    store: &'a dyn AssetStore,
    config: PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        client: &'a dyn ModelClient,
        store: &'a dyn AssetStore,
        config: PipelineConfig,
    ) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Generate (or fetch) the learning asset for the given material.
    ///
    /// Never returns a partially populated asset: on success the asset
    /// satisfies every schema invariant; on failure a typed
    /// [`GenerateError`] is raised.
    pub async fn generate(
        &self,
        raw_text: &str,
        context: &GenerationContext,
    ) -> Result<GenerateOutcome, GenerateError> {
        let text = normalize(raw_text);
        let fingerprint = Fingerprint::of(&text);
        let strategy = self.config.thresholds.select(&text);

        if let Some(asset) = self.store.lookup(&fingerprint).await {
            info!("dedup hit for {fingerprint}; skipping generation");
            return Ok(GenerateOutcome {
                asset,
                fingerprint,
                cached: true,
                strategy,
            });
        }

        info!(
            "generating: {} chars of {} content, strategy {strategy}",
            text.chars().count(),
            context.content_type
        );

        let (working_text, effective) = self.prepare_working_text(&text, strategy).await;
        let prompt = build_prompt(&working_text, context, effective.note());
        let raw = GenerationEngine::new(self.client, &self.config)
            .run(&prompt)
            .await?;
        let asset = mapper::map(raw, context);

        self.store.store(&fingerprint, asset.clone()).await;

        Ok(GenerateOutcome {
            asset,
            fingerprint,
            cached: false,
            strategy: effective,
        })
    }

    /// Apply the selected strategy to the normalized text, returning the
    /// working text and the strategy that was actually applied (two-stage
    /// summarization degrades to truncation when it fails or is disabled).
    async fn prepare_working_text(&self, text: &str, strategy: Strategy) -> (String, Strategy) {
        match strategy {
            Strategy::PassThrough | Strategy::ExpandThin => (text.to_string(), strategy),
            Strategy::Truncate => (
                self.config.thresholds.truncate_with_annotation(text),
                Strategy::Truncate,
            ),
            Strategy::TwoStageSummarize => {
                if self.config.summarizer.enabled {
                    let summarizer =
                        TwoStageSummarizer::new(self.client, &self.config.summarizer.config);
                    if let Some(summary) = summarizer.summarize(text, &self.config.model).await {
                        return (summary, Strategy::TwoStageSummarize);
                    }
                }
                (
                    self.config.thresholds.truncate_with_annotation(text),
                    Strategy::Truncate,
                )
            }
        }
    }
}
