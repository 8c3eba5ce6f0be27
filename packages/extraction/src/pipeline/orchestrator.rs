//! Drives the extraction method chain.
//!
//! Tiers run in ascending cost order; the first result that clears the
//! acceptance threshold with a complete recipe wins. Extraction-domain
//! failures never surface as errors — every failure mode is encoded in
//! the returned [`ExtractionResult`].

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::source::SourceClassifier;
use crate::traits::fetcher::PageFetcher;
use crate::traits::tier::{ExtractionTier, TierInput};
use crate::types::config::OrchestratorConfig;
use crate::types::recipe::PartialRecipeDraft;
use crate::types::result::ExtractionResult;

pub struct ExtractionOrchestrator {
    classifier: SourceClassifier,
    fetcher: Arc<dyn PageFetcher>,
    tiers: Vec<Arc<dyn ExtractionTier>>,
    config: OrchestratorConfig,
}

impl ExtractionOrchestrator {
    /// Build an orchestrator over an explicit tier list.
    ///
    /// The list is sorted by [`ExtractionTier::cost`] once here, so
    /// registration order does not matter.
    pub fn new(fetcher: Arc<dyn PageFetcher>, mut tiers: Vec<Arc<dyn ExtractionTier>>) -> Self {
        tiers.sort_by_key(|t| t.cost());
        Self {
            classifier: SourceClassifier::new(),
            fetcher,
            tiers,
            config: OrchestratorConfig::default(),
        }
    }

    /// Override the policy config.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the source classifier (custom known-site tables).
    pub fn with_classifier(mut self, classifier: SourceClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn classifier(&self) -> &SourceClassifier {
        &self.classifier
    }

    /// Extract a recipe from a URL, with optional caller-supplied
    /// fallback content (captions, pasted text) for sources that cannot
    /// be fetched.
    pub async fn extract(&self, url: &str, fallback_content: Option<&str>) -> ExtractionResult {
        let detection = self.classifier.classify(url);

        let input = match self.fetcher.fetch(url).await {
            Ok(page) => TierInput {
                url: Some(url.to_string()),
                html: Some(page.html),
                text: fallback_content.map(|t| t.to_string()),
                detection,
            },
            Err(err) => {
                warn!(url = %url, error = %err, "source fetch failed");
                match fallback_content {
                    Some(text) if !text.trim().is_empty() => TierInput {
                        url: Some(url.to_string()),
                        html: None,
                        text: Some(text.to_string()),
                        detection,
                    },
                    _ => {
                        let reason = match err {
                            FetchError::AuthRequired { .. } => {
                                "source requires a login; paste the content instead".to_string()
                            }
                            other => format!("could not fetch source: {other}"),
                        };
                        return ExtractionResult::manual_input(None, reason);
                    }
                }
            }
        };

        self.run_chain(&input).await
    }

    /// Extract from raw pasted text with no URL.
    pub async fn extract_text(&self, text: &str) -> ExtractionResult {
        self.run_chain(&TierInput::for_text(text)).await
    }

    async fn run_chain(&self, input: &TierInput) -> ExtractionResult {
        let mut best: Option<ExtractionResult> = None;

        for tier in &self.tiers {
            let result = match tier.attempt(input).await {
                Ok(result) => result,
                Err(err) => {
                    debug!(tier = tier.name(), error = %err, "tier errored; continuing");
                    continue;
                }
            };

            debug!(
                tier = tier.name(),
                confidence = result.confidence,
                success = result.success,
                "tier attempt finished"
            );

            if self.accepts(&result) {
                return result;
            }

            best = Some(match best.take() {
                Some(prev) if prev.confidence >= result.confidence => prev,
                _ => result,
            });
        }

        // Chain exhausted: direct the caller to the manual path with
        // whatever the best attempt recovered.
        let partial: Option<PartialRecipeDraft> = best.as_ref().and_then(|r| r.recovered_fields());
        ExtractionResult::manual_input(
            partial,
            "no extraction method produced a usable recipe",
        )
    }

    fn accepts(&self, result: &ExtractionResult) -> bool {
        result.success && result.confidence >= self.config.acceptance_threshold
    }
}
