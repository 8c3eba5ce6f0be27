//! The extraction-method strategy seam.
//!
//! Each tier in the fallback chain implements [`ExtractionTier`]. The
//! orchestrator iterates tiers generically in ascending cost order, so
//! adding a tier never requires orchestrator changes.

use async_trait::async_trait;

use crate::error::Result;
use crate::source::SourceDetection;
use crate::types::result::ExtractionResult;

/// Everything a tier may look at for one attempt.
#[derive(Debug, Clone, Default)]
pub struct TierInput {
    /// Source URL, when the request started from one.
    pub url: Option<String>,

    /// Fetched page HTML, when the source was fetchable.
    pub html: Option<String>,

    /// Caller-supplied plain text (pasted content, captions).
    pub text: Option<String>,

    /// What the classifier concluded about the URL.
    pub detection: Option<SourceDetection>,
}

impl TierInput {
    /// Input for a fetched page.
    pub fn for_page(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            html: Some(html.into()),
            ..Default::default()
        }
    }

    /// Input for raw pasted text with no URL.
    pub fn for_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Attach classifier output.
    pub fn with_detection(mut self, detection: Option<SourceDetection>) -> Self {
        self.detection = detection;
        self
    }

    /// Attach fallback text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// One extraction method in the fallback chain.
#[async_trait]
pub trait ExtractionTier: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Position in the chain; lower is cheaper and tried first.
    fn cost(&self) -> u8;

    /// Attempt extraction. Domain-level misses are encoded in the
    /// returned result; `Err` is reserved for infrastructure failures
    /// and is swallowed by the orchestrator as a zero-scoring attempt.
    async fn attempt(&self, input: &TierInput) -> Result<ExtractionResult>;
}
