//! The transient result of one extraction attempt.

use serde::{Deserialize, Serialize};

use crate::types::recipe::{PartialRecipeDraft, RecipeDraft};

/// Which method in the fallback chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionMethod {
    /// schema.org JSON-LD structured data
    SchemaOrg,
    /// HTML microdata (itemscope/itemprop)
    Microdata,
    /// Heading/list pattern heuristics
    Heuristics,
    /// Generative model fallback
    Ai,
    /// No method succeeded; the caller must paste content manually
    Manual,
}

/// Outcome of a single extraction request.
///
/// Produced per request and never persisted. `success` implies the
/// draft has at least one ingredient and one step; all failure modes
/// are encoded here rather than raised as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<RecipeDraft>,

    pub extraction_method: ExtractionMethod,

    /// Self-assessed output quality in [0, 1].
    pub confidence: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub requires_manual_input: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_data: Option<PartialRecipeDraft>,
}

impl ExtractionResult {
    /// A method produced a draft. `success` is true only when the draft
    /// is complete; incomplete drafts are still carried for partial-data
    /// recovery.
    pub fn extracted(method: ExtractionMethod, recipe: RecipeDraft, confidence: f32) -> Self {
        let success = recipe.is_complete();
        Self {
            success,
            recipe: Some(recipe),
            extraction_method: method,
            confidence: confidence.clamp(0.0, 1.0),
            tokens_used: None,
            processing_time_ms: None,
            error: None,
            requires_manual_input: false,
            partial_data: None,
        }
    }

    /// A method ran but found nothing usable.
    pub fn not_found(method: ExtractionMethod, error: impl Into<String>) -> Self {
        Self {
            success: false,
            recipe: None,
            extraction_method: method,
            confidence: 0.0,
            tokens_used: None,
            processing_time_ms: None,
            error: Some(error.into()),
            requires_manual_input: false,
            partial_data: None,
        }
    }

    /// Every method failed or the source cannot be fetched; direct the
    /// caller to the manual-paste path with whatever was recovered.
    pub fn manual_input(partial: Option<PartialRecipeDraft>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            recipe: None,
            extraction_method: ExtractionMethod::Manual,
            confidence: 0.0,
            tokens_used: None,
            processing_time_ms: None,
            error: Some(error.into()),
            requires_manual_input: true,
            partial_data: partial.filter(|p| !p.is_empty()),
        }
    }

    /// Attach AI usage accounting.
    pub fn with_usage(mut self, tokens_used: u32, processing_time_ms: u64) -> Self {
        self.tokens_used = Some(tokens_used);
        self.processing_time_ms = Some(processing_time_ms);
        self
    }

    /// Best-effort fields for a manual form, from either the draft or
    /// previously attached partial data.
    pub fn recovered_fields(&self) -> Option<PartialRecipeDraft> {
        if let Some(partial) = &self.partial_data {
            return Some(partial.clone());
        }
        self.recipe.as_ref().map(PartialRecipeDraft::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracted_complete_recipe_is_success() {
        let recipe = RecipeDraft::new("Soup")
            .with_ingredients(["water"])
            .with_steps(["boil"]);
        let result = ExtractionResult::extracted(ExtractionMethod::SchemaOrg, recipe, 0.9);
        assert!(result.success);
        assert_eq!(result.extraction_method, ExtractionMethod::SchemaOrg);
    }

    #[test]
    fn extracted_incomplete_recipe_is_not_success() {
        let recipe = RecipeDraft::new("Soup");
        let result = ExtractionResult::extracted(ExtractionMethod::Heuristics, recipe, 0.4);
        assert!(!result.success);
        assert!(result.recipe.is_some());
    }

    #[test]
    fn confidence_is_clamped_to_unit_interval() {
        let recipe = RecipeDraft::new("Soup")
            .with_ingredients(["water"])
            .with_steps(["boil"]);
        let high = ExtractionResult::extracted(ExtractionMethod::Ai, recipe.clone(), 3.0);
        let low = ExtractionResult::extracted(ExtractionMethod::Ai, recipe, -1.0);
        assert_eq!(high.confidence, 1.0);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn manual_input_drops_empty_partials() {
        let result = ExtractionResult::manual_input(
            Some(PartialRecipeDraft::default()),
            "nothing recovered",
        );
        assert!(result.requires_manual_input);
        assert!(result.partial_data.is_none());
    }

    #[test]
    fn method_serializes_to_screaming_snake_case() {
        let json = serde_json::to_string(&ExtractionMethod::SchemaOrg).unwrap();
        assert_eq!(json, "\"SCHEMA_ORG\"");
        let json = serde_json::to_string(&ExtractionMethod::Ai).unwrap();
        assert_eq!(json, "\"AI\"");
    }
}
