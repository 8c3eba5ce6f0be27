//! AI seam for the most expensive extraction tier.
//!
//! The model behind this trait is treated as an opaque capability with
//! a cost/latency/confidence contract: implementations report token
//! usage alongside the recipe-shaped output.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::recipe::RecipeDraft;

/// What the model returned for one extraction call.
#[derive(Debug, Clone)]
pub struct RecipeCompletion {
    /// Parsed recipe, if the model found one in the content.
    pub recipe: Option<RecipeDraft>,

    /// Model's self-assessed confidence in [0, 1].
    pub confidence: f32,

    /// Total tokens billed for the call.
    pub tokens_used: u32,
}

/// Turns free-form page text or captions into a recipe draft.
#[async_trait]
pub trait RecipeAi: Send + Sync {
    async fn extract_recipe(
        &self,
        content: &str,
        source_url: Option<&str>,
    ) -> Result<RecipeCompletion>;
}
