//! Tier 3: generative-model fallback.
//!
//! The most expensive tier. Strips the page down to visible text (or
//! uses caller-supplied caption/paste content directly) and asks the
//! model for a recipe-shaped completion. Reports token cost and latency
//! for observability and billing.

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::traits::ai::RecipeAi;
use crate::traits::tier::{ExtractionTier, TierInput};
use crate::types::result::{ExtractionMethod, ExtractionResult};

pub struct AiTier {
    ai: Arc<dyn RecipeAi>,
    max_content_chars: usize,
}

impl AiTier {
    pub fn new(ai: Arc<dyn RecipeAi>) -> Self {
        Self {
            ai,
            max_content_chars: 20_000,
        }
    }

    /// Cap how much page text is sent to the model.
    pub fn with_max_content_chars(mut self, chars: usize) -> Self {
        self.max_content_chars = chars;
        self
    }
}

#[async_trait]
impl ExtractionTier for AiTier {
    fn name(&self) -> &'static str {
        "ai"
    }

    fn cost(&self) -> u8 {
        3
    }

    async fn attempt(&self, input: &TierInput) -> Result<ExtractionResult> {
        let content = match (&input.text, &input.html) {
            (Some(text), _) if !text.trim().is_empty() => text.clone(),
            (_, Some(html)) => visible_text(html),
            _ => String::new(),
        };
        if content.trim().is_empty() {
            return Ok(ExtractionResult::not_found(
                ExtractionMethod::Ai,
                "no content to send to the model",
            ));
        }

        let content = truncate(&content, self.max_content_chars);
        let started = Instant::now();

        match self.ai.extract_recipe(&content, input.url.as_deref()).await {
            Ok(completion) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                debug!(
                    tokens = completion.tokens_used,
                    elapsed_ms,
                    found = completion.recipe.is_some(),
                    "AI extraction finished"
                );
                let result = match completion.recipe {
                    Some(mut recipe) => {
                        if recipe.source_url.is_none() {
                            recipe.source_url = input.url.clone();
                        }
                        ExtractionResult::extracted(
                            ExtractionMethod::Ai,
                            recipe,
                            completion.confidence,
                        )
                    }
                    None => ExtractionResult::not_found(
                        ExtractionMethod::Ai,
                        "model found no recipe in the content",
                    ),
                };
                Ok(result.with_usage(completion.tokens_used, elapsed_ms))
            }
            Err(e) => Ok(ExtractionResult::not_found(
                ExtractionMethod::Ai,
                format!("AI extraction failed: {e}"),
            )),
        }
    }
}

/// Strip markup down to the text a reader would see.
fn visible_text(html: &str) -> String {
    let script_pattern =
        Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("static script pattern is valid");
    let style_pattern =
        Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("static style pattern is valid");
    let tag_pattern = Regex::new(r"<[^>]+>").expect("static tag pattern is valid");

    let text = script_pattern.replace_all(html, " ");
    let text = style_pattern.replace_all(&text, " ");
    let text = tag_pattern.replace_all(&text, " ");

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate on a char boundary.
fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAi;
    use crate::types::recipe::RecipeDraft;

    fn completion_recipe() -> RecipeDraft {
        RecipeDraft::new("Caption Curry")
            .with_ingredients(["1 onion", "curry paste"])
            .with_steps(["Fry the onion.", "Stir in the paste."])
    }

    #[tokio::test]
    async fn uses_caption_text_and_reports_usage() {
        let ai = Arc::new(MockAi::new().with_recipe(completion_recipe(), 0.75, 421));
        let tier = AiTier::new(ai.clone());

        let input = TierInput::for_text("Full recipe in caption: onion, curry paste ...");
        let result = tier.attempt(&input).await.unwrap();

        assert!(result.success);
        assert_eq!(result.extraction_method, ExtractionMethod::Ai);
        assert_eq!(result.tokens_used, Some(421));
        assert!(result.processing_time_ms.is_some());
        assert_eq!(ai.call_count(), 1);
    }

    #[tokio::test]
    async fn strips_markup_before_prompting() {
        let ai = Arc::new(MockAi::new().with_recipe(completion_recipe(), 0.7, 100));
        let tier = AiTier::new(ai.clone());

        let html = "<html><script>var x = 1;</script><body><p>Fry the onion</p></body></html>";
        let input = TierInput::for_page("https://example.com", html);
        tier.attempt(&input).await.unwrap();

        let prompts = ai.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Fry the onion"));
        assert!(!prompts[0].contains("var x"));
    }

    #[tokio::test]
    async fn model_error_becomes_not_found_result() {
        let ai = Arc::new(MockAi::new().failing());
        let tier = AiTier::new(ai);

        let input = TierInput::for_text("some caption");
        let result = tier.attempt(&input).await.unwrap();
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("AI extraction failed"));
    }

    #[tokio::test]
    async fn empty_input_is_not_sent_to_the_model() {
        let ai = Arc::new(MockAi::new().with_recipe(completion_recipe(), 0.7, 100));
        let tier = AiTier::new(ai.clone());

        let result = tier.attempt(&TierInput::default()).await.unwrap();
        assert!(!result.success);
        assert_eq!(ai.call_count(), 0);
    }

    #[test]
    fn visible_text_collapses_whitespace() {
        let text = visible_text("<p>one</p>\n\n<p>two &amp; three</p>");
        assert_eq!(text, "one two & three");
    }
}
