//! OpenAI implementation of the [`RecipeAi`] trait.
//!
//! A reference implementation against the chat-completions API. The
//! model is asked for a strict-JSON recipe object; a `found: false`
//! answer maps to `recipe: None` rather than an error.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, Result};
use crate::traits::ai::{RecipeAi, RecipeCompletion};
use crate::types::recipe::RecipeDraft;

const SYSTEM_PROMPT: &str = "You extract cooking recipes from web page text, video transcripts \
or social media captions. Respond with a single JSON object: \
{\"found\": bool, \"confidence\": number 0-1, \"title\": string, \
\"description\": string|null, \"ingredients\": [string], \"steps\": [string], \
\"prepTimeMinutes\": number|null, \"cookTimeMinutes\": number|null, \
\"servings\": string|null}. Set found=false when the content contains no \
recipe. Never invent ingredients or steps that are not in the content.";

/// OpenAI-backed recipe extractor.
#[derive(Clone)]
pub struct OpenAiRecipeExtractor {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiRecipeExtractor {
    /// Create a client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ExtractionError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipeAnswer {
    found: bool,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    prep_time_minutes: Option<u32>,
    #[serde(default)]
    cook_time_minutes: Option<u32>,
    #[serde(default)]
    servings: Option<String>,
}

#[async_trait]
impl RecipeAi for OpenAiRecipeExtractor {
    async fn extract_recipe(
        &self,
        content: &str,
        source_url: Option<&str>,
    ) -> Result<RecipeCompletion> {
        let user_prompt = match source_url {
            Some(url) => format!("Source: {url}\n\nContent:\n{content}"),
            None => format!("Content:\n{content}"),
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: user_prompt.as_str(),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::Ai(Box::new(e)))?
            .error_for_status()
            .map_err(|e| ExtractionError::Ai(Box::new(e)))?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Ai(Box::new(e)))?;

        let tokens_used = body.usage.map(|u| u.total_tokens).unwrap_or(0);
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ExtractionError::Parse("empty chat completion".into()))?;

        let answer: RecipeAnswer = serde_json::from_str(content)?;

        let recipe = if answer.found {
            answer.title.map(|title| {
                let mut draft = RecipeDraft::new(title);
                draft.description = answer.description;
                draft.ingredients = answer.ingredients;
                draft.steps = answer.steps;
                draft.prep_time_minutes = answer.prep_time_minutes;
                draft.cook_time_minutes = answer.cook_time_minutes;
                draft.servings = answer.servings;
                draft.source_url = source_url.map(|u| u.to_string());
                draft
            })
        } else {
            None
        };

        Ok(RecipeCompletion {
            recipe,
            confidence: answer.confidence.clamp(0.0, 1.0),
            tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_parsing_tolerates_missing_fields() {
        let answer: RecipeAnswer =
            serde_json::from_str(r#"{"found": false}"#).unwrap();
        assert!(!answer.found);
        assert!(answer.ingredients.is_empty());
    }

    #[test]
    fn answer_parsing_reads_camel_case_times() {
        let answer: RecipeAnswer = serde_json::from_str(
            r#"{"found": true, "title": "Stew", "confidence": 0.8,
                "ingredients": ["beef"], "steps": ["stew it"],
                "prepTimeMinutes": 15, "cookTimeMinutes": 120}"#,
        )
        .unwrap();
        assert_eq!(answer.prep_time_minutes, Some(15));
        assert_eq!(answer.cook_time_minutes, Some(120));
    }
}
