//! Tier 0: schema.org JSON-LD structured data.
//!
//! Most recipe publishers embed a `Recipe` node in
//! `<script type="application/ld+json">` blocks. Parsing it is free and
//! near-lossless, so this tier runs first and carries the highest
//! confidence when the node is complete.

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::Result;
use crate::traits::tier::{ExtractionTier, TierInput};
use crate::types::recipe::RecipeDraft;
use crate::types::result::{ExtractionMethod, ExtractionResult};

pub struct SchemaOrgTier;

#[async_trait]
impl ExtractionTier for SchemaOrgTier {
    fn name(&self) -> &'static str {
        "schema-org"
    }

    fn cost(&self) -> u8 {
        0
    }

    async fn attempt(&self, input: &TierInput) -> Result<ExtractionResult> {
        let Some(html) = input.html.as_deref() else {
            return Ok(ExtractionResult::not_found(
                ExtractionMethod::SchemaOrg,
                "no page content to parse",
            ));
        };

        match parse_document(html, input.url.as_deref()) {
            Some(recipe) => {
                let confidence = score(&recipe);
                Ok(ExtractionResult::extracted(
                    ExtractionMethod::SchemaOrg,
                    recipe,
                    confidence,
                ))
            }
            None => Ok(ExtractionResult::not_found(
                ExtractionMethod::SchemaOrg,
                "no schema.org Recipe node found",
            )),
        }
    }
}

fn score(recipe: &RecipeDraft) -> f32 {
    if !recipe.is_complete() {
        return 0.4;
    }
    if recipe.ingredients.len() >= 3 && recipe.steps.len() >= 2 {
        0.95
    } else {
        0.85
    }
}

/// Parse all JSON-LD blocks and return the first recipe found.
fn parse_document(html: &str, source_url: Option<&str>) -> Option<RecipeDraft> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("static JSON-LD selector is valid");

    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        if let Some(node) = find_recipe_node(&value) {
            if let Some(recipe) = recipe_from_node(node, source_url) {
                return Some(recipe);
            }
        }
    }

    None
}

/// Walk a JSON-LD value looking for a node typed `Recipe`.
///
/// Handles top-level arrays, `@graph` wrappers, and multi-valued
/// `@type` fields.
fn find_recipe_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_recipe_node),
        Value::Object(map) => {
            if is_recipe_type(map.get("@type")) {
                return Some(value);
            }
            if let Some(graph) = map.get("@graph") {
                return find_recipe_node(graph);
            }
            None
        }
        _ => None,
    }
}

fn is_recipe_type(ty: Option<&Value>) -> bool {
    match ty {
        Some(Value::String(s)) => s == "Recipe",
        Some(Value::Array(items)) => items.iter().any(|t| t.as_str() == Some("Recipe")),
        _ => false,
    }
}

fn recipe_from_node(node: &Value, source_url: Option<&str>) -> Option<RecipeDraft> {
    let title = node
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())?;

    let mut recipe = RecipeDraft::new(title);
    recipe.description = node
        .get("description")
        .and_then(Value::as_str)
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    recipe.ingredients = node
        .get("recipeIngredient")
        .or_else(|| node.get("ingredients"))
        .map(string_list)
        .unwrap_or_default();
    recipe.steps = node
        .get("recipeInstructions")
        .map(instruction_list)
        .unwrap_or_default();
    recipe.prep_time_minutes = node
        .get("prepTime")
        .and_then(Value::as_str)
        .and_then(duration_minutes);
    recipe.cook_time_minutes = node
        .get("cookTime")
        .and_then(Value::as_str)
        .and_then(duration_minutes);
    recipe.servings = node.get("recipeYield").and_then(yield_text);
    recipe.image_url = node.get("image").and_then(image_url);
    recipe.source_url = source_url.map(|u| u.to_string());

    Some(recipe)
}

/// A field that may be a string or an array of strings.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => clean_lines(s),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// `recipeInstructions` may be a string, a list of strings, a list of
/// `HowToStep` objects, or `HowToSection`s nesting steps.
fn instruction_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => clean_lines(s),
        Value::Array(items) => items.iter().flat_map(instruction_list).collect(),
        Value::Object(map) => {
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                let text = text.trim();
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![text.to_string()]
                }
            } else if let Some(nested) = map.get("itemListElement") {
                instruction_list(nested)
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

fn clean_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}

/// `image` may be a URL string, an array, or an `ImageObject`.
fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_string()),
        Value::Array(items) => items.first().and_then(image_url),
        Value::Object(map) => map
            .get("url")
            .and_then(Value::as_str)
            .map(|s| s.to_string()),
        _ => None,
    }
}

fn yield_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.first().and_then(yield_text),
        _ => None,
    }
}

/// Parse an ISO-8601 duration like `PT1H30M` into whole minutes.
fn duration_minutes(raw: &str) -> Option<u32> {
    let rest = raw.trim().strip_prefix("PT").or_else(|| {
        // Tolerate date-bearing forms like P0DT20M.
        raw.trim().split_once('T').map(|(_, t)| t)
    })?;

    let mut minutes: u32 = 0;
    let mut digits = String::new();
    let mut seen_component = false;

    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let value: u32 = digits.parse().ok()?;
        digits.clear();
        match ch.to_ascii_uppercase() {
            'H' => minutes += value * 60,
            'M' => minutes += value,
            'S' => {} // sub-minute precision is dropped
            _ => return None,
        }
        seen_component = true;
    }

    (seen_component && digits.is_empty()).then_some(minutes)
}
