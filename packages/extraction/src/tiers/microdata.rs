//! Tier 1: HTML microdata (itemscope/itemprop).
//!
//! Older publishers mark recipes up with microdata attributes instead
//! of JSON-LD. Slightly lossier than tier 0 (times and yields are often
//! missing or malformed), so it caps at a lower confidence.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::traits::tier::{ExtractionTier, TierInput};
use crate::types::recipe::RecipeDraft;
use crate::types::result::{ExtractionMethod, ExtractionResult};

pub struct MicrodataTier;

#[async_trait]
impl ExtractionTier for MicrodataTier {
    fn name(&self) -> &'static str {
        "microdata"
    }

    fn cost(&self) -> u8 {
        1
    }

    async fn attempt(&self, input: &TierInput) -> Result<ExtractionResult> {
        let Some(html) = input.html.as_deref() else {
            return Ok(ExtractionResult::not_found(
                ExtractionMethod::Microdata,
                "no page content to parse",
            ));
        };

        match parse_document(html, input.url.as_deref()) {
            Some(recipe) => {
                let confidence = if recipe.is_complete() { 0.8 } else { 0.35 };
                Ok(ExtractionResult::extracted(
                    ExtractionMethod::Microdata,
                    recipe,
                    confidence,
                ))
            }
            None => Ok(ExtractionResult::not_found(
                ExtractionMethod::Microdata,
                "no microdata Recipe scope found",
            )),
        }
    }
}

fn parse_document(html: &str, source_url: Option<&str>) -> Option<RecipeDraft> {
    let document = Html::parse_document(html);
    let scope_selector =
        Selector::parse(r#"[itemtype*="Recipe"]"#).expect("static itemtype selector is valid");

    let scope = document
        .select(&scope_selector)
        .find(|el| is_recipe_scope(el))?;

    let title = prop_text(&scope, &["name"])
        .into_iter()
        .next()
        .filter(|t| !t.is_empty())?;

    let mut recipe = RecipeDraft::new(title);
    recipe.description = prop_text(&scope, &["description"]).into_iter().next();
    recipe.ingredients = prop_text(&scope, &["recipeIngredient", "ingredients"]);
    recipe.steps = instruction_texts(&scope);
    recipe.image_url = prop_attr(&scope, "image");
    recipe.servings = prop_text(&scope, &["recipeYield"]).into_iter().next();
    recipe.source_url = source_url.map(|u| u.to_string());

    Some(recipe)
}

fn is_recipe_scope(el: &ElementRef) -> bool {
    el.value()
        .attr("itemtype")
        .map(|t| t.contains("schema.org/Recipe") || t.ends_with("/Recipe"))
        .unwrap_or(false)
}

/// Collect trimmed text for any of the given itemprop names, in
/// document order.
fn prop_text(scope: &ElementRef, props: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for prop in props {
        let selector = Selector::parse(&format!(r#"[itemprop="{prop}"]"#))
            .expect("itemprop selector is valid");
        for el in scope.select(&selector) {
            // Prefer the content attribute (meta tags), fall back to text.
            let text = el
                .value()
                .attr("content")
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| collapse_whitespace(&el.text().collect::<String>()));
            if !text.is_empty() {
                out.push(text);
            }
        }
        if !out.is_empty() {
            break;
        }
    }
    out
}

/// Instructions may be one blob or one element per step; list items
/// inside an instruction element win over its own text.
fn instruction_texts(scope: &ElementRef) -> Vec<String> {
    let selector = Selector::parse(r#"[itemprop="recipeInstructions"]"#)
        .expect("static instructions selector is valid");
    let li_selector = Selector::parse("li").expect("static li selector is valid");

    let mut steps = Vec::new();
    for el in scope.select(&selector) {
        let items: Vec<String> = el
            .select(&li_selector)
            .map(|li| collapse_whitespace(&li.text().collect::<String>()))
            .filter(|s| !s.is_empty())
            .collect();
        if items.is_empty() {
            let text = collapse_whitespace(&el.text().collect::<String>());
            if !text.is_empty() {
                steps.push(text);
            }
        } else {
            steps.extend(items);
        }
    }
    steps
}

fn prop_attr(scope: &ElementRef, prop: &str) -> Option<String> {
    let selector =
        Selector::parse(&format!(r#"[itemprop="{prop}"]"#)).expect("itemprop selector is valid");
    scope.select(&selector).find_map(|el| {
        let v = el.value();
        v.attr("src")
            .or_else(|| v.attr("content"))
            .or_else(|| v.attr("href"))
            .map(|s| s.to_string())
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
