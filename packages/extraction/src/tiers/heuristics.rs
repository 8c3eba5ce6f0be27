//! Tier 2: heading/list pattern heuristics.
//!
//! For pages with no structured markup at all: find an "Ingredients"
//! heading and an "Instructions"-like heading, then harvest the lists
//! that follow them. Inherently noisy, so confidence caps well below
//! the structured tiers.

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::traits::tier::{ExtractionTier, TierInput};
use crate::types::recipe::RecipeDraft;
use crate::types::result::{ExtractionMethod, ExtractionResult};

pub struct HeuristicTier {
    ingredient_heading: Regex,
    step_heading: Regex,
}

impl Default for HeuristicTier {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicTier {
    pub fn new() -> Self {
        Self {
            ingredient_heading: Regex::new(r"(?i)\bingredients?\b")
                .expect("static ingredient pattern is valid"),
            step_heading: Regex::new(r"(?i)\b(instructions?|directions?|method|steps|preparation)\b")
                .expect("static step pattern is valid"),
        }
    }
}

#[async_trait]
impl ExtractionTier for HeuristicTier {
    fn name(&self) -> &'static str {
        "heuristics"
    }

    fn cost(&self) -> u8 {
        2
    }

    async fn attempt(&self, input: &TierInput) -> Result<ExtractionResult> {
        let Some(html) = input.html.as_deref() else {
            return Ok(ExtractionResult::not_found(
                ExtractionMethod::Heuristics,
                "no page content to parse",
            ));
        };

        let document = Html::parse_document(html);

        let ingredients = section_items(&document, &self.ingredient_heading);
        let steps = section_items(&document, &self.step_heading);

        if ingredients.is_empty() && steps.is_empty() {
            return Ok(ExtractionResult::not_found(
                ExtractionMethod::Heuristics,
                "no ingredient or instruction sections found",
            ));
        }

        let title = page_title(&document).unwrap_or_else(|| "Untitled recipe".to_string());
        let mut recipe = RecipeDraft::new(title)
            .with_ingredients(ingredients)
            .with_steps(steps);
        recipe.source_url = input.url.clone();

        let confidence = score(&recipe);
        Ok(ExtractionResult::extracted(
            ExtractionMethod::Heuristics,
            recipe,
            confidence,
        ))
    }
}

fn score(recipe: &RecipeDraft) -> f32 {
    if !recipe.is_complete() {
        return 0.25;
    }
    let mut confidence: f32 = 0.4;
    if recipe.ingredients.len() >= 3 {
        confidence += 0.1;
    }
    if recipe.steps.len() >= 2 {
        confidence += 0.1;
    }
    confidence
}

/// Items of the list(s) between a matching heading and the next heading.
fn section_items(document: &Html, heading_pattern: &Regex) -> Vec<String> {
    let heading_selector =
        Selector::parse("h1, h2, h3, h4, h5, h6").expect("static heading selector is valid");
    let li_selector = Selector::parse("li").expect("static li selector is valid");
    let p_selector = Selector::parse("p").expect("static p selector is valid");

    let Some(heading) = document
        .select(&heading_selector)
        .find(|h| heading_pattern.is_match(&h.text().collect::<String>()))
    else {
        return Vec::new();
    };

    let mut items = Vec::new();
    let mut paragraphs = Vec::new();

    for sibling in heading.next_siblings() {
        let Some(el) = ElementRef::wrap(sibling) else {
            continue;
        };
        if is_heading(&el) {
            break;
        }

        // Lists win; harvest every li under this sibling.
        for li in el.select(&li_selector) {
            let text = collapse_whitespace(&li.text().collect::<String>());
            if !text.is_empty() {
                items.push(text);
            }
        }
        if el.value().name() == "li" {
            let text = collapse_whitespace(&el.text().collect::<String>());
            if !text.is_empty() {
                items.push(text);
            }
        }

        // Track paragraphs as a fallback when the section has no list.
        if el.value().name() == "p" {
            let text = collapse_whitespace(&el.text().collect::<String>());
            if !text.is_empty() {
                paragraphs.push(text);
            }
        } else {
            for p in el.select(&p_selector) {
                let text = collapse_whitespace(&p.text().collect::<String>());
                if !text.is_empty() {
                    paragraphs.push(text);
                }
            }
        }
    }

    if items.is_empty() {
        paragraphs
    } else {
        items
    }
}

fn is_heading(el: &ElementRef) -> bool {
    matches!(el.value().name(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn page_title(document: &Html) -> Option<String> {
    let h1_selector = Selector::parse("h1").expect("static h1 selector is valid");
    let title_selector = Selector::parse("title").expect("static title selector is valid");

    document
        .select(&h1_selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .or_else(|| {
            document
                .select(&title_selector)
                .next()
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .filter(|t| !t.is_empty())
        })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
