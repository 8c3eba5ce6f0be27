//! End-to-end extraction scenarios over the real tier chain.

use std::sync::Arc;

use extraction::testing::{MockAi, MockFetcher};
use extraction::{
    AiTier, ContentSource, ExtractionMethod, ExtractionOrchestrator, HeuristicTier, MicrodataTier,
    SchemaOrgTier, SourceClassifier,
};

const NYT_STYLE_PAGE: &str = r#"
<!DOCTYPE html>
<html><head>
<title>Easy Weeknight Bolognese - NYT Cooking</title>
<script type="application/ld+json">
{
    "@context": "https://schema.org",
    "@type": "Recipe",
    "name": "Easy Weeknight Bolognese",
    "description": "A shortcut ragu for busy evenings.",
    "recipeIngredient": [
        "1 pound ground pork",
        "1 onion, diced",
        "28 ounces crushed tomatoes",
        "1 cup whole milk"
    ],
    "recipeInstructions": [
        {"@type": "HowToStep", "text": "Brown the pork with the onion."},
        {"@type": "HowToStep", "text": "Add tomatoes and simmer 25 minutes."},
        {"@type": "HowToStep", "text": "Stir in the milk and season."}
    ],
    "prepTime": "PT10M",
    "cookTime": "PT35M",
    "recipeYield": "4 servings"
}
</script>
</head><body><h1>Easy Weeknight Bolognese</h1></body></html>
"#;

fn chain_with_ai(ai: Arc<MockAi>) -> Vec<Arc<dyn extraction::ExtractionTier>> {
    vec![
        Arc::new(SchemaOrgTier),
        Arc::new(MicrodataTier),
        Arc::new(HeuristicTier::new()),
        Arc::new(AiTier::new(ai)),
    ]
}

/// Scenario A: a known recipe site with schema.org markup is classified,
/// extracted by tier 0, and the AI tier is never consulted.
#[tokio::test]
async fn known_site_with_structured_data_never_reaches_the_ai_tier() {
    let url = "https://cooking.nytimes.com/recipes/1024-easy-weeknight-bolognese";

    let classifier = SourceClassifier::new();
    let detection = classifier.classify(url).unwrap();
    assert_eq!(detection.source, ContentSource::RecipeSite);
    assert!(detection.is_known_recipe_site);
    assert_eq!(detection.site_name.as_deref(), Some("NYT Cooking"));

    let ai = Arc::new(MockAi::new());
    let fetcher = Arc::new(MockFetcher::new().with_page(url, NYT_STYLE_PAGE));
    let orchestrator = ExtractionOrchestrator::new(fetcher, chain_with_ai(ai.clone()));

    let result = orchestrator.extract(url, None).await;

    assert!(result.success);
    assert_eq!(result.extraction_method, ExtractionMethod::SchemaOrg);
    assert!(result.confidence >= 0.9);
    let recipe = result.recipe.unwrap();
    assert_eq!(recipe.title, "Easy Weeknight Bolognese");
    assert_eq!(recipe.ingredients.len(), 4);
    assert_eq!(recipe.steps.len(), 3);

    // The chain stopped before the expensive tier.
    assert_eq!(ai.call_count(), 0);
}

/// Scenario B: a private Facebook post cannot be fetched at all; the
/// orchestrator directs the caller to the manual-paste path.
#[tokio::test]
async fn private_facebook_url_requires_manual_input() {
    let url = "https://www.facebook.com/groups/supperclub/posts/9912";

    let ai = Arc::new(MockAi::new());
    let fetcher = Arc::new(MockFetcher::new().with_auth_wall(url));
    let orchestrator = ExtractionOrchestrator::new(fetcher, chain_with_ai(ai.clone()));

    let result = orchestrator.extract(url, None).await;

    assert!(!result.success);
    assert!(result.requires_manual_input);
    assert_eq!(result.extraction_method, ExtractionMethod::Manual);
    assert!(result.error.is_some());
    assert_eq!(ai.call_count(), 0);
}

/// An unstructured blog post falls through the structured tiers and is
/// recovered by heuristics.
#[tokio::test]
async fn unstructured_page_falls_back_to_heuristics() {
    let url = "https://blog.example.org/my-chili";
    let page = r#"
        <html><body>
        <h1>Weekend Chili</h1>
        <h2>Ingredients</h2>
        <ul><li>1 lb beef</li><li>1 can beans</li><li>chili powder</li></ul>
        <h2>Instructions</h2>
        <ol><li>Brown the beef.</li><li>Simmer with beans and spices.</li></ol>
        </body></html>
    "#;

    let ai = Arc::new(MockAi::new());
    let fetcher = Arc::new(MockFetcher::new().with_page(url, page));
    let orchestrator = ExtractionOrchestrator::new(fetcher, chain_with_ai(ai.clone()));

    let result = orchestrator.extract(url, None).await;

    assert!(result.success);
    assert_eq!(result.extraction_method, ExtractionMethod::Heuristics);
    assert_eq!(ai.call_count(), 0);
}
