//! Route-level tests over the assembled router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use extraction::testing::MockFetcher;
use extraction::{offline_tiers, ExtractionOrchestrator};
use server_core::import::MemoryRecipeSaver;
use server_core::jobs::testing::{MockImporter, MockToolchain};
use server_core::jobs::{BulkImportProcessor, MemoryJobStore, VideoPipeline};
use server_core::server::{build_app, AppState};

const STRUCTURED_PAGE: &str = r#"
<html><head><script type="application/ld+json">
{
    "@type": "Recipe",
    "name": "Sheet-Pan Gnocchi",
    "recipeIngredient": ["1 lb gnocchi", "2 bell peppers", "olive oil"],
    "recipeInstructions": [
        {"@type": "HowToStep", "text": "Toss everything on a sheet pan."},
        {"@type": "HowToStep", "text": "Roast at 425F for 20 minutes."}
    ]
}
</script></head><body></body></html>
"#;

fn test_app(fetcher: MockFetcher) -> axum::Router {
    let orchestrator = Arc::new(ExtractionOrchestrator::new(
        Arc::new(fetcher),
        offline_tiers(),
    ));
    let store = Arc::new(MemoryJobStore::new());
    let saver = Arc::new(MemoryRecipeSaver::new());
    let video = Arc::new(VideoPipeline::new(
        store.clone(),
        Arc::new(MockToolchain::new().with_one_recipe()),
    ));
    let bulk = Arc::new(BulkImportProcessor::new(
        store.clone(),
        Arc::new(MockImporter::new()),
    ));

    build_app(AppState {
        orchestrator,
        video,
        bulk,
        video_jobs: store.clone(),
        bulk_jobs: store,
        saver,
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn extract_endpoint_returns_the_extraction_result() {
    let url = "https://cooking.nytimes.com/recipes/gnocchi";
    let app = test_app(MockFetcher::new().with_page(url, STRUCTURED_PAGE));

    let response = app
        .oneshot(
            Request::post("/url-import/extract")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "url": url }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["extractionMethod"], json!("SCHEMA_ORG"));
    assert_eq!(body["recipe"]["title"], json!("Sheet-Pan Gnocchi"));
}

#[tokio::test]
async fn extract_failure_is_a_200_with_manual_input_flag() {
    let url = "https://www.facebook.com/groups/g/posts/1";
    let app = test_app(MockFetcher::new().with_auth_wall(url));

    let response = app
        .oneshot(
            Request::post("/url-import/extract")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "url": url }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["requiresManualInput"], json!(true));
}

#[tokio::test]
async fn detect_source_classifies_known_sites() {
    let app = test_app(MockFetcher::new());

    let response = app
        .oneshot(
            Request::get("/url-import/detect-source?url=https://cooking.nytimes.com/recipes/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["detection"]["source"], json!("RECIPE_SITE"));
    assert_eq!(body["detection"]["isKnownRecipeSite"], json!(true));
    assert_eq!(body["detection"]["siteName"], json!("NYT Cooking"));
}

#[tokio::test]
async fn detect_source_answers_null_for_malformed_input() {
    let app = test_app(MockFetcher::new());

    let response = app
        .oneshot(
            Request::get("/url-import/detect-source?url=%20")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["detection"], Value::Null);
}

#[tokio::test]
async fn youtube_submit_rejects_non_youtube_urls() {
    let app = test_app(MockFetcher::new());

    let response = app
        .oneshot(
            Request::post("/youtube/extract")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "url": "https://example.com/video" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn youtube_submit_returns_a_job_id_immediately() {
    let app = test_app(MockFetcher::new());

    let response = app
        .oneshot(
            Request::post("/youtube/extract")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "url": "https://www.youtube.com/watch?v=abc" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["jobId"].as_str().is_some());
}

#[tokio::test]
async fn unknown_video_job_is_404() {
    let app = test_app(MockFetcher::new());

    let response = app
        .oneshot(
            Request::get(format!("/youtube/jobs/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversize_bulk_batch_is_400() {
    let app = test_app(MockFetcher::new());
    let ids: Vec<String> = (1..=51).map(|i| format!("post-{i}")).collect();

    let response = app
        .oneshot(
            Request::post("/instagram/import/bulk")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "postIds": ids }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_submit_reports_job_id_and_total() {
    let app = test_app(MockFetcher::new());

    let response = app
        .oneshot(
            Request::post("/instagram/import/bulk")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "postIds": ["a", "b", "c"] }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["totalPosts"], json!(3));
    assert!(body["jobId"].as_str().is_some());
}

#[tokio::test]
async fn health_answers_ok() {
    let app = test_app(MockFetcher::new());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
}
