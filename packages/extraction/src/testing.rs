//! Mock implementations for testing.
//!
//! Useful for testing applications built on the extraction library
//! without real network or model calls. All mocks record their calls
//! for assertions.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::{ExtractionError, FetchError, FetchResult, Result};
use crate::traits::ai::{RecipeAi, RecipeCompletion};
use crate::traits::fetcher::{FetchedPage, PageFetcher};
use crate::traits::tier::{ExtractionTier, TierInput};
use crate::types::recipe::RecipeDraft;
use crate::types::result::ExtractionResult;

/// A page fetcher serving scripted pages and failures.
#[derive(Default)]
pub struct MockFetcher {
    pages: RwLock<HashMap<String, String>>,
    auth_walls: RwLock<HashSet<String>>,
    statuses: RwLock<HashMap<String, u16>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(url.into(), html.into());
        self
    }

    /// Answer `url` with an auth-required failure.
    pub fn with_auth_wall(self, url: impl Into<String>) -> Self {
        self.auth_walls.write().unwrap().insert(url.into());
        self
    }

    /// Answer `url` with an HTTP status failure.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.statuses.write().unwrap().insert(url.into(), status);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.auth_walls.read().unwrap().contains(url) {
            return Err(FetchError::AuthRequired {
                url: url.to_string(),
            });
        }
        if let Some(status) = self.statuses.read().unwrap().get(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            });
        }
        match self.pages.read().unwrap().get(url) {
            Some(html) => Ok(FetchedPage::new(url, html.clone())),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// A model returning a scripted completion.
#[derive(Default)]
pub struct MockAi {
    completion: RwLock<Option<(RecipeDraft, f32, u32)>>,
    fail: RwLock<bool>,
    prompts: RwLock<Vec<String>>,
}

impl MockAi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this recipe for every call.
    pub fn with_recipe(self, recipe: RecipeDraft, confidence: f32, tokens: u32) -> Self {
        *self.completion.write().unwrap() = Some((recipe, confidence, tokens));
        self
    }

    /// Fail every call.
    pub fn failing(self) -> Self {
        *self.fail.write().unwrap() = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.read().unwrap().len()
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().unwrap().clone()
    }
}

#[async_trait]
impl RecipeAi for MockAi {
    async fn extract_recipe(
        &self,
        content: &str,
        _source_url: Option<&str>,
    ) -> Result<RecipeCompletion> {
        self.prompts.write().unwrap().push(content.to_string());

        if *self.fail.read().unwrap() {
            return Err(ExtractionError::Ai("mock AI failure".into()));
        }

        Ok(match self.completion.read().unwrap().clone() {
            Some((recipe, confidence, tokens_used)) => RecipeCompletion {
                recipe: Some(recipe),
                confidence,
                tokens_used,
            },
            None => RecipeCompletion {
                recipe: None,
                confidence: 0.0,
                tokens_used: 0,
            },
        })
    }
}

/// A tier returning a fixed result, with call counting for policy
/// assertions ("the AI tier never ran").
pub struct ScriptedTier {
    name: &'static str,
    cost: u8,
    result: Option<ExtractionResult>,
    calls: AtomicUsize,
}

impl ScriptedTier {
    pub fn new(name: &'static str, cost: u8, result: ExtractionResult) -> Self {
        Self {
            name,
            cost,
            result: Some(result),
            calls: AtomicUsize::new(0),
        }
    }

    /// A tier whose attempt always errors.
    pub fn failing(name: &'static str, cost: u8) -> Self {
        Self {
            name,
            cost,
            result: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionTier for ScriptedTier {
    fn name(&self) -> &'static str {
        self.name
    }

    fn cost(&self) -> u8 {
        self.cost
    }

    async fn attempt(&self, _input: &TierInput) -> Result<ExtractionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Some(result) => Ok(result.clone()),
            None => Err(ExtractionError::Parse("scripted tier failure".into())),
        }
    }
}
