//! The single-item import path: extract a post's content and save the
//! resulting draft.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;
use uuid::Uuid;

use extraction::{ExtractionOrchestrator, RecipeDraft};

use crate::jobs::bulk::PostImporter;

/// Persists accepted recipe drafts. The real CRUD layer sits behind
/// this seam; the in-memory implementation below backs tests and
/// standalone runs.
#[async_trait]
pub trait RecipeSaver: Send + Sync {
    async fn save(&self, draft: &RecipeDraft) -> anyhow::Result<Uuid>;
}

/// Keeps saved recipes in a map.
#[derive(Default)]
pub struct MemoryRecipeSaver {
    recipes: RwLock<HashMap<Uuid, RecipeDraft>>,
}

impl MemoryRecipeSaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<RecipeDraft> {
        self.recipes.read().unwrap().get(&id).cloned()
    }

    pub fn count(&self) -> usize {
        self.recipes.read().unwrap().len()
    }
}

#[async_trait]
impl RecipeSaver for MemoryRecipeSaver {
    async fn save(&self, draft: &RecipeDraft) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        self.recipes.write().unwrap().insert(id, draft.clone());
        Ok(id)
    }
}

/// Imports one social post by URL: runs the extraction chain over the
/// post page and saves the draft when extraction succeeds.
pub struct UrlPostImporter {
    orchestrator: Arc<ExtractionOrchestrator>,
    saver: Arc<dyn RecipeSaver>,
    post_url_prefix: String,
}

impl UrlPostImporter {
    pub fn new(orchestrator: Arc<ExtractionOrchestrator>, saver: Arc<dyn RecipeSaver>) -> Self {
        Self {
            orchestrator,
            saver,
            post_url_prefix: "https://www.instagram.com/p/".to_string(),
        }
    }

    /// Override how post ids map to URLs.
    pub fn with_post_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.post_url_prefix = prefix.into();
        self
    }

    fn post_url(&self, post_id: &str) -> String {
        format!("{}{}/", self.post_url_prefix, post_id)
    }
}

#[async_trait]
impl PostImporter for UrlPostImporter {
    async fn import_post(&self, post_id: &str) -> anyhow::Result<Uuid> {
        let url = self.post_url(post_id);
        debug!(post_id = %post_id, url = %url, "importing post");

        let result = self.orchestrator.extract(&url, None).await;
        match result.recipe.filter(|_| result.success) {
            Some(recipe) => self.saver.save(&recipe).await,
            None => anyhow::bail!(
                "extraction failed for post {post_id}: {}",
                result
                    .error
                    .unwrap_or_else(|| "no recipe recovered".to_string())
            ),
        }
    }
}
