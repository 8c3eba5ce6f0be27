//! Recipe Extraction Library
//!
//! Turns arbitrary content sources — web pages, social media captions,
//! raw pasted text — into structured recipe drafts via a multi-tier,
//! confidence-scored fallback chain.
//!
//! # Design
//!
//! - Cheap, lossless methods first (schema.org JSON-LD, microdata)
//! - Heuristics for unstructured pages
//! - A generative model only as the last resort, with cost accounting
//! - Every failure mode encoded in the result, never thrown
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use extraction::{
//!     AiTier, ExtractionOrchestrator, HeuristicTier, HttpFetcher,
//!     MicrodataTier, OpenAiRecipeExtractor, SchemaOrgTier,
//! };
//!
//! let ai = Arc::new(OpenAiRecipeExtractor::from_env()?);
//! let orchestrator = ExtractionOrchestrator::new(
//!     Arc::new(HttpFetcher::new()),
//!     vec![
//!         Arc::new(SchemaOrgTier),
//!         Arc::new(MicrodataTier),
//!         Arc::new(HeuristicTier::new()),
//!         Arc::new(AiTier::new(ai)),
//!     ],
//! );
//!
//! let result = orchestrator
//!     .extract("https://cooking.nytimes.com/recipes/1234", None)
//!     .await;
//! ```
//!
//! # Modules
//!
//! - [`source`] - URL source classification
//! - [`traits`] - Core trait abstractions (tiers, fetching, AI)
//! - [`tiers`] - The extraction method chain
//! - [`pipeline`] - The orchestrator
//! - [`fetch`] - Page fetcher implementations
//! - [`ai`] - Model-backed implementations of the AI seam
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod source;
pub mod testing;
pub mod tiers;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ExtractionError, FetchError};
pub use source::{ContentSource, KnownSite, SourceClassifier, SourceDetection};
pub use traits::{
    ai::{RecipeAi, RecipeCompletion},
    fetcher::{FetchedPage, PageFetcher},
    tier::{ExtractionTier, TierInput},
};
pub use types::{
    config::OrchestratorConfig,
    recipe::{PartialRecipeDraft, RecipeDraft},
    result::{ExtractionMethod, ExtractionResult},
};

// Re-export the orchestrator and the standard chain
pub use pipeline::ExtractionOrchestrator;
pub use tiers::{AiTier, HeuristicTier, MicrodataTier, SchemaOrgTier};

// Re-export implementations
pub use ai::OpenAiRecipeExtractor;
pub use fetch::HttpFetcher;

// Re-export testing utilities
pub use testing::{MockAi, MockFetcher, ScriptedTier};

use std::sync::Arc;

/// Build the standard four-tier chain over the given AI seam.
pub fn standard_tiers(ai: Arc<dyn RecipeAi>) -> Vec<Arc<dyn ExtractionTier>> {
    vec![
        Arc::new(SchemaOrgTier),
        Arc::new(MicrodataTier),
        Arc::new(HeuristicTier::new()),
        Arc::new(AiTier::new(ai)),
    ]
}

/// Build the chain without the AI tier (no model configured).
pub fn offline_tiers() -> Vec<Arc<dyn ExtractionTier>> {
    vec![
        Arc::new(SchemaOrgTier),
        Arc::new(MicrodataTier),
        Arc::new(HeuristicTier::new()),
    ]
}
