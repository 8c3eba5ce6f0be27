//! The extraction method chain, ordered by cost.

mod ai;
mod heuristics;
mod microdata;
mod schema_org;

pub use ai::AiTier;
pub use heuristics::HeuristicTier;
pub use microdata::MicrodataTier;
pub use schema_org::SchemaOrgTier;
