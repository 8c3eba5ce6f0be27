//! Configuration for the extraction orchestrator.

use serde::{Deserialize, Serialize};

/// Policy knobs for the fallback chain.
///
/// The acceptance threshold is policy, not a compatibility contract;
/// callers tuning precision/recall should override it rather than rely
/// on the default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Minimum confidence a tier must report before its result is
    /// accepted without consulting more expensive tiers. Default: 0.5.
    pub acceptance_threshold: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.5,
        }
    }
}

impl OrchestratorConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acceptance threshold.
    pub fn with_acceptance_threshold(mut self, threshold: f32) -> Self {
        self.acceptance_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}
