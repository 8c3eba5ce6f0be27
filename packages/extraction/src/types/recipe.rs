//! Recipe draft types produced by the extraction pipeline.

use serde::{Deserialize, Serialize};

/// A structured recipe recovered from a content source.
///
/// A draft is "complete" when it has at least one ingredient and one
/// step; anything less is only useful as partial data for a manual
/// import path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub ingredients: Vec<String>,

    pub steps: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<u32>,

    /// Yield as written on the source ("4 servings", "one 9-inch pie").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl RecipeDraft {
    /// Create a draft with just a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            ingredients: Vec::new(),
            steps: Vec::new(),
            prep_time_minutes: None,
            cook_time_minutes: None,
            servings: None,
            image_url: None,
            source_url: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add ingredients.
    pub fn with_ingredients(
        mut self,
        ingredients: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.ingredients
            .extend(ingredients.into_iter().map(|i| i.into()));
        self
    }

    /// Add steps.
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.steps.extend(steps.into_iter().map(|s| s.into()));
        self
    }

    /// Set the source URL.
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// A usable recipe has at least one ingredient and one step.
    pub fn is_complete(&self) -> bool {
        !self.ingredients.is_empty() && !self.steps.is_empty()
    }
}

/// Best-effort fields recovered when full extraction fails.
///
/// Offered back to the caller alongside `requires_manual_input` so a
/// manual-paste form can be prefilled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRecipeDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
}

impl PartialRecipeDraft {
    /// Whether any field was recovered at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.ingredients.is_empty()
            && self.steps.is_empty()
    }
}

impl From<&RecipeDraft> for PartialRecipeDraft {
    fn from(draft: &RecipeDraft) -> Self {
        Self {
            title: Some(draft.title.clone()).filter(|t| !t.is_empty()),
            description: draft.description.clone(),
            ingredients: draft.ingredients.clone(),
            steps: draft.steps.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_with_ingredients_and_steps_is_complete() {
        let draft = RecipeDraft::new("Toast")
            .with_ingredients(["bread"])
            .with_steps(["toast the bread"]);
        assert!(draft.is_complete());
    }

    #[test]
    fn draft_missing_steps_is_incomplete() {
        let draft = RecipeDraft::new("Toast").with_ingredients(["bread"]);
        assert!(!draft.is_complete());
    }

    #[test]
    fn partial_from_draft_keeps_recovered_fields() {
        let draft = RecipeDraft::new("Toast").with_ingredients(["bread"]);
        let partial = PartialRecipeDraft::from(&draft);
        assert_eq!(partial.title.as_deref(), Some("Toast"));
        assert_eq!(partial.ingredients, vec!["bread".to_string()]);
        assert!(!partial.is_empty());
    }
}
