//! URL source classification.
//!
//! Maps a raw URL to a content source category and a "known recipe
//! site" flag. Pure function over the URL — no network I/O, recomputed
//! on every call.

use serde::{Deserialize, Serialize};
use url::Url;

/// Category of content source a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentSource {
    Instagram,
    Facebook,
    Youtube,
    Tiktok,
    RecipeSite,
    GenericWebsite,
    Pdf,
}

/// What the classifier concluded about a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDetection {
    pub source: ContentSource,
    pub is_known_recipe_site: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

impl SourceDetection {
    fn platform(source: ContentSource) -> Self {
        Self {
            source,
            is_known_recipe_site: false,
            site_name: None,
        }
    }
}

/// An entry in the known recipe-site table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownSite {
    /// Registrable domain (or deeper), lowercase, no scheme or `www.`.
    pub domain: String,
    /// Display name surfaced to the user.
    pub name: String,
}

impl KnownSite {
    pub fn new(domain: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
        }
    }
}

const INSTAGRAM_HOSTS: &[&str] = &["instagram.com", "instagr.am"];
const FACEBOOK_HOSTS: &[&str] = &["facebook.com", "fb.com", "fb.watch"];
const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "youtu.be"];
const TIKTOK_HOSTS: &[&str] = &["tiktok.com"];

/// Classifies URLs into source categories.
///
/// The known-site table is policy: the defaults cover widely used
/// recipe publishers, and callers can extend the table with
/// [`SourceClassifier::with_site`].
#[derive(Debug, Clone)]
pub struct SourceClassifier {
    known_sites: Vec<KnownSite>,
}

impl Default for SourceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceClassifier {
    /// Create a classifier seeded with the default known-site table.
    pub fn new() -> Self {
        Self {
            known_sites: vec![
                KnownSite::new("cooking.nytimes.com", "NYT Cooking"),
                KnownSite::new("allrecipes.com", "Allrecipes"),
                KnownSite::new("seriouseats.com", "Serious Eats"),
                KnownSite::new("bonappetit.com", "Bon Appétit"),
                KnownSite::new("foodnetwork.com", "Food Network"),
                KnownSite::new("bbcgoodfood.com", "BBC Good Food"),
                KnownSite::new("simplyrecipes.com", "Simply Recipes"),
                KnownSite::new("budgetbytes.com", "Budget Bytes"),
                KnownSite::new("epicurious.com", "Epicurious"),
                KnownSite::new("food52.com", "Food52"),
                KnownSite::new("smittenkitchen.com", "Smitten Kitchen"),
                KnownSite::new("thekitchn.com", "The Kitchn"),
                KnownSite::new("delish.com", "Delish"),
                KnownSite::new("tasty.co", "Tasty"),
            ],
        }
    }

    /// Create a classifier with an explicit table (replacing defaults).
    pub fn with_sites(sites: Vec<KnownSite>) -> Self {
        Self { known_sites: sites }
    }

    /// Add a site to the table.
    pub fn with_site(mut self, domain: impl Into<String>, name: impl Into<String>) -> Self {
        self.known_sites.push(KnownSite::new(domain, name));
        self
    }

    /// Classify a raw URL string.
    ///
    /// Fails closed: a malformed or incomplete URL yields `None`, never
    /// an error. Callers treat `None` as "not enough input to classify
    /// yet".
    pub fn classify(&self, raw: &str) -> Option<SourceDetection> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        // Tolerate missing schemes ("allrecipes.com/recipe/123").
        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };

        let parsed = Url::parse(&candidate).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }

        let host = parsed.host_str()?.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

        if host_in(&host, INSTAGRAM_HOSTS) {
            return Some(SourceDetection::platform(ContentSource::Instagram));
        }
        if host_in(&host, FACEBOOK_HOSTS) {
            return Some(SourceDetection::platform(ContentSource::Facebook));
        }
        if host_in(&host, YOUTUBE_HOSTS) {
            return Some(SourceDetection::platform(ContentSource::Youtube));
        }
        if host_in(&host, TIKTOK_HOSTS) {
            return Some(SourceDetection::platform(ContentSource::Tiktok));
        }

        if parsed.path().to_ascii_lowercase().ends_with(".pdf") {
            return Some(SourceDetection::platform(ContentSource::Pdf));
        }

        if let Some(site) = self
            .known_sites
            .iter()
            .find(|site| host_matches(&host, &site.domain))
        {
            return Some(SourceDetection {
                source: ContentSource::RecipeSite,
                is_known_recipe_site: true,
                site_name: Some(site.name.clone()),
            });
        }

        Some(SourceDetection::platform(ContentSource::GenericWebsite))
    }
}

/// Exact host or subdomain-of match against a host set.
fn host_in(host: &str, set: &[&str]) -> bool {
    set.iter().any(|entry| host_matches(host, entry))
}

/// `host` matches `entry` when it equals the entry or is a subdomain of
/// it. Never the reverse: the entry `cooking.nytimes.com` must not
/// claim `nytimes.com`.
fn host_matches(host: &str, entry: &str) -> bool {
    host == entry || host.ends_with(&format!(".{entry}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(url: &str) -> Option<SourceDetection> {
        SourceClassifier::new().classify(url)
    }

    #[test]
    fn detects_video_platforms() {
        assert_eq!(
            classify("https://www.instagram.com/p/abc123/").unwrap().source,
            ContentSource::Instagram
        );
        assert_eq!(
            classify("https://m.facebook.com/groups/1/posts/2").unwrap().source,
            ContentSource::Facebook
        );
        assert_eq!(
            classify("https://youtu.be/dQw4w9WgXcQ").unwrap().source,
            ContentSource::Youtube
        );
        assert_eq!(
            classify("https://vm.tiktok.com/ZX1/").unwrap().source,
            ContentSource::Tiktok
        );
    }

    #[test]
    fn detects_pdf_by_path_suffix() {
        let detection = classify("https://example.com/files/cookbook.PDF").unwrap();
        assert_eq!(detection.source, ContentSource::Pdf);
    }

    #[test]
    fn known_site_returns_site_name() {
        let detection = classify("https://cooking.nytimes.com/recipes/1234").unwrap();
        assert_eq!(detection.source, ContentSource::RecipeSite);
        assert!(detection.is_known_recipe_site);
        assert_eq!(detection.site_name.as_deref(), Some("NYT Cooking"));
    }

    #[test]
    fn subdomain_of_known_site_matches() {
        let detection = classify("https://www.allrecipes.com/recipe/8805/").unwrap();
        assert!(detection.is_known_recipe_site);

        let classifier = SourceClassifier::new();
        let nested = classifier.classify("https://es.allrecipes.com/receta/1").unwrap();
        assert!(nested.is_known_recipe_site);
        assert_eq!(nested.site_name.as_deref(), Some("Allrecipes"));
    }

    #[test]
    fn parent_of_table_entry_does_not_match() {
        // cooking.nytimes.com is in the table; nytimes.com itself is not.
        let detection = classify("https://nytimes.com/section/food").unwrap();
        assert_eq!(detection.source, ContentSource::GenericWebsite);
        assert!(!detection.is_known_recipe_site);
    }

    #[test]
    fn unknown_site_defaults_to_generic() {
        let detection = classify("https://blog.example.org/my-best-chili").unwrap();
        assert_eq!(detection.source, ContentSource::GenericWebsite);
        assert!(!detection.is_known_recipe_site);
        assert!(detection.site_name.is_none());
    }

    #[test]
    fn scheme_is_optional() {
        let detection = classify("allrecipes.com/recipe/8805/").unwrap();
        assert_eq!(detection.source, ContentSource::RecipeSite);
    }

    #[test]
    fn malformed_input_fails_closed() {
        assert!(classify("").is_none());
        assert!(classify("   ").is_none());
        assert!(classify("not a url at all").is_none());
        assert!(classify("ftp://example.com/recipe").is_none());
        assert!(classify("https://").is_none());
    }

    #[test]
    fn custom_site_extends_the_table() {
        let classifier = SourceClassifier::new().with_site("example.kitchen", "Example Kitchen");
        let detection = classifier.classify("https://example.kitchen/pie").unwrap();
        assert!(detection.is_known_recipe_site);
        assert_eq!(detection.site_name.as_deref(), Some("Example Kitchen"));
    }

    #[test]
    fn fb_watch_is_facebook() {
        assert_eq!(
            classify("https://fb.watch/abc/").unwrap().source,
            ContentSource::Facebook
        );
    }
}
