//! Built-in site profiles.
pub mod aliexpress;
pub mod tiktok;

use crate::{CandidateLocator, Classifier, Normalizer};

/// Everything needed to extract records from one site.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    name: String,
    classifier: Classifier,
    locator: CandidateLocator,
    normalizer: Normalizer,
    referer: Option<String>,
}

impl SiteProfile {
    pub fn new(
        name: impl Into<String>,
        classifier: Classifier,
        locator: CandidateLocator,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            name: name.into(),
            classifier,
            locator,
            normalizer,
            referer: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Looks up a built-in profile by name (case-insensitive).
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            tiktok::NAME => Some(tiktok::profile()),
            aliexpress::NAME => Some(aliexpress::profile()),
            _ => None,
        }
    }

    pub fn builtin_names() -> &'static [&'static str] {
        &[tiktok::NAME, aliexpress::NAME]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn locator(&self) -> &CandidateLocator {
        &self.locator
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn referer(&self) -> Option<&str> {
        self.referer.as_deref()
    }
}
