use scrape_logging::{scrape_debug, scrape_warn};
use url::Url;

use crate::{ExtractionError, ResourceKind, Target};

/// One structural rule over a parsed URL. Rules are evaluated in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyRule {
    /// The host is one of the registered short-link hosts.
    ShortLinkHost(ResourceKind),
    /// Any path segment equals `segment`.
    Segment {
        segment: String,
        kind: ResourceKind,
    },
    /// The first path segment equals `segment`.
    FirstSegment {
        segment: String,
        kind: ResourceKind,
    },
    /// The first path segment starts with `prefix` (and is longer than it).
    FirstSegmentPrefix {
        prefix: String,
        kind: ResourceKind,
    },
}

impl ClassifyRule {
    pub fn segment(segment: impl Into<String>, kind: ResourceKind) -> Self {
        Self::Segment {
            segment: segment.into(),
            kind,
        }
    }

    pub fn first_segment(segment: impl Into<String>, kind: ResourceKind) -> Self {
        Self::FirstSegment {
            segment: segment.into(),
            kind,
        }
    }

    pub fn first_segment_prefix(prefix: impl Into<String>, kind: ResourceKind) -> Self {
        Self::FirstSegmentPrefix {
            prefix: prefix.into(),
            kind,
        }
    }

    fn apply(&self, host_is_short_link: bool, segments: &[&str]) -> Option<ResourceKind> {
        match self {
            ClassifyRule::ShortLinkHost(kind) => host_is_short_link.then_some(*kind),
            ClassifyRule::Segment { segment, kind } => {
                segments.iter().any(|s| *s == segment.as_str()).then_some(*kind)
            }
            ClassifyRule::FirstSegment { segment, kind } => {
                (segments.first() == Some(&segment.as_str())).then_some(*kind)
            }
            ClassifyRule::FirstSegmentPrefix { prefix, kind } => segments
                .first()
                .filter(|s| s.len() > prefix.len() && s.starts_with(prefix.as_str()))
                .map(|_| *kind),
        }
    }
}

/// Decides which extraction schema applies to a URL.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    accepted_hosts: Vec<String>,
    short_link_hosts: Vec<String>,
    rules: Vec<ClassifyRule>,
}

impl Classifier {
    pub fn new<I, S>(accepted_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted_hosts: accepted_hosts
                .into_iter()
                .map(|h| h.into().to_ascii_lowercase())
                .collect(),
            ..Self::default()
        }
    }

    /// Registers a short-link host. Short-link hosts are implicitly accepted.
    pub fn with_short_link_host(mut self, host: impl Into<String>) -> Self {
        self.short_link_hosts.push(host.into().to_ascii_lowercase());
        self
    }

    pub fn with_rule(mut self, rule: ClassifyRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Classifies `url`; `UnknownKind` when no rule matches.
    pub fn classify(&self, url: &str) -> Result<ResourceKind, ExtractionError> {
        let parsed = Url::parse(url.trim())
            .map_err(|err| ExtractionError::validation(format!("invalid url {url:?}: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExtractionError::validation(format!(
                "unsupported scheme {:?} in {url}",
                parsed.scheme()
            )));
        }
        let host = parsed
            .host_str()
            .map(|h| h.to_ascii_lowercase())
            .ok_or_else(|| ExtractionError::validation(format!("url has no host: {url}")))?;

        let is_short_link = self.short_link_hosts.iter().any(|h| *h == host);
        if !is_short_link && !self.accepts_host(&host) {
            scrape_warn!("Rejecting {url}: host {host} is not accepted");
            return Err(ExtractionError::validation(format!(
                "host {host} is not one of {}",
                self.accepted_hosts.join(", ")
            )));
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let kind = self
            .rules
            .iter()
            .find_map(|rule| rule.apply(is_short_link, &segments))
            .unwrap_or(ResourceKind::UnknownKind);
        scrape_debug!("Classified {url} as {kind}");
        Ok(kind)
    }

    pub fn classify_target(&self, url: &str) -> Result<Target, ExtractionError> {
        let kind = self.classify(url)?;
        Ok(Target::new(url.trim(), kind))
    }

    fn accepts_host(&self, host: &str) -> bool {
        self.accepted_hosts.iter().any(|accepted| {
            host == accepted
                || host
                    .strip_suffix(accepted.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}
