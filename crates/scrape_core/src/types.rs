use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a URL points to on its site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A single item: a post, a video, a product page.
    #[serde(rename = "item")]
    ItemKind,
    /// A collection of items: a profile, a search listing.
    #[serde(rename = "collection")]
    CollectionKind,
    /// No classification rule matched.
    #[serde(rename = "unknown")]
    UnknownKind,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::ItemKind => write!(f, "item"),
            ResourceKind::CollectionKind => write!(f, "collection"),
            ResourceKind::UnknownKind => write!(f, "unknown"),
        }
    }
}

/// A URL and its classified kind. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: String,
    kind: ResourceKind,
}

impl Target {
    pub fn new(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

/// Loosely-typed JSON object located inside a fetched document.
///
/// Always a non-empty parse result; the inner shape is not checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPayload {
    root: Value,
    candidate: String,
}

impl ExtractedPayload {
    pub(crate) fn new(map: Map<String, Value>, candidate: String) -> Self {
        Self {
            root: Value::Object(map),
            candidate,
        }
    }

    /// Wraps an already-parsed JSON object. Returns `None` for empty objects and non-objects.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) if !map.is_empty() => Some(Self::new(map, "inline".to_string())),
            _ => None,
        }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Label of the locator candidate that produced this payload.
    pub fn candidate(&self) -> &str {
        &self.candidate
    }
}

/// Error taxonomy shared by every pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "ValidationError")]
    Validation,
    #[serde(rename = "NetworkError")]
    Network,
    #[serde(rename = "DataExtractionError")]
    DataExtraction,
    #[serde(rename = "TimeoutError")]
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Network => "NetworkError",
            ErrorKind::DataExtraction => "DataExtractionError",
            ErrorKind::Timeout => "TimeoutError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostics attached to a [`ExtractionError::DataExtraction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionContext {
    /// No locator candidate produced a parseable payload.
    Locator {
        candidates: Vec<String>,
        snippet: Option<String>,
    },
    /// Every known payload shape was missing a required key path.
    Shape {
        kind: ResourceKind,
        shapes_tried: Vec<String>,
        missing_path: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("{message}")]
    Validation { message: String },
    #[error("{message} (after {attempts} attempt(s))")]
    Network {
        message: String,
        attempts: u32,
        last_status: Option<u16>,
        /// The failed responses carried bot-wall signals (403, 429, 5xx).
        likely_blocked: bool,
    },
    #[error("{message}")]
    DataExtraction {
        message: String,
        context: ExtractionContext,
    },
    #[error("{message}")]
    Timeout { message: String },
}

impl ExtractionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    pub fn likely_blocked(&self) -> bool {
        matches!(
            self,
            ExtractionError::Network {
                likely_blocked: true,
                ..
            }
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::Validation { .. } => ErrorKind::Validation,
            ExtractionError::Network { .. } => ErrorKind::Network,
            ExtractionError::DataExtraction { .. } => ErrorKind::DataExtraction,
            ExtractionError::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}
