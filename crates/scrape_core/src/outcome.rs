use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::{ErrorKind, ExtractionError, NormalizedRecord};

/// Fetch facts carried alongside a successful record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchDiagnostics {
    pub status: u16,
    pub attempts: u32,
    pub elapsed_ms: u64,
    pub likely_blocked: bool,
    pub signals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub source_url: String,
    success: bool,
    pub error_kind: ErrorKind,
    pub message: String,
    pub likely_blocked: bool,
    pub occurred_at: String,
}

impl FailureRecord {
    pub fn new(
        source_url: impl Into<String>,
        error: &ExtractionError,
        occurred_at: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            success: false,
            error_kind: error.kind(),
            message: error.to_string(),
            likely_blocked: error.likely_blocked(),
            occurred_at: occurred_at.into(),
        }
    }
}

/// Result of one input target. `position` is the target's index in the input list.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Success {
        position: usize,
        record: NormalizedRecord,
        fetch: FetchDiagnostics,
    },
    Failure {
        position: usize,
        failure: FailureRecord,
    },
}

impl BatchOutcome {
    pub fn position(&self) -> usize {
        match self {
            BatchOutcome::Success { position, .. } | BatchOutcome::Failure { position, .. } => {
                *position
            }
        }
    }

    pub fn source_url(&self) -> &str {
        match self {
            BatchOutcome::Success { record, .. } => &record.source_url,
            BatchOutcome::Failure { failure, .. } => &failure.source_url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            BatchOutcome::Success { .. } => None,
            BatchOutcome::Failure { failure, .. } => Some(failure.error_kind),
        }
    }
}

/// Serializes as the dataset record: the normalized record or the failure record.
impl Serialize for BatchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BatchOutcome::Success { record, .. } => record.serialize(serializer),
            BatchOutcome::Failure { failure, .. } => failure.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub by_kind: BTreeMap<ErrorKind, usize>,
    /// Targets whose fetch looked like a bot wall, successful or not.
    pub likely_blocked: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        let mut summary = BatchSummary {
            total: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome {
                BatchOutcome::Success { fetch, .. } => {
                    summary.succeeded += 1;
                    if fetch.likely_blocked {
                        summary.likely_blocked += 1;
                    }
                }
                BatchOutcome::Failure { failure, .. } => {
                    summary.failed += 1;
                    if failure.likely_blocked {
                        summary.likely_blocked += 1;
                    }
                    *summary.by_kind.entry(failure.error_kind).or_insert(0) += 1;
                }
            }
        }
        summary
    }

    pub fn failures_of(&self, kind: ErrorKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }
}

/// Full outcome set of a batch, sorted by input position.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn new(mut outcomes: Vec<BatchOutcome>) -> Self {
        outcomes.sort_by_key(BatchOutcome::position);
        let summary = BatchSummary::from_outcomes(&outcomes);
        Self { outcomes, summary }
    }

    /// Source URLs of failed targets, for re-running just that subset.
    pub fn failed_urls(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.is_success())
            .map(BatchOutcome::source_url)
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &NormalizedRecord> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            BatchOutcome::Success { record, .. } => Some(record),
            BatchOutcome::Failure { .. } => None,
        })
    }
}
