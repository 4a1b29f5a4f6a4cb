use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use scrape_core::{BatchOutcome, BatchReport, ExtractionError};
use scrape_logging::{scrape_info, scrape_warn};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{Pipeline, UnknownKindPolicy};
use crate::sink::RecordSink;

#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Maximum number of fetches in flight at once.
    pub concurrency: usize,
    /// Whole-batch budget; targets still running when it expires fail with a timeout.
    pub deadline: Option<Duration>,
    pub unknown_kind: UnknownKindPolicy,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            concurrency: 5,
            deadline: None,
            unknown_kind: UnknownKindPolicy::default(),
        }
    }
}

/// Precondition violations. Per-target problems never surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("no targets to process")]
    EmptyTargets,
    #[error("concurrency must be greater than zero (got {0})")]
    InvalidConcurrency(usize),
}

/// Runs a list of URLs through a [`Pipeline`], one outcome per URL.
#[derive(Debug)]
pub struct BatchRunner {
    pipeline: Pipeline,
    settings: BatchSettings,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(pipeline: Pipeline, settings: BatchSettings) -> Self {
        let pipeline = pipeline.with_unknown_kind(settings.unknown_kind);
        Self {
            pipeline,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that, once cancelled, fails every unfinished target with a timeout.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&self, urls: Vec<String>) -> Result<BatchReport, BatchError> {
        self.run_into(urls, None).await
    }

    /// Runs the batch, appending each outcome to `sink` as soon as it is known.
    pub async fn run_with_sink(
        &self,
        urls: Vec<String>,
        sink: &dyn RecordSink,
    ) -> Result<BatchReport, BatchError> {
        self.run_into(urls, Some(sink)).await
    }

    async fn run_into(
        &self,
        urls: Vec<String>,
        sink: Option<&dyn RecordSink>,
    ) -> Result<BatchReport, BatchError> {
        if urls.is_empty() {
            return Err(BatchError::EmptyTargets);
        }
        if self.settings.concurrency == 0 {
            return Err(BatchError::InvalidConcurrency(self.settings.concurrency));
        }

        scrape_info!(
            "Starting {} batch: {} target(s), concurrency {}",
            self.pipeline.site().name(),
            urls.len(),
            self.settings.concurrency
        );
        let gate = Semaphore::new(self.settings.concurrency);
        let deadline = self.settings.deadline.map(|budget| Instant::now() + budget);

        let mut pending: FuturesUnordered<_> = urls
            .iter()
            .enumerate()
            .map(|(position, url)| self.guarded(position, url, &gate, deadline))
            .collect();

        let mut outcomes = Vec::with_capacity(urls.len());
        while let Some(outcome) = pending.next().await {
            if let Some(sink) = sink {
                if let Err(err) = sink.append(&outcome) {
                    scrape_warn!("Could not append outcome for {}: {err}", outcome.source_url());
                }
            }
            outcomes.push(outcome);
        }

        let report = BatchReport::new(outcomes);
        scrape_info!(
            "Batch finished: {} succeeded, {} failed, {} likely blocked",
            report.summary.succeeded,
            report.summary.failed,
            report.summary.likely_blocked
        );
        Ok(report)
    }

    async fn guarded(
        &self,
        position: usize,
        url: &str,
        gate: &Semaphore,
        deadline: Option<Instant>,
    ) -> BatchOutcome {
        let expired = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            outcome = self.pipeline.outcome(position, url, gate) => outcome,
            _ = self.cancel.cancelled() => {
                self.pipeline
                    .failure(position, url, &ExtractionError::timeout("batch cancelled"))
            }
            _ = expired => {
                self.pipeline
                    .failure(position, url, &ExtractionError::timeout("batch deadline exceeded"))
            }
        }
    }
}
