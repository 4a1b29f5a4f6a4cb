use std::fmt;
use std::sync::Arc;

use scrape_core::{
    BatchOutcome, ExtractionError, FailureRecord, FetchDiagnostics, Locator, NormalizedRecord,
    ResourceKind, SiteProfile,
};
use scrape_logging::{scrape_debug, scrape_error, scrape_info, scrape_warn};
use tokio::sync::Semaphore;

use crate::fetch::Fetcher;
use crate::proxy::{NoProxy, ProxyProvider};

/// Produces ISO-8601 timestamps for `fetchedAt` and `occurredAt`.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// What to do with a URL that no classification rule recognises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownKindPolicy {
    /// Extract it as a single item, with a warning.
    #[default]
    TreatAsItem,
    /// Report it as a validation failure without fetching.
    Skip,
}

/// A record plus the fetch facts that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub record: NormalizedRecord,
    pub fetch: FetchDiagnostics,
}

/// One target's classify -> fetch -> locate -> normalize sequence.
///
/// Shared read-only by every in-flight target of a batch.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    site: Arc<SiteProfile>,
    proxies: Arc<dyn ProxyProvider>,
    clock: Clock,
    unknown_kind: UnknownKindPolicy,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("site", &self.site.name())
            .field("unknown_kind", &self.unknown_kind)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, site: Arc<SiteProfile>, clock: Clock) -> Self {
        Self {
            fetcher,
            site,
            proxies: Arc::new(NoProxy),
            clock,
            unknown_kind: UnknownKindPolicy::default(),
        }
    }

    pub fn with_proxies(mut self, proxies: Arc<dyn ProxyProvider>) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn with_unknown_kind(mut self, policy: UnknownKindPolicy) -> Self {
        self.unknown_kind = policy;
        self
    }

    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    pub fn now(&self) -> String {
        (self.clock)()
    }

    /// Runs the full sequence for `url`. `gate` bounds concurrent fetches.
    pub async fn extract(
        &self,
        url: &str,
        gate: &Semaphore,
    ) -> Result<Extracted, ExtractionError> {
        let target = self.site.classifier().classify_target(url)?;
        let kind = match target.kind() {
            ResourceKind::UnknownKind => match self.unknown_kind {
                UnknownKindPolicy::TreatAsItem => {
                    scrape_warn!(
                        "{} matched no classification rule; treating as item",
                        target.url()
                    );
                    ResourceKind::ItemKind
                }
                UnknownKindPolicy::Skip => {
                    return Err(ExtractionError::validation(format!(
                        "unrecognised {} url pattern: {}",
                        self.site.name(),
                        target.url()
                    )));
                }
            },
            kind => kind,
        };

        let proxy_url = self
            .proxies
            .proxy_url()
            .await
            .map_err(|err| ExtractionError::Network {
                message: err.to_string(),
                attempts: 0,
                last_status: None,
                likely_blocked: false,
            })?;

        let fetched = {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| ExtractionError::timeout("fetch gate closed"))?;
            self.fetcher.fetch(target.url(), proxy_url.as_deref()).await?
        };

        let payload = self.site.locator().locate(&fetched.body)?;
        scrape_debug!("{} payload found by {}", target.url(), payload.candidate());
        let fetched_at = self.now();
        let record = self
            .site
            .normalizer()
            .normalize(&payload, kind, target.url(), &fetched_at)?;
        Ok(Extracted {
            record,
            fetch: fetched.diagnostics(),
        })
    }

    /// Like [`Pipeline::extract`] but folds any error into a failure outcome.
    pub async fn outcome(&self, position: usize, url: &str, gate: &Semaphore) -> BatchOutcome {
        match self.extract(url, gate).await {
            Ok(Extracted { record, fetch }) => {
                scrape_info!("Extracted {} {}", record.kind, record.source_url);
                BatchOutcome::Success {
                    position,
                    record,
                    fetch,
                }
            }
            Err(err) => self.failure(position, url, &err),
        }
    }

    pub(crate) fn failure(
        &self,
        position: usize,
        url: &str,
        err: &ExtractionError,
    ) -> BatchOutcome {
        scrape_error!("{url} failed with {}: {err}", err.kind());
        BatchOutcome::Failure {
            position,
            failure: FailureRecord::new(url.trim(), err, self.now()),
        }
    }
}
