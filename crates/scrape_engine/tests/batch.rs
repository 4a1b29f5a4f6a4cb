use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use scrape_core::sites::tiktok;
use scrape_core::{BatchOutcome, ErrorKind, RecordFields};
use scrape_engine::{
    BatchError, BatchRunner, BatchSettings, Clock, FetchError, FetchFailure, FetchResult, Fetcher,
    MemorySink, Pipeline, ProxyError, ProxyProvider, UnknownKindPolicy,
};
use serde_json::json;

const NOW: &str = "2024-05-01T10:00:00.000Z";

fn clock() -> Clock {
    Arc::new(|| NOW.to_string())
}

fn post_html(id: &str) -> String {
    let payload = json!({
        "__DEFAULT_SCOPE__": {"webapp.video-detail": {"itemInfo": {"itemStruct": {
            "id": id, "desc": format!("clip {id}"), "video": {"width": 720}
        }}}}
    });
    format!(
        r#"<html><head><script id="__UNIVERSAL_DATA_FOR_REHYDRATION__" type="application/json">{payload}</script></head><body>{}</body></html>"#,
        "x".repeat(1000)
    )
}

fn ok(url: &str, body: String) -> FetchResult {
    FetchResult {
        final_url: url.to_string(),
        status: 200,
        headers: Default::default(),
        body,
        elapsed: Duration::from_millis(5),
        attempts: 1,
        signals: Vec::new(),
    }
}

/// Serves canned bodies by URL and tracks concurrent calls.
#[derive(Default)]
struct StubFetcher {
    bodies: HashMap<String, String>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl StubFetcher {
    fn with_pages(pages: &[(&str, String)]) -> Self {
        Self {
            bodies: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.clone()))
                .collect(),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str, proxy_url: Option<&str>) -> Result<FetchResult, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), proxy_url.map(str::to_string)));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.bodies.get(url) {
            Some(body) => Ok(ok(url, body.clone())),
            None => {
                let mut err = FetchError::new(FetchFailure::HttpStatus(404), "404 Not Found");
                err.attempts = 3;
                Err(err)
            }
        }
    }
}

fn post_url(n: usize) -> String {
    format!("https://www.tiktok.com/@someone/video/{n}")
}

fn runner(fetcher: Arc<StubFetcher>, settings: BatchSettings) -> BatchRunner {
    let pipeline = Pipeline::new(fetcher, Arc::new(tiktok::profile()), clock());
    BatchRunner::new(pipeline, settings)
}

#[tokio::test]
async fn one_missing_payload_fails_only_its_target() {
    let urls: Vec<String> = (1..=5).map(post_url).collect();
    let pages: Vec<(&str, String)> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            let body = if i == 2 {
                "<html><body>no data here</body></html>".to_string()
            } else {
                post_html(&(i + 1).to_string())
            };
            (url.as_str(), body)
        })
        .collect();
    let fetcher = Arc::new(StubFetcher::with_pages(&pages));

    let report = runner(fetcher, BatchSettings::default())
        .run(urls.clone())
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 5);
    assert_eq!(report.summary.succeeded, 4);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.failures_of(ErrorKind::DataExtraction), 1);
    assert_eq!(report.failed_urls(), vec![urls[2].as_str()]);

    for (position, outcome) in report.outcomes.iter().enumerate() {
        assert_eq!(outcome.position(), position);
        if position == 2 {
            continue;
        }
        let BatchOutcome::Success { record, .. } = outcome else {
            panic!("target {position} should succeed: {outcome:?}");
        };
        assert_eq!(record.id.as_deref(), Some((position + 1).to_string().as_str()));
        assert_eq!(record.fetched_at, NOW);
        let RecordFields::Post(post) = &record.fields else {
            panic!("expected post fields");
        };
        assert_eq!(post.video.width, 720);
    }
}

#[tokio::test]
async fn every_target_gets_exactly_one_outcome() {
    let good = post_url(1);
    let urls = vec![
        good.clone(),
        "not a url".to_string(),
        "https://evil.example/@x".to_string(),
        post_url(404),
        good.clone(),
        "https://www.tiktok.com/explore".to_string(),
        "   ".to_string(),
    ];
    let fetcher = Arc::new(StubFetcher::with_pages(&[(good.as_str(), post_html("1"))]));
    let settings = BatchSettings {
        concurrency: 2,
        unknown_kind: UnknownKindPolicy::Skip,
        ..BatchSettings::default()
    };

    let report = runner(fetcher, settings).run(urls.clone()).await.unwrap();

    let positions: Vec<_> = report.outcomes.iter().map(BatchOutcome::position).collect();
    assert_eq!(positions, (0..urls.len()).collect::<Vec<_>>());
    assert_eq!(report.summary.total, 7);
    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(report.summary.failures_of(ErrorKind::Validation), 4);
    assert_eq!(report.summary.failures_of(ErrorKind::Network), 1);
    assert_eq!(report.outcomes[3].error_kind(), Some(ErrorKind::Network));
    assert_eq!(report.outcomes[5].error_kind(), Some(ErrorKind::Validation));
    assert_eq!(report.outcomes[6].error_kind(), Some(ErrorKind::Validation));
    assert_eq!(report.outcomes[6].source_url(), "");
}

#[tokio::test]
async fn unknown_urls_are_fetched_as_items_by_default() {
    let url = "https://www.tiktok.com/explore".to_string();
    let fetcher = Arc::new(StubFetcher::with_pages(&[(url.as_str(), post_html("9"))]));

    let report = runner(fetcher, BatchSettings::default())
        .run(vec![url])
        .await
        .unwrap();
    assert_eq!(report.summary.succeeded, 1);
}

#[tokio::test]
async fn concurrency_bound_caps_in_flight_fetches() {
    let urls: Vec<String> = (1..=12).map(post_url).collect();
    let pages: Vec<(&str, String)> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| (url.as_str(), post_html(&i.to_string())))
        .collect();
    let fetcher = Arc::new(StubFetcher {
        delay: Duration::from_millis(20),
        ..StubFetcher::with_pages(&pages)
    });
    let settings = BatchSettings {
        concurrency: 3,
        ..BatchSettings::default()
    };

    let report = runner(fetcher.clone(), settings).run(urls).await.unwrap();

    assert_eq!(report.summary.succeeded, 12);
    let max = fetcher.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "saw {max} fetches in flight");
    assert!(max >= 2, "fetches never overlapped");
}

#[tokio::test(start_paused = true)]
async fn deadline_fails_unfinished_targets_with_timeout() {
    let first = post_url(1);
    let second = post_url(2);
    let fetcher = Arc::new(StubFetcher {
        delay: Duration::from_secs(30),
        ..StubFetcher::with_pages(&[
            (first.as_str(), post_html("1")),
            (second.as_str(), post_html("2")),
        ])
    });
    let settings = BatchSettings {
        deadline: Some(Duration::from_secs(5)),
        ..BatchSettings::default()
    };

    let report = runner(fetcher, settings)
        .run(vec![first, second])
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.summary.failures_of(ErrorKind::Timeout), 2);
    let BatchOutcome::Failure { failure, .. } = &report.outcomes[0] else {
        panic!("expected timeout failure");
    };
    assert_eq!(failure.message, "batch deadline exceeded");
    assert_eq!(failure.occurred_at, NOW);
}

#[tokio::test(start_paused = true)]
async fn cancellation_reports_timeouts() {
    let url = post_url(1);
    let fetcher = Arc::new(StubFetcher {
        delay: Duration::from_secs(60),
        ..StubFetcher::with_pages(&[(url.as_str(), post_html("1"))])
    });
    let runner = runner(fetcher, BatchSettings::default());
    let token = runner.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    let report = runner.run(vec![url]).await.unwrap();
    assert_eq!(report.summary.failures_of(ErrorKind::Timeout), 1);
}

#[tokio::test]
async fn preconditions_are_checked_before_any_work() {
    let fetcher = Arc::new(StubFetcher::default());
    let err = runner(fetcher.clone(), BatchSettings::default())
        .run(Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err, BatchError::EmptyTargets);

    let settings = BatchSettings {
        concurrency: 0,
        ..BatchSettings::default()
    };
    let err = runner(fetcher.clone(), settings)
        .run(vec![post_url(1)])
        .await
        .unwrap_err();
    assert_eq!(err, BatchError::InvalidConcurrency(0));
    assert!(fetcher.calls.lock().unwrap().is_empty());
}

struct FixedProxy;

#[async_trait::async_trait]
impl ProxyProvider for FixedProxy {
    async fn proxy_url(&self) -> Result<Option<String>, ProxyError> {
        Ok(Some("http://proxy.internal:8080".to_string()))
    }
}

#[tokio::test]
async fn proxy_and_sink_are_used_per_target() {
    let url = post_url(1);
    let fetcher = Arc::new(StubFetcher::with_pages(&[(url.as_str(), post_html("1"))]));
    let pipeline = Pipeline::new(fetcher.clone(), Arc::new(tiktok::profile()), clock())
        .with_proxies(Arc::new(FixedProxy));
    let runner = BatchRunner::new(pipeline, BatchSettings::default());
    let sink = MemorySink::new();

    let report = runner
        .run_with_sink(vec![url.clone(), "ftp://www.tiktok.com/@x".into()], &sink)
        .await
        .unwrap();

    assert_eq!(report.summary.total, 2);
    assert_eq!(
        fetcher.calls.lock().unwrap().as_slice(),
        &[(url.clone(), Some("http://proxy.internal:8080".to_string()))]
    );
    let records = sink.records();
    assert_eq!(records.len(), 2);
    let success = records
        .iter()
        .find(|r| r["sourceUrl"] == url.as_str())
        .unwrap();
    assert_eq!(success["fields"]["videoId"], "1");
    let failure = records.iter().find(|r| r["success"] == false).unwrap();
    assert_eq!(failure["errorKind"], "ValidationError");
}
