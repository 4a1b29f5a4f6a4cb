use std::fmt;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use scrape_core::{ExtractionError, FetchDiagnostics};
use scrape_logging::{scrape_debug, scrape_warn};
use tokio::time::Instant;

use crate::backoff::BackoffPolicy;
use crate::decode::decode_body;
use crate::user_agent::browser_headers;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Per-attempt budget covering the request and the body download.
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Bodies shorter than this are flagged as a likely bot wall.
    pub min_body_bytes: usize,
    pub expected_content_types: Vec<String>,
    pub referer: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_millis(10_000),
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            min_body_bytes: 1000,
            expected_content_types: vec![
                "text/html".to_string(),
                "application/json".to_string(),
            ],
            referer: None,
        }
    }
}

/// Heuristic hint that a response may be a bot wall rather than real content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSignal {
    Forbidden,
    RateLimited,
    ServerError(u16),
    SmallBody(usize),
    MissingContentType,
    UnexpectedContentType(String),
}

impl BlockSignal {
    /// Status and size signals mark a response as likely blocked; content-type
    /// signals are informational only.
    pub fn marks_blocked(&self) -> bool {
        matches!(
            self,
            BlockSignal::Forbidden
                | BlockSignal::RateLimited
                | BlockSignal::ServerError(_)
                | BlockSignal::SmallBody(_)
        )
    }
}

impl fmt::Display for BlockSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockSignal::Forbidden => write!(f, "forbidden (403)"),
            BlockSignal::RateLimited => write!(f, "rate limited (429)"),
            BlockSignal::ServerError(status) => write!(f, "server error ({status})"),
            BlockSignal::SmallBody(len) => write!(f, "small body ({len} bytes)"),
            BlockSignal::MissingContentType => write!(f, "missing content-type"),
            BlockSignal::UnexpectedContentType(ct) => write!(f, "unexpected content-type {ct}"),
        }
    }
}

/// Inspect a response for bot-wall hints. Never fails.
pub fn block_signals(
    status: u16,
    content_type: Option<&str>,
    body_len: usize,
    settings: &FetchSettings,
) -> Vec<BlockSignal> {
    let mut signals = Vec::new();
    match status {
        403 => signals.push(BlockSignal::Forbidden),
        429 => signals.push(BlockSignal::RateLimited),
        500..=599 => signals.push(BlockSignal::ServerError(status)),
        _ => {}
    }
    match content_type {
        None => signals.push(BlockSignal::MissingContentType),
        Some(ct) if !is_expected_content_type(ct, &settings.expected_content_types) => {
            signals.push(BlockSignal::UnexpectedContentType(ct.to_string()))
        }
        Some(_) => {}
    }
    if body_len < settings.min_body_bytes {
        signals.push(BlockSignal::SmallBody(body_len));
    }
    signals
}

fn is_expected_content_type(content_type: &str, expected: &[String]) -> bool {
    let ct = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();
    expected
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ct))
}

/// Successful fetch. Transient: consumed by the locator and dropped.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub final_url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    pub elapsed: Duration,
    pub attempts: u32,
    pub signals: Vec<BlockSignal>,
}

impl FetchResult {
    pub fn likely_blocked(&self) -> bool {
        self.signals.iter().any(BlockSignal::marks_blocked)
    }

    pub fn diagnostics(&self) -> FetchDiagnostics {
        FetchDiagnostics {
            status: self.status,
            attempts: self.attempts,
            elapsed_ms: u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
            likely_blocked: self.likely_blocked(),
            signals: self.signals.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    InvalidUrl,
    InvalidProxy,
    Timeout,
    HttpStatus(u16),
    Network,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    RedirectLimitExceeded,
}

impl FetchFailure {
    /// Transient failures are retried; the rest are surfaced immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchFailure::Timeout | FetchFailure::HttpStatus(_) | FetchFailure::Network
        )
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::InvalidUrl => write!(f, "invalid url"),
            FetchFailure::InvalidProxy => write!(f, "invalid proxy url"),
            FetchFailure::Timeout => write!(f, "timeout"),
            FetchFailure::HttpStatus(code) => write!(f, "http status {code}"),
            FetchFailure::Network => write!(f, "network error"),
            FetchFailure::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FetchFailure::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchFailure,
    pub message: String,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Total time slept between attempts.
    pub backoff: Duration,
    pub last_status: Option<u16>,
    pub signals: Vec<BlockSignal>,
}

impl FetchError {
    pub fn new(kind: FetchFailure, message: impl Into<String>) -> Self {
        let last_status = match kind {
            FetchFailure::HttpStatus(status) => Some(status),
            _ => None,
        };
        Self {
            kind,
            message: message.into(),
            attempts: 0,
            backoff: Duration::ZERO,
            last_status,
            signals: Vec::new(),
        }
    }

    pub fn with_signals(mut self, signals: Vec<BlockSignal>) -> Self {
        self.signals = signals;
        self
    }

    pub fn likely_blocked(&self) -> bool {
        self.signals.iter().any(BlockSignal::marks_blocked)
    }
}

impl From<FetchError> for ExtractionError {
    fn from(err: FetchError) -> Self {
        match err.kind {
            FetchFailure::InvalidUrl | FetchFailure::InvalidProxy => {
                ExtractionError::validation(err.to_string())
            }
            _ => ExtractionError::Network {
                message: err.to_string(),
                attempts: err.attempts,
                last_status: err.last_status,
                likely_blocked: err.likely_blocked(),
            },
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`, optionally through `proxy_url`, retrying transient failures.
    async fn fetch(&self, url: &str, proxy_url: Option<&str>) -> Result<FetchResult, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    fn build_client(
        &self,
        proxy_url: Option<&str>,
        redirect_counter: Arc<AtomicUsize>,
    ) -> Result<reqwest::Client, FetchError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy);
        if let Some(proxy_url) = proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|err| FetchError::new(FetchFailure::InvalidProxy, err.to_string()))?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|err| FetchError::new(FetchFailure::Network, err.to_string()))
    }

    async fn attempt(
        &self,
        client: &reqwest::Client,
        url: &reqwest::Url,
    ) -> Result<AttemptResponse, FetchError> {
        let response = client
            .get(url.clone())
            .headers(browser_headers(self.settings.referer.as_deref()))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(ray) = headers.get("cf-ray").and_then(|v| v.to_str().ok()) {
            scrape_debug!("{url} answered through Cloudflare (cf-ray {ray})");
        }

        if !response.status().is_success() {
            let signals =
                block_signals(status, content_type.as_deref(), usize::MAX, &self.settings);
            return Err(
                FetchError::new(FetchFailure::HttpStatus(status), response.status().to_string())
                    .with_signals(signals),
            );
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FetchFailure::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FetchFailure::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        let signals = block_signals(status, content_type.as_deref(), bytes.len(), &self.settings);
        let decoded = decode_body(&bytes, content_type.as_deref());
        if decoded.had_errors {
            scrape_debug!("{url} body had invalid {} sequences", decoded.encoding_label);
        }
        Ok(AttemptResponse {
            final_url,
            status,
            headers,
            body: decoded.text,
            signals,
        })
    }
}

struct AttemptResponse {
    final_url: String,
    status: u16,
    headers: HeaderMap,
    body: String,
    signals: Vec<BlockSignal>,
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, proxy_url: Option<&str>) -> Result<FetchResult, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FetchFailure::InvalidUrl, err.to_string()))?;
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(proxy_url, redirect_counter.clone())?;

        let max_attempts = self.settings.max_attempts.max(1);
        let started = Instant::now();
        let mut slept = Duration::ZERO;
        let mut attempt = 1;
        loop {
            match self.attempt(&client, &parsed).await {
                Ok(response) => {
                    for signal in response.signals.iter().filter(|s| s.marks_blocked()) {
                        scrape_warn!("{url} may be blocked: {signal}");
                    }
                    scrape_debug!(
                        "{url} fetched: status {}, {} bytes, {} redirect(s), attempt {attempt}",
                        response.status,
                        response.body.len(),
                        redirect_counter.load(Ordering::Relaxed)
                    );
                    return Ok(FetchResult {
                        final_url: response.final_url,
                        status: response.status,
                        headers: response.headers,
                        body: response.body,
                        elapsed: started.elapsed(),
                        attempts: attempt,
                        signals: response.signals,
                    });
                }
                Err(mut err) => {
                    if !err.kind.is_retryable() || attempt >= max_attempts {
                        err.attempts = attempt;
                        err.backoff = slept;
                        return Err(err);
                    }
                    let delay = self.settings.backoff.delay_after(attempt);
                    scrape_warn!(
                        "{url} attempt {attempt}/{max_attempts} failed ({err}); retrying in {} ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    slept += delay;
                    attempt += 1;
                }
            }
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FetchFailure::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FetchFailure::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FetchFailure::Network, err.to_string())
}
