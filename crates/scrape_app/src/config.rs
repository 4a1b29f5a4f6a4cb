use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scrape_core::sites::aliexpress;
use scrape_core::SiteProfile;
use scrape_engine::{BackoffPolicy, BatchSettings, FetchSettings, UnknownKindPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unknown site {0:?}; expected one of {1:?}")]
    UnknownSite(String, &'static [&'static str]),
}

/// Run configuration, loaded from a RON file. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: String,
    pub concurrency: usize,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub deadline_ms: Option<u64>,
    pub proxies: Vec<String>,
    pub skip_unknown: bool,
    /// Cap on entries per search listing.
    pub max_items: Option<usize>,
    pub output_dir: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site: "tiktok".to_string(),
            concurrency: 5,
            timeout_ms: 10_000,
            max_attempts: 3,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 10_000,
            deadline_ms: None,
            proxies: Vec::new(),
            skip_unknown: false,
            max_items: None,
            output_dir: PathBuf::from("output"),
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn site_profile(&self) -> Result<SiteProfile, ConfigError> {
        let name = self.site.trim().to_ascii_lowercase();
        if name == aliexpress::NAME {
            return Ok(aliexpress::profile_with_max_items(self.max_items));
        }
        SiteProfile::by_name(&name).ok_or_else(|| {
            ConfigError::UnknownSite(self.site.clone(), SiteProfile::builtin_names())
        })
    }

    pub fn fetch_settings(&self, referer: Option<&str>) -> FetchSettings {
        FetchSettings {
            request_timeout: Duration::from_millis(self.timeout_ms),
            max_attempts: self.max_attempts,
            backoff: BackoffPolicy::new(
                Duration::from_millis(self.backoff_base_ms),
                Duration::from_millis(self.backoff_cap_ms),
            ),
            referer: referer.map(str::to_string),
            ..FetchSettings::default()
        }
    }

    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            concurrency: self.concurrency,
            deadline: self.deadline_ms.map(Duration::from_millis),
            unknown_kind: if self.skip_unknown {
                UnknownKindPolicy::Skip
            } else {
                UnknownKindPolicy::TreatAsItem
            },
        }
    }
}
