use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("proxy provisioning failed: {0}")]
pub struct ProxyError(pub String);

/// Supplies a proxy URL per fetch, or `None` to connect directly.
#[async_trait::async_trait]
pub trait ProxyProvider: Send + Sync {
    async fn proxy_url(&self) -> Result<Option<String>, ProxyError>;
}

/// Direct connections only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProxy;

#[async_trait::async_trait]
impl ProxyProvider for NoProxy {
    async fn proxy_url(&self) -> Result<Option<String>, ProxyError> {
        Ok(None)
    }
}

/// Round-robin over a fixed, configured list of proxy URLs.
#[derive(Debug, Default)]
pub struct StaticProxyPool {
    urls: Vec<String>,
    next: AtomicUsize,
}

impl StaticProxyPool {
    pub fn new(urls: Vec<String>) -> Self {
        let urls = urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        Self {
            urls,
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[async_trait::async_trait]
impl ProxyProvider for StaticProxyPool {
    async fn proxy_url(&self) -> Result<Option<String>, ProxyError> {
        if self.urls.is_empty() {
            return Ok(None);
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.urls.len();
        Ok(self.urls.get(index).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pool_rotates_through_urls() {
        let pool = StaticProxyPool::new(vec![
            "http://p1:8080".into(),
            "  ".into(),
            "http://p2:8080".into(),
        ]);
        assert_eq!(pool.len(), 2);
        let picks = [
            pool.proxy_url().await.unwrap(),
            pool.proxy_url().await.unwrap(),
            pool.proxy_url().await.unwrap(),
        ];
        assert_eq!(
            picks,
            [
                Some("http://p1:8080".to_string()),
                Some("http://p2:8080".to_string()),
                Some("http://p1:8080".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn empty_pool_connects_directly() {
        assert_eq!(StaticProxyPool::new(Vec::new()).proxy_url().await, Ok(None));
        assert_eq!(NoProxy.proxy_url().await, Ok(None));
    }
}
