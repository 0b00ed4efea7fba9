// src/fetch.rs
//! Outbound HTTP: one GET per URL, returning status + body.
//!
//! Non-2xx responses are *not* errors at this layer; callers decide what a
//! bad status means (listing → abort, post → placeholder).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("reading body of {url} failed: {message}")]
    Body { url: String, message: String },
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher with a per-request timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, reqwest::Error> {
        Self::new(cfg.fetch_timeout(), &cfg.user_agent)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let resp = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(target: "fetch", %url, status, bytes = body.len(), "fetched");
        Ok(FetchedPage { status, body })
    }
}

// --- Test helper ---

/// In-memory fetcher keyed by absolute URL. Unknown URLs answer 404;
/// URLs registered with [`StaticFetcher::fail`] return a transport error.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, FetchedPage>,
    failing: Vec<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    pub fn fail(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }

    /// Sleep before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let key = url.to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key.clone());
        }
        if self.failing.contains(&key) {
            return Err(FetchError::Transport {
                url: key,
                message: "connection refused".to_string(),
            });
        }
        Ok(self.pages.get(&key).cloned().unwrap_or(FetchedPage {
            status: 404,
            body: String::new(),
        }))
    }
}
