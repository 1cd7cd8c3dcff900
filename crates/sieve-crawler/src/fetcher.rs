use std::io::prelude::*;
use std::time::Duration;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use thiserror::Error;
use url::Url;

use crate::config::CrawlerConfig;
use crate::document::Document;
use crate::scope::{Scope, Target};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL {0}")]
    InvalidUrl(String),

    #[error("{url} is outside of allowed domains {allowed:?}")]
    DisallowedDomain { url: String, allowed: Vec<String> },

    #[error("{url} is at depth {depth} but max depth is {max_depth}")]
    DepthExceeded {
        url: String,
        depth: usize,
        max_depth: usize,
    },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("Couldn't decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out fetching {url}")]
    Timeout { url: String },
}

impl FetchError {
    fn from_reqwest(url: &Url, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// A downloaded page, `location` is the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct Page {
    pub location: Url,
    pub body: String,
}

impl Page {
    pub fn document(&self) -> Document {
        Document::parse(&self.body)
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, target: &Target, scope: &Scope) -> Result<Page, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> anyhow::Result<Self> {
        Self::with_timeout(&config.user_agent, config.fetch_timeout())
    }

    pub fn with_timeout(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .gzip(true)
            .deflate(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &Target, scope: &Scope) -> Result<Page, FetchError> {
        scope.check(target)?;
        log::info!("Fetching page: {} (depth {})", target.url, target.depth);

        let resp = self
            .client
            .get(target.url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&target.url, e))?;

        // Redirects are followed by the client, the landing page must stay in scope
        let location = resp.url().clone();
        if !scope.allows(&location) {
            return Err(FetchError::DisallowedDomain {
                url: location.to_string(),
                allowed: scope.domains().to_vec(),
            });
        }

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: location.to_string(),
                status: status.as_u16(),
            });
        }

        let body = match resp.headers().get(CONTENT_TYPE) {
            Some(c) if c == "application/x-gzip" || c == "application/gzip" => {
                let compressed = resp
                    .bytes()
                    .await
                    .map_err(|e| FetchError::from_reqwest(&location, e))?;
                let mut gz = GzDecoder::new(&compressed[..]);
                let mut body = String::new();
                gz.read_to_string(&mut body)
                    .map_err(|source| FetchError::Decode {
                        url: location.to_string(),
                        source,
                    })?;
                body
            }
            _ => resp
                .text()
                .await
                .map_err(|e| FetchError::from_reqwest(&location, e))?,
        };

        Ok(Page { location, body })
    }
}
