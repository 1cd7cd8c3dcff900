mod config;
pub mod discovery;
mod document;
mod fetcher;
mod scope;

pub use config::{CrawlerConfig, OnError};
pub use discovery::{DiscoveredPolicy, Discovery};
pub use document::{Document, Element};
pub use fetcher::{FetchError, Fetcher, HttpFetcher, Page};
pub use scope::{Scope, Target};

pub use async_trait::async_trait;
