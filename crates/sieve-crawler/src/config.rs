use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum number of hops from an entry URL, the entry itself being at depth 1
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of policy pages downloaded concurrently during a pass
    #[serde(default = "default_concurrent_downloads")]
    pub concurrent_downloads: usize,

    /// Per page download timeout, in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    /// Deadline for a whole scrape pass, in seconds
    #[serde(default = "default_pass_timeout")]
    pub pass_timeout: u64,

    #[serde(default = "default_on_dl_error")]
    pub on_dl_error: OnError,
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_depth: default_max_depth(),
            concurrent_downloads: default_concurrent_downloads(),
            fetch_timeout: default_fetch_timeout(),
            pass_timeout: default_pass_timeout(),
            on_dl_error: default_on_dl_error(),
        }
    }
}

fn default_user_agent() -> String {
    String::from("PolicySieveBot")
}

fn default_max_depth() -> usize {
    2
}

fn default_concurrent_downloads() -> usize {
    8
}

fn default_fetch_timeout() -> u64 {
    20
}

fn default_pass_timeout() -> u64 {
    120
}

fn default_on_dl_error() -> OnError {
    OnError::SkipAndLog
}

/// What the discovery crawl does when a page can't be downloaded.
///
/// Scrape passes always skip and log, a failed link never fails its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}
