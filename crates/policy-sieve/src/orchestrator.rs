use std::fmt;
use std::sync::Arc;

use futures::{stream, StreamExt};
use serde::Serialize;
use sieve_crawler::{CrawlerConfig, FetchError, Fetcher, Page, Scope, Target};
use tokio::time::{timeout_at, Instant};

use crate::filter::PolicyFilter;
use crate::record::Record;
use crate::store::RecordStore;

/// Counters of one scrape pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub records: usize,
    pub links: usize,
    pub fetched: usize,
    pub failed: usize,
    pub empty: usize,
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} links ({} with content, {} empty, {} failed)",
            self.records,
            self.links,
            self.fetched - self.empty,
            self.empty,
            self.failed
        )
    }
}

enum LinkOutcome {
    Extracted(String),
    Empty,
    Failed,
}

/// Scrapes the policy links of queued records and stores their policy text.
pub struct Orchestrator<F> {
    store: Arc<RecordStore>,
    fetcher: F,
    filter: PolicyFilter,
    config: CrawlerConfig,
}

impl<F> Orchestrator<F>
where
    F: Fetcher,
{
    pub fn new(
        store: Arc<RecordStore>,
        fetcher: F,
        filter: PolicyFilter,
        config: CrawlerConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            filter,
            config,
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Processes every currently queued record.
    ///
    /// Link failures are logged and skipped, every drained record ends up processed and
    /// back in the store, even when the pass deadline expires.
    pub async fn run_pass(&self) -> PassReport {
        let batch = self.store.drain_unprocessed();
        let mut report = PassReport {
            records: batch.len(),
            ..Default::default()
        };
        if batch.is_empty() {
            return report;
        }
        log_batch("Queued records (before scraping)", &batch);

        let deadline = Instant::now() + self.config.pass_timeout();
        let links = batch
            .iter()
            .enumerate()
            .flat_map(|(idx, record)| {
                record
                    .policy_links()
                    .iter()
                    .map(move |link| (idx, link.clone()))
            })
            .collect::<Vec<_>>();
        report.links = links.len();

        let outcomes = stream::iter(links)
            .map(|(idx, link)| async move { (idx, self.scrape_link(&link, deadline).await) })
            .buffered(self.config.concurrent_downloads.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut texts = vec![Vec::new(); batch.len()];
        for (idx, outcome) in outcomes {
            match outcome {
                LinkOutcome::Extracted(text) => {
                    report.fetched += 1;
                    texts[idx].push(text);
                }
                LinkOutcome::Empty => {
                    report.fetched += 1;
                    report.empty += 1;
                }
                LinkOutcome::Failed => report.failed += 1,
            }
        }

        let mut processed = Vec::with_capacity(batch.len());
        for (mut record, parts) in batch.into_iter().zip(texts) {
            record.complete(parts.join("\n\n").trim().to_string());
            let id = record.id();
            processed.push(record.clone());
            if !self.store.requeue(record) {
                log::error!("Scraped record {id} could not be written back, its text is lost");
            }
        }
        log_batch("Processed records (after scraping)", &processed);

        log::info!("Scrape pass done: {report}");
        report
    }

    async fn scrape_link(&self, link: &str, deadline: Instant) -> LinkOutcome {
        log::info!("Scraping policy link: {link}");
        let page = match self.fetch(link, deadline).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Failed to visit policy page: {e}");
                return LinkOutcome::Failed;
            }
        };

        let content = self.extract(&page);
        if content.is_empty() {
            log::info!("No relevant policy content found for: {link}");
            LinkOutcome::Empty
        } else {
            LinkOutcome::Extracted(content)
        }
    }

    async fn fetch(&self, link: &str, deadline: Instant) -> Result<Page, FetchError> {
        let target = Target::parse(link, 1)?;
        let scope = Scope::for_url(&target.url, self.config.max_depth)?;
        match timeout_at(deadline, self.fetcher.fetch(&target, &scope)).await {
            Ok(res) => res,
            Err(_) => Err(FetchError::Timeout {
                url: link.to_string(),
            }),
        }
    }

    fn extract(&self, page: &Page) -> String {
        let document = page.document();
        self.filter
            .extract(document.elements())
            .trim()
            .to_string()
    }
}

fn log_batch(heading: &str, records: &[Record]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    log::debug!("=== {heading} ===");
    for (i, record) in records.iter().enumerate() {
        log::debug!(
            "Item {}: {} url={} login_form={} state={:?} links={:?} text={:?}",
            i + 1,
            record.id(),
            record.source_url(),
            record.login_detected(),
            record.state(),
            record.policy_links(),
            record.extracted_text()
        );
    }
}
