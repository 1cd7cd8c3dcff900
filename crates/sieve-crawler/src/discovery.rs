//! Homepage → login page → policy page crawl.
//!
//! Follows `login`/`signin` anchors from a homepage, then `terms`/`policy`/`privacy`
//! anchors from every reached login page, and returns the full body text of each
//! policy page. Each page is fetched at most once per run, no relevance filtering
//! happens here.

use std::collections::HashSet;

use url::Url;

use crate::config::{CrawlerConfig, OnError};
use crate::fetcher::{Fetcher, Page};
use crate::scope::{Scope, Target};

const LOGIN_MARKERS: &[&str] = &["login", "signin"];
const POLICY_MARKERS: &[&str] = &["terms", "policy", "privacy"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPolicy {
    pub login_url: Url,
    pub policy_url: Url,
    pub text: String,
}

pub struct Discovery<'a, F: ?Sized> {
    fetcher: &'a F,
    config: &'a CrawlerConfig,
}

impl<'a, F> Discovery<'a, F>
where
    F: Fetcher + ?Sized,
{
    pub fn new(fetcher: &'a F, config: &'a CrawlerConfig) -> Self {
        Self { fetcher, config }
    }

    pub async fn run(&self, homepage: &str) -> anyhow::Result<Vec<DiscoveredPolicy>> {
        let home = Target::parse(homepage, 1)?;
        let scope = Scope::for_url(&home.url, self.config.max_depth)?;

        log::info!("Scanning homepage: {}", home.url);
        let page = self
            .fetcher
            .fetch(&home, &scope)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to visit homepage {homepage}: {e}"))?;

        let mut visited = HashSet::from([home.url.clone()]);
        let mut found = vec![];
        for login in matching_links(&home, &page, LOGIN_MARKERS)? {
            if !visited.insert(login.url.clone()) {
                continue;
            }
            log::info!("Found login/signin page: {}", login.url);
            let Some(login_page) = self.visit(&login, &scope).await? else {
                continue;
            };
            for policy in matching_links(&login, &login_page, POLICY_MARKERS)? {
                if !visited.insert(policy.url.clone()) {
                    continue;
                }
                log::info!("Found policy link on login page: {}", policy.url);
                // Policy pages are entry points of their own site
                let policy = Target::new(policy.url, 1);
                let policy_scope = Scope::for_url(&policy.url, self.config.max_depth)?;
                if let Some(policy_page) = self.visit(&policy, &policy_scope).await? {
                    found.push(DiscoveredPolicy {
                        login_url: login_page.location.clone(),
                        policy_url: policy_page.location.clone(),
                        text: policy_page.document().body_text(),
                    });
                }
            }
        }

        Ok(found)
    }

    async fn visit(&self, target: &Target, scope: &Scope) -> anyhow::Result<Option<Page>> {
        match self.fetcher.fetch(target, scope).await {
            Ok(page) => Ok(Some(page)),
            Err(e) => match self.config.on_dl_error {
                OnError::SkipAndLog => {
                    log::warn!("Skipping page {}: {e}", target.url);
                    Ok(None)
                }
                OnError::Fail => Err(e.into()),
            },
        }
    }
}

/// Absolute targets for the anchors of `page` whose href contains one of `markers`.
fn matching_links(from: &Target, page: &Page, markers: &[&str]) -> anyhow::Result<Vec<Target>> {
    let base = Target::new(page.location.clone(), from.depth);
    let targets = page
        .document()
        .select("a[href]")?
        .filter_map(|anchor| anchor.href)
        .filter(|href| {
            let href = href.to_lowercase();
            markers.iter().any(|m| href.contains(m))
        })
        .filter_map(|href| match base.follow(&href) {
            Ok(target) => Some(target),
            Err(e) => {
                log::debug!("Ignoring link: {e}");
                None
            }
        })
        .collect();
    Ok(targets)
}

