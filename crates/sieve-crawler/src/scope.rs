use url::Url;

use crate::fetcher::FetchError;

/// A URL to download along with its distance from the entry page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: Url,
    pub depth: usize,
}

impl Target {
    pub fn new(url: Url, depth: usize) -> Self {
        Self { url, depth }
    }

    /// Parses an absolute http(s) URL.
    pub fn parse(raw: &str, depth: usize) -> Result<Self, FetchError> {
        let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(Self::new(url, depth)),
            scheme => Err(FetchError::InvalidUrl(format!(
                "{raw}: unsupported scheme {scheme}"
            ))),
        }
    }

    /// Resolves `href` against this target, one hop further.
    pub fn follow(&self, href: &str) -> Result<Self, FetchError> {
        let url = self
            .url
            .join(href)
            .map_err(|e| FetchError::InvalidUrl(format!("{href}: {e}")))?;
        Self::parse(url.as_str(), self.depth + 1)
    }
}

/// The domains and depth a fetch is allowed to reach.
///
/// Always built from the target it guards, a scope is never shared across sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    domains: Vec<String>,
    max_depth: usize,
}

impl Scope {
    /// Allows the host of `url` and its `www.` variant.
    pub fn for_url(url: &Url, max_depth: usize) -> Result<Self, FetchError> {
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl(format!("{url}: missing host")))?
            .to_lowercase();
        let www_host = format!("www.{}", host.strip_prefix("www.").unwrap_or(&host));

        let mut domains = vec![host];
        if !domains.contains(&www_host) {
            domains.push(www_host);
        }

        Ok(Self { domains, max_depth })
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn allows(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.domains.iter().any(|d| d.eq_ignore_ascii_case(host)))
            .unwrap_or(false)
    }

    pub fn check(&self, target: &Target) -> Result<(), FetchError> {
        if target.depth > self.max_depth {
            return Err(FetchError::DepthExceeded {
                url: target.url.to_string(),
                depth: target.depth,
                max_depth: self.max_depth,
            });
        }
        if !self.allows(&target.url) {
            return Err(FetchError::DisallowedDomain {
                url: target.url.to_string(),
                allowed: self.domains.clone(),
            });
        }
        Ok(())
    }
}
