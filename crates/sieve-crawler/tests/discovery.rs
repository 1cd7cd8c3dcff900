use std::collections::HashMap;
use std::sync::Mutex;

use sieve_crawler::{
    async_trait, CrawlerConfig, Discovery, FetchError, Fetcher, OnError, Page, Scope, Target,
};

/// Serves canned pages and records every URL it was asked for.
#[derive(Default)]
struct CannedSite {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl CannedSite {
    fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for CannedSite {
    async fn fetch(&self, target: &Target, scope: &Scope) -> Result<Page, FetchError> {
        scope.check(target)?;
        self.requested.lock().unwrap().push(target.url.to_string());
        match self.pages.get(target.url.as_str()) {
            Some(body) => Ok(Page {
                location: target.url.clone(),
                body: body.clone(),
            }),
            None => Err(FetchError::Status {
                url: target.url.to_string(),
                status: 404,
            }),
        }
    }
}

fn site() -> CannedSite {
    CannedSite::default()
        .page(
            "https://a.example/",
            r#"<body>
                <a href="/about">About</a>
                <a href="/LogIn">Log in</a>
                <a href="https://other.example/signin">Partner</a>
            </body>"#,
        )
        .page(
            "https://a.example/LogIn",
            r#"<body>
                <a href="/legal/Terms">Terms</a>
                <a href="https://cdn.example/privacy">Privacy</a>
                <a href="/help">Help</a>
                <a href="/login/sso">SSO</a>
            </body>"#,
        )
        .page(
            "https://a.example/legal/Terms",
            "<body>\n  By using this site you agree to these terms.\n</body>",
        )
        .page(
            "https://cdn.example/privacy",
            "<body>We respect your privacy.</body>",
        )
}

#[tokio::test]
async fn follows_login_then_policy_links() {
    let site = site();
    let config = CrawlerConfig::default();

    let found = Discovery::new(&site, &config)
        .run("https://a.example/")
        .await
        .unwrap();

    let texts = found.iter().map(|p| p.text.as_str()).collect::<Vec<_>>();
    assert_eq!(
        texts,
        [
            "By using this site you agree to these terms.",
            "We respect your privacy."
        ]
    );
    assert!(found
        .iter()
        .all(|p| p.login_url.as_str() == "https://a.example/LogIn"));

    let requested = site.requested();
    assert!(!requested.contains(&"https://a.example/about".to_string()));
    assert!(!requested.contains(&"https://a.example/help".to_string()));
    // Login pages are not searched for further login links
    assert!(!requested.contains(&"https://a.example/login/sso".to_string()));
    // Login pages must stay on the homepage's site
    assert!(!requested.contains(&"https://other.example/signin".to_string()));
}

#[tokio::test]
async fn depth_one_never_leaves_the_homepage() {
    let site = site();
    let config = CrawlerConfig {
        max_depth: 1,
        ..Default::default()
    };

    let found = Discovery::new(&site, &config)
        .run("https://a.example/")
        .await
        .unwrap();

    assert!(found.is_empty());
    assert_eq!(site.requested(), ["https://a.example/"]);
}

#[tokio::test]
async fn unreachable_homepage_is_an_error() {
    let site = CannedSite::default();
    let config = CrawlerConfig::default();

    let res = Discovery::new(&site, &config).run("https://a.example/").await;
    assert!(res.is_err());
}

#[tokio::test]
async fn failing_policy_page_is_skipped_or_fatal() {
    let site = CannedSite::default()
        .page("https://a.example/", r#"<a href="/signin">Sign in</a>"#)
        .page(
            "https://a.example/signin",
            r#"<a href="/privacy">Privacy</a><a href="/terms">Terms</a>"#,
        )
        .page("https://a.example/terms", "<p>Terms of service</p>");

    let config = CrawlerConfig::default();
    let found = Discovery::new(&site, &config)
        .run("https://a.example/")
        .await
        .unwrap();
    assert_eq!(1, found.len());
    assert_eq!("https://a.example/terms", found[0].policy_url.as_str());

    let config = CrawlerConfig {
        on_dl_error: OnError::Fail,
        ..Default::default()
    };
    let res = Discovery::new(&site, &config).run("https://a.example/").await;
    assert!(res.is_err());
}

#[tokio::test]
async fn repeated_links_are_visited_once() {
    let site = CannedSite::default()
        .page(
            "https://a.example/",
            r#"<a href="/login">Log in</a><a href="https://a.example/login">Account</a>"#,
        )
        .page(
            "https://a.example/login",
            r#"<a href="/privacy">Privacy</a><a href="/privacy">Privacy policy</a>"#,
        )
        .page("https://a.example/privacy", "<body>Privacy notice</body>");
    let config = CrawlerConfig::default();

    let found = Discovery::new(&site, &config)
        .run("https://a.example/")
        .await
        .unwrap();

    assert_eq!(1, found.len());
    assert_eq!(
        site.requested(),
        [
            "https://a.example/",
            "https://a.example/login",
            "https://a.example/privacy"
        ]
    );
}
