//! Heuristic policy text filter.
//!
//! Matching is plain substring search on lower-cased text, so an incidental
//! "facebook.com" inside real policy prose drops the whole element. Cleaning strips
//! the first `{` to the last `}` of a fragment, which can eat legitimate text after a
//! stray brace. Both are accepted limitations of a best-effort filter.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sieve_crawler::Element;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref STYLE_FRAGMENT: Regex = Regex::new(r"--rg-gradient[^}]*\}").unwrap();
    static ref DATA_ATTR_SELECTOR: Regex = Regex::new(r"\[data-eb-[^\]]*\]").unwrap();
    static ref BRACED_BLOCK: Regex = Regex::new(r"\{[\s\S]*\}").unwrap();
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    /// Elements that can carry policy prose
    #[serde(default = "default_content_tags")]
    pub content_tags: Vec<String>,

    /// Elements that never carry policy prose
    #[serde(default = "default_skipped_tags")]
    pub skipped_tags: Vec<String>,

    /// Matched against tag name, `class` and `id`
    #[serde(default = "default_structural_patterns")]
    pub structural_patterns: Vec<String>,

    #[serde(default = "default_excluded_phrases")]
    pub excluded_phrases: Vec<String>,

    #[serde(default = "default_policy_phrases")]
    pub policy_phrases: Vec<String>,

    /// Cleaned fragments shorter than this many characters are dropped
    #[serde(default = "default_min_fragment_len")]
    pub min_fragment_len: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            content_tags: default_content_tags(),
            skipped_tags: default_skipped_tags(),
            structural_patterns: default_structural_patterns(),
            excluded_phrases: default_excluded_phrases(),
            policy_phrases: default_policy_phrases(),
            min_fragment_len: default_min_fragment_len(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_content_tags() -> Vec<String> {
    strings(&["p", "section", "article", "div"])
}

fn default_skipped_tags() -> Vec<String> {
    strings(&["script", "style", "meta", "noscript", "iframe"])
}

fn default_structural_patterns() -> Vec<String> {
    strings(&["nav", "footer", "menu", "banner", "signup", "cookie-consent"])
}

fn default_excluded_phrases() -> Vec<String> {
    strings(&[
        "create an account",
        "sign up",
        "back to top",
        "equal opportunity",
        "cookie preferences",
        "socialitems",
        "facebook",
        "linkedin",
        "twitter",
        "instagram",
        "--rg-gradient",
        "data-eb-",
        "contact us",
        "support ticket",
        "accessibility",
    ])
}

fn default_policy_phrases() -> Vec<String> {
    strings(&[
        "personal information",
        "data collection",
        "third party",
        "third-party",
        "privacy",
        "policy",
        "terms",
        "data",
        "cookies",
        "legal",
        "retention",
        "security",
        "access",
        "children",
        "location of",
        "use personal",
        "share personal",
        "data privacy",
        "information collected",
    ])
}

fn default_min_fragment_len() -> usize {
    20
}

/// Keeps the DOM elements that read like privacy or terms content.
///
/// Stateless once built, a single filter can be shared by every pass.
#[derive(Debug, Clone)]
pub struct PolicyFilter {
    config: FilterConfig,
}

impl Default for PolicyFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

impl PolicyFilter {
    pub fn new(config: FilterConfig) -> Self {
        let lower = |items: Vec<String>| -> Vec<String> {
            items
                .into_iter()
                .map(|s| s.to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            config: FilterConfig {
                content_tags: lower(config.content_tags),
                skipped_tags: lower(config.skipped_tags),
                structural_patterns: lower(config.structural_patterns),
                excluded_phrases: lower(config.excluded_phrases),
                policy_phrases: lower(config.policy_phrases),
                min_fragment_len: config.min_fragment_len,
            },
        }
    }

    /// Cleaned text of `element` when it looks like policy content.
    pub fn classify(&self, element: &Element) -> Option<String> {
        if self.is_structural_noise(element) {
            return None;
        }

        let text = element.text.to_lowercase();
        if contains_any(&text, &self.config.excluded_phrases)
            || !contains_any(&text, &self.config.policy_phrases)
        {
            return None;
        }

        let cleaned = clean(&element.text);
        if cleaned.chars().count() < self.config.min_fragment_len {
            return None;
        }
        Some(cleaned)
    }

    /// Kept fragments in element order, each one terminated by a newline.
    pub fn extract<I>(&self, elements: I) -> String
    where
        I: IntoIterator<Item = Element>,
    {
        let mut content = String::new();
        for fragment in elements.into_iter().filter_map(|e| self.classify(&e)) {
            content.push_str(&fragment);
            content.push('\n');
        }
        content
    }

    fn is_structural_noise(&self, element: &Element) -> bool {
        let name = element.name.to_lowercase();
        if self.config.skipped_tags.contains(&name) || !self.config.content_tags.contains(&name) {
            return true;
        }

        let class = element.attr("class").unwrap_or_default().to_lowercase();
        let id = element.attr("id").unwrap_or_default().to_lowercase();
        [name, class, id]
            .iter()
            .any(|attr| contains_any(attr, &self.config.structural_patterns))
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

fn clean(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = text.trim();
    let text = STYLE_FRAGMENT.replace_all(text, "");
    let text = DATA_ATTR_SELECTOR.replace_all(&text, "");
    let text = BRACED_BLOCK.replace_all(&text, "");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(name: &str, class: &str, text: &str) -> Element {
        Element {
            name: name.to_string(),
            class: Some(class.to_string()).filter(|c| !c.is_empty()),
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn footer_is_dropped_despite_policy_text() {
        let filter = PolicyFilter::default();
        let footer = elem(
            "div",
            "site-footer",
            "Read our privacy policy to learn how we handle personal information.",
        );
        assert_eq!(None, filter.classify(&footer));
    }

    #[test]
    fn structural_patterns_match_ids_case_insensitively() {
        let filter = PolicyFilter::default();
        let banner = Element {
            id: Some("Cookie-Consent-Banner".into()),
            ..elem("section", "", "We use cookies and store data for security reasons.")
        };
        assert_eq!(None, filter.classify(&banner));

        let nav = elem("nav", "", "Privacy policy and terms of service for our users");
        assert_eq!(None, filter.classify(&nav));
    }

    #[test]
    fn cookie_sentence_is_kept_and_collapsed() {
        let filter = PolicyFilter::default();
        let p = elem(
            "p",
            "body-copy",
            "  We use cookies to improve your experience.\n\t See our privacy policy\n for details on data retention.  ",
        );
        assert_eq!(
            Some("We use cookies to improve your experience. See our privacy policy for details on data retention.".to_string()),
            filter.classify(&p)
        );
    }

    #[test]
    fn marketing_is_dropped() {
        let filter = PolicyFilter::default();
        let promo = elem("div", "hero", "Sign up today and follow us on Facebook");
        assert_eq!(None, filter.classify(&promo));
    }

    #[test]
    fn exclusion_wins_over_policy_vocabulary() {
        let filter = PolicyFilter::default();
        let p = elem(
            "p",
            "",
            "Our privacy policy explains what we share with Facebook and other partners.",
        );
        assert_eq!(None, filter.classify(&p));
    }

    #[test]
    fn text_without_policy_vocabulary_is_dropped() {
        let filter = PolicyFilter::default();
        let p = elem("p", "", "Our team has been building great products since 2004.");
        assert_eq!(None, filter.classify(&p));
    }

    #[test]
    fn non_content_tags_are_dropped() {
        let filter = PolicyFilter::default();
        let text = "var privacy = { personal information: true }; // policy data";
        assert_eq!(None, filter.classify(&elem("script", "", text)));
        assert_eq!(
            None,
            filter.classify(&elem("span", "", "This privacy policy covers all of our services."))
        );
    }

    #[test]
    fn short_fragments_are_noise() {
        let filter = PolicyFilter::default();
        assert_eq!(None, filter.classify(&elem("p", "", " Privacy   Policy ")));
        assert_eq!(
            Some("Terms of the policy.".to_string()),
            filter.classify(&elem("p", "", "Terms of the policy."))
        );
    }

    #[test]
    fn braces_are_removed_greedily() {
        assert_eq!(
            "We share data  partners.",
            clean(r#"We share data {"@type": "Org"} with {x} partners."#)
        );
        assert_eq!(
            "Retention lasts  by law.",
            clean("Retention lasts {30 days} unless {required} by law.")
        );
        assert_eq!(
            "Data collected by  [] vendors",
            clean("Data collected by [data-eb-x] [] vendors")
        );
    }

    #[test]
    fn extract_joins_fragments_in_order() {
        let filter = PolicyFilter::default();
        let elements = vec![
            elem("p", "", "We collect personal information when you register."),
            elem("p", "", "Follow us on Instagram for privacy news!"),
            elem("section", "", "Third-party processors may access your data."),
        ];
        assert_eq!(
            "We collect personal information when you register.\nThird-party processors may access your data.\n",
            filter.extract(elements)
        );
    }

    #[test]
    fn custom_vocabulary_is_case_insensitive() {
        let filter = PolicyFilter::new(FilterConfig {
            policy_phrases: vec!["Datenschutz".into()],
            ..Default::default()
        });
        assert!(filter
            .classify(&elem("p", "", "Hinweise zum Datenschutz für alle Nutzer"))
            .is_some());
        assert!(filter
            .classify(&elem("p", "", "We care about your privacy and data."))
            .is_none());
    }
}
