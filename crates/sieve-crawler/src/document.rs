use anyhow::anyhow;
use sws_scraper::{ElementRef, Html, Selector};

/// A flattened DOM element: tag name, the attributes the pipeline looks at and inner text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub class: Option<String>,
    pub id: Option<String>,
    pub href: Option<String>,
    pub text: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        match name {
            "class" => self.class.as_deref(),
            "id" => self.id.as_deref(),
            "href" => self.href.as_deref(),
            _ => None,
        }
    }

    fn from_ref(elem: &ElementRef) -> Option<Self> {
        let (name, class, id, href) = elem.map_value(|v| {
            (
                v.name().to_string(),
                v.attr("class").map(String::from),
                v.attr("id").map(String::from),
                v.attr("href").map(String::from),
            )
        })?;
        Some(Self {
            name,
            class,
            id,
            href,
            text: elem.inner_text(),
        })
    }
}

/// A parsed HTML page.
///
/// Parsing never fails, malformed markup yields a best-effort tree.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(page: &str) -> Self {
        Self {
            html: Html::parse_document(page),
        }
    }

    /// Every element of the page in document order, starting with `<html>`.
    pub fn elements(&self) -> impl Iterator<Item = Element> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter_map(|elem| Element::from_ref(&elem))
    }

    /// Elements matching a CSS selector, in document order.
    pub fn select(&self, css: &str) -> anyhow::Result<impl Iterator<Item = Element>> {
        let selector =
            Selector::parse(css).map_err(|e| anyhow!("Invalid CSS selector {css}: {e:?}"))?;
        Ok(self
            .html
            .select(selector)
            .filter_map(|elem| Element::from_ref(&elem)))
    }

    /// The raw `href` of every anchor.
    pub fn links(&self) -> Vec<String> {
        match self.select("a[href]") {
            Ok(anchors) => anchors.filter_map(|elem| elem.href).collect(),
            Err(e) => {
                log::error!("{e}");
                vec![]
            }
        }
    }

    /// Trimmed text of `<body>`, empty when there is none.
    pub fn body_text(&self) -> String {
        self.elements()
            .find(|elem| elem.name == "body")
            .map(|body| body.text.trim().to_string())
            .unwrap_or_default()
    }
}
