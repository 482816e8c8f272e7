//! Small helpers over `scraper` for listing pages.

use scraper::{ElementRef, Selector};
use url::Url;

use crate::error::{CrawlError, CrawlResult};
use crate::heuristics::collapse_whitespace;

/// Compile a CSS selector.
pub fn selector(css: &str) -> CrawlResult<Selector> {
    Selector::parse(css).map_err(|e| CrawlError::Parse(format!("invalid selector {}: {}", css, e)))
}

/// Visible text of an element with whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first descendant matching `selector`, if non-empty.
pub fn select_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

/// Text of every descendant matching `selector`, blanks included so
/// positional fields keep their index.
pub fn select_texts(element: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    element.select(selector).map(element_text).collect()
}

/// Attribute of the first descendant matching `selector`.
pub fn select_attr(element: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .find_map(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolve `href` against `base`; absolute hrefs are returned as-is.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    Url::parse(base)
        .ok()?
        .join(href.trim())
        .ok()
        .map(|url| url.to_string())
}

/// Value of query parameter `name` in a possibly relative `href`.
pub fn query_param(href: &str, name: &str) -> Option<String> {
    let url = Url::parse("https://placeholder.invalid/").ok()?.join(href).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
