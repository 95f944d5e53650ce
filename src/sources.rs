//! Source derivation and the filter dropdown's option list.

use std::cmp::Ordering;
use std::collections::HashSet;

use url::Url;

use crate::feed::Item;

/// The synthetic option that disables filtering.
pub const ALL_SOURCES: &str = "All sources";

/// Host (with a non-default port) of `link`, minus a leading `www.`.
/// Empty when the link does not parse or has no host.
pub fn host_from_url(link: &str) -> String {
    let Ok(url) = Url::parse(link) else {
        return String::new();
    };
    let Some(host) = url.host_str() else {
        return String::new();
    };

    let host = host.strip_prefix("www.").unwrap_or(host);
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// `item.source` when present, otherwise the host of `item.link`.
pub fn derive_source(item: &Item) -> String {
    match item.source() {
        Some(source) => source.to_string(),
        None => item.link().map(host_from_url).unwrap_or_default(),
    }
}

/// The sentinel followed by every distinct non-empty source in alphabetical order.
pub fn source_options(items: &[Item]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sources: Vec<String> = items
        .iter()
        .map(derive_source)
        .filter(|s| !s.is_empty() && s != ALL_SOURCES)
        .filter(|s| seen.insert(s.clone()))
        .collect();

    sources.sort_by(|a, b| compare_sources(a, b));
    sources.insert(0, ALL_SOURCES.to_string());
    sources
}

/// Case-insensitive order, exact order breaking ties.
fn compare_sources(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
