//! Card list and page rendering.
//!
//! All feed-sourced values are escaped with [`escape_html`] while building the
//! view structs, so the templates are compiled without auto-escaping.

use std::fmt::Display;

use askama::Template;
use chrono::TimeZone;

use crate::dates::format_date_in;
use crate::escape::{escape_attr, escape_html};
use crate::feed::{FeedDocument, Item};
use crate::sources::{derive_source, host_from_url, source_options, ALL_SOURCES};

/// Most cards rendered for a single filter.
pub const MAX_CARDS: usize = 50;

pub const EMPTY_PLACEHOLDER: &str =
    r#"<div class="article"><div class="meta">No articles yet.</div></div>"#;

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_LINK: &str = "#";
const DEFAULT_SOURCE: &str = "—";
const DEFAULT_PAGE_TITLE: &str = "Team News";

pub struct Card {
    pub title: String,
    pub href: String,
    pub source: String,
    pub date: String,
}

impl Card {
    pub fn from_item<Tz>(item: &Item, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let link = item.link().unwrap_or(DEFAULT_LINK);
        let source = match item.source() {
            Some(source) => source.to_string(),
            None => host_from_url(link),
        };
        let source = if source.is_empty() {
            DEFAULT_SOURCE.to_string()
        } else {
            source
        };

        Self {
            title: escape_html(item.title().unwrap_or(DEFAULT_TITLE)),
            href: escape_attr(link),
            source: escape_html(&source),
            date: item
                .date()
                .map(|d| escape_html(&format_date_in(d, tz)))
                .unwrap_or_default(),
        }
    }
}

pub struct SourceOption {
    pub value: String,
    pub selected: bool,
}

pub struct LinkView {
    pub label: String,
    pub href: String,
}

#[derive(Template)]
#[template(path = "articles.html", escape = "none")]
pub struct ArticlesTemplate {
    pub cards: Vec<Card>,
}

#[derive(Template)]
#[template(path = "index.html", escape = "none")]
pub struct PageTemplate {
    pub title: String,
    pub updated_label: String,
    pub options: Vec<SourceOption>,
    pub static_links: Vec<LinkView>,
    pub articles: String,
}

/// Items whose derived source equals `filter` (every item for the sentinel),
/// capped at [`MAX_CARDS`] in feed order.
pub fn filter_items<'a>(items: &'a [Item], filter: &str) -> Vec<&'a Item> {
    items
        .iter()
        .filter(|item| filter == ALL_SOURCES || derive_source(item) == filter)
        .take(MAX_CARDS)
        .collect()
}

/// Render the card list for `filter`, or the placeholder when nothing matches.
pub fn render_articles<Tz>(items: &[Item], filter: &str, tz: &Tz) -> askama::Result<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let cards: Vec<Card> = filter_items(items, filter)
        .into_iter()
        .map(|item| Card::from_item(item, tz))
        .collect();

    if cards.is_empty() {
        return Ok(EMPTY_PLACEHOLDER.to_string());
    }

    ArticlesTemplate { cards }.render()
}

/// Render the full page: header, source dropdown and the filtered card list.
pub fn render_page<Tz>(doc: &FeedDocument, filter: &str, tz: &Tz) -> askama::Result<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let updated_label = doc
        .updated_at()
        .map(|at| format!("Updated: {}", escape_html(&format_date_in(at, tz))))
        .unwrap_or_default();

    let options = source_options(&doc.items)
        .into_iter()
        .map(|source| SourceOption {
            selected: source == filter,
            value: escape_attr(&source),
        })
        .collect();

    let static_links = doc
        .static_links
        .iter()
        .map(|link| LinkView {
            label: escape_html(&link.label),
            href: escape_attr(&link.url),
        })
        .collect();

    PageTemplate {
        title: escape_html(doc.team_name().unwrap_or(DEFAULT_PAGE_TITLE)),
        updated_label,
        options,
        static_links,
        articles: render_articles(&doc.items, filter, tz)?,
    }
    .render()
}
