//! Builds the feed document from the configured RSS/Atom sources.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use feed_rs::parser;
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::{Captures, Regex};
use reqwest::Client;
use tracing::{error, info, warn};
use url::{Position, Url};

use crate::config::{Config, FeedConfig, FilterConfig};
use crate::feed::{FeedDocument, Item, StaticLink, Team};

const MAX_SOURCE_CHARS: usize = 60;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    HttpStatus(u16),
    #[error("failed to parse feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
    #[error("failed to encode feed document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// An entry that survived parsing but not yet filtering.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub item: Item,
    pub published_at: DateTime<Utc>,
    pub trusted: bool,
}

impl Candidate {
    fn title(&self) -> &str {
        self.item.title().unwrap_or_default()
    }

    fn link(&self) -> &str {
        self.item.link().unwrap_or_default()
    }
}

pub struct Collector {
    client: Client,
    config: Config,
}

impl Collector {
    pub fn new(config: Config) -> Result<Self, CollectError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch every configured feed and assemble the document.
    /// A failing feed is logged and skipped.
    pub async fn collect(&self) -> FeedDocument {
        info!("Collecting {} feeds", self.config.feeds.len());

        let mut candidates = Vec::new();
        for feed in &self.config.feeds {
            match self.fetch_feed(feed).await {
                Ok(entries) => {
                    info!("Parsed {} entries from '{}'", entries.len(), feed.name);
                    candidates.extend(entries);
                }
                Err(e) => warn!("Feed error '{}': {}", feed.name, e),
            }
        }

        let allowed: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| allow_item(c, &self.config.filters))
            .collect();
        let items = sort_and_cap(dedupe(allowed), self.config.max_items);

        FeedDocument {
            team: Some(Team {
                name: Some(self.config.team.name.clone()),
                slug: Some(self.config.team.slug.clone()),
            }),
            updated_at: Some(Utc::now().to_rfc3339()),
            static_links: self
                .config
                .static_links
                .iter()
                .map(|link| StaticLink {
                    label: link.label.clone(),
                    url: link.url.clone(),
                })
                .collect(),
            sources: distinct_sources(&items),
            items,
        }
    }

    pub async fn fetch_feed(&self, feed: &FeedConfig) -> Result<Vec<Candidate>, CollectError> {
        info!("Fetching feed: {} ({})", feed.name, feed.url);

        let response = self.client.get(&feed.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::HttpStatus(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        let parsed = parser::parse(&bytes[..])?;

        let mut candidates = Vec::new();
        for entry in parsed.entries {
            let title = entry
                .title
                .as_ref()
                .map(|t| normalize_title(&t.content))
                .unwrap_or_default();
            let link = entry
                .links
                .first()
                .map(|l| l.href.trim().to_string())
                .unwrap_or_default();

            if title.is_empty() || link.is_empty() {
                continue;
            }

            let summary = entry
                .summary
                .as_ref()
                .map(|s| unescape_entities(&s.content).trim().to_string())
                .filter(|s| !s.is_empty());
            let published_at = entry.published.or(entry.updated).unwrap_or_else(Utc::now);

            candidates.push(Candidate {
                item: Item {
                    title: Some(title),
                    link: Some(self.canonicalize(&link).await),
                    source: Some(extract_source(entry.source.as_deref(), &feed.name)),
                    published: Some(published_at.to_rfc3339_opts(SecondsFormat::Secs, false)),
                    summary,
                    ..Default::default()
                },
                published_at,
                trusted: feed.trusted,
            });
        }

        Ok(candidates)
    }

    /// Follow redirects (when enabled) and reduce the final URL to its canonical form.
    async fn canonicalize(&self, link: &str) -> String {
        let resolved = if self.config.resolve_redirects {
            match self.client.get(link).send().await {
                Ok(response) => response.url().to_string(),
                Err(_) => link.to_string(),
            }
        } else {
            link.to_string()
        };

        canonical_form(&resolved)
    }
}

fn title_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+[–—-]\s+[^|]+$").expect("valid title suffix regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn scheme_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://(www\.)?").expect("valid scheme regex"))
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
            .expect("valid entity regex")
    })
}

/// Decode HTML5 named and numeric entities one at a time. Unknown entities
/// are kept as written.
fn unescape_entities(raw: &str) -> String {
    entity_re()
        .replace_all(raw, |caps: &Captures| {
            let entity = &caps[0];
            unescape_with(entity, resolve_html5_entity)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| entity.to_string())
        })
        .into_owned()
}

/// Unescape, drop a trailing ` — Outlet` suffix and collapse whitespace.
pub fn normalize_title(raw: &str) -> String {
    let unescaped = unescape_entities(raw);
    let stripped = title_suffix_re().replace(unescaped.trim(), "");
    whitespace_re().replace_all(&stripped, " ").trim().to_string()
}

/// Scheme, lowercased host and path without trailing slashes. Query and
/// fragment are dropped. Unparseable input is returned unchanged.
pub fn canonical_form(link: &str) -> String {
    match Url::parse(link) {
        Ok(url) => format!(
            "{}{}",
            &url[..Position::BeforePath],
            url.path().trim_end_matches('/')
        ),
        Err(_) => link.to_string(),
    }
}

/// The entry's own source, falling back to the feed name.
pub fn extract_source(entry_source: Option<&str>, feed_name: &str) -> String {
    let source = entry_source
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(feed_name)
        .trim();
    let source = if source.is_empty() { "Unknown" } else { source };

    scheme_prefix_re()
        .replace(source, "")
        .chars()
        .take(MAX_SOURCE_CHARS)
        .collect()
}

/// Trusted feeds always pass. Everything else must mention the team and the
/// sport and avoid every excluded token. Empty lists do not constrain.
pub fn allow_item(candidate: &Candidate, filters: &FilterConfig) -> bool {
    if candidate.trusted {
        return true;
    }

    let blob = format!(
        "{} {}",
        candidate.title(),
        candidate.item.summary.as_deref().unwrap_or_default()
    )
    .to_lowercase();
    let mentions = |needle: &String| blob.contains(&needle.to_lowercase());

    if !filters.team_keywords.is_empty() && !filters.team_keywords.iter().any(mentions) {
        return false;
    }
    if !filters.sport_tokens.is_empty() && !filters.sport_tokens.iter().any(mentions) {
        return false;
    }
    !filters.exclude_tokens.iter().any(mentions)
}

/// Keep the first candidate for each (lowercased title, link) pair.
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert((c.title().to_lowercase(), c.link().to_string())))
        .collect()
}

/// Newest first, at most `max_items`.
pub fn sort_and_cap(mut candidates: Vec<Candidate>, max_items: usize) -> Vec<Item> {
    candidates.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    candidates
        .into_iter()
        .take(max_items)
        .map(|c| c.item)
        .collect()
}

pub fn distinct_sources(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.source())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Write the document as pretty JSON, replacing `path` in one rename.
pub async fn write_document(path: &Path, doc: &FeedDocument) -> Result<(), CollectError> {
    let io_err = |source: std::io::Error| CollectError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(doc)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

/// Collect once and write the result. Returns the number of items written.
pub async fn run_collection(collector: &Collector, output: &Path) -> Result<usize, CollectError> {
    let doc = collector.collect().await;
    write_document(output, &doc).await?;
    info!("Wrote {} items to {}", doc.items.len(), output.display());
    Ok(doc.items.len())
}

fn collection_interval(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

pub async fn start_background_collection(
    collector: Arc<Collector>,
    output: PathBuf,
    interval_minutes: u64,
) {
    let interval = collection_interval(interval_minutes);

    info!("Starting initial collection");
    if let Err(e) = run_collection(&collector, &output).await {
        error!("Initial collection failed: {}", e);
    }

    loop {
        tokio::time::sleep(interval).await;
        info!("Starting scheduled collection");
        if let Err(e) = run_collection(&collector, &output).await {
            error!("Scheduled collection failed: {}", e);
        }
    }
}
