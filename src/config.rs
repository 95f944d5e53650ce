use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Where the page loads the feed document from (URL or local path)
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    /// Where the collector writes the feed document
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Collection interval in minutes, 0 disables background collection
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Collector request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Page loader request timeout in seconds
    #[serde(default = "default_load_timeout")]
    pub load_timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_resolve_redirects")]
    pub resolve_redirects: bool,
    #[serde(default)]
    pub team: TeamConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub static_links: Vec<StaticLinkConfig>,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

fn default_feed_url() -> String {
    "items.json".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("items.json")
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_refresh_interval() -> u64 {
    15
}

fn default_max_items() -> usize {
    60
}

fn default_request_timeout() -> u64 {
    12
}

fn default_load_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "TeamWire/1.0 (News Collector)".to_string()
}

fn default_resolve_redirects() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct TeamConfig {
    #[serde(default = "default_team_name")]
    pub name: String,
    #[serde(default = "default_team_slug")]
    pub slug: String,
}

fn default_team_name() -> String {
    "Team News".to_string()
}

fn default_team_slug() -> String {
    "team".to_string()
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            name: default_team_name(),
            slug: default_team_slug(),
        }
    }
}

/// Keyword lists applied to entries from untrusted feeds.
/// An empty list places no constraint.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FilterConfig {
    #[serde(default)]
    pub team_keywords: Vec<String>,
    #[serde(default)]
    pub sport_tokens: Vec<String>,
    #[serde(default)]
    pub exclude_tokens: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StaticLinkConfig {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub trusted: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
