use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::feed::FeedDocument;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    HttpStatus(u16),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid feed document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where the feed document lives.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedLocation {
    Remote(Url),
    Local(PathBuf),
}

impl FeedLocation {
    /// http(s) URLs are fetched, `file://` URLs and anything that is not an
    /// absolute URL (e.g. `items.json`) are read from disk.
    pub fn parse(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => FeedLocation::Remote(url),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => FeedLocation::Local(path),
                Err(()) => FeedLocation::Local(PathBuf::from(location)),
            },
            _ => FeedLocation::Local(PathBuf::from(location)),
        }
    }
}

/// Append a `ts` query parameter so intermediary caches never serve a stale copy.
pub fn cache_busted(url: &Url, ts_millis: i64) -> Url {
    let mut url = url.clone();
    url.query_pairs_mut()
        .append_pair("ts", &ts_millis.to_string());
    url
}

pub struct FeedLoader {
    client: Client,
    location: FeedLocation,
}

impl FeedLoader {
    pub fn new(location: &str, timeout: Duration, user_agent: &str) -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            location: FeedLocation::parse(location),
        })
    }

    pub fn location(&self) -> &FeedLocation {
        &self.location
    }

    /// Load and parse the feed document. Nothing is cached between calls.
    pub async fn load(&self) -> Result<FeedDocument, LoadError> {
        let bytes = match &self.location {
            FeedLocation::Remote(url) => self.fetch(url).await?,
            FeedLocation::Local(path) => {
                debug!("Reading feed document from {}", path.display());
                tokio::fs::read(path).await.map_err(|source| LoadError::Io {
                    path: path.clone(),
                    source,
                })?
            }
        };

        let doc = FeedDocument::from_slice(&bytes)?;
        debug!("Loaded feed document with {} items", doc.items.len());
        Ok(doc)
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, LoadError> {
        let url = cache_busted(url, Utc::now().timestamp_millis());
        info!("Fetching feed document: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::HttpStatus(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const DOC: &str = r#"{
        "updated_at": "2024-10-06T16:00:00Z",
        "items": [
            {"title": "One", "link": "https://www.colts.com/a"},
            {"title": "Two", "source": "Stampede Blue"}
        ]
    }"#;

    fn loader(location: &str) -> FeedLoader {
        FeedLoader::new(location, Duration::from_secs(5), "team-wire-test").unwrap()
    }

    mod location_tests {
        use super::*;

        #[test]
        fn test_http_urls_are_remote() {
            assert!(matches!(
                FeedLocation::parse("https://news.example.com/items.json"),
                FeedLocation::Remote(_)
            ));
            assert!(matches!(
                FeedLocation::parse("http://localhost:3000/items.json"),
                FeedLocation::Remote(_)
            ));
        }

        #[test]
        fn test_relative_path_is_local() {
            assert_eq!(
                FeedLocation::parse("items.json"),
                FeedLocation::Local(PathBuf::from("items.json"))
            );
            assert_eq!(
                FeedLocation::parse("public/items.json"),
                FeedLocation::Local(PathBuf::from("public/items.json"))
            );
        }

        #[cfg(unix)]
        #[test]
        fn test_file_url_is_local() {
            assert_eq!(
                FeedLocation::parse("file:///srv/site/items.json"),
                FeedLocation::Local(PathBuf::from("/srv/site/items.json"))
            );
        }
    }

    mod cache_busted_tests {
        use super::*;

        #[test]
        fn test_adds_ts_parameter() {
            let url = Url::parse("https://news.example.com/items.json").unwrap();
            assert_eq!(
                cache_busted(&url, 1728230400000).as_str(),
                "https://news.example.com/items.json?ts=1728230400000"
            );
        }

        #[test]
        fn test_keeps_existing_query() {
            let url = Url::parse("https://news.example.com/items.json?team=colts").unwrap();
            assert_eq!(
                cache_busted(&url, 42).as_str(),
                "https://news.example.com/items.json?team=colts&ts=42"
            );
        }
    }

    mod remote_tests {
        use super::*;

        #[tokio::test]
        async fn test_load_sends_ts_and_parses() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/items.json"))
                .and(|req: &Request| {
                    req.url
                        .query_pairs()
                        .any(|(k, v)| k == "ts" && v.parse::<i64>().is_ok())
                })
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "application/json")
                        .set_body_string(DOC),
                )
                .expect(1)
                .mount(&server)
                .await;

            let doc = loader(&format!("{}/items.json", server.uri()))
                .load()
                .await
                .unwrap();

            assert_eq!(doc.items.len(), 2);
            assert_eq!(doc.updated_at(), Some("2024-10-06T16:00:00Z"));
        }

        #[tokio::test]
        async fn test_every_load_hits_the_network() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/items.json"))
                .respond_with(ResponseTemplate::new(200).set_body_string(DOC))
                .expect(2)
                .mount(&server)
                .await;

            let loader = loader(&format!("{}/items.json", server.uri()));
            loader.load().await.unwrap();
            loader.load().await.unwrap();
        }

        #[tokio::test]
        async fn test_error_status() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let result = loader(&format!("{}/items.json", server.uri())).load().await;
            assert!(matches!(result, Err(LoadError::HttpStatus(404))));
        }

        #[tokio::test]
        async fn test_invalid_json() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
                .mount(&server)
                .await;

            let result = loader(&format!("{}/items.json", server.uri())).load().await;
            assert!(matches!(result, Err(LoadError::Decode(_))));
        }
    }

    mod local_tests {
        use super::*;

        #[tokio::test]
        async fn test_load_from_file() {
            let mut file = NamedTempFile::new().unwrap();
            file.write_all(DOC.as_bytes()).unwrap();

            let doc = loader(file.path().to_str().unwrap()).load().await.unwrap();
            assert_eq!(doc.items.len(), 2);
            assert_eq!(doc.items[1].source(), Some("Stampede Blue"));
        }

        #[tokio::test]
        async fn test_missing_file() {
            let result = loader("/nonexistent/items.json").load().await;
            assert!(matches!(result, Err(LoadError::Io { .. })));
        }
    }
}
