//! Feed client for the rss2json conversion service.
//!
//! The service fetches an RSS/Atom feed on our behalf and answers with
//! JSON, which spares us from parsing each outlet's XML dialect.
//!
//! # Request
//!
//! `GET {endpoint}?rss_url={feed url}`
//!
//! # Response
//!
//! ```text
//! { "items": [ { "title", "description", "link", "pubDate" }, ... ] }
//! ```
//!
//! Missing or `null` item fields default to empty strings. A body without `items`
//! (the service reports upstream errors that way) is a parse failure.

use super::FeedClient;
use crate::error::LookupError;
use crate::models::{FeedEntry, Source};
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

/// Public endpoint of the conversion service.
pub const DEFAULT_ENDPOINT: &str = "https://api.rss2json.com/v1/api.json";

#[derive(Debug, Deserialize)]
struct FeedResponse {
    items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    pub_date: Option<String>,
}

/// [`FeedClient`] backed by rss2json over HTTP.
#[derive(Debug, Clone)]
pub struct Rss2JsonClient {
    http: Client,
    endpoint: String,
}

impl Rss2JsonClient {
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// Conversion URL for one feed.
    pub fn request_url(&self, source: &Source) -> Result<Url, LookupError> {
        Ok(Url::parse_with_params(&self.endpoint, &[("rss_url", source.endpoint)])?)
    }
}

/// Decode a conversion response body into entries of `source`.
pub fn parse_feed(source: &Source, body: &str) -> Result<Vec<FeedEntry>, LookupError> {
    let response: FeedResponse = serde_json::from_str(body)?;
    Ok(response
        .items
        .into_iter()
        .map(|item| FeedEntry {
            source: source.name.to_string(),
            title: item.title.unwrap_or_default(),
            link: item.link.unwrap_or_default(),
            published_at: item.pub_date.unwrap_or_default(),
            description: item.description.unwrap_or_default(),
        })
        .collect())
}

impl FeedClient for Rss2JsonClient {
    #[instrument(level = "debug", skip_all, fields(source = %source.name))]
    async fn fetch_entries(&self, source: &Source) -> Result<Vec<FeedEntry>, LookupError> {
        let url = self.request_url(source)?;
        let res = self.http.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }
        let body = res.text().await?;
        let entries = parse_feed(source, &body).inspect_err(|e| {
            warn!(
                error = %e,
                body_preview = %truncate_for_log(&body, 300),
                "Feed service returned non-conforming JSON"
            );
        })?;
        debug!(count = entries.len(), "Decoded feed entries");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: Source = Source { name: "gCaptain", endpoint: "https://gcaptain.com/feed/" };

    #[test]
    fn test_parse_feed() {
        let body = r#"{
            "status": "ok",
            "items": [
                {"title": "Port congestion", "description": "<p>Delays</p>",
                 "link": "https://gcaptain.com/a", "pubDate": "2025-05-06 10:00:00"},
                {"title": "No description", "link": "https://gcaptain.com/b"}
            ]
        }"#;
        let entries = parse_feed(&SOURCE, body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source, "gCaptain");
        assert_eq!(entries[0].published_at, "2025-05-06 10:00:00");
        assert_eq!(entries[1].description, "");
        assert_eq!(entries[1].published_at, "");
    }

    #[test]
    fn test_parse_feed_null_fields_keep_the_entry() {
        let body = r#"{"items": [
            {"title": "Port news", "description": null, "link": "https://gcaptain.com/c", "pubDate": null},
            {"title": null, "description": "Terminal reopens", "link": null}
        ]}"#;
        let entries = parse_feed(&SOURCE, body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Port news");
        assert_eq!(entries[0].description, "");
        assert_eq!(entries[0].published_at, "");
        assert_eq!(entries[1].title, "");
        assert_eq!(entries[1].description, "Terminal reopens");
        assert_eq!(entries[1].link, "");
    }

    #[test]
    fn test_parse_feed_without_items_fails() {
        let body = r#"{"status": "error", "message": "Cannot download feed"}"#;
        assert!(matches!(parse_feed(&SOURCE, body), Err(LookupError::Parse(_))));
    }

    #[test]
    fn test_request_url_encodes_feed_url() {
        let client = Rss2JsonClient::new(Client::new(), DEFAULT_ENDPOINT);
        let url = client.request_url(&SOURCE).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.rss2json.com/v1/api.json?rss_url=https%3A%2F%2Fgcaptain.com%2Ffeed%2F"
        );
    }

    #[test]
    fn test_request_url_rejects_bad_endpoint() {
        let client = Rss2JsonClient::new(Client::new(), "not a url");
        assert!(matches!(client.request_url(&SOURCE), Err(LookupError::Endpoint(_))));
    }
}
