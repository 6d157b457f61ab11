//! Feed retrieval and relevance filtering.
//!
//! Each refresh cycle fetches every catalog source at once and keeps the
//! first few logistics-relevant entries of each.
//!
//! # Pipeline
//!
//! 1. **Fetching**: one request per source through a [`FeedClient`], all
//!    issued before any is awaited
//! 2. **Filtering**: [`is_relevant`] keeps entries mentioning a keyword
//! 3. **Capping**: at most [`MAX_ENTRIES_PER_SOURCE`] per source, in feed order
//!
//! A source that fails for any reason contributes nothing; the others are
//! unaffected.
//!
//! # Clients
//!
//! | Client | Module | Notes |
//! |--------|--------|-------|
//! | rss2json | [`rss2json`] | Feed-to-JSON conversion service over HTTP |

pub mod rss2json;

use crate::error::LookupError;
use crate::models::{FeedEntry, Source};
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

/// Case-folded substrings marking an entry as logistics news.
pub const KEYWORDS: &[&str] = &["logistic", "supply chain", "port", "terminal"];

/// Entries kept per source after filtering.
pub const MAX_ENTRIES_PER_SOURCE: usize = 5;

/// Retrieves the raw entries of one feed.
///
/// Implementations return entries in feed order with no filtering applied.
pub trait FeedClient {
    async fn fetch_entries(&self, source: &Source) -> Result<Vec<FeedEntry>, LookupError>;
}

/// Whether an entry's title and description mention a logistics keyword.
pub fn is_relevant(entry: &FeedEntry) -> bool {
    let text = entry.searchable_text().to_lowercase();
    KEYWORDS.iter().any(|k| text.contains(k))
}

/// Keep the first [`MAX_ENTRIES_PER_SOURCE`] relevant entries.
pub fn select_relevant(entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
    entries
        .into_iter()
        .filter(is_relevant)
        .take(MAX_ENTRIES_PER_SOURCE)
        .collect()
}

/// Fetch and filter one source, degrading any failure to an empty list.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
async fn fetch_source<C: FeedClient>(client: &C, source: &Source) -> Vec<FeedEntry> {
    match client.fetch_entries(source).await {
        Ok(entries) => {
            let fetched = entries.len();
            let relevant = select_relevant(entries);
            debug!(fetched, kept = relevant.len(), "Filtered feed entries");
            relevant
        }
        Err(e) => {
            warn!(error = %e, endpoint = source.endpoint, "Feed fetch failed; skipping source");
            Vec::new()
        }
    }
}

/// Fetch every source concurrently.
///
/// # Returns
///
/// One list per source, in catalog order. Failed sources yield empty lists.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn fetch_all<C: FeedClient>(client: &C, sources: &[Source]) -> Vec<Vec<FeedEntry>> {
    let per_source = join_all(sources.iter().map(|s| fetch_source(client, s))).await;
    let total: usize = per_source.iter().map(Vec::len).sum();
    info!(total, "Fetched relevant feed entries");
    per_source
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;

    /// Serves canned entries per source name; unknown sources fail.
    #[derive(Debug, Default)]
    pub struct CannedFeeds {
        pub feeds: HashMap<&'static str, Vec<FeedEntry>>,
    }

    impl CannedFeeds {
        pub fn with(mut self, source: &'static str, entries: Vec<FeedEntry>) -> Self {
            self.feeds.insert(source, entries);
            self
        }
    }

    impl FeedClient for CannedFeeds {
        async fn fetch_entries(&self, source: &Source) -> Result<Vec<FeedEntry>, LookupError> {
            // Let sibling fetches interleave
            tokio::task::yield_now().await;
            self.feeds
                .get(source.name)
                .cloned()
                .ok_or(LookupError::Status(reqwest::StatusCode::BAD_GATEWAY))
        }
    }

    pub fn entry(source: &str, title: &str, description: &str) -> FeedEntry {
        FeedEntry {
            source: source.to_string(),
            title: title.to_string(),
            link: format!("https://news.example/{}", title.to_lowercase().replace(' ', "-")),
            published_at: "2025-05-06 12:00:00".to_string(),
            description: description.to_string(),
        }
    }
}
