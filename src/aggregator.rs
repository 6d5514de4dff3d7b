use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, MediaObject};
use feed_rs::parser;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::config::{Config, DatePreference, SourceConfig};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed parse failed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// One normalized feed entry, the shape the presenter consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub publisher: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// None when the feed carried no date or one the parser rejected
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// Per-source outcome of one aggregation pass. Not part of the HTTP
/// payload; callers that care about partial failure read it here.
#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub publisher: String,
    pub item_count: usize,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct Aggregation {
    pub items: Vec<NewsItem>,
    pub sources: Vec<SourceStatus>,
}

pub struct Aggregator {
    client: Client,
    sources: Vec<SourceConfig>,
}

impl Aggregator {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .user_agent("SwipeNews/1.0 (News Aggregator)")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            sources: config.sources.clone(),
        }
    }

    /// Fetch every configured source concurrently, then merge.
    ///
    /// Infallible: a source that fails contributes zero items and an entry
    /// in [`Aggregation::sources`] with the error string. All sources
    /// failing yields an empty item list.
    pub async fn aggregate(&self) -> Aggregation {
        let mut handles = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let client = self.client.clone();
            let source = source.clone();
            handles.push(tokio::spawn(
                async move { fetch_source(&client, &source).await },
            ));
        }

        let mut aggregation = Aggregation::default();
        for (source, handle) in self.sources.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Fetch task for '{}' failed: {}", source.publisher, e);
                    aggregation.sources.push(SourceStatus {
                        publisher: source.publisher.clone(),
                        item_count: 0,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            match result {
                Ok(items) => {
                    info!("Fetched {} items from '{}'", items.len(), source.publisher);
                    aggregation.sources.push(SourceStatus {
                        publisher: source.publisher.clone(),
                        item_count: items.len(),
                        error: None,
                    });
                    aggregation.items.extend(items);
                }
                Err(e) => {
                    error!("Failed to fetch feed '{}': {}", source.publisher, e);
                    aggregation.sources.push(SourceStatus {
                        publisher: source.publisher.clone(),
                        item_count: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        sort_newest_first(&mut aggregation.items);
        aggregation
    }
}

async fn fetch_source(client: &Client, source: &SourceConfig) -> Result<Vec<NewsItem>, FeedError> {
    info!("Fetching feed: {} ({})", source.publisher, source.feed_url);

    let response = client
        .get(&source.feed_url)
        .send()
        .await?
        .error_for_status()?;
    let bytes = response.bytes().await?;

    items_from_bytes(source, &bytes)
}

/// Parse raw feed bytes and normalize every entry for one source.
pub fn items_from_bytes(source: &SourceConfig, bytes: &[u8]) -> Result<Vec<NewsItem>, FeedError> {
    let parsed = parser::parse(bytes)?;
    Ok(parsed
        .entries
        .into_iter()
        .map(|entry| normalize_entry(source, entry))
        .collect())
}

/// Sort descending by publish timestamp. `None` orders below every `Some`,
/// so undated items always trail the list.
fn sort_newest_first(items: &mut [NewsItem]) {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

fn normalize_entry(source: &SourceConfig, entry: Entry) -> NewsItem {
    let published_at = match source.date_preference {
        DatePreference::Published => entry.published.or(entry.updated),
        DatePreference::Updated => entry.updated.or(entry.published),
    };

    let image = extract_image(&entry.media);

    let description = entry
        .summary
        .map(|text| text.content)
        .or_else(|| entry.content.and_then(|content| content.body))
        .unwrap_or_default();

    let author = entry
        .authors
        .into_iter()
        .map(|person| person.name)
        .find(|name| !name.is_empty());

    // Feeds often attach several categories; the first one is the topic
    let topic = entry
        .categories
        .into_iter()
        .next()
        .map(|category| category.label.unwrap_or(category.term));

    NewsItem {
        publisher: source.publisher.clone(),
        title: entry.title.map(|title| title.content),
        url: entry.links.first().map(|link| link.href.clone()),
        published_at,
        description,
        image,
        source: source.feed_url.clone(),
        author,
        topic,
    }
}

fn extract_image(media: &[MediaObject]) -> Option<String> {
    for object in media {
        if let Some(url) = object.content.iter().find_map(|content| content.url.as_ref()) {
            return Some(url.to_string());
        }
        if let Some(thumbnail) = object.thumbnails.first() {
            return Some(thumbnail.image.uri.clone());
        }
    }
    None
}
